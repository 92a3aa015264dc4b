//! Sled Rush - a side-scrolling sled racer
//!
//! Core modules:
//! - `sim`: Deterministic simulation (terrain, physics, collisions, game state)
//! - `game`: Fixed-timestep frame driver and level playlist
//! - `effects`: Collaborator traits for sound, shake, particles and animation
//! - `tuning`: Data-driven physics constants
//! - `settings`: Player preferences
//! - `records`: Best completion times

pub mod effects;
pub mod game;
pub mod records;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use game::{Game, View};
pub use records::BestTimes;
pub use settings::Settings;
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Longest wall-clock frame fed to the accumulator (stall protection)
    pub const MAX_FRAME_DT: f32 = 0.25;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Segment count for generated demo courses
    pub const DEFAULT_COURSE_LEN: usize = 1200;
}
