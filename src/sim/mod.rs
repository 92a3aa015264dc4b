//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only (course generation)
//! - Stable iteration order (objects by load index)
//! - No rendering, audio or platform dependencies; side effects leave
//!   through [`crate::effects::Feedback`]

pub mod collision;
pub mod course;
pub mod heightmap;
pub mod level;
pub mod phase;
pub mod respawn;
pub mod state;
pub mod tick;

pub use collision::{Aabb, GapWall, SolidSide, gap_walls, swept_hit};
pub use course::generate_course;
pub use heightmap::Heightmap;
pub use level::{Level, LevelDocument, LevelError, LevelMeta, LevelObject, ObjectId, ObjectKind};
pub use phase::{Command, Transition};
pub use respawn::respawn;
pub use state::{AnimState, CrashCause, GameEvent, GamePhase, GameState, Player};
pub use tick::{Key, KeyState, TickInput, crash, tick};
