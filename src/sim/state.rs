//! Game state and core simulation types
//!
//! Everything the simulation step mutates lives here. Player and timers are
//! rebuilt wholesale on respawn; the avalanche survives respawns.

use serde::{Deserialize, Serialize};

use super::level::Level;

/// Top-level game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Title screen, waiting for start
    Title,
    /// Level assets are being fetched
    Loading,
    /// Active gameplay (the only phase the step runs in)
    Playing,
    Paused,
    /// Crashed, waiting for restart input
    Dead,
    /// Finish line reached
    Complete,
    /// Level editor overlay
    Editor,
}

/// What ended the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrashCause {
    Hazard,
    Wall,
    Collider,
    /// Ran into the edge of a gap
    GapWall,
    /// Dropped out of the world
    Fall,
    /// Caught by the avalanche
    Avalanche,
}

/// Cosmetic animation state derived each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnimState {
    #[default]
    Idle,
    Run,
    Jump,
    Fall,
}

impl AnimState {
    pub fn name(&self) -> &'static str {
        match self {
            AnimState::Idle => "idle",
            AnimState::Run => "run",
            AnimState::Jump => "jump",
            AnimState::Fall => "fall",
        }
    }
}

/// Player kinematic state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub x: f32,
    /// Logical origin; the feet sit `feet_offset` below it
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Cosmetic tilt (radians); never used for collision
    pub angle: f32,
    pub grounded: bool,
    /// Last tick's `grounded`
    pub was_grounded: bool,
    pub invuln_timer: f32,
    /// Sprite visibility (hidden after a crash)
    pub visible: bool,
}

impl Player {
    /// Fresh body resting at `(x, y)`
    pub fn spawn(x: f32, y: f32, invulnerability: f32) -> Self {
        Self {
            x,
            y,
            invuln_timer: invulnerability,
            visible: true,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_invulnerable(&self) -> bool {
        self.invuln_timer > 0.0
    }
}

/// Jump/boost/effect timers, all counting down to zero (seconds)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timers {
    pub coyote: f32,
    pub jump_buffer: f32,
    pub jump_hold: f32,
    pub jump_lock: f32,
    pub boost_refill_block: f32,
    /// "Boost full" indicator after an unlock
    pub boost_full: f32,
    pub crash: f32,
    pub landing_flash: f32,
}

impl Timers {
    /// Count every timer down by `dt`, clamped at zero
    pub fn decay(&mut self, dt: f32) {
        for t in [
            &mut self.coyote,
            &mut self.jump_buffer,
            &mut self.jump_hold,
            &mut self.jump_lock,
            &mut self.boost_refill_block,
            &mut self.boost_full,
            &mut self.crash,
            &mut self.landing_flash,
        ] {
            *t = (*t - dt).max(0.0);
        }
    }
}

/// Boost stamina resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boost {
    /// Normalized tank, 0..=1
    pub stamina: f32,
    /// Set when the tank runs dry; cleared once it is full again
    pub locked: bool,
    /// Boosting this tick
    pub active: bool,
}

impl Default for Boost {
    fn default() -> Self {
        Self {
            stamina: 1.0,
            locked: false,
            active: false,
        }
    }
}

/// Avalanche position remembered at a checkpoint-relative crash
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedFront {
    pub x: f32,
    pub speed: f32,
}

/// The pursuing avalanche
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avalanche {
    /// Leading edge
    pub x: f32,
    pub speed: f32,
    pub active: bool,
    pub saved: Option<SavedFront>,
}

impl Avalanche {
    pub fn new(x: f32, speed: f32) -> Self {
        Self {
            x,
            speed,
            active: true,
            saved: None,
        }
    }
}

/// Screen shake request being played out
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Shake {
    pub strength: f32,
    pub remaining: f32,
}

impl Shake {
    pub fn kick(&mut self, strength: f32, duration: f32) {
        self.strength = self.strength.max(strength);
        self.remaining = self.remaining.max(duration);
    }

    pub fn advance(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
        if self.remaining == 0.0 {
            self.strength = 0.0;
        }
    }
}

/// Things that happened during a tick, for the driver and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Jumped,
    Landed { impact: f32, hard: bool },
    Crashed { cause: CrashCause },
    CheckpointReached { x: f32 },
    Finished { time: f32 },
    BoostStarted,
    BoostDepleted,
    BoostRefilled,
    SpeedBurst,
    AvalancheSpawned { x: f32 },
}

/// Complete game context for one level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub phase: GamePhase,
    /// Phase to return to when the editor closes
    pub editor_return: Option<GamePhase>,
    pub player: Player,
    pub timers: Timers,
    pub boost: Boost,
    pub avalanche: Option<Avalanche>,
    /// World X of the level start
    pub start_x: f32,
    /// Furthest checkpoint reached (world X); starts at `start_x`
    pub furthest_checkpoint_x: f32,
    /// Once set, nothing can kill the player
    pub reached_finish: bool,
    /// Next respawn ignores checkpoints
    pub force_full_restart: bool,
    /// Jump requested from outside the input snapshot (e.g. touch UI)
    pub pending_jump: bool,
    pub last_crash: Option<CrashCause>,
    pub anim: AnimState,
    pub shake: Shake,
    /// Above the speed-burst threshold last tick
    pub fast: bool,
    pub time_ticks: u64,
    /// Simulated time in the current run (seconds)
    pub elapsed: f32,
    pub deaths: u32,
}

impl GameState {
    /// Fresh context for a level, parked on the title screen
    pub fn new(level: &Level) -> Self {
        let start_x = level.start_x();
        let y = level.terrain.height_at(start_x).unwrap_or(0.0);
        Self {
            phase: GamePhase::Title,
            editor_return: None,
            player: Player::spawn(start_x, y, 0.0),
            timers: Timers::default(),
            boost: Boost::default(),
            avalanche: None,
            start_x,
            furthest_checkpoint_x: start_x,
            reached_finish: false,
            force_full_restart: false,
            pending_jump: false,
            last_crash: None,
            anim: AnimState::Idle,
            shake: Shake::default(),
            fast: false,
            time_ticks: 0,
            elapsed: 0.0,
            deaths: 0,
        }
    }

    /// A checkpoint at world X counts as reached once the furthest mark passes it
    #[inline]
    pub fn is_checkpoint_reached(&self, x: f32) -> bool {
        x <= self.furthest_checkpoint_x
    }

    /// True once any checkpoint past the start has been reached
    #[inline]
    pub fn has_checkpoint(&self) -> bool {
        self.furthest_checkpoint_x > self.start_x
    }

    /// Spawn point of a fresh avalanche
    #[inline]
    pub fn avalanche_home(&self, offset: f32) -> f32 {
        self.start_x - offset
    }
}
