//! Frame driver
//!
//! Owns the active level, the game state and the collaborators, and runs the
//! simulation on a fixed-timestep accumulator. Outer code feeds it wall-clock
//! frame deltas and key changes; the renderer reads [`Game::view`].

use thiserror::Error;

use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SIM_DT};
use crate::effects::{AnimationSink, Diagnostics, EffectsSink, Feedback, NullEffects};
use crate::records::BestTimes;
use crate::settings::Settings;
use crate::sim::level::{Level, LevelError};
use crate::sim::phase::{self, Command, Transition};
use crate::sim::state::{GameEvent, GamePhase, GameState, Player};
use crate::sim::tick::{Key, TickInput, tick};
use crate::tuning::Tuning;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("playlist is empty")]
    EmptyPlaylist,

    #[error(transparent)]
    Level(#[from] LevelError),
}

/// Asset fetch failure
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset '{0}' not found")]
    Missing(String),

    #[error("asset backend error: {0}")]
    Backend(String),
}

/// Fetches a level's assets while the game sits in `Loading`
pub trait AssetLoader {
    /// Begin fetching
    fn request(&mut self, assets: &[String]) -> Result<(), AssetError>;
    /// True once everything requested is available
    fn is_ready(&mut self) -> bool;
}

/// Loader for assets that are always at hand
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateAssets;

impl AssetLoader for ImmediateAssets {
    fn request(&mut self, _assets: &[String]) -> Result<(), AssetError> {
        Ok(())
    }

    fn is_ready(&mut self) -> bool {
        true
    }
}

/// Player pose snapshot for interpolation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Pose {
    x: f32,
    y: f32,
    angle: f32,
}

impl Pose {
    fn of(player: &Player) -> Self {
        Self {
            x: player.x,
            y: player.y,
            angle: player.angle,
        }
    }

    fn lerp(&self, other: &Pose, t: f32) -> Pose {
        Pose {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            angle: self.angle + (other.angle - self.angle) * t,
        }
    }
}

/// What the renderer needs for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub phase: GamePhase,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub visible: bool,
    pub camera_x: f32,
    pub avalanche_x: Option<f32>,
    pub shake: f32,
    /// Landing flash strength (0..=1)
    pub flash: f32,
    /// Boost tank (0..=1)
    pub stamina: f32,
    /// Fraction of a tick left in the accumulator
    pub alpha: f32,
}

/// Complete game instance
pub struct Game {
    state: GameState,
    /// Working copy of `playlist[level_index]`
    level: Level,
    playlist: Vec<Level>,
    level_index: usize,
    tuning: Tuning,
    settings: Settings,
    effects: Box<dyn EffectsSink>,
    animation: Box<dyn AnimationSink>,
    diagnostics: Option<Box<dyn Diagnostics>>,
    assets: Box<dyn AssetLoader>,
    records: BestTimes,
    input: TickInput,
    accumulator: f32,
    prev: Pose,
    events: Vec<GameEvent>,
}

impl Game {
    pub fn new(playlist: Vec<Level>, tuning: Tuning, settings: Settings) -> Result<Self, GameError> {
        let level = playlist.first().cloned().ok_or(GameError::EmptyPlaylist)?;
        let state = GameState::new(&level);
        let prev = Pose::of(&state.player);
        log::info!("Game ready: {} level(s), first '{}'", playlist.len(), level.title());
        Ok(Self {
            state,
            level,
            playlist,
            level_index: 0,
            tuning,
            settings,
            effects: Box::new(NullEffects),
            animation: Box::new(NullEffects),
            diagnostics: None,
            assets: Box::new(ImmediateAssets),
            records: BestTimes::new(),
            input: TickInput::default(),
            accumulator: 0.0,
            prev,
            events: Vec::new(),
        })
    }

    pub fn with_effects(mut self, effects: Box<dyn EffectsSink>) -> Self {
        self.effects = effects;
        self
    }

    pub fn with_animation(mut self, animation: Box<dyn AnimationSink>) -> Self {
        self.animation = animation;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Box<dyn Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    pub fn with_assets(mut self, assets: Box<dyn AssetLoader>) -> Self {
        self.assets = assets;
        self
    }

    pub fn with_records(mut self, records: BestTimes) -> Self {
        self.records = records;
        self
    }

    // === Accessors ===

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn level_index(&self) -> usize {
        self.level_index
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn records(&self) -> &BestTimes {
        &self.records
    }

    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    // === Input ===

    pub fn press(&mut self, key: Key) {
        self.input.key_mut(key).press();
    }

    pub fn release(&mut self, key: Key) {
        self.input.key_mut(key).release();
    }

    /// Ask for a jump outside the key snapshot (touch button, autopilot)
    pub fn request_jump(&mut self) {
        self.state.pending_jump = true;
    }

    /// Events produced since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // === Phase control ===

    /// Apply a phase command, handling level switches and snapshot resync
    pub fn command(&mut self, command: Command) -> Transition {
        let transition = phase::apply(&mut self.state, &self.level, &self.tuning, command);
        if transition == Transition::BeginLoading {
            self.begin_loading();
        }
        if transition.is_change() {
            self.resync();
        }
        transition
    }

    fn begin_loading(&mut self) {
        let next = self.level_index + 1;
        let Some(level) = self.playlist.get(next).cloned() else {
            log::info!("Playlist finished, back to title");
            self.switch_level(0, GamePhase::Title);
            return;
        };
        let failed = match self.assets.request(&level.meta.assets) {
            Ok(()) => false,
            Err(e) => {
                log::warn!("Asset request for '{}' failed: {}", level.title(), e);
                true
            }
        };
        self.switch_level_to(next, level, GamePhase::Loading);
        // Assets are cosmetic; play on without them
        if failed {
            self.command(Command::AssetsReady);
        }
    }

    fn switch_level(&mut self, index: usize, phase: GamePhase) {
        if let Some(level) = self.playlist.get(index).cloned() {
            self.switch_level_to(index, level, phase);
        }
    }

    fn switch_level_to(&mut self, index: usize, level: Level, phase: GamePhase) {
        log::info!("Level {} '{}' ({:?})", index + 1, level.title(), phase);
        self.level_index = index;
        self.level = level;
        self.state = GameState::new(&self.level);
        self.state.phase = phase;
        self.resync();
    }

    /// Replace the active level from editor JSON. On error the current level is kept.
    pub fn load_level_json(&mut self, json: &str) -> Result<(), LevelError> {
        let level = match Level::from_json(json) {
            Ok(level) => level,
            Err(e) => {
                log::warn!("Rejected level: {}", e);
                return Err(e);
            }
        };
        let editing = self.state.phase == GamePhase::Editor;
        if let Some(slot) = self.playlist.get_mut(self.level_index) {
            *slot = level.clone();
        }
        self.switch_level_to(self.level_index, level, GamePhase::Title);
        if editing {
            self.state.editor_return = Some(GamePhase::Title);
            self.state.phase = GamePhase::Editor;
        }
        Ok(())
    }

    /// Zero the accumulator, drop stale key edges and snap the interpolation
    /// snapshot to the present
    fn resync(&mut self) {
        self.accumulator = 0.0;
        self.input.clear_edges();
        self.prev = Pose::of(&self.state.player);
    }

    /// Turn command-key edges into phase commands
    fn poll_commands(&mut self) {
        if self.input.editor.pressed {
            self.command(Command::ToggleEditor);
        }
        if self.input.pause.pressed {
            self.command(Command::TogglePause);
        }
        if self.input.restart.pressed {
            let command = match self.state.phase {
                GamePhase::Title => Some(Command::Start),
                GamePhase::Dead => Some(Command::Restart),
                GamePhase::Complete => Some(Command::NextLevel),
                _ => None,
            };
            if let Some(command) = command {
                self.command(command);
            }
        }
        self.input.editor.clear_edges();
        self.input.pause.clear_edges();
        self.input.restart.clear_edges();

        if self.state.phase == GamePhase::Loading && self.assets.is_ready() {
            self.command(Command::AssetsReady);
        }
    }

    // === Frame ===

    /// Advance by one rendered frame. Returns the number of ticks run.
    pub fn frame(&mut self, frame_dt: f32) -> u32 {
        self.poll_commands();

        if self.state.phase != GamePhase::Playing {
            // Nothing ticks, so this frame's edges and requests are dropped
            self.accumulator = 0.0;
            self.input.clear_edges();
            self.state.pending_jump = false;
            return 0;
        }

        self.accumulator += frame_dt.clamp(0.0, MAX_FRAME_DT);

        let mut fx = Feedback::new(self.effects.as_mut(), self.animation.as_mut())
            .with_settings(&self.settings);
        if let Some(diagnostics) = self.diagnostics.as_deref_mut() {
            fx = fx.with_diagnostics(diagnostics);
        }

        let mut substeps = 0;
        let mut phase_changed = false;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.prev = Pose::of(&self.state.player);
            tick(&mut self.state, &self.level, &self.tuning, &self.input, SIM_DT, &mut fx);
            self.input.clear_edges();
            self.accumulator -= SIM_DT;
            substeps += 1;

            if self.state.phase != GamePhase::Playing {
                phase_changed = true;
                break;
            }
        }
        // Drop backlog we could not simulate
        if substeps == MAX_SUBSTEPS {
            self.accumulator = self.accumulator.min(SIM_DT);
        }
        let events = fx.take_events();
        drop(fx);

        if phase_changed {
            log::info!("Phase {:?} -> {:?}", GamePhase::Playing, self.state.phase);
            self.resync();
        }
        for event in &events {
            if let GameEvent::Finished { time } = *event {
                let title = self.level.title().to_string();
                if let Some(rank) = self.records.add_time(&title, time, self.state.deaths) {
                    log::info!("New best time #{} on '{}': {:.2}s", rank, title, time);
                }
            }
        }
        self.events.extend(events);
        substeps
    }

    /// Interpolated render state
    pub fn view(&self) -> View {
        let alpha = (self.accumulator / SIM_DT).clamp(0.0, 1.0);
        let pose = self.prev.lerp(&Pose::of(&self.state.player), alpha);
        let flash = if self.tuning.landing_flash_time > 0.0 {
            self.state.timers.landing_flash / self.tuning.landing_flash_time
        } else {
            0.0
        };
        View {
            phase: self.state.phase,
            x: pose.x,
            y: pose.y,
            angle: pose.angle,
            visible: self.state.player.visible,
            camera_x: pose.x.max(0.0),
            avalanche_x: self.state.avalanche.as_ref().map(|av| av.x),
            shake: if self.settings.effective_screen_shake() {
                self.state.shake.strength
            } else {
                0.0
            },
            flash,
            stamina: self.state.boost.stamina,
            alpha,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::{LevelMeta, LevelObject, ObjectKind};

    fn level(title: &str, objects: Vec<LevelObject>) -> Level {
        let meta = LevelMeta {
            title: title.to_string(),
            ..Default::default()
        };
        Level::new(meta, vec![Some(100.0); 400], objects).unwrap()
    }

    fn game(levels: Vec<Level>) -> Game {
        Game::new(levels, Tuning::default(), Settings::default()).unwrap()
    }

    fn started(levels: Vec<Level>) -> Game {
        let mut g = game(levels);
        g.press(Key::Restart);
        g.frame(0.0);
        g.release(Key::Restart);
        assert_eq!(g.state().phase, GamePhase::Playing);
        g
    }

    #[test]
    fn test_empty_playlist_rejected() {
        assert!(matches!(
            Game::new(Vec::new(), Tuning::default(), Settings::default()),
            Err(GameError::EmptyPlaylist)
        ));
    }

    #[test]
    fn test_nothing_runs_on_title() {
        let mut g = game(vec![level("a", Vec::new())]);
        assert_eq!(g.frame(1.0), 0);
        assert_eq!(g.accumulator(), 0.0);
        assert_eq!(g.state().time_ticks, 0);
    }

    #[test]
    fn test_long_frame_is_clamped() {
        let mut g = started(vec![level("a", Vec::new())]);
        assert_eq!(g.frame(5.0), MAX_SUBSTEPS);
        assert_eq!(g.state().time_ticks, MAX_SUBSTEPS as u64);
        assert!(g.accumulator() <= SIM_DT);
    }

    #[test]
    fn test_partial_frames_accumulate() {
        let mut g = started(vec![level("a", Vec::new())]);
        assert_eq!(g.frame(SIM_DT * 0.6), 0);
        let view = g.view();
        assert!(view.alpha > 0.5 && view.alpha < 0.7);
        assert_eq!(g.frame(SIM_DT * 0.6), 1);
    }

    #[test]
    fn test_pause_resets_accumulator() {
        let mut g = started(vec![level("a", Vec::new())]);
        g.frame(SIM_DT * 0.5);
        assert!(g.accumulator() > 0.0);
        g.press(Key::Pause);
        assert_eq!(g.frame(SIM_DT * 3.0), 0);
        assert_eq!(g.state().phase, GamePhase::Paused);
        assert_eq!(g.accumulator(), 0.0);

        // Held key is not a second press
        assert_eq!(g.frame(SIM_DT), 0);
        g.release(Key::Pause);
        g.press(Key::Pause);
        g.frame(0.0);
        assert_eq!(g.state().phase, GamePhase::Playing);
    }

    #[test]
    fn test_restart_after_crash() {
        // Far enough that spawn invulnerability has worn off
        let lvl = level("a", vec![LevelObject::new(ObjectKind::Hazard, 150.0)]);
        let mut g = started(vec![lvl]);
        g.press(Key::Right);
        for _ in 0..600 {
            g.frame(SIM_DT);
        }
        assert_eq!(g.state().phase, GamePhase::Dead);
        assert!(g.drain_events().iter().any(|e| matches!(e, GameEvent::Crashed { .. })));

        g.press(Key::Restart);
        g.frame(0.0);
        assert_eq!(g.state().phase, GamePhase::Playing);
        assert!(g.state().player.is_invulnerable());
        let view = g.view();
        assert_eq!(view.x, g.state().player.x);
    }

    #[test]
    fn test_finish_records_time_and_advances() {
        let first = level("first", vec![LevelObject::new(ObjectKind::Finish, 20.0)]);
        let second = level("second", Vec::new());
        let mut g = started(vec![first, second]);
        g.press(Key::Right);
        for _ in 0..120 {
            g.frame(SIM_DT);
        }
        assert_eq!(g.state().phase, GamePhase::Complete);
        assert!(g.records().best("first").is_some());

        g.release(Key::Right);
        g.press(Key::Restart);
        g.frame(0.0);
        // Immediate assets: loading resolves within the same poll
        assert_eq!(g.level_index(), 1);
        assert_eq!(g.level().title(), "second");
        assert_eq!(g.state().phase, GamePhase::Playing);
    }

    struct BrokenAssets;

    impl AssetLoader for BrokenAssets {
        fn request(&mut self, assets: &[String]) -> Result<(), AssetError> {
            Err(AssetError::Missing(assets.first().cloned().unwrap_or_default()))
        }

        fn is_ready(&mut self) -> bool {
            false
        }
    }

    #[test]
    fn test_failed_assets_do_not_block_loading() {
        let first = level("first", Vec::new());
        let second = level("second", Vec::new());
        let mut g = game(vec![first, second]).with_assets(Box::new(BrokenAssets));
        g.command(Command::Start);
        g.state.phase = GamePhase::Complete;
        g.command(Command::NextLevel);
        assert_eq!(g.level_index(), 1);
        assert_eq!(g.state().phase, GamePhase::Playing);
    }

    #[test]
    fn test_playlist_end_returns_to_title() {
        let only = level("only", vec![LevelObject::new(ObjectKind::Finish, 20.0)]);
        let mut g = started(vec![only]);
        g.press(Key::Right);
        for _ in 0..120 {
            g.frame(SIM_DT);
        }
        assert_eq!(g.state().phase, GamePhase::Complete);
        assert_eq!(g.command(Command::NextLevel), Transition::BeginLoading);
        assert_eq!(g.state().phase, GamePhase::Title);
        assert_eq!(g.level_index(), 0);
    }

    #[test]
    fn test_bad_level_keeps_current() {
        let mut g = game(vec![level("keep", Vec::new())]);
        let err = g.load_level_json(r#"{"version": 1, "meta": {"virtualHeight": 400}, "segments": []}"#);
        assert!(matches!(err, Err(LevelError::EmptySegments)));
        assert_eq!(g.level().title(), "keep");

        let ok = r#"{"version": 1, "meta": {"title": "new", "virtualHeight": 400}, "segments": [90, 90, 90]}"#;
        g.command(Command::ToggleEditor);
        g.load_level_json(ok).unwrap();
        assert_eq!(g.level().title(), "new");
        assert_eq!(g.state().phase, GamePhase::Editor);
        g.command(Command::ToggleEditor);
        assert_eq!(g.state().phase, GamePhase::Title);
    }

    #[test]
    fn test_jump_tapped_while_paused_is_dropped() {
        let mut g = started(vec![level("a", Vec::new())]);
        g.frame(SIM_DT * 8.0);
        assert!(g.state().player.grounded);

        g.press(Key::Pause);
        g.frame(SIM_DT);
        g.release(Key::Pause);
        assert_eq!(g.state().phase, GamePhase::Paused);
        g.press(Key::Jump);
        g.frame(SIM_DT);
        g.release(Key::Jump);
        g.frame(SIM_DT);
        g.request_jump();
        g.frame(SIM_DT);

        g.press(Key::Pause);
        g.frame(0.0);
        assert_eq!(g.state().phase, GamePhase::Playing);
        g.drain_events();
        for _ in 0..10 {
            g.frame(SIM_DT);
        }
        assert!(!g.drain_events().contains(&GameEvent::Jumped));

        // A tap while playing still jumps
        g.press(Key::Jump);
        g.frame(SIM_DT);
        assert!(g.drain_events().contains(&GameEvent::Jumped));
    }

    #[test]
    fn test_pending_jump() {
        let mut g = started(vec![level("a", Vec::new())]);
        g.frame(SIM_DT * 30.0);
        g.request_jump();
        g.frame(SIM_DT);
        assert!(g.drain_events().contains(&GameEvent::Jumped));
    }
}
