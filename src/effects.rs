//! Fire-and-forget feedback: sound, shake, particles, animation, diagnostics
//!
//! The simulation talks to its collaborators only through [`Feedback`]. Every
//! collaborator failure is caught and logged here, so a missing sound device
//! never reaches the physics.

use thiserror::Error;

use crate::settings::Settings;
use crate::sim::state::{AnimState, GameEvent};

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sound {
    Jump,
    Land,
    Crash,
    Checkpoint,
    Boost,
    /// Crossed into high speed
    Speed,
    Finish,
}

/// Particle flavours the renderer knows how to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleKind {
    /// Landing spray
    Snow,
    /// Crash debris
    Debris,
    /// Checkpoint/finish sparkle
    Sparkle,
    /// Boost trail
    Trail,
    /// Speed streaks
    Wind,
}

/// Emission parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleParams {
    pub count: u32,
    pub speed: f32,
    /// Cone half-angle (radians)
    pub spread: f32,
}

impl ParticleParams {
    pub const fn new(count: u32, speed: f32, spread: f32) -> Self {
        Self {
            count,
            speed,
            spread,
        }
    }
}

/// A collaborator failed to deliver an effect
#[derive(Debug, Error)]
pub enum EffectError {
    #[error("sound {0:?} is not loaded")]
    SoundUnavailable(Sound),

    #[error("audio device busy")]
    DeviceBusy,

    #[error("effects backend error: {0}")]
    Backend(String),
}

/// Audio / camera / particle backend
pub trait EffectsSink {
    fn play(&mut self, sound: Sound, volume: f32) -> Result<(), EffectError>;
    fn shake(&mut self, strength: f32, duration: f32) -> Result<(), EffectError>;
    fn emit_particles(
        &mut self,
        x: f32,
        y: f32,
        kind: ParticleKind,
        params: ParticleParams,
    ) -> Result<(), EffectError>;
}

/// Sprite animation backend
pub trait AnimationSink {
    fn set_animation_state(&mut self, state: AnimState);
    fn advance(&mut self, dt: f32);
}

/// Optional per-event diagnostics hook
pub trait Diagnostics {
    fn record(&mut self, tick: u64, event: &GameEvent);
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEffects;

impl EffectsSink for NullEffects {
    fn play(&mut self, _sound: Sound, _volume: f32) -> Result<(), EffectError> {
        Ok(())
    }

    fn shake(&mut self, _strength: f32, _duration: f32) -> Result<(), EffectError> {
        Ok(())
    }

    fn emit_particles(
        &mut self,
        _x: f32,
        _y: f32,
        _kind: ParticleKind,
        _params: ParticleParams,
    ) -> Result<(), EffectError> {
        Ok(())
    }
}

impl AnimationSink for NullEffects {
    fn set_animation_state(&mut self, _state: AnimState) {}

    fn advance(&mut self, _dt: f32) {}
}

/// Diagnostics sink that writes every event to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn record(&mut self, tick: u64, event: &GameEvent) {
        log::debug!("[tick {}] {:?}", tick, event);
    }
}

/// The single boundary between the simulation and its collaborators
pub struct Feedback<'a> {
    effects: Option<&'a mut dyn EffectsSink>,
    animation: Option<&'a mut dyn AnimationSink>,
    diagnostics: Option<&'a mut dyn Diagnostics>,
    shake_enabled: bool,
    particles_enabled: bool,
    volume: f32,
    last_anim: Option<AnimState>,
    events: Vec<GameEvent>,
}

impl Default for Feedback<'_> {
    fn default() -> Self {
        Self::silent()
    }
}

impl<'a> Feedback<'a> {
    /// No collaborators at all; events are still collected
    pub fn silent() -> Self {
        let defaults = Settings::default();
        Self {
            effects: None,
            animation: None,
            diagnostics: None,
            shake_enabled: defaults.effective_screen_shake(),
            particles_enabled: defaults.particles,
            volume: defaults.effective_volume(),
            last_anim: None,
            events: Vec::new(),
        }
    }

    pub fn new(effects: &'a mut dyn EffectsSink, animation: &'a mut dyn AnimationSink) -> Self {
        Self {
            effects: Some(effects),
            animation: Some(animation),
            ..Self::silent()
        }
    }

    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.shake_enabled = settings.effective_screen_shake();
        self.particles_enabled = settings.particles;
        self.volume = settings.effective_volume();
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: &'a mut dyn Diagnostics) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    pub fn play(&mut self, sound: Sound) {
        if self.volume <= 0.0 {
            return;
        }
        if let Some(fx) = self.effects.as_deref_mut() {
            if let Err(e) = fx.play(sound, self.volume) {
                log::debug!("play {:?} dropped: {}", sound, e);
            }
        }
    }

    pub fn shake(&mut self, strength: f32, duration: f32) {
        if !self.shake_enabled {
            return;
        }
        if let Some(fx) = self.effects.as_deref_mut() {
            if let Err(e) = fx.shake(strength, duration) {
                log::debug!("shake dropped: {}", e);
            }
        }
    }

    pub fn particles(&mut self, x: f32, y: f32, kind: ParticleKind, params: ParticleParams) {
        if !self.particles_enabled {
            return;
        }
        if let Some(fx) = self.effects.as_deref_mut() {
            if let Err(e) = fx.emit_particles(x, y, kind, params) {
                log::debug!("{:?} particles dropped: {}", kind, e);
            }
        }
    }

    /// Forward the derived animation state (only on change) and advance playback
    pub fn animate(&mut self, state: AnimState, dt: f32) {
        if let Some(anim) = self.animation.as_deref_mut() {
            if self.last_anim != Some(state) {
                anim.set_animation_state(state);
            }
            anim.advance(dt);
        }
        self.last_anim = Some(state);
    }

    /// Report a gameplay event
    pub fn event(&mut self, tick: u64, event: GameEvent) {
        if let Some(diag) = self.diagnostics.as_deref_mut() {
            diag.record(tick, &event);
        }
        self.events.push(event);
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Hand collected events to the caller
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording fakes for simulation tests

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Play(Sound),
        Shake,
        Particles(ParticleKind),
    }

    #[derive(Debug, Default)]
    pub struct Recorder {
        pub calls: Vec<Call>,
        pub anim_states: Vec<AnimState>,
        pub advanced: f32,
        /// Fail every call, like a missing audio device
        pub broken: bool,
    }

    impl Recorder {
        pub fn broken() -> Self {
            Self {
                broken: true,
                ..Default::default()
            }
        }

        pub fn count(&self, call: &Call) -> usize {
            self.calls.iter().filter(|c| *c == call).count()
        }

        fn log(&mut self, call: Call) -> Result<(), EffectError> {
            self.calls.push(call);
            if self.broken {
                Err(EffectError::DeviceBusy)
            } else {
                Ok(())
            }
        }
    }

    impl EffectsSink for Recorder {
        fn play(&mut self, sound: Sound, _volume: f32) -> Result<(), EffectError> {
            self.log(Call::Play(sound))
        }

        fn shake(&mut self, _strength: f32, _duration: f32) -> Result<(), EffectError> {
            self.log(Call::Shake)
        }

        fn emit_particles(
            &mut self,
            _x: f32,
            _y: f32,
            kind: ParticleKind,
            _params: ParticleParams,
        ) -> Result<(), EffectError> {
            self.log(Call::Particles(kind))
        }
    }

    impl AnimationSink for Recorder {
        fn set_animation_state(&mut self, state: AnimState) {
            self.anim_states.push(state);
        }

        fn advance(&mut self, dt: f32) {
            self.advanced += dt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::Recorder;
    use super::*;

    #[test]
    fn test_failures_are_swallowed() {
        let mut fx = Recorder::broken();
        let mut anim = NullEffects;
        let mut feedback = Feedback::new(&mut fx, &mut anim);
        feedback.play(Sound::Crash);
        feedback.shake(1.0, 0.5);
        feedback.particles(0.0, 0.0, ParticleKind::Debris, ParticleParams::new(4, 10.0, 1.0));
        drop(feedback);
        assert_eq!(fx.calls.len(), 3);
    }

    #[test]
    fn test_settings_gate_effects() {
        let mut fx = Recorder::default();
        let mut anim = NullEffects;
        let settings = Settings {
            reduced_motion: true,
            particles: false,
            muted: true,
            ..Default::default()
        };
        let mut feedback = Feedback::new(&mut fx, &mut anim).with_settings(&settings);
        feedback.play(Sound::Jump);
        feedback.shake(1.0, 0.5);
        feedback.particles(0.0, 0.0, ParticleKind::Snow, ParticleParams::new(4, 10.0, 1.0));
        drop(feedback);
        assert!(fx.calls.is_empty());
    }

    #[test]
    fn test_animation_state_forwarded_on_change() {
        let mut fx = NullEffects;
        let mut anim = Recorder::default();
        let mut feedback = Feedback::new(&mut fx, &mut anim);
        feedback.animate(AnimState::Run, 0.1);
        feedback.animate(AnimState::Run, 0.1);
        feedback.animate(AnimState::Jump, 0.1);
        drop(feedback);
        assert_eq!(anim.anim_states, vec![AnimState::Run, AnimState::Jump]);
        assert!((anim.advanced - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_events_collected() {
        let mut feedback = Feedback::silent();
        feedback.event(3, GameEvent::Jumped);
        feedback.event(4, GameEvent::BoostStarted);
        assert_eq!(feedback.events().len(), 2);
        assert_eq!(
            feedback.take_events(),
            vec![GameEvent::Jumped, GameEvent::BoostStarted]
        );
        assert!(feedback.events().is_empty());
    }
}
