//! Top-level phase transitions driven by outer input
//!
//! Crashes and the finish line change the phase from inside the tick; every
//! other transition goes through [`apply`].

use super::level::Level;
use super::respawn::respawn;
use super::state::{GamePhase, GameState};
use crate::tuning::Tuning;

/// Commands the driver issues between ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    TogglePause,
    /// Retry after a crash
    Restart,
    /// Leave a completed level for the next one
    NextLevel,
    /// Next level's assets finished loading
    AssetsReady,
    ToggleEditor,
}

/// What a command did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Not valid in the current phase
    Ignored,
    Changed { from: GamePhase, to: GamePhase },
    /// Respawned into `Playing`
    Respawned { full: bool },
    /// Entered `Loading`; the driver must swap levels and fetch assets
    BeginLoading,
}

impl Transition {
    pub fn is_change(&self) -> bool {
        !matches!(self, Transition::Ignored)
    }
}

/// Apply a command to the state machine
pub fn apply(state: &mut GameState, level: &Level, tuning: &Tuning, command: Command) -> Transition {
    let from = state.phase;

    if command == Command::ToggleEditor {
        let to = match state.editor_return.take() {
            Some(prior) if from == GamePhase::Editor => prior,
            _ if from == GamePhase::Editor => GamePhase::Title,
            _ => {
                state.editor_return = Some(from);
                GamePhase::Editor
            }
        };
        return change(state, from, to);
    }

    match (from, command) {
        (GamePhase::Editor, _) => Transition::Ignored,
        (GamePhase::Title, Command::Start) => {
            respawn(state, level, tuning, true);
            Transition::Respawned { full: true }
        }
        (GamePhase::Playing, Command::Pause | Command::TogglePause) => {
            change(state, from, GamePhase::Paused)
        }
        (GamePhase::Paused, Command::Resume | Command::TogglePause) => {
            change(state, from, GamePhase::Playing)
        }
        (GamePhase::Dead, Command::Restart) => {
            let full = state.force_full_restart;
            respawn(state, level, tuning, false);
            Transition::Respawned { full }
        }
        (GamePhase::Complete, Command::NextLevel) => {
            state.phase = GamePhase::Loading;
            log::info!("Phase {:?} -> {:?}", from, GamePhase::Loading);
            Transition::BeginLoading
        }
        (GamePhase::Loading, Command::AssetsReady) => {
            respawn(state, level, tuning, true);
            Transition::Respawned { full: true }
        }
        _ => Transition::Ignored,
    }
}

fn change(state: &mut GameState, from: GamePhase, to: GamePhase) -> Transition {
    state.phase = to;
    log::info!("Phase {:?} -> {:?}", from, to);
    Transition::Changed { from, to }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::LevelMeta;

    fn setup() -> (GameState, Level, Tuning) {
        let level = Level::new(LevelMeta::default(), vec![Some(100.0); 40], Vec::new()).unwrap();
        (GameState::new(&level), level, Tuning::default())
    }

    #[test]
    fn test_start_and_pause() {
        let (mut state, level, tuning) = setup();
        assert_eq!(
            apply(&mut state, &level, &tuning, Command::Pause),
            Transition::Ignored
        );
        assert_eq!(
            apply(&mut state, &level, &tuning, Command::Start),
            Transition::Respawned { full: true }
        );
        assert_eq!(state.phase, GamePhase::Playing);
        apply(&mut state, &level, &tuning, Command::TogglePause);
        assert_eq!(state.phase, GamePhase::Paused);
        apply(&mut state, &level, &tuning, Command::Resume);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(
            apply(&mut state, &level, &tuning, Command::Resume),
            Transition::Ignored
        );
    }

    #[test]
    fn test_restart_only_when_dead() {
        let (mut state, level, tuning) = setup();
        apply(&mut state, &level, &tuning, Command::Start);
        assert!(!apply(&mut state, &level, &tuning, Command::Restart).is_change());
        state.phase = GamePhase::Dead;
        state.force_full_restart = true;
        assert_eq!(
            apply(&mut state, &level, &tuning, Command::Restart),
            Transition::Respawned { full: true }
        );
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_next_level_loads_then_plays() {
        let (mut state, level, tuning) = setup();
        state.phase = GamePhase::Complete;
        state.reached_finish = true;
        assert_eq!(
            apply(&mut state, &level, &tuning, Command::NextLevel),
            Transition::BeginLoading
        );
        assert_eq!(state.phase, GamePhase::Loading);
        apply(&mut state, &level, &tuning, Command::AssetsReady);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(!state.reached_finish);
    }

    #[test]
    fn test_editor_overlay_returns_to_prior_phase() {
        let (mut state, level, tuning) = setup();
        state.phase = GamePhase::Dead;
        apply(&mut state, &level, &tuning, Command::ToggleEditor);
        assert_eq!(state.phase, GamePhase::Editor);
        // Other commands are swallowed while editing
        assert_eq!(
            apply(&mut state, &level, &tuning, Command::Restart),
            Transition::Ignored
        );
        assert_eq!(
            apply(&mut state, &level, &tuning, Command::ToggleEditor),
            Transition::Changed {
                from: GamePhase::Editor,
                to: GamePhase::Dead
            }
        );
        assert_eq!(state.editor_return, None);
    }
}
