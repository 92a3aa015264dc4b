//! Respawn placement and avalanche carry-over between lives

use super::level::Level;
use super::state::{Avalanche, Boost, GamePhase, GameState, Player, SavedFront, Shake, Timers};
use crate::tuning::Tuning;

/// Remember where the avalanche was when the player died, if a reached
/// checkpoint is still ahead of it. Anything else forgets the old front.
pub fn stash_avalanche(state: &mut GameState) {
    let checkpoint = state.furthest_checkpoint_x;
    let ahead = state.has_checkpoint();
    if let Some(av) = state.avalanche.as_mut() {
        av.saved = (ahead && av.x < checkpoint).then_some(SavedFront {
            x: av.x,
            speed: av.speed,
        });
    }
}

/// Where the avalanche should be for a respawn at `target`
fn resolve_avalanche(state: &GameState, level: &Level, tuning: &Tuning, full: bool, target: f32) -> Option<Avalanche> {
    if !level.has_avalanche() {
        return None;
    }
    let fresh = Avalanche::new(
        state.avalanche_home(tuning.avalanche_start_offset),
        level.meta.avalanche_speed,
    );
    if full || !state.has_checkpoint() {
        return Some(fresh);
    }
    let saved = state.avalanche.as_ref().and_then(|av| av.saved);
    match saved {
        // A front already on top of the checkpoint would kill on arrival
        Some(front) if front.x + tuning.avalanche_width < target => Some(Avalanche::new(front.x, front.speed)),
        _ => Some(fresh),
    }
}

/// First spot at or after `x` where both feet have ground
fn footing(level: &Level, tuning: &Tuning, x: f32) -> f32 {
    let terrain = &level.terrain;
    let first = terrain.ground_at_or_after(x).unwrap_or(x);
    let mut probe = first;
    while probe <= terrain.world_width() {
        if terrain.height_at(probe - tuning.half_width).is_some()
            && terrain.height_at(probe + tuning.half_width).is_some()
        {
            return probe;
        }
        probe += terrain.segment_len();
    }
    first
}

/// Put the player back into play at the start or the furthest checkpoint.
///
/// `full` forces a restart from the level start; a pending forced restart
/// (after an avalanche death) does the same.
pub fn respawn(state: &mut GameState, level: &Level, tuning: &Tuning, full: bool) {
    let full = full || state.force_full_restart;
    if full {
        state.furthest_checkpoint_x = state.start_x;
        state.elapsed = 0.0;
        state.deaths = 0;
    }
    let target = if full {
        state.start_x
    } else {
        state.furthest_checkpoint_x
    };

    state.avalanche = resolve_avalanche(state, level, tuning, full, target);

    let x = footing(level, tuning, target);
    let ground = level.terrain.height_at(x).unwrap_or(0.0);
    state.player = Player::spawn(
        x,
        ground - tuning.feet_offset - tuning.respawn_lift,
        tuning.respawn_invulnerability,
    );
    state.timers = Timers::default();
    state.boost = Boost::default();
    state.shake = Shake::default();
    state.force_full_restart = false;
    state.reached_finish = false;
    state.pending_jump = false;
    state.fast = false;
    state.last_crash = None;
    state.phase = GamePhase::Playing;

    log::info!(
        "Respawn at x={:.0} ({}), avalanche {:?}",
        x,
        if full { "full restart" } else { "checkpoint" },
        state.avalanche.as_ref().map(|av| av.x)
    );
}
