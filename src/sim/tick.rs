//! Fixed timestep simulation tick
//!
//! Advances the sled against the heightmap: ground contact, slope drive,
//! boost, jumping, integration, gap edges, landings, objects, the avalanche
//! and the fall-out check, in that order.

use glam::Vec2;

use super::collision::{Aabb, circles_touch, gap_walls, marker_crossed, swept_hit};
use super::level::{Level, ObjectKind};
use super::respawn;
use super::state::{AnimState, Avalanche, CrashCause, GameEvent, GamePhase, GameState};
use crate::effects::{Feedback, ParticleKind, ParticleParams, Sound};
use crate::tuning::Tuning;

/// One key as seen by a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    pub down: bool,
    /// Went down since the last tick
    pub pressed: bool,
    /// Went up since the last tick
    pub released: bool,
}

impl KeyState {
    /// Held, no edge
    pub const HELD: Self = Self {
        down: true,
        pressed: false,
        released: false,
    };

    /// Pressed this tick
    pub const TAPPED: Self = Self {
        down: true,
        pressed: true,
        released: false,
    };

    pub fn press(&mut self) {
        if !self.down {
            self.pressed = true;
        }
        self.down = true;
    }

    pub fn release(&mut self) {
        if self.down {
            self.released = true;
        }
        self.down = false;
    }

    pub fn clear_edges(&mut self) {
        self.pressed = false;
        self.released = false;
    }
}

/// Named keys the core reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Jump,
    Brake,
    Boost,
    Restart,
    Pause,
    Editor,
}

/// Input snapshot for a single tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickInput {
    pub left: KeyState,
    pub right: KeyState,
    pub up: KeyState,
    pub down: KeyState,
    pub jump: KeyState,
    pub brake: KeyState,
    pub boost: KeyState,
    pub restart: KeyState,
    pub pause: KeyState,
    pub editor: KeyState,
}

impl TickInput {
    pub fn key(&self, key: Key) -> KeyState {
        match key {
            Key::Left => self.left,
            Key::Right => self.right,
            Key::Up => self.up,
            Key::Down => self.down,
            Key::Jump => self.jump,
            Key::Brake => self.brake,
            Key::Boost => self.boost,
            Key::Restart => self.restart,
            Key::Pause => self.pause,
            Key::Editor => self.editor,
        }
    }

    pub fn key_mut(&mut self, key: Key) -> &mut KeyState {
        match key {
            Key::Left => &mut self.left,
            Key::Right => &mut self.right,
            Key::Up => &mut self.up,
            Key::Down => &mut self.down,
            Key::Jump => &mut self.jump,
            Key::Brake => &mut self.brake,
            Key::Boost => &mut self.boost,
            Key::Restart => &mut self.restart,
            Key::Pause => &mut self.pause,
            Key::Editor => &mut self.editor,
        }
    }

    /// Drop pressed/released edges (once per tick, after the step)
    pub fn clear_edges(&mut self) {
        for key in [
            &mut self.left,
            &mut self.right,
            &mut self.up,
            &mut self.down,
            &mut self.jump,
            &mut self.brake,
            &mut self.boost,
            &mut self.restart,
            &mut self.pause,
            &mut self.editor,
        ] {
            key.clear_edges();
        }
    }

    #[inline]
    pub fn forward(&self) -> bool {
        self.right.down
    }

    /// Back, down and brake all brake
    #[inline]
    pub fn braking(&self) -> bool {
        self.left.down || self.down.down || self.brake.down
    }

    /// Forward doubles as the boost key
    #[inline]
    pub fn boost_requested(&self) -> bool {
        (self.right.down || self.boost.down) && !self.braking()
    }

    #[inline]
    pub fn jump_pressed(&self) -> bool {
        self.jump.pressed || self.up.pressed
    }

    #[inline]
    pub fn jump_held(&self) -> bool {
        self.jump.down || self.up.down
    }

    #[inline]
    pub fn jump_released(&self) -> bool {
        self.jump.released || self.up.released
    }
}

/// Terrain under both feet
#[derive(Debug, Clone, Copy)]
struct Contact {
    back: f32,
    front: f32,
}

impl Contact {
    #[inline]
    fn surface(&self) -> f32 {
        (self.back + self.front) * 0.5
    }
}

/// Advance the game state by one fixed timestep
pub fn tick(
    state: &mut GameState,
    level: &Level,
    tuning: &Tuning,
    input: &TickInput,
    dt: f32,
    fx: &mut Feedback<'_>,
) {
    if state.phase != GamePhase::Playing {
        return;
    }

    state.time_ticks += 1;
    state.elapsed += dt;

    // Timers
    state.timers.decay(dt);
    state.player.invuln_timer = (state.player.invuln_timer - dt).max(0.0);
    state.player.was_grounded = state.player.grounded;
    if input.jump_released() {
        state.timers.jump_hold = 0.0;
    }

    let prev = Vec2::new(state.player.x, state.player.y);

    // Ground contact
    match ground_contact(state, level, tuning) {
        Some(contact) => settle_on_ground(state, tuning, contact, fx),
        None => fly(state, tuning, input, dt),
    }
    update_boost(state, tuning, input, dt, fx);
    if state.player.grounded {
        drive(state, level, tuning, input, dt);
    }

    try_jump(state, tuning, input, fx);

    // Semi-implicit Euler
    let p = &mut state.player;
    p.vx = p.vx.clamp(-tuning.max_speed, tuning.max_speed);
    p.x += p.vx * dt;
    p.y += p.vy * dt;

    check_gap_edges(state, level, tuning, prev, fx);
    check_landing(state, level, tuning, dt, fx);
    resolve_objects(state, level, tuning, prev, fx);
    advance_avalanche(state, level, tuning, dt, fx);

    if state.player.y > level.fall_limit(tuning.fall_margin) {
        crash(state, tuning, CrashCause::Fall, fx);
    }

    update_cosmetics(state, tuning, dt, fx);
}

/// Two-point contact with hysteresis: both feet need ground, and the body must
/// either have been grounded last tick or be close to the surface.
fn ground_contact(state: &GameState, level: &Level, tuning: &Tuning) -> Option<Contact> {
    if state.timers.jump_lock > 0.0 {
        return None;
    }
    let p = &state.player;
    let contact = Contact {
        back: level.terrain.height_at(p.x - tuning.half_width)?,
        front: level.terrain.height_at(p.x + tuning.half_width)?,
    };
    // Positive: feet above the surface
    let gap = contact.surface() - (p.y + tuning.feet_offset);
    let near = gap <= tuning.near_ground && gap >= -tuning.ground_snap;
    let held = p.was_grounded && gap.abs() <= tuning.ground_snap;
    (near || held).then_some(contact)
}

fn settle_on_ground(state: &mut GameState, tuning: &Tuning, contact: Contact, fx: &mut Feedback<'_>) {
    let p = &mut state.player;
    let impact = p.vy;
    p.y = contact.surface() - tuning.feet_offset;
    p.vy = 0.0;
    p.angle = (contact.front - contact.back).atan2(2.0 * tuning.half_width);
    p.grounded = true;
    state.timers.coyote = tuning.coyote_time;
    if !p.was_grounded {
        on_landing(state, tuning, impact, fx);
    }
}

fn fly(state: &mut GameState, tuning: &Tuning, input: &TickInput, dt: f32) {
    let holding = state.timers.jump_hold > 0.0 && input.jump_held();
    let gravity = if holding {
        tuning.gravity * tuning.jump_hold_gravity_scale
    } else {
        tuning.gravity
    };
    let p = &mut state.player;
    p.grounded = false;
    p.vy += gravity * dt;
    p.vx *= (1.0 - tuning.air_drag * dt).max(0.0);
    p.angle -= p.angle * (tuning.air_angle_ease * dt).min(1.0);
}

/// Ground motion model: slope, motor assist, thrust, brake, friction, deadzone, caps
fn drive(state: &mut GameState, level: &Level, tuning: &Tuning, input: &TickInput, dt: f32) {
    let forward = input.forward();
    let braking = input.braking();
    let boosting = state.boost.active;
    let p = &mut state.player;

    let slope = level
        .terrain
        .slope_at(p.x)
        .unwrap_or(0.0)
        .clamp(-tuning.max_slope, tuning.max_slope);

    let mut accel = tuning.gravity * slope / (1.0 + slope * slope).sqrt();
    accel *= if slope > 0.0 {
        tuning.downhill_scale
    } else {
        tuning.uphill_scale
    };
    // The slope never speeds up a braking sled
    if braking && (p.vx == 0.0 || accel.signum() == p.vx.signum()) {
        accel = 0.0;
    }
    p.vx += accel * dt;

    let target = tuning.target_speed(boosting, braking);
    if (forward || p.vx > tuning.deadzone_speed) && p.vx < target {
        p.vx = (p.vx + tuning.motor_assist * dt).min(target);
    }
    if forward && p.vx < target + tuning.thrust_hysteresis {
        p.vx += tuning.thrust * dt;
    }
    if braking {
        let speed = (p.vx.abs() - tuning.brake_decel * dt).max(0.0);
        p.vx = speed.copysign(p.vx);
    }

    let downhill = slope * p.vx > 0.0;
    let friction = if downhill {
        tuning.friction_downhill
    } else {
        tuning.friction_flat
    };
    p.vx *= (1.0 - friction * dt).max(0.0);

    if !forward
        && !braking
        && slope.abs() < tuning.deadzone_slope
        && p.vx.abs() < tuning.deadzone_speed
    {
        p.vx = 0.0;
    }

    let mut speed = p.vx.abs();
    if speed > tuning.soft_cap_speed {
        let over = speed - tuning.soft_cap_speed;
        speed = (speed - tuning.soft_cap_drag * over * over * dt).max(tuning.soft_cap_speed);
    }
    p.vx = speed.min(tuning.max_speed).copysign(p.vx);
}

/// Stamina drains while boosting; an empty tank locks boost until it is full again
fn update_boost(
    state: &mut GameState,
    tuning: &Tuning,
    input: &TickInput,
    dt: f32,
    fx: &mut Feedback<'_>,
) {
    let tick = state.time_ticks;
    let grounded = state.player.grounded;
    let boost = &mut state.boost;
    let boosting = grounded && input.boost_requested() && !boost.locked && boost.stamina > 0.0;

    if boosting && !boost.active {
        fx.event(tick, GameEvent::BoostStarted);
        fx.play(Sound::Boost);
    }
    boost.active = boosting;

    if boosting {
        boost.stamina -= tuning.boost_depletion_rate * dt;
        if tick % 4 == 0 {
            fx.particles(
                state.player.x - tuning.half_width,
                state.player.y + tuning.feet_offset,
                ParticleKind::Trail,
                ParticleParams::new(2, 60.0, 0.4),
            );
        }
        if boost.stamina <= 0.0 {
            boost.stamina = 0.0;
            boost.locked = true;
            state.timers.boost_refill_block = tuning.boost_refill_delay;
            fx.event(tick, GameEvent::BoostDepleted);
        }
    } else if state.timers.boost_refill_block <= 0.0
        && (grounded || !input.forward())
        && boost.stamina < 1.0
    {
        boost.stamina += tuning.boost_refill_rate * dt;
        if boost.stamina >= 1.0 {
            boost.stamina = 1.0;
            if boost.locked {
                boost.locked = false;
                state.timers.boost_full = tuning.boost_full_display;
                fx.event(tick, GameEvent::BoostRefilled);
            }
        }
    }
}

/// Buffered, coyote-tolerant jump
fn try_jump(state: &mut GameState, tuning: &Tuning, input: &TickInput, fx: &mut Feedback<'_>) {
    if input.jump_pressed() || state.pending_jump {
        state.timers.jump_buffer = tuning.jump_buffer_time;
        state.pending_jump = false;
    }

    let t = &mut state.timers;
    if t.jump_buffer > 0.0 && t.coyote > 0.0 && t.jump_lock <= 0.0 {
        t.coyote = 0.0;
        t.jump_buffer = 0.0;
        t.jump_hold = tuning.jump_hold_time;
        t.jump_lock = tuning.jump_lock_time;

        let p = &mut state.player;
        p.vy = -tuning.jump_impulse;
        p.grounded = false;

        fx.event(state.time_ticks, GameEvent::Jumped);
        fx.play(Sound::Jump);
        fx.particles(
            p.x,
            p.y + tuning.feet_offset,
            ParticleKind::Snow,
            ParticleParams::new(6, 80.0, 0.8),
        );
    }
}

/// Walls at gap lips kill a body that runs into them while dropping
fn check_gap_edges(
    state: &mut GameState,
    level: &Level,
    tuning: &Tuning,
    prev: Vec2,
    fx: &mut Feedback<'_>,
) {
    let p = &state.player;
    // Contact was taken before integration; re-check it where the body is now
    let supported = level.terrain.height_at(p.x - tuning.half_width).is_some()
        && level.terrain.height_at(p.x + tuning.half_width).is_some();
    if p.grounded && supported {
        return;
    }
    let prev_box = Aabb::body(prev.x, prev.y, tuning);
    let cur_box = Aabb::body(p.x, p.y, tuning);
    let feet = p.y + tuning.feet_offset;
    let descending = p.vy >= 0.0;

    let walls = gap_walls(
        &level.terrain,
        prev.x.min(p.x) - tuning.half_width,
        prev.x.max(p.x) + tuning.half_width,
        level.fall_limit(tuning.fall_margin),
        tuning.gap_wall_thickness,
    );
    let hit = walls.iter().any(|wall| {
        swept_hit(&prev_box, &cur_box, &wall.bounds)
            && (descending || feet >= wall.surface + tuning.gap_wall_tolerance)
    });
    if hit {
        crash(state, tuning, CrashCause::GapWall, fx);
    }
}

/// Snap a falling body that reached the surface this tick
fn check_landing(
    state: &mut GameState,
    level: &Level,
    tuning: &Tuning,
    dt: f32,
    fx: &mut Feedback<'_>,
) {
    if state.phase != GamePhase::Playing {
        return;
    }
    let p = &state.player;
    if p.grounded || p.vy < 0.0 || state.timers.jump_lock > 0.0 {
        return;
    }
    let Some(ground) = level.terrain.height_at(p.x) else {
        return;
    };
    let depth = p.y + tuning.feet_offset - ground;
    if depth < 0.0 || depth > p.vy * dt + tuning.near_ground {
        return;
    }

    let p = &mut state.player;
    let impact = p.vy;
    p.y = ground - tuning.feet_offset;
    p.vy = 0.0;
    p.grounded = true;
    state.timers.coyote = tuning.coyote_time;
    on_landing(state, tuning, impact, fx);
}

fn on_landing(state: &mut GameState, tuning: &Tuning, impact: f32, fx: &mut Feedback<'_>) {
    let hard = impact >= tuning.hard_landing_speed;
    fx.event(state.time_ticks, GameEvent::Landed { impact, hard });
    if hard {
        let p = &state.player;
        state.timers.landing_flash = tuning.landing_flash_time;
        state.shake.kick(tuning.landing_shake, tuning.landing_shake_time);
        fx.shake(tuning.landing_shake, tuning.landing_shake_time);
        fx.particles(
            p.x,
            p.y + tuning.feet_offset,
            ParticleKind::Snow,
            ParticleParams::new(12, impact * 0.3, 1.2),
        );
        fx.play(Sound::Land);
    }
}

/// Checkpoints, finish line and lethal objects
pub(crate) fn resolve_objects(
    state: &mut GameState,
    level: &Level,
    tuning: &Tuning,
    prev: Vec2,
    fx: &mut Feedback<'_>,
) {
    for obj in level.objects() {
        if state.phase != GamePhase::Playing {
            return;
        }
        let p = &state.player;
        let pos = Vec2::new(p.x, p.y);
        let ox = level.object_x(obj);

        match obj.kind {
            ObjectKind::Checkpoint => {
                if marker_crossed(prev.x, p.x, ox) && ox > state.furthest_checkpoint_x {
                    state.furthest_checkpoint_x = ox;
                    fx.event(state.time_ticks, GameEvent::CheckpointReached { x: ox });
                    fx.play(Sound::Checkpoint);
                    fx.particles(ox, p.y, ParticleKind::Sparkle, ParticleParams::new(16, 120.0, 3.1));
                    log::info!("Checkpoint reached at x={:.0}", ox);
                }
            }
            ObjectKind::Finish => {
                if marker_crossed(prev.x, p.x, ox) {
                    state.reached_finish = true;
                    state.phase = GamePhase::Complete;
                    state.boost.active = false;
                    fx.event(state.time_ticks, GameEvent::Finished { time: state.elapsed });
                    fx.play(Sound::Finish);
                    fx.particles(ox, p.y, ParticleKind::Sparkle, ParticleParams::new(32, 160.0, 3.1));
                    log::info!("Finished in {:.2}s ({} crashes)", state.elapsed, state.deaths);
                }
            }
            ObjectKind::Hazard => {
                let Some(oy) = level.object_y(obj) else {
                    continue;
                };
                let radius = obj.radius.unwrap_or(tuning.hazard_radius);
                if circles_touch(pos, tuning.half_width, Vec2::new(ox, oy), radius) {
                    hit_lethal(state, tuning, CrashCause::Hazard, fx);
                }
            }
            ObjectKind::Wall | ObjectKind::Collider => {
                let Some(oy) = level.object_y(obj) else {
                    continue;
                };
                let (w, h, cause) = if obj.kind == ObjectKind::Wall {
                    (
                        obj.width.unwrap_or(tuning.wall_width),
                        obj.height.unwrap_or(tuning.wall_height),
                        CrashCause::Wall,
                    )
                } else {
                    (
                        obj.width.unwrap_or(tuning.collider_width),
                        obj.height.unwrap_or(tuning.collider_height),
                        CrashCause::Collider,
                    )
                };
                let rect = Aabb::standing(ox, oy, w, h);
                if Aabb::body(p.x, p.y, tuning).overlaps(&rect) {
                    hit_lethal(state, tuning, cause, fx);
                }
            }
            ObjectKind::Start | ObjectKind::Decor | ObjectKind::Sign => {}
        }
    }
}

fn hit_lethal(state: &mut GameState, tuning: &Tuning, cause: CrashCause, fx: &mut Feedback<'_>) {
    if !state.player.is_invulnerable() {
        crash(state, tuning, cause, fx);
    }
}

/// Spawn the avalanche lazily, move it, and catch a body that falls behind
fn advance_avalanche(
    state: &mut GameState,
    level: &Level,
    tuning: &Tuning,
    dt: f32,
    fx: &mut Feedback<'_>,
) {
    if !level.has_avalanche() {
        return;
    }
    if state.avalanche.is_none() {
        let home = state.avalanche_home(tuning.avalanche_start_offset);
        state.avalanche = Some(Avalanche::new(home, level.meta.avalanche_speed));
        fx.event(state.time_ticks, GameEvent::AvalancheSpawned { x: home });
    }
    let Some(av) = state.avalanche.as_mut() else {
        return;
    };
    if av.active {
        av.x += av.speed * dt;
    }
    let caught = av.active && state.player.x < av.x + tuning.avalanche_width;
    if caught {
        crash(state, tuning, CrashCause::Avalanche, fx);
    }
}

/// The one death transition. Returns false when already dead or finished.
pub fn crash(state: &mut GameState, tuning: &Tuning, cause: CrashCause, fx: &mut Feedback<'_>) -> bool {
    if state.phase != GamePhase::Playing || state.reached_finish {
        return false;
    }
    state.phase = GamePhase::Dead;
    state.last_crash = Some(cause);
    state.deaths += 1;
    state.timers.crash = tuning.crash_time;
    state.boost.active = false;
    state.player.visible = false;
    state.shake.kick(tuning.crash_shake, tuning.crash_shake_time);

    if cause == CrashCause::Avalanche {
        state.force_full_restart = true;
    } else {
        respawn::stash_avalanche(state);
    }

    let (x, y) = (state.player.x, state.player.y);
    fx.event(state.time_ticks, GameEvent::Crashed { cause });
    fx.play(Sound::Crash);
    fx.shake(tuning.crash_shake, tuning.crash_shake_time);
    fx.particles(x, y, ParticleKind::Debris, ParticleParams::new(24, 220.0, 3.1));
    log::info!("Crashed ({:?}) at x={:.0}", cause, x);
    true
}

/// Animation state, shake decay and the speed-burst edge
fn update_cosmetics(state: &mut GameState, tuning: &Tuning, dt: f32, fx: &mut Feedback<'_>) {
    let p = &state.player;
    state.anim = if p.grounded {
        if p.vx.abs() < tuning.deadzone_speed {
            AnimState::Idle
        } else {
            AnimState::Run
        }
    } else if p.vy < 0.0 {
        AnimState::Jump
    } else {
        AnimState::Fall
    };
    fx.animate(state.anim, dt);
    state.shake.advance(dt);

    let fast = state.phase == GamePhase::Playing && p.vx.abs() >= tuning.speed_burst_speed;
    if fast && !state.fast {
        fx.event(state.time_ticks, GameEvent::SpeedBurst);
        fx.play(Sound::Speed);
        fx.particles(p.x, p.y, ParticleKind::Wind, ParticleParams::new(8, p.vx.abs() * 0.5, 0.2));
    }
    state.fast = fast;
}
