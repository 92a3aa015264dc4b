//! Data-driven game balance
//!
//! Every physics constant the simulation step reads lives in [`Tuning`].
//! Tests swap in alternate tunings; the binary can load one from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Physics and gameplay tuning constants (world units are pixels, Y grows down)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Body ===
    /// Horizontal distance from the origin to each foot sample
    pub half_width: f32,
    /// Vertical distance from the origin down to the contact point
    pub feet_offset: f32,
    /// Collision box height, measured up from the feet
    pub body_height: f32,
    /// Max gap between feet and surface for an airborne body to ground
    pub near_ground: f32,
    /// Max distance a grounded body is pulled down to follow the terrain
    pub ground_snap: f32,

    // === Gravity / air ===
    pub gravity: f32,
    /// Gravity multiplier while the jump key is held inside the hold window
    pub jump_hold_gravity_scale: f32,
    /// Horizontal drag while airborne (fraction of speed per second)
    pub air_drag: f32,
    /// How fast the cosmetic angle eases back to level in the air (1/s)
    pub air_angle_ease: f32,

    // === Slope ===
    pub max_slope: f32,
    pub downhill_scale: f32,
    pub uphill_scale: f32,

    // === Ground drive ===
    /// Cruise speed the motor assist pulls toward
    pub base_speed: f32,
    pub boost_multiplier: f32,
    pub brake_multiplier: f32,
    /// Max motor assist acceleration
    pub motor_assist: f32,
    /// Manual forward thrust acceleration
    pub thrust: f32,
    /// Thrust stays on until speed exceeds target by this much
    pub thrust_hysteresis: f32,
    pub brake_decel: f32,
    /// Friction while moving downhill (fraction of speed per second)
    pub friction_downhill: f32,
    /// Friction on flat ground or uphill (fraction of speed per second)
    pub friction_flat: f32,
    pub deadzone_speed: f32,
    pub deadzone_slope: f32,
    /// Quadratic resistance kicks in above this speed
    pub soft_cap_speed: f32,
    pub soft_cap_drag: f32,
    /// Absolute speed limit
    pub max_speed: f32,

    // === Jump ===
    pub jump_impulse: f32,
    pub coyote_time: f32,
    pub jump_buffer_time: f32,
    pub jump_hold_time: f32,
    pub jump_lock_time: f32,

    // === Boost ===
    /// Stamina drained per second while boosting
    pub boost_depletion_rate: f32,
    /// Stamina regained per second
    pub boost_refill_rate: f32,
    /// Refill delay after the tank runs dry
    pub boost_refill_delay: f32,
    /// How long the "full" indicator stays up after unlocking
    pub boost_full_display: f32,

    // === Landing / effects ===
    /// Impact speed that triggers landing feedback
    pub hard_landing_speed: f32,
    /// Speed that triggers the speed-burst effect (on the rising edge)
    pub speed_burst_speed: f32,
    pub crash_shake: f32,
    pub crash_shake_time: f32,
    pub landing_shake: f32,
    pub landing_shake_time: f32,
    pub landing_flash_time: f32,
    pub crash_time: f32,

    // === Collision ===
    pub gap_wall_thickness: f32,
    /// Ascending bodies may clip a gap edge by this much without crashing
    pub gap_wall_tolerance: f32,
    /// Distance below the level's virtual height that counts as falling out
    pub fall_margin: f32,
    pub hazard_radius: f32,
    pub wall_width: f32,
    pub wall_height: f32,
    pub collider_width: f32,
    pub collider_height: f32,

    // === Avalanche ===
    /// Spawn distance behind the start marker
    pub avalanche_start_offset: f32,
    /// Depth of the avalanche front; the body is caught inside it
    pub avalanche_width: f32,

    // === Respawn ===
    pub respawn_lift: f32,
    pub respawn_invulnerability: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            half_width: 10.0,
            feet_offset: 12.0,
            body_height: 24.0,
            near_ground: 6.0,
            ground_snap: 24.0,

            gravity: 1500.0,
            jump_hold_gravity_scale: 0.5,
            air_drag: 0.1,
            air_angle_ease: 6.0,

            max_slope: 3.0,
            downhill_scale: 1.0,
            uphill_scale: 0.55,

            base_speed: 240.0,
            boost_multiplier: 1.5,
            brake_multiplier: 0.5,
            motor_assist: 180.0,
            thrust: 90.0,
            thrust_hysteresis: 30.0,
            brake_decel: 420.0,
            friction_downhill: 0.02,
            friction_flat: 0.35,
            deadzone_speed: 3.0,
            deadzone_slope: 0.05,
            soft_cap_speed: 700.0,
            soft_cap_drag: 0.0015,
            max_speed: 1200.0,

            jump_impulse: 540.0,
            coyote_time: 0.1,
            jump_buffer_time: 0.12,
            jump_hold_time: 0.2,
            jump_lock_time: 0.1,

            boost_depletion_rate: 0.5,
            boost_refill_rate: 0.4,
            boost_refill_delay: 0.75,
            boost_full_display: 1.0,

            hard_landing_speed: 420.0,
            speed_burst_speed: 650.0,
            crash_shake: 0.8,
            crash_shake_time: 0.5,
            landing_shake: 0.3,
            landing_shake_time: 0.2,
            landing_flash_time: 0.15,
            crash_time: 1.2,

            gap_wall_thickness: 2.0,
            gap_wall_tolerance: 3.0,
            fall_margin: 160.0,
            hazard_radius: 14.0,
            wall_width: 16.0,
            wall_height: 48.0,
            collider_width: 32.0,
            collider_height: 32.0,

            avalanche_start_offset: 160.0,
            avalanche_width: 48.0,

            respawn_lift: 4.0,
            respawn_invulnerability: 1.5,
        }
    }
}

impl Tuning {
    /// Parse a (possibly partial) tuning document; missing fields keep defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load tuning from a JSON file, falling back to defaults
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(tuning) => {
                    log::info!("Loaded tuning from {}", path.display());
                    tuning
                }
                Err(e) => {
                    log::warn!("Bad tuning file {}: {} - using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Can't read tuning file {}: {} - using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Cruise target for the current drive mode
    pub fn target_speed(&self, boosting: bool, braking: bool) -> f32 {
        if boosting {
            self.base_speed * self.boost_multiplier
        } else if braking {
            self.base_speed * self.brake_multiplier
        } else {
            self.base_speed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "gravity": 900.0, "max_speed": 800.0 }"#).unwrap();
        assert_eq!(tuning.gravity, 900.0);
        assert_eq!(tuning.max_speed, 800.0);
        assert_eq!(tuning.half_width, Tuning::default().half_width);
    }

    #[test]
    fn test_target_speed_modes() {
        let t = Tuning::default();
        assert_eq!(t.target_speed(false, false), t.base_speed);
        assert_eq!(t.target_speed(true, false), t.base_speed * 1.5);
        assert_eq!(t.target_speed(false, true), t.base_speed * 0.5);
        // Boost wins when both are somehow requested
        assert_eq!(t.target_speed(true, true), t.base_speed * 1.5);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let tuning = Tuning::load("/definitely/not/here/tuning.json");
        assert_eq!(tuning, Tuning::default());
    }
}
