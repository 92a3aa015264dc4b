//! Seeded procedural courses
//!
//! Same seed, same course. Used by the headless runner and by tests that want
//! a realistic level without a file on disk.

use std::f32::consts::PI;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::level::{Level, LevelError, LevelMeta, LevelObject, ObjectKind};

/// Shortest course the generator will build (segments)
pub const MIN_COURSE_LEN: usize = 160;

const RUNWAY: usize = 40;
const RUNOUT: usize = 40;
const VIRTUAL_HEIGHT: f32 = 800.0;
/// Highest surface (smallest Y)
const TOP: f32 = 160.0;
/// Lowest surface (largest Y)
const BOTTOM: f32 = 640.0;

struct Builder {
    segments: Vec<Option<f32>>,
    objects: Vec<LevelObject>,
    height: f32,
}

impl Builder {
    fn push(&mut self, height: f32) {
        self.height = height.clamp(TOP, BOTTOM);
        self.segments.push(Some(self.height));
    }

    fn flat(&mut self, n: usize) {
        for _ in 0..n {
            self.push(self.height);
        }
    }

    /// Constant slope; positive `step` runs downhill
    fn ramp(&mut self, n: usize, step: f32) {
        for _ in 0..n {
            self.push(self.height + step);
        }
    }

    /// Hump (or dip for negative `amp`) that ends back at the current height
    fn hill(&mut self, n: usize, amp: f32) {
        let base = self.height;
        for i in 1..=n {
            let t = i as f32 / n as f32;
            self.push(base - amp * (PI * t).sin());
        }
        self.height = base;
    }

    fn gap(&mut self, n: usize) {
        self.segments.extend(std::iter::repeat_n(None, n));
    }

    fn has_ground_around(&self, i: usize, pad: usize) -> bool {
        let lo = i.saturating_sub(pad);
        let hi = (i + pad).min(self.segments.len() - 1);
        self.segments[lo..=hi].iter().all(Option::is_some)
    }
}

/// Build a course of roughly `length` segments from `seed`
pub fn generate_course(seed: u64, length: usize) -> Result<Level, LevelError> {
    let length = length.max(MIN_COURSE_LEN);
    let mut rng = Pcg32::seed_from_u64(seed);
    let mut b = Builder {
        segments: Vec::with_capacity(length),
        objects: Vec::new(),
        height: TOP + (BOTTOM - TOP) * 0.25,
    };

    b.flat(RUNWAY);
    b.objects.push(LevelObject::new(ObjectKind::Start, 8.0));

    let body_end = length - RUNOUT;
    while b.segments.len() < body_end {
        let room = body_end - b.segments.len();
        match rng.random_range(0..10) {
            0..=3 => {
                let n = rng.random_range(24..=64).min(room);
                let step: f32 = rng.random_range(1.5..=4.5);
                // Climb gently once the course runs low
                let step = if b.height > BOTTOM - 80.0 { -step * 0.5 } else { step };
                b.ramp(n, step);
            }
            4..=5 => {
                let n = rng.random_range(30..=60).min(room);
                let amp = rng.random_range(10.0..=40.0) * if rng.random_bool(0.7) { 1.0 } else { -1.0 };
                b.hill(n, amp);
            }
            6..=7 if room > 40 => {
                b.flat(12);
                let start = b.segments.len();
                b.objects
                    .push(LevelObject::new(ObjectKind::Sign, (start - 10) as f32).with_message("Jump!"));
                b.gap(rng.random_range(3..=6));
                b.flat(14);
            }
            _ => {
                let n = rng.random_range(16..=32).min(room);
                let start = b.segments.len();
                b.flat(n);
                if n >= 20 && rng.random_bool(0.5) {
                    b.objects.push(
                        LevelObject::new(ObjectKind::Hazard, (start + n / 2) as f32).with_radius(8.0),
                    );
                }
            }
        }
    }
    b.flat(length - b.segments.len());

    for k in 1..=3 {
        let want = length * k / 4;
        if let Some(i) = (want..body_end).find(|&i| b.has_ground_around(i, 3)) {
            b.objects
                .push(LevelObject::new(ObjectKind::Checkpoint, i as f32));
        }
    }
    b.objects
        .push(LevelObject::new(ObjectKind::Finish, (length - RUNOUT / 2) as f32));
    b.objects.sort_by(|a, c| a.x.total_cmp(&c.x));

    let meta = LevelMeta {
        title: format!("Course #{seed}"),
        width: Some(length as u32),
        virtual_height: VIRTUAL_HEIGHT,
        avalanche_speed: rng.random_range(70.0..=110.0),
        assets: vec!["sled".to_string(), "snow".to_string()],
        ..Default::default()
    };
    let level = Level::new(meta, b.segments, b.objects)?;
    log::info!(
        "Generated '{}': {} segments, {} objects",
        level.title(),
        level.terrain.len(),
        level.objects().len()
    );
    Ok(level)
}
