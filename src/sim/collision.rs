//! Collision geometry for a body riding a heightmap
//!
//! The tricky part is gap edges: a fast sled can cover several segments in a
//! tick, so walls are tested with the previous and current boxes together
//! rather than by static overlap alone.

use glam::Vec2;

use super::heightmap::Heightmap;
use crate::tuning::Tuning;

/// Axis-aligned box (Y grows down, so `min.y` is the top)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Box standing on `bottom`, centered on `x`
    pub fn standing(x: f32, bottom: f32, width: f32, height: f32) -> Self {
        Self::new(
            Vec2::new(x - width / 2.0, bottom - height),
            Vec2::new(x + width / 2.0, bottom),
        )
    }

    /// Player collision box for an origin at `(x, y)`
    pub fn body(x: f32, y: f32, tuning: &Tuning) -> Self {
        let feet = y + tuning.feet_offset;
        Self::new(
            Vec2::new(x - tuning.half_width, feet - tuning.body_height),
            Vec2::new(x + tuning.half_width, feet),
        )
    }

    /// Strict overlap (touching edges don't count)
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.overlaps_x(other) && self.overlaps_y(other)
    }

    #[inline]
    pub fn overlaps_x(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x && self.max.x > other.min.x
    }

    #[inline]
    pub fn overlaps_y(&self, other: &Aabb) -> bool {
        self.min.y < other.max.y && self.max.y > other.min.y
    }
}

/// Which side of a gap edge has ground
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolidSide {
    Left,
    Right,
}

/// Thin wall dropped from the lip of a gap down to the level floor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapWall {
    /// World X of the edge
    pub x: f32,
    /// Surface height at the lip
    pub surface: f32,
    pub solid: SolidSide,
    pub bounds: Aabb,
}

/// Collect gap-edge walls between world X `x0` and `x1`.
///
/// Ground between two samples needs both of them, so a solid run ends at its
/// last solid sample and the next run starts at its first one.
pub fn gap_walls(terrain: &Heightmap, x0: f32, x1: f32, floor: f32, thickness: f32) -> Vec<GapWall> {
    let half = thickness / 2.0;
    let mut walls = Vec::new();
    for i in terrain.index_span(x0, x1) {
        let Some(surface) = terrain.sample(i) else {
            continue;
        };
        let x = terrain.world_x(i as f32);
        let bounds = Aabb::new(Vec2::new(x - half, surface), Vec2::new(x + half, floor));
        if terrain.is_gap(i + 1) {
            walls.push(GapWall {
                x,
                surface,
                solid: SolidSide::Left,
                bounds,
            });
        }
        if i > 0 && terrain.is_gap(i - 1) {
            walls.push(GapWall {
                x,
                surface,
                solid: SolidSide::Right,
                bounds,
            });
        }
    }
    walls
}

/// Did a box moving from `prev` to `cur` hit `wall` this tick?
///
/// The motion is swept on both axes: it is a hit if the box overlaps the wall
/// in X and in Y at the same moment somewhere within the tick, so a body that
/// clears a thin wall in one step is still caught.
pub fn swept_hit(prev: &Aabb, cur: &Aabb, wall: &Aabb) -> bool {
    let delta = cur.min - prev.min;
    let Some((x_in, x_out)) = overlap_window(prev.min.x, prev.max.x, delta.x, wall.min.x, wall.max.x) else {
        return false;
    };
    let Some((y_in, y_out)) = overlap_window(prev.min.y, prev.max.y, delta.y, wall.min.y, wall.max.y) else {
        return false;
    };
    x_in.max(y_in) < x_out.min(y_out)
}

/// Part of the tick `[0, 1]` during which the span `[lo, hi]`, moving by `d`,
/// strictly overlaps `[a, b]`
fn overlap_window(lo: f32, hi: f32, d: f32, a: f32, b: f32) -> Option<(f32, f32)> {
    if d == 0.0 {
        return (lo < b && hi > a).then_some((0.0, 1.0));
    }
    let touch = (a - hi) / d;
    let leave = (b - lo) / d;
    let (enter, exit) = if d > 0.0 { (touch, leave) } else { (leave, touch) };
    let (enter, exit) = (enter.max(0.0), exit.min(1.0));
    (enter < exit).then_some((enter, exit))
}

/// Did a point moving from `prev_x` to `x` pass a thin vertical marker?
#[inline]
pub fn marker_crossed(prev_x: f32, x: f32, marker_x: f32) -> bool {
    (prev_x < marker_x && x >= marker_x) || (prev_x > marker_x && x <= marker_x)
}

/// Circle vs circle
#[inline]
pub fn circles_touch(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    a.distance_squared(b) < (ra + rb) * (ra + rb)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> Tuning {
        Tuning::default()
    }

    #[test]
    fn test_body_box() {
        let t = tuning();
        let b = Aabb::body(100.0, 50.0, &t);
        assert_eq!(b.max.y, 50.0 + t.feet_offset);
        assert_eq!(b.min.y, 50.0 + t.feet_offset - t.body_height);
        assert_eq!(b.max.x - b.min.x, 2.0 * t.half_width);
    }

    #[test]
    fn test_touching_is_not_overlap() {
        let a = Aabb::new(Vec2::ZERO, Vec2::new(1.0, 1.0));
        let b = Aabb::new(Vec2::new(0.5, 1.0), Vec2::new(2.0, 2.0));
        assert!(!a.overlaps(&b));
        let c = Aabb::new(Vec2::new(0.5, 0.9), Vec2::new(2.0, 2.0));
        assert!(a.overlaps(&c));
    }

    #[test]
    fn test_gap_walls_at_run_ends() {
        let terrain = Heightmap::new(
            vec![Some(100.0), Some(100.0), None, None, Some(90.0), Some(90.0)],
            8.0,
        )
        .unwrap();
        let walls = gap_walls(&terrain, 0.0, 48.0, 500.0, 2.0);
        assert_eq!(walls.len(), 2);
        assert_eq!(walls[0].x, 8.0);
        assert_eq!(walls[0].solid, SolidSide::Left);
        assert_eq!(walls[0].surface, 100.0);
        assert_eq!(walls[1].x, 32.0);
        assert_eq!(walls[1].solid, SolidSide::Right);
        assert_eq!(walls[1].bounds.min.y, 90.0);
        assert_eq!(walls[1].bounds.max.y, 500.0);
    }

    #[test]
    fn test_no_walls_without_gaps() {
        let terrain = Heightmap::new(vec![Some(10.0); 10], 8.0).unwrap();
        assert!(gap_walls(&terrain, 0.0, 80.0, 500.0, 2.0).is_empty());
    }

    #[test]
    fn test_swept_catches_tunneling() {
        let wall = Aabb::new(Vec2::new(99.0, 100.0), Vec2::new(101.0, 500.0));
        // Whole box jumps past the wall in one tick
        let prev = Aabb::new(Vec2::new(60.0, 90.0), Vec2::new(80.0, 110.0));
        let cur = Aabb::new(Vec2::new(120.0, 90.0), Vec2::new(140.0, 110.0));
        assert!(!cur.overlaps(&wall));
        assert!(swept_hit(&prev, &cur, &wall));
        // Same motion, but passing above the lip
        let prev_high = Aabb::new(Vec2::new(60.0, 70.0), Vec2::new(80.0, 95.0));
        let cur_high = Aabb::new(Vec2::new(120.0, 70.0), Vec2::new(140.0, 95.0));
        assert!(!swept_hit(&prev_high, &cur_high, &wall));
        // Moving left through it
        assert!(swept_hit(&cur, &prev, &wall));
    }

    #[test]
    fn test_swept_catches_trailing_edge_leaving_lip() {
        let wall = Aabb::new(Vec2::new(99.0, 100.0), Vec2::new(101.0, 500.0));
        // Feet start level with the lip, straddling it, and end past the wall and lower
        let prev = Aabb::new(Vec2::new(92.0, 76.0), Vec2::new(112.0, 100.0));
        let cur = Aabb::new(Vec2::new(104.0, 77.0), Vec2::new(124.0, 101.0));
        assert!(!cur.overlaps(&wall));
        assert!(!prev.overlaps(&wall));
        assert!(swept_hit(&prev, &cur, &wall));
    }

    #[test]
    fn test_swept_misses_body_that_drops_after_clearing() {
        let wall = Aabb::new(Vec2::new(99.0, 100.0), Vec2::new(101.0, 500.0));
        // Crosses the wall above the lip, only dips below it once past
        let prev = Aabb::new(Vec2::new(60.0, 60.0), Vec2::new(80.0, 84.0));
        let cur = Aabb::new(Vec2::new(120.0, 80.0), Vec2::new(140.0, 104.0));
        assert!(!swept_hit(&prev, &cur, &wall));
    }

    #[test]
    fn test_marker_crossing() {
        assert!(marker_crossed(9.0, 11.0, 10.0));
        assert!(marker_crossed(9.0, 10.0, 10.0));
        assert!(marker_crossed(12.0, 8.0, 10.0));
        assert!(!marker_crossed(10.0, 10.0, 10.0));
        assert!(!marker_crossed(11.0, 15.0, 10.0));
    }

    #[test]
    fn test_circles() {
        assert!(circles_touch(Vec2::ZERO, 5.0, Vec2::new(9.0, 0.0), 5.0));
        assert!(!circles_touch(Vec2::ZERO, 5.0, Vec2::new(10.0, 0.0), 5.0));
    }
}
