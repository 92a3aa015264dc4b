//! Terrain heightmap sampling
//!
//! The course is a row of unit-wide segments, each holding a surface height
//! (world Y, growing downward) or a gap. Heights interpolate linearly between
//! the two samples enclosing a query X; slope is the coarser forward
//! difference between those samples.

use glam::Vec2;

use super::level::LevelError;

/// Sampled terrain profile
#[derive(Debug, Clone, PartialEq)]
pub struct Heightmap {
    segments: Vec<Option<f32>>,
    segment_len: f32,
}

impl Heightmap {
    /// Build a heightmap. Fails on an empty profile or a non-positive segment width.
    pub fn new(segments: Vec<Option<f32>>, segment_len: f32) -> Result<Self, LevelError> {
        if segments.is_empty() {
            return Err(LevelError::EmptySegments);
        }
        if !(segment_len.is_finite() && segment_len > 0.0) {
            return Err(LevelError::InvalidMeta("segmentLen must be finite and positive"));
        }
        if let Some(index) = segments
            .iter()
            .position(|h| h.is_some_and(|h| !h.is_finite()))
        {
            return Err(LevelError::BadSegment { index });
        }
        Ok(Self {
            segments,
            segment_len,
        })
    }

    #[inline]
    pub fn segment_len(&self) -> f32 {
        self.segment_len
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Option<f32>] {
        &self.segments
    }

    /// Raw sample at a segment index (`None` for gaps and out-of-range)
    #[inline]
    pub fn sample(&self, index: usize) -> Option<f32> {
        self.segments.get(index).copied().flatten()
    }

    #[inline]
    pub fn is_gap(&self, index: usize) -> bool {
        matches!(self.segments.get(index), Some(None))
    }

    /// World X of a segment index
    #[inline]
    pub fn world_x(&self, index: f32) -> f32 {
        index * self.segment_len
    }

    /// World width of the whole profile
    pub fn world_width(&self) -> f32 {
        (self.segments.len() - 1) as f32 * self.segment_len
    }

    /// Split a world X into (segment index, fraction). `None` when out of range.
    fn locate(&self, x: f32) -> Option<(usize, f32)> {
        let u = x / self.segment_len;
        if !u.is_finite() || u < 0.0 {
            return None;
        }
        let i = u.floor();
        let index = i as usize;
        if index >= self.segments.len() {
            return None;
        }
        Some((index, u - i))
    }

    /// Interpolated surface height at world X
    pub fn height_at(&self, x: f32) -> Option<f32> {
        let (i, t) = self.locate(x)?;
        let h0 = self.sample(i)?;
        if t == 0.0 {
            return Some(h0);
        }
        let j = (i + 1).min(self.segments.len() - 1);
        let h1 = self.sample(j)?;
        Some(h0 + (h1 - h0) * t)
    }

    /// Discrete slope (height delta per world unit) at world X
    pub fn slope_at(&self, x: f32) -> Option<f32> {
        let (i, _) = self.locate(x)?;
        let (a, b) = if i + 1 < self.segments.len() {
            (i, i + 1)
        } else if i > 0 {
            (i - 1, i)
        } else {
            return self.sample(i).map(|_| 0.0);
        };
        let h0 = self.sample(a)?;
        let h1 = self.sample(b)?;
        Some((h1 - h0) / self.segment_len)
    }

    /// Upward-pointing unit surface normal at world X
    pub fn normal_at(&self, x: f32) -> Option<Vec2> {
        let slope = self.slope_at(x)?;
        Some(Vec2::new(slope, -1.0).normalize())
    }

    /// First world X at or after `x` (scanning segment samples) with ground under it
    pub fn ground_at_or_after(&self, x: f32) -> Option<f32> {
        let start = (x / self.segment_len).max(0.0).ceil() as usize;
        if self.height_at(x).is_some() {
            return Some(x);
        }
        (start..self.segments.len())
            .map(|i| self.world_x(i as f32))
            .find(|&wx| self.height_at(wx).is_some())
    }

    /// Segment index range overlapping world span `[x0, x1]`, padded by one on each side
    pub fn index_span(&self, x0: f32, x1: f32) -> std::ops::Range<usize> {
        let lo = ((x0.min(x1) / self.segment_len).floor() - 1.0).max(0.0) as usize;
        let hi = ((x0.max(x1) / self.segment_len).ceil() + 2.0).max(0.0) as usize;
        lo.min(self.segments.len())..hi.min(self.segments.len())
    }
}
