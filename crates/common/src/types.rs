//! Core types with newtype pattern for type safety.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Unique, never-reused identifier of a layer within a stack.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Global raster dimensions shared by every layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of pixels.
    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether either dimension is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The full canvas as a rectangle at the origin.
    pub fn rect(self) -> PixelRect {
        PixelRect::new(0, 0, self.width, self.height)
    }

    /// Top-left corner of a `width x height` box centered on this canvas and
    /// displaced by `offset`.
    ///
    /// This is the single placement rule of the editor: canvas-center plus
    /// offset minus half the box size, with the halves floored together.
    pub fn placement(self, width: u32, height: u32, offset: (i32, i32)) -> (i32, i32) {
        let left = (i64::from(self.width) - i64::from(width)).div_euclid(2) + i64::from(offset.0);
        let top = (i64::from(self.height) - i64::from(height)).div_euclid(2) + i64::from(offset.1);
        (clamp_i32(left), clamp_i32(top))
    }

    /// Inverse of [`placement`](Self::placement): the offset that puts the
    /// top-left corner of a `width x height` box at `(left, top)`.
    pub fn offset_for(self, left: i32, top: i32, width: u32, height: u32) -> (i32, i32) {
        let cx = (i64::from(self.width) - i64::from(width)).div_euclid(2);
        let cy = (i64::from(self.height) - i64::from(height)).div_euclid(2);
        (clamp_i32(i64::from(left) - cx), clamp_i32(i64::from(top) - cy))
    }
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

impl fmt::Display for CanvasSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis-aligned pixel rectangle, top-left relative.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        i64::from(x) >= i64::from(self.x)
            && i64::from(x) < self.right()
            && i64::from(y) >= i64::from(self.y)
            && i64::from(y) < self.bottom()
    }

    /// Intersection of two rectangles; empty rectangles intersect to `None`.
    pub fn intersect(&self, other: &PixelRect) -> Option<PixelRect> {
        let left = i64::from(self.x).max(i64::from(other.x));
        let top = i64::from(self.y).max(i64::from(other.y));
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return None;
        }
        Some(PixelRect::new(
            left as i32,
            top as i32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }

    /// Center point in canvas pixel space.
    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.x) + f64::from(self.width) / 2.0,
            f64::from(self.y) + f64::from(self.height) / 2.0,
        )
    }
}

/// Edge, corner or center used to re-anchor content when the canvas size changes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Anchor {
    TopLeft,
    Top,
    TopRight,
    Left,
    #[default]
    Center,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl Anchor {
    /// Horizontal and vertical position of the anchor as fractions of the
    /// available slack: 0 = left/top, 1/2 = center, 1 = right/bottom.
    ///
    /// Returned as `(numerator, numerator)` over a denominator of 2 so that
    /// callers can stay in integer arithmetic.
    pub fn halves(self) -> (i64, i64) {
        match self {
            Self::TopLeft => (0, 0),
            Self::Top => (1, 0),
            Self::TopRight => (2, 0),
            Self::Left => (0, 1),
            Self::Center => (1, 1),
            Self::Right => (2, 1),
            Self::BottomLeft => (0, 2),
            Self::Bottom => (1, 2),
            Self::BottomRight => (2, 2),
        }
    }

    /// All anchors in grid order (row by row).
    pub fn all() -> &'static [Anchor] {
        &[
            Self::TopLeft,
            Self::Top,
            Self::TopRight,
            Self::Left,
            Self::Center,
            Self::Right,
            Self::BottomLeft,
            Self::Bottom,
            Self::BottomRight,
        ]
    }
}

/// Playback time in seconds (f64 precision).
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct TimeCode(pub f64);

impl TimeCode {
    pub const ZERO: Self = Self(0.0);

    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    pub fn as_secs(self) -> f64 {
        self.0
    }

    pub fn as_millis(self) -> f64 {
        self.0 * 1000.0
    }
}

impl Add for TimeCode {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for TimeCode {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for TimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.0)
    }
}

/// Round to the nearest integer, with halves going towards positive infinity.
///
/// Matches the placement rule in [`CanvasSize::placement`], so an offset
/// computed from a center point lands the box exactly on its intended pixels.
pub fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_centers_box() {
        let canvas = CanvasSize::new(1024, 1024);
        assert_eq!(canvas.placement(1024, 1024, (0, 0)), (0, 0));
        assert_eq!(canvas.placement(150, 150, (0, 0)), (437, 437));
        assert_eq!(canvas.placement(150, 150, (-237, -237)), (200, 200));
    }

    #[test]
    fn placement_and_offset_are_inverse() {
        let canvas = CanvasSize::new(801, 600);
        for &(w, h) in &[(1u32, 1u32), (150, 151), (2000, 17)] {
            for &(left, top) in &[(0, 0), (-40, 13), (799, 599)] {
                let offset = canvas.offset_for(left, top, w, h);
                assert_eq!(canvas.placement(w, h, offset), (left, top));
            }
        }
    }

    #[test]
    fn placement_clamps_extreme_offsets() {
        let canvas = CanvasSize::new(64, 64);
        assert_eq!(canvas.placement(4, 4, (i32::MAX, i32::MIN)), (i32::MAX, i32::MIN + 30));
        assert_eq!(canvas.offset_for(i32::MIN, 0, 4, 4), (i32::MIN, -30));
    }

    #[test]
    fn rect_intersection() {
        let a = PixelRect::new(0, 0, 100, 100);
        let b = PixelRect::new(50, -20, 100, 40);
        assert_eq!(a.intersect(&b), Some(PixelRect::new(50, 0, 50, 20)));
        let c = PixelRect::new(100, 0, 10, 10);
        assert_eq!(a.intersect(&c), None);
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = PixelRect::new(10, 10, 5, 5);
        assert!(r.contains(10, 10));
        assert!(r.contains(14, 14));
        assert!(!r.contains(15, 10));
        assert!(!r.contains(9, 12));
    }

    #[test]
    fn anchor_halves() {
        assert_eq!(Anchor::Center.halves(), (1, 1));
        assert_eq!(Anchor::TopLeft.halves(), (0, 0));
        assert_eq!(Anchor::BottomRight.halves(), (2, 2));
        assert_eq!(Anchor::all().len(), 9);
    }

    #[test]
    fn round_half_up_matches_placement() {
        assert_eq!(round_half_up(-237.0), -237);
        assert_eq!(round_half_up(-236.5), -236);
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(2.49), 2);
    }

    #[test]
    fn timecode_arithmetic() {
        let t = TimeCode::from_secs(1.5) + TimeCode::from_secs(0.5);
        assert_eq!(t.as_secs(), 2.0);
        assert_eq!((t - TimeCode::from_secs(2.0)), TimeCode::ZERO);
        assert_eq!(TimeCode::from_secs(0.25).as_millis(), 250.0);
    }
}
