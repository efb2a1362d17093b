//! Field Geometry
//!
//! Axis-aligned rectangles and the four-lane discretization of the track.

use serde::{Serialize, Deserialize};

use crate::{FIELD_HEIGHT, FIELD_WIDTH, LANE_COUNT};

/// Axis-aligned rectangle in field pixels (origin top-left, y grows down).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Rect {
    /// Create a rectangle from its top-left corner and size.
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Right edge.
    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Center point.
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check if two rectangles overlap. Touching edges count as overlap.
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.overlaps_with_margin(other, 0.0, 0.0)
    }

    /// Overlap test with `other` grown by a horizontal and vertical margin.
    ///
    /// Used for spawn placement, where entities must stay visually apart.
    pub fn overlaps_with_margin(&self, other: &Rect, margin_x: f32, margin_y: f32) -> bool {
        !(self.x > other.right() + margin_x
            || self.right() < other.x - margin_x
            || self.y > other.bottom() + margin_y
            || self.bottom() < other.y - margin_y)
    }
}

/// Lane index in `0..LANE_COUNT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Lane(u8);

impl Lane {
    /// Leftmost lane.
    pub const LEFT: Lane = Lane(0);
    /// Rightmost lane.
    pub const RIGHT: Lane = Lane(LANE_COUNT - 1);

    /// Create a lane, clamping to the valid range.
    pub fn new(index: u8) -> Self {
        Self(index.min(LANE_COUNT - 1))
    }

    /// All lanes, left to right.
    pub fn all() -> impl Iterator<Item = Lane> {
        (0..LANE_COUNT).map(Lane)
    }

    /// Lane index.
    #[inline]
    pub fn index(self) -> u8 {
        self.0
    }

    /// Nearest lane to a horizontal position given as a percentage (0-100).
    pub fn from_percent(percent: f32) -> Self {
        let span = (LANE_COUNT - 1) as f32;
        let raw = (percent.clamp(0.0, 100.0) / 100.0 * span).round();
        Self::new(raw as u8)
    }

    /// Horizontal position of this lane as a percentage (0-100).
    pub fn percent(self) -> f32 {
        self.0 as f32 / (LANE_COUNT - 1) as f32 * 100.0
    }

    /// Lane containing a pixel x coordinate.
    pub fn containing(x: f32) -> Option<Self> {
        if !(0.0..FIELD_WIDTH).contains(&x) {
            return None;
        }
        Some(Self::new((x / lane_width()).floor() as u8))
    }

    /// Pixel x of the lane center.
    #[inline]
    pub fn center_x(self) -> f32 {
        lane_width() * (self.0 as f32 + 0.5)
    }

    /// One lane to the left, saturating at the edge.
    pub fn left(self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    /// One lane to the right, saturating at the edge.
    pub fn right(self) -> Self {
        Self::new(self.0 + 1)
    }
}

impl Default for Lane {
    /// The car starts at the 50% position.
    fn default() -> Self {
        Self::from_percent(50.0)
    }
}

/// Width of a single lane in pixels.
#[inline]
pub fn lane_width() -> f32 {
    FIELD_WIDTH / LANE_COUNT as f32
}

/// Rectangle of `width`×`height` centered in `lane` with its top at `y`.
pub fn centered_in_lane(lane: Lane, y: f32, width: f32, height: f32) -> Rect {
    Rect::new(lane.center_x() - width / 2.0, y, width, height)
}

/// Check whether a top edge has left the field through the bottom.
#[inline]
pub fn below_field(y: f32) -> bool {
    y >= FIELD_HEIGHT
}
