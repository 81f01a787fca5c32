//! Writing-mode and geometry primitives

use serde::{Deserialize, Serialize};

/// Direction in which lines of text are stacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Lines run left/right, stacking top to bottom.
    #[default]
    Horizontal,
    /// Lines run top/bottom, stacking sideways.
    Vertical,
}

/// Inline base direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Left-to-right.
    #[default]
    Ltr,
    /// Right-to-left.
    Rtl,
}

/// Writing mode detected by the render surface for one section.
///
/// Resolved once per section and immutable for the section's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WritingMode {
    /// Line stacking axis.
    pub axis: Axis,
    /// Inline base direction.
    pub direction: Direction,
    /// Vertical lines stacking right-to-left (`vertical-rl`).
    pub vertical_reversed: bool,
}

impl WritingMode {
    /// Plain left-to-right horizontal text.
    pub const HORIZONTAL_LTR: Self = Self {
        axis: Axis::Horizontal,
        direction: Direction::Ltr,
        vertical_reversed: false,
    };

    /// Create a writing mode.
    pub fn new(axis: Axis, direction: Direction, vertical_reversed: bool) -> Self {
        Self {
            axis,
            direction,
            vertical_reversed,
        }
    }

    /// Whether lines run vertically.
    pub fn is_vertical(&self) -> bool {
        self.axis == Axis::Vertical
    }

    /// Whether the inline direction is right-to-left.
    pub fn is_rtl(&self) -> bool {
        self.direction == Direction::Rtl
    }

    /// Physical axis along which successive lines (blocks) stack.
    pub fn block_axis(&self) -> PhysicalAxis {
        match self.axis {
            Axis::Horizontal => PhysicalAxis::Y,
            Axis::Vertical => PhysicalAxis::X,
        }
    }

    /// Physical axis along which a line runs.
    pub fn inline_axis(&self) -> PhysicalAxis {
        self.block_axis().cross()
    }
}

/// Physical screen axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalAxis {
    /// Horizontal screen axis.
    X,
    /// Vertical screen axis.
    Y,
}

impl PhysicalAxis {
    /// The perpendicular axis.
    pub fn cross(self) -> Self {
        match self {
            Self::X => Self::Y,
            Self::Y => Self::X,
        }
    }
}

/// Whether reading order runs toward increasing or decreasing physical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Progression {
    /// Reading advances toward larger coordinates.
    Forward,
    /// Reading advances toward smaller coordinates (stored offsets go negative).
    Reverse,
}

impl Progression {
    /// Multiplier converting a logical offset to a stored (physical) offset.
    pub fn sign(self) -> f64 {
        match self {
            Self::Forward => 1.0,
            Self::Reverse => -1.0,
        }
    }
}

/// Presentation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    /// Fixed-extent pages built from columns.
    #[default]
    Paginated,
    /// One continuous scroll along the block axis.
    Scrolled,
}

impl std::str::FromStr for Flow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paginated" => Ok(Self::Paginated),
            "scrolled" => Ok(Self::Scrolled),
            other => Err(format!(
                "unknown flow '{other}' (expected 'paginated' or 'scrolled')"
            )),
        }
    }
}

/// Viewport size in surface units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Viewport {
    /// Create new viewport dimensions.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Size along a physical axis.
    pub fn along(&self, axis: PhysicalAxis) -> f64 {
        match axis {
            PhysicalAxis::X => self.width,
            PhysicalAxis::Y => self.height,
        }
    }
}

/// One rectangle reported by the surface. Elements split across columns
/// produce several.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub left: f64,
    /// Right edge.
    pub right: f64,
    /// Top edge.
    pub top: f64,
    /// Bottom edge.
    pub bottom: f64,
}

impl Rect {
    /// Create a rectangle from its edges.
    pub fn new(left: f64, right: f64, top: f64, bottom: f64) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    /// Leading edge along an axis.
    pub fn start_along(&self, axis: PhysicalAxis) -> f64 {
        match axis {
            PhysicalAxis::X => self.left,
            PhysicalAxis::Y => self.top,
        }
    }

    /// Trailing edge along an axis.
    pub fn end_along(&self, axis: PhysicalAxis) -> f64 {
        match axis {
            PhysicalAxis::X => self.right,
            PhysicalAxis::Y => self.bottom,
        }
    }

    /// Size along an axis.
    pub fn size_along(&self, axis: PhysicalAxis) -> f64 {
        self.end_along(axis) - self.start_along(axis)
    }

    /// Offset of the rectangle's reading-order start, in logical (unsigned) units.
    ///
    /// For reverse progression the trailing physical edge comes first.
    pub fn logical_start(&self, axis: PhysicalAxis, progression: Progression) -> f64 {
        match progression {
            Progression::Forward => self.start_along(axis),
            Progression::Reverse => -self.end_along(axis),
        }
    }

    /// Union of several rectangles; `None` when `rects` is empty.
    pub fn union(rects: &[Rect]) -> Option<Rect> {
        rects.iter().copied().reduce(|a, b| Rect {
            left: a.left.min(b.left),
            right: a.right.max(b.right),
            top: a.top.min(b.top),
            bottom: a.bottom.max(b.bottom),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_axis_follows_line_stacking() {
        assert_eq!(WritingMode::HORIZONTAL_LTR.block_axis(), PhysicalAxis::Y);
        let vertical = WritingMode::new(Axis::Vertical, Direction::Ltr, true);
        assert_eq!(vertical.block_axis(), PhysicalAxis::X);
        assert_eq!(vertical.inline_axis(), PhysicalAxis::Y);
    }

    #[test]
    fn logical_start_mirrors_reverse_progression() {
        let rect = Rect::new(-2000.0, -1000.0, 0.0, 800.0);
        assert_eq!(rect.logical_start(PhysicalAxis::X, Progression::Reverse), 1000.0);
        assert_eq!(rect.logical_start(PhysicalAxis::X, Progression::Forward), -2000.0);
    }

    #[test]
    fn union_spans_all_fragments() {
        let rects = [
            Rect::new(0.0, 100.0, 500.0, 800.0),
            Rect::new(1000.0, 1100.0, 0.0, 200.0),
        ];
        let union = Rect::union(&rects).unwrap();
        assert_eq!(union, Rect::new(0.0, 1100.0, 0.0, 800.0));
        assert_eq!(Rect::union(&[]), None);
    }

    #[test]
    fn flow_parses_case_insensitively() {
        assert_eq!("Scrolled".parse::<Flow>(), Ok(Flow::Scrolled));
        assert_eq!(" paginated ".parse::<Flow>(), Ok(Flow::Paginated));
        assert!("columns".parse::<Flow>().is_err());
    }
}
