//! Page extent arithmetic and scroll-axis resolution
//!
//! All offsets handed around inside the paginator are *logical*: zero at the
//! start of the section, growing in reading order. The surface stores
//! *physical* offsets, which run negative when reading order goes toward
//! smaller coordinates (right-to-left pagination, `vertical-rl` scrolling).
//! [`ScrollFrame`] converts between the two.

use crate::model::{Flow, PhysicalAxis, Progression, Viewport, WritingMode};

/// Slack added before flooring a scaled fraction.
const FRACTION_EPSILON: f64 = 1e-9;

/// Physical scroll axis and progression of one laid-out section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScrollFrame {
    /// Axis along which pages (or the scroll) advance.
    pub axis: PhysicalAxis,
    /// Whether reading order runs toward larger coordinates.
    pub progression: Progression,
}

impl ScrollFrame {
    /// Resolve the frame for a flow and writing mode.
    ///
    /// - paginated: pages advance along X for horizontal writing and along Y
    ///   for vertical writing; horizontal right-to-left runs in reverse
    /// - scrolled: the scroll follows the block axis; `vertical-rl` runs in reverse
    pub fn new(flow: Flow, writing_mode: WritingMode) -> Self {
        match flow {
            Flow::Paginated => Self {
                axis: if writing_mode.is_vertical() {
                    PhysicalAxis::Y
                } else {
                    PhysicalAxis::X
                },
                progression: if !writing_mode.is_vertical() && writing_mode.is_rtl() {
                    Progression::Reverse
                } else {
                    Progression::Forward
                },
            },
            Flow::Scrolled => Self {
                axis: writing_mode.block_axis(),
                progression: if writing_mode.is_vertical() && writing_mode.vertical_reversed {
                    Progression::Reverse
                } else {
                    Progression::Forward
                },
            },
        }
    }

    /// Physical (stored) offset for a logical offset.
    pub fn to_physical(&self, logical: f64) -> f64 {
        self.progression.sign() * logical
    }

    /// Logical offset for a physical (stored) offset.
    pub fn to_logical(&self, physical: f64) -> f64 {
        self.progression.sign() * physical
    }

    /// Viewport size along the scroll axis.
    pub fn page_extent(&self, viewport: Viewport) -> f64 {
        viewport.along(self.axis)
    }
}

/// Page geometry of a laid-out section.
///
/// # Invariants
/// - `page_count >= 1`
/// - `page_extent > 0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// Viewport size along the scroll axis.
    pub page_extent: f64,
    /// Measured content extent along the scroll axis.
    pub total_extent: f64,
    /// Number of pages.
    pub page_count: usize,
}

impl PageGeometry {
    /// Derive page geometry; `None` when `page_extent` is not a positive finite number.
    ///
    /// Negative or non-finite totals count as empty content (one page).
    ///
    /// # Examples
    ///
    /// ```
    /// # use reflow_pager::layout::pagination::PageGeometry;
    /// let geometry = PageGeometry::new(1000.0, 3000.0).unwrap();
    /// assert_eq!(geometry.page_count, 3);
    /// assert_eq!(PageGeometry::new(1000.0, 3000.5).unwrap().page_count, 4);
    /// assert_eq!(PageGeometry::new(1000.0, 0.0).unwrap().page_count, 1);
    /// ```
    pub fn new(page_extent: f64, total_extent: f64) -> Option<Self> {
        if !page_extent.is_finite() || page_extent <= 0.0 {
            return None;
        }
        let total_extent = if total_extent.is_finite() {
            total_extent.max(0.0)
        } else {
            0.0
        };
        Some(Self {
            page_extent,
            total_extent,
            page_count: page_count(total_extent, page_extent),
        })
    }

    /// Logical offset of the start of a page, clamped to the last page.
    pub fn page_offset(&self, page: usize) -> f64 {
        page.min(self.last_page()) as f64 * self.page_extent
    }

    /// Page containing a logical offset, clamped to `[0, page_count)`.
    pub fn page_at(&self, logical: f64) -> usize {
        if !logical.is_finite() || logical <= 0.0 {
            return 0;
        }
        // Offsets within half a unit of a boundary belong to the next page.
        let page = ((logical + 0.5) / self.page_extent).floor() as usize;
        page.min(self.last_page())
    }

    /// Index of the last page.
    pub fn last_page(&self) -> usize {
        self.page_count - 1
    }

    /// Page for a fractional position: `floor(fraction × page_count)`, clamped.
    pub fn page_for_fraction(&self, fraction: f64) -> usize {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        // Absorb rounding so `fraction_of_page` always maps back to its page.
        let scaled = fraction * self.page_count as f64 + FRACTION_EPSILON;
        (scaled.floor() as usize).min(self.last_page())
    }

    /// Fractional position of a page start.
    pub fn fraction_of_page(&self, page: usize) -> f64 {
        if self.page_count <= 1 {
            0.0
        } else {
            page.min(self.last_page()) as f64 / self.page_count as f64
        }
    }

    /// Container size covering every page.
    pub fn container_extent(&self) -> f64 {
        self.page_count as f64 * self.page_extent
    }
}

/// `max(1, ceil(total / page))` for a positive page extent.
pub fn page_count(total_extent: f64, page_extent: f64) -> usize {
    let measurable = total_extent > 0.0 && page_extent > 0.0;
    if !measurable {
        return 1;
    }
    let pages = (total_extent / page_extent).ceil();
    if pages.is_finite() {
        (pages as usize).max(1)
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Axis, Direction};

    const LTR: WritingMode = WritingMode::HORIZONTAL_LTR;

    fn rtl() -> WritingMode {
        WritingMode::new(Axis::Horizontal, Direction::Rtl, false)
    }

    fn vertical_rl() -> WritingMode {
        WritingMode::new(Axis::Vertical, Direction::Ltr, true)
    }

    #[test]
    fn paginated_horizontal_pages_along_x() {
        let frame = ScrollFrame::new(Flow::Paginated, LTR);
        assert_eq!(frame.axis, PhysicalAxis::X);
        assert_eq!(frame.progression, Progression::Forward);
    }

    #[test]
    fn paginated_rtl_runs_in_reverse() {
        let frame = ScrollFrame::new(Flow::Paginated, rtl());
        assert_eq!(frame.axis, PhysicalAxis::X);
        assert_eq!(frame.progression, Progression::Reverse);
        assert_eq!(frame.to_physical(2000.0), -2000.0);
        assert_eq!(frame.to_logical(-2000.0), 2000.0);
    }

    #[test]
    fn paginated_vertical_pages_along_y() {
        let frame = ScrollFrame::new(Flow::Paginated, vertical_rl());
        assert_eq!(frame.axis, PhysicalAxis::Y);
        assert_eq!(frame.progression, Progression::Forward);
    }

    #[test]
    fn scrolled_follows_block_axis() {
        let frame = ScrollFrame::new(Flow::Scrolled, rtl());
        assert_eq!(frame.axis, PhysicalAxis::Y);
        assert_eq!(frame.progression, Progression::Forward);

        let frame = ScrollFrame::new(Flow::Scrolled, vertical_rl());
        assert_eq!(frame.axis, PhysicalAxis::X);
        assert_eq!(frame.progression, Progression::Reverse);
    }

    #[test]
    fn page_count_examples() {
        assert_eq!(page_count(3000.0, 1000.0), 3);
        assert_eq!(page_count(3001.0, 1000.0), 4);
        assert_eq!(page_count(0.0, 1000.0), 1);
        assert_eq!(page_count(f64::NAN, 1000.0), 1);
        assert_eq!(page_count(1.0, 1000.0), 1);
    }

    #[test]
    fn geometry_rejects_degenerate_page_extent() {
        assert!(PageGeometry::new(0.0, 100.0).is_none());
        assert!(PageGeometry::new(f64::INFINITY, 100.0).is_none());
    }

    #[test]
    fn page_at_clamps_and_snaps() {
        let geometry = PageGeometry::new(1000.0, 3000.0).unwrap();
        assert_eq!(geometry.page_at(0.0), 0);
        assert_eq!(geometry.page_at(999.7), 1);
        assert_eq!(geometry.page_at(1500.0), 1);
        assert_eq!(geometry.page_at(9000.0), 2);
        assert_eq!(geometry.page_at(-50.0), 0);
    }

    #[test]
    fn fraction_maps_to_page() {
        let geometry = PageGeometry::new(1000.0, 3000.0).unwrap();
        assert_eq!(geometry.page_for_fraction(0.0), 0);
        assert_eq!(geometry.page_for_fraction(0.5), 1);
        assert_eq!(geometry.page_for_fraction(1.0), 2);
        assert_eq!(geometry.fraction_of_page(2), 2.0 / 3.0);
        assert_eq!(geometry.container_extent(), 3000.0);
    }

    #[test]
    fn page_start_fraction_survives_rounding() {
        // 1/49 * 49 rounds to just below 1.0.
        let geometry = PageGeometry::new(100.0, 4900.0).unwrap();
        assert_eq!(geometry.page_for_fraction(geometry.fraction_of_page(1)), 1);
    }
}
