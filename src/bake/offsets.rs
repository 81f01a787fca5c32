//! BlockOffsetIndex - O(log n) block-axis offsets via Fenwick tree
//!
//! Accumulates tracking-section block extents (plus a fixed inter-element
//! spacing) into absolute block-axis start offsets, and finds the tracking
//! section covering a given offset.
//!
//! Extents are stored as integer layout units (1/64 of a surface unit) so
//! prefix sums stay exact no matter how often entries are updated.
//!
//! # Complexity
//!
//! - `block_start`: O(log n)
//! - `lower_bound`: O(log² n)
//! - `push`: O(log n)
//! - `total`: O(log n)

/// Layout units per surface unit.
const UNITS_PER_PX: f64 = 64.0;

fn to_units(extent: f64) -> isize {
    if extent.is_finite() {
        (extent.max(0.0) * UNITS_PER_PX).round() as isize
    } else {
        0
    }
}

fn from_units(units: isize) -> f64 {
    units as f64 / UNITS_PER_PX
}

/// Fenwick tree over per-section strides (block extent + spacing).
///
/// Entry `i` covers `[block_start(i), block_start(i + 1))`; the spacing after
/// an entry belongs to that entry.
#[derive(Debug, Clone)]
pub struct BlockOffsetIndex {
    /// Fenwick tree backing storage (1-indexed internally, 0-indexed API)
    tree: Vec<isize>,
    /// Number of valid entries (len <= tree.len())
    len: usize,
    /// Spacing appended after every entry, in layout units
    spacing: isize,
}

impl BlockOffsetIndex {
    /// Creates an empty index with the given capacity and inter-element spacing.
    ///
    /// # Examples
    ///
    /// ```
    /// # use reflow_pager::bake::offsets::BlockOffsetIndex;
    /// let index = BlockOffsetIndex::new(16, 0.0);
    /// assert!(index.is_empty());
    /// assert_eq!(index.total(), 0.0);
    /// ```
    pub fn new(capacity: usize, spacing: f64) -> Self {
        Self {
            tree: vec![0; capacity],
            len: 0,
            spacing: to_units(spacing),
        }
    }

    /// Appends an entry with the given block extent.
    ///
    /// # Examples
    ///
    /// ```
    /// # use reflow_pager::bake::offsets::BlockOffsetIndex;
    /// let mut index = BlockOffsetIndex::new(4, 10.0);
    /// index.push(100.0);
    /// index.push(50.0);
    /// assert_eq!(index.block_start(1), 110.0);
    /// ```
    pub fn push(&mut self, extent: f64) {
        if self.len >= self.tree.len() {
            self.grow();
        }

        let idx = self.len;
        self.len += 1;
        fenwick::array::update(&mut self.tree, idx, to_units(extent) + self.spacing);
    }

    /// Absolute block-axis start of an entry.
    ///
    /// `block_start(len())` is the end of the last stride.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn block_start(&self, index: usize) -> f64 {
        assert!(
            index <= self.len,
            "index {} out of bounds (len: {})",
            index,
            self.len
        );
        if index == 0 {
            0.0
        } else {
            from_units(self.prefix_units(index - 1))
        }
    }

    /// First entry whose stride extends past `offset`.
    ///
    /// Returns `None` when the index is empty or `offset` lies beyond the last stride.
    ///
    /// # Examples
    ///
    /// ```
    /// # use reflow_pager::bake::offsets::BlockOffsetIndex;
    /// let mut index = BlockOffsetIndex::new(4, 0.0);
    /// index.push(10.0); // [0..10)
    /// index.push(20.0); // [10..30)
    /// assert_eq!(index.lower_bound(0.0), Some(0));
    /// assert_eq!(index.lower_bound(10.0), Some(1));
    /// assert_eq!(index.lower_bound(30.0), None);
    /// ```
    pub fn lower_bound(&self, offset: f64) -> Option<usize> {
        if self.is_empty() || !offset.is_finite() {
            return None;
        }
        let value = (offset * UNITS_PER_PX).round() as isize;

        let mut left = 0;
        let mut right = self.len;
        while left < right {
            let mid = left + (right - left) / 2;
            if self.prefix_units(mid) > value {
                right = mid;
            } else {
                left = mid + 1;
            }
        }

        (left < self.len).then_some(left)
    }

    /// Total block extent, excluding the spacing after the last entry.
    pub fn total(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            from_units(self.prefix_units(self.len - 1) - self.spacing)
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Doubles capacity. Higher Fenwick nodes cover earlier entries, so the
    /// tree is rebuilt rather than zero-extended.
    fn grow(&mut self) {
        let strides: Vec<isize> = (0..self.len).map(|i| self.stride_units(i)).collect();
        self.tree = vec![0; self.tree.len().max(1) * 2];
        for (i, stride) in strides.into_iter().enumerate() {
            fenwick::array::update(&mut self.tree, i, stride);
        }
    }

    fn prefix_units(&self, index: usize) -> isize {
        fenwick::array::prefix_sum(&self.tree, index)
    }

    fn stride_units(&self, index: usize) -> isize {
        assert!(
            index < self.len,
            "index {} out of bounds (len: {})",
            index,
            self.len
        );
        if index == 0 {
            self.prefix_units(0)
        } else {
            self.prefix_units(index) - self.prefix_units(index - 1)
        }
    }
}
