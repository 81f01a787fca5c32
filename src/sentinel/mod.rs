//! Scalable visible-range tracking over sentinels.
//!
//! Sentinels are lightweight position markers scattered through a section.
//! Observing all of them is too expensive for large sections, so they are
//! partitioned into fixed-size groups and only a handful of groups are
//! observed at a time (see [`groups::ObserverRing`]). A query starts at the
//! group suggested by the caller's progress hint and widens outward until
//! the visible run is strictly inside the observed span.

pub mod groups;
pub mod visible_range;

pub use groups::{GroupLayout, ObserverRing};
pub use visible_range::{ContentRange, VisibleScan};

use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{ContentOutline, Sentinel, SentinelId, SentinelKind, TrackingId};
use crate::surface::VisibilityProbe;

/// Visibility facts for one scanned group, cached for the duration of a query.
#[derive(Debug, Clone, Copy, Default)]
struct GroupScan {
    first_visible: bool,
    last_visible: bool,
    any_visible: bool,
    first_content: Option<usize>,
    last_content: Option<usize>,
}

/// Computes the visible content range of one section.
#[derive(Debug)]
pub struct SentinelTracker {
    sentinels: Vec<Sentinel>,
    tracking: Vec<TrackingId>,
    layout: GroupLayout,
    ring: ObserverRing,
    blank_correction_count: usize,
    corrected: bool,
}

impl SentinelTracker {
    /// Build a tracker for a freshly loaded outline.
    pub fn new(
        outline: &ContentOutline,
        group_size: usize,
        max_active_groups: usize,
        blank_correction_count: usize,
    ) -> Self {
        Self {
            sentinels: outline.sentinels.clone(),
            tracking: outline.tracking.iter().map(|t| t.id.clone()).collect(),
            layout: GroupLayout::new(outline.sentinels.len(), group_size),
            ring: ObserverRing::new(max_active_groups),
            blank_correction_count,
            corrected: false,
        }
    }

    /// Number of sentinel groups.
    pub fn group_count(&self) -> usize {
        self.layout.group_count()
    }

    /// Groups currently observed, oldest first.
    pub fn observed_groups(&self) -> Vec<usize> {
        self.ring.groups().collect()
    }

    /// Upper bound on simultaneously observed sentinels.
    pub fn observation_budget(&self) -> usize {
        self.ring.capacity() * self.layout.group_size()
    }

    /// Compute the visible range, starting the search at `hint` (progress in `[0, 1]`).
    pub fn visible_range<P: VisibilityProbe + ?Sized>(
        &mut self,
        hint: f64,
        probe: &P,
    ) -> VisibleScan {
        let group_count = self.layout.group_count();
        if group_count == 0 {
            return self.blank(probe);
        }

        let hint = if hint.is_finite() { hint.clamp(0.0, 1.0) } else { 0.0 };
        let start = ((hint * group_count as f64).floor() as usize).min(group_count - 1);

        let mut scans: BTreeMap<usize, GroupScan> = BTreeMap::new();
        for group in self.layout.outward_from(start) {
            self.ring.observe(group, &self.layout, probe);
            scans.insert(group, self.scan_group(group, probe));
            if Self::is_interior(&scans, group_count) {
                break;
            }
        }

        let first = scans.values().find_map(|scan| scan.first_content);
        let last = scans.values().rev().find_map(|scan| scan.last_content);

        match (first, last) {
            (Some(first), Some(last)) => {
                let keep = [
                    self.layout.group_of(SentinelId::new(first)),
                    self.layout.group_of(SentinelId::new(last)),
                ];
                let keep: &[usize] = if keep[0] == keep[1] { &keep[..1] } else { &keep };
                self.ring.rescope(keep, &self.layout, probe);
                debug!(first, last, scanned = scans.len(), "Visible range resolved");
                VisibleScan {
                    range: ContentRange::spanning(SentinelId::new(first), SentinelId::new(last)),
                    corrected: false,
                }
            }
            _ => {
                self.ring.rescope(&[start], &self.layout, probe);
                self.blank(probe)
            }
        }
    }

    /// Stop observing every group.
    pub fn release<P: VisibilityProbe + ?Sized>(&mut self, probe: &P) {
        self.ring.clear(&self.layout, probe);
    }

    fn blank<P: VisibilityProbe + ?Sized>(&mut self, probe: &P) -> VisibleScan {
        let corrected =
            !self.corrected && self.blank_correction_count > 0 && !self.tracking.is_empty();
        if corrected {
            for id in self.tracking.iter().take(self.blank_correction_count) {
                probe.force_visible(id);
            }
            self.corrected = true;
            debug!(
                count = self.blank_correction_count.min(self.tracking.len()),
                "No visible content; forced leading tracking sections visible"
            );
        }
        VisibleScan {
            range: ContentRange::collapsed_at_start(),
            corrected,
        }
    }

    fn scan_group<P: VisibilityProbe + ?Sized>(&self, group: usize, probe: &P) -> GroupScan {
        let members = self.layout.members(group);
        let visible = |ordinal: usize| probe.is_visible(SentinelId::new(ordinal)).unwrap_or(false);

        let mut scan = GroupScan {
            first_visible: visible(members.start),
            last_visible: members.end > members.start && visible(members.end - 1),
            ..GroupScan::default()
        };

        for ordinal in members {
            if !visible(ordinal) {
                continue;
            }
            scan.any_visible = true;
            if self.sentinels[ordinal].kind == SentinelKind::Content {
                scan.first_content.get_or_insert(ordinal);
                scan.last_content = Some(ordinal);
            }
        }
        scan
    }

    /// Whether the visible run sits strictly inside the scanned span.
    ///
    /// Scanned groups are always contiguous because the search moves outward.
    fn is_interior(scans: &BTreeMap<usize, GroupScan>, group_count: usize) -> bool {
        if !scans.values().any(|scan| scan.any_visible) {
            return false;
        }
        let (Some((&lo, lo_scan)), Some((&hi, hi_scan))) =
            (scans.first_key_value(), scans.last_key_value())
        else {
            return false;
        };

        let open_below = lo > 0 && lo_scan.first_visible;
        let open_above = hi + 1 < group_count && hi_scan.last_visible;
        !open_below && !open_above
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
