//! Bounded ring of observed sentinel groups
//!
//! Each group is a contiguous window of sentinels. Observing a group beyond
//! capacity unobserves the least recently observed one, so the number of
//! sentinels registered with the probe never exceeds `capacity × group_size`.

use std::collections::VecDeque;
use std::ops::Range;

use crate::model::SentinelId;
use crate::surface::VisibilityProbe;

/// Static partition of sentinel ordinals into fixed-size groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupLayout {
    sentinel_count: usize,
    group_size: usize,
}

impl GroupLayout {
    /// Partition `sentinel_count` sentinels into groups of `group_size` (at least 1).
    pub fn new(sentinel_count: usize, group_size: usize) -> Self {
        Self {
            sentinel_count,
            group_size: group_size.max(1),
        }
    }

    /// Number of groups; zero when there are no sentinels.
    pub fn group_count(&self) -> usize {
        self.sentinel_count.div_ceil(self.group_size)
    }

    /// Sentinels per full group.
    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Ordinals covered by a group.
    pub fn members(&self, group: usize) -> Range<usize> {
        let start = (group * self.group_size).min(self.sentinel_count);
        let end = (start + self.group_size).min(self.sentinel_count);
        start..end
    }

    /// Group holding a sentinel.
    pub fn group_of(&self, sentinel: SentinelId) -> usize {
        sentinel.get() / self.group_size
    }

    /// Groups in outward search order from `start`: start, -1, +1, -2, +2, ...
    pub fn outward_from(&self, start: usize) -> impl Iterator<Item = usize> {
        let count = self.group_count();
        let start = start.min(count.saturating_sub(1));
        (0..count.max(1) * 2).filter_map(move |step| {
            if count == 0 {
                return None;
            }
            let distance = step.div_ceil(2);
            if step == 0 {
                Some(start)
            } else if step % 2 == 1 {
                start.checked_sub(distance)
            } else {
                let up = start + distance;
                (up < count).then_some(up)
            }
        })
    }
}

/// Groups currently registered with the probe, oldest first.
#[derive(Debug, Clone)]
pub struct ObserverRing {
    groups: VecDeque<usize>,
    capacity: usize,
}

impl ObserverRing {
    /// Create an empty ring holding at most `capacity` groups (at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            groups: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Observe a group, evicting the oldest when full.
    ///
    /// Re-observing a held group refreshes its position and registers its
    /// members with the probe again; probe registration is idempotent.
    pub fn observe<P: VisibilityProbe + ?Sized>(
        &mut self,
        group: usize,
        layout: &GroupLayout,
        probe: &P,
    ) {
        if let Some(position) = self.groups.iter().position(|&g| g == group) {
            self.groups.remove(position);
        } else if self.groups.len() == self.capacity {
            if let Some(evicted) = self.groups.pop_front() {
                for ordinal in layout.members(evicted) {
                    probe.unobserve(SentinelId::new(ordinal));
                }
            }
        }

        for ordinal in layout.members(group) {
            probe.observe(SentinelId::new(ordinal));
        }
        self.groups.push_back(group);
    }

    /// Keep only `keep`, observing each of them.
    pub fn rescope<P: VisibilityProbe + ?Sized>(
        &mut self,
        keep: &[usize],
        layout: &GroupLayout,
        probe: &P,
    ) {
        let stale: Vec<usize> = self
            .groups
            .iter()
            .copied()
            .filter(|g| !keep.contains(g))
            .collect();
        for group in stale {
            self.unobserve(group, layout, probe);
        }
        for &group in keep {
            self.observe(group, layout, probe);
        }
    }

    /// Unobserve everything.
    pub fn clear<P: VisibilityProbe + ?Sized>(&mut self, layout: &GroupLayout, probe: &P) {
        while let Some(group) = self.groups.pop_front() {
            for ordinal in layout.members(group) {
                probe.unobserve(SentinelId::new(ordinal));
            }
        }
    }

    /// Whether a group is held.
    pub fn contains(&self, group: usize) -> bool {
        self.groups.contains(&group)
    }

    /// Held groups, oldest first.
    pub fn groups(&self) -> impl Iterator<Item = usize> + '_ {
        self.groups.iter().copied()
    }

    /// Maximum number of held groups.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of held groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no group is held.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn unobserve<P: VisibilityProbe + ?Sized>(
        &mut self,
        group: usize,
        layout: &GroupLayout,
        probe: &P,
    ) {
        if let Some(position) = self.groups.iter().position(|&g| g == group) {
            self.groups.remove(position);
            for ordinal in layout.members(group) {
                probe.unobserve(SentinelId::new(ordinal));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TrackingId;
    use std::cell::RefCell;
    use std::collections::BTreeSet;

    #[derive(Default)]
    struct CountingProbe {
        observed: RefCell<BTreeSet<usize>>,
    }

    impl VisibilityProbe for CountingProbe {
        fn observe(&self, sentinel: SentinelId) {
            self.observed.borrow_mut().insert(sentinel.get());
        }

        fn unobserve(&self, sentinel: SentinelId) {
            self.observed.borrow_mut().remove(&sentinel.get());
        }

        fn is_visible(&self, _sentinel: SentinelId) -> Option<bool> {
            None
        }

        fn force_visible(&self, _id: &TrackingId) {}
    }

    #[test]
    fn layout_partitions_with_short_tail() {
        let layout = GroupLayout::new(120, 50);
        assert_eq!(layout.group_count(), 3);
        assert_eq!(layout.members(0), 0..50);
        assert_eq!(layout.members(2), 100..120);
        assert_eq!(layout.group_of(SentinelId::new(99)), 1);
    }

    #[test]
    fn empty_layout_has_no_groups() {
        let layout = GroupLayout::new(0, 50);
        assert_eq!(layout.group_count(), 0);
        assert_eq!(layout.outward_from(0).count(), 0);
    }

    #[test]
    fn outward_order_alternates_and_skips_edges() {
        let layout = GroupLayout::new(500, 50);
        let order: Vec<usize> = layout.outward_from(1).collect();
        assert_eq!(order, vec![1, 0, 2, 3, 4, 5, 6, 7, 8, 9]);

        let order: Vec<usize> = layout.outward_from(5).take(5).collect();
        assert_eq!(order, vec![5, 4, 6, 3, 7]);
    }

    #[test]
    fn outward_order_visits_every_group_once() {
        let layout = GroupLayout::new(330, 50);
        for start in 0..layout.group_count() {
            let visited: BTreeSet<usize> = layout.outward_from(start).collect();
            assert_eq!(visited.len(), layout.group_count());
        }
    }

    #[test]
    fn ring_evicts_oldest_group() {
        let layout = GroupLayout::new(1000, 10);
        let probe = CountingProbe::default();
        let mut ring = ObserverRing::new(2);

        ring.observe(0, &layout, &probe);
        ring.observe(1, &layout, &probe);
        ring.observe(2, &layout, &probe);

        assert!(!ring.contains(0));
        assert_eq!(ring.groups().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(probe.observed.borrow().len(), 20);
        assert!(!probe.observed.borrow().contains(&5));
    }

    #[test]
    fn reobserving_refreshes_without_duplicates() {
        let layout = GroupLayout::new(1000, 10);
        let probe = CountingProbe::default();
        let mut ring = ObserverRing::new(2);

        ring.observe(0, &layout, &probe);
        ring.observe(1, &layout, &probe);
        ring.observe(0, &layout, &probe);
        ring.observe(2, &layout, &probe);

        assert_eq!(ring.groups().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(probe.observed.borrow().len(), 20);
    }

    #[test]
    fn reobserving_registers_members_the_surface_dropped() {
        let layout = GroupLayout::new(1000, 10);
        let probe = CountingProbe::default();
        let mut ring = ObserverRing::new(2);
        ring.observe(3, &layout, &probe);

        // Another owner unobserved part of the group.
        for ordinal in 30..35 {
            probe.unobserve(SentinelId::new(ordinal));
        }
        ring.observe(3, &layout, &probe);

        assert_eq!(ring.groups().collect::<Vec<_>>(), vec![3]);
        assert_eq!(
            *probe.observed.borrow(),
            (30..40).collect::<BTreeSet<usize>>()
        );
    }

    #[test]
    fn rescope_keeps_only_requested_groups() {
        let layout = GroupLayout::new(1000, 10);
        let probe = CountingProbe::default();
        let mut ring = ObserverRing::new(4);
        for group in 0..4 {
            ring.observe(group, &layout, &probe);
        }

        ring.rescope(&[2, 7], &layout, &probe);

        assert_eq!(ring.groups().collect::<Vec<_>>(), vec![2, 7]);
        assert_eq!(probe.observed.borrow().len(), 20);
        assert!(probe.observed.borrow().contains(&75));
    }

    #[test]
    fn clear_unobserves_everything() {
        let layout = GroupLayout::new(100, 10);
        let probe = CountingProbe::default();
        let mut ring = ObserverRing::new(3);
        ring.observe(4, &layout, &probe);
        ring.observe(5, &layout, &probe);

        ring.clear(&layout, &probe);

        assert!(ring.is_empty());
        assert!(probe.observed.borrow().is_empty());
    }
}
