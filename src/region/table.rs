//! # Ordered Region Table
//!
//! Fixed-capacity, strictly ascending (by start offset) sequence of live
//! regions. The table favors an ordered `Vec` with in-place shifts over a
//! linked structure for cache locality: the common case is a one-step scan
//! from the most recently touched (*active*) slot.
//!
//! ## Lookup
//!
//! `find_covering` walks directionally from the active slot: forward when
//! the probe lies ahead of the committed position, backward when it lies
//! behind, and a single active-slot check when the position is unchanged.
//! Sequential workloads therefore resolve in O(1).
//!
//! `closest_before` / `closest_after` locate the insertion neighborhood for
//! a position no region covers. Because the table is sorted and
//! non-overlapping, both are partition points and are answered by binary
//! search; this stays correct even while the active hint is transiently
//! stale (an eviction can retire the active region mid-mapping).
//!
//! ## Invariants
//!
//! - `regions[i].end < regions[i + 1].start` for all adjacent pairs
//! - `active < max(1, len)`
//! - at most `max_regions` regions are resident

use eyre::{ensure, Result};

use crate::source::ByteMapping;

use super::Region;

#[derive(Debug)]
pub(crate) struct RegionTable<M> {
    regions: Vec<Region<M>>,
    max_regions: usize,
    active: usize,
}

impl<M: ByteMapping> RegionTable<M> {
    pub fn new(max_regions: usize) -> Self {
        Self {
            regions: Vec::with_capacity(max_regions),
            max_regions,
            active: 0,
        }
    }

    pub fn used(&self) -> usize {
        self.regions.len()
    }

    pub fn is_full(&self) -> bool {
        self.regions.len() == self.max_regions
    }

    pub fn max_regions(&self) -> usize {
        self.max_regions
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn set_active(&mut self, slot: usize) {
        debug_assert!(slot < self.regions.len());
        self.active = slot;
    }

    pub fn get(&self, slot: usize) -> &Region<M> {
        &self.regions[slot]
    }

    pub fn get_mut(&mut self, slot: usize) -> &mut Region<M> {
        &mut self.regions[slot]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region<M>> {
        self.regions.iter()
    }

    /// Returns the slot whose region encompasses `pos`, scanning
    /// directionally from the active slot relative to the committed
    /// position `current`.
    pub fn find_covering(&self, pos: u64, current: u64) -> Option<usize> {
        if self.regions.is_empty() {
            return None;
        }

        if pos > current {
            (self.active..self.regions.len()).find(|&i| self.regions[i].encompasses(pos))
        } else if pos < current {
            (0..=self.active)
                .rev()
                .find(|&i| self.regions[i].encompasses(pos))
        } else if self.regions[self.active].encompasses(pos) {
            Some(self.active)
        } else {
            // Unchanged position outside the active region: the cursor is
            // parked one past the active region's end (or on a zero-capacity
            // initial region), so resolve the covering region by position.
            let candidate = self.regions.partition_point(|r| r.start() <= pos);
            candidate
                .checked_sub(1)
                .filter(|&i| self.regions[i].encompasses(pos))
        }
    }

    /// Highest-indexed slot whose region lies strictly before `pos`.
    ///
    /// Region ends are strictly increasing, so "is before" is a prefix
    /// property and the answer is a partition point.
    pub fn closest_before(&self, pos: u64) -> Option<usize> {
        let first_not_before = self.regions.partition_point(|r| r.is_before(pos));
        first_not_before.checked_sub(1)
    }

    /// Lowest-indexed slot whose region lies strictly after `pos`.
    pub fn closest_after(&self, pos: u64) -> Option<usize> {
        let first_after = self.regions.partition_point(|r| !r.is_after(pos));
        (first_after < self.regions.len()).then_some(first_after)
    }

    /// Inserts a region whose span no resident region covers, preserving
    /// ascending order. Returns the slot it landed in.
    ///
    /// The insertion point is `closest_before + 1`, equivalently
    /// `closest_after`. When both neighbors exist they must be consecutive;
    /// a missing neighbor pins the insertion to the matching boundary of
    /// the table.
    pub fn insert(&mut self, region: Region<M>) -> Result<usize> {
        debug_assert!(self.regions.len() < self.max_regions);

        let pos = region.start();
        let before = self.closest_before(pos);
        let after = self.closest_after(pos);

        let slot = match (before, after) {
            (Some(b), Some(a)) => {
                ensure!(
                    a == b + 1,
                    "unable to find insertion point for a region at offset {}: \
                     neighbors at slots {} and {} are not adjacent",
                    pos,
                    b,
                    a
                );
                a
            }
            (Some(b), None) => {
                ensure!(
                    b + 1 == self.regions.len(),
                    "unable to find insertion point for a region at offset {}: \
                     slots above {} neither follow nor cover it",
                    pos,
                    b
                );
                b + 1
            }
            (None, Some(a)) => {
                ensure!(
                    a == 0,
                    "unable to find insertion point for a region at offset {}: \
                     slots below {} neither precede nor cover it",
                    pos,
                    a
                );
                0
            }
            (None, None) => {
                ensure!(
                    self.regions.is_empty(),
                    "unable to find insertion point for a region at offset {}: \
                     table is non-empty but has no neighboring region",
                    pos
                );
                0
            }
        };

        self.regions.insert(slot, region);
        if self.regions.len() > 1 && slot <= self.active {
            self.active += 1;
        }

        debug_assert!(self.is_strictly_ordered());
        Ok(slot)
    }

    /// Removes the region in `slot`, shifting the tail left. The active
    /// index keeps tracking the same region where possible and clamps to
    /// the slot below otherwise.
    pub fn remove(&mut self, slot: usize) -> Region<M> {
        let region = self.regions.remove(slot);

        if self.active == slot {
            self.active = slot.saturating_sub(1);
        } else if self.active > slot {
            self.active -= 1;
        }

        debug_assert!(self.is_strictly_ordered());
        region
    }

    /// Removes and returns the highest-offset region.
    pub fn pop_last(&mut self) -> Option<Region<M>> {
        if self.regions.is_empty() {
            return None;
        }
        Some(self.remove(self.regions.len() - 1))
    }

    /// Drops zero-capacity bookkeeping regions so a real mapping can take
    /// their place. Returns how many were discarded.
    pub fn purge_empty(&mut self) -> usize {
        let mut purged = 0;
        while let Some(slot) = self.regions.iter().position(|r| r.is_empty()) {
            self.remove(slot);
            purged += 1;
        }
        purged
    }

    fn is_strictly_ordered(&self) -> bool {
        self.regions.windows(2).all(|w| w[0].end() < w[1].start())
    }
}
