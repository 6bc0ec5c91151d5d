//! # Region Descriptor
//!
//! A [`Region`] is one OS mapping of a contiguous file span plus the
//! bookkeeping the cache needs: its start offset in the file, the derived
//! inclusive end offset, and a use counter driving LFU eviction.
//!
//! ## Geometry
//!
//! For a mapping of capacity `c > 0` starting at file offset `s`, the region
//! covers the inclusive span `[s, s + c - 1]`. Zero-capacity regions (an
//! empty file mapped at construction) cover nothing: they never encompass a
//! position, so the first real transfer maps a fresh region in their place.
//!
//! The three predicates `encompasses` / `is_before` / `is_after` are not a
//! partition. For a zero-capacity region at `s`, a probe at `s` satisfies
//! none of them; the table treats such regions as pure bookkeeping.
//!
//! ## Use Counting
//!
//! `use_count` increments once per transfer call that touches the region and
//! saturates at `u64::MAX` instead of wrapping, so a long-lived hot region
//! can never appear freshly unused to the evictor.

mod table;

pub(crate) use table::RegionTable;

use crate::source::ByteMapping;

/// Clamps a requested span length into `[min, max]`.
///
/// Returns exactly `min` when `requested` falls below it and exactly `max`
/// when `requested` exceeds it. `min <= max` is assumed; the fold is written
/// out (rather than `Ord::clamp`) so a misordered pair folds instead of
/// panicking.
pub(crate) fn clamp_region_size(requested: u64, min: u64, max: u64) -> u64 {
    requested.min(max).max(min)
}

/// One mapped file span with its use counter.
#[derive(Debug)]
pub(crate) struct Region<M> {
    start: u64,
    map: M,
    use_count: u64,
}

impl<M: ByteMapping> Region<M> {
    pub fn new(start: u64, map: M) -> Self {
        Self {
            start,
            map,
            use_count: 0,
        }
    }

    /// Inclusive file offset of the first mapped byte.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Inclusive file offset of the last mapped byte; equals `start` for a
    /// zero-capacity region, which covers nothing.
    pub fn end(&self) -> u64 {
        let capacity = self.capacity();
        if capacity > 0 {
            self.start + capacity - 1
        } else {
            self.start
        }
    }

    pub fn capacity(&self) -> u64 {
        self.map.capacity() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.map.capacity() == 0
    }

    /// True iff the region has nonzero capacity and `pos` lies inclusively
    /// within `[start, end]`.
    pub fn encompasses(&self, pos: u64) -> bool {
        !self.is_empty() && pos >= self.start && pos <= self.end()
    }

    /// True iff the region lies strictly before `pos`.
    pub fn is_before(&self, pos: u64) -> bool {
        self.end() < pos
    }

    /// True iff the region lies strictly after `pos`.
    pub fn is_after(&self, pos: u64) -> bool {
        self.start > pos
    }

    pub fn mapping(&self) -> &M {
        &self.map
    }

    pub fn mapping_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn use_count(&self) -> u64 {
        self.use_count
    }

    pub fn record_use(&mut self) {
        self.use_count = self.use_count.saturating_add(1);
    }
}
