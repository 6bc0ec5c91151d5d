//! # Multiplexed Buffer
//!
//! [`MuxBuffer`] is the public face of the crate: a logical cursor over the
//! whole file plus bulk `get`/`put` transfers that are transparently stitched
//! across however many regions they touch.
//!
//! ## Transfer Loop
//!
//! Each transfer validates its arguments and the file bounds up front, then
//! repeats until the request is satisfied:
//!
//! 1. Ask the region table for a region covering the pending position; on a
//!    miss, map one in (evicting the least-frequently-used region first if
//!    the table is full).
//! 2. Commit: the pending position becomes the committed position and the
//!    chosen slot becomes the active slot.
//! 3. Copy as many bytes as the region can supply, bump its use counter,
//!    and advance both cursor halves by the bytes moved.
//!
//! Bounds pre-validation guarantees the file holds enough bytes, and every
//! iteration either moves at least one byte or fails, so the loop
//! terminates.
//!
//! ## Cursor
//!
//! The cursor is split in two: the *committed* position records where the
//! last transfer actually landed and anchors the table's directional scans;
//! the *pending* position is what [`MuxBuffer::set_position`] writes and
//! [`MuxBuffer::position`] reports. Repositioning is lazy - no mapping
//! happens until the next transfer.
//!
//! ## Failure Atomicity
//!
//! A transfer that fails while mapping a later region surfaces the error
//! with the cursor at the true post-copy position: bytes copied from earlier
//! regions stay copied and stay counted. Callers that need all-or-nothing
//! semantics can re-seek and retry.
//!
//! ## Lifecycle
//!
//! [`MuxBuffer::close`] consumes the buffer and drains the table from the
//! highest slot down, flushing then unmapping every region and aggregating
//! any flush failures into one error. Dropping the buffer without closing
//! flushes best-effort and discards errors.

mod builder;

pub use builder::MuxBufferBuilder;

use eyre::{ensure, eyre, Result, WrapErr};
use tracing::{debug, trace};

use crate::region::{clamp_region_size, Region, RegionTable};
use crate::source::{AccessMode, ByteMapping, RegionSource};

/// A seemingly unbounded memory-mapped view of a file, backed by a bounded
/// cache of fixed-size OS mappings.
///
/// Construct one with [`MuxBuffer::builder`]. The buffer is single-caller:
/// it takes `&mut self` for transfers and carries no internal
/// synchronization.
#[derive(Debug)]
pub struct MuxBuffer<S: RegionSource> {
    source: S,
    mode: AccessMode,
    min_region_size: u64,
    max_region_size: u64,
    table: RegionTable<S::Mapping>,
    /// File offset where the last transfer landed; anchors directional
    /// region scans.
    committed: u64,
    /// File offset the next transfer starts from; publicly visible as the
    /// buffer's position.
    pending: u64,
}

impl<S: RegionSource> MuxBuffer<S> {
    /// Starts building a buffer over `source`.
    pub fn builder(source: S) -> MuxBufferBuilder<S> {
        MuxBufferBuilder::new(source)
    }

    pub(crate) fn create(
        source: S,
        mode: AccessMode,
        min_region_size: u64,
        max_region_size: u64,
        max_regions: usize,
        initial_position: u64,
    ) -> Result<Self> {
        let file_len = source.len()?;
        let size = clamp_region_size(file_len, min_region_size, max_region_size);
        let map = source
            .map(mode, initial_position, size)
            .wrap_err_with(|| format!("failed to map the initial region at offset {initial_position}"))?;

        let mut table = RegionTable::new(max_regions);
        table.insert(Region::new(initial_position, map))?;

        debug!(
            offset = initial_position,
            size,
            ?mode,
            "mapped initial region"
        );

        Ok(Self {
            source,
            mode,
            min_region_size,
            max_region_size,
            table,
            committed: initial_position,
            pending: initial_position,
        })
    }

    /// This buffer's position: the file offset the next transfer starts
    /// from.
    pub fn position(&self) -> u64 {
        self.pending
    }

    /// Repositions the buffer. Takes effect lazily on the next transfer; no
    /// mapping happens here, and the position may point past EOF until a
    /// transfer validates it.
    pub fn set_position(&mut self, position: u64) {
        self.pending = position;
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn min_region_size(&self) -> u64 {
        self.min_region_size
    }

    pub fn max_region_size(&self) -> u64 {
        self.max_region_size
    }

    pub fn max_regions(&self) -> usize {
        self.table.max_regions()
    }

    /// Number of currently resident regions.
    pub fn used_regions(&self) -> usize {
        self.table.used()
    }

    /// Slot index of the region the last transfer touched.
    pub fn active_region(&self) -> usize {
        self.table.active()
    }

    /// Half-open `(start, end)` spans of the resident regions, ascending.
    pub fn region_spans(&self) -> Vec<(u64, u64)> {
        self.table
            .iter()
            .map(|r| (r.start(), r.start() + r.capacity()))
            .collect()
    }

    /// Transfers `dst.len()` bytes from the file at the current position
    /// into `dst`, advancing the position.
    pub fn get(&mut self, dst: &mut [u8]) -> Result<()> {
        let length = dst.len();
        self.get_range(dst, 0, length)
    }

    /// Transfers `length` bytes from the file at the current position into
    /// `dst[offset..offset + length]`, advancing the position.
    ///
    /// Fails without moving anything when the destination range is out of
    /// bounds or the request reaches past EOF.
    pub fn get_range(&mut self, dst: &mut [u8], offset: usize, length: usize) -> Result<()> {
        check_bounds(offset, length, dst.len())?;
        if length == 0 {
            return Ok(());
        }
        self.check_remaining(length)?;

        trace!(position = self.pending, length, "get");
        self.get_internal(&mut dst[offset..offset + length])
    }

    /// Transfers all of `src` into the file at the current position,
    /// advancing the position. Requires [`AccessMode::ReadWrite`].
    ///
    /// Writes never extend the file; a request past EOF fails before any
    /// byte is moved.
    pub fn put(&mut self, src: &[u8]) -> Result<()> {
        self.put_range(src, 0, src.len())
    }

    /// Transfers `src[offset..offset + length]` into the file at the
    /// current position, advancing the position.
    pub fn put_range(&mut self, src: &[u8], offset: usize, length: usize) -> Result<()> {
        ensure!(
            !self.mode.is_read_only(),
            "buffer is read-only: writes require AccessMode::ReadWrite"
        );
        check_bounds(offset, length, src.len())?;
        if length == 0 {
            return Ok(());
        }
        self.check_remaining(length)?;

        trace!(position = self.pending, length, "put");
        self.put_internal(&src[offset..offset + length])
    }

    /// Writes a single byte at the current position, advancing the position
    /// by one.
    pub fn put_u8(&mut self, byte: u8) -> Result<()> {
        self.put(&[byte])
    }

    /// Synchronously flushes every resident region's mapping to the file.
    pub fn flush(&self) -> Result<()> {
        for region in self.table.iter() {
            region
                .mapping()
                .flush()
                .wrap_err_with(|| format!("failed to flush region at offset {}", region.start()))?;
        }
        Ok(())
    }

    /// Flushes and unmaps every region, consuming the buffer.
    ///
    /// The table drains in descending slot order. Flush failures do not stop
    /// the drain; they are collected and surfaced as one aggregate error
    /// after every mapping has been released.
    pub fn close(mut self) -> Result<()> {
        let mut failures: Vec<String> = Vec::new();

        while let Some(region) = self.table.pop_last() {
            if let Err(err) = region.mapping().flush() {
                failures.push(format!(
                    "failed to flush region at offset {}: {:#}",
                    region.start(),
                    err
                ));
            }
            drop(region);
        }

        debug!(failures = failures.len(), "closed buffer");
        ensure!(
            failures.is_empty(),
            "failed to release {} region(s) on close: {}",
            failures.len(),
            failures.join("; ")
        );
        Ok(())
    }

    fn get_internal(&mut self, dst: &mut [u8]) -> Result<()> {
        let mut copied = 0;
        while copied < dst.len() {
            let slot = self.select_region()?;
            let pending = self.pending;

            let region = self.table.get_mut(slot);
            let local = region_local_offset(pending, region.start())?;
            let available = region.mapping().capacity().saturating_sub(local);
            let step = available.min(dst.len() - copied);
            ensure!(
                step > 0,
                "mapped region at offset {} supplied no bytes for position {}",
                region.start(),
                pending
            );

            dst[copied..copied + step]
                .copy_from_slice(&region.mapping().as_slice()[local..local + step]);
            region.record_use();

            self.advance(step);
            copied += step;
        }
        Ok(())
    }

    fn put_internal(&mut self, src: &[u8]) -> Result<()> {
        let mut copied = 0;
        while copied < src.len() {
            let slot = self.select_region()?;
            let pending = self.pending;

            let region = self.table.get_mut(slot);
            let local = region_local_offset(pending, region.start())?;
            let available = region.mapping().capacity().saturating_sub(local);
            let step = available.min(src.len() - copied);
            ensure!(
                step > 0,
                "mapped region at offset {} supplied no bytes for position {}",
                region.start(),
                pending
            );

            region.mapping_mut().as_mut_slice()?[local..local + step]
                .copy_from_slice(&src[copied..copied + step]);
            region.record_use();

            self.advance(step);
            copied += step;
        }
        Ok(())
    }

    /// Finds or maps the region covering the pending position and commits
    /// it as the active region.
    fn select_region(&mut self) -> Result<usize> {
        let slot = match self.table.find_covering(self.pending, self.committed) {
            Some(slot) => slot,
            None => self.map_region_for(self.pending)?,
        };

        self.committed = self.pending;
        self.table.set_active(slot);
        Ok(slot)
    }

    fn advance(&mut self, bytes: usize) {
        self.committed += bytes as u64;
        self.pending = self.committed;
    }

    /// Maps a new region starting at `pos` and installs it in the table.
    fn map_region_for(&mut self, pos: u64) -> Result<usize> {
        self.table.purge_empty();
        if self.table.is_full() {
            self.evict_lfu_region()?;
        }

        let span = match self.table.closest_after(pos) {
            Some(after) => self.table.get(after).start() - pos,
            None => self.max_region_size,
        };
        // The new region must not reach into its successor: when the gap is
        // narrower than min_region_size, the gap wins.
        let floor = self.min_region_size.min(span);
        let size = clamp_region_size(span, floor, self.max_region_size);

        let map = self
            .source
            .map(self.mode, pos, size)
            .wrap_err_with(|| format!("failed to map a region of {size} bytes at offset {pos}"))?;
        let slot = self.table.insert(Region::new(pos, map))?;

        debug!(offset = pos, size, used = self.table.used(), "mapped region");
        Ok(slot)
    }

    /// Flushes, unmaps, and removes the least-frequently-used region.
    ///
    /// The scan runs from the last slot down and only a strictly smaller
    /// use count displaces the candidate, so a total tie evicts the last
    /// slot - under strictly sequential forward access that removal needs
    /// no left-shifting.
    fn evict_lfu_region(&mut self) -> Result<()> {
        let mut victim = self.table.used() - 1;
        let mut min_count = self.table.get(victim).use_count();
        for slot in (0..victim).rev() {
            let count = self.table.get(slot).use_count();
            if count < min_count {
                victim = slot;
                min_count = count;
            }
        }

        let region = self.table.get(victim);
        region.mapping().flush().wrap_err_with(|| {
            format!(
                "failed to flush region at offset {} before eviction",
                region.start()
            )
        })?;

        let region = self.table.remove(victim);
        debug!(
            offset = region.start(),
            use_count = region.use_count(),
            "evicted least-frequently-used region"
        );
        drop(region);
        Ok(())
    }

    fn check_remaining(&self, length: usize) -> Result<()> {
        let file_len = self.source.len()?;
        let remaining = file_len.saturating_sub(self.pending);
        ensure!(
            length as u64 <= remaining,
            "buffer underflow: {} bytes requested at position {} but the file holds {} bytes",
            length,
            self.pending,
            file_len
        );
        Ok(())
    }
}

impl<S: RegionSource> Drop for MuxBuffer<S> {
    fn drop(&mut self) {
        while let Some(region) = self.table.pop_last() {
            let _ = region.mapping().flush();
        }
    }
}

fn check_bounds(offset: usize, length: usize, capacity: usize) -> Result<()> {
    let end = offset.checked_add(length);
    ensure!(
        end.is_some_and(|end| end <= capacity),
        "range {}..{} is out of bounds for a buffer of {} bytes",
        offset,
        offset.saturating_add(length),
        capacity
    );
    Ok(())
}

fn region_local_offset(pos: u64, start: u64) -> Result<usize> {
    let offset = pos - start;
    usize::try_from(offset)
        .map_err(|_| eyre!("region offset {offset} is out of bounds for the mapping address width"))
}
