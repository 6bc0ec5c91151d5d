//! # Region Source Abstraction
//!
//! This module defines the seam between the buffer and the OS mapping
//! primitive: [`RegionSource`] hands out [`ByteMapping`]s for arbitrary file
//! spans, and `std::fs::File` is the production implementation backed by
//! `memmap2`.
//!
//! ## Why a Trait?
//!
//! The buffer never touches the file directly; every mapping it holds comes
//! from its source. Keeping that behind a trait means:
//!
//! - Callers can hand over a `File` by value or by reference (the blanket
//!   `impl RegionSource for &S` covers borrowed handles).
//! - Tests can inject mapping doubles that count live mappings, fail on
//!   demand, or fail to flush - the release-on-evict and close-drain
//!   behavior is observable without poking at process memory maps.
//!
//! ## Mapping Semantics
//!
//! The `File` implementation differs by access mode:
//!
//! - **Read-only**: the requested length is clamped to what the file can
//!   back (`file_len - offset`). A read-only mapping cannot extend the file,
//!   and an unclamped map would fault on first touch past EOF. A span that
//!   lies entirely at or past EOF yields an empty mapping.
//! - **Read-write**: the file is extended with `set_len` when the requested
//!   span reaches past EOF, then mapped in full. This mirrors what
//!   `FileChannel.map` does on a writable channel.
//!
//! Unmapping is the mapping's `Drop`, so release is deterministic on
//! eviction and on close - there is no finalization pass to wait for.

use std::fs::File;

use eyre::{bail, ensure, Result, WrapErr};
use memmap2::{Mmap, MmapMut, MmapOptions};

/// Whether mappings (and therefore the buffer) permit writes.
///
/// Fixed at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Mappings are shared and immutable; `put` is rejected.
    #[default]
    ReadOnly,
    /// Mappings are writable and changes reach the file per OS
    /// memory-mapping semantics.
    ReadWrite,
}

impl AccessMode {
    pub fn is_read_only(self) -> bool {
        matches!(self, AccessMode::ReadOnly)
    }
}

/// One OS mapping of a contiguous file span.
///
/// Dropping the value unmaps it.
pub trait ByteMapping {
    /// Number of mapped bytes. Zero-capacity mappings are legal (empty
    /// files) and are never selected to serve a transfer.
    fn capacity(&self) -> usize;

    /// The mapped bytes.
    fn as_slice(&self) -> &[u8];

    /// The mapped bytes, writable. Fails for read-only mappings.
    fn as_mut_slice(&mut self) -> Result<&mut [u8]>;

    /// Ask the OS to write the mapped span back to the file.
    fn flush(&self) -> Result<()>;
}

/// Supplier of [`ByteMapping`]s over an externally-owned byte sequence with
/// a known length.
pub trait RegionSource {
    type Mapping: ByteMapping;

    /// Current length of the underlying byte sequence.
    fn len(&self) -> Result<u64>;

    /// Map `[offset, offset + len)` in the given mode.
    fn map(&self, mode: AccessMode, offset: u64, len: u64) -> Result<Self::Mapping>;
}

impl<S: RegionSource> RegionSource for &S {
    type Mapping = S::Mapping;

    fn len(&self) -> Result<u64> {
        (**self).len()
    }

    fn map(&self, mode: AccessMode, offset: u64, len: u64) -> Result<Self::Mapping> {
        (**self).map(mode, offset, len)
    }
}

/// Mapping of a [`File`] span, produced by the `RegionSource` impl on
/// `std::fs::File`.
#[derive(Debug)]
pub enum FileMapping {
    /// Zero-capacity mapping: the span lies at or past EOF of a read-only
    /// file. Present so an empty file can still carry its initial region.
    Empty,
    /// Shared read-only mapping.
    Shared(Mmap),
    /// Writable shared mapping; changes reach the file.
    Writable(MmapMut),
}

impl ByteMapping for FileMapping {
    fn capacity(&self) -> usize {
        match self {
            FileMapping::Empty => 0,
            FileMapping::Shared(map) => map.len(),
            FileMapping::Writable(map) => map.len(),
        }
    }

    fn as_slice(&self) -> &[u8] {
        match self {
            FileMapping::Empty => &[],
            FileMapping::Shared(map) => map,
            FileMapping::Writable(map) => map,
        }
    }

    fn as_mut_slice(&mut self) -> Result<&mut [u8]> {
        match self {
            FileMapping::Empty => Ok(&mut []),
            FileMapping::Shared(_) => bail!("cannot write through a read-only mapping"),
            FileMapping::Writable(map) => Ok(&mut map[..]),
        }
    }

    fn flush(&self) -> Result<()> {
        match self {
            FileMapping::Empty | FileMapping::Shared(_) => Ok(()),
            FileMapping::Writable(map) => map.flush().wrap_err("failed to flush mapped region"),
        }
    }
}

impl RegionSource for File {
    type Mapping = FileMapping;

    fn len(&self) -> Result<u64> {
        let metadata = self
            .metadata()
            .wrap_err("failed to determine file length")?;
        Ok(metadata.len())
    }

    fn map(&self, mode: AccessMode, offset: u64, len: u64) -> Result<FileMapping> {
        let file_len = RegionSource::len(self)?;

        match mode {
            AccessMode::ReadOnly => {
                let len = len.min(file_len.saturating_sub(offset));
                if len == 0 {
                    return Ok(FileMapping::Empty);
                }
                let len = checked_mapping_len(len)?;

                // SAFETY: Mmap::map is unsafe because the mapped file can be
                // modified externally while the mapping is live, which is
                // undefined behavior for the resulting slice. This is safe
                // because:
                // 1. The mapping is read-only; this process never writes it
                // 2. The span was clamped to the file length above, so every
                //    mapped page is backed by the file
                // 3. The mapping's lifetime is tied to the owning Region,
                //    preventing use-after-unmap
                let map = unsafe { MmapOptions::new().offset(offset).len(len).map(self) }
                    .wrap_err_with(|| {
                        format!("failed to map {len} bytes at offset {offset} read-only")
                    })?;
                Ok(FileMapping::Shared(map))
            }
            AccessMode::ReadWrite => {
                let end = offset.checked_add(len).ok_or_else(|| {
                    eyre::eyre!("failed to map region: span [{offset}, +{len}) overflows")
                })?;
                if end > file_len {
                    self.set_len(end).wrap_err_with(|| {
                        format!("failed to map region: cannot extend file to {end} bytes")
                    })?;
                }
                if len == 0 {
                    return Ok(FileMapping::Empty);
                }
                let len = checked_mapping_len(len)?;

                // SAFETY: MmapMut::map_mut is unsafe because memory-mapped
                // files can be modified externally. This is safe because:
                // 1. The buffer is the single caller; it issues no concurrent
                //    access to the mapping
                // 2. The file was extended above, so every mapped page is
                //    backed by the file
                // 3. The mapping's lifetime is tied to the owning Region,
                //    preventing use-after-unmap
                let map = unsafe { MmapOptions::new().offset(offset).len(len).map_mut(self) }
                    .wrap_err_with(|| {
                        format!("failed to map {len} bytes at offset {offset} read-write")
                    })?;
                Ok(FileMapping::Writable(map))
            }
        }
    }
}

fn checked_mapping_len(len: u64) -> Result<usize> {
    ensure!(
        usize::try_from(len).is_ok(),
        "mapping of {} bytes exceeds the platform address width",
        len
    );
    Ok(len as usize)
}
