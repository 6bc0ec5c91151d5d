//! # muxmap - Multiplexed Memory-Mapped Buffer
//!
//! muxmap presents a file as one contiguous, randomly addressable byte buffer
//! of effectively unbounded size, while keeping only a bounded set of
//! fixed-size OS memory mappings (*regions*) resident at any instant. The
//! caller positions a logical cursor anywhere in the file and issues bulk
//! transfers; the buffer transparently creates, selects, splits across, and
//! evicts regions to satisfy each transfer.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::fs::File;
//! use muxmap::MuxBuffer;
//!
//! let file = File::open("data.bin")?;
//! let mut buf = MuxBuffer::builder(file)
//!     .max_regions(8)
//!     .build()?;
//!
//! let mut header = [0u8; 16];
//! buf.get(&mut header)?;
//!
//! buf.set_position(4096);
//! let mut page = vec![0u8; 512];
//! buf.get(&mut page)?;
//!
//! buf.close()?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │        MuxBuffer (get/put/position)       │
//! ├──────────────────────────────────────────┤
//! │  RegionTable (ordered, directional scan)  │
//! ├──────────────────────────────────────────┤
//! │   Region (one OS mapping + use counter)   │
//! ├──────────────────────────────────────────┤
//! │  RegionSource (File via memmap2, or any   │
//! │  caller-supplied mapping implementation)  │
//! └──────────────────────────────────────────┘
//! ```
//!
//! A transfer first asks the region table for a region covering the cursor.
//! On a miss, a new region is mapped on demand; when the table is full, the
//! least-frequently-used region is flushed, unmapped, and discarded first.
//! A single request that spans several regions is stitched together
//! transparently, mapping further regions as needed.
//!
//! ## Region Cache
//!
//! Regions are kept in ascending file-offset order and looked up with a
//! directional scan starting from the most recently touched region, which
//! makes strictly sequential access (forward or backward) a one-step lookup.
//! Eviction is LFU with a deliberate last-slot tie-break: under sequential
//! forward access the whole table ties, and discarding the last slot avoids
//! shifting the array.
//!
//! ## Thread Safety
//!
//! A `MuxBuffer` is a single-caller structure: no locks, no atomics, no
//! interior mutability. Wrap it in your own synchronization if you need to
//! share it.
//!
//! ## Module Overview
//!
//! - [`config`]: Default region sizing and cache capacity
//! - `source`: The `RegionSource`/`ByteMapping` seam and the `std::fs::File`
//!   implementation backed by `memmap2`
//! - `region`: Region descriptor and the ordered region table
//! - `buffer`: The buffer itself - transfer engine, cursor, lifecycle

pub mod config;
mod buffer;
mod region;
mod source;

pub use buffer::{MuxBuffer, MuxBufferBuilder};
pub use source::{AccessMode, ByteMapping, FileMapping, RegionSource};
