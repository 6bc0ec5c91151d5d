//! # Buffer Builder
//!
//! Fluent configuration for [`MuxBuffer`]. Settings are chained before
//! `build()` validates them and maps the initial region eagerly, so a
//! misconfigured buffer fails at construction rather than on first use.
//!
//! ## Defaults
//!
//! | Option             | Default                 |
//! |--------------------|-------------------------|
//! | `mode`             | `AccessMode::ReadOnly`  |
//! | `min_region_size`  | 64 MiB                  |
//! | `max_region_size`  | 512 MiB                 |
//! | `max_regions`      | 16                      |
//! | `initial_position` | 0                       |

use eyre::{ensure, Result};

use crate::config::{DEFAULT_MAX_REGIONS, DEFAULT_MAX_REGION_SIZE, DEFAULT_MIN_REGION_SIZE};
use crate::source::{AccessMode, RegionSource};

use super::MuxBuffer;

/// Builder for [`MuxBuffer`]; start with [`MuxBuffer::builder`].
#[derive(Debug)]
pub struct MuxBufferBuilder<S: RegionSource> {
    source: S,
    mode: AccessMode,
    min_region_size: u64,
    max_region_size: u64,
    max_regions: usize,
    initial_position: u64,
}

impl<S: RegionSource> MuxBufferBuilder<S> {
    pub(crate) fn new(source: S) -> Self {
        Self {
            source,
            mode: AccessMode::default(),
            min_region_size: DEFAULT_MIN_REGION_SIZE,
            max_region_size: DEFAULT_MAX_REGION_SIZE,
            max_regions: DEFAULT_MAX_REGIONS,
            initial_position: 0,
        }
    }

    /// Sets the access mode. Read-only buffers reject `put`.
    pub fn mode(mut self, mode: AccessMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the floor of any individual region's size.
    pub fn min_region_size(mut self, bytes: u64) -> Self {
        self.min_region_size = bytes;
        self
    }

    /// Sets the ceiling of any individual region's size.
    pub fn max_region_size(mut self, bytes: u64) -> Self {
        self.max_region_size = bytes;
        self
    }

    /// Sets the cap on simultaneously resident regions. Together with
    /// `max_region_size` this bounds the buffer's virtual-address-space
    /// footprint.
    pub fn max_regions(mut self, count: usize) -> Self {
        self.max_regions = count;
        self
    }

    /// Sets the starting cursor position.
    pub fn initial_position(mut self, position: u64) -> Self {
        self.initial_position = position;
        self
    }

    /// Validates the configuration and builds the buffer, eagerly mapping
    /// one region at the initial position.
    pub fn build(self) -> Result<MuxBuffer<S>> {
        ensure!(
            self.min_region_size >= 1,
            "minimum region size must be at least 1 byte"
        );
        ensure!(
            self.min_region_size <= self.max_region_size,
            "minimum region size {} exceeds maximum region size {}",
            self.min_region_size,
            self.max_region_size
        );
        ensure!(self.max_regions >= 1, "at least one region slot is required");

        MuxBuffer::create(
            self.source,
            self.mode,
            self.min_region_size,
            self.max_region_size,
            self.max_regions,
            self.initial_position,
        )
    }

    /// Returns the configured access mode.
    pub fn get_mode(&self) -> AccessMode {
        self.mode
    }

    /// Returns the configured region size floor.
    pub fn get_min_region_size(&self) -> u64 {
        self.min_region_size
    }

    /// Returns the configured region size ceiling.
    pub fn get_max_region_size(&self) -> u64 {
        self.max_region_size
    }

    /// Returns the configured resident-region cap.
    pub fn get_max_regions(&self) -> usize {
        self.max_regions
    }

    /// Returns the configured starting position.
    pub fn get_initial_position(&self) -> u64 {
        self.initial_position
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::tempfile;

    use super::*;

    #[test]
    fn builder_defaults_match_the_configuration_constants() {
        let builder = MuxBuffer::builder(tempfile().unwrap());

        assert_eq!(builder.get_mode(), AccessMode::ReadOnly);
        assert_eq!(builder.get_min_region_size(), DEFAULT_MIN_REGION_SIZE);
        assert_eq!(builder.get_max_region_size(), DEFAULT_MAX_REGION_SIZE);
        assert_eq!(builder.get_max_regions(), DEFAULT_MAX_REGIONS);
        assert_eq!(builder.get_initial_position(), 0);
    }

    #[test]
    fn builder_chaining_sets_every_option() {
        let builder = MuxBuffer::builder(tempfile().unwrap())
            .mode(AccessMode::ReadWrite)
            .min_region_size(4096)
            .max_region_size(65536)
            .max_regions(4)
            .initial_position(128);

        assert_eq!(builder.get_mode(), AccessMode::ReadWrite);
        assert_eq!(builder.get_min_region_size(), 4096);
        assert_eq!(builder.get_max_region_size(), 65536);
        assert_eq!(builder.get_max_regions(), 4);
        assert_eq!(builder.get_initial_position(), 128);
    }

    #[test]
    fn build_rejects_a_zero_minimum_region_size() {
        let result = MuxBuffer::builder(tempfile().unwrap())
            .min_region_size(0)
            .build();

        assert!(result.unwrap_err().to_string().contains("at least 1 byte"));
    }

    #[test]
    fn build_rejects_a_minimum_above_the_maximum() {
        let result = MuxBuffer::builder(tempfile().unwrap())
            .min_region_size(1024)
            .max_region_size(512)
            .build();

        assert!(result.unwrap_err().to_string().contains("exceeds"));
    }

    #[test]
    fn build_rejects_zero_region_slots() {
        let result = MuxBuffer::builder(tempfile().unwrap()).max_regions(0).build();

        assert!(result
            .unwrap_err()
            .to_string()
            .contains("at least one region slot"));
    }

    #[test]
    fn built_buffer_reports_its_configuration() {
        let mut file = tempfile().unwrap();
        file.write_all(&[0u8; 256]).unwrap();

        let buf = MuxBuffer::builder(file)
            .min_region_size(64)
            .max_region_size(128)
            .max_regions(3)
            .build()
            .unwrap();

        assert_eq!(buf.mode(), AccessMode::ReadOnly);
        assert_eq!(buf.min_region_size(), 64);
        assert_eq!(buf.max_region_size(), 128);
        assert_eq!(buf.max_regions(), 3);
    }
}
