//! # muxmap Configuration Constants
//!
//! Region sizing defaults and the resident-region cap. Constants that depend
//! on each other are co-located and the relationship is enforced with a
//! compile-time assertion.
//!
//! ```text
//! DEFAULT_MIN_REGION_SIZE (64 MiB)
//!       │
//!       └─> must be <= DEFAULT_MAX_REGION_SIZE (512 MiB)
//!             Every individual region size is clamped into
//!             [min_region_size, max_region_size].
//!
//! DEFAULT_MAX_REGIONS (16)
//!       │
//!       └─> hard cap on simultaneously resident mappings; bounds
//!           virtual-address-space use at max_regions * max_region_size
//! ```
//!
//! With the defaults, a fully populated buffer addresses at most 8 GiB of
//! mapped file at once.

/// Floor of any individual region's size.
pub const DEFAULT_MIN_REGION_SIZE: u64 = 64 * 1024 * 1024;

/// Ceiling of any individual region's size.
pub const DEFAULT_MAX_REGION_SIZE: u64 = 512 * 1024 * 1024;

/// Hard cap on simultaneously resident regions.
pub const DEFAULT_MAX_REGIONS: usize = 16;

const _: () = assert!(
    DEFAULT_MIN_REGION_SIZE <= DEFAULT_MAX_REGION_SIZE,
    "minimum region size must not exceed maximum region size"
);

const _: () = assert!(DEFAULT_MAX_REGIONS >= 1, "at least one region slot is required");
