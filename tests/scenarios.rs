//! # End-to-End Buffer Scenarios
//!
//! Exercises the buffer over real temp files through the public API only:
//!
//! 1. Sequential forward reads mapping one region per step
//! 2. Sequential backward reads with lazy repositioning
//! 3. Random-access round-trips against known file content
//! 4. Write round-trips, including durability across eviction and close
//! 5. Cursor semantics shared by `get` and `put`

use std::fs::{self, File, OpenOptions};
use std::io::Write;

use muxmap::{AccessMode, MuxBuffer};
use tempfile::{tempdir, tempfile};

const PATTERN: [u8; 8] = [1, 2, 3, 4, 5, 6, 7, 8];

fn patterned_file(repeats: usize) -> File {
    let mut file = tempfile().unwrap();
    for _ in 0..repeats {
        file.write_all(&PATTERN).unwrap();
    }
    file
}

fn counting_file(len: usize) -> File {
    let mut file = tempfile().unwrap();
    let bytes: Vec<u8> = (0..len).map(|i| i as u8).collect();
    file.write_all(&bytes).unwrap();
    file
}

#[test]
fn sequential_forward_read_touches_one_region_per_step() {
    let mut buf = MuxBuffer::builder(patterned_file(8))
        .min_region_size(8)
        .max_region_size(8)
        .max_regions(8)
        .build()
        .unwrap();

    for _ in 0..8 {
        let mut dst = [0u8; 8];
        buf.get(&mut dst).unwrap();
        assert_eq!(dst, PATTERN);
    }

    assert_eq!(buf.used_regions(), 8);
    assert_eq!(buf.active_region(), 7);
    assert_eq!(buf.position(), 64);

    buf.close().unwrap();
}

#[test]
fn sequential_backward_read_fills_the_table_front_to_back() {
    let file = counting_file(32);
    let mut buf = MuxBuffer::builder(file)
        .min_region_size(8)
        .max_region_size(8)
        .max_regions(4)
        .initial_position(24)
        .build()
        .unwrap();

    for i in 0..4u64 {
        let start = 32 - 8 * (i + 1);
        buf.set_position(start);
        let mut dst = [0u8; 8];
        buf.get(&mut dst).unwrap();

        let expected: Vec<u8> = (start..start + 8).map(|b| b as u8).collect();
        assert_eq!(dst.as_slice(), expected.as_slice());
    }

    assert_eq!(buf.active_region(), 0);
    assert_eq!(buf.used_regions(), 4);
    assert_eq!(
        buf.region_spans(),
        vec![(0, 8), (8, 16), (16, 24), (24, 32)]
    );

    buf.close().unwrap();
}

#[test]
fn random_access_reads_return_the_addressed_bytes() {
    let mut buf = MuxBuffer::builder(counting_file(256))
        .min_region_size(16)
        .max_region_size(16)
        .max_regions(3)
        .build()
        .unwrap();

    for (pos, len) in [
        (0u64, 16usize),
        (240, 16),
        (100, 10),
        (50, 50),
        (200, 56),
        (0, 1),
        (255, 1),
        (31, 2),
    ] {
        buf.set_position(pos);
        let mut dst = vec![0u8; len];
        buf.get(&mut dst).unwrap();

        let expected: Vec<u8> = (pos..pos + len as u64).map(|b| b as u8).collect();
        assert_eq!(dst, expected, "read of {len} bytes at {pos}");
        assert_eq!(buf.position(), pos + len as u64);
        assert!(buf.used_regions() <= 3);
    }

    buf.close().unwrap();
}

#[test]
fn reads_alternating_directions_stay_consistent() {
    let mut buf = MuxBuffer::builder(counting_file(128))
        .min_region_size(8)
        .max_region_size(8)
        .max_regions(4)
        .build()
        .unwrap();

    for pos in [0u64, 120, 8, 112, 64, 63, 65] {
        buf.set_position(pos);
        let mut dst = [0u8; 4];
        buf.get(&mut dst).unwrap();
        let expected: Vec<u8> = (pos..pos + 4).map(|b| b as u8).collect();
        assert_eq!(dst.as_slice(), expected.as_slice(), "read at {pos}");
    }

    buf.close().unwrap();
}

#[test]
fn writes_survive_eviction_and_close() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.bin");

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .unwrap();
    file.set_len(32).unwrap();

    let mut buf = MuxBuffer::builder(file)
        .mode(AccessMode::ReadWrite)
        .min_region_size(8)
        .max_region_size(8)
        .max_regions(2)
        .build()
        .unwrap();

    // Four regions' worth of writes through a two-slot table: two of the
    // regions are flushed and unmapped by eviction along the way.
    let payload: Vec<u8> = (0..32).map(|i| 0xf0 ^ i as u8).collect();
    buf.put(&payload).unwrap();
    assert_eq!(buf.position(), 32);
    assert_eq!(buf.used_regions(), 2);

    buf.close().unwrap();

    assert_eq!(fs::read(&path).unwrap(), payload);
}

#[test]
fn written_bytes_are_readable_before_any_flush() {
    let file = tempfile().unwrap();
    file.set_len(64).unwrap();

    let mut buf = MuxBuffer::builder(file)
        .mode(AccessMode::ReadWrite)
        .min_region_size(8)
        .max_region_size(8)
        .build()
        .unwrap();

    buf.set_position(24);
    buf.put(&PATTERN).unwrap();

    buf.set_position(24);
    let mut dst = [0u8; 8];
    buf.get(&mut dst).unwrap();
    assert_eq!(dst, PATTERN);

    buf.close().unwrap();
}

#[test]
fn flush_persists_without_closing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data.bin");

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .unwrap();
    file.set_len(16).unwrap();

    let mut buf = MuxBuffer::builder(file)
        .mode(AccessMode::ReadWrite)
        .min_region_size(16)
        .max_region_size(16)
        .build()
        .unwrap();

    buf.put(&PATTERN).unwrap();
    buf.flush().unwrap();

    assert_eq!(&fs::read(&path).unwrap()[..8], &PATTERN);

    buf.close().unwrap();
}

#[test]
fn get_and_put_share_cursor_semantics() {
    let file = tempfile().unwrap();
    file.set_len(64).unwrap();

    let mut buf = MuxBuffer::builder(file)
        .mode(AccessMode::ReadWrite)
        .min_region_size(64)
        .max_region_size(64)
        .build()
        .unwrap();

    buf.put(&PATTERN).unwrap();
    assert_eq!(buf.position(), 8);

    let mut dst = [0u8; 8];
    buf.get(&mut dst).unwrap();
    assert_eq!(buf.position(), 16);

    buf.put_u8(0x7f).unwrap();
    assert_eq!(buf.position(), 17);

    buf.close().unwrap();
}

#[test]
fn repositioning_is_lazy_and_validated_on_transfer() {
    let mut buf = MuxBuffer::builder(counting_file(64))
        .min_region_size(8)
        .max_region_size(8)
        .build()
        .unwrap();

    // Way past EOF: legal until a transfer tries to realize it.
    buf.set_position(1 << 40);
    assert_eq!(buf.position(), 1 << 40);
    assert_eq!(buf.used_regions(), 1);

    let mut dst = [0u8; 1];
    let err = buf.get(&mut dst).unwrap_err();
    assert!(err.to_string().contains("underflow"));

    buf.set_position(63);
    buf.get(&mut dst).unwrap();
    assert_eq!(dst[0], 63);

    buf.close().unwrap();
}

#[test]
fn close_after_read_only_use_succeeds() {
    let mut buf = MuxBuffer::builder(patterned_file(4))
        .min_region_size(8)
        .max_region_size(8)
        .build()
        .unwrap();

    let mut dst = [0u8; 32];
    buf.get(&mut dst).unwrap();

    buf.close().unwrap();
}
