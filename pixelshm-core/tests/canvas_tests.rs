// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Integration tests for the shared canvas.
//!
//! Each test works on its own segment name (tag + pid) and unlinks it when done.

use std::sync::{Arc, Barrier};
use std::thread;

use pixelshm_core::shm::{Attachment, SharedMemoryRegion, HEADER_SIZE};
use pixelshm_core::{
    CanvasError, ConfigLoader, OpenError, Resolution, SegmentName, SharedCanvas, StatsLayout,
};

const MAX_PORTS: usize = 32;
const RECORD_SIZE: usize = 24;

/// Unlinks the segment on drop, even when an assertion fails.
struct Segment(SegmentName);

impl Segment {
    fn new(tag: &str) -> Self {
        let name = SegmentName::new(format!("/pixelshm-it-{}-{}", tag, std::process::id()))
            .expect("valid segment name");
        let _ = SharedMemoryRegion::unlink(&name);
        Self(name)
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        let _ = SharedMemoryRegion::unlink(&self.0);
    }
}

fn stats() -> StatsLayout {
    StatsLayout::new(MAX_PORTS, RECORD_SIZE).unwrap()
}

fn res(width: u16, height: u16) -> Resolution {
    Resolution::new(width, height).unwrap()
}

fn expected_size(width: usize, height: usize) -> usize {
    4 + width * height * 4 + MAX_PORTS * RECORD_SIZE
}

/// Raw bytes of a segment as another process would see them.
fn segment_bytes(name: &SegmentName) -> Vec<u8> {
    let region = SharedMemoryRegion::open_existing(name).expect("segment exists");
    // SAFETY: the region is mapped for region.size() bytes while we copy
    unsafe { std::slice::from_raw_parts(region.as_ptr(), region.size()).to_vec() }
}

fn header(bytes: &[u8]) -> (u16, u16) {
    (
        u16::from_ne_bytes([bytes[0], bytes[1]]),
        u16::from_ne_bytes([bytes[2], bytes[3]]),
    )
}

#[test]
fn test_fresh_create_is_sized_and_zeroed() {
    let seg = Segment::new("fresh");
    let canvas = SharedCanvas::open(&seg.0, res(7, 5), stats()).unwrap();
    assert_eq!(canvas.attachment(), Attachment::Created);

    let bytes = segment_bytes(&seg.0);
    assert_eq!(bytes.len(), expected_size(7, 5));
    assert_eq!(header(&bytes), (7, 5));
    assert!(bytes[HEADER_SIZE..].iter().all(|&b| b == 0));
}

#[test]
fn test_scenario_two_by_two() {
    let seg = Segment::new("scenario");
    let canvas = SharedCanvas::open(&seg.0, res(2, 2), stats()).unwrap();
    assert_eq!(canvas.layout().total_size(), 4 + 16 + MAX_PORTS * RECORD_SIZE);

    canvas.set(0, 0, 0xFF0000FF);
    assert_eq!(canvas.get(0, 0), 0xFF0000FF);
    assert_eq!(canvas.get(1, 1), 0);
}

#[test]
fn test_idempotent_attach_shares_pixels() {
    let seg = Segment::new("attach");
    let first = SharedCanvas::open(&seg.0, res(16, 9), stats()).unwrap();
    let second = SharedCanvas::open(&seg.0, res(16, 9), stats()).unwrap();
    assert_eq!(second.attachment(), Attachment::Reused);

    first.set(15, 8, 0x12345678);
    assert_eq!(second.get(15, 8), 0x12345678);

    second.set(3, 4, 0xCAFEBABE);
    assert_eq!(first.get(3, 4), 0xCAFEBABE);

    first.stats().write(5, &[7; RECORD_SIZE]).unwrap();
    assert_eq!(second.stats().occupied(), vec![5]);
}

#[test]
fn test_reattach_does_not_zero_existing_pixels() {
    let seg = Segment::new("persist");
    {
        let canvas = SharedCanvas::open(&seg.0, res(4, 4), stats()).unwrap();
        canvas.set(2, 2, 0xABCDEF01);
    }
    // Segment outlives the handle that created it.
    let canvas = SharedCanvas::open(&seg.0, res(4, 4), stats()).unwrap();
    assert_eq!(canvas.get(2, 2), 0xABCDEF01);
}

#[test]
fn test_dimension_mismatch_leaves_segment_untouched() {
    let seg = Segment::new("dims");
    let canvas = SharedCanvas::open(&seg.0, res(8, 8), stats()).unwrap();
    canvas.set(1, 1, 0xDEADBEEF);
    let before = segment_bytes(&seg.0);

    for (w, h) in [(8, 9), (9, 8), (1, 1), (16, 16)] {
        let err = SharedCanvas::open(&seg.0, res(w, h), stats()).unwrap_err();
        match err {
            CanvasError::Open(OpenError::DimensionMismatch {
                expected, actual, ..
            }) => {
                assert_eq!(expected, expected_size(w as usize, h as usize));
                assert_eq!(actual, expected_size(8, 8));
            }
            other => panic!("expected DimensionMismatch, got {other:?}"),
        }
    }

    assert_eq!(segment_bytes(&seg.0), before);
    assert_eq!(canvas.get(1, 1), 0xDEADBEEF);
}

#[test]
fn test_stats_layout_mismatch_is_dimension_mismatch() {
    let seg = Segment::new("ports");
    let _canvas = SharedCanvas::open(&seg.0, res(4, 4), stats()).unwrap();

    let err = SharedCanvas::open(&seg.0, res(4, 4), StatsLayout::new(16, RECORD_SIZE).unwrap())
        .unwrap_err();
    assert!(matches!(
        err,
        CanvasError::Open(OpenError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_header_mismatch_with_equal_size() {
    let seg = Segment::new("transposed");
    let _canvas = SharedCanvas::open(&seg.0, res(3, 6), stats()).unwrap();

    let err = SharedCanvas::open(&seg.0, res(6, 3), stats()).unwrap_err();
    assert!(matches!(
        err,
        CanvasError::Open(OpenError::WidthMismatch {
            stored: 3,
            requested: 6,
            ..
        })
    ));

    let err = SharedCanvas::open(&seg.0, res(3, 6), stats()).map(|_| ());
    assert!(err.is_ok());
}

#[test]
fn test_out_of_range_set_is_ignored() {
    let seg = Segment::new("bounds");
    let canvas = SharedCanvas::open(&seg.0, res(4, 3), stats()).unwrap();
    let before = segment_bytes(&seg.0);

    for (x, y) in [(4, 0), (0, 3), (4, 3), (u16::MAX, 0), (0, u16::MAX), (u16::MAX, u16::MAX)] {
        canvas.set(x, y, 0xFFFFFFFF);
        assert!(!canvas.try_set(x, y, 0xFFFFFFFF));
    }

    // (4, 0) would land on (0, 1) without the bounds check.
    assert_eq!(canvas.get(0, 1), 0);
    assert_eq!(segment_bytes(&seg.0), before);
}

#[test]
fn test_set_get_round_trip_over_grid() {
    let seg = Segment::new("roundtrip");
    let canvas = SharedCanvas::open(&seg.0, res(13, 7), stats()).unwrap();

    for y in 0..7u16 {
        for x in 0..13u16 {
            let rgba = (x as u32) << 24 | (y as u32) << 16 | 0xBEEF;
            assert!(canvas.try_set(x, y, rgba));
        }
    }
    for y in 0..7u16 {
        for x in 0..13u16 {
            let rgba = (x as u32) << 24 | (y as u32) << 16 | 0xBEEF;
            assert_eq!(canvas.get(x, y), rgba);
            assert_eq!(canvas.get_checked(x, y), Some(rgba));
        }
    }
}

#[test]
fn test_pixels_are_row_major_in_segment() {
    let seg = Segment::new("rowmajor");
    let canvas = SharedCanvas::open(&seg.0, res(3, 2), stats()).unwrap();
    canvas.set(2, 1, 0x01020304);

    let bytes = segment_bytes(&seg.0);
    // x + y * width = 2 + 1 * 3
    let offset = HEADER_SIZE + 5 * 4;
    assert_eq!(
        u32::from_ne_bytes(bytes[offset..offset + 4].try_into().unwrap()),
        0x01020304
    );
}

#[test]
fn test_stats_region_follows_pixels() {
    let seg = Segment::new("statsoffset");
    let canvas = SharedCanvas::open(&seg.0, res(2, 2), stats()).unwrap();
    canvas.stats().write(1, &[0xAB; RECORD_SIZE]).unwrap();

    let bytes = segment_bytes(&seg.0);
    let offset = HEADER_SIZE + 2 * 2 * 4 + RECORD_SIZE;
    assert!(bytes[offset..offset + RECORD_SIZE].iter().all(|&b| b == 0xAB));
    assert!(bytes[offset - RECORD_SIZE..offset].iter().all(|&b| b == 0));
}

#[test]
fn test_attach_discovers_resolution() {
    let seg = Segment::new("discover");
    let producer = SharedCanvas::open(&seg.0, res(20, 10), stats()).unwrap();
    producer.set(19, 9, 0x00FF00FF);

    let consumer = SharedCanvas::attach(&seg.0, stats()).unwrap();
    assert_eq!(consumer.resolution(), res(20, 10));
    assert_eq!(consumer.get(19, 9), 0x00FF00FF);
    assert_eq!(consumer.checksum(), producer.checksum());
}

#[test]
fn test_attach_missing_segment() {
    let seg = Segment::new("nobackend");
    let err = SharedCanvas::attach(&seg.0, stats()).unwrap_err();
    assert!(matches!(err, CanvasError::Open(OpenError::Access { .. })));
}

#[test]
fn test_attach_with_wrong_stats_layout() {
    let seg = Segment::new("discover-ports");
    let _producer = SharedCanvas::open(&seg.0, res(4, 4), stats()).unwrap();

    let err = SharedCanvas::attach(&seg.0, StatsLayout::new(8, RECORD_SIZE).unwrap()).unwrap_err();
    assert!(matches!(
        err,
        CanvasError::Open(OpenError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_drain_hands_out_changed_pixels_once() {
    let seg = Segment::new("drain");
    let canvas = SharedCanvas::open(&seg.0, res(5, 4), stats()).unwrap();
    canvas.set(1, 0, 0x112233FF);
    canvas.set(4, 3, 0x22000000);

    let mut seen = Vec::new();
    let drained: usize = canvas
        .partition(3)
        .iter()
        .map(|span| canvas.drain(span, |x, y, rgba| seen.push((x, y, rgba))))
        .sum();

    assert_eq!(drained, 2);
    assert_eq!(seen, vec![(1, 0, 0x112233FF), (4, 3, 0x22000000)]);
    assert_eq!(canvas.lit_pixels(), 0);
}

#[test]
fn test_drain_ignores_alpha_only_pixels() {
    let seg = Segment::new("drain-alpha");
    let canvas = SharedCanvas::open(&seg.0, res(2, 2), stats()).unwrap();
    canvas.set(0, 0, 0x000000FF);
    canvas.set(1, 1, 0x0000FF00);

    let mut seen = Vec::new();
    let span = canvas.partition(1).remove(0);
    let drained = canvas.drain(&span, |x, y, rgba| seen.push((x, y, rgba)));

    assert_eq!(drained, 1);
    assert_eq!(seen, vec![(1, 1, 0x0000FF00)]);
    // Alpha-only pixels stay where they are.
    assert_eq!(canvas.get(0, 0), 0x000000FF);
    assert_eq!(canvas.get(1, 1), 0);
}

#[test]
fn test_fill_clear_and_snapshot() {
    let seg = Segment::new("fill");
    let canvas = SharedCanvas::open(&seg.0, res(3, 3), stats()).unwrap();

    canvas.fill(0x80808080);
    assert_eq!(canvas.snapshot(), vec![0x80808080; 9]);
    assert_eq!(canvas.lit_pixels(), 9);

    canvas.clear();
    assert_eq!(canvas.snapshot(), vec![0; 9]);
}

#[test]
fn test_summary_reports_canvas_state() {
    let seg = Segment::new("summary");
    let canvas = SharedCanvas::open(&seg.0, res(4, 2), stats()).unwrap();
    canvas.set(0, 0, 1);
    canvas.stats().write(3, &[1; RECORD_SIZE]).unwrap();

    let summary = canvas.summary();
    assert_eq!(summary.name, seg.0.as_str());
    assert_eq!((summary.width, summary.height), (4, 2));
    assert_eq!(summary.segment_size, expected_size(4, 2));
    assert_eq!(summary.occupied_ports, vec![3]);
    assert_eq!(summary.lit_pixels, 1);
}

#[test]
fn test_open_from_config() {
    let seg = Segment::new("config");
    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("pixelshm.yaml");
    std::fs::write(
        &path,
        format!(
            "canvas:\n  name: {}\n  width: 6\n  height: 2\nstatistics:\n  max_ports: 4\n  record_size: 8\n",
            seg.0
        ),
    )
    .expect("Failed to write config");

    let config = ConfigLoader::load_file(&path).unwrap();
    let canvas = SharedCanvas::from_config(&config).unwrap();
    assert_eq!(canvas.layout().total_size(), 4 + 6 * 2 * 4 + 4 * 8);
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let err = ConfigLoader::load_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, CanvasError::ConfigNotFound { .. }));
}

/// Many handles racing to create the same fresh segment. Creation is not
/// mutually exclusive, so zero-fills may interleave, but every opener must
/// succeed and the header must end up exactly (W, H).
#[test]
fn test_create_race_keeps_header_consistent() {
    const THREADS: usize = 8;

    for round in 0..10 {
        let seg = Segment::new(&format!("race{}", round));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let name = seg.0.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    SharedCanvas::open(&name, res(64, 32), stats()).map(|canvas| canvas.resolution())
                })
            })
            .collect();

        for handle in handles {
            let resolution = handle.join().expect("opener panicked").unwrap();
            assert_eq!(resolution, res(64, 32));
        }

        let bytes = segment_bytes(&seg.0);
        assert_eq!(bytes.len(), expected_size(64, 32));
        assert_eq!(header(&bytes), (64, 32));
    }
}

#[test]
fn test_concurrent_writers_last_writer_wins() {
    let seg = Segment::new("writers");
    let canvas = Arc::new(SharedCanvas::open(&seg.0, res(32, 32), stats()).unwrap());

    let handles: Vec<_> = (1..=4u32)
        .map(|id| {
            let canvas = Arc::clone(&canvas);
            thread::spawn(move || {
                for _ in 0..100 {
                    for y in 0..32 {
                        for x in 0..32 {
                            canvas.set(x, y, id);
                        }
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer panicked");
    }

    // Every cell holds one writer's whole word, never a mix.
    assert!(canvas.snapshot().iter().all(|&p| (1..=4).contains(&p)));
}
