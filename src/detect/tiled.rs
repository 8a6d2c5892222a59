//! Tiled detection over large frames.
//!
//! Detectors recall small objects poorly when a large frame is scanned in one
//! pass, so the frame is carved into overlapping tiles, the backend runs once
//! per tile, and per-tile boxes are translated back into full-frame
//! coordinates. Duplicate hits from the overlap margins are merged by
//! class-aware IoU suppression, keeping the higher-confidence box.
//!
//! A backend failure on one tile skips only that tile's contribution; the
//! rest of the frame still gets coverage.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Rectangular sub-region descriptor used to carve a frame for detection.
/// Ephemeral: planned and discarded per detection pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug)]
pub struct TilingConfig {
    pub tile_width: u32,
    pub tile_height: u32,
    /// Fraction of the tile dimension shared between neighbouring tiles.
    pub overlap_ratio: f32,
    /// IoU above which two same-class detections are considered duplicates.
    pub merge_iou: f32,
    pub confidence_threshold: f32,
    /// Per-tile wall-clock budget. A tile whose backend call runs past this
    /// is discarded for the current frame.
    pub tile_budget: Duration,
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            tile_width: 512,
            tile_height: 512,
            overlap_ratio: 0.2,
            merge_iou: 0.5,
            confidence_threshold: 0.25,
            tile_budget: Duration::from_secs(2),
        }
    }
}

/// Tile offsets along one axis.
///
/// Positions step by `tile - round(tile * overlap)`. The final tile is
/// shifted backward so it stays inside the frame; a frame smaller than one
/// tile gets a single partial tile covering it.
fn axis_offsets(extent: u32, tile: u32, overlap_ratio: f32) -> Vec<u32> {
    if extent <= tile {
        return vec![0];
    }
    let overlap_px = (tile as f32 * overlap_ratio).round() as u32;
    let step = tile.saturating_sub(overlap_px).max(1);

    let mut offsets = Vec::new();
    let mut pos = 0u32;
    loop {
        if pos + tile >= extent {
            offsets.push(extent - tile);
            break;
        }
        offsets.push(pos);
        pos += step;
    }
    offsets
}

/// Plan the tile grid for a frame. Tiles cover the full frame with no gaps
/// and every tile lies within frame bounds.
pub fn plan_tiles(frame_width: u32, frame_height: u32, cfg: &TilingConfig) -> Vec<Tile> {
    let width = cfg.tile_width.min(frame_width);
    let height = cfg.tile_height.min(frame_height);
    let xs = axis_offsets(frame_width, width, cfg.overlap_ratio);
    let ys = axis_offsets(frame_height, height, cfg.overlap_ratio);

    let mut tiles = Vec::with_capacity(xs.len() * ys.len());
    for &y in &ys {
        for &x in &xs {
            tiles.push(Tile {
                x,
                y,
                width,
                height,
            });
        }
    }
    tiles
}

/// Merge duplicate detections from overlapping tile coverage.
///
/// Greedy confidence-descending suppression: a detection is dropped when an
/// already-kept detection of the same class overlaps it with IoU above the
/// merge threshold. The kept box therefore always has confidence greater
/// than or equal to every box merged into it.
pub fn merge_overlapping(mut detections: Vec<Detection>, merge_iou: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    'candidates: for det in detections {
        for existing in &kept {
            if existing.class_id == det.class_id && existing.bbox.iou(&det.bbox) > merge_iou {
                continue 'candidates;
            }
        }
        kept.push(det);
    }
    kept
}

/// Runs a detector backend tile-by-tile and merges the results into
/// full-frame detections.
pub struct TiledDetector {
    backend: Box<dyn DetectorBackend>,
    cfg: TilingConfig,
}

impl TiledDetector {
    pub fn new(backend: Box<dyn DetectorBackend>, cfg: TilingConfig) -> Self {
        Self { backend, cfg }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn config(&self) -> &TilingConfig {
        &self.cfg
    }

    /// Detect over the whole frame.
    ///
    /// Tile-level failures (backend error, blown time budget, bad region) are
    /// logged and skipped; partial coverage is preferred over dropping the
    /// frame, so this never fails at frame level.
    pub fn detect(&mut self, frame: &Frame) -> Vec<Detection> {
        let tiles = plan_tiles(frame.width(), frame.height(), &self.cfg);
        let mut collected = Vec::new();

        for tile in tiles {
            let region = match frame.region(tile.x, tile.y, tile.width, tile.height) {
                Ok(region) => region,
                Err(err) => {
                    log::warn!("tile +{}+{} skipped: {:#}", tile.x, tile.y, err);
                    continue;
                }
            };

            let started = Instant::now();
            match self.backend.detect(
                region.data(),
                tile.width,
                tile.height,
                self.cfg.confidence_threshold,
            ) {
                Ok(detections) => {
                    if started.elapsed() > self.cfg.tile_budget {
                        log::warn!(
                            "tile +{}+{} blew its {}ms budget, result discarded",
                            tile.x,
                            tile.y,
                            self.cfg.tile_budget.as_millis()
                        );
                        continue;
                    }
                    collected.extend(detections.into_iter().map(|det| Detection {
                        bbox: det.bbox.translate(tile.x as f32, tile.y as f32),
                        ..det
                    }));
                }
                Err(err) => {
                    log::warn!("tile +{}+{} detection failed: {:#}", tile.x, tile.y, err);
                }
            }
        }

        merge_overlapping(collected, self.cfg.merge_iou)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::StubBackend;
    use crate::detect::result::BoundingBox;

    fn cfg(tile: u32, overlap: f32) -> TilingConfig {
        TilingConfig {
            tile_width: tile,
            tile_height: tile,
            overlap_ratio: overlap,
            ..TilingConfig::default()
        }
    }

    fn covers(tiles: &[Tile], x: u32, y: u32) -> bool {
        tiles
            .iter()
            .any(|t| x >= t.x && x < t.x + t.width && y >= t.y && y < t.y + t.height)
    }

    #[test]
    fn tiles_cover_frame_and_stay_in_bounds() {
        for (w, h) in [(1920u32, 1080u32), (512, 512), (640, 480), (513, 511)] {
            let tiles = plan_tiles(w, h, &cfg(512, 0.2));
            assert!(!tiles.is_empty());

            for tile in &tiles {
                assert!(tile.x + tile.width <= w, "tile exceeds width in {}x{}", w, h);
                assert!(tile.y + tile.height <= h, "tile exceeds height in {}x{}", w, h);
            }

            // Sample the frame on a grid plus the far corner: no gaps.
            for x in (0..w).step_by(31) {
                for y in (0..h).step_by(31) {
                    assert!(covers(&tiles, x, y), "gap at ({x},{y}) in {}x{}", w, h);
                }
            }
            assert!(covers(&tiles, w - 1, h - 1));
        }
    }

    #[test]
    fn small_frame_gets_single_partial_tile() {
        let tiles = plan_tiles(100, 80, &cfg(512, 0.2));
        assert_eq!(
            tiles,
            vec![Tile {
                x: 0,
                y: 0,
                width: 100,
                height: 80
            }]
        );
    }

    #[test]
    fn last_tile_is_shifted_backward_not_clipped() {
        let offsets = axis_offsets(922, 512, 0.2);
        // step = 512 - 102 = 410; the second tile lands exactly at 922 - 512.
        assert_eq!(offsets, vec![0, 410]);
    }

    #[test]
    fn overlapping_duplicates_merge_to_highest_confidence() {
        let low = Detection {
            class_id: 0,
            confidence: 0.6,
            bbox: BoundingBox::new(0.0, 0.0, 100.0, 100.0),
        };
        let high = Detection {
            class_id: 0,
            confidence: 0.9,
            bbox: BoundingBox::new(5.0, 0.0, 105.0, 100.0),
        };
        assert!(low.bbox.iou(&high.bbox) > 0.5);

        let merged = merge_overlapping(vec![low, high], 0.5);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].confidence, 0.9);
    }

    #[test]
    fn different_classes_never_merge() {
        let a = Detection {
            class_id: 0,
            confidence: 0.9,
            bbox: BoundingBox::new(0.0, 0.0, 100.0, 100.0),
        };
        let b = Detection {
            class_id: 1,
            confidence: 0.8,
            bbox: BoundingBox::new(0.0, 0.0, 100.0, 100.0),
        };
        assert_eq!(merge_overlapping(vec![a, b], 0.5).len(), 2);
    }

    #[test]
    fn object_in_the_overlap_zone_survives_as_one_detection() {
        // Two tiles at x=0 and x=410 share the 410..512 column. Both report
        // the same object there with slightly different boxes; exactly one
        // survives the merge, and it is the higher-confidence one.
        let frame = Frame::new(922, 512, vec![0u8; 922 * 512 * 3]).unwrap();

        let mut backend = StubBackend::new();
        backend.push_detections(vec![Detection {
            class_id: 0,
            confidence: 0.6,
            bbox: BoundingBox::new(415.0, 100.0, 495.0, 180.0),
        }]);
        backend.push_detections(vec![Detection {
            class_id: 0,
            confidence: 0.8,
            bbox: BoundingBox::new(14.0, 102.0, 94.0, 182.0),
        }]);

        let mut detector = TiledDetector::new(Box::new(backend), cfg(512, 0.2));
        let detections = detector.detect(&frame);

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].confidence, 0.8);
        assert_eq!(
            detections[0].bbox,
            BoundingBox::new(424.0, 102.0, 504.0, 182.0)
        );
    }

    #[test]
    fn failed_tile_is_skipped_not_fatal() {
        // 922x512 with 512-tiles and 0.2 overlap yields exactly two tiles.
        let frame = Frame::new(922, 512, vec![0u8; 922 * 512 * 3]).unwrap();

        let mut backend = StubBackend::new();
        backend.push_error("synthetic tile failure");
        backend.push_detections(vec![Detection {
            class_id: 0,
            confidence: 0.8,
            bbox: BoundingBox::new(10.0, 10.0, 50.0, 50.0),
        }]);

        let mut detector = TiledDetector::new(Box::new(backend), cfg(512, 0.2));
        let detections = detector.detect(&frame);

        // Only the second tile (offset 410) contributed, translated into
        // full-frame coordinates.
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].bbox, BoundingBox::new(420.0, 10.0, 460.0, 50.0));
    }
}
