//! Identity tracking across frames.
//!
//! The tracker associates each frame's detections with the previous frame's
//! live tracks by greedy nearest-neighbor matching on box centers, restricted
//! to equal class ids. Candidate pairs are claimed in ascending-distance
//! order, which approximates a stable minimum-cost matching without a full
//! optimal assignment. That is a deliberate tradeoff: it keeps ids visually
//! stable at this scale, and its known failure mode (two close objects
//! crossing paths can swap ids) is accepted rather than fixed.
//!
//! Track ids are allocated from a monotonic counter and never reused within
//! a process run, including after retirement.

mod activity;

use std::cmp::Ordering;
use std::time::{Duration, Instant};

pub use activity::{ActivityRules, ActivityState};

use crate::detect::{BoundingBox, Detection};

/// One physical object followed across consecutive frames.
#[derive(Clone, Debug)]
pub struct Track {
    /// Opaque identity, unique for the lifetime of the process.
    pub id: u64,
    pub class_id: u32,
    /// Latest matched detection box, for rendering.
    pub bbox: BoundingBox,
    /// Movement anchor: the center recorded at the last supra-threshold move.
    pub last_center: (f32, f32),
    /// When the track last moved past the noise threshold.
    pub last_move_at: Instant,
    pub state: ActivityState,
    pub(crate) misses: u32,
}

impl Track {
    /// How long the track has been still.
    pub fn stalled_for(&self, now: Instant) -> Duration {
        now.duration_since(self.last_move_at)
    }
}

#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// Maximum center distance (pixels) for a detection to claim a track.
    pub association_radius: f32,
    /// Consecutive unmatched frames a track survives before retirement.
    /// Tolerates detector flicker.
    pub max_misses: u32,
    pub rules: ActivityRules,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            association_radius: 120.0,
            max_misses: 3,
            rules: ActivityRules::default(),
        }
    }
}

pub struct Tracker {
    cfg: TrackerConfig,
    tracks: Vec<Track>,
    next_id: u64,
}

impl Tracker {
    pub fn new(cfg: TrackerConfig) -> Self {
        Self {
            cfg,
            tracks: Vec::new(),
            next_id: 1,
        }
    }

    /// Live tracks after the most recent update.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Advance the track table by one frame.
    ///
    /// Matched tracks get their box updated and their activity state
    /// re-evaluated; unmatched detections spawn fresh tracks (initial state
    /// Active, movement clock started at `now`); tracks unmatched for more
    /// than `max_misses` consecutive frames are retired.
    pub fn update(&mut self, detections: &[Detection], now: Instant) {
        // All candidate pairings inside the association radius, same class
        // only, sorted so the closest pairs are claimed first.
        let mut candidates: Vec<(f32, usize, usize)> = Vec::new();
        for (det_idx, det) in detections.iter().enumerate() {
            let det_center = det.bbox.center();
            for (track_idx, track) in self.tracks.iter().enumerate() {
                if track.class_id != det.class_id {
                    continue;
                }
                let dist = activity::distance(det_center, track.last_center);
                if dist <= self.cfg.association_radius {
                    candidates.push((dist, det_idx, track_idx));
                }
            }
        }
        candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let mut det_claimed = vec![false; detections.len()];
        let mut track_claimed = vec![false; self.tracks.len()];
        for (_, det_idx, track_idx) in candidates {
            if det_claimed[det_idx] || track_claimed[track_idx] {
                continue;
            }
            det_claimed[det_idx] = true;
            track_claimed[track_idx] = true;

            let track = &mut self.tracks[track_idx];
            track.bbox = detections[det_idx].bbox;
            track.misses = 0;
            self.cfg
                .rules
                .apply(track, detections[det_idx].bbox.center(), now);
        }

        // Unmatched tracks age toward retirement.
        for (track_idx, track) in self.tracks.iter_mut().enumerate() {
            if !track_claimed[track_idx] {
                track.misses += 1;
            }
        }
        let max_misses = self.cfg.max_misses;
        self.tracks.retain(|track| {
            if track.misses > max_misses {
                log::debug!("track {} retired after {} misses", track.id, track.misses);
                false
            } else {
                true
            }
        });

        // Unmatched detections spawn new tracks with fresh ids.
        for (det_idx, det) in detections.iter().enumerate() {
            if det_claimed[det_idx] {
                continue;
            }
            let id = self.next_id;
            self.next_id += 1;
            self.tracks.push(Track {
                id,
                class_id: det.class_id,
                bbox: det.bbox,
                last_center: det.bbox.center(),
                last_move_at: now,
                state: ActivityState::Active,
                misses: 0,
            });
            log::debug!("track {} created (class {})", id, det.class_id);
        }
    }
}
