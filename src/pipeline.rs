//! The per-frame pipeline loop.
//!
//! One producer drives the stages strictly in acquisition order:
//! acquire -> detect -> track -> classify -> annotate -> encode -> publish.
//! Publishing replaces the hub's latest frame, never queues, so a slow or
//! absent viewer cannot stall acquisition. The detector call dominates
//! per-frame latency and is assumed blocking.
//!
//! Failure policy: a failed encode drops that frame's publish and the hub
//! retains the previous one; a frame-source error is fatal and terminates
//! the loop.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::detect::TiledDetector;
use crate::ingest::{frame_interval, CaptureSource};
use crate::render;
use crate::stream::{FrameHub, StreamEncoder};
use crate::track::Tracker;
use crate::Frame;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

pub struct Pipeline {
    detector: TiledDetector,
    tracker: Tracker,
    encoder: StreamEncoder,
    hub: Arc<FrameHub>,
    frames_processed: u64,
    frames_published: u64,
}

impl Pipeline {
    pub fn new(
        detector: TiledDetector,
        tracker: Tracker,
        encoder: StreamEncoder,
        hub: Arc<FrameHub>,
    ) -> Self {
        Self {
            detector,
            tracker,
            encoder,
            hub,
            frames_processed: 0,
            frames_published: 0,
        }
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn frames_published(&self) -> u64 {
        self.frames_published
    }

    /// Run one frame through detection, tracking, annotation and publish.
    pub fn process_frame(&mut self, frame: &Frame, now: Instant) {
        let detections = self.detector.detect(frame);
        self.tracker.update(&detections, now);

        let annotated = render::annotate(frame, self.tracker.tracks(), now);
        self.frames_processed += 1;

        match self.encoder.encode(&annotated) {
            Ok(jpeg) => {
                self.hub.publish(jpeg);
                self.frames_published += 1;
            }
            Err(err) => {
                // Keep the previous published frame; never push a bad one.
                log::warn!(
                    "frame {} encode failed, publish skipped: {:#}",
                    self.frames_processed,
                    err
                );
            }
        }
    }

    /// Pull frames from the source until shutdown or a fatal source error.
    pub fn run(
        &mut self,
        source: &mut CaptureSource,
        target_fps: u32,
        shutdown: &AtomicBool,
    ) -> Result<()> {
        let interval = frame_interval(target_fps);
        let mut last_health_log = Instant::now();

        while !shutdown.load(Ordering::SeqCst) {
            let started = Instant::now();
            let frame = source.next_frame().context("frame source failed")?;
            self.process_frame(&frame, started);

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let stats = source.stats();
                log::info!(
                    "source={} healthy={} captured={} tracks={} published={}",
                    stats.source,
                    source.is_healthy(),
                    stats.frames_captured,
                    self.tracker.tracks().len(),
                    self.frames_published
                );
                last_health_log = Instant::now();
            }

            let elapsed = started.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        Ok(())
    }
}
