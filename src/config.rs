//! Daemon configuration.
//!
//! Layered the usual way: defaults, then an optional JSON config file
//! (`ARMWATCH_CONFIG` or `--config`), then env-var overrides, then
//! validation. All options are static for a run; there is no hot reload.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::detect::TilingConfig;
use crate::ingest::SourceConfig;
use crate::stream::EncoderConfig;
use crate::track::TrackerConfig;

const DEFAULT_SOURCE_URL: &str = "stub://bench";
const DEFAULT_TARGET_FPS: u32 = 10;
const DEFAULT_CAPTURE_WIDTH: u32 = 1280;
const DEFAULT_CAPTURE_HEIGHT: u32 = 720;
const DEFAULT_BACKEND: &str = "luma";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5000";

#[derive(Debug, Deserialize, Default)]
struct MonitorConfigFile {
    source: Option<SourceSection>,
    detection: Option<DetectionSection>,
    tracking: Option<TrackingSection>,
    stream: Option<StreamSection>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceSection {
    url: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionSection {
    backend: Option<String>,
    confidence_threshold: Option<f32>,
    tile_width: Option<u32>,
    tile_height: Option<u32>,
    overlap_ratio: Option<f32>,
    merge_iou: Option<f32>,
    tile_budget_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TrackingSection {
    association_radius: Option<f32>,
    max_misses: Option<u32>,
    movement_threshold_px: Option<f32>,
    alert_secs: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct StreamSection {
    listen: Option<String>,
    stream_width: Option<u32>,
    jpeg_quality: Option<u8>,
}

#[derive(Clone, Debug)]
pub struct MonitorConfig {
    pub source: SourceConfig,
    pub backend: String,
    pub tiling: TilingConfig,
    pub tracking: TrackerConfig,
    pub listen_addr: String,
    pub encoder: EncoderConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                url: DEFAULT_SOURCE_URL.to_string(),
                target_fps: DEFAULT_TARGET_FPS,
                width: DEFAULT_CAPTURE_WIDTH,
                height: DEFAULT_CAPTURE_HEIGHT,
            },
            backend: DEFAULT_BACKEND.to_string(),
            tiling: TilingConfig::default(),
            tracking: TrackerConfig::default(),
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            encoder: EncoderConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration: explicit path, else `ARMWATCH_CONFIG`, else
    /// defaults; env overrides applied on top, then validated.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("ARMWATCH_CONFIG").ok();
        let file_cfg = match explicit_path {
            Some(path) => Some(read_config_file(path)?),
            None => match env_path.as_deref() {
                Some(path) => Some(read_config_file(Path::new(path))?),
                None => None,
            },
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MonitorConfigFile) -> Self {
        let mut cfg = Self::default();

        if let Some(source) = file.source {
            if let Some(url) = source.url {
                cfg.source.url = url;
            }
            if let Some(fps) = source.target_fps {
                cfg.source.target_fps = fps;
            }
            if let Some(width) = source.width {
                cfg.source.width = width;
            }
            if let Some(height) = source.height {
                cfg.source.height = height;
            }
        }

        if let Some(detection) = file.detection {
            if let Some(backend) = detection.backend {
                cfg.backend = backend;
            }
            if let Some(threshold) = detection.confidence_threshold {
                cfg.tiling.confidence_threshold = threshold;
            }
            if let Some(width) = detection.tile_width {
                cfg.tiling.tile_width = width;
            }
            if let Some(height) = detection.tile_height {
                cfg.tiling.tile_height = height;
            }
            if let Some(overlap) = detection.overlap_ratio {
                cfg.tiling.overlap_ratio = overlap;
            }
            if let Some(iou) = detection.merge_iou {
                cfg.tiling.merge_iou = iou;
            }
            if let Some(budget) = detection.tile_budget_ms {
                cfg.tiling.tile_budget = Duration::from_millis(budget);
            }
        }

        if let Some(tracking) = file.tracking {
            if let Some(radius) = tracking.association_radius {
                cfg.tracking.association_radius = radius;
            }
            if let Some(misses) = tracking.max_misses {
                cfg.tracking.max_misses = misses;
            }
            if let Some(threshold) = tracking.movement_threshold_px {
                cfg.tracking.rules.movement_threshold_px = threshold;
            }
            if let Some(secs) = tracking.alert_secs {
                cfg.tracking.rules.alert_threshold = Duration::from_secs_f32(secs.max(0.0));
            }
        }

        if let Some(stream) = file.stream {
            if let Some(listen) = stream.listen {
                cfg.listen_addr = listen;
            }
            if let Some(width) = stream.stream_width {
                cfg.encoder.stream_width = width;
            }
            if let Some(quality) = stream.jpeg_quality {
                cfg.encoder.jpeg_quality = quality;
            }
        }

        cfg
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("ARMWATCH_SOURCE") {
            if !url.trim().is_empty() {
                self.source.url = url;
            }
        }
        if let Ok(addr) = std::env::var("ARMWATCH_LISTEN") {
            if !addr.trim().is_empty() {
                self.listen_addr = addr;
            }
        }
        if let Ok(backend) = std::env::var("ARMWATCH_BACKEND") {
            if !backend.trim().is_empty() {
                self.backend = backend;
            }
        }
        if let Ok(fps) = std::env::var("ARMWATCH_TARGET_FPS") {
            self.source.target_fps = fps
                .parse()
                .map_err(|_| anyhow!("ARMWATCH_TARGET_FPS must be an integer"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.tiling.tile_width == 0 || self.tiling.tile_height == 0 {
            return Err(anyhow!("tile dimensions must be non-zero"));
        }
        if !(0.0..0.9).contains(&self.tiling.overlap_ratio) {
            return Err(anyhow!(
                "overlap ratio must be in [0.0, 0.9), got {}",
                self.tiling.overlap_ratio
            ));
        }
        if !(0.0..=1.0).contains(&self.tiling.confidence_threshold) {
            return Err(anyhow!(
                "confidence threshold must be in [0, 1], got {}",
                self.tiling.confidence_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.tiling.merge_iou) || self.tiling.merge_iou == 0.0 {
            return Err(anyhow!(
                "merge iou must be in (0, 1], got {}",
                self.tiling.merge_iou
            ));
        }
        if self.tracking.association_radius <= 0.0 {
            return Err(anyhow!("association radius must be positive"));
        }
        if self.tracking.rules.movement_threshold_px < 0.0 {
            return Err(anyhow!("movement threshold must be non-negative"));
        }
        if self.tracking.rules.alert_threshold.is_zero() {
            return Err(anyhow!("alert threshold must be greater than zero"));
        }
        if self.encoder.stream_width == 0 {
            return Err(anyhow!("stream width must be non-zero"));
        }
        if self.encoder.jpeg_quality == 0 || self.encoder.jpeg_quality > 100 {
            return Err(anyhow!(
                "jpeg quality must be in 1..=100, got {}",
                self.encoder.jpeg_quality
            ));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("capture dimensions must be non-zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<MonitorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
