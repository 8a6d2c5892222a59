//! Frame ingestion sources.
//!
//! Sources for raw frames, selected by URL scheme:
//! - `stub://<name>` - synthetic bench scene (always available, used by
//!   tests and demo runs)
//! - `v4l2://<path>` or a plain `/dev/video*` path - local camera devices
//!   (feature: ingest-v4l2)
//! - `http(s)://...` - a screen publisher or network camera exposing MJPEG
//!   or single-JPEG snapshots (feature: ingest-http)
//!
//! All sources produce RGB8 `Frame`s and decimate toward the configured
//! target frame rate. A read failure out of `next_frame` is fatal to the
//! pipeline; sources do not retry internally.

mod synthetic;

#[cfg(feature = "ingest-v4l2")]
pub mod camera;
#[cfg(feature = "ingest-http")]
pub mod http;

pub use synthetic::SyntheticSource;

use anyhow::{anyhow, Result};
use std::time::Duration;

use crate::frame::Frame;

/// Configuration shared by all frame sources.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    /// Source URL; the scheme selects the backend.
    pub url: String,
    /// Target frame rate. 0 disables pacing.
    pub target_fps: u32,
    /// Preferred capture width (synthetic and v4l2 sources).
    pub width: u32,
    /// Preferred capture height (synthetic and v4l2 sources).
    pub height: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "stub://bench".to_string(),
            target_fps: 10,
            width: 1280,
            height: 720,
        }
    }
}

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub source: String,
}

/// A frame source, dispatching to the backend the URL selected.
pub enum CaptureSource {
    Synthetic(SyntheticSource),
    #[cfg(feature = "ingest-v4l2")]
    Camera(camera::CameraSource),
    #[cfg(feature = "ingest-http")]
    Http(http::HttpSource),
}

impl CaptureSource {
    pub fn open(config: SourceConfig) -> Result<Self> {
        let url = config.url.clone();
        if url.starts_with("stub://") {
            return Ok(Self::Synthetic(SyntheticSource::new(config)));
        }
        if url.starts_with("v4l2://") || url.starts_with("/dev/") {
            #[cfg(feature = "ingest-v4l2")]
            {
                return Ok(Self::Camera(camera::CameraSource::new(config)?));
            }
            #[cfg(not(feature = "ingest-v4l2"))]
            {
                return Err(anyhow!(
                    "camera source '{}' requires the ingest-v4l2 feature",
                    url
                ));
            }
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            #[cfg(feature = "ingest-http")]
            {
                return Ok(Self::Http(http::HttpSource::new(config)?));
            }
            #[cfg(not(feature = "ingest-http"))]
            {
                return Err(anyhow!(
                    "http source '{}' requires the ingest-http feature",
                    url
                ));
            }
        }
        Err(anyhow!(
            "unsupported source url '{}'; expected stub://, v4l2:// or http(s)://",
            url
        ))
    }

    pub fn connect(&mut self) -> Result<()> {
        match self {
            Self::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-v4l2")]
            Self::Camera(source) => source.connect(),
            #[cfg(feature = "ingest-http")]
            Self::Http(source) => source.connect(),
        }
    }

    /// Capture the next frame. Errors are fatal to the pipeline.
    pub fn next_frame(&mut self) -> Result<Frame> {
        match self {
            Self::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-v4l2")]
            Self::Camera(source) => source.next_frame(),
            #[cfg(feature = "ingest-http")]
            Self::Http(source) => source.next_frame(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        match self {
            Self::Synthetic(source) => source.is_healthy(),
            #[cfg(feature = "ingest-v4l2")]
            Self::Camera(source) => source.is_healthy(),
            #[cfg(feature = "ingest-http")]
            Self::Http(source) => source.is_healthy(),
        }
    }

    pub fn stats(&self) -> SourceStats {
        match self {
            Self::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-v4l2")]
            Self::Camera(source) => source.stats(),
            #[cfg(feature = "ingest-http")]
            Self::Http(source) => source.stats(),
        }
    }
}

/// Minimum spacing between frames for a target rate.
pub(crate) fn frame_interval(target_fps: u32) -> Duration {
    if target_fps == 0 {
        Duration::ZERO
    } else {
        Duration::from_millis(1000 / target_fps as u64)
    }
}
