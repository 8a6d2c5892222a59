//! armwatch - robotic-arm activity monitor.
//!
//! Watches a camera or screen feed for arm-like objects, follows them across
//! frames with stable identities, classifies each as Active, Idle or Stopped
//! from how long it has gone without moving past a noise threshold, and
//! republishes the annotated feed as an MJPEG stream for remote viewing.
//!
//! # Module Structure
//!
//! - `ingest`: frame sources (synthetic, V4L2 cameras, HTTP publishers)
//! - `detect`: pluggable detector backends, overlap tiling, IoU dedup
//! - `track`: greedy nearest-neighbor identity tracking + activity states
//! - `render`: bounding boxes and state labels drawn onto frame copies
//! - `stream`: JPEG encoding, latest-frame hub, multipart HTTP server
//! - `pipeline`: the per-frame loop tying the stages together
//! - `config`: file/env layered daemon configuration

pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod render;
pub mod stream;
pub mod track;

pub use config::MonitorConfig;
pub use detect::{
    BackendRegistry, BoundingBox, Detection, DetectorBackend, TiledDetector, TilingConfig,
};
pub use frame::Frame;
pub use ingest::{CaptureSource, SourceConfig};
pub use pipeline::Pipeline;
pub use stream::{EncoderConfig, FrameHub, StreamEncoder, StreamServer};
pub use track::{ActivityRules, ActivityState, Track, Tracker, TrackerConfig};
