//! V4L2 camera frame source (feature: ingest-v4l2).
//!
//! Captures from a local device node (e.g. /dev/video0), negotiating RGB3 so
//! buffers map straight onto `Frame` without conversion. Falls back to the
//! device's current format when the requested one is refused, in which case
//! the frame constructor rejects mismatched buffers rather than guessing.

use anyhow::{Context, Result};
use ouroboros::self_referencing;
use std::time::{Duration, Instant};

use super::{SourceConfig, SourceStats};
use crate::frame::Frame;

pub struct CameraSource {
    config: SourceConfig,
    device_path: String,
    state: Option<CameraState>,
    frame_count: u64,
    last_frame_at: Option<Instant>,
    last_error: Option<String>,
    active_width: u32,
    active_height: u32,
}

#[self_referencing]
struct CameraState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl CameraSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        let device_path = config
            .url
            .strip_prefix("v4l2://")
            .unwrap_or(&config.url)
            .to_string();
        Ok(Self {
            active_width: config.width,
            active_height: config.height,
            config,
            device_path,
            state: None,
            frame_count: 0,
            last_frame_at: None,
            last_error: None,
        })
    }

    pub fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.device_path)
            .with_context(|| format!("open v4l2 device {}", self.device_path))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "CameraSource: failed to set format on {}: {}",
                    self.device_path,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "CameraSource: failed to set fps on {}: {}",
                    self.device_path,
                    err
                );
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;
        self.last_error = None;

        let state = CameraStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()
        .map_err(|err| {
            self.last_error = Some(err.to_string());
            err
        })?;
        self.state = Some(state);

        log::info!(
            "CameraSource: connected to {} ({}x{})",
            self.device_path,
            self.active_width,
            self.active_height
        );
        Ok(())
    }

    pub fn next_frame(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("v4l2 device not connected")?;
        let (buf, _meta) = state
            .with_mut(|fields| fields.stream.next())
            .map_err(|err| {
                self.last_error = Some(err.to_string());
                anyhow::Error::new(err).context("capture v4l2 frame")
            })?;

        self.frame_count += 1;
        self.last_frame_at = Some(Instant::now());

        Frame::new(self.active_width, self.active_height, buf.to_vec())
            .context("v4l2 buffer does not match the negotiated RGB3 format")
    }

    pub fn is_healthy(&self) -> bool {
        if self.last_error.is_some() {
            return false;
        }
        let Some(last_frame_at) = self.last_frame_at else {
            return true;
        };
        last_frame_at.elapsed() <= self.health_grace()
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.device_path.clone(),
        }
    }

    fn health_grace(&self) -> Duration {
        let base_ms = if self.config.target_fps == 0 {
            2_000
        } else {
            (1000 / self.config.target_fps).saturating_mul(6)
        };
        Duration::from_millis(base_ms.max(2_000) as u64)
    }
}
