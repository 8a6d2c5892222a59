//! HTTP frame source (feature: ingest-http).
//!
//! Ingests from a screen publisher or network camera that exposes frames
//! over HTTP, either as a `multipart/x-mixed-replace` MJPEG stream or as a
//! single-JPEG snapshot endpoint polled per frame. The content type of the
//! initial response decides which mode is used.

use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::time::{Duration, Instant};

use super::{frame_interval, SourceConfig, SourceStats};
use crate::frame::Frame;

const MAX_JPEG_BYTES: usize = 5 * 1024 * 1024;

pub struct HttpSource {
    config: SourceConfig,
    stream: Option<HttpStream>,
    last_frame_at: Option<Instant>,
    connected_at: Option<Instant>,
    frame_count: u64,
    last_error: Option<String>,
}

enum HttpStream {
    Mjpeg(MjpegStream),
    SingleJpeg,
}

impl HttpSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        // Validate early so a typo fails at open, not mid-run.
        url::Url::parse(&config.url).context("parse http source url")?;
        Ok(Self {
            config,
            stream: None,
            last_frame_at: None,
            connected_at: None,
            frame_count: 0,
            last_error: None,
        })
    }

    pub fn connect(&mut self) -> Result<()> {
        let response = ureq::get(&self.config.url)
            .call()
            .context("connect to http frame source")?;
        let content_type = response.header("Content-Type").unwrap_or("");
        if content_type.to_lowercase().contains("multipart") {
            let reader = response.into_reader();
            self.stream = Some(HttpStream::Mjpeg(MjpegStream::new(reader)));
        } else {
            self.stream = Some(HttpStream::SingleJpeg);
        }
        self.connected_at = Some(Instant::now());
        log::info!("HttpSource: connected to {}", self.config.url);
        Ok(())
    }

    pub fn next_frame(&mut self) -> Result<Frame> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| anyhow!("http source not connected; call connect() first"))?;
        let min_interval = frame_interval(self.config.target_fps);
        loop {
            let jpeg_bytes = match stream {
                HttpStream::Mjpeg(stream) => stream.read_next_jpeg(),
                HttpStream::SingleJpeg => fetch_single_jpeg(&self.config.url),
            }
            .map_err(|err| {
                self.last_error = Some(err.to_string());
                err
            })?;

            // Decimate toward the target rate; extra frames are dropped
            // before the decode cost is paid.
            let now = Instant::now();
            if let Some(last) = self.last_frame_at {
                if now.duration_since(last) < min_interval {
                    continue;
                }
            }

            let frame = decode_jpeg(&jpeg_bytes)?;
            self.frame_count += 1;
            self.last_frame_at = Some(now);
            return Ok(frame);
        }
    }

    pub fn is_healthy(&self) -> bool {
        if self.last_error.is_some() {
            return false;
        }
        self.connected_at.is_some()
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.config.url.clone(),
        }
    }
}

fn fetch_single_jpeg(url: &str) -> Result<Vec<u8>> {
    let response = ureq::get(url).call().context("fetch jpeg snapshot")?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(MAX_JPEG_BYTES as u64 + 1)
        .read_to_end(&mut bytes)
        .context("read jpeg snapshot body")?;
    if bytes.len() > MAX_JPEG_BYTES {
        return Err(anyhow!("jpeg snapshot exceeds {} bytes", MAX_JPEG_BYTES));
    }
    Ok(bytes)
}

fn decode_jpeg(bytes: &[u8]) -> Result<Frame> {
    let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg)
        .context("decode jpeg frame")?;
    let rgb = image.to_rgb8();
    Frame::new(rgb.width(), rgb.height(), rgb.into_raw())
}

/// Incremental parser over a multipart MJPEG byte stream: scans for SOI/EOI
/// marker pairs and yields one JPEG at a time.
struct MjpegStream {
    reader: Box<dyn Read + Send>,
    buffer: Vec<u8>,
}

impl MjpegStream {
    fn new(reader: Box<dyn Read + Send>) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(64 * 1024),
        }
    }

    fn read_next_jpeg(&mut self) -> Result<Vec<u8>> {
        let mut chunk = vec![0u8; 8192];
        loop {
            if let Some((start, end)) = find_jpeg_bounds(&self.buffer) {
                let frame = self.buffer[start..end].to_vec();
                self.buffer.drain(..end);
                return Ok(frame);
            }

            let read = self.reader.read(&mut chunk).context("read mjpeg chunk")?;
            if read == 0 {
                return Err(anyhow!("mjpeg stream ended"));
            }
            self.buffer.extend_from_slice(&chunk[..read]);

            if self.buffer.len() > MAX_JPEG_BYTES * 2 {
                let keep = 2.min(self.buffer.len());
                let drain_len = self.buffer.len() - keep;
                self.buffer.drain(..drain_len);
            }
        }
    }
}

fn find_jpeg_bounds(buf: &[u8]) -> Option<(usize, usize)> {
    let start = buf.windows(2).position(|w| w == [0xFF, 0xD8])?;
    let end_rel = buf[start..].windows(2).position(|w| w == [0xFF, 0xD9])?;
    Some((start, start + end_rel + 2))
}
