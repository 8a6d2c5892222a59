//! Annotated-frame compression for low-latency transport.

use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, ExtendedColorType, RgbImage};

use crate::frame::Frame;

#[derive(Clone, Debug)]
pub struct EncoderConfig {
    /// Output width in pixels; wider frames are scaled down preserving
    /// aspect ratio, narrower frames pass through.
    pub stream_width: u32,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            stream_width: 800,
            jpeg_quality: 70,
        }
    }
}

pub struct StreamEncoder {
    cfg: EncoderConfig,
}

impl StreamEncoder {
    pub fn new(cfg: EncoderConfig) -> Result<Self> {
        if cfg.stream_width == 0 {
            return Err(anyhow!("stream width must be non-zero"));
        }
        if cfg.jpeg_quality == 0 || cfg.jpeg_quality > 100 {
            return Err(anyhow!(
                "jpeg quality must be in 1..=100, got {}",
                cfg.jpeg_quality
            ));
        }
        Ok(Self { cfg })
    }

    /// Resize and JPEG-encode a frame for broadcast.
    pub fn encode(&self, frame: &Frame) -> Result<Vec<u8>> {
        let image = RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or_else(|| anyhow!("frame buffer does not match its dimensions"))?;

        let (out_width, out_height) = self.output_dimensions(frame.width(), frame.height());
        let resized = if (out_width, out_height) != (frame.width(), frame.height()) {
            imageops::resize(&image, out_width, out_height, imageops::FilterType::Triangle)
        } else {
            image
        };

        let mut jpeg = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, self.cfg.jpeg_quality);
        encoder
            .encode(
                resized.as_raw(),
                out_width,
                out_height,
                ExtendedColorType::Rgb8,
            )
            .context("jpeg encode failed")?;
        Ok(jpeg)
    }

    fn output_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        if width <= self.cfg.stream_width {
            return (width, height);
        }
        let scale = self.cfg.stream_width as f32 / width as f32;
        let out_height = ((height as f32 * scale).round() as u32).max(1);
        (self.cfg.stream_width, out_height)
    }
}
