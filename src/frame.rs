//! Raster frames flowing through the pipeline.
//!
//! A `Frame` is an immutable RGB8 raster. Once a frame is handed to a
//! downstream stage it is never mutated in place; the renderer clones into a
//! new `Frame` before drawing. Tile detection borrows rectangular regions via
//! `Frame::region`, which copies the rows out.

use anyhow::{anyhow, Result};

const BYTES_PER_PIXEL: usize = 3;

/// Immutable RGB8 raster with pixel data in row-major order.
#[derive(Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Create a frame, validating that `data` holds exactly
    /// `width * height * 3` bytes.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("frame dimensions must be non-zero"));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "frame buffer length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Copy a rectangular sub-region into a new frame.
    ///
    /// The region must lie fully inside the frame bounds.
    pub fn region(&self, x: u32, y: u32, width: u32, height: u32) -> Result<Frame> {
        let x_end = x
            .checked_add(width)
            .ok_or_else(|| anyhow!("region x range overflow"))?;
        let y_end = y
            .checked_add(height)
            .ok_or_else(|| anyhow!("region y range overflow"))?;
        if x_end > self.width || y_end > self.height {
            return Err(anyhow!(
                "region {}x{}+{}+{} exceeds frame bounds {}x{}",
                width,
                height,
                x,
                y,
                self.width,
                self.height
            ));
        }

        let row_bytes = width as usize * BYTES_PER_PIXEL;
        let stride = self.width as usize * BYTES_PER_PIXEL;
        let mut data = Vec::with_capacity(row_bytes * height as usize);
        for row in y..y_end {
            let start = row as usize * stride + x as usize * BYTES_PER_PIXEL;
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }
        Frame::new(width, height, data)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(width: u32, height: u32) -> Frame {
        let data: Vec<u8> = (0..width as usize * height as usize * 3)
            .map(|i| (i % 256) as u8)
            .collect();
        Frame::new(width, height, data).unwrap()
    }

    #[test]
    fn rejects_mismatched_buffer() {
        assert!(Frame::new(4, 4, vec![0u8; 10]).is_err());
        assert!(Frame::new(0, 4, vec![]).is_err());
    }

    #[test]
    fn region_copies_expected_rows() {
        let frame = gradient_frame(8, 8);
        let region = frame.region(2, 3, 4, 2).unwrap();
        assert_eq!(region.width(), 4);
        assert_eq!(region.height(), 2);

        // First region pixel equals source pixel at (2, 3).
        let src_offset = (3 * 8 + 2) * 3;
        assert_eq!(region.data()[..3], frame.data()[src_offset..src_offset + 3]);
    }

    #[test]
    fn region_out_of_bounds_is_rejected() {
        let frame = gradient_frame(8, 8);
        assert!(frame.region(6, 0, 4, 4).is_err());
        assert!(frame.region(0, 8, 1, 1).is_err());
    }
}
