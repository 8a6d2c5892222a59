use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection};

/// Brightness-blob reference backend.
///
/// Thresholds luminance and reports connected bright regions as detections.
/// This is not a trained model; it exists so the pipeline runs end-to-end
/// against the synthetic frame source and as a fallback on hosts without a
/// model-serving collaborator. All blobs are reported as class 0.
pub struct LumaBackend {
    /// Minimum luminance (0-255) for a pixel to count as foreground.
    luma_threshold: u8,
    /// Minimum blob area in pixels; smaller speckle is dropped.
    min_blob_area: usize,
}

impl LumaBackend {
    pub fn new() -> Self {
        Self {
            luma_threshold: 160,
            min_blob_area: 64,
        }
    }

    pub fn with_thresholds(luma_threshold: u8, min_blob_area: usize) -> Self {
        Self {
            luma_threshold,
            min_blob_area,
        }
    }
}

impl Default for LumaBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for LumaBackend {
    fn name(&self) -> &'static str {
        "luma"
    }

    fn detect(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>> {
        let w = width as usize;
        let h = height as usize;
        if pixels.len() != w * h * 3 {
            return Err(anyhow!(
                "pixel buffer length mismatch: expected {}, got {}",
                w * h * 3,
                pixels.len()
            ));
        }

        // Rec. 601 luma, integer form.
        let luma = |x: usize, y: usize| -> u8 {
            let i = (y * w + x) * 3;
            let r = pixels[i] as u32;
            let g = pixels[i + 1] as u32;
            let b = pixels[i + 2] as u32;
            ((299 * r + 587 * g + 114 * b) / 1000) as u8
        };

        let mut visited = vec![false; w * h];
        let mut detections = Vec::new();
        let mut stack = Vec::new();

        for start_y in 0..h {
            for start_x in 0..w {
                let idx = start_y * w + start_x;
                if visited[idx] || luma(start_x, start_y) < self.luma_threshold {
                    continue;
                }

                // Flood-fill one blob.
                let mut min_x = start_x;
                let mut max_x = start_x;
                let mut min_y = start_y;
                let mut max_y = start_y;
                let mut area = 0usize;
                let mut luma_sum = 0u64;

                visited[idx] = true;
                stack.push((start_x, start_y));
                while let Some((x, y)) = stack.pop() {
                    area += 1;
                    luma_sum += luma(x, y) as u64;
                    min_x = min_x.min(x);
                    max_x = max_x.max(x);
                    min_y = min_y.min(y);
                    max_y = max_y.max(y);

                    let mut visit = |nx: usize, ny: usize| {
                        let nidx = ny * w + nx;
                        if !visited[nidx] && luma(nx, ny) >= self.luma_threshold {
                            visited[nidx] = true;
                            stack.push((nx, ny));
                        }
                    };
                    if x > 0 {
                        visit(x - 1, y);
                    }
                    if x + 1 < w {
                        visit(x + 1, y);
                    }
                    if y > 0 {
                        visit(x, y - 1);
                    }
                    if y + 1 < h {
                        visit(x, y + 1);
                    }
                }

                if area < self.min_blob_area {
                    continue;
                }

                let confidence = (luma_sum as f32 / area as f32 / 255.0).min(1.0);
                if confidence < confidence_threshold {
                    continue;
                }
                detections.push(Detection {
                    class_id: 0,
                    confidence,
                    bbox: BoundingBox::new(
                        min_x as f32,
                        min_y as f32,
                        (max_x + 1) as f32,
                        (max_y + 1) as f32,
                    ),
                });
            }
        }

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_block(
        width: usize,
        height: usize,
        x: usize,
        y: usize,
        side: usize,
        value: u8,
    ) -> Vec<u8> {
        let mut pixels = vec![16u8; width * height * 3];
        for row in y..(y + side) {
            for col in x..(x + side) {
                let i = (row * width + col) * 3;
                pixels[i] = value;
                pixels[i + 1] = value;
                pixels[i + 2] = value;
            }
        }
        pixels
    }

    #[test]
    fn bright_block_is_detected_with_tight_bbox() {
        let pixels = frame_with_block(64, 64, 10, 20, 12, 230);
        let mut backend = LumaBackend::new();
        let detections = backend.detect(&pixels, 64, 64, 0.25).unwrap();

        assert_eq!(detections.len(), 1);
        let bbox = detections[0].bbox;
        assert_eq!(
            (bbox.x1, bbox.y1, bbox.x2, bbox.y2),
            (10.0, 20.0, 22.0, 32.0)
        );
        assert!(detections[0].confidence > 0.8);
    }

    #[test]
    fn speckle_below_min_area_is_ignored() {
        let pixels = frame_with_block(64, 64, 5, 5, 3, 230);
        let mut backend = LumaBackend::new();
        assert!(backend.detect(&pixels, 64, 64, 0.25).unwrap().is_empty());
    }

    #[test]
    fn dark_frame_yields_nothing() {
        let pixels = vec![16u8; 32 * 32 * 3];
        let mut backend = LumaBackend::new();
        assert!(backend.detect(&pixels, 32, 32, 0.25).unwrap().is_empty());
    }

    #[test]
    fn buffer_mismatch_is_an_error() {
        let mut backend = LumaBackend::new();
        assert!(backend.detect(&[0u8; 10], 32, 32, 0.25).is_err());
    }
}
