//! Synthetic bench scene for tests and demo runs.
//!
//! Renders two bright blocks on a dark background: one sweeps horizontally
//! then holds still, the other never moves. With the `luma` backend this
//! exercises the whole pipeline - the sweeping block cycles Active/Idle and
//! the static block walks Idle into Stopped.

use anyhow::Result;

use super::{SourceConfig, SourceStats};
use crate::frame::Frame;

const BACKGROUND: u8 = 16;
const FOREGROUND: u8 = 230;
/// Frames spent sweeping, then the same number holding still.
const SWEEP_FRAMES: u64 = 60;

pub struct SyntheticSource {
    config: SourceConfig,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(config: SourceConfig) -> Self {
        Self {
            config,
            frame_count: 0,
        }
    }

    pub fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticSource: connected to {} ({}x{})",
            self.config.url,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    pub fn next_frame(&mut self) -> Result<Frame> {
        let width = self.config.width.max(64);
        let height = self.config.height.max(64);
        let mut pixels = vec![BACKGROUND; (width * height * 3) as usize];

        let block = (width / 10).clamp(8, 64);

        // Static block, upper-left quadrant.
        fill_block(&mut pixels, width, height, width / 8, height / 8, block);

        // Sweeping block: advances for SWEEP_FRAMES frames, then holds.
        let phase = self.frame_count % (SWEEP_FRAMES * 2);
        let travel = width / 4;
        let step = (travel / SWEEP_FRAMES as u32).max(1);
        let offset = step * phase.min(SWEEP_FRAMES) as u32;
        fill_block(
            &mut pixels,
            width,
            height,
            (width / 2 + offset).min(width - block),
            height / 2,
            block,
        );

        self.frame_count += 1;
        Frame::new(width, height, pixels)
    }

    pub fn is_healthy(&self) -> bool {
        true
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.config.url.clone(),
        }
    }
}

fn fill_block(pixels: &mut [u8], width: u32, height: u32, x: u32, y: u32, side: u32) {
    let x_end = (x + side).min(width);
    let y_end = (y + side).min(height);
    for row in y..y_end {
        for col in x..x_end {
            let idx = ((row * width + col) * 3) as usize;
            pixels[idx] = FOREGROUND;
            pixels[idx + 1] = FOREGROUND;
            pixels[idx + 2] = FOREGROUND;
        }
    }
}
