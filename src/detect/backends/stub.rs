use std::collections::VecDeque;

use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;

/// Stub backend for tests and daemon smoke runs.
///
/// Returns scripted results in push order, one entry per `detect` call, and
/// an empty set once the script is exhausted. Errors can be scripted to
/// exercise the tile-skip path.
pub struct StubBackend {
    script: VecDeque<Result<Vec<Detection>>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
        }
    }

    /// Queue detections for the next `detect` call.
    pub fn push_detections(&mut self, detections: Vec<Detection>) {
        self.script.push_back(Ok(detections));
    }

    /// Queue a failure for the next `detect` call.
    pub fn push_error(&mut self, message: &str) {
        self.script.push_back(Err(anyhow!("{}", message)));
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(
        &mut self,
        _pixels: &[u8],
        _width: u32,
        _height: u32,
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>> {
        match self.script.pop_front() {
            Some(Ok(detections)) => Ok(detections
                .into_iter()
                .filter(|det| det.confidence >= confidence_threshold)
                .collect()),
            Some(Err(err)) => Err(err),
            None => Ok(Vec::new()),
        }
    }
}
