use anyhow::Result;

use crate::detect::result::Detection;

/// Detector backend trait.
///
/// This is the pluggable detection capability: given an RGB8 pixel buffer and
/// a confidence threshold, return bounding boxes in buffer-local pixel
/// coordinates. The call is synchronous and may be slow (hundreds of
/// milliseconds for model-backed implementations); callers must assume it
/// blocks.
///
/// Implementations must treat the pixel slice as read-only and ephemeral.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a pixel buffer.
    ///
    /// Returned detections carry coordinates local to the buffer and must
    /// already be filtered to `confidence >= confidence_threshold`.
    fn detect(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
