mod webcam;

pub use webcam::WebcamDevice;

use image::RgbImage;
use thiserror::Error;

/// Failures a capture device reports. Both are transient: the caller
/// releases the handle and reopens later.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture device {device} unavailable: {reason}")]
    Unavailable { device: String, reason: String },

    #[error("capture stream ended: {0}")]
    EndOfStream(String),
}

/// Something that can be opened into a live frame stream.
///
/// Only one handle per physical camera should be alive at a time; callers
/// drop the previous handle before opening another one.
pub trait CaptureDevice {
    /// Human-readable device name for logs
    fn name(&self) -> String;

    /// Open the device and start streaming
    fn open(&mut self) -> Result<Box<dyn CaptureSource>, CaptureError>;
}

/// An open camera stream. Dropping the handle closes the device.
pub trait CaptureSource {
    /// Capture a single frame
    fn capture_frame(&mut self) -> Result<RgbImage, CaptureError>;

    /// Get the resolution of captured frames
    fn resolution(&self) -> (u32, u32);
}

