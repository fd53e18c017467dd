use super::{CaptureDevice, CaptureError, CaptureSource};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;

/// A webcam addressed by index. Nothing is opened until [`CaptureDevice::open`].
pub struct WebcamDevice {
    index: u32,
    width: u32,
    height: u32,
    fps: u32,
}

impl WebcamDevice {
    pub fn new(index: u32, width: u32, height: u32, fps: u32) -> Self {
        Self {
            index,
            width,
            height,
            fps,
        }
    }

    fn unavailable(&self, reason: impl ToString) -> CaptureError {
        CaptureError::Unavailable {
            device: self.name(),
            reason: reason.to_string(),
        }
    }
}

impl CaptureDevice for WebcamDevice {
    fn name(&self) -> String {
        format!("webcam {}", self.index)
    }

    fn open(&mut self) -> Result<Box<dyn CaptureSource>, CaptureError> {
        tracing::info!(
            "Opening webcam {} at {}x{} @ {}fps",
            self.index,
            self.width,
            self.height,
            self.fps
        );

        let index = CameraIndex::Index(self.index);
        let format = CameraFormat::new(
            Resolution::new(self.width, self.height),
            FrameFormat::MJPEG,
            self.fps,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

        let mut camera = Camera::new(index, requested).map_err(|e| self.unavailable(e))?;
        camera.open_stream().map_err(|e| self.unavailable(e))?;

        let resolution = camera.resolution();
        tracing::info!(
            "Webcam {} streaming at {}x{}",
            self.index,
            resolution.width(),
            resolution.height()
        );

        Ok(Box::new(WebcamStream {
            camera,
            index: self.index,
            width: resolution.width(),
            height: resolution.height(),
        }))
    }
}

struct WebcamStream {
    camera: Camera,
    index: u32,
    width: u32,
    height: u32,
}

impl CaptureSource for WebcamStream {
    fn capture_frame(&mut self) -> Result<RgbImage, CaptureError> {
        let frame = self
            .camera
            .frame()
            .map_err(|e| CaptureError::EndOfStream(e.to_string()))?;

        frame
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::EndOfStream(format!("failed to decode frame: {e}")))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for WebcamStream {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            tracing::warn!("Failed to stop webcam {} stream: {}", self.index, e);
        }
        tracing::debug!("Webcam {} released", self.index);
    }
}
