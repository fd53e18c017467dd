use image::RgbImage;
use std::time::Instant;

/// A captured raster plus the instant it was read from the device.
///
/// Frames are handed from stage to stage by value; anything that wants to
/// draw on one works on its own copy.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
    captured_at: Instant,
}

impl Frame {
    pub fn new(image: RgbImage, captured_at: Instant) -> Self {
        Self { image, captured_at }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
