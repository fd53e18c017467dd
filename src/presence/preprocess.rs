use anyhow::Result;
use clap::ValueEnum;
use image::{imageops, RgbImage};
use ndarray::Array4;

/// Memory layout a model expects for its image input
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TensorLayout {
    /// [1, 3, height, width]
    Nchw,
    /// [1, height, width, 3]
    Nhwc,
}

/// Preprocessor for converting RGB frames to model input tensors
pub struct Preprocessor {
    target_width: u32,
    target_height: u32,
    layout: TensorLayout,
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32, layout: TensorLayout) -> Self {
        Self {
            target_width,
            target_height,
            layout,
        }
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Preprocess an RGB image into a normalized tensor
    ///
    /// Steps:
    /// 1. Resize to target dimensions
    /// 2. Convert to float and normalize to [0, 1]
    /// 3. Lay out as NCHW or NHWC
    pub fn preprocess(&self, image: &RgbImage) -> Result<Array4<f32>> {
        let _span = tracing::debug_span!("preprocess").entered();

        let resized = if image.dimensions() != (self.target_width, self.target_height) {
            imageops::resize(
                image,
                self.target_width,
                self.target_height,
                imageops::FilterType::Triangle,
            )
        } else {
            image.clone()
        };

        let (width, height) = resized.dimensions();
        let (w, h) = (width as usize, height as usize);
        let mut tensor = match self.layout {
            TensorLayout::Nchw => Array4::<f32>::zeros((1, 3, h, w)),
            TensorLayout::Nhwc => Array4::<f32>::zeros((1, h, w, 3)),
        };

        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                let value = pixel[c] as f32 / 255.0;
                match self.layout {
                    TensorLayout::Nchw => tensor[[0, c, y, x]] = value,
                    TensorLayout::Nhwc => tensor[[0, y, x, c]] = value,
                }
            }
        }

        Ok(tensor)
    }
}
