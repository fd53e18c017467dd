use super::types::{PresenceClassifier, Verdict};
use crate::frame::Frame;
use anyhow::Result;
use image::{imageops, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology;
use imageproc::region_labelling::{connected_components, Connectivity};

/// Tuning for [`MotionClassifier`]
#[derive(Debug, Clone)]
pub struct MotionConfig {
    /// Blob area, in full-resolution pixels, a moving region must exceed
    pub movement_threshold: f32,
    /// Width the frame is downscaled to before analysis
    pub analysis_width: u32,
    /// Gaussian blur applied at analysis resolution
    pub blur_sigma: f32,
    /// Absolute luma difference (0-255) that marks a pixel as foreground
    pub diff_threshold: f32,
    /// Background update rate, roughly 1 / history length
    pub learning_rate: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            movement_threshold: 3000.0,
            analysis_width: 160,
            blur_sigma: 2.0,
            diff_threshold: 25.0,
            learning_rate: 0.01,
        }
    }
}

struct Background {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

/// Bulk-motion classifier: running-average background subtraction.
///
/// The verdict strength is the area of the largest connected moving region,
/// rescaled to full-frame pixels.
pub struct MotionClassifier {
    config: MotionConfig,
    background: Option<Background>,
}

impl MotionClassifier {
    pub fn new(config: MotionConfig) -> Self {
        tracing::info!(
            "Motion classifier: threshold={}px, analysis width={}",
            config.movement_threshold,
            config.analysis_width
        );
        Self {
            config,
            background: None,
        }
    }

    fn analysis_luma(&self, frame: &Frame) -> GrayImage {
        let (frame_width, frame_height) = frame.dimensions();
        let width = self.config.analysis_width.clamp(1, frame_width.max(1));
        let height = ((frame_height as u64 * width as u64) / frame_width.max(1) as u64).max(1) as u32;

        let gray = imageops::grayscale(frame.image());
        let small = if gray.dimensions() != (width, height) {
            imageops::resize(&gray, width, height, imageops::FilterType::Triangle)
        } else {
            gray
        };

        if self.config.blur_sigma > 0.0 {
            gaussian_blur_f32(&small, self.config.blur_sigma)
        } else {
            small
        }
    }
}

impl PresenceClassifier for MotionClassifier {
    fn name(&self) -> &'static str {
        "motion"
    }

    fn classify(&mut self, frame: &Frame) -> Result<Verdict> {
        let _span = tracing::debug_span!("motion_classify").entered();

        let luma = self.analysis_luma(frame);
        let (width, height) = luma.dimensions();

        let seeded = matches!(
            &self.background,
            Some(bg) if bg.width == width && bg.height == height
        );
        if !seeded {
            tracing::debug!("Initializing motion background at {}x{}", width, height);
            self.background = Some(Background {
                width,
                height,
                values: luma.pixels().map(|p| p[0] as f32).collect(),
            });
            return Ok(Verdict::negative(0.0));
        }
        let Some(background) = self.background.as_mut() else {
            return Ok(Verdict::negative(0.0));
        };

        let diff_threshold = self.config.diff_threshold;
        let mut mask = GrayImage::new(width, height);
        for ((p, bg), m) in luma
            .pixels()
            .zip(&background.values)
            .zip(mask.pixels_mut())
        {
            if (p[0] as f32 - bg).abs() > diff_threshold {
                *m = Luma([255]);
            }
        }

        let rate = self.config.learning_rate;
        for (bg, p) in background.values.iter_mut().zip(luma.pixels()) {
            *bg += (p[0] as f32 - *bg) * rate;
        }

        // 3x3 opening drops isolated noise pixels
        let opened = morphology::open(&mask, Norm::LInf, 1);
        let largest = largest_region(&opened);

        let (frame_width, frame_height) = frame.dimensions();
        let scale = (frame_width as f32 / width as f32) * (frame_height as f32 / height as f32);
        let area = largest as f32 * scale;

        tracing::debug!("Largest moving region: {:.0}px", area);

        if area > self.config.movement_threshold {
            Ok(Verdict::affirmative(area))
        } else {
            Ok(Verdict::negative(area))
        }
    }

    fn reset_state(&mut self) {
        tracing::debug!("Resetting motion background");
        self.background = None;
    }
}

/// Pixel count of the largest 4-connected foreground region
fn largest_region(mask: &GrayImage) -> usize {
    let labels = connected_components(mask, Connectivity::Four, Luma([0u8]));

    let mut sizes: Vec<usize> = Vec::new();
    for label in labels.pixels().map(|p| p[0] as usize).filter(|&l| l > 0) {
        if label >= sizes.len() {
            sizes.resize(label + 1, 0);
        }
        sizes[label] += 1;
    }

    sizes.into_iter().max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::time::Instant;

    fn frame_with_square(side: u32) -> Frame {
        let mut image = RgbImage::from_pixel(320, 240, Rgb([0, 0, 0]));
        for y in 70..70 + side {
            for x in 110..110 + side {
                image.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        Frame::new(image, Instant::now())
    }

    #[test]
    fn first_frame_only_seeds_background() {
        let mut classifier = MotionClassifier::new(MotionConfig::default());
        let verdict = classifier.classify(&frame_with_square(100)).unwrap();

        assert!(!verdict.affirmative);
        assert_eq!(verdict.strength, 0.0);
    }

    #[test]
    fn static_scene_is_not_motion() {
        let mut classifier = MotionClassifier::new(MotionConfig::default());
        classifier.classify(&frame_with_square(0)).unwrap();

        let verdict = classifier.classify(&frame_with_square(0)).unwrap();
        assert!(!verdict.affirmative);
        assert_eq!(verdict.strength, 0.0);
    }

    #[test]
    fn large_region_is_motion_and_reports_area() {
        let mut classifier = MotionClassifier::new(MotionConfig::default());
        classifier.classify(&frame_with_square(0)).unwrap();

        let verdict = classifier.classify(&frame_with_square(100)).unwrap();
        assert!(verdict.affirmative);
        assert!(verdict.strength > 3000.0, "area {}", verdict.strength);
        assert!(verdict.strength < 20000.0, "area {}", verdict.strength);
    }

    #[test]
    fn speck_stays_below_threshold() {
        let mut classifier = MotionClassifier::new(MotionConfig::default());
        classifier.classify(&frame_with_square(0)).unwrap();

        let verdict = classifier.classify(&frame_with_square(4)).unwrap();
        assert!(!verdict.affirmative);
    }

    #[test]
    fn reset_reseeds_background() {
        let mut classifier = MotionClassifier::new(MotionConfig::default());
        classifier.classify(&frame_with_square(0)).unwrap();
        classifier.reset_state();

        let verdict = classifier.classify(&frame_with_square(100)).unwrap();
        assert!(!verdict.affirmative);
    }

    #[test]
    fn regions_are_four_connected() {
        // Two diagonal pixels are separate regions
        let mask = GrayImage::from_raw(2, 2, vec![255, 0, 0, 255]).unwrap();
        assert_eq!(largest_region(&mask), 1);

        let mask = GrayImage::from_raw(2, 2, vec![255, 255, 0, 255]).unwrap();
        assert_eq!(largest_region(&mask), 3);

        assert_eq!(largest_region(&GrayImage::new(4, 4)), 0);
    }

    #[test]
    fn opening_removes_isolated_pixels() {
        let mut mask = GrayImage::new(16, 16);
        mask.put_pixel(3, 3, Luma([255]));
        for y in 8..14 {
            for x in 8..14 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }

        let opened = morphology::open(&mask, Norm::LInf, 1);
        assert_eq!(opened.get_pixel(3, 3)[0], 0);
        assert_eq!(largest_region(&opened), 36);
    }
}
