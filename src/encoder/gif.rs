use super::{ArtifactEncoder, EncodeError};
use crate::frame::Frame;
use image::codecs::gif::{GifEncoder as ImageGifEncoder, Repeat};
use image::{buffer::ConvertBuffer, Delay, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;

/// Looping GIF writer
///
/// Every frame is palette-quantized on its own (NeuQuant, `speed` 1 = best
/// quality, 30 = fastest) and shown for `frame_delay`.
pub struct GifEncoder {
    frame_delay: Duration,
    speed: i32,
}

impl GifEncoder {
    pub fn new(frame_delay: Duration, speed: i32) -> Self {
        Self {
            frame_delay,
            speed: speed.clamp(1, 30),
        }
    }
}

impl ArtifactEncoder for GifEncoder {
    fn extension(&self) -> &'static str {
        "gif"
    }

    fn encode(&mut self, frames: &[Frame], destination: &Path) -> Result<(), EncodeError> {
        if frames.is_empty() {
            return Err(EncodeError::EmptyCapture);
        }

        let _span = tracing::debug_span!("gif_encode", frames = frames.len()).entered();
        tracing::info!(
            "Encoding {} frames to {}",
            frames.len(),
            destination.display()
        );

        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let writer = BufWriter::new(File::create(destination)?);
        let mut encoder = ImageGifEncoder::new_with_speed(writer, self.speed);
        encoder.set_repeat(Repeat::Infinite)?;

        let delay = Delay::from_numer_denom_ms(self.frame_delay.as_millis() as u32, 1);
        encoder.encode_frames(frames.iter().map(|frame| {
            let rgba: RgbaImage = frame.image().convert();
            image::Frame::from_parts(rgba, 0, 0, delay)
        }))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifDecoder;
    use image::{AnimationDecoder, Rgb, RgbImage};
    use std::io::BufReader;
    use std::time::Instant;

    fn solid(value: u8) -> Frame {
        Frame::new(RgbImage::from_pixel(32, 24, Rgb([value, value, value])), Instant::now())
    }

    #[test]
    fn empty_burst_fails_before_any_io() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("nested").join("out.gif");
        let mut encoder = GifEncoder::new(Duration::from_millis(33), 10);

        let result = encoder.encode(&[], &destination);

        assert!(matches!(result, Err(EncodeError::EmptyCapture)));
        assert!(!dir.path().join("nested").exists());
    }

    #[test]
    fn writes_frames_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("burst.gif");
        let mut encoder = GifEncoder::new(Duration::from_millis(100), 10);

        encoder
            .encode(&[solid(0), solid(255), solid(0)], &destination)
            .unwrap();

        let file = BufReader::new(File::open(&destination).unwrap());
        let decoded = GifDecoder::new(file)
            .unwrap()
            .into_frames()
            .collect_frames()
            .unwrap();

        assert_eq!(decoded.len(), 3);
        let firsts: Vec<u8> = decoded.iter().map(|f| f.buffer().get_pixel(0, 0)[0]).collect();
        assert!(firsts[0] < 16);
        assert!(firsts[1] > 239);
        assert!(firsts[2] < 16);
        assert_eq!(decoded[0].delay().numer_denom_ms(), (100, 1));
    }
}
