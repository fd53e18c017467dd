mod gif;

pub use self::gif::GifEncoder;

use crate::frame::Frame;
use chrono::{DateTime, TimeZone};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("capture produced no frames")]
    EmptyCapture,

    #[error("failed to write artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode artifact: {0}")]
    Image(#[from] image::ImageError),
}

/// Trait for artifact encoders
pub trait ArtifactEncoder {
    /// File extension of produced artifacts, without the dot
    fn extension(&self) -> &'static str;

    /// Persist an ordered frame burst at `destination`
    ///
    /// Implementations must keep the input order and must reject an empty
    /// burst with [`EncodeError::EmptyCapture`] before touching the filesystem.
    fn encode(&mut self, frames: &[Frame], destination: &Path) -> Result<(), EncodeError>;
}

/// `captured_YYYYmmdd_HHMMSS.<ext>`
pub fn artifact_file_name<Tz: TimeZone>(at: &DateTime<Tz>, extension: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("captured_{}.{}", at.format("%Y%m%d_%H%M%S"), extension)
}
