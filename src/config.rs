use crate::orchestrator::OrchestratorConfig;
use crate::presence::TensorLayout;
use crate::trigger::Cues;
use clap::ValueEnum;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Bulk motion confirmed by a decaying counter
    Motion,
    /// Open hand held for a fixed duration
    Gesture,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a finite, non-negative number of seconds (got {value})")]
    InvalidDuration { name: &'static str, value: f64 },

    #[error("capture window must be longer than zero seconds")]
    EmptyCaptureWindow,

    #[error("{name} must be positive (got {value})")]
    NonPositive { name: &'static str, value: f64 },

    #[error("gif speed must be within 1..=30 (got {0})")]
    GifSpeed(i32),

    #[error("the gesture strategy needs --hand-model")]
    MissingHandModel,

    #[error("invalid show-control target {0:?}")]
    OscTarget(String),
}

/// Raw values as they come off the command line
#[derive(Debug, Clone)]
pub struct RawSettings {
    pub strategy: Strategy,
    pub poll_device: u32,
    pub capture_device: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub movement_threshold: f64,
    pub confirmation_threshold: u32,
    pub hold_secs: f64,
    pub hand_model: Option<PathBuf>,
    pub hand_layout: TensorLayout,
    pub hand_confidence: f64,
    pub capture_secs: f64,
    pub lead_in_secs: f64,
    pub settle_secs: f64,
    pub backoff_secs: f64,
    pub output_dir: PathBuf,
    pub gif_frame_ms: u64,
    pub gif_speed: i32,
    pub osc_target: String,
    pub cues: Cues,
}

/// Validated settings. Only built through [`Settings::validate`], so every
/// value here is usable as-is.
#[derive(Debug, Clone)]
pub struct Settings {
    pub strategy: Strategy,
    pub poll_device: u32,
    pub capture_device: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub movement_threshold: f32,
    pub confirmation_threshold: u32,
    pub hold: Duration,
    pub hand_model: Option<PathBuf>,
    pub hand_layout: TensorLayout,
    pub hand_confidence: f32,
    pub gif_frame_delay: Duration,
    pub gif_speed: i32,
    pub osc_target: SocketAddr,
    pub orchestrator: OrchestratorConfig,
}

fn seconds(name: &'static str, value: f64) -> Result<Duration, ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidDuration { name, value });
    }
    Ok(Duration::from_secs_f64(value))
}

fn positive(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::NonPositive { name, value });
    }
    Ok(value)
}

impl Settings {
    pub fn validate(raw: RawSettings) -> Result<Self, ConfigError> {
        let capture = seconds("capture window", raw.capture_secs)?;
        if capture.is_zero() {
            return Err(ConfigError::EmptyCaptureWindow);
        }
        let hold = seconds("hold duration", raw.hold_secs)?;
        let lead_in = seconds("lead-in", raw.lead_in_secs)?;
        let settle = seconds("settle delay", raw.settle_secs)?;
        let backoff = seconds("backoff", raw.backoff_secs)?;

        let movement_threshold = positive("movement threshold", raw.movement_threshold)? as f32;
        positive("confirmation threshold", raw.confirmation_threshold as f64)?;
        positive("fps", raw.fps as f64)?;
        positive("gif frame delay", raw.gif_frame_ms as f64)?;
        let hand_confidence = positive("hand confidence", raw.hand_confidence)? as f32;

        if !(1..=30).contains(&raw.gif_speed) {
            return Err(ConfigError::GifSpeed(raw.gif_speed));
        }

        if raw.strategy == Strategy::Gesture && raw.hand_model.is_none() {
            return Err(ConfigError::MissingHandModel);
        }

        let osc_target = raw
            .osc_target
            .parse()
            .map_err(|_| ConfigError::OscTarget(raw.osc_target.clone()))?;

        Ok(Self {
            strategy: raw.strategy,
            poll_device: raw.poll_device,
            capture_device: raw.capture_device,
            width: raw.width,
            height: raw.height,
            fps: raw.fps,
            movement_threshold,
            confirmation_threshold: raw.confirmation_threshold,
            hold,
            hand_model: raw.hand_model,
            hand_layout: raw.hand_layout,
            hand_confidence,
            gif_frame_delay: Duration::from_millis(raw.gif_frame_ms),
            gif_speed: raw.gif_speed,
            osc_target,
            orchestrator: OrchestratorConfig {
                capture,
                lead_in,
                settle,
                backoff,
                output_dir: raw.output_dir,
                cues: raw.cues,
            },
        })
    }
}
