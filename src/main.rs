mod capture;
mod config;
mod debounce;
mod detector;
mod encoder;
mod frame;
mod orchestrator;
mod presence;
mod trigger;

#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use capture::WebcamDevice;
use clap::Parser;
use config::{RawSettings, Settings, Strategy};
use debounce::{CounterDebounce, Debounce, DurationDebounce};
use detector::PresenceDetector;
use encoder::GifEncoder;
use orchestrator::{Orchestrator, Tick};
use presence::{
    HandClassifier, HandConfig, MotionClassifier, MotionConfig, PresenceClassifier, TensorLayout,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use trigger::{Cues, OscEmitter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Presence strategy
    #[arg(long, value_enum, default_value_t = Strategy::Motion)]
    strategy: Strategy,

    /// Webcam index watched for presence
    #[arg(long, default_value_t = 0)]
    poll_device: u32,

    /// Webcam index recorded after confirmation (may equal the poll device)
    #[arg(long, default_value_t = 0)]
    capture_device: u32,

    /// Requested capture resolution width
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Requested capture resolution height
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Target frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Moving-region area (pixels) that counts as motion
    #[arg(long, default_value_t = 3000.0)]
    movement_threshold: f64,

    /// Consecutive-ish motion frames needed to confirm presence
    #[arg(long, default_value_t = 3)]
    confirmation_threshold: u32,

    /// Seconds an open hand must be held to confirm presence
    #[arg(long, default_value_t = 2.0)]
    hold_secs: f64,

    /// Path to the hand landmark model (ONNX file), required for gestures
    #[arg(long)]
    hand_model: Option<PathBuf>,

    /// Input tensor layout of the hand landmark model
    #[arg(long, value_enum, default_value_t = TensorLayout::Nhwc)]
    hand_layout: TensorLayout,

    /// Minimum hand presence score
    #[arg(long, default_value_t = 0.7)]
    hand_confidence: f64,

    /// Length of the capture window in seconds
    #[arg(long, default_value_t = 4.0)]
    capture_secs: f64,

    /// Seconds between confirmation and the start of capture
    #[arg(long, default_value_t = 0.0)]
    lead_in_secs: f64,

    /// Seconds to wait after a capture before watching again
    #[arg(long, default_value_t = 5.0)]
    settle_secs: f64,

    /// Seconds to wait before retrying an unavailable camera
    #[arg(long, default_value_t = 1.0)]
    backoff_secs: f64,

    /// Folder GIFs are written to
    #[arg(long, default_value = "captured_gifs")]
    output_dir: PathBuf,

    /// Per-frame delay written into the GIF, in milliseconds
    #[arg(long, default_value_t = 33)]
    gif_frame_ms: u64,

    /// Palette quantizer speed, 1 (best) to 30 (fastest)
    #[arg(long, default_value_t = 10)]
    gif_speed: i32,

    /// Show-control (OSC) endpoint
    #[arg(long, default_value = "127.0.0.1:8000")]
    osc_target: String,

    /// Cue sent when the system is ready for a visitor
    #[arg(long, default_value = "/sequences/Seq 1/play")]
    cue_ready: String,

    /// Cue sent when presence is confirmed
    #[arg(long, default_value = "/sequences/Seq 2/play")]
    cue_confirmed: String,

    /// Cue sent when recording starts
    #[arg(long, default_value = "/sequences/Seq 3/play")]
    cue_capture_started: String,

    /// Cue sent when recording ends
    #[arg(long, default_value = "/sequences/Seq 4/play")]
    cue_capture_finished: String,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl From<Args> for RawSettings {
    fn from(args: Args) -> Self {
        RawSettings {
            strategy: args.strategy,
            poll_device: args.poll_device,
            capture_device: args.capture_device,
            width: args.width,
            height: args.height,
            fps: args.fps,
            movement_threshold: args.movement_threshold,
            confirmation_threshold: args.confirmation_threshold,
            hold_secs: args.hold_secs,
            hand_model: args.hand_model,
            hand_layout: args.hand_layout,
            hand_confidence: args.hand_confidence,
            capture_secs: args.capture_secs,
            lead_in_secs: args.lead_in_secs,
            settle_secs: args.settle_secs,
            backoff_secs: args.backoff_secs,
            output_dir: args.output_dir,
            gif_frame_ms: args.gif_frame_ms,
            gif_speed: args.gif_speed,
            osc_target: args.osc_target,
            cues: Cues {
                ready: args.cue_ready,
                detection_confirmed: args.cue_confirmed,
                capture_started: args.cue_capture_started,
                capture_finished: args.cue_capture_finished,
            },
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let settings = Settings::validate(args.into()).context("Invalid configuration")?;

    tracing::info!("gifbooth starting");
    tracing::info!("Strategy: {:?}", settings.strategy);
    tracing::info!(
        "Cameras: poll={}, capture={} at {}x{}",
        settings.poll_device,
        settings.capture_device,
        settings.width,
        settings.height
    );
    tracing::info!(
        "Capture window: {:?}, output: {}",
        settings.orchestrator.capture,
        settings.orchestrator.output_dir.display()
    );

    std::fs::create_dir_all(&settings.orchestrator.output_dir).with_context(|| {
        format!(
            "Failed to create output folder {}",
            settings.orchestrator.output_dir.display()
        )
    })?;

    let detector = build_detector(&settings)?;
    let emitter = OscEmitter::new(settings.osc_target).context("Failed to set up show control")?;

    let poll = WebcamDevice::new(
        settings.poll_device,
        settings.width,
        settings.height,
        settings.fps,
    );
    let capture = WebcamDevice::new(
        settings.capture_device,
        settings.width,
        settings.height,
        settings.fps,
    );

    let mut orchestrator = Orchestrator::new(
        Box::new(poll),
        Box::new(capture),
        detector,
        Box::new(GifEncoder::new(settings.gif_frame_delay, settings.gif_speed)),
        Box::new(emitter),
        settings.orchestrator.clone(),
    );

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .context("Failed to install Ctrl+C handler")?;
    }

    run_loop(&mut orchestrator, settings.fps, &stop);

    orchestrator.shutdown();
    tracing::info!("gifbooth stopped");

    Ok(())
}

fn build_detector(settings: &Settings) -> Result<PresenceDetector> {
    let (classifier, debounce): (Box<dyn PresenceClassifier>, Debounce) = match settings.strategy
    {
        Strategy::Motion => {
            let classifier = MotionClassifier::new(MotionConfig {
                movement_threshold: settings.movement_threshold,
                ..MotionConfig::default()
            });
            let debounce = CounterDebounce::new(
                settings.confirmation_threshold,
                settings.movement_threshold,
            );
            (Box::new(classifier), debounce.into())
        }
        Strategy::Gesture => {
            let model = settings
                .hand_model
                .as_ref()
                .context("the gesture strategy needs --hand-model")?;
            let config = HandConfig::new(model, settings.hand_confidence, settings.hand_layout);
            let classifier =
                HandClassifier::new(config).context("Failed to load hand landmark model")?;
            (Box::new(classifier), DurationDebounce::new(settings.hold).into())
        }
    };

    Ok(PresenceDetector::new(classifier, debounce))
}

/// Cooperative run loop: one tick per frame period until `stop` is set.
fn run_loop(orchestrator: &mut Orchestrator, target_fps: u32, stop: &AtomicBool) {
    let frame_duration = Duration::from_secs_f32(1.0 / target_fps.max(1) as f32);
    let mut frame_count = 0u64;
    let mut total_tick_time = Duration::ZERO;
    let mut last_status = String::new();
    let mut cycles = 0u64;
    let run_start = Instant::now();

    tracing::info!("Starting main loop");
    tracing::info!("Press Ctrl+C to stop");

    while !stop.load(Ordering::SeqCst) {
        let loop_start = Instant::now();

        match orchestrator.tick(loop_start) {
            Tick::Finished { artifact, frames } => {
                cycles += 1;
                tracing::info!(
                    "Cycle {} complete: {} frames -> {}",
                    cycles,
                    frames,
                    artifact.display()
                );
            }
            Tick::Faulted(fault) => tracing::warn!("Recovered from fault: {}", fault),
            _ => {}
        }

        let tick_time = loop_start.elapsed();
        total_tick_time += tick_time;
        frame_count += 1;

        let status = orchestrator.status();
        let line = status.to_string();
        if line != last_status {
            tracing::info!("[{}] {}", status.phase, line);
            last_status = line;
        }

        // Log stats every 300 frames
        if frame_count % 300 == 0 {
            let avg_tick_ms = total_tick_time.as_secs_f64() * 1000.0 / frame_count as f64;
            let fps = frame_count as f64 / run_start.elapsed().as_secs_f64();
            tracing::debug!(
                "Frame {}: tick={:.1}ms, fps={:.1}, progress={:?}, strength={:.1}, cycles={}",
                frame_count,
                avg_tick_ms,
                fps,
                status.progress,
                status.strength,
                cycles
            );
        }

        // Frame rate limiting
        let elapsed = loop_start.elapsed();
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
    }

    tracing::info!("Stop requested");
}
