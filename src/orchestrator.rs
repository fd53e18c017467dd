//! Detection-and-capture state machine.
//!
//! One [`Orchestrator::tick`] per loop iteration, at most one phase change
//! per tick:
//!
//! ```text
//! Idle --(deadline passed, poll camera open)--> Confirming
//! Confirming --(presence confirmed)--> Acquiring
//! Acquiring --(capture window elapsed | device fault)--> Idle
//! ```
//!
//! The polling and capture paths never hold a camera at the same time: the
//! polling handle is dropped on confirmation and reopened only after the
//! capture handle is dropped. While acquiring, the detector is not called.

use crate::capture::{CaptureDevice, CaptureError, CaptureSource};
use crate::debounce::{Observation, Progress};
use crate::detector::PresenceDetector;
use crate::encoder::{artifact_file_name, ArtifactEncoder, EncodeError};
use crate::frame::Frame;
use crate::trigger::{Cues, Lifecycle, TriggerEmitter};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemPhase {
    Idle,
    Confirming,
    Acquiring,
}

impl fmt::Display for SystemPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SystemPhase::Idle => "idle",
            SystemPhase::Confirming => "confirming",
            SystemPhase::Acquiring => "acquiring",
        };
        f.write_str(label)
    }
}

/// Runtime faults. None of them stop the run loop; each one sends the
/// state machine back to `Idle`.
#[derive(Debug, Error)]
pub enum Fault {
    #[error("device unavailable: {0}")]
    DeviceUnavailable(CaptureError),

    #[error("encode failed: {0}")]
    EncodeFailure(EncodeError),

    #[error("capture window closed without frames")]
    EmptyCapture,
}

/// What a single tick did
#[derive(Debug)]
pub enum Tick {
    /// Idle and waiting for a settle or backoff deadline
    Settling,
    /// Poll camera ready, now confirming
    Armed,
    /// One frame classified, nothing confirmed yet
    Polled,
    /// Presence confirmed, now acquiring
    Confirmed,
    /// Acquiring, waiting out the lead-in before opening the capture camera
    LeadIn,
    /// Acquiring, frames collected so far
    Collecting { frames: usize },
    /// Capture window closed and the artifact was written
    Finished { artifact: PathBuf, frames: usize },
    /// Something failed; the state machine recovered to `Idle`
    Faulted(Fault),
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Length of the capture window
    pub capture: Duration,
    /// Wait between confirmation and opening the capture camera
    pub lead_in: Duration,
    /// Pause after a completed cycle before polling resumes
    pub settle: Duration,
    /// Pause after a device fault before retrying
    pub backoff: Duration,
    pub output_dir: PathBuf,
    pub cues: Cues,
}

/// Frames collected for one artifact
#[derive(Debug)]
pub struct CaptureSession {
    confirmed_at: Instant,
    started_at: Option<Instant>,
    frames: Vec<Frame>,
    failed_reads: usize,
}

impl CaptureSession {
    fn new(confirmed_at: Instant) -> Self {
        Self {
            confirmed_at,
            started_at: None,
            frames: Vec::new(),
            failed_reads: 0,
        }
    }
}

enum Phase {
    Idle { resume_at: Option<Instant> },
    Confirming,
    Acquiring(CaptureSession),
}

/// Which path currently owns the camera
enum DeviceHandle {
    Released,
    Polling(Box<dyn CaptureSource>),
    Capturing(Box<dyn CaptureSource>),
}

/// Read-only view for overlays and telemetry
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub phase: SystemPhase,
    pub status: String,
    pub progress: Progress,
    pub strength: f32,
    pub last_label: Option<String>,
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "STATUS: {}", self.status)?;
        if let Some(label) = &self.last_label {
            write!(f, " | last: {label}")?;
        }
        Ok(())
    }
}

pub struct Orchestrator {
    poll_device: Box<dyn CaptureDevice>,
    capture_device: Box<dyn CaptureDevice>,
    detector: PresenceDetector,
    encoder: Box<dyn ArtifactEncoder>,
    emitter: Box<dyn TriggerEmitter>,
    config: OrchestratorConfig,
    phase: Phase,
    handle: DeviceHandle,
}

impl Orchestrator {
    pub fn new(
        poll_device: Box<dyn CaptureDevice>,
        capture_device: Box<dyn CaptureDevice>,
        detector: PresenceDetector,
        encoder: Box<dyn ArtifactEncoder>,
        emitter: Box<dyn TriggerEmitter>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            poll_device,
            capture_device,
            detector,
            encoder,
            emitter,
            config,
            phase: Phase::Idle { resume_at: None },
            handle: DeviceHandle::Released,
        }
    }

    pub fn phase(&self) -> SystemPhase {
        match self.phase {
            Phase::Idle { .. } => SystemPhase::Idle,
            Phase::Confirming => SystemPhase::Confirming,
            Phase::Acquiring(_) => SystemPhase::Acquiring,
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        let phase = self.phase();
        let status = match phase {
            SystemPhase::Acquiring => "ACQUIRING".to_string(),
            _ => self.detector.status(),
        };
        StatusSnapshot {
            phase,
            status,
            progress: self.detector.progress(),
            strength: self.detector.strength(),
            last_label: self.detector.last_label().map(str::to_string),
        }
    }

    /// Advance the state machine by one frame period.
    ///
    /// `now` is the caller's clock reading; frames read during this tick are
    /// stamped with it.
    pub fn tick(&mut self, now: Instant) -> Tick {
        let phase = std::mem::replace(&mut self.phase, Phase::Idle { resume_at: None });
        let (next, tick) = match phase {
            Phase::Idle { resume_at } => self.tick_idle(now, resume_at),
            Phase::Confirming => self.tick_confirming(now),
            Phase::Acquiring(session) => self.tick_acquiring(now, session),
        };
        self.phase = next;
        tick
    }

    /// Stop: drop any in-flight capture without encoding and release the camera.
    pub fn shutdown(&mut self) {
        if let Phase::Acquiring(session) = &self.phase {
            tracing::warn!(
                "Abandoning capture with {} frames, no artifact written",
                session.frames.len()
            );
        }
        self.handle = DeviceHandle::Released;
        self.detector.reset();
        self.phase = Phase::Idle { resume_at: None };
    }

    fn tick_idle(&mut self, now: Instant, resume_at: Option<Instant>) -> (Phase, Tick) {
        if resume_at.is_some_and(|at| now < at) {
            return (Phase::Idle { resume_at }, Tick::Settling);
        }

        if !matches!(self.handle, DeviceHandle::Polling(_)) {
            self.handle = DeviceHandle::Released;
            match self.poll_device.open() {
                Ok(source) => {
                    let (width, height) = source.resolution();
                    tracing::info!(
                        "Polling on {} ({}x{})",
                        self.poll_device.name(),
                        width,
                        height
                    );
                    self.handle = DeviceHandle::Polling(source);
                    self.detector.reset_scene();
                    self.emit(Lifecycle::Ready);
                }
                Err(e) => {
                    tracing::warn!("{}; retrying in {:?}", e, self.config.backoff);
                    let resume_at = Some(now + self.config.backoff);
                    return (
                        Phase::Idle { resume_at },
                        Tick::Faulted(Fault::DeviceUnavailable(e)),
                    );
                }
            }
        }

        (Phase::Confirming, Tick::Armed)
    }

    fn tick_confirming(&mut self, now: Instant) -> (Phase, Tick) {
        let DeviceHandle::Polling(source) = &mut self.handle else {
            return (Phase::Idle { resume_at: None }, Tick::Settling);
        };

        let image = match source.capture_frame() {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("Polling camera lost: {}", e);
                self.handle = DeviceHandle::Released;
                self.detector.reset();
                return (
                    Phase::Idle { resume_at: None },
                    Tick::Faulted(Fault::DeviceUnavailable(e)),
                );
            }
        };

        match self.detector.observe(&Frame::new(image, now)) {
            Ok(Observation::Confirmed) => {
                match self.detector.last_label() {
                    Some(label) => tracing::info!(
                        "Presence confirmed by {} ({})",
                        self.detector.strategy(),
                        label
                    ),
                    None => tracing::info!("Presence confirmed by {}", self.detector.strategy()),
                }
                self.emit(Lifecycle::DetectionConfirmed);
                self.detector.reset();
                // hand the camera over to the capture path
                self.handle = DeviceHandle::Released;
                (Phase::Acquiring(CaptureSession::new(now)), Tick::Confirmed)
            }
            Ok(Observation::Pending) => (Phase::Confirming, Tick::Polled),
            Err(e) => {
                tracing::warn!("Skipping frame: {:#}", e);
                (Phase::Confirming, Tick::Polled)
            }
        }
    }

    fn tick_acquiring(&mut self, now: Instant, mut session: CaptureSession) -> (Phase, Tick) {
        if now < session.confirmed_at + self.config.lead_in {
            return (Phase::Acquiring(session), Tick::LeadIn);
        }

        if !matches!(self.handle, DeviceHandle::Capturing(_)) {
            self.handle = DeviceHandle::Released;
            match self.capture_device.open() {
                Ok(source) => {
                    tracing::info!(
                        "Capturing {:?} from {}",
                        self.config.capture,
                        self.capture_device.name()
                    );
                    self.handle = DeviceHandle::Capturing(source);
                    self.emit(Lifecycle::CaptureStarted);
                    // `now` predates the open; the window starts next tick
                    return (Phase::Acquiring(session), Tick::Collecting { frames: 0 });
                }
                Err(e) => {
                    tracing::warn!("Capture aborted: {}", e);
                    let resume_at = Some(now + self.config.backoff);
                    return (
                        Phase::Idle { resume_at },
                        Tick::Faulted(Fault::DeviceUnavailable(e)),
                    );
                }
            }
        }

        let started_at = *session.started_at.get_or_insert(now);

        if now.saturating_duration_since(started_at) >= self.config.capture {
            return self.finish(now, session);
        }

        if let DeviceHandle::Capturing(source) = &mut self.handle {
            match source.capture_frame() {
                Ok(image) => session.frames.push(Frame::new(image, now)),
                Err(e) => {
                    session.failed_reads += 1;
                    tracing::debug!("Dropped capture frame: {}", e);
                }
            }
        }

        let frames = session.frames.len();
        (Phase::Acquiring(session), Tick::Collecting { frames })
    }

    fn finish(&mut self, now: Instant, session: CaptureSession) -> (Phase, Tick) {
        self.handle = DeviceHandle::Released;

        let frames = session.frames.len();
        if frames == 0 {
            tracing::error!(
                "Capture window closed with no frames ({} failed reads)",
                session.failed_reads
            );
            let resume_at = Some(now + self.config.backoff);
            return (Phase::Idle { resume_at }, Tick::Faulted(Fault::EmptyCapture));
        }

        tracing::info!(
            "Capture finished: {} frames, {} dropped",
            frames,
            session.failed_reads
        );
        self.emit(Lifecycle::CaptureFinished);

        let name = artifact_file_name(&chrono::Local::now(), self.encoder.extension());
        let artifact = self.config.output_dir.join(name);
        let resume_at = Some(now + self.config.settle);

        match self.encoder.encode(&session.frames, &artifact) {
            Ok(()) => {
                tracing::info!("Artifact saved: {}", artifact.display());
                (Phase::Idle { resume_at }, Tick::Finished { artifact, frames })
            }
            Err(e) => {
                tracing::error!("Discarding capture: {}", e);
                (Phase::Idle { resume_at }, Tick::Faulted(Fault::EncodeFailure(e)))
            }
        }
    }

    fn emit(&mut self, event: Lifecycle) {
        self.emitter.emit(self.config.cues.address(event), 1);
    }
}
