//! Test doubles for the capture pipeline. Every double hands out shared
//! counters so tests can inspect calls after moving the double into the
//! code under test.

use crate::capture::{CaptureDevice, CaptureError, CaptureSource};
use crate::encoder::{ArtifactEncoder, EncodeError};
use crate::frame::Frame;
use crate::presence::{PresenceClassifier, Verdict};
use crate::trigger::TriggerEmitter;
use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

pub fn blank_frame(at: Instant) -> Frame {
    Frame::new(RgbImage::from_pixel(4, 4, Rgb([0, 0, 0])), at)
}

/// Replays a verdict script, then repeats the fallback verdict
pub struct ScriptedClassifier {
    script: VecDeque<Verdict>,
    fallback: Verdict,
    fail: bool,
    calls: Rc<Cell<usize>>,
}

impl ScriptedClassifier {
    pub fn new(script: Vec<Verdict>) -> Self {
        Self {
            script: script.into(),
            fallback: Verdict::negative(0.0),
            fail: false,
            calls: Rc::new(Cell::new(0)),
        }
    }

    pub fn repeating(verdict: Verdict) -> Self {
        Self {
            fallback: verdict,
            ..Self::new(Vec::new())
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.calls)
    }
}

impl PresenceClassifier for ScriptedClassifier {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn classify(&mut self, _frame: &Frame) -> Result<Verdict> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            return Err(anyhow!("scripted failure"));
        }
        Ok(self
            .script
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Shared state of one simulated physical camera
#[derive(Clone, Default)]
pub struct Camera {
    pub opens: Rc<Cell<usize>>,
    pub live_handles: Rc<Cell<usize>>,
    pub refuse_opens: Rc<Cell<u32>>,
    pub fail_reads: Rc<Cell<bool>>,
    /// How long each successful `open` takes
    pub open_delay: Rc<Cell<Duration>>,
    /// Total time spent in `open`, for tests that drive a simulated clock
    pub open_time: Rc<Cell<Duration>>,
}

impl Camera {
    pub fn device(&self, name: &str) -> SimulatedDevice {
        SimulatedDevice {
            name: name.to_string(),
            camera: self.clone(),
        }
    }
}

/// Device that yields blank frames on every read. Two devices built from the
/// same [`Camera`] model one physical camera: opening while another handle
/// is alive panics, so tests catch broken handoffs.
pub struct SimulatedDevice {
    name: String,
    camera: Camera,
}

impl CaptureDevice for SimulatedDevice {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn open(&mut self) -> Result<Box<dyn CaptureSource>, CaptureError> {
        let refuse = self.camera.refuse_opens.get();
        if refuse > 0 {
            self.camera.refuse_opens.set(refuse - 1);
            return Err(CaptureError::Unavailable {
                device: self.name.clone(),
                reason: "busy".to_string(),
            });
        }

        assert_eq!(
            self.camera.live_handles.get(),
            0,
            "{} opened while another handle is alive",
            self.name
        );
        self.camera.opens.set(self.camera.opens.get() + 1);
        self.camera.live_handles.set(1);
        self.camera
            .open_time
            .set(self.camera.open_time.get() + self.camera.open_delay.get());

        Ok(Box::new(SimulatedStream {
            camera: self.camera.clone(),
        }))
    }
}

struct SimulatedStream {
    camera: Camera,
}

impl CaptureSource for SimulatedStream {
    fn capture_frame(&mut self) -> Result<RgbImage, CaptureError> {
        if self.camera.fail_reads.get() {
            return Err(CaptureError::EndOfStream("unplugged".to_string()));
        }
        Ok(RgbImage::from_pixel(4, 4, Rgb([0, 0, 0])))
    }

    fn resolution(&self) -> (u32, u32) {
        (4, 4)
    }
}

impl Drop for SimulatedStream {
    fn drop(&mut self) {
        self.camera.live_handles.set(0);
    }
}

/// Records every burst it is handed
#[derive(Default)]
pub struct RecordingEncoder {
    pub bursts: Rc<RefCell<Vec<(usize, PathBuf)>>>,
    pub fail: bool,
}

impl ArtifactEncoder for RecordingEncoder {
    fn extension(&self) -> &'static str {
        "gif"
    }

    fn encode(&mut self, frames: &[Frame], destination: &Path) -> Result<(), EncodeError> {
        if frames.is_empty() {
            return Err(EncodeError::EmptyCapture);
        }
        self.bursts
            .borrow_mut()
            .push((frames.len(), destination.to_path_buf()));
        if self.fail {
            return Err(EncodeError::Io(std::io::Error::other("disk full")));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingEmitter {
    pub events: Rc<RefCell<Vec<String>>>,
}

impl TriggerEmitter for RecordingEmitter {
    fn emit(&mut self, event: &str, _payload: i32) {
        self.events.borrow_mut().push(event.to_string());
    }
}
