mod osc;

pub use osc::OscEmitter;

/// Fire-and-forget notification channel to the show-control system.
///
/// Emitters never report failure to the caller: a message that cannot be
/// delivered is logged and dropped.
pub trait TriggerEmitter {
    fn emit(&mut self, event: &str, payload: i32);
}

/// Points in the capture lifecycle that produce a show-control cue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Polling camera (re)opened, waiting for presence
    Ready,
    DetectionConfirmed,
    CaptureStarted,
    CaptureFinished,
}

/// Address sent for each lifecycle point
#[derive(Debug, Clone)]
pub struct Cues {
    pub ready: String,
    pub detection_confirmed: String,
    pub capture_started: String,
    pub capture_finished: String,
}

impl Cues {
    pub fn address(&self, event: Lifecycle) -> &str {
        match event {
            Lifecycle::Ready => &self.ready,
            Lifecycle::DetectionConfirmed => &self.detection_confirmed,
            Lifecycle::CaptureStarted => &self.capture_started,
            Lifecycle::CaptureFinished => &self.capture_finished,
        }
    }
}

impl Default for Cues {
    fn default() -> Self {
        Self {
            ready: "/sequences/Seq 1/play".to_string(),
            detection_confirmed: "/sequences/Seq 2/play".to_string(),
            capture_started: "/sequences/Seq 3/play".to_string(),
            capture_finished: "/sequences/Seq 4/play".to_string(),
        }
    }
}
