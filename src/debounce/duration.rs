use super::{Observation, Progress};
use crate::presence::Verdict;
use std::time::{Duration, Instant};

/// Continuous-hold timer with a required duration
///
/// The first affirmative verdict starts the clock; confirmation fires once
/// the hold reaches `required`. Any negative verdict clears the hold
/// immediately. There is deliberately no decay here: a single missed frame
/// cancels progress, which can also drop real gestures when landmark
/// detection jitters.
#[derive(Debug, Clone)]
pub struct DurationDebounce {
    required: Duration,
    open_since: Option<Instant>,
    elapsed: Duration,
    fired: bool,
}

impl DurationDebounce {
    pub fn new(required: Duration) -> Self {
        Self {
            required,
            open_since: None,
            elapsed: Duration::ZERO,
            fired: false,
        }
    }

    pub fn observe(&mut self, verdict: &Verdict, at: Instant) -> Observation {
        if !verdict.affirmative {
            self.reset();
            return Observation::Pending;
        }

        let start = *self.open_since.get_or_insert(at);
        self.elapsed = at.saturating_duration_since(start);

        if self.elapsed >= self.required && !self.fired {
            self.fired = true;
            Observation::Confirmed
        } else {
            Observation::Pending
        }
    }

    pub fn reset(&mut self) {
        self.open_since = None;
        self.elapsed = Duration::ZERO;
        self.fired = false;
    }

    pub fn is_open(&self) -> bool {
        self.open_since.is_some()
    }

    #[cfg(test)]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn progress(&self) -> Progress {
        Progress::Held {
            elapsed: self.elapsed,
            required: self.required,
        }
    }
}
