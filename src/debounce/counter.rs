use super::{Observation, Progress};
use crate::presence::Verdict;

/// Rising/decaying counter with a confirmation threshold
///
/// Each affirmative verdict whose strength exceeds `movement_threshold` adds
/// one (clamped at the threshold); any other verdict takes one away (never
/// below zero). `Confirmed` is returned only on the step that reaches the
/// threshold, so a counter parked at the threshold does not re-fire.
#[derive(Debug, Clone)]
pub struct CounterDebounce {
    counter: u32,
    confirmation_threshold: u32,
    movement_threshold: f32,
}

impl CounterDebounce {
    pub fn new(confirmation_threshold: u32, movement_threshold: f32) -> Self {
        Self {
            counter: 0,
            confirmation_threshold: confirmation_threshold.max(1),
            movement_threshold,
        }
    }

    pub fn observe(&mut self, verdict: &Verdict) -> Observation {
        let before = self.counter;

        if verdict.affirmative && verdict.strength > self.movement_threshold {
            self.counter = (self.counter + 1).min(self.confirmation_threshold);
        } else {
            self.counter = self.counter.saturating_sub(1);
        }

        if before < self.confirmation_threshold && self.counter == self.confirmation_threshold {
            Observation::Confirmed
        } else {
            Observation::Pending
        }
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn progress(&self) -> Progress {
        Progress::Count {
            value: self.counter,
            threshold: self.confirmation_threshold,
        }
    }
}
