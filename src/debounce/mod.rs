//! Debounce policies that turn noisy per-frame verdicts into one confirmation.
//!
//! Both policies share the same contract: feed every verdict to `observe`,
//! and when it returns [`Observation::Confirmed`] the caller consumes the
//! event and calls `reset` before observing again.

mod counter;
mod duration;

pub use counter::CounterDebounce;
pub use duration::DurationDebounce;

use crate::presence::Verdict;
use std::time::{Duration, Instant};

/// Result of feeding one verdict to a debounce policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Pending,
    Confirmed,
}

/// How far a policy is towards confirmation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    Count { value: u32, threshold: u32 },
    Held { elapsed: Duration, required: Duration },
}

/// The debounce policy a deployment runs with
#[derive(Debug, Clone)]
pub enum Debounce {
    Counter(CounterDebounce),
    Duration(DurationDebounce),
}

impl Debounce {
    pub fn observe(&mut self, verdict: &Verdict, at: Instant) -> Observation {
        match self {
            Debounce::Counter(c) => c.observe(verdict),
            Debounce::Duration(d) => d.observe(verdict, at),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Debounce::Counter(c) => c.reset(),
            Debounce::Duration(d) => d.reset(),
        }
    }

    pub fn progress(&self) -> Progress {
        match self {
            Debounce::Counter(c) => c.progress(),
            Debounce::Duration(d) => d.progress(),
        }
    }

    /// Whether any evidence has accumulated since the last reset
    pub fn is_engaged(&self) -> bool {
        match self {
            Debounce::Counter(c) => c.counter() > 0,
            Debounce::Duration(d) => d.is_open(),
        }
    }
}

impl From<CounterDebounce> for Debounce {
    fn from(counter: CounterDebounce) -> Self {
        Debounce::Counter(counter)
    }
}

impl From<DurationDebounce> for Debounce {
    fn from(duration: DurationDebounce) -> Self {
        Debounce::Duration(duration)
    }
}
