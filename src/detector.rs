use crate::debounce::{Debounce, Observation, Progress};
use crate::frame::Frame;
use crate::presence::PresenceClassifier;
use anyhow::{Context, Result};

/// A presence classifier paired with the debounce policy that confirms it.
///
/// `observe` is the single entry point: classify one frame, feed the verdict
/// to the debounce policy, report whether presence is now confirmed.
pub struct PresenceDetector {
    classifier: Box<dyn PresenceClassifier>,
    debounce: Debounce,
    strength: f32,
    last_label: Option<String>,
}

impl PresenceDetector {
    pub fn new(classifier: Box<dyn PresenceClassifier>, debounce: impl Into<Debounce>) -> Self {
        Self {
            classifier,
            debounce: debounce.into(),
            strength: 0.0,
            last_label: None,
        }
    }

    pub fn observe(&mut self, frame: &Frame) -> Result<Observation> {
        let verdict = self
            .classifier
            .classify(frame)
            .with_context(|| format!("{} classifier failed", self.classifier.name()))?;

        self.strength = verdict.strength;
        if verdict.affirmative {
            if let Some(label) = &verdict.label {
                self.last_label = Some(label.clone());
            }
        }

        Ok(self.debounce.observe(&verdict, frame.captured_at()))
    }

    /// Back to neutral after a consumed confirmation or an abandoned cycle
    pub fn reset(&mut self) {
        self.debounce.reset();
        self.strength = 0.0;
    }

    /// Like [`reset`](Self::reset), and also drops any scene model the
    /// classifier keeps (the camera may have moved or been reopened).
    pub fn reset_scene(&mut self) {
        self.reset();
        self.classifier.reset_state();
    }

    pub fn strategy(&self) -> &'static str {
        self.classifier.name()
    }

    pub fn progress(&self) -> Progress {
        self.debounce.progress()
    }

    /// Strength of the most recent verdict
    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn last_label(&self) -> Option<&str> {
        self.last_label.as_deref()
    }

    /// Operator-facing phase label for the polling side
    pub fn status(&self) -> String {
        if !self.debounce.is_engaged() {
            return "WAITING".to_string();
        }

        match self.progress() {
            Progress::Count { value, threshold } => format!("DETECTING ({value}/{threshold})"),
            Progress::Held { elapsed, required } => format!(
                "{} HAND OPEN: {:.1}s/{:.1}s",
                self.last_label.as_deref().unwrap_or("").to_uppercase(),
                elapsed.as_secs_f32(),
                required.as_secs_f32()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debounce::{CounterDebounce, DurationDebounce};
    use crate::presence::Verdict;
    use crate::test_support::{blank_frame, ScriptedClassifier};
    use std::time::{Duration, Instant};

    #[test]
    fn counter_status_tracks_progress() {
        let classifier = ScriptedClassifier::new(vec![
            Verdict::affirmative(5000.0),
            Verdict::affirmative(5000.0),
        ]);
        let mut detector =
            PresenceDetector::new(Box::new(classifier), CounterDebounce::new(3, 3000.0));
        let now = Instant::now();

        assert_eq!(detector.status(), "WAITING");
        detector.observe(&blank_frame(now)).unwrap();
        detector.observe(&blank_frame(now)).unwrap();
        assert_eq!(detector.status(), "DETECTING (2/3)");
        assert_eq!(detector.strength(), 5000.0);

        detector.reset();
        assert_eq!(detector.status(), "WAITING");
    }

    #[test]
    fn hold_status_names_the_hand() {
        let open = Verdict::affirmative(0.9).with_label("Right");
        let classifier = ScriptedClassifier::new(vec![open.clone(), open]);
        let mut detector = PresenceDetector::new(
            Box::new(classifier),
            DurationDebounce::new(Duration::from_secs(2)),
        );
        let base = Instant::now();

        assert_eq!(detector.status(), "WAITING");
        detector.observe(&blank_frame(base)).unwrap();
        assert_eq!(detector.status(), "RIGHT HAND OPEN: 0.0s/2.0s");
        detector
            .observe(&blank_frame(base + Duration::from_millis(1500)))
            .unwrap();

        assert_eq!(detector.status(), "RIGHT HAND OPEN: 1.5s/2.0s");
        assert_eq!(detector.last_label(), Some("Right"));
    }

    #[test]
    fn label_survives_negative_verdicts() {
        let classifier = ScriptedClassifier::new(vec![
            Verdict::affirmative(0.9).with_label("Left"),
            Verdict::negative(0.2),
        ]);
        let mut detector = PresenceDetector::new(
            Box::new(classifier),
            DurationDebounce::new(Duration::from_secs(2)),
        );
        let now = Instant::now();

        detector.observe(&blank_frame(now)).unwrap();
        detector.observe(&blank_frame(now)).unwrap();

        assert_eq!(detector.last_label(), Some("Left"));
        assert_eq!(detector.status(), "WAITING");
    }

    #[test]
    fn classifier_errors_propagate() {
        let classifier = ScriptedClassifier::failing();
        let mut detector =
            PresenceDetector::new(Box::new(classifier), CounterDebounce::new(3, 3000.0));

        assert!(detector.observe(&blank_frame(Instant::now())).is_err());
    }
}
