use crate::frame::Frame;
use anyhow::Result;

/// Per-frame answer from a classifier: is a candidate present, and how strongly.
///
/// `strength` is strategy-specific (blob area in pixels for motion, hand
/// presence score for gestures). `label` names what was seen, when the
/// strategy can tell (e.g. "Right" for a right hand).
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub affirmative: bool,
    pub strength: f32,
    pub label: Option<String>,
}

impl Verdict {
    pub fn affirmative(strength: f32) -> Self {
        Self {
            affirmative: true,
            strength,
            label: None,
        }
    }

    pub fn negative(strength: f32) -> Self {
        Self {
            affirmative: false,
            strength,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Trait for presence classifiers
/// Allows swapping between strategies (background motion, hand landmarks, ...)
pub trait PresenceClassifier {
    /// Short strategy name used in logs
    fn name(&self) -> &'static str;

    /// Classify one frame
    ///
    /// The frame is borrowed read-only; classifiers never keep pixels past
    /// the call except for their own internal models (e.g. a background).
    fn classify(&mut self, frame: &Frame) -> Result<Verdict>;

    /// Reset internal state
    ///
    /// Call this when:
    /// - The polling camera was reopened
    /// - A capture cycle finished and the scene may have changed
    fn reset_state(&mut self) {
        // Default implementation: no-op for stateless classifiers
    }
}
