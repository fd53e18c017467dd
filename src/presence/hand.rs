use super::pose::{self, Handedness, Point, LANDMARK_COUNT};
use super::preprocess::{Preprocessor, TensorLayout};
use super::types::{PresenceClassifier, Verdict};
use crate::frame::Frame;
use anyhow::{anyhow, bail, Context, Result};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::{Path, PathBuf};

/// Configuration for [`HandClassifier`]
#[derive(Debug, Clone)]
pub struct HandConfig {
    pub model_path: PathBuf,
    /// Square input edge the model was exported with
    pub input_size: u32,
    pub layout: TensorLayout,
    /// Minimum hand presence score
    pub min_confidence: f32,
}

impl HandConfig {
    pub fn new<P: AsRef<Path>>(model_path: P, min_confidence: f32, layout: TensorLayout) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            input_size: 224,
            layout,
            min_confidence,
        }
    }
}

/// Open-hand gesture classifier backed by an ONNX hand-landmark model
///
/// The model is expected to produce, in order:
/// 0. 21 landmarks as (x, y, z) in input-pixel coordinates
/// 1. hand presence score
/// 2. handedness score (> 0.5 means right hand)
///
/// A frame is affirmative when a hand is present with enough confidence and
/// every finger, thumb included, is extended.
pub struct HandClassifier {
    session: Session,
    outputs: OutputNames,
    preprocessor: Preprocessor,
    min_confidence: f32,
}

/// Names of the three model outputs, in the order they are read
#[derive(Debug, Clone, PartialEq)]
struct OutputNames {
    landmarks: String,
    presence: String,
    handedness: String,
}

impl OutputNames {
    fn select(available: Vec<String>) -> Result<Self> {
        let count = available.len();
        let mut names = available.into_iter();
        match (names.next(), names.next(), names.next()) {
            (Some(landmarks), Some(presence), Some(handedness)) => Ok(Self {
                landmarks,
                presence,
                handedness,
            }),
            _ => bail!(
                "hand landmark model has {count} outputs, expected landmarks, presence and handedness"
            ),
        }
    }
}

fn ort_error<E: std::fmt::Display>(e: E) -> anyhow::Error {
    anyhow!("onnx runtime: {e}")
}

impl HandClassifier {
    pub fn new(config: HandConfig) -> Result<Self> {
        let path = config.model_path.as_path();

        tracing::info!("Loading hand landmark model from {}", path.display());

        let session = Session::builder()
            .map_err(ort_error)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ort_error)?
            .with_intra_threads(2)
            .map_err(ort_error)?
            .commit_from_file(path)
            .map_err(ort_error)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        let outputs = OutputNames::select(
            session.outputs.iter().map(|o| o.name.clone()).collect(),
        )
        .with_context(|| format!("Unsupported model {}", path.display()))?;

        tracing::info!("Hand landmark model loaded successfully");
        tracing::debug!("Model outputs: {:?}", outputs);

        Ok(Self {
            session,
            outputs,
            preprocessor: Preprocessor::new(config.input_size, config.input_size, config.layout),
            min_confidence: config.min_confidence,
        })
    }
}

impl PresenceClassifier for HandClassifier {
    fn name(&self) -> &'static str {
        "gesture"
    }

    fn classify(&mut self, frame: &Frame) -> Result<Verdict> {
        let _span = tracing::debug_span!("hand_classify").entered();

        let tensor = self.preprocessor.preprocess(frame.image())?;
        let (n, a, b, c) = tensor.dim();
        let input = Tensor::from_array(([n, a, b, c], tensor.into_raw_vec())).map_err(ort_error)?;

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(ort_error)
            .context("Failed to run inference")?;
        drop(_infer_span);

        let output = |name: &str| {
            outputs
                .get(name)
                .ok_or_else(|| anyhow!("model output {name:?} missing"))
        };
        let (_, landmarks) = output(&self.outputs.landmarks)?
            .try_extract_tensor::<f32>()
            .map_err(ort_error)?;
        let (_, presence) = output(&self.outputs.presence)?
            .try_extract_tensor::<f32>()
            .map_err(ort_error)?;
        let (_, handedness) = output(&self.outputs.handedness)?
            .try_extract_tensor::<f32>()
            .map_err(ort_error)?;

        let presence = presence.first().copied().unwrap_or(0.0);
        let handedness = handedness.first().copied().unwrap_or(0.0);

        let (input_width, input_height) = self.preprocessor.target_size();
        let (frame_width, frame_height) = frame.dimensions();
        let scale = (
            frame_width as f32 / input_width as f32,
            frame_height as f32 / input_height as f32,
        );

        interpret(landmarks, presence, handedness, scale, self.min_confidence)
    }
}

/// Turn raw model outputs into a verdict.
///
/// `scale` maps input-pixel coordinates back to frame pixels so joint
/// angles are measured with the frame's real aspect ratio.
fn interpret(
    raw_landmarks: &[f32],
    presence: f32,
    handedness: f32,
    scale: (f32, f32),
    min_confidence: f32,
) -> Result<Verdict> {
    if presence < min_confidence {
        return Ok(Verdict::negative(presence));
    }

    if raw_landmarks.len() < LANDMARK_COUNT * 3 {
        return Err(anyhow!(
            "expected {} landmark values, model produced {}",
            LANDMARK_COUNT * 3,
            raw_landmarks.len()
        ));
    }

    let mut landmarks = [Point { x: 0.0, y: 0.0 }; LANDMARK_COUNT];
    for (i, point) in landmarks.iter_mut().enumerate() {
        point.x = raw_landmarks[i * 3] * scale.0;
        point.y = raw_landmarks[i * 3 + 1] * scale.1;
    }

    let hand = if handedness > 0.5 {
        Handedness::Right
    } else {
        Handedness::Left
    };

    if pose::is_hand_fully_open(&landmarks, hand) {
        tracing::debug!("{} hand open (presence {:.2})", hand.label(), presence);
        Ok(Verdict::affirmative(presence).with_label(hand.label()))
    } else {
        Ok(Verdict::negative(presence))
    }
}
