mod hand;
mod motion;
mod pose;
mod preprocess;
pub mod types;

pub use hand::{HandClassifier, HandConfig};
pub use motion::{MotionClassifier, MotionConfig};
pub use preprocess::TensorLayout;
pub use types::{PresenceClassifier, Verdict};
