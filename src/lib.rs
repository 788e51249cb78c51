use thiserror::Error;

/// Tracking of detected objects across frames
pub mod trackers;

/// Bounding boxes and IoU
pub mod utils;

/// Detector output and boundary validation
pub mod detection;

/// Linking of PPE items to the tracked persons
pub mod association;

/// Safety policy evaluation
pub mod compliance;

/// Per-stream and multi-stream processing
pub mod pipeline;

/// Configuration loading
pub mod config;

/// Synthetic scene generators for demos, tests and benchmarks
pub mod examples;

pub mod prelude;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Errors {
    #[error("Detection field `{0}` is missing.")]
    MissingField(&'static str),
    #[error("Bounding box coordinates must be finite numbers: {0:?}")]
    NonFiniteCoordinate([f32; 4]),
    #[error("Bounding box has negative width or height: {0:?}")]
    InvertedBox([f32; 4]),
    #[error("Confidence must lay within [0.0, 1.0], got {0}")]
    ConfidenceOutOfRange(f32),
    #[error("Invalid option `{name}`: {reason}")]
    InvalidOption { name: &'static str, reason: String },
}

pub(crate) const EPS: f32 = 0.00001;

/// Approximate equality for floating point based objects
pub trait EstimateClose {
    fn almost_same(&self, other: &Self, eps: f32) -> bool;
}

impl EstimateClose for f32 {
    fn almost_same(&self, other: &Self, eps: f32) -> bool {
        (self - other).abs() < eps
    }
}
