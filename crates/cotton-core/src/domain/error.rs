//! Domain-level error taxonomy for Cotton Doctor.

use super::category::UnknownCategory;

/// Reasons a raw camera frame cannot be preprocessed.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame has zero extent ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },

    #[error("unsupported channel count: {channels} (expected 1, 3 or 4)")]
    UnsupportedChannels { channels: u8 },

    #[error("frame buffer holds {actual} bytes, expected {expected} for {width}x{height}x{channels}")]
    BufferSize {
        width: u32,
        height: u32,
        channels: u8,
        expected: usize,
        actual: usize,
    },

    #[error("failed to decode image: {0}")]
    Decode(String),
}

/// Failures of the opaque model call or of its output.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("model call failed: {0}")]
    Model(String),

    #[error("model returned {actual} class scores, label set has {expected}")]
    OutputArity { expected: usize, actual: usize },

    #[error("model returned an empty score vector")]
    EmptyOutput,

    #[error("model returned a non-finite score at index {index}")]
    NonFinite { index: usize },

    #[error("input tensor shape {shape:?} does not match model input {expected:?}")]
    InputShape { shape: [usize; 4], expected: [usize; 4] },
}

/// Errors raised by one detection cycle. Neither is fatal to the caller.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid frame: {0}")]
    InvalidFrame(#[from] FrameError),

    #[error("inference failure: {0}")]
    InferenceFailure(#[from] InferenceError),
}

/// Record payload rejections (surface as `BadRequest` at the collector).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("category must not be empty")]
    EmptyCategory,

    #[error("confidence {value} outside [0, 100]")]
    ConfidenceOutOfRange { value: f64 },

    #[error("captured_at {value:?} is not in YYYY-MM-DD HH:MM:SS format")]
    TimestampFormat { value: String },

    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Errors loading the classifier label set.
#[derive(Debug, thiserror::Error)]
pub enum LabelSetError {
    #[error("failed to read label file: {0}")]
    Io(#[from] std::io::Error),

    #[error("label file is not a JSON array of strings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("label set is empty")]
    Empty,

    #[error(transparent)]
    UnknownLabel(#[from] UnknownCategory),

    #[error("duplicate label: {0:?}")]
    Duplicate(String),
}
