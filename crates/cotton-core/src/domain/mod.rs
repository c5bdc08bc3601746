//! Domain models for Cotton Doctor.
//!
//! - `Category`: closed set of classifier labels
//! - `KnowledgeBase` / `AdvisoryTemplate`: per-category bilingual advisory
//! - `DetectionResult`, `Record`: classifier output and the transmitted unit
//! - error taxonomy for frames, inference, validation and label loading

pub mod advisory;
pub mod category;
pub mod error;
pub mod record;

pub use advisory::{AdvisoryTemplate, KnowledgeBase, KnowledgeEntry, Severity};
pub use category::{Category, UnknownCategory};
pub use error::{FrameError, InferenceError, LabelSetError, PipelineError, ValidationError};
pub use record::{
    parse_record, round_confidence, CapturedAt, DetectionResult, Record, WireRecord,
    CAPTURED_AT_FORMAT,
};
