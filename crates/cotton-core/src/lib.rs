//! Cotton Doctor Core Library
//!
//! Detection-to-advisory pipeline for cotton plant images: preprocessing,
//! classification through an opaque model, knowledge-base lookup, record
//! construction and delivery to the collector.

pub mod capture;
pub mod classifier;
pub mod domain;
pub mod metrics;
pub mod obs;
pub mod pipeline;
pub mod preprocess;
pub mod telemetry;
pub mod transport;

pub use domain::{
    parse_record, round_confidence, AdvisoryTemplate, CapturedAt, Category, DetectionResult,
    FrameError, InferenceError, KnowledgeBase, KnowledgeEntry, LabelSetError, PipelineError,
    Record, Severity, UnknownCategory, ValidationError, WireRecord, CAPTURED_AT_FORMAT,
};

pub use capture::{
    CaptureLoop, CaptureSummary, CapturedFrame, CycleOutcome, DirectorySource, FrameSource,
};
pub use classifier::{argmax, ClassifierAdapter, LabelSet, Model, ServingConfig, ServingModel};
pub use pipeline::DetectionPipeline;
pub use preprocess::{Frame, PixelOrder, Preprocessor, Tensor, DEFAULT_INPUT_SIZE};
pub use transport::{
    FetchError, RetryPolicy, SendOutcome, TransportClient, TransportConfig, UnavailableReason,
    DEFAULT_TIMEOUT,
};

pub use metrics::{MetricsSnapshot, METRICS};
pub use obs::{
    emit_detection_completed, emit_detection_failed, emit_record_ingested, emit_record_rejected,
    emit_record_sent, emit_record_unavailable, CycleSpan,
};
pub use telemetry::{default_directives, init_tracing, level_for};

/// Cotton Doctor version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
