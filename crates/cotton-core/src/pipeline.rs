//! Detection pipeline: frame → tensor → classification → advisory → Record.

use tracing::instrument;

use crate::classifier::ClassifierAdapter;
use crate::domain::{CapturedAt, PipelineError, Record};
use crate::metrics::METRICS;
use crate::obs;
use crate::preprocess::{Frame, Preprocessor};

/// The only place a raw frame becomes a [`Record`].
pub struct DetectionPipeline {
    preprocessor: Preprocessor,
    classifier: ClassifierAdapter,
}

impl DetectionPipeline {
    pub fn new(preprocessor: Preprocessor, classifier: ClassifierAdapter) -> Self {
        Self {
            preprocessor,
            classifier,
        }
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn classifier(&self) -> &ClassifierAdapter {
        &self.classifier
    }

    /// Sub-stage errors propagate unchanged.
    #[instrument(skip_all, fields(width = frame.width, height = frame.height))]
    pub async fn detect(
        &self,
        frame: &Frame,
        captured_at: CapturedAt,
    ) -> Result<Record, PipelineError> {
        match self.build(frame, captured_at).await {
            Ok(record) => {
                METRICS.inc_detections();
                obs::emit_detection_completed(&record);
                Ok(record)
            }
            Err(err) => {
                METRICS.inc_detection_failures();
                obs::emit_detection_failed(&err);
                Err(err)
            }
        }
    }

    async fn build(&self, frame: &Frame, captured_at: CapturedAt) -> Result<Record, PipelineError> {
        let tensor = self.preprocessor.prepare(frame)?;
        let detection = self.classifier.classify(&tensor).await?;
        Ok(Record::from_detection(
            detection.label,
            detection.confidence,
            captured_at,
        ))
    }
}
