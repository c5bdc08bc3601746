//! Classifier adapter around an opaque pretrained model.
//!
//! The model itself is a black box behind the [`Model`] trait: it takes a
//! batched tensor and returns one probability per class. [`LabelSet`] maps
//! output indices back to category labels.

pub mod serving;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    round_confidence, Category, DetectionResult, InferenceError, LabelSetError, UnknownCategory,
};
use crate::preprocess::Tensor;

pub use serving::{ServingConfig, ServingModel};

/// Opaque pretrained image classifier.
#[async_trait]
pub trait Model: Send + Sync {
    /// One forward pass. Returns class probabilities for the single batch item.
    async fn predict(&self, input: &Tensor) -> Result<Vec<f32>, InferenceError>;
}

/// Ordered class labels, index-aligned with the model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    /// Strict constructor: every label must name a known [`Category`].
    pub fn from_labels<I, S>(labels: I) -> Result<Self, LabelSetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = Self::lenient(labels)?;
        for label in &set.labels {
            if Category::from_label(label).is_none() {
                return Err(UnknownCategory(label.clone()).into());
            }
        }
        Ok(set)
    }

    /// Accepts labels outside the closed set; they fail closed at KB lookup.
    pub fn lenient<I, S>(labels: I) -> Result<Self, LabelSetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(LabelSetError::Empty);
        }
        let mut seen = HashSet::new();
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(LabelSetError::Duplicate(label.clone()));
            }
            if Category::from_label(label).is_none() {
                tracing::warn!(label = %label, "label outside known categories; advisory will be empty");
            }
        }
        Ok(Self { labels })
    }

    /// Load a `class_names.json` array.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LabelSetError> {
        let raw = std::fs::read_to_string(path)?;
        let labels: Vec<String> = serde_json::from_str(&raw)?;
        Self::from_labels(labels)
    }

    /// Labels for every category, in classifier index order.
    pub fn standard() -> Self {
        Self {
            labels: Category::ALL.iter().map(|c| c.label().to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Index of the maximum score; ties go to the lowest index.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}

/// Model plus label set; turns a tensor into a [`DetectionResult`].
pub struct ClassifierAdapter {
    model: Arc<dyn Model>,
    labels: LabelSet,
}

impl ClassifierAdapter {
    pub fn new(model: Arc<dyn Model>, labels: LabelSet) -> Self {
        Self { model, labels }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub async fn classify(&self, input: &Tensor) -> Result<DetectionResult, InferenceError> {
        let scores = self.model.predict(input).await?;

        if scores.is_empty() {
            return Err(InferenceError::EmptyOutput);
        }
        if scores.len() != self.labels.len() {
            return Err(InferenceError::OutputArity {
                expected: self.labels.len(),
                actual: scores.len(),
            });
        }
        if let Some(index) = scores.iter().position(|s| !s.is_finite()) {
            return Err(InferenceError::NonFinite { index });
        }

        let class_index = argmax(&scores).ok_or(InferenceError::EmptyOutput)?;
        let label = self
            .labels
            .get(class_index)
            .ok_or(InferenceError::OutputArity {
                expected: self.labels.len(),
                actual: scores.len(),
            })?
            .to_string();

        let probability = f64::from(scores[class_index]).clamp(0.0, 1.0);

        Ok(DetectionResult {
            category: Category::from_label(&label),
            label,
            class_index,
            confidence: round_confidence(probability * 100.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::{Frame, PixelOrder, Preprocessor};

    struct FixedModel(Vec<f32>);

    #[async_trait]
    impl Model for FixedModel {
        async fn predict(&self, _input: &Tensor) -> Result<Vec<f32>, InferenceError> {
            Ok(self.0.clone())
        }
    }

    fn tensor() -> Tensor {
        let frame = Frame::new(2, 2, 3, PixelOrder::Rgb, vec![0; 12]);
        Preprocessor::new(2).prepare(&frame).unwrap()
    }

    fn adapter(scores: Vec<f32>) -> ClassifierAdapter {
        ClassifierAdapter::new(Arc::new(FixedModel(scores)), LabelSet::standard())
    }

    #[test]
    fn test_argmax_lowest_index_on_tie() {
        assert_eq!(argmax(&[0.1, 0.4, 0.4, 0.1]), Some(1));
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    #[tokio::test]
    async fn test_classify_picks_max_and_rounds() {
        let result = adapter(vec![0.9123456, 0.01, 0.01, 0.01, 0.01, 0.03, 0.01, 0.0])
            .classify(&tensor())
            .await
            .unwrap();
        assert_eq!(result.label, "Aphids");
        assert_eq!(result.category, Some(Category::Aphids));
        assert_eq!(result.class_index, 0);
        assert_eq!(result.confidence, 91.23);
    }

    #[tokio::test]
    async fn test_classify_rejects_wrong_arity() {
        let err = adapter(vec![0.5, 0.5]).classify(&tensor()).await.unwrap_err();
        assert!(matches!(
            err,
            InferenceError::OutputArity {
                expected: 8,
                actual: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_classify_rejects_nan() {
        let mut scores = vec![0.1; 8];
        scores[3] = f32::NAN;
        let err = adapter(scores).classify(&tensor()).await.unwrap_err();
        assert!(matches!(err, InferenceError::NonFinite { index: 3 }));
    }

    #[tokio::test]
    async fn test_classify_rejects_empty_output() {
        let err = adapter(vec![]).classify(&tensor()).await.unwrap_err();
        assert!(matches!(err, InferenceError::EmptyOutput));
    }

    #[tokio::test]
    async fn test_unknown_label_has_no_category() {
        let labels = LabelSet::lenient(["Leaf curl", "Healthy"]).unwrap();
        let adapter = ClassifierAdapter::new(Arc::new(FixedModel(vec![0.7, 0.3])), labels);
        let result = adapter.classify(&tensor()).await.unwrap();
        assert_eq!(result.label, "Leaf curl");
        assert_eq!(result.category, None);
    }

    #[test]
    fn test_label_set_strict_rejects_unknown() {
        let err = LabelSet::from_labels(["Aphids", "Leaf curl"]).unwrap_err();
        assert!(matches!(err, LabelSetError::UnknownLabel(_)));
    }

    #[test]
    fn test_label_set_rejects_empty_and_duplicates() {
        assert!(matches!(
            LabelSet::from_labels(Vec::<String>::new()),
            Err(LabelSetError::Empty)
        ));
        assert!(matches!(
            LabelSet::from_labels(["Healthy", "Healthy"]),
            Err(LabelSetError::Duplicate(_))
        ));
    }

    #[test]
    fn test_label_set_load_class_names_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("class_names.json");
        let labels: Vec<&str> = Category::ALL.iter().map(|c| c.label()).collect();
        std::fs::write(&path, serde_json::to_string(&labels).unwrap()).unwrap();

        let set = LabelSet::load(&path).unwrap();
        assert_eq!(set, LabelSet::standard());
        assert_eq!(set.get(1), Some("Army worm"));
    }

    #[test]
    fn test_label_set_load_rejects_non_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("class_names.json");
        std::fs::write(&path, r#"{"0": "Aphids"}"#).unwrap();
        assert!(matches!(LabelSet::load(&path), Err(LabelSetError::Json(_))));
    }
}
