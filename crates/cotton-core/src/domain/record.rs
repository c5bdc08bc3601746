//! Detection results and the advisory `Record` that travels to the collector.
//!
//! A `Record` is built only from a detection, with the advisory fields taken
//! from the knowledge base for its label ([`Record::from_detection`]), or
//! from a validated wire payload ([`WireRecord`]). Its fields are private so it cannot be edited
//! after construction.

use std::fmt;

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::advisory::KnowledgeBase;
use super::category::Category;
use super::error::ValidationError;

/// Textual timestamp format used on the wire.
pub const CAPTURED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Capture time of a frame, second precision, device-local clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CapturedAt(NaiveDateTime);

impl CapturedAt {
    /// Current local time truncated to whole seconds.
    pub fn now() -> Self {
        let now = Local::now().naive_local();
        CapturedAt(now.with_nanosecond(0).unwrap_or(now))
    }

    pub fn from_naive(value: NaiveDateTime) -> Self {
        CapturedAt(value.with_nanosecond(0).unwrap_or(value))
    }

    /// Parse the `YYYY-MM-DD HH:MM:SS` wire format.
    ///
    /// Only the zero-padded canonical form is accepted, so a parsed value
    /// always formats back to the exact input.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::TimestampFormat {
            value: value.to_string(),
        };
        let parsed =
            NaiveDateTime::parse_from_str(value, CAPTURED_AT_FORMAT).map_err(|_| invalid())?;
        if parsed.format(CAPTURED_AT_FORMAT).to_string() != value {
            return Err(invalid());
        }
        Ok(CapturedAt(parsed))
    }

    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for CapturedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CAPTURED_AT_FORMAT))
    }
}

impl Serialize for CapturedAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CapturedAt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        CapturedAt::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Round a percentage to two decimals for stable display and serialization.
pub fn round_confidence(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Transient classifier output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    /// Raw label the classifier emitted.
    pub label: String,
    /// Parsed category; `None` when the label is outside the closed set.
    pub category: Option<Category>,
    /// Index of the winning class.
    pub class_index: usize,
    /// Max class probability as a percentage in [0, 100], two decimals.
    pub confidence: f64,
}

/// Immutable unit of transmission and storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireRecord")]
pub struct Record {
    category: String,
    confidence: f64,
    treat: bool,
    guidance_primary: String,
    guidance_secondary: String,
    agent_primary: String,
    agent_secondary: String,
    captured_at: CapturedAt,
}

impl Record {
    /// Join a classifier label and confidence with the advisory for its
    /// category. Advisory fields are copied verbatim from the knowledge base;
    /// labels outside the closed set get the fail-closed template.
    pub fn from_detection(
        label: impl Into<String>,
        confidence: f64,
        captured_at: CapturedAt,
    ) -> Self {
        let category = label.into();
        let template = KnowledgeBase::new().lookup_label(&category);
        Record {
            category,
            confidence,
            treat: template.treat,
            guidance_primary: template.guidance_primary.to_string(),
            guidance_secondary: template.guidance_secondary.to_string(),
            agent_primary: template.agent_primary.to_string(),
            agent_secondary: template.agent_secondary.to_string(),
            captured_at,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Parsed category, if the label is inside the closed set.
    pub fn known_category(&self) -> Option<Category> {
        Category::from_label(&self.category)
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn treat(&self) -> bool {
        self.treat
    }

    pub fn guidance_primary(&self) -> &str {
        &self.guidance_primary
    }

    pub fn guidance_secondary(&self) -> &str {
        &self.guidance_secondary
    }

    pub fn agent_primary(&self) -> &str {
        &self.agent_primary
    }

    pub fn agent_secondary(&self) -> &str {
        &self.agent_secondary
    }

    pub fn captured_at(&self) -> CapturedAt {
        self.captured_at
    }

    /// True when every field except `captured_at` matches.
    pub fn same_advisory(&self, other: &Record) -> bool {
        self.category == other.category
            && self.confidence == other.confidence
            && self.treat == other.treat
            && self.guidance_primary == other.guidance_primary
            && self.guidance_secondary == other.guidance_secondary
            && self.agent_primary == other.agent_primary
            && self.agent_secondary == other.agent_secondary
    }
}

/// Unvalidated ingestion payload.
///
/// Field aliases accept the payload shape of the first-generation capture
/// script (`disease`, `sprinkle`, `advice_en`, ...). Unknown fields are
/// ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct WireRecord {
    #[serde(alias = "disease")]
    pub category: String,
    pub confidence: f64,
    #[serde(alias = "sprinkle")]
    pub treat: bool,
    #[serde(alias = "advice_en")]
    pub guidance_primary: String,
    #[serde(alias = "advice_hi")]
    pub guidance_secondary: String,
    #[serde(alias = "pesticide_en")]
    pub agent_primary: String,
    #[serde(alias = "pesticide_hi")]
    pub agent_secondary: String,
    #[serde(alias = "timestamp")]
    pub captured_at: String,
}

impl WireRecord {
    /// Range and format checks per field.
    pub fn validate(self) -> Result<Record, ValidationError> {
        if self.category.trim().is_empty() {
            return Err(ValidationError::EmptyCategory);
        }
        if !self.confidence.is_finite() || !(0.0..=100.0).contains(&self.confidence) {
            return Err(ValidationError::ConfidenceOutOfRange {
                value: self.confidence,
            });
        }
        let captured_at = CapturedAt::parse(&self.captured_at)?;

        Ok(Record {
            category: self.category,
            confidence: self.confidence,
            treat: self.treat,
            guidance_primary: self.guidance_primary,
            guidance_secondary: self.guidance_secondary,
            agent_primary: self.agent_primary,
            agent_secondary: self.agent_secondary,
            captured_at,
        })
    }
}

impl TryFrom<WireRecord> for Record {
    type Error = ValidationError;

    fn try_from(value: WireRecord) -> Result<Self, Self::Error> {
        value.validate()
    }
}

/// Validate an arbitrary JSON payload as a record.
pub fn parse_record(payload: serde_json::Value) -> Result<Record, ValidationError> {
    let wire: WireRecord = serde_json::from_value(payload)
        .map_err(|e| ValidationError::Malformed(e.to_string()))?;
    wire.validate()
}
