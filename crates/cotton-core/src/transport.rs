//! Transport client: capture device → collector.
//!
//! [`TransportClient::send`] makes exactly one bounded-timeout call and never
//! fails hard: connection errors, timeouts and non-2xx replies all come back
//! as [`SendOutcome::Unavailable`]. Retrying is the caller's choice through
//! [`TransportClient::send_with_retry`].

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{parse_record, Record, ValidationError};
use crate::metrics::METRICS;
use crate::obs;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Collector endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Collector root URL, e.g. `http://192.168.1.20:8000`
    pub collector_url: String,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            collector_url: std::env::var("COTTON_COLLECTOR_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TransportConfig {
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn new(collector_url: &str) -> Self {
        TransportConfig {
            collector_url: collector_url.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.collector_url.trim_end_matches('/'), path)
    }
}

/// Why a send did not reach the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    Connect(String),
    Timeout,
    /// Collector answered with a non-2xx status.
    Status(u16),
    Other(String),
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::Connect(e) => write!(f, "connection failed: {e}"),
            UnavailableReason::Timeout => f.write_str("timed out"),
            UnavailableReason::Status(code) => write!(f, "collector returned HTTP {code}"),
            UnavailableReason::Other(e) => f.write_str(e),
        }
    }
}

impl From<reqwest::Error> for UnavailableReason {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UnavailableReason::Timeout
        } else if err.is_connect() {
            UnavailableReason::Connect(err.to_string())
        } else {
            UnavailableReason::Other(err.to_string())
        }
    }
}

/// Result of delivering one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Ack,
    Unavailable(UnavailableReason),
}

impl SendOutcome {
    pub fn is_ack(&self) -> bool {
        matches!(self, SendOutcome::Ack)
    }
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once()
    }
}

impl RetryPolicy {
    pub const fn once() -> Self {
        RetryPolicy {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }

    pub fn with_retries(retries: u32) -> Self {
        RetryPolicy {
            max_attempts: retries.saturating_add(1),
            ..Self::once()
        }
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32
            .checked_shl(retry.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Errors on the read path (CLI history/latest).
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("collector request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("collector returned HTTP {0}")]
    Status(u16),

    #[error("collector returned an invalid record: {0}")]
    Invalid(#[from] ValidationError),
}

#[derive(Deserialize)]
struct PredictionsBody {
    predictions: Vec<serde_json::Value>,
}

/// HTTP client for the collector API.
#[derive(Clone)]
pub struct TransportClient {
    config: TransportConfig,
    http_client: reqwest::Client,
}

impl TransportClient {
    pub fn new(config: TransportConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("cotton-doctor/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()?;
        Ok(TransportClient {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    async fn attempt(&self, record: &Record) -> SendOutcome {
        let url = self.config.url("/api/prediction");
        match self.http_client.post(&url).json(record).send().await {
            Ok(response) if response.status().is_success() => SendOutcome::Ack,
            Ok(response) => SendOutcome::Unavailable(UnavailableReason::Status(
                response.status().as_u16(),
            )),
            Err(err) => SendOutcome::Unavailable(err.into()),
        }
    }

    fn observe(record: &Record, outcome: &SendOutcome, attempts: u32) {
        match outcome {
            SendOutcome::Ack => {
                METRICS.inc_sends_acked();
                obs::emit_record_sent(record, attempts);
            }
            SendOutcome::Unavailable(reason) => {
                METRICS.inc_sends_unavailable();
                obs::emit_record_unavailable(record, reason, attempts);
            }
        }
    }

    /// One network call, no retry.
    pub async fn send(&self, record: &Record) -> SendOutcome {
        let outcome = self.attempt(record).await;
        Self::observe(record, &outcome, 1);
        outcome
    }

    /// Retry `Unavailable` outcomes per `policy`, sleeping between attempts.
    pub async fn send_with_retry(&self, record: &Record, policy: &RetryPolicy) -> SendOutcome {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempts = 0;
        loop {
            attempts += 1;
            let outcome = self.attempt(record).await;
            if outcome.is_ack() || attempts >= max_attempts {
                Self::observe(record, &outcome, attempts);
                return outcome;
            }
            let delay = policy.backoff(attempts);
            if let SendOutcome::Unavailable(reason) = &outcome {
                debug!(attempt = attempts, reason = %reason, delay_ms = delay.as_millis() as u64, "retrying send");
            }
            tokio::time::sleep(delay).await;
        }
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value, FetchError> {
        let response = self.http_client.get(self.config.url(path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }

    /// Whole history in arrival order.
    pub async fn fetch_all(&self) -> Result<Vec<Record>, FetchError> {
        let value = self.get_json("/api/predictions").await?;
        let body: PredictionsBody = serde_json::from_value(value)
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        body.predictions
            .into_iter()
            .map(|v| parse_record(v).map_err(FetchError::from))
            .collect()
    }

    /// Most recent record, `None` when the collector is empty.
    pub async fn fetch_latest(&self) -> Result<Option<Record>, FetchError> {
        let value = self.get_json("/api/latest").await?;
        if value.get("category").is_none() && value.get("message").is_some() {
            return Ok(None);
        }
        Ok(Some(parse_record(value)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_single_attempt() {
        assert_eq!(RetryPolicy::default().max_attempts, 1);
        assert_eq!(RetryPolicy::with_retries(3).max_attempts, 4);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::with_retries(10)
            .with_backoff(Duration::from_millis(100), Duration::from_millis(700));
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(700));
        assert_eq!(policy.backoff(40), Duration::from_millis(700));
    }

    #[test]
    fn test_url_join() {
        let config = TransportConfig::new("http://collector:8000/");
        assert_eq!(
            config.url("/api/prediction"),
            "http://collector:8000/api/prediction"
        );
    }

    #[test]
    fn test_unavailable_reason_display() {
        assert_eq!(
            UnavailableReason::Status(503).to_string(),
            "collector returned HTTP 503"
        );
        assert_eq!(UnavailableReason::Timeout.to_string(), "timed out");
    }
}
