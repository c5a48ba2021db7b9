//! Rate-limited Census Reporter client.
//!
//! One `GET` per county, never concurrent. A `200` response is kept as the
//! raw JSON payload; anything else (other statuses, transport errors,
//! bodies that are not JSON) marks the county as failed for this run. There
//! is no retry loop: the county is simply absent from the state's cache
//! until the pipeline is run again.

use std::sync::Arc;

use reqwest::StatusCode;

use crate::EnrichError;
use crate::config::CensusApiConfig;
use crate::pacing::Pacer;

/// Maximum length of a response body included in a failure reason.
const BODY_PREVIEW_LEN: usize = 200;

/// Result of requesting one county.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The provider answered `200` with a JSON body.
    Fetched(serde_json::Value),
    /// The county was not fetched.
    Failed {
        /// HTTP status, when a response was received at all.
        status: Option<u16>,
        /// Human-readable cause.
        reason: String,
    },
}

impl FetchOutcome {
    /// Whether the county was fetched.
    #[must_use]
    pub const fn is_fetched(&self) -> bool {
        matches!(self, Self::Fetched(_))
    }
}

/// Issues paced census requests.
pub struct CensusFetcher {
    client: reqwest::Client,
    config: CensusApiConfig,
    pacer: Arc<dyn Pacer>,
}

impl CensusFetcher {
    /// Builds a fetcher with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::Http`] if the client cannot be built.
    pub fn new(config: CensusApiConfig, pacer: Arc<dyn Pacer>) -> Result<Self, EnrichError> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            config,
            pacer,
        })
    }

    /// The API configuration in use.
    #[must_use]
    pub const fn config(&self) -> &CensusApiConfig {
        &self.config
    }

    /// Geography id for a county, e.g. `05000US51059`.
    #[must_use]
    pub fn geo_id(&self, fipscode: &str) -> String {
        format!("{}{fipscode}", self.config.geo_id_prefix)
    }

    /// Requests the configured tables for one county, then pauses for the
    /// throttle (on success) or backoff (on failure) delay.
    pub async fn fetch(&self, fipscode: &str) -> FetchOutcome {
        let outcome = self.request(fipscode).await;

        match &outcome {
            FetchOutcome::Fetched(_) => {
                log::info!("fipscode succeeded {fipscode}");
                self.pacer.pause(self.config.throttle()).await;
            }
            FetchOutcome::Failed { status, reason } => {
                match status {
                    Some(status) => log::warn!("fipscode failed: {fipscode} {status} ({reason})"),
                    None => log::warn!("fipscode failed: {fipscode} ({reason})"),
                }
                self.pacer.pause(self.config.backoff()).await;
            }
        }

        outcome
    }

    async fn request(&self, fipscode: &str) -> FetchOutcome {
        let geo_id = self.geo_id(fipscode);
        let table_ids = self.config.tables.join(",");

        let response = match self
            .client
            .get(&self.config.base_url)
            .query(&[("geo_ids", geo_id.as_str()), ("table_ids", table_ids.as_str())])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return FetchOutcome::Failed {
                    status: None,
                    reason: format!("request error: {e}"),
                };
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                return FetchOutcome::Failed {
                    status: Some(status.as_u16()),
                    reason: format!("failed to read response body: {e}"),
                };
            }
        };

        if status != StatusCode::OK {
            return FetchOutcome::Failed {
                status: Some(status.as_u16()),
                reason: format!("HTTP {status}: {}", truncate_for_log(&body, BODY_PREVIEW_LEN)),
            };
        }

        match serde_json::from_str(&body) {
            Ok(json) => FetchOutcome::Fetched(json),
            Err(e) => FetchOutcome::Failed {
                status: Some(status.as_u16()),
                reason: format!("JSON parse error: {e}"),
            },
        }
    }
}

/// Truncates a string for logging, appending "..." if it exceeds `max_len`.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::NoopPacer;

    #[test]
    fn geo_id_uses_configured_prefix() {
        let fetcher = CensusFetcher::new(CensusApiConfig::default(), Arc::new(NoopPacer)).unwrap();
        assert_eq!(fetcher.geo_id("51059"), "05000US51059");
    }

    #[test]
    fn truncates_long_bodies_on_char_boundary() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(truncate_for_log("abcdef", 3), "abc...");
        assert_eq!(truncate_for_log("aé", 2), "a...");
    }

    #[test]
    fn only_fetched_counts_as_fetched() {
        assert!(FetchOutcome::Fetched(serde_json::Value::Null).is_fetched());
        assert!(
            !FetchOutcome::Failed {
                status: Some(500),
                reason: String::new()
            }
            .is_fetched()
        );
    }
}
