//! Leaderboard reporting.
//!
//! A won round is reported once with `POST {base}/leaderboard`. The report is
//! fire-and-forget from the round's point of view: failures are returned to
//! the caller for logging and never retried.

use std::time::Duration;

use async_trait::async_trait;
use drawdle_core::LeaderboardEntry;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::scoring::endpoint;

/// Errors posting a leaderboard entry.
#[derive(Debug, Error)]
pub enum LeaderboardError {
    /// The configured base URL is invalid.
    #[error("invalid leaderboard URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed.
    #[error("leaderboard request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The leaderboard answered with a non-success status.
    #[error("leaderboard returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },
}

/// Receives winning scores.
#[async_trait]
pub trait LeaderboardReporter: Send + Sync {
    /// Record one entry.
    async fn report(&self, entry: &LeaderboardEntry) -> Result<(), LeaderboardError>;
}

/// [`LeaderboardReporter`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpLeaderboard {
    http: Client,
    url: Url,
}

impl HttpLeaderboard {
    /// Create a reporter for the service rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`LeaderboardError::InvalidUrl`] if the URL is malformed.
    /// Returns [`LeaderboardError::Http`] if the HTTP client fails to build.
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self, LeaderboardError> {
        let url = endpoint(base_url.as_ref(), "leaderboard").map_err(LeaderboardError::InvalidUrl)?;
        let http = Client::builder()
            .user_agent(concat!("drawdle/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl LeaderboardReporter for HttpLeaderboard {
    async fn report(&self, entry: &LeaderboardEntry) -> Result<(), LeaderboardError> {
        let response = self.http.post(self.url.clone()).json(entry).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LeaderboardError::Status {
                status: status.as_u16(),
            });
        }
        tracing::info!(name = %entry.name, score = entry.score, "leaderboard entry recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn entry() -> LeaderboardEntry {
        LeaderboardEntry::new("Ada", 80.0, 2, "data:image/png;base64,AQID")
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_report_posts_entry() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/leaderboard"))
            .and(body_json(json!({
                "name": "Ada",
                "score": 80,
                "attempts": 2,
                "image": "data:image/png;base64,AQID"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let reporter = HttpLeaderboard::new(server.uri(), Duration::from_secs(5)).expect("client");
        reporter.report(&entry()).await.expect("report");
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_report_surfaces_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/leaderboard"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let reporter = HttpLeaderboard::new(server.uri(), Duration::from_secs(5)).expect("client");
        let err = reporter.report(&entry()).await.unwrap_err();
        assert!(matches!(err, LeaderboardError::Status { status: 500 }));
    }
}
