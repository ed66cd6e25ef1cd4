//! HTTP client for the scoring service.
//!
//! `POST {base}/submit` scores a snapshot, `GET {base}/target` returns the
//! daily target record. Requests are never retried: a transport failure, a
//! non-success status and a malformed body all surface as a [`ScoringError`]
//! on the first try.

use std::time::Duration;

use async_trait::async_trait;
use drawdle_core::{ScoreRequest, ScoreResponse, TargetRecord};
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

/// Errors talking to the scoring service.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// The configured base URL is invalid.
    #[error("invalid scoring service URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed (connection, timeout, etc.).
    #[error("scoring request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("scoring service returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },
    /// The body was not the expected JSON.
    #[error("failed to parse scoring response: {0}")]
    Json(#[from] serde_json::Error),
}

/// The remote judge a round submits to.
#[async_trait]
pub trait ScoringService: Send + Sync {
    /// Score one snapshot.
    async fn submit(&self, request: &ScoreRequest) -> Result<ScoreResponse, ScoringError>;

    /// Fetch today's target record.
    async fn daily_target(&self) -> Result<TargetRecord, ScoringError>;
}

/// Join `segment` onto `base`, treating `base` as a directory.
pub(crate) fn endpoint(base: &str, segment: &str) -> Result<Url, String> {
    let mut url = Url::parse(base).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err(format!("{base} cannot be a base URL"));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.join(segment).map_err(|e| e.to_string())
}

/// [`ScoringService`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpScoringService {
    http: Client,
    submit_url: Url,
    target_url: Url,
}

impl HttpScoringService {
    /// Create a client for the service rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::InvalidUrl`] if the URL is malformed.
    /// Returns [`ScoringError::Http`] if the HTTP client fails to build.
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self, ScoringError> {
        let base = base_url.as_ref();
        let submit_url = endpoint(base, "submit").map_err(ScoringError::InvalidUrl)?;
        let target_url = endpoint(base, "target").map_err(ScoringError::InvalidUrl)?;

        let http = Client::builder()
            .user_agent(concat!("drawdle/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            submit_url,
            target_url,
        })
    }

    /// Endpoint used for submissions.
    #[must_use]
    pub fn submit_url(&self) -> &Url {
        &self.submit_url
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ScoringError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ScoringError::Status {
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ScoringService for HttpScoringService {
    async fn submit(&self, request: &ScoreRequest) -> Result<ScoreResponse, ScoringError> {
        tracing::debug!(attempt = request.attempt, url = %self.submit_url, "submitting drawing");
        let response = self
            .http
            .post(self.submit_url.clone())
            .json(request)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn daily_target(&self) -> Result<TargetRecord, ScoringError> {
        let response = self.http.get(self.target_url.clone()).send().await?;
        Self::read_json(response).await
    }
}
