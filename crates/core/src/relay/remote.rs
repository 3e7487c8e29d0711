use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::{DEFAULT_REQUEST_TIMEOUT, Relay, RelayError};
use crate::conversation::Turn;
use crate::session::Submission;
use crate::wire::{AssessRequest, AssessResponse, ErrorBody};

/// The default bound on the liveness probe.
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// A relay that forwards the conversation to a shared assessment server.
///
/// The server builds the system prompt, calls the backend with its own
/// credential and applies per-student rate limiting.
#[derive(Clone, Debug)]
pub struct RemoteRelay {
    client: Client,
    base_url: String,
    request_timeout: Duration,
    health_timeout: Duration,
}

impl RemoteRelay {
    /// Creates a relay for the server at `base_url`, e.g.
    /// `http://192.168.1.20:5001`.
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            client: Client::new(),
            base_url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
        }
    }

    /// Sets the bound on one assessment round-trip.
    #[inline]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the bound on the liveness probe.
    #[inline]
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Returns the server address.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn transport_error(err: reqwest::Error) -> RelayError {
    if err.is_timeout() {
        RelayError::Timeout
    } else {
        RelayError::Connection(err.to_string())
    }
}

#[async_trait]
impl Relay for RemoteRelay {
    async fn check_liveness(&self) -> Result<(), RelayError> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(transport_error)?;
        if resp.status() != StatusCode::OK {
            return Err(RelayError::Server(format!(
                "health check returned HTTP {}",
                resp.status()
            )));
        }
        debug!("server at {} is alive", self.base_url);
        Ok(())
    }

    async fn send(
        &self,
        submission: &Submission,
        history: &[Turn],
    ) -> Result<String, RelayError> {
        let body = AssessRequest {
            student_name: submission.student_name.clone(),
            code: submission.source_code.clone(),
            language: submission.language.as_str().to_owned(),
            messages: history.to_vec(),
        };
        let resp = self
            .client
            .post(format!("{}/assess", self.base_url))
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if status == StatusCode::OK {
            let resp: AssessResponse =
                resp.json().await.map_err(|err| {
                    if err.is_timeout() {
                        RelayError::Timeout
                    } else {
                        RelayError::Server(format!(
                            "invalid response from server: {err}"
                        ))
                    }
                })?;
            return Ok(resp.response);
        }

        // Error bodies are best effort, fall back to a generic message.
        let message = resp
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .ok();
        warn!("server rejected assessment request with HTTP {status}");
        if status == StatusCode::TOO_MANY_REQUESTS {
            Err(RelayError::RateLimited(
                message.unwrap_or_else(|| "Rate limit exceeded".to_owned()),
            ))
        } else {
            Err(RelayError::Server(message.unwrap_or_else(|| {
                format!("Server error (HTTP {status})")
            })))
        }
    }
}
