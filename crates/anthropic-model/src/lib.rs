//! A model provider for the Anthropic Messages API.

#[macro_use]
extern crate tracing;

mod config;
mod proto;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use reqwest::{Client, StatusCode, header};
use viva_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
};

pub use config::{AnthropicConfig, AnthropicConfigBuilder};

const API_VERSION: &str = "2023-06-01";

/// Error type for [`AnthropicProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_connect() {
            ErrorKind::Connection
        } else {
            ErrorKind::Other
        };
        Self::new(format!("request failed: {err}"), kind)
    }
}

/// Maps a non-success status and its body to an error.
fn classify_status(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<proto::ErrorResponse>(body)
        .map(|resp| resp.error.message)
        .unwrap_or_else(|_| body.trim().to_owned());
    let kind = match status.as_u16() {
        401 | 403 => ErrorKind::Authentication,
        429 => ErrorKind::RateLimitExceeded,
        500..=599 => ErrorKind::Server,
        _ => ErrorKind::Other,
    };
    Error::new(format!("HTTP {status}: {message}"), kind)
}

/// Anthropic model provider.
#[derive(Clone, Debug)]
pub struct AnthropicProvider {
    client: Client,
    config: Arc<AnthropicConfig>,
}

impl AnthropicProvider {
    /// Creates a new `AnthropicProvider` with the given configuration.
    ///
    /// Fails if the HTTP client cannot be initialized, e.g. when the TLS
    /// backend is unavailable.
    pub fn new(config: AnthropicConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| {
                Error::new(
                    format!("failed to initialize HTTP client: {err}"),
                    ErrorKind::Other,
                )
            })?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    /// Returns the configuration of this provider.
    #[inline]
    pub fn config(&self) -> &AnthropicConfig {
        &self.config
    }
}

impl ModelProvider for AnthropicProvider {
    type Error = Error;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<ModelResponse, Self::Error>> + Send + 'static
    {
        let payload = proto::create_request(req, &self.config);
        let resp_fut = self
            .client
            .post(format!("{}{}", self.config.base_url, "/messages"))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&payload)
            .send();

        async move {
            let resp = resp_fut.await?;
            let status = resp.status();
            let body = resp.text().await?;
            trace!("got response ({status}): {body}");

            if !status.is_success() {
                let err = classify_status(status, &body);
                warn!("model request failed: {err}");
                return Err(err);
            }

            let resp = serde_json::from_str::<proto::MessagesResponse>(&body)
                .map_err(|err| {
                    Error::new(
                        format!("failed to parse response: {err}"),
                        ErrorKind::Other,
                    )
                })?;
            proto::into_model_response(resp).ok_or_else(|| {
                Error::new("response contained no text", ErrorKind::Other)
            })
        }
    }
}
