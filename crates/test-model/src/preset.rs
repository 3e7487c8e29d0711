use serde::{Deserialize, Serialize};
use viva_model::ErrorKind;

/// A failure that a preset response can simulate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetFailure {
    Timeout,
    Connection,
    Authentication,
    RateLimitExceeded,
    Server,
    Other,
}

impl From<PresetFailure> for ErrorKind {
    fn from(failure: PresetFailure) -> Self {
        match failure {
            PresetFailure::Timeout => ErrorKind::Timeout,
            PresetFailure::Connection => ErrorKind::Connection,
            PresetFailure::Authentication => ErrorKind::Authentication,
            PresetFailure::RateLimitExceeded => ErrorKind::RateLimitExceeded,
            PresetFailure::Server => ErrorKind::Server,
            PresetFailure::Other => ErrorKind::Other,
        }
    }
}

/// The preset response for an assistant step.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetResponse {
    /// The model answers with this text.
    #[serde(rename = "reply")]
    Reply(String),
    /// The request fails.
    #[serde(rename = "failure")]
    Failure(PresetFailure),
}

impl PresetResponse {
    /// Creates a `PresetResponse` that answers with the given text.
    #[inline]
    pub fn reply<S: Into<String>>(text: S) -> Self {
        Self::Reply(text.into())
    }

    /// Creates a `PresetResponse` that fails with the given failure.
    #[inline]
    pub fn failure(failure: PresetFailure) -> Self {
        Self::Failure(failure)
    }
}
