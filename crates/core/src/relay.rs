//! Obtaining the next assistant message.
//!
//! A [`Relay`] turns the conversation so far into the assistant's next
//! message. [`DirectRelay`] calls a model backend with a locally held
//! credential, [`RemoteRelay`] forwards the conversation to a shared server
//! that holds the credential and enforces per-student quotas. The
//! conversation loop only sees the trait, so the two are interchangeable.
//!
//! Relays never retry. Every failure is reported once to the caller.

mod direct;
mod remote;

use async_trait::async_trait;

pub use direct::{DEFAULT_REQUEST_TIMEOUT, DirectRelay};
pub use remote::{DEFAULT_HEALTH_TIMEOUT, RemoteRelay};

use crate::conversation::Turn;
use crate::session::Submission;

/// The ways obtaining a reply can fail.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// The request exceeded its time bound.
    #[error("Request timed out. Server may be busy.")]
    Timeout,
    /// The transport failed.
    #[error("Connection error: {0}")]
    Connection(String),
    /// The shared server rejected the request because the student's quota
    /// is used up.
    #[error("{0}")]
    RateLimited(String),
    /// Any other unsuccessful outcome.
    #[error("{0}")]
    Server(String),
    /// The direct backend could not be set up.
    #[error("Failed to initialize the model client: {0}")]
    BackendInit(String),
}

impl RelayError {
    /// Returns `true` if the request was rejected by quota.
    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// A strategy for obtaining the assistant's next message.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Checks that the relay can be reached before a session starts.
    async fn check_liveness(&self) -> Result<(), RelayError> {
        Ok(())
    }

    /// Sends the full history and returns the assistant's next message.
    async fn send(
        &self,
        submission: &Submission,
        history: &[Turn],
    ) -> Result<String, RelayError>;
}

#[async_trait]
impl<R: Relay + ?Sized> Relay for Box<R> {
    async fn check_liveness(&self) -> Result<(), RelayError> {
        (**self).check_liveness().await
    }

    async fn send(
        &self,
        submission: &Submission,
        history: &[Turn],
    ) -> Result<String, RelayError> {
        (**self).send(submission, history).await
    }
}
