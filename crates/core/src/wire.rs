//! Payloads exchanged between the CLI and the relay server.

use serde::{Deserialize, Serialize};

use crate::conversation::Turn;

/// The body of `POST /assess`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessRequest {
    /// Identifies the student for rate limiting.
    pub student_name: String,
    /// The submitted source code.
    pub code: String,
    /// `python` or `c`.
    pub language: String,
    /// The conversation so far, oldest first.
    pub messages: Vec<Turn>,
}

/// The body of a successful `POST /assess`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessResponse {
    /// The assistant's next message.
    pub response: String,
}

/// The body of any unsuccessful response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// A human-readable description.
    pub error: String,
}

impl ErrorBody {
    /// Creates an error body.
    #[inline]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
