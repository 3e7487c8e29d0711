use serde::{Deserialize, Serialize};

/// The reason why a model response has finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The model has finished generating text.
    Stop,
    /// The model ran into the output token limit.
    MaxTokens,
}

/// A completely received response from the model provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelResponse {
    /// The assistant message text.
    pub content: String,
    /// The reason the model finished generating.
    pub finish_reason: ModelFinishReason,
}

impl ModelResponse {
    /// Creates a response that finished normally.
    #[inline]
    pub fn stop<S: Into<String>>(content: S) -> Self {
        Self {
            content: content.into(),
            finish_reason: ModelFinishReason::Stop,
        }
    }
}
