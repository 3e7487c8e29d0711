use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::Instrument;
use viva_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse,
};

use super::{Relay, RelayError};
use crate::conversation::Turn;
use crate::prompt;
use crate::session::Submission;

/// The default bound on one model call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type SendRequestResult = Result<ModelResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A relay that calls a model provider directly.
///
/// The system instructions are rebuilt from the submission and sent with the
/// full history on every call, since the backend keeps no state between
/// calls.
#[derive(Clone)]
pub struct DirectRelay {
    handler_fn: HandlerFn,
    timeout: Duration,
}

impl DirectRelay {
    /// Wraps a model provider.
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // Erase `P` so that callers can hold any backend behind one type.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("sending {} messages", req.messages.len());
                    fut.await
                        .map_err(|err| Box::new(err) as Box<dyn ModelProviderError>)
                }
                .instrument(trace_span!("direct relay req")),
            )
        });
        Self {
            handler_fn,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Sets the bound on one model call.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_model_request(
        submission: &Submission,
        history: &[Turn],
    ) -> ModelRequest {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ModelMessage::System(prompt::system_prompt(submission)));
        messages.extend(history.iter().map(Turn::to_model_message));
        ModelRequest { messages }
    }
}

#[async_trait]
impl Relay for DirectRelay {
    async fn send(
        &self,
        submission: &Submission,
        history: &[Turn],
    ) -> Result<String, RelayError> {
        let req = Self::build_model_request(submission, history);
        let resp = match tokio::time::timeout(self.timeout, (self.handler_fn)(req))
            .await
        {
            Ok(Ok(resp)) => resp,
            Ok(Err(err)) => {
                error!("model request failed: {err}");
                return Err(map_provider_error(err.as_ref()));
            }
            Err(_) => {
                error!("model request timed out after {:?}", self.timeout);
                return Err(RelayError::Timeout);
            }
        };
        if resp.finish_reason == ModelFinishReason::MaxTokens {
            warn!("assistant reply was cut off by the token limit");
        }
        Ok(resp.content)
    }
}

/// Backend quota errors are not student quota rejections, so they are
/// reported as server errors.
fn map_provider_error(err: &dyn ModelProviderError) -> RelayError {
    match err.kind() {
        ErrorKind::Timeout => RelayError::Timeout,
        ErrorKind::Connection => RelayError::Connection(err.to_string()),
        ErrorKind::Authentication => {
            RelayError::Server(format!("The API key was rejected: {err}"))
        }
        ErrorKind::RateLimitExceeded
        | ErrorKind::Server
        | ErrorKind::Other => RelayError::Server(err.to_string()),
    }
}
