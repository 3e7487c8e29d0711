use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use viva_core::wire::{AssessRequest, AssessResponse, ErrorBody};
use viva_core::{Relay, RelayError, SourceLanguage, Speaker, Submission};

use crate::rate_limit::RateLimiter;

/// Shared state of the relay server.
#[derive(Clone)]
pub struct AppState {
    relay: Arc<dyn Relay>,
    limiter: Arc<RateLimiter>,
    max_code_bytes: usize,
}

impl AppState {
    /// Creates the state from a backend relay and a quota limiter.
    pub fn new<R: Relay + 'static>(
        relay: R,
        limiter: RateLimiter,
        max_code_bytes: usize,
    ) -> Self {
        Self {
            relay: Arc::new(relay),
            limiter: Arc::new(limiter),
            max_code_bytes,
        }
    }
}

/// Builds the HTTP routes of the relay server.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/assess", post(assess))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn assess(
    State(state): State<AppState>,
    payload: Result<Json<AssessRequest>, JsonRejection>,
) -> Result<Json<AssessResponse>, AppError> {
    let Json(req) =
        payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let submission = validate(&req, state.max_code_bytes)?;

    // Quota is only taken by requests that will reach the backend.
    let remaining = state
        .limiter
        .try_acquire(&submission.student_name)
        .map_err(|e| {
            warn!(student = %submission.student_name, "quota exhausted");
            AppError::RateLimited(e.to_string())
        })?;
    info!(
        student = %submission.student_name,
        turns = req.messages.len(),
        remaining,
        "relaying assessment request"
    );

    match state.relay.send(&submission, &req.messages).await {
        Ok(response) => Ok(Json(AssessResponse { response })),
        Err(err) => {
            error!(student = %submission.student_name, "backend failed: {err}");
            Err(AppError::from(err))
        }
    }
}

fn validate(
    req: &AssessRequest,
    max_code_bytes: usize,
) -> Result<Submission, AppError> {
    let student_name = req.student_name.trim();
    if student_name.is_empty() {
        return Err(AppError::BadRequest(
            "student_name must not be empty".to_owned(),
        ));
    }
    let language: SourceLanguage = req.language.parse().map_err(|_| {
        AppError::BadRequest(format!("Unsupported language: {}", req.language))
    })?;
    if req.code.len() > max_code_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "Code is {} bytes, the limit is {max_code_bytes}",
            req.code.len()
        )));
    }
    match req.messages.last() {
        None => {
            return Err(AppError::BadRequest(
                "messages must not be empty".to_owned(),
            ));
        }
        Some(turn) if turn.role != Speaker::Student => {
            return Err(AppError::BadRequest(
                "the last message must come from the student".to_owned(),
            ));
        }
        Some(_) => {}
    }

    Ok(Submission {
        student_name: student_name.to_owned(),
        code_path: PathBuf::new(),
        source_code: req.code.clone(),
        language,
    })
}

enum AppError {
    BadRequest(String),
    PayloadTooLarge(String),
    RateLimited(String),
    BadGateway(String),
}

impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        Self::BadGateway(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, msg)
            }
            AppError::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        (status, Json(ErrorBody::new(message))).into_response()
    }
}
