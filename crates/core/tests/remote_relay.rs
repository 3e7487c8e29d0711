use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use viva_core::wire::{AssessRequest, AssessResponse, ErrorBody};
use viva_core::{Relay, RelayError, RemoteRelay, SourceLanguage, Submission, Turn};

async fn spawn_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn submission() -> Submission {
    Submission {
        student_name: "Ada Lovelace".to_owned(),
        code_path: "hello.c".into(),
        source_code: "int main(void) { return 0; }".to_owned(),
        language: SourceLanguage::C,
    }
}

fn history() -> Vec<Turn> {
    vec![Turn::student(
        "Hi! My name is Ada Lovelace. I'm ready to discuss my code.",
    )]
}

#[tokio::test]
async fn test_successful_round_trip() {
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/assess",
            post(|Json(req): Json<AssessRequest>| async move {
                assert_eq!(req.student_name, "Ada Lovelace");
                assert_eq!(req.language, "c");
                assert_eq!(req.messages.len(), 1);
                Json(AssessResponse {
                    response: "Why does main return 0?".to_owned(),
                })
            }),
        );
    // A trailing slash must not produce `//assess`.
    let relay = RemoteRelay::new(format!("{}/", spawn_server(app).await));

    relay.check_liveness().await.unwrap();
    let reply = relay.send(&submission(), &history()).await.unwrap();
    assert_eq!(reply, "Why does main return 0?");
}

#[tokio::test]
async fn test_rate_limited() {
    let app = Router::new().route(
        "/assess",
        post(|| async {
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorBody::new("Rate limit exceeded: 100 requests per hour")),
            )
        }),
    );
    let relay = RemoteRelay::new(spawn_server(app).await);
    let err = relay.send(&submission(), &history()).await.unwrap_err();
    assert_eq!(
        err,
        RelayError::RateLimited("Rate limit exceeded: 100 requests per hour".to_owned())
    );
    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn test_server_errors() {
    let app = Router::new()
        .route(
            "/assess",
            post(|| async {
                (
                    StatusCode::BAD_GATEWAY,
                    Json(ErrorBody::new("Upstream model failed")),
                )
            }),
        )
        .route(
            "/v2/assess",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "<html>down</html>") }),
        );
    let base_url = spawn_server(app).await;

    let relay = RemoteRelay::new(base_url.clone());
    let err = relay.send(&submission(), &history()).await.unwrap_err();
    assert_eq!(err, RelayError::Server("Upstream model failed".to_owned()));

    let relay = RemoteRelay::new(format!("{base_url}/v2"));
    let err = relay.send(&submission(), &history()).await.unwrap_err();
    let RelayError::Server(message) = err else {
        panic!("unexpected error: {err:?}");
    };
    assert!(message.contains("503"), "{message}");
}

#[tokio::test]
async fn test_unhealthy_server() {
    let app = Router::new().route(
        "/health",
        get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let relay = RemoteRelay::new(spawn_server(app).await);
    assert!(relay.check_liveness().await.is_err());
}

#[tokio::test]
async fn test_slow_health_check() {
    let app = Router::new().route(
        "/health",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "ok"
        }),
    );
    let relay = RemoteRelay::new(spawn_server(app).await)
        .with_health_timeout(Duration::from_millis(100));
    assert_eq!(relay.check_liveness().await, Err(RelayError::Timeout));
}

#[tokio::test]
async fn test_unreachable_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let relay = RemoteRelay::new(format!("http://{addr}"));
    assert!(matches!(
        relay.check_liveness().await,
        Err(RelayError::Connection(_))
    ));
    assert!(matches!(
        relay.send(&submission(), &history()).await,
        Err(RelayError::Connection(_))
    ));
}

#[tokio::test]
async fn test_timeout() {
    let app = Router::new().route(
        "/assess",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(AssessResponse {
                response: "too late".to_owned(),
            })
        }),
    );
    let relay = RemoteRelay::new(spawn_server(app).await)
        .with_request_timeout(Duration::from_millis(100));
    let err = relay.send(&submission(), &history()).await.unwrap_err();
    assert_eq!(err, RelayError::Timeout);
}
