//! HTTP transports.
//!
//! - `POST /rpc`: one JSON-RPC message in, one JSON response out (always 200)
//! - `POST /rpc/stream`: same dispatch, answered as a single SSE `message` event
//! - `GET /health`: liveness probe

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, Stream};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::protocol::{JsonRpcResponse, RequestId};
use crate::server::{Dispatcher, Outcome};

pub const RPC_PATH: &str = "/rpc";
pub const STREAM_PATH: &str = "/rpc/stream";
pub const HEALTH_PATH: &str = "/health";

/// Routes for both HTTP adapters plus the health probe.
pub fn router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .route(RPC_PATH, post(rpc))
        .route(STREAM_PATH, post(rpc_stream))
        .route(HEALTH_PATH, get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(dispatcher)
}

/// Bind `addr` and serve until the listener fails.
pub async fn serve(dispatcher: Dispatcher, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Serving MCP over HTTP");
    axum::serve(listener, router(dispatcher)).await
}

async fn rpc(State(dispatcher): State<Dispatcher>, body: Bytes) -> Json<JsonRpcResponse> {
    Json(reply(&dispatcher, &body).await)
}

async fn rpc_stream(
    State(dispatcher): State<Dispatcher>,
    body: Bytes,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let response = reply(&dispatcher, &body).await;
    let event = match Event::default().event("message").json_data(&response) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode SSE event");
            Event::default().event("error").data(e.to_string())
        }
    };
    Sse::new(stream::iter([Ok(event)]))
}

async fn health() -> &'static str {
    "ok"
}

/// HTTP always answers; a suppressed notification gets an empty result.
async fn reply(dispatcher: &Dispatcher, body: &[u8]) -> JsonRpcResponse {
    match dispatcher.handle_raw(body).await {
        Outcome::Respond(response) => response,
        Outcome::Suppressed { id } => {
            JsonRpcResponse::success(id.unwrap_or(RequestId::Null), json!({}))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{dispatcher, MockTracker};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use redmine_core::Ticket;
    use serde_json::Value;
    use tower::ServiceExt as _;

    async fn post_body(app: Router, path: &str, body: &str) -> (StatusCode, String, String) {
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(path)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_rpc_tools_list() {
        let app = router(dispatcher(MockTracker::new()));
        let (status, content_type, body) = post_body(
            app,
            RPC_PATH,
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("application/json"));
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["result"]["tools"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_rpc_errors_are_http_200() {
        let app = router(dispatcher(MockTracker::new()));
        let (status, _, body) = post_body(app, RPC_PATH, "{broken").await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["id"], Value::Null);
        assert_eq!(json["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_rpc_notification_gets_empty_result() {
        let app = router(dispatcher(MockTracker::new()));
        let (status, _, body) = post_body(
            app.clone(),
            RPC_PATH,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json, serde_json::json!({"jsonrpc": "2.0", "id": null, "result": {}}));

        let (_, _, body) = post_body(
            app,
            RPC_PATH,
            r#"{"jsonrpc":"2.0","id":"n1","method":"notifications/initialized"}"#,
        )
        .await;
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["id"], "n1");
        assert_eq!(json["result"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_stream_emits_single_message_event() {
        let mut tracker = MockTracker::new();
        tracker.expect_get_ticket().times(1).returning(|_| {
            Ok(Ticket {
                id: 5,
                subject: "Streamed".to_string(),
                ..Default::default()
            })
        });

        let app = router(dispatcher(tracker));
        let (status, content_type, body) = post_body(
            app,
            STREAM_PATH,
            r#"{"jsonrpc":"2.0","id":"s1","method":"tools/call","params":{"name":"get_redmine_ticket","arguments":{"ticket_id":5}}}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/event-stream"));
        assert_eq!(body.matches("event: message").count(), 1);

        let data = body
            .lines()
            .find_map(|line| line.strip_prefix("data: "))
            .unwrap();
        let json: Value = serde_json::from_str(data).unwrap();
        assert_eq!(json["id"], "s1");
        assert!(json["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Ticket #5: Streamed"));
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(dispatcher(MockTracker::new()));
        let resp = app
            .oneshot(
                Request::builder()
                    .uri(HEALTH_PATH)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"ok");
    }
}
