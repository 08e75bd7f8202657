//! HTTP surface for the llagent runtime.
//!
//! Sessions are created and driven over `/v1/agent/...`; chat responses
//! stream as server-sent events whose event names match the loop's event
//! variants. Permission ASKs park the loop until a client answers through
//! `POST /v1/agent/permission/:id`.

pub mod error;
pub mod routes;

pub use error::AppError;
pub use routes::{router, AppState};

use std::net::SocketAddr;
use std::sync::Arc;

use llagent_runtime::SessionManager;

/// Serve the API until the process exits.
pub async fn serve(addr: SocketAddr, sessions: Arc<SessionManager>) -> std::io::Result<()> {
    let app = router(AppState { sessions });
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "agent API listening");
    axum::serve(listener, app).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use llagent_llm::{
        BackendError, CompletionMessage, CompletionRequest, FinalCompletion, ModelBackend,
        ModelChunk, ModelStream, Timings,
    };
    use llagent_runtime::AgentConfig;
    use llagent_tools::{register_builtin_tools, ToolRegistry};
    use serde_json::Value;
    use tower::ServiceExt;

    struct StaticBackend;

    #[async_trait]
    impl ModelBackend for StaticBackend {
        fn model(&self) -> &str {
            "static"
        }

        async fn stream(&self, _request: &CompletionRequest) -> Result<ModelStream, BackendError> {
            let stream = futures::stream::once(async {
                Ok(ModelChunk::Final(FinalCompletion {
                    message: Some(CompletionMessage {
                        content: "ok".into(),
                        tool_calls: Vec::new(),
                    }),
                    content: "ok".into(),
                    timings: Timings::default(),
                }))
            });
            Ok(Box::pin(stream))
        }
    }

    fn app() -> axum::Router {
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry);
        let sessions = Arc::new(SessionManager::new(
            Arc::new(StaticBackend),
            Arc::new(registry),
            AgentConfig {
                enable_subagents: false,
                enable_skills: false,
                enable_agents_md: false,
                ..Default::default()
            },
        ));
        router(AppState { sessions })
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn create_session_returns_201_with_id() {
        let response = app()
            .oneshot(
                Request::post("/v1/agent/session")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert!(body["session_id"]
            .as_str()
            .unwrap()
            .starts_with("sess_"));
    }

    #[tokio::test]
    async fn create_session_accepts_empty_body() {
        let response = app()
            .oneshot(
                Request::post("/v1/agent/session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn get_unknown_session_is_404_with_error_body() {
        let response = app()
            .oneshot(
                Request::get("/v1/agent/session/sess_ffffffff")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Session not found");
    }

    #[tokio::test]
    async fn session_lifecycle_roundtrip() {
        let app = app();

        let created = app
            .clone()
            .oneshot(
                Request::post("/v1/agent/session")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"yolo": true, "max_iterations": 10}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        let session_id = body_json(created).await["session_id"]
            .as_str()
            .unwrap()
            .to_owned();

        let info = app
            .clone()
            .oneshot(
                Request::get(format!("/v1/agent/session/{session_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(info).await;
        assert_eq!(body["session_id"], session_id.as_str());
        assert_eq!(body["state"], "idle");
        assert_eq!(body["message_count"], 1);

        let deleted = app
            .clone()
            .oneshot(
                Request::delete(format!("/v1/agent/session/{session_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(deleted).await["deleted"], true);
    }

    #[tokio::test]
    async fn chat_without_content_is_400() {
        let app = app();
        let created = app
            .clone()
            .oneshot(
                Request::post("/v1/agent/session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let session_id = body_json(created).await["session_id"]
            .as_str()
            .unwrap()
            .to_owned();

        let response = app
            .oneshot(
                Request::post(format!("/v1/agent/session/{session_id}/chat"))
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Missing 'content' field");
    }

    #[tokio::test]
    async fn chat_streams_sse_until_completed() {
        let app = app();
        let created = app
            .clone()
            .oneshot(
                Request::post("/v1/agent/session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let session_id = body_json(created).await["session_id"]
            .as_str()
            .unwrap()
            .to_owned();

        let response = app
            .oneshot(
                Request::post(format!("/v1/agent/session/{session_id}/chat"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"content": "hello"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/event-stream"));

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("event: iteration_start"));
        assert!(text.contains("event: text_delta") || text.contains("event: completed"));
        assert!(text.contains("event: completed"));
    }

    #[tokio::test]
    async fn tools_listing_includes_builtins() {
        let response = app()
            .oneshot(Request::get("/v1/agent/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        let names: Vec<&str> = body["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        for expected in ["bash", "read", "write", "edit", "glob", "task"] {
            assert!(names.contains(&expected), "{expected} missing");
        }
    }

    #[tokio::test]
    async fn permission_respond_unknown_id_is_404() {
        let response = app()
            .oneshot(
                Request::post("/v1/agent/permission/perm_ffffffff")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"allow": true}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stats_endpoint_reports_counters() {
        let app = app();
        let created = app
            .clone()
            .oneshot(
                Request::post("/v1/agent/session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let session_id = body_json(created).await["session_id"]
            .as_str()
            .unwrap()
            .to_owned();

        let response = app
            .oneshot(
                Request::get(format!("/v1/agent/session/{session_id}/stats"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["input_tokens"], 0);
        assert_eq!(body["output_tokens"], 0);
    }
}
