//! Route handlers.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use llagent_permissions::PermissionScope;
use llagent_runtime::{SessionConfig, SessionManager};

use crate::error::AppError;

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// The session manager (owns the registry and backend).
    pub sessions: Arc<SessionManager>,
}

/// Build the full route table.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/agent/health", get(health))
        .route("/v1/agent/session", post(create_session))
        .route("/v1/agent/sessions", get(list_sessions))
        .route(
            "/v1/agent/session/:id",
            get(get_session).delete(delete_session),
        )
        .route("/v1/agent/session/:id/chat", post(chat))
        .route("/v1/agent/session/:id/messages", get(get_messages))
        .route("/v1/agent/session/:id/permissions", get(get_permissions))
        .route("/v1/agent/session/:id/stats", get(get_stats))
        .route("/v1/agent/permission/:id", post(respond_permission))
        .route("/v1/agent/tools", get(get_tools))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

#[derive(Debug, Default, Deserialize)]
struct CreateSessionRequest {
    tools: Option<Vec<String>>,
    yolo: Option<bool>,
    max_iterations: Option<u32>,
    working_dir: Option<String>,
    enable_skills: Option<bool>,
    skills_paths: Option<Vec<String>>,
    enable_agents_md: Option<bool>,
}

async fn create_session(
    State(state): State<AppState>,
    body: Option<Json<CreateSessionRequest>>,
) -> impl IntoResponse {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let config = SessionConfig {
        allowed_tools: request
            .tools
            .map(|tools| tools.into_iter().collect::<BTreeSet<String>>()),
        yolo: request.yolo,
        max_iterations: request.max_iterations,
        working_dir: request.working_dir.map(PathBuf::from),
        enable_skills: request.enable_skills,
        skills_paths: request
            .skills_paths
            .unwrap_or_default()
            .into_iter()
            .map(PathBuf::from)
            .collect(),
        enable_agents_md: request.enable_agents_md,
    };
    let session_id = state.sessions.create_session(&config);
    (StatusCode::CREATED, Json(json!({"session_id": session_id})))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.session(&id)?;
    Ok(Json(json!({
        "session_id": session.id(),
        "state": session.state(),
        "message_count": session.message_count(),
        "stats": session.stats(),
    })))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if state.sessions.delete_session(&id) {
        Ok(Json(json!({"deleted": true})))
    } else {
        Err(AppError::not_found("Session not found"))
    }
}

async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let sessions: Vec<_> = state
        .sessions
        .list_sessions()
        .into_iter()
        .map(|info| {
            json!({
                "session_id": info.session_id,
                "state": info.state,
                "message_count": info.message_count,
            })
        })
        .collect();
    Json(json!({"sessions": sessions}))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    content: Option<String>,
}

async fn chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ChatRequest>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let session = state.sessions.session(&id)?;

    let content = body
        .and_then(|Json(r)| r.content)
        .ok_or_else(|| AppError::bad_request("Missing 'content' field"))?;

    // Subscribe before spawning the worker so no event is missed.
    let rx = session.subscribe();
    session.send_message(content).await;
    debug!(session_id = %id, "chat stream opened");

    let stream = BroadcastStream::new(rx)
        .filter_map(|item| futures::future::ready(item.ok()))
        .scan(false, |finished, event| {
            if *finished {
                return futures::future::ready(None);
            }
            *finished = event.is_terminal();
            futures::future::ready(Some(event))
        })
        .map(|event| {
            let sse = Event::default().event(event.name());
            Ok(sse
                .json_data(&event)
                .unwrap_or_else(|_| Event::default().data("{}")))
        });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn get_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.session(&id)?;
    Ok(Json(json!({"messages": session.messages()})))
}

async fn get_permissions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.session(&id)?;
    let permissions: Vec<_> = session
        .pending_permissions()
        .into_iter()
        .map(|pending| {
            json!({
                "request_id": pending.id,
                "tool": pending.request.tool_name,
                "details": pending.request.details,
                "dangerous": pending.request.is_dangerous,
            })
        })
        .collect();
    Ok(Json(json!({"permissions": permissions})))
}

#[derive(Debug, Deserialize)]
struct PermissionRespondRequest {
    allow: Option<bool>,
    scope: Option<String>,
}

async fn respond_permission(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<PermissionRespondRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let request = body
        .map(|Json(r)| r)
        .ok_or_else(|| AppError::bad_request("Invalid JSON body"))?;
    let allow = request
        .allow
        .ok_or_else(|| AppError::bad_request("Missing 'allow' field"))?;
    let scope = match request.scope.as_deref() {
        Some("session") => PermissionScope::Session,
        _ => PermissionScope::Once,
    };

    if state.sessions.respond_permission(&id, allow, scope) {
        Ok(Json(json!({"success": true})))
    } else {
        Err(AppError::not_found("Permission request not found"))
    }
}

async fn get_tools(State(state): State<AppState>) -> impl IntoResponse {
    let tools: Vec<_> = state
        .sessions
        .registry()
        .schemas()
        .into_iter()
        .map(|schema| {
            json!({
                "name": schema.name,
                "description": schema.description,
                "parameters": schema.parameters,
            })
        })
        .collect();
    Json(json!({"tools": tools}))
}

async fn get_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.sessions.session(&id)?;
    let stats = session.stats();
    Ok(Json(json!({
        "input_tokens": stats.input_tokens,
        "output_tokens": stats.output_tokens,
        "cached_tokens": stats.cached_tokens,
        "prompt_ms": stats.prompt_ms,
        "predicted_ms": stats.predicted_ms,
    })))
}
