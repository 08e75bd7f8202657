//! API-mode ASK driver.
//!
//! Enqueues the request on the async permission engine, surfaces it as a
//! `PERMISSION_REQUIRED` event, and parks until some client answers through
//! the HTTP surface. An unanswered request denies once after the approval
//! deadline; the pending entry is cancelled so the loop proceeds
//! deterministically.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use llagent_core::AgentEvent;
use llagent_permissions::{
    AskResolver, AsyncPermissionEngine, PermissionRequest, PermissionResponse, PermissionScope,
};

use crate::emitter::EventEmitter;

const DEFAULT_APPROVAL_TIMEOUT: Duration = Duration::from_secs(300);

/// Resolver backed by the async permission engine.
pub struct ApiResolver {
    engine: Arc<AsyncPermissionEngine>,
    emitter: Arc<EventEmitter>,
    timeout: Duration,
}

impl ApiResolver {
    /// Resolver with the default 300 s approval deadline.
    #[must_use]
    pub fn new(engine: Arc<AsyncPermissionEngine>, emitter: Arc<EventEmitter>) -> Self {
        Self {
            engine,
            emitter,
            timeout: DEFAULT_APPROVAL_TIMEOUT,
        }
    }

    /// Override the approval deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl AskResolver for ApiResolver {
    async fn resolve(&self, request: &PermissionRequest) -> PermissionResponse {
        let request_id = self.engine.request_permission(request.clone());

        self.emitter.emit(AgentEvent::PermissionRequired {
            request_id: request_id.clone(),
            tool: request.tool_name.clone(),
            details: request.details.clone(),
            dangerous: request.is_dangerous,
        });

        let resolved = self.engine.wait_for_response(&request_id, self.timeout).await;

        let response = match resolved {
            Some(r) => match (r.allowed, r.scope) {
                (true, PermissionScope::Once) => PermissionResponse::AllowOnce,
                (true, PermissionScope::Session) => PermissionResponse::AllowAlways,
                (false, PermissionScope::Once) => PermissionResponse::DenyOnce,
                (false, PermissionScope::Session) => PermissionResponse::DenyAlways,
            },
            None => {
                debug!(request_id, "permission wait expired; denying once");
                let _ = self.engine.cancel(&request_id);
                PermissionResponse::DenyOnce
            }
        };

        self.emitter.emit(AgentEvent::PermissionResolved {
            request_id,
            allowed: response.is_allowed(),
        });

        response
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use llagent_permissions::{PermissionType, PolicyEngine};

    fn setup() -> (Arc<AsyncPermissionEngine>, Arc<EventEmitter>) {
        let policy = PolicyEngine::new("/project", false).into_shared();
        (
            Arc::new(AsyncPermissionEngine::new(policy)),
            Arc::new(EventEmitter::new()),
        )
    }

    fn request() -> PermissionRequest {
        PermissionRequest::new(PermissionType::Bash, "bash", "cargo test")
    }

    #[tokio::test]
    async fn resolve_emits_required_then_resolved() {
        let (engine, emitter) = setup();
        let resolver = ApiResolver::new(engine.clone(), emitter.clone());
        let mut rx = emitter.subscribe();

        let responder = {
            let engine = engine.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                let pending = engine.pending();
                assert_eq!(pending.len(), 1);
                assert!(engine.respond(&pending[0].id, true, PermissionScope::Once));
            })
        };

        let response = resolver.resolve(&request()).await;
        responder.await.unwrap();
        assert_eq!(response, PermissionResponse::AllowOnce);

        match rx.recv().await.unwrap() {
            AgentEvent::PermissionRequired { tool, dangerous, .. } => {
                assert_eq!(tool, "bash");
                assert!(!dangerous);
            }
            other => panic!("expected PermissionRequired, got {other:?}"),
        }
        match rx.recv().await.unwrap() {
            AgentEvent::PermissionResolved { allowed, .. } => assert!(allowed),
            other => panic!("expected PermissionResolved, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn session_deny_maps_to_deny_always() {
        let (engine, emitter) = setup();
        let resolver = ApiResolver::new(engine.clone(), emitter);

        let responder = {
            let engine = engine.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                let pending = engine.pending();
                assert!(engine.respond(&pending[0].id, false, PermissionScope::Session));
            })
        };

        let response = resolver.resolve(&request()).await;
        responder.await.unwrap();
        assert_eq!(response, PermissionResponse::DenyAlways);
    }

    #[tokio::test]
    async fn timeout_denies_once_and_clears_pending() {
        let (engine, emitter) = setup();
        let resolver =
            ApiResolver::new(engine.clone(), emitter).with_timeout(Duration::from_millis(30));

        let response = resolver.resolve(&request()).await;
        assert_eq!(response, PermissionResponse::DenyOnce);
        assert!(engine.pending().is_empty());
    }
}
