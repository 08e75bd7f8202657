//! Asynchronous permission driver for API clients.
//!
//! An ASK becomes a pending request with a fresh `perm_…` id; some other
//! actor (an HTTP route) answers it via [`AsyncPermissionEngine::respond`],
//! and the waiting loop picks the response up in
//! [`AsyncPermissionEngine::wait_for_response`]. A response is consumed
//! exactly once. Cancelling removes the pending entry; a timed-out wait
//! leaves it intact so the caller may retry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use crate::policy::SharedPolicy;
use crate::types::{PermissionRequest, PermissionScope, PermissionState};

/// A request waiting for a decision.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingPermission {
    /// Request id (`perm_` + 8 hex digits).
    pub id: String,
    /// The gated request.
    pub request: PermissionRequest,
}

/// A consumed decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPermission {
    /// Request id this answers.
    pub request_id: String,
    /// Whether the request was allowed.
    pub allowed: bool,
    /// Once or session scope.
    pub scope: PermissionScope,
}

/// Callback invoked (outside the lock) when a request is enqueued.
pub type RequestCallback = Box<dyn Fn(&PendingPermission) + Send + Sync>;

#[derive(Default)]
struct Inner {
    pending: Vec<PendingPermission>,
    responses: HashMap<String, ResolvedPermission>,
}

/// Pending-requests queue over a shared policy core.
pub struct AsyncPermissionEngine {
    policy: SharedPolicy,
    inner: Mutex<Inner>,
    counter: AtomicU64,
    version: watch::Sender<u64>,
    callback: Mutex<Option<RequestCallback>>,
}

impl AsyncPermissionEngine {
    /// Create an engine over `policy`.
    #[must_use]
    pub fn new(policy: SharedPolicy) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            policy,
            inner: Mutex::new(Inner::default()),
            counter: AtomicU64::new(1),
            version,
            callback: Mutex::new(None),
        }
    }

    /// The shared policy core.
    #[must_use]
    pub fn policy(&self) -> &SharedPolicy {
        &self.policy
    }

    /// Install the enqueue notification callback.
    pub fn set_callback(&self, callback: RequestCallback) {
        *self.callback.lock() = Some(callback);
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }

    fn next_id(&self) -> String {
        format!("perm_{:08x}", self.counter.fetch_add(1, Ordering::Relaxed))
    }

    /// Enqueue a request; returns its id. The callback (if any) fires
    /// outside the lock.
    pub fn request_permission(&self, request: PermissionRequest) -> String {
        let pending = PendingPermission {
            id: self.next_id(),
            request,
        };
        let id = pending.id.clone();
        {
            let mut inner = self.inner.lock();
            inner.pending.push(pending.clone());
        }
        self.bump();
        debug!(request_id = %id, tool = %pending.request.tool_name, "permission requested");

        if let Some(callback) = self.callback.lock().as_ref() {
            callback(&pending);
        }
        id
    }

    /// Publish a decision for a pending request. Session-scoped decisions
    /// are written into the shared policy. Returns false when the id is
    /// unknown or already answered.
    pub fn respond(&self, request_id: &str, allowed: bool, scope: PermissionScope) -> bool {
        let request = {
            let mut inner = self.inner.lock();
            let Some(pos) = inner.pending.iter().position(|p| p.id == request_id) else {
                return false;
            };
            let pending = inner.pending.remove(pos);
            let _ = inner.responses.insert(
                request_id.to_owned(),
                ResolvedPermission {
                    request_id: request_id.to_owned(),
                    allowed,
                    scope,
                },
            );
            pending.request
        };

        if scope == PermissionScope::Session {
            let state = if allowed {
                PermissionState::AllowSession
            } else {
                PermissionState::DenySession
            };
            self.policy.lock().set_session_override(request.session_key(), state);
        }

        self.bump();
        debug!(request_id, allowed, ?scope, "permission resolved");
        true
    }

    /// Wait until the request is answered (consumes the response),
    /// cancelled (`None`), or the timeout elapses (`None`, request left
    /// pending).
    pub async fn wait_for_response(
        &self,
        request_id: &str,
        timeout: Duration,
    ) -> Option<ResolvedPermission> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut rx = self.version.subscribe();

        loop {
            // Snapshot the version before inspecting state so a concurrent
            // respond between the check and the wait still wakes us.
            let _ = rx.borrow_and_update();
            {
                let mut inner = self.inner.lock();
                if let Some(response) = inner.responses.remove(request_id) {
                    return Some(response);
                }
                if !inner.pending.iter().any(|p| p.id == request_id) {
                    return None; // cancelled or never existed
                }
            }
            match tokio::time::timeout_at(deadline, rx.changed()).await {
                Ok(Ok(())) => {}
                _ => return None, // deadline elapsed; request stays pending
            }
        }
    }

    /// Snapshot of pending requests, in enqueue order.
    #[must_use]
    pub fn pending(&self) -> Vec<PendingPermission> {
        self.inner.lock().pending.clone()
    }

    /// Whether a request is still pending.
    #[must_use]
    pub fn is_pending(&self, request_id: &str) -> bool {
        self.inner.lock().pending.iter().any(|p| p.id == request_id)
    }

    /// Remove a pending request without answering it.
    pub fn cancel(&self, request_id: &str) -> bool {
        let removed = {
            let mut inner = self.inner.lock();
            let before = inner.pending.len();
            inner.pending.retain(|p| p.id != request_id);
            inner.pending.len() != before
        };
        if removed {
            self.bump();
        }
        removed
    }

    /// Drop pending requests, unconsumed responses, and the policy's
    /// session state.
    pub fn clear_session(&self) {
        {
            let mut inner = self.inner.lock();
            inner.pending.clear();
            inner.responses.clear();
        }
        self.policy.lock().clear_session();
        self.bump();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyEngine;
    use crate::types::PermissionType;
    use std::sync::Arc;

    fn engine() -> AsyncPermissionEngine {
        AsyncPermissionEngine::new(PolicyEngine::new("/project", false).into_shared())
    }

    fn request() -> PermissionRequest {
        PermissionRequest::new(PermissionType::Bash, "bash", "cargo build")
    }

    #[test]
    fn ids_are_hex_counter_formatted() {
        let engine = engine();
        let id1 = engine.request_permission(request());
        let id2 = engine.request_permission(request());
        assert_eq!(id1, "perm_00000001");
        assert_eq!(id2, "perm_00000002");
    }

    #[test]
    fn respond_unknown_id_is_false() {
        let engine = engine();
        assert!(!engine.respond("perm_ffffffff", true, PermissionScope::Once));
    }

    #[test]
    fn respond_twice_is_false() {
        let engine = engine();
        let id = engine.request_permission(request());
        assert!(engine.respond(&id, true, PermissionScope::Once));
        assert!(!engine.respond(&id, true, PermissionScope::Once));
    }

    #[tokio::test]
    async fn wait_consumes_response_exactly_once() {
        let engine = engine();
        let id = engine.request_permission(request());
        assert!(engine.respond(&id, true, PermissionScope::Once));

        let first = engine
            .wait_for_response(&id, Duration::from_millis(100))
            .await;
        assert_eq!(
            first,
            Some(ResolvedPermission {
                request_id: id.clone(),
                allowed: true,
                scope: PermissionScope::Once,
            })
        );

        // Consumed: a second wait finds neither response nor pending entry.
        let second = engine
            .wait_for_response(&id, Duration::from_millis(20))
            .await;
        assert_eq!(second, None);
    }

    #[tokio::test]
    async fn wait_wakes_on_concurrent_respond() {
        let engine = Arc::new(engine());
        let id = engine.request_permission(request());

        let waiter = {
            let engine = engine.clone();
            let id = id.clone();
            tokio::spawn(async move {
                engine
                    .wait_for_response(&id, Duration::from_secs(5))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(engine.respond(&id, false, PermissionScope::Once));

        let resolved = waiter.await.unwrap().expect("response");
        assert!(!resolved.allowed);
    }

    #[tokio::test]
    async fn cancel_unblocks_waiter_with_none() {
        let engine = Arc::new(engine());
        let id = engine.request_permission(request());

        let waiter = {
            let engine = engine.clone();
            let id = id.clone();
            tokio::spawn(async move {
                engine
                    .wait_for_response(&id, Duration::from_secs(5))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(engine.cancel(&id));
        assert_eq!(waiter.await.unwrap(), None);
    }

    #[tokio::test]
    async fn timeout_leaves_request_pending() {
        let engine = engine();
        let id = engine.request_permission(request());
        let result = engine
            .wait_for_response(&id, Duration::from_millis(30))
            .await;
        assert_eq!(result, None);
        assert!(engine.is_pending(&id));
    }

    #[test]
    fn session_scope_response_writes_policy_override() {
        let engine = engine();
        let req = request();
        let id = engine.request_permission(req.clone());
        assert!(engine.respond(&id, true, PermissionScope::Session));
        assert_eq!(
            engine.policy().lock().check_permission(&req),
            PermissionState::AllowSession
        );
    }

    #[test]
    fn pending_lists_in_enqueue_order() {
        let engine = engine();
        let id1 = engine.request_permission(request());
        let id2 = engine.request_permission(PermissionRequest::new(
            PermissionType::FileWrite,
            "write",
            "a.txt",
        ));
        let pending = engine.pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, id1);
        assert_eq!(pending[1].id, id2);
    }

    #[test]
    fn callback_fires_on_enqueue() {
        let engine = engine();
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        engine.set_callback(Box::new(move |pending| {
            seen_clone.lock().push(pending.id.clone());
        }));
        let id = engine.request_permission(request());
        assert_eq!(*seen.lock(), vec![id]);
    }

    #[test]
    fn clear_session_drops_everything() {
        let engine = engine();
        let req = request();
        let id1 = engine.request_permission(req.clone());
        let id2 = engine.request_permission(req.clone());
        assert!(engine.respond(&id1, true, PermissionScope::Session));
        engine.clear_session();
        assert!(!engine.is_pending(&id2));
        assert!(engine.pending().is_empty());
        // Policy session overrides are gone too.
        assert_eq!(
            engine.policy().lock().check_permission(&req),
            PermissionState::Ask
        );
    }
}
