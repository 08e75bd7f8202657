//! Permission policy engine.
//!
//! The decision core is a pure function over a small amount of state
//! ([`PolicyEngine`]): per-type defaults, session overrides, bash pattern
//! lists, and the recent-call tail used for doom-loop detection. Two drivers
//! satisfy an ASK: a blocking TTY prompt ([`TtyResolver`]) and an
//! asynchronous request/response queue ([`AsyncPermissionEngine`]) for API
//! clients. Both apply session-scoped answers back into the shared policy.

pub mod async_engine;
pub mod paths;
pub mod policy;
pub mod resolver;
pub mod sensitive;
pub mod types;

pub use async_engine::{AsyncPermissionEngine, PendingPermission, ResolvedPermission};
pub use policy::{args_hash, PolicyEngine, SharedPolicy};
pub use resolver::{apply_session_scope, AskResolver, TtyResolver};
pub use sensitive::is_sensitive_file;
pub use types::{
    PermissionRequest, PermissionResponse, PermissionScope, PermissionState, PermissionType,
};
