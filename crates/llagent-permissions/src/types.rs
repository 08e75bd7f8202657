//! Permission request and decision types.

use serde::{Deserialize, Serialize};

/// What kind of operation is being gated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    /// Shell command execution.
    Bash,
    /// Reading a file.
    FileRead,
    /// Creating or overwriting a file.
    FileWrite,
    /// Editing a file in place.
    FileEdit,
    /// Filename globbing.
    Glob,
    /// Operation outside the project root.
    ExternalDir,
}

/// Internal rule output for a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    /// Auto-execute.
    Allow,
    /// Prompt the user.
    Ask,
    /// Block.
    Deny,
    /// User chose "always" for this session.
    AllowSession,
    /// User chose "never" for this session.
    DenySession,
}

/// Whether a decision applies once or for the rest of the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionScope {
    /// Current request only.
    #[default]
    Once,
    /// Until `clear_session`.
    Session,
}

/// A user/client decision on an ASK.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionResponse {
    /// Allow this request.
    AllowOnce,
    /// Deny this request.
    DenyOnce,
    /// Allow and remember for the session.
    AllowAlways,
    /// Deny and remember for the session.
    DenyAlways,
}

impl PermissionResponse {
    /// Whether the request may proceed.
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::AllowOnce | Self::AllowAlways)
    }

    /// The scope of the decision.
    #[must_use]
    pub fn scope(self) -> PermissionScope {
        match self {
            Self::AllowOnce | Self::DenyOnce => PermissionScope::Once,
            Self::AllowAlways | Self::DenyAlways => PermissionScope::Session,
        }
    }
}

/// A permission check for one tool call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PermissionRequest {
    /// Operation category.
    #[serde(rename = "type")]
    pub permission_type: PermissionType,
    /// Tool being gated.
    pub tool_name: String,
    /// Command, file path, or raw arguments.
    pub details: String,
    /// Whether a dangerous pattern matched.
    #[serde(default)]
    pub is_dangerous: bool,
    /// Extra context shown to the user (doom loop, external dir).
    #[serde(default)]
    pub description: String,
}

impl PermissionRequest {
    /// Build a request with no danger flag or description.
    #[must_use]
    pub fn new(
        permission_type: PermissionType,
        tool_name: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            permission_type,
            tool_name: tool_name.into(),
            details: details.into(),
            is_dangerous: false,
            description: String::new(),
        }
    }

    /// Session-override key: `tool_name + ":" + details`.
    #[must_use]
    pub fn session_key(&self) -> String {
        format!("{}:{}", self.tool_name, self.details)
    }
}
