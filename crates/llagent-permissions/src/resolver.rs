//! ASK drivers.
//!
//! [`AskResolver`] is the seam between the agent loop and whoever answers a
//! permission prompt. [`TtyResolver`] blocks on a single raw keystroke at
//! the terminal; the API driver lives in the runtime crate on top of
//! [`crate::AsyncPermissionEngine`].

use std::io::Write;

use async_trait::async_trait;
use crossterm::event::{Event, KeyCode, KeyEvent};
use tracing::warn;

use crate::policy::SharedPolicy;
use crate::types::{PermissionRequest, PermissionResponse, PermissionScope, PermissionState};

/// Answers an ASK decision for one request.
#[async_trait]
pub trait AskResolver: Send + Sync {
    /// Resolve the request to a user decision.
    async fn resolve(&self, request: &PermissionRequest) -> PermissionResponse;
}

/// Apply a session-scoped response to the shared policy.
pub fn apply_session_scope(
    policy: &SharedPolicy,
    request: &PermissionRequest,
    response: PermissionResponse,
) {
    if response.scope() != PermissionScope::Session {
        return;
    }
    let state = if response.is_allowed() {
        PermissionState::AllowSession
    } else {
        PermissionState::DenySession
    };
    policy.lock().set_session_override(request.session_key(), state);
}

// ─────────────────────────────────────────────────────────────────────────────
// TTY driver
// ─────────────────────────────────────────────────────────────────────────────

const PROMPT_WIDTH: usize = 60;

/// Render the boxed ASCII permission prompt.
#[must_use]
pub fn render_prompt(request: &PermissionRequest) -> String {
    let mut out = String::from("\n");

    let mut header = format!("+-- PERMISSION: {} ", request.tool_name);
    while header.len() < PROMPT_WIDTH - 1 {
        header.push('-');
    }
    header.push('+');
    out.push_str(&header);
    out.push('\n');

    if !request.details.is_empty() {
        out.push_str(&format!("| {}\n", request.details));
    }
    if !request.description.is_empty() {
        out.push_str(&format!("| {}\n", request.description));
    }
    if request.is_dangerous {
        out.push_str("| WARNING: Potentially dangerous operation\n");
    }

    let mut footer = String::from("+");
    while footer.len() < PROMPT_WIDTH - 1 {
        footer.push('-');
    }
    footer.push('+');
    out.push_str(&footer);
    out.push('\n');

    out.push_str("| [y]es  [n]o  [a]lways  [d]eny always: ");
    out
}

/// Map a keystroke to a decision. Anything unrecognized denies once.
#[must_use]
pub fn response_for_key(key: char) -> PermissionResponse {
    match key {
        'y' | 'Y' => PermissionResponse::AllowOnce,
        'a' | 'A' => PermissionResponse::AllowAlways,
        'd' | 'D' => PermissionResponse::DenyAlways,
        _ => PermissionResponse::DenyOnce,
    }
}

/// Blocking terminal prompt reading one unbuffered keystroke.
pub struct TtyResolver {
    policy: SharedPolicy,
}

impl TtyResolver {
    /// Create a resolver applying session answers to `policy`.
    #[must_use]
    pub fn new(policy: SharedPolicy) -> Self {
        Self { policy }
    }

    fn prompt_blocking(request: &PermissionRequest) -> PermissionResponse {
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "{}", render_prompt(request));
        let _ = stdout.flush();

        let key = read_single_key().unwrap_or('n');
        let _ = writeln!(stdout, "{key}");

        response_for_key(key)
    }
}

fn read_single_key() -> Option<char> {
    if crossterm::terminal::enable_raw_mode().is_err() {
        return None;
    }
    let key = loop {
        match crossterm::event::read() {
            Ok(Event::Key(KeyEvent { code, .. })) => match code {
                KeyCode::Char(c) => break Some(c),
                KeyCode::Esc | KeyCode::Enter => break Some('n'),
                _ => continue,
            },
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "failed to read permission keystroke");
                break None;
            }
        }
    };
    let _ = crossterm::terminal::disable_raw_mode();
    key
}

#[async_trait]
impl AskResolver for TtyResolver {
    async fn resolve(&self, request: &PermissionRequest) -> PermissionResponse {
        let req = request.clone();
        let response = tokio::task::spawn_blocking(move || Self::prompt_blocking(&req))
            .await
            .unwrap_or(PermissionResponse::DenyOnce);
        apply_session_scope(&self.policy, request, response);
        response
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
