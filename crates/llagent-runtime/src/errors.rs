//! Runtime error types.

use llagent_llm::BackendError;

/// Errors surfaced by the runtime's session layer.
///
/// The agent loop itself never returns `Err`: model failures become
/// `AGENT_ERROR` stop reasons and tool failures become tool results.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Model backend failure.
    #[error("model backend error: {0}")]
    Backend(#[from] BackendError),

    /// Unknown session id.
    #[error("session not found: {0}")]
    SessionNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_not_found_display() {
        let err = RuntimeError::SessionNotFound("sess_00000001".into());
        assert_eq!(err.to_string(), "session not found: sess_00000001");
    }
}
