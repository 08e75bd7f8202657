//! Minimal SSE framing for the llama-server response stream.
//!
//! The endpoint emits `data: {json}\n\n` frames terminated by
//! `data: [DONE]`. Byte chunks from the HTTP body are fed into
//! [`SseLineBuffer`] which yields complete lines regardless of how the
//! transport split them.

/// Incremental line assembler for SSE byte chunks.
///
/// Buffers raw bytes so multi-byte UTF-8 sequences split across transport
/// chunks decode correctly once the line completes.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes; returns the complete lines it closed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            let _ = line.pop();
            if line.last() == Some(&b'\r') {
                let _ = line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }
}

/// Extract the payload of a `data:` line; `None` for comments, blank
/// separators, and other field lines.
#[must_use]
pub fn data_payload(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("data:")?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// The sentinel payload closing an OpenAI-compatible stream.
pub const DONE_SENTINEL: &str = "[DONE]";

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_yields_complete_lines() {
        let mut buf = SseLineBuffer::new();
        let lines = buf.push(b"data: {\"a\":1}\n\ndata: [DONE]\n");
        assert_eq!(lines, vec!["data: {\"a\":1}", "", "data: [DONE]"]);
    }

    #[test]
    fn push_holds_partial_lines() {
        let mut buf = SseLineBuffer::new();
        assert!(buf.push(b"data: {\"par").is_empty());
        let lines = buf.push(b"tial\":true}\n");
        assert_eq!(lines, vec!["data: {\"partial\":true}"]);
    }

    #[test]
    fn push_strips_crlf() {
        let mut buf = SseLineBuffer::new();
        let lines = buf.push(b"data: x\r\n");
        assert_eq!(lines, vec!["data: x"]);
    }

    #[test]
    fn utf8_split_across_chunks_decodes_intact() {
        let mut buf = SseLineBuffer::new();
        let bytes = "data: héllo\n".as_bytes();
        // Split inside the two-byte 'é' sequence.
        let _ = buf.push(&bytes[..7]);
        let lines = buf.push(&bytes[7..]);
        assert_eq!(lines, vec!["data: héllo"]);
    }

    #[test]
    fn data_payload_strips_prefix() {
        assert_eq!(data_payload("data: {\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(data_payload("data:{\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(data_payload(": comment"), None);
        assert_eq!(data_payload("event: foo"), None);
        assert_eq!(data_payload(""), None);
    }

    #[test]
    fn done_sentinel_matches() {
        assert_eq!(data_payload("data: [DONE]"), Some(DONE_SENTINEL));
    }
}
