//! Output buffering for background subagents.
//!
//! A background task accumulates display segments in its own buffer; on
//! completion the buffer is flushed atomically under a process-wide console
//! lock, with a shortened task id prefixed to every line so nested outputs
//! cannot interleave. Synchronous subagents skip buffering and write
//! directly under the same lock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Display style of one buffered segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayStyle {
    /// Plain output.
    Normal,
    /// Informational chrome (tool lines, timings).
    Info,
    /// Dimmed reasoning-style text.
    Reasoning,
    /// Errors.
    Error,
}

/// One buffered `(style, text)` segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    /// How the segment should be styled when rendered.
    pub style: DisplayStyle,
    /// The text.
    pub text: String,
}

/// Shorten `task-abc12345` to `abc1` for line prefixes.
#[must_use]
pub fn short_task_id(task_id: &str) -> String {
    match task_id.strip_prefix("task-") {
        Some(rest) if rest.len() >= 4 => rest[..4].to_owned(),
        _ => task_id.to_owned(),
    }
}

/// Per-task display buffer.
#[derive(Debug)]
pub struct OutputBuffer {
    task_id: String,
    segments: Mutex<Vec<Segment>>,
}

impl OutputBuffer {
    fn new(task_id: &str) -> Self {
        Self {
            task_id: task_id.to_owned(),
            segments: Mutex::new(Vec::new()),
        }
    }

    /// Append a segment.
    pub fn write(&self, style: DisplayStyle, text: impl Into<String>) {
        self.segments.lock().push(Segment {
            style,
            text: text.into(),
        });
    }

    /// Whether nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.lock().is_empty()
    }

    /// Drop buffered segments.
    pub fn clear(&self) {
        self.segments.lock().clear();
    }

    /// Drain the buffer into a single string, optionally prefixing each
    /// line with the shortened task id.
    #[must_use]
    pub fn drain(&self, with_task_prefix: bool) -> String {
        let segments = std::mem::take(&mut *self.segments.lock());
        if segments.is_empty() {
            return String::new();
        }

        let prefix = if with_task_prefix {
            format!("[{}] ", short_task_id(&self.task_id))
        } else {
            String::new()
        };

        let mut out = String::new();
        let mut at_line_start = true;
        for segment in &segments {
            for c in segment.text.chars() {
                if at_line_start && !prefix.is_empty() {
                    out.push_str(&prefix);
                }
                at_line_start = false;
                out.push(c);
                if c == '\n' {
                    at_line_start = true;
                }
            }
        }
        out
    }
}

/// Table of per-task buffers plus the process-wide console lock.
#[derive(Debug, Default)]
pub struct OutputManager {
    buffers: Mutex<HashMap<String, Arc<OutputBuffer>>>,
    console: Mutex<()>,
}

impl OutputManager {
    /// Empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) the buffer for a task id.
    pub fn create_buffer(&self, task_id: &str) -> Arc<OutputBuffer> {
        let buffer = Arc::new(OutputBuffer::new(task_id));
        let _ = self
            .buffers
            .lock()
            .insert(task_id.to_owned(), buffer.clone());
        buffer
    }

    /// Look up a task's buffer.
    #[must_use]
    pub fn get_buffer(&self, task_id: &str) -> Option<Arc<OutputBuffer>> {
        self.buffers.lock().get(task_id).cloned()
    }

    /// Drop a task's buffer.
    pub fn remove_buffer(&self, task_id: &str) {
        let _ = self.buffers.lock().remove(task_id);
    }

    /// Number of live buffers.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.buffers.lock().len()
    }

    /// Flush one task's buffer atomically to the console.
    pub fn flush(&self, task_id: &str, with_task_prefix: bool) {
        let Some(buffer) = self.get_buffer(task_id) else {
            return;
        };
        let rendered = buffer.drain(with_task_prefix);
        if rendered.is_empty() {
            return;
        }
        let _guard = self.console.lock();
        print!("{rendered}");
        let _ = std::io::Write::flush(&mut std::io::stdout());
    }

    /// Write directly to the console under the lock (synchronous
    /// subagents).
    pub fn print_direct(&self, text: &str) {
        let _guard = self.console.lock();
        print!("{text}");
        let _ = std::io::Write::flush(&mut std::io::stdout());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
