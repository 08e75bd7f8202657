//! Terminal rendering of the event stream.

use std::io::Write;

use llagent_core::{AgentEvent, StopReason};

const DIM: &str = "\x1b[2m";
const CYAN: &str = "\x1b[36m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Stateful renderer turning events into console output.
#[derive(Debug, Default)]
pub struct Renderer {
    in_reasoning: bool,
    color: bool,
}

impl Renderer {
    /// Renderer with or without ANSI color.
    #[must_use]
    pub fn new(color: bool) -> Self {
        Self {
            in_reasoning: false,
            color,
        }
    }

    fn paint<'a>(&self, code: &'a str) -> &'a str {
        if self.color {
            code
        } else {
            ""
        }
    }

    /// Render one event; returns the text written (used by tests).
    pub fn render(&mut self, event: &AgentEvent) -> String {
        let text = self.format(event);
        if !text.is_empty() {
            let mut stdout = std::io::stdout();
            let _ = write!(stdout, "{text}");
            let _ = stdout.flush();
        }
        text
    }

    fn close_reasoning(&mut self, out: &mut String) {
        if self.in_reasoning {
            out.push_str(&format!("\n───\n\n{}", self.paint(RESET)));
            self.in_reasoning = false;
        }
    }

    fn format(&mut self, event: &AgentEvent) -> String {
        let mut out = String::new();
        match event {
            AgentEvent::TextDelta { content } => {
                self.close_reasoning(&mut out);
                out.push_str(content);
            }
            AgentEvent::ReasoningDelta { content } => {
                if !self.in_reasoning {
                    out.push_str(&format!("{}───\n", self.paint(DIM)));
                    self.in_reasoning = true;
                }
                out.push_str(content);
            }
            AgentEvent::ToolStart { name, .. } => {
                self.close_reasoning(&mut out);
                out.push_str(&format!("\n{}› {name} {}", self.paint(CYAN), self.paint(RESET)));
            }
            AgentEvent::ToolResult {
                success,
                output,
                duration_ms,
                ..
            } => {
                out.push('\n');
                if !output.is_empty() {
                    if *success {
                        out.push_str(output);
                    } else {
                        out.push_str(&format!("{}{output}{}", self.paint(RED), self.paint(RESET)));
                    }
                    out.push('\n');
                }
                out.push_str(&format!(
                    "{}└─ {}{}\n",
                    self.paint(DIM),
                    format_duration(*duration_ms),
                    self.paint(RESET)
                ));
            }
            AgentEvent::PermissionRequired { tool, .. } => {
                out.push_str(&format!("\n[waiting for permission: {tool}]\n"));
            }
            AgentEvent::PermissionResolved { allowed, .. } => {
                out.push_str(&format!(
                    "[permission {}]\n",
                    if *allowed { "granted" } else { "denied" }
                ));
            }
            AgentEvent::IterationStart { .. } => {}
            AgentEvent::Completed { reason, stats } => {
                self.close_reasoning(&mut out);
                match reason {
                    StopReason::Completed => out.push('\n'),
                    StopReason::MaxIterations => {
                        out.push_str("\n[Reached maximum iterations]\n");
                    }
                    StopReason::UserCancelled => {
                        out.push_str("\n[Generation aborted]\n");
                    }
                    StopReason::AgentError => {}
                }
                out.push_str(&format!(
                    "{}tokens: {} in, {} out, {} cached{}\n",
                    self.paint(DIM),
                    stats.input_tokens,
                    stats.output_tokens,
                    stats.cached_tokens,
                    self.paint(RESET)
                ));
            }
            AgentEvent::Error { message } => {
                self.close_reasoning(&mut out);
                out.push_str(&format!(
                    "\n{}Error: {message}{}\n",
                    self.paint(RED),
                    self.paint(RESET)
                ));
            }
        }
        out
    }
}

fn format_duration(duration_ms: u64) -> String {
    if duration_ms < 1000 {
        format!("{duration_ms}ms")
    } else {
        #[allow(clippy::cast_precision_loss)]
        let secs = duration_ms as f64 / 1000.0;
        format!("{secs:.1}s")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
