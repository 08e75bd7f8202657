//! llama-server client speaking the OpenAI-compatible streaming protocol.
//!
//! Posts `{messages, tools, tool_choice, stream:true}` to
//! `/v1/chat/completions` and adapts the SSE chunk stream into
//! [`ModelChunk`]s: content/reasoning deltas as they arrive, then one final
//! frame with the assembled message and the server's timing block.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tracing::{debug, warn};

use llagent_core::ToolSchema;

use crate::backend::{
    BackendError, CompletionMessage, CompletionRequest, CompletionToolCall, FinalCompletion,
    ModelBackend, ModelChunk, ModelStream, StreamDelta, Timings,
};
use crate::sse::{data_payload, SseLineBuffer, DONE_SENTINEL};

/// HTTP client for a llama-server endpoint.
pub struct LlamaServer {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl LlamaServer {
    /// Create a client for `base_url` (e.g. `http://127.0.0.1:8080`).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            model: "llama-server".into(),
        }
    }

    /// Override the display model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl ModelBackend for LlamaServer {
    fn model(&self) -> &str {
        &self.model
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<ModelStream, BackendError> {
        let tools: Vec<Value> = request.tools.iter().map(ToolSchema::to_openai).collect();
        let body = json!({
            "messages": request.messages,
            "tools": tools,
            "tool_choice": request.tool_choice,
            "stream": true,
            "timings_per_token": true,
        });

        debug!(
            url = %self.base_url,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "posting completion request"
        );

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let state = StreamState {
            body: Box::pin(response.bytes_stream()),
            lines: SseLineBuffer::new(),
            acc: Some(Accumulator::default()),
            ready: VecDeque::new(),
            done: false,
        };

        let stream = futures::stream::try_unfold(state, |mut st| async move {
            loop {
                if let Some(chunk) = st.ready.pop_front() {
                    return Ok(Some((chunk, st)));
                }
                if st.done {
                    return Ok(None);
                }
                match st.body.next().await {
                    Some(Ok(bytes)) => st.ingest_bytes(&bytes),
                    Some(Err(e)) => return Err(BackendError::Http(e)),
                    None => st.finish(),
                }
            }
        });

        Ok(Box::pin(stream))
    }
}

type BodyStream =
    std::pin::Pin<Box<dyn futures::Stream<Item = reqwest::Result<bytes::Bytes>> + Send>>;

struct StreamState {
    body: BodyStream,
    lines: SseLineBuffer,
    acc: Option<Accumulator>,
    ready: VecDeque<ModelChunk>,
    done: bool,
}

impl StreamState {
    fn ingest_bytes(&mut self, bytes: &[u8]) {
        for line in self.lines.push(bytes) {
            let Some(payload) = data_payload(&line) else {
                continue;
            };
            if payload == DONE_SENTINEL {
                self.finish();
                return;
            }
            match serde_json::from_str::<Value>(payload) {
                Ok(value) => {
                    if let Some(acc) = self.acc.as_mut() {
                        if let Some(delta) = acc.ingest(&value) {
                            self.ready.push_back(ModelChunk::Delta(delta));
                        }
                    }
                }
                Err(e) => warn!(error = %e, "skipping unparseable SSE payload"),
            }
        }
    }

    fn finish(&mut self) {
        if let Some(acc) = self.acc.take() {
            self.ready.push_back(ModelChunk::Final(acc.into_final()));
        }
        self.done = true;
    }
}

/// Accumulates chunk deltas into the final message.
#[derive(Debug, Default)]
struct Accumulator {
    content: String,
    tool_calls: Vec<CompletionToolCall>,
    timings: Timings,
}

impl Accumulator {
    /// Fold one chunk in; returns the delta to surface, if any.
    fn ingest(&mut self, value: &Value) -> Option<StreamDelta> {
        if let Some(t) = value.get("timings") {
            if let Ok(timings) = serde_json::from_value::<Timings>(t.clone()) {
                self.timings = timings;
            }
        }

        let delta = value.pointer("/choices/0/delta")?;

        let content = delta
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let reasoning = delta
            .get("reasoning_content")
            .and_then(Value::as_str)
            .unwrap_or_default();
        self.content.push_str(content);

        if let Some(calls) = delta.get("tool_calls").and_then(Value::as_array) {
            for call in calls {
                #[allow(clippy::cast_possible_truncation)]
                let index = call.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
                while self.tool_calls.len() <= index {
                    self.tool_calls.push(CompletionToolCall::default());
                }
                let slot = &mut self.tool_calls[index];
                if let Some(id) = call.get("id").and_then(Value::as_str) {
                    slot.id.push_str(id);
                }
                if let Some(name) = call.pointer("/function/name").and_then(Value::as_str) {
                    slot.name.push_str(name);
                }
                if let Some(args) = call.pointer("/function/arguments").and_then(Value::as_str) {
                    slot.arguments.push_str(args);
                }
            }
        }

        if content.is_empty() && reasoning.is_empty() {
            None
        } else {
            Some(StreamDelta {
                content: content.to_owned(),
                reasoning: reasoning.to_owned(),
            })
        }
    }

    fn into_final(self) -> FinalCompletion {
        let tool_calls: Vec<CompletionToolCall> = self
            .tool_calls
            .into_iter()
            .filter(|c| !c.name.is_empty())
            .collect();
        FinalCompletion {
            message: Some(CompletionMessage {
                content: self.content.clone(),
                tool_calls,
            }),
            content: self.content,
            timings: self.timings,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_url_trailing_slash_stripped() {
        let server = LlamaServer::new("http://localhost:8080/");
        assert_eq!(server.base_url, "http://localhost:8080");
    }

    #[test]
    fn accumulator_collects_content_deltas() {
        let mut acc = Accumulator::default();
        let d1 = acc.ingest(&json!({"choices": [{"delta": {"content": "Hello "}}]}));
        let d2 = acc.ingest(&json!({"choices": [{"delta": {"content": "world"}}]}));
        assert_eq!(d1.unwrap().content, "Hello ");
        assert_eq!(d2.unwrap().content, "world");
        assert_eq!(acc.into_final().content, "Hello world");
    }

    #[test]
    fn accumulator_surfaces_reasoning_deltas() {
        let mut acc = Accumulator::default();
        let d = acc
            .ingest(&json!({"choices": [{"delta": {"reasoning_content": "thinking"}}]}))
            .unwrap();
        assert_eq!(d.reasoning, "thinking");
        assert!(d.content.is_empty());
        // Reasoning does not accumulate into final content.
        assert!(acc.into_final().content.is_empty());
    }

    #[test]
    fn accumulator_assembles_tool_call_fragments() {
        let mut acc = Accumulator::default();
        let _ = acc.ingest(&json!({"choices": [{"delta": {"tool_calls": [
            {"index": 0, "id": "call_ab", "function": {"name": "bash", "arguments": "{\"comm"}}
        ]}}]}));
        let _ = acc.ingest(&json!({"choices": [{"delta": {"tool_calls": [
            {"index": 0, "function": {"arguments": "and\":\"ls\"}"}}
        ]}}]}));
        let fin = acc.into_final();
        let calls = &fin.message.unwrap().tool_calls;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_ab");
        assert_eq!(calls[0].name, "bash");
        assert_eq!(calls[0].arguments, "{\"command\":\"ls\"}");
    }

    #[test]
    fn accumulator_handles_multiple_tool_calls_by_index() {
        let mut acc = Accumulator::default();
        let _ = acc.ingest(&json!({"choices": [{"delta": {"tool_calls": [
            {"index": 0, "id": "a", "function": {"name": "glob", "arguments": "{}"}},
            {"index": 1, "id": "b", "function": {"name": "read", "arguments": "{}"}}
        ]}}]}));
        let fin = acc.into_final();
        let calls = fin.message.unwrap().tool_calls;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "glob");
        assert_eq!(calls[1].name, "read");
    }

    #[test]
    fn accumulator_picks_up_timings() {
        let mut acc = Accumulator::default();
        let _ = acc.ingest(&json!({
            "choices": [{"delta": {}}],
            "timings": {"prompt_n": 100, "prompt_ms": 50.0, "predicted_n": 20, "predicted_ms": 200.0, "cache_n": 80}
        }));
        let fin = acc.into_final();
        assert_eq!(fin.timings.prompt_n, 100);
        assert_eq!(fin.timings.predicted_n, 20);
        assert_eq!(fin.timings.cache_n, 80);
    }

    #[test]
    fn unnamed_tool_call_slots_are_dropped() {
        let mut acc = Accumulator::default();
        let _ = acc.ingest(&json!({"choices": [{"delta": {"tool_calls": [
            {"index": 1, "id": "b", "function": {"name": "read", "arguments": "{}"}}
        ]}}]}));
        let fin = acc.into_final();
        // Index 0 was never named; only the real call survives.
        assert_eq!(fin.message.unwrap().tool_calls.len(), 1);
    }

    #[test]
    fn empty_delta_yields_no_stream_delta() {
        let mut acc = Accumulator::default();
        assert!(acc.ingest(&json!({"choices": [{"delta": {}}]})).is_none());
    }
}
