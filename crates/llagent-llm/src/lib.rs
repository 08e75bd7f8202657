//! Model backend facade for the llagent runtime.
//!
//! The agent loop consumes models through [`ModelBackend`]: post a request
//! carrying the conversation and tool schemas, receive a stream of deltas
//! followed by a final parsed message with timings. [`LlamaServer`] is the
//! concrete client for a llama-server OpenAI-compatible endpoint; the
//! [`envelope`] module recovers tool calls from raw text when the server did
//! not parse them.

pub mod backend;
pub mod envelope;
pub mod llama_server;
pub mod sse;

pub use backend::{
    BackendError, CompletionMessage, CompletionRequest, CompletionToolCall, FinalCompletion,
    ModelBackend, ModelChunk, ModelStream, StreamDelta, Timings,
};
pub use llama_server::LlamaServer;
