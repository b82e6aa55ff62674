//! Token streaming for the chat endpoint.
//!
//! A backend spawns a producer task that owns the sender half of a bounded
//! channel. Dropping the receiver (client disconnect) makes the next send
//! fail and the producer stops.
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use ragdb_core::config::ChatSettings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(default)]
    pub model: String,
}

/// One streamed record. Exactly one record per stream, the last, carries a
/// non-empty `final_text` and an empty `token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub token: String,
    pub final_text: String,
}

impl ChatResponse {
    pub fn token(token: impl Into<String>) -> Self {
        Self { token: token.into(), final_text: String::new() }
    }

    pub fn finished(final_text: impl Into<String>) -> Self {
        Self { token: String::new(), final_text: final_text.into() }
    }
}

pub trait ChatBackend: Send + Sync {
    /// Start generating; must be called inside a tokio runtime.
    fn stream(&self, request: ChatRequest) -> mpsc::Receiver<ChatResponse>;
}

/// Stand-in model: replies `Echo: {prompt}` one character at a time.
pub struct EchoChat {
    token_delay: Duration,
    capacity: usize,
}

impl EchoChat {
    pub fn new(settings: &ChatSettings) -> Self {
        Self {
            token_delay: Duration::from_millis(settings.token_delay_ms),
            capacity: settings.channel_capacity.max(1),
        }
    }
}

impl ChatBackend for EchoChat {
    fn stream(&self, request: ChatRequest) -> mpsc::Receiver<ChatResponse> {
        let (tx, rx) = mpsc::channel(self.capacity);
        tokio::spawn(produce(tx, request, self.token_delay));
        rx
    }
}

/// Returns how many records reached the receiver.
async fn produce(tx: mpsc::Sender<ChatResponse>, request: ChatRequest, delay: Duration) -> usize {
    let reply = format!("Echo: {}", request.prompt);
    tracing::debug!(model = %request.model, history = request.history.len(), "chat started");
    let mut sent = 0;
    for ch in reply.chars() {
        if tx.send(ChatResponse::token(ch)).await.is_err() {
            tracing::debug!(sent, "chat client disconnected, stopping generation");
            return sent;
        }
        sent += 1;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    if tx.send(ChatResponse::finished(reply)).await.is_ok() {
        sent += 1;
    }
    sent
}
