//! Streaming chat-model collaborator backed by the Ollama chat API.
//!
//! One invocation is a single generation call with an empty tool set, so the
//! sequential step budget in the invocation is trivially respected. Upstream
//! failures are reported as in-stream `Error` events rather than transport
//! failures, so partial output already forwarded is never discarded.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::ChatModel;
use super::types::{ModelEvent, ModelInvocation, Role};
use crate::error::{MedBridgeError, Result};

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

pub struct OllamaChatModel {
    client: Client,
}

impl OllamaChatModel {
    pub fn new() -> Result<Self> {
        // No overall request timeout here: the pipeline owns the wall-clock
        // ceiling for the stream. Only connecting is bounded.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                MedBridgeError::Config(format!("Failed to build chat HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    fn wire_messages(invocation: &ModelInvocation) -> Vec<WireMessage> {
        let mut wire = Vec::with_capacity(invocation.messages.len() + 1);
        wire.push(WireMessage {
            role: "system",
            content: invocation.system_prompt.clone(),
        });
        for message in &invocation.messages {
            wire.push(WireMessage {
                role: match message.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System => "system",
                },
                content: message.content.clone(),
            });
        }
        wire
    }

    /// Map an upstream failure to a caller-safe message; the raw error goes
    /// to the log only.
    fn friendly_upstream_message(status: u16) -> &'static str {
        match status {
            401 => "model credential rejected",
            403 => "model access denied",
            404 => "model not available on the upstream endpoint",
            429 => "upstream model is rate limited, try again shortly",
            500..=599 => "upstream model is temporarily unavailable",
            _ => "upstream model request failed",
        }
    }
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    async fn invoke(&self, invocation: ModelInvocation) -> Result<mpsc::Receiver<ModelEvent>> {
        let (tx, rx) = mpsc::channel(64);
        let client = self.client.clone();

        tokio::spawn(async move {
            if let Err(message) = stream_chat(&client, &invocation, &tx).await {
                warn!("Upstream model error: {}", message);
                let _ = tx.send(ModelEvent::Error(message)).await;
            }
        });

        Ok(rx)
    }
}

async fn stream_chat(
    client: &Client,
    invocation: &ModelInvocation,
    tx: &mpsc::Sender<ModelEvent>,
) -> std::result::Result<(), String> {
    let url = format!("{}/api/chat", invocation.endpoint);
    let body = json!({
        "model": invocation.model,
        "messages": OllamaChatModel::wire_messages(invocation),
        "stream": true,
    });

    debug!("Invoking chat model {} at {}", invocation.model, url);

    let mut request = client.post(&url).json(&body);
    if let Some(api_key) = &invocation.api_key {
        request = request.bearer_auth(api_key);
    }

    let response = request.send().await.map_err(|e| {
        warn!("Chat request failed: {}", e);
        "could not reach the upstream model".to_string()
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        warn!("Chat API error {}: {}", status, error_text);
        return Err(OllamaChatModel::friendly_upstream_message(status.as_u16()).to_string());
    }

    let mut stream = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = stream.next().await {
        let bytes = chunk.map_err(|e| {
            warn!("Failed to read model stream: {}", e);
            "model stream interrupted".to_string()
        })?;
        buffer.push_str(&String::from_utf8_lossy(&bytes));

        while let Some(pos) = buffer.find('\n') {
            let line = buffer[..pos].trim().to_string();
            buffer = buffer[pos + 1..].to_string();
            if line.is_empty() {
                continue;
            }

            let parsed: ChatChunk = match serde_json::from_str(&line) {
                Ok(parsed) => parsed,
                Err(e) => {
                    debug!("Skipping unparseable stream line: {} ({})", line, e);
                    continue;
                }
            };

            if let Some(error) = parsed.error {
                warn!("In-stream model error: {}", error);
                return Err("upstream model reported an error".to_string());
            }

            if let Some(message) = parsed.message {
                if !message.content.is_empty()
                    && tx.send(ModelEvent::Content(message.content)).await.is_err()
                {
                    // Caller went away; stop reading.
                    return Ok(());
                }
            }

            if parsed.done {
                let _ = tx.send(ModelEvent::Done).await;
                return Ok(());
            }
        }
    }

    // Stream ended without an explicit done marker; treat as natural end.
    let _ = tx.send(ModelEvent::Done).await;
    Ok(())
}
