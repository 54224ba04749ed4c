//! Turn Pipeline: validate -> account usage -> normalize input -> invoke the
//! model with streaming output -> translate the finished reply -> persist the
//! bilingual transcript.
//!
//! Ordering guarantees: the inbound user message is persisted before the
//! model call begins, and the completion hook runs exactly once, only after
//! the stream ends naturally. A caller disconnect mid-stream suppresses the
//! hook, so an aborted turn leaves only the inbound message behind.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::{
    ChatTurnRequest, Message, ModelEvent, ModelInvocation, NormalizedTurnRequest, Role,
    StreamEvent,
};
use super::{ChatModel, TranscriptStore, UsageTracker};
use crate::config::ChatConfig;
use crate::error::{MedBridgeError, Result};
use crate::translate::TranslationService;

/// Separator between the English reply and its Vietnamese rendering in the
/// persisted transcript.
pub const BILINGUAL_SEPARATOR: &str = "\n\n---\n\n**Bản dịch tiếng Việt:**\n\n";

pub struct TurnPipeline {
    config: ChatConfig,
    usage: Arc<dyn UsageTracker>,
    model: Arc<dyn ChatModel>,
    store: Arc<dyn TranscriptStore>,
    translator: Arc<dyn TranslationService>,
}

/// State the completion hook needs once the stream has ended.
struct TurnFinalizer {
    chat_id: String,
    message_group_id: String,
    model: String,
    store: Arc<dyn TranscriptStore>,
    translator: Arc<dyn TranslationService>,
}

impl TurnPipeline {
    pub fn new(
        config: ChatConfig,
        usage: Arc<dyn UsageTracker>,
        model: Arc<dyn ChatModel>,
        store: Arc<dyn TranscriptStore>,
        translator: Arc<dyn TranslationService>,
    ) -> Self {
        Self {
            config,
            usage,
            model,
            store,
            translator,
        }
    }

    /// Run one chat turn. Returns the caller-facing event stream; transcript
    /// persistence happens as a side effect once the stream ends naturally.
    pub async fn process_turn(
        &self,
        request: ChatTurnRequest,
    ) -> Result<mpsc::Receiver<StreamEvent>> {
        Self::validate(&request)?;

        // Usage is charged at acceptance, not at completion: the increment
        // is deliberately not rolled back if a later step fails.
        let allowed = self
            .usage
            .check_and_reserve(&request.user_id, &request.model, request.is_authenticated)
            .await?;
        if !allowed {
            return Err(MedBridgeError::QuotaExceeded(
                "daily message limit reached".to_string(),
            ));
        }
        self.usage.increment(&request.user_id).await?;

        let normalized = self.normalize_input(request).await;
        debug!(
            "Input normalization complete (translated: {})",
            normalized.translated
        );
        let request = normalized.request;

        let message_group_id = request
            .message_group_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        // Persist the inbound user message before the model call so the
        // audit trail survives a model failure.
        if let Some(last) = request.messages.last() {
            if last.role == Role::User {
                self.store
                    .append(
                        &request.chat_id,
                        Some(message_group_id.clone()),
                        &request.model,
                        std::slice::from_ref(last),
                    )
                    .await?;
            }
        }

        let model_config = self
            .config
            .find_model(&request.model)
            .ok_or_else(|| {
                MedBridgeError::ModelNotFound(format!("Model {} not found", request.model))
            })?
            .clone();

        // Anonymous callers take the shared default credential path.
        let api_key = if request.is_authenticated {
            model_config.api_key.clone()
        } else {
            None
        };

        let invocation = ModelInvocation {
            endpoint: model_config.endpoint,
            model: model_config.model,
            api_key,
            system_prompt: request
                .system_prompt
                .clone()
                .unwrap_or_else(|| self.config.default_system_prompt.clone()),
            messages: request.messages.clone(),
            enable_search: request.enable_search,
            max_steps: self.config.max_steps,
        };

        let events = self.model.invoke(invocation).await?;

        let finalizer = TurnFinalizer {
            chat_id: request.chat_id.clone(),
            message_group_id,
            model: request.model.clone(),
            store: self.store.clone(),
            translator: self.translator.clone(),
        };

        let (tx, rx) = mpsc::channel(32);
        let ceiling = Duration::from_secs(self.config.stream_timeout_secs);
        tokio::spawn(drive_stream(events, tx, finalizer, ceiling));

        Ok(rx)
    }

    fn validate(request: &ChatTurnRequest) -> Result<()> {
        if request.messages.is_empty()
            || request.chat_id.trim().is_empty()
            || request.user_id.trim().is_empty()
        {
            return Err(MedBridgeError::InvalidRequest(
                "messages, chat id and user id are required".to_string(),
            ));
        }
        Ok(())
    }

    /// Normalize the turn's input: translate the last user message to
    /// English unless it already looks English. Translation failure means
    /// "normalization skipped", never an error.
    async fn normalize_input(&self, mut request: ChatTurnRequest) -> NormalizedTurnRequest {
        let mut translated = false;

        if let Some(last) = request.messages.last_mut() {
            if last.role == Role::User && !last.content.trim().is_empty() {
                // Audit record of the original message before any mutation.
                info!(
                    target: "audit",
                    chat_id = %request.chat_id,
                    user_id = %request.user_id,
                    content = %last.content,
                    "inbound user message"
                );

                let result = self.translator.to_english(&last.content).await;
                if result.translated {
                    info!(
                        "Normalized user input to English ({} -> {} chars)",
                        result.source_chars, result.translated_chars
                    );
                    last.content = result.text;
                    translated = true;
                }
            }
        }

        NormalizedTurnRequest {
            request,
            translated,
        }
    }
}

/// Fan the model's event stream out to the caller while accumulating the
/// full reply for the completion hook. Forwarding never blocks on the
/// translation path; translation starts only after the stream ends.
async fn drive_stream(
    mut events: mpsc::Receiver<ModelEvent>,
    tx: mpsc::Sender<StreamEvent>,
    finalizer: TurnFinalizer,
    ceiling: Duration,
) {
    let deadline = Instant::now() + ceiling;
    let mut assistant = String::new();
    let mut upstream_error = false;

    loop {
        let event = match tokio::time::timeout_at(deadline, events.recv()).await {
            Err(_) => {
                warn!("Model invocation exceeded its wall-clock ceiling");
                let _ = tx
                    .send(StreamEvent::Error {
                        error: "model response timed out".to_string(),
                    })
                    .await;
                let _ = tx.send(StreamEvent::Done).await;
                return;
            }
            Ok(event) => event,
        };

        match event {
            None => break,
            Some(ModelEvent::Content(text)) => {
                assistant.push_str(&text);
                if tx.send(StreamEvent::Content { text }).await.is_err() {
                    debug!("Caller disconnected mid-stream, skipping completion hook");
                    return;
                }
            }
            Some(ModelEvent::Reasoning(text)) => {
                if tx.send(StreamEvent::Reasoning { text }).await.is_err() {
                    return;
                }
            }
            Some(ModelEvent::Source(source)) => {
                if tx.send(StreamEvent::Source { source }).await.is_err() {
                    return;
                }
            }
            Some(ModelEvent::Error(error)) => {
                // Forwarded in-stream so partial output is not discarded.
                upstream_error = true;
                if tx.send(StreamEvent::Error { error }).await.is_err() {
                    return;
                }
            }
            Some(ModelEvent::Done) => break,
        }
    }

    let _ = tx.send(StreamEvent::Done).await;

    // Aborted and timed-out turns return above, so reaching this point
    // means the stream ended naturally.
    if !upstream_error {
        finalizer.finalize(assistant).await;
    }
}

impl TurnFinalizer {
    /// Completion hook: runs at most once per turn, only on natural stream
    /// end. Translation failure must never block persistence of the primary
    /// answer, and persistence failure here must never crash the request.
    async fn finalize(self, english: String) {
        let message = if english.trim().is_empty() {
            // Non-textual or empty reply: persist unmodified.
            Message::assistant(english)
        } else {
            let result = self.translator.to_vietnamese(&english).await;
            if result.translated {
                Message::assistant(format!(
                    "{}{}{}",
                    english, BILINGUAL_SEPARATOR, result.text
                ))
            } else {
                Message::assistant(english)
            }
        };

        if let Err(e) = self
            .store
            .append(
                &self.chat_id,
                Some(self.message_group_id.clone()),
                &self.model,
                std::slice::from_ref(&message),
            )
            .await
        {
            warn!("Failed to persist assistant transcript: {}", e);
        }
    }
}
