//! The translation-aware chat turn pipeline and its collaborators.

pub mod model;
pub mod pipeline;
pub mod store;
pub mod types;
pub mod usage;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use types::{Message, ModelEvent, ModelInvocation};

pub use model::OllamaChatModel;
pub use pipeline::TurnPipeline;
pub use store::JsonlTranscriptStore;
pub use usage::DailyUsageTracker;

/// Usage-accounting collaborator. Denial must prevent the model call
/// entirely; the increment is charged at acceptance and never rolled back.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageTracker: Send + Sync {
    /// Returns true when this user/model combination is currently permitted.
    async fn check_and_reserve(&self, user_id: &str, model: &str, authenticated: bool)
    -> Result<bool>;

    /// Record one consumed message for the user.
    async fn increment(&self, user_id: &str) -> Result<()>;
}

/// Model-invocation collaborator: starts a generation and hands back a
/// channel of streaming events. The channel closing (or a `Done` event)
/// signals natural stream end.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(&self, invocation: ModelInvocation) -> Result<mpsc::Receiver<ModelEvent>>;
}

/// Persistence collaborator: appends a transcript entry for a conversation.
/// Safe to call twice within one turn (inbound message, then outbound)
/// without a transaction spanning both.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn append(
        &self,
        chat_id: &str,
        message_group_id: Option<String>,
        model: &str,
        messages: &[Message],
    ) -> Result<()>;
}
