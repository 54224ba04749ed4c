//! Append-only JSONL transcript store, one file per conversation.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::TranscriptStore;
use super::types::{Message, TranscriptRecord};
use crate::error::{MedBridgeError, Result};

pub struct JsonlTranscriptStore {
    dir: PathBuf,
}

impl JsonlTranscriptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Conversation ids come from callers; keep the file name tame.
    fn file_name(chat_id: &str) -> String {
        let safe: String = chat_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}.jsonl", safe)
    }
}

#[async_trait]
impl TranscriptStore for JsonlTranscriptStore {
    async fn append(
        &self,
        chat_id: &str,
        message_group_id: Option<String>,
        model: &str,
        messages: &[Message],
    ) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| MedBridgeError::Persistence(format!("Failed to create transcript dir: {}", e)))?;

        let record = TranscriptRecord {
            chat_id: chat_id.to_string(),
            message_group_id,
            model: model.to_string(),
            messages: messages.to_vec(),
            stored_at: Utc::now().to_rfc3339(),
        };

        let mut line = serde_json::to_string(&record)
            .map_err(|e| MedBridgeError::Persistence(format!("Failed to serialize transcript: {}", e)))?;
        line.push('\n');

        let path = self.dir.join(Self::file_name(chat_id));
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| MedBridgeError::Persistence(format!("Failed to open transcript file: {}", e)))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| MedBridgeError::Persistence(format!("Failed to append transcript: {}", e)))?;

        // tokio files buffer writes; the entry is not durable until flushed.
        file.flush()
            .await
            .map_err(|e| MedBridgeError::Persistence(format!("Failed to flush transcript: {}", e)))?;

        debug!("Appended transcript entry to {}", path.display());
        Ok(())
    }
}
