use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            attachments: Vec::new(),
        }
    }
}

/// One chat turn as submitted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurnRequest {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub enable_search: bool,
    // On the wire this field is snake_case while its siblings are camelCase;
    // accept both.
    #[serde(default, alias = "message_group_id")]
    pub message_group_id: Option<String>,
}

/// A request whose last user message is guaranteed to be in English.
/// The flag records whether normalization actually translated anything;
/// it exists for diagnostics only and never changes behavior.
#[derive(Debug, Clone)]
pub struct NormalizedTurnRequest {
    pub request: ChatTurnRequest,
    pub translated: bool,
}

/// Events emitted by a chat-model collaborator while a reply streams in.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    Content(String),
    Reasoning(String),
    Source(SourceRef),
    Error(String),
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Events forwarded to the caller over the response stream, one JSON line
/// each. Internal errors are reduced to a plain message before they reach
/// this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Content { text: String },
    Reasoning { text: String },
    Source { source: SourceRef },
    Error { error: String },
    Done,
}

/// Everything a chat-model collaborator needs for one invocation.
#[derive(Debug, Clone)]
pub struct ModelInvocation {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub system_prompt: String,
    pub messages: Vec<Message>,
    pub enable_search: bool,
    /// Cap on sequential model/tool steps, preventing unbounded agentic loops
    pub max_steps: u32,
}

/// One durable transcript record, appended per persisted message set and
/// never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub chat_id: String,
    pub message_group_id: Option<String>,
    pub model: String,
    pub messages: Vec<Message>,
    pub stored_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_turn_request_deserializes_camel_case() {
        let body = r#"{
            "messages": [{"role": "user", "content": "hello"}],
            "chatId": "c1",
            "userId": "u1",
            "model": "med-llm:8b",
            "isAuthenticated": true,
            "enableSearch": false,
            "message_group_id": "g-42"
        }"#;
        let request: ChatTurnRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.chat_id, "c1");
        assert_eq!(request.messages.len(), 1);
        assert!(request.is_authenticated);
        // the group id keeps its snake_case wire name among camelCase siblings
        assert_eq!(request.message_group_id.as_deref(), Some("g-42"));
    }

    #[test]
    fn test_message_group_id_accepts_both_casings() {
        let camel: ChatTurnRequest =
            serde_json::from_str(r#"{"messageGroupId": "g-1"}"#).unwrap();
        assert_eq!(camel.message_group_id.as_deref(), Some("g-1"));

        let snake: ChatTurnRequest =
            serde_json::from_str(r#"{"message_group_id": "g-2"}"#).unwrap();
        assert_eq!(snake.message_group_id.as_deref(), Some("g-2"));
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let request: ChatTurnRequest = serde_json::from_str("{}").unwrap();
        assert!(request.messages.is_empty());
        assert!(request.chat_id.is_empty());
    }

    #[test]
    fn test_stream_event_serializes_with_type_tag() {
        let event = StreamEvent::Content {
            text: "hello".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"content","text":"hello"}"#);

        let done = serde_json::to_string(&StreamEvent::Done).unwrap();
        assert_eq!(done, r#"{"type":"done"}"#);
    }
}
