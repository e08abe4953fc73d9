use super::role::Role;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Content passed inside a chat message
///
/// Text parts carry plain prompt text; image parts carry a base64 data URL
/// built from an uploaded attachment. The set is deliberately small: tool
/// traffic never appears in session history, and agent-service content
/// blocks have their own wire type in `agents::service`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: String },
    ImageUrl { url: String },
}

impl MessageContent {
    pub fn text<S: Into<String>>(text: S) -> Self {
        MessageContent::Text { text: text.into() }
    }

    pub fn image_url<S: Into<String>>(url: S) -> Self {
        MessageContent::ImageUrl { url: url.into() }
    }

    /// Get the text content if this is a Text variant
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// A message to or from an LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub created: i64,
    pub content: Vec<MessageContent>,
}

impl Message {
    pub fn new(role: Role) -> Self {
        Message {
            role,
            created: Utc::now().timestamp(),
            content: Vec::new(),
        }
    }

    /// Create a new system message with the current timestamp
    pub fn system() -> Self {
        Message::new(Role::System)
    }

    /// Create a new user message with the current timestamp
    pub fn user() -> Self {
        Message::new(Role::User)
    }

    /// Create a new assistant message with the current timestamp
    pub fn assistant() -> Self {
        Message::new(Role::Assistant)
    }

    /// Add any MessageContent to the message
    pub fn with_content(mut self, content: MessageContent) -> Self {
        self.content.push(content);
        self
    }

    /// Add text content to the message
    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_content(MessageContent::text(text))
    }

    /// Add an image data-URL to the message
    pub fn with_image_url<S: Into<String>>(self, url: S) -> Self {
        self.with_content(MessageContent::image_url(url))
    }

    /// Concatenated text of all text parts
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| part.as_text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Convert to the openai-style wire message used by the completion
    /// providers: `{"role": ..., "content": [{"type": "text", ...}]}`
    pub fn to_spec(&self) -> Value {
        let content: Vec<Value> = self
            .content
            .iter()
            .map(|part| match part {
                MessageContent::Text { text } => json!({"type": "text", "text": text}),
                MessageContent::ImageUrl { url } => {
                    json!({"type": "image_url", "image_url": {"url": url}})
                }
            })
            .collect();

        json!({
            "role": self.role,
            "content": content,
        })
    }
}

/// Convert a message list to the wire format, in order
pub fn messages_to_spec(messages: &[Message]) -> Vec<Value> {
    messages.iter().map(Message::to_spec).collect()
}
