use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::events::AgentStreamEvent;
use crate::errors::ChatResult;

/// Role string for user-authored thread messages
pub const ROLE_USER: &str = "user";

/// Role string for agent-authored thread messages
pub const ROLE_AGENT: &str = "assistant";

/// High-detail hint for image-file content blocks
pub const IMAGE_DETAIL_HIGH: &str = "high";

/// Image-file reference inside a content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFileParam {
    pub file_id: String,
    pub detail: String,
}

/// Outbound content block for one agent message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ImageFile { image_file: ImageFileParam },
}

impl ContentBlock {
    pub fn text<S: Into<String>>(text: S) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn image_file<S: Into<String>>(file_id: S, detail: &str) -> Self {
        ContentBlock::ImageFile {
            image_file: ImageFileParam {
                file_id: file_id.into(),
                detail: detail.to_string(),
            },
        }
    }
}

/// A tool capability granted to an attachment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
}

/// An uploaded file attached to an agent message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_id: String,
    pub tools: Vec<ToolDefinition>,
}

impl Attachment {
    /// Attach a file with the code-interpreter capability
    pub fn code_interpreter<S: Into<String>>(file_id: S) -> Self {
        Attachment {
            file_id: file_id.into(),
            tools: vec![ToolDefinition {
                kind: "code_interpreter".to_string(),
            }],
        }
    }
}

/// Annotation attached to a finalized message, classified at ingestion
///
/// `text` is the literal marker substring the backend mirrored into the
/// message text (e.g. `【3:0†source】`); it is stripped from the buffer
/// wherever it appears.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    UrlCitation {
        title: String,
        url: String,
        text: Option<String>,
    },
    FilePath {
        file_id: String,
        text: Option<String>,
    },
}

impl Annotation {
    /// The literal marker substring mirrored in the message text, if any
    pub fn marker(&self) -> Option<&str> {
        match self {
            Annotation::UrlCitation { text, .. } | Annotation::FilePath { text, .. } => {
                text.as_deref()
            }
        }
    }
}

/// Text content of a finalized message plus its annotations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageText {
    pub value: String,
    pub annotations: Vec<Annotation>,
}

/// One message on a thread, as returned by the agent service
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadMessage {
    pub id: String,
    pub role: String,
    pub text: Option<MessageText>,
    /// File ids of image content blocks, in block order
    pub image_file_ids: Vec<String>,
}

/// Scoped stream of run events
///
/// The stream owns its transport; dropping it releases the underlying
/// connection, so every exit path of the consumer (including error
/// propagation) performs the release exactly once.
pub type RunEventStream = BoxStream<'static, ChatResult<AgentStreamEvent>>;

/// The stateful agent-service RPC surface
#[async_trait]
pub trait AgentService: Send + Sync {
    /// Create a new conversation thread and return its id
    async fn create_thread(&self) -> ChatResult<String>;

    /// Upload a file and wait until it is processed; returns the file id
    async fn upload_file(&self, path: &Path) -> ChatResult<String>;

    /// Create a message on a thread
    async fn create_message(
        &self,
        thread_id: &str,
        role: &str,
        content: &[ContentBlock],
        attachments: &[Attachment],
    ) -> ChatResult<()>;

    /// Run the agent against the thread, streaming lifecycle/content events
    async fn stream_run(&self, thread_id: &str, agent_id: &str) -> ChatResult<RunEventStream>;

    /// All messages on the thread, newest first
    async fn list_messages(&self, thread_id: &str) -> ChatResult<Vec<ThreadMessage>>;

    /// The most recent message authored by `role`, if any
    async fn last_message_by_role(
        &self,
        thread_id: &str,
        role: &str,
    ) -> ChatResult<Option<ThreadMessage>>;

    /// Persist a generated file to local storage under `file_name`
    async fn save_file(&self, file_id: &str, file_name: &str) -> ChatResult<PathBuf>;
}
