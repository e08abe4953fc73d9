use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ChatResult;

/// Incremental message delta inside a streamed chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Choice in a streamed chat completion chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// One unit of a streamed chat completion response
///
/// Most chunks carry a text delta in `choices[0].delta.content`. Providers
/// with web grounding attach a flat `citations` list of URLs, typically on
/// a trailing chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<String>>,
}

impl ChatChunk {
    /// The delta text of the first choice, if any
    pub fn delta_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
    }

    /// A chunk carrying only delta text
    pub fn content<S: Into<String>>(text: S) -> Self {
        ChatChunk {
            choices: vec![ChunkChoice {
                delta: ChunkDelta {
                    content: Some(text.into()),
                },
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    /// A chunk carrying only a citations list
    pub fn with_citations(urls: Vec<&str>) -> Self {
        ChatChunk {
            citations: Some(urls.into_iter().map(str::to_string).collect()),
            ..Default::default()
        }
    }
}

/// Stream of chunks from one completion call
pub type ChunkStream = BoxStream<'static, ChatResult<ChatChunk>>;

/// Base trait for chat-completion providers
///
/// Takes the full parameter object built by `completion::build_chat_parameters`
/// and returns the chunk stream. Implementations decide routing from the
/// parameters themselves (model, api_base, api_key, api_version).
#[async_trait]
pub trait Provider: Send + Sync {
    async fn stream_chat(&self, params: &Value) -> ChatResult<ChunkStream>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chunk_parses_openai_shape() {
        let chunk: ChatChunk = serde_json::from_value(json!({
            "id": "chatcmpl-123",
            "object": "chat.completion.chunk",
            "created": 1700000000,
            "model": "gpt-4o",
            "choices": [{"index": 0, "delta": {"content": "Hello"}, "finish_reason": null}]
        }))
        .unwrap();
        assert_eq!(chunk.delta_content(), Some("Hello"));
        assert!(chunk.citations.is_none());
    }

    #[test]
    fn test_chunk_parses_citations() {
        let chunk: ChatChunk = serde_json::from_value(json!({
            "choices": [{"index": 0, "delta": {}}],
            "citations": ["https://x.com/a", "https://x.com/b"]
        }))
        .unwrap();
        assert_eq!(chunk.delta_content(), None);
        assert_eq!(chunk.citations.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_chunk_without_choices() {
        let chunk: ChatChunk = serde_json::from_value(json!({})).unwrap();
        assert_eq!(chunk.delta_content(), None);
    }
}
