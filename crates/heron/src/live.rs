use async_trait::async_trait;
use std::path::PathBuf;

use crate::errors::ChatResult;

/// An image generated during a turn, persisted locally for display
#[derive(Debug, Clone, PartialEq)]
pub struct ImageElement {
    pub name: String,
    pub path: PathBuf,
}

/// The live UI message a turn streams into
///
/// Owned by the chat surface; the pipelines hold a reference for one
/// response cycle and never persist it. `publish` replaces the visible text
/// with the accumulator's current value, so it is safe to call at every
/// checkpoint (first content, each delta, finalization).
#[async_trait]
pub trait LiveMessage: Send {
    async fn publish(&mut self, text: &str) -> ChatResult<()>;

    async fn attach_images(&mut self, images: Vec<ImageElement>) -> ChatResult<()>;
}

/// In-memory `LiveMessage` holding the latest published state
///
/// Used by tests and by non-streaming callers that only want the final
/// text.
#[derive(Debug, Default)]
pub struct BufferedMessage {
    pub text: String,
    pub images: Vec<ImageElement>,
    pub publish_count: usize,
}

impl BufferedMessage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LiveMessage for BufferedMessage {
    async fn publish(&mut self, text: &str) -> ChatResult<()> {
        self.text = text.to_string();
        self.publish_count += 1;
        Ok(())
    }

    async fn attach_images(&mut self, images: Vec<ImageElement>) -> ChatResult<()> {
        self.images = images;
        Ok(())
    }
}
