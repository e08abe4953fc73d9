use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use super::base::{ChatChunk, ChunkStream, Provider};
use crate::errors::{ChatError, ChatResult};

/// A mock provider that replays pre-configured chunk sequences for testing
///
/// Each `stream_chat` call consumes the next scripted sequence and records
/// the parameter object it was called with.
pub struct MockProvider {
    scripts: Arc<Mutex<Vec<Vec<ChatResult<ChatChunk>>>>>,
    calls: Arc<Mutex<Vec<Value>>>,
}

impl MockProvider {
    /// Create a mock that streams one sequence of successful chunks
    pub fn new(chunks: Vec<ChatChunk>) -> Self {
        Self::with_results(vec![chunks.into_iter().map(Ok).collect()])
    }

    /// Create a mock with full control over per-call results
    pub fn with_results(scripts: Vec<Vec<ChatResult<ChatChunk>>>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Parameter objects captured from each call, in order
    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn stream_chat(&self, params: &Value) -> ChatResult<ChunkStream> {
        self.calls.lock().unwrap().push(params.clone());

        let mut scripts = self.scripts.lock().unwrap();
        if scripts.is_empty() {
            return Err(ChatError::Backend("no scripted response".to_string()));
        }
        let chunks = scripts.remove(0);
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}
