use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::events::AgentStreamEvent;
use super::service::{
    AgentService, Attachment, ContentBlock, RunEventStream, ThreadMessage,
};
use crate::errors::{ChatError, ChatResult};

/// A message-creation call recorded by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedMessage {
    pub thread_id: String,
    pub role: String,
    pub content: Vec<ContentBlock>,
    pub attachments: Vec<Attachment>,
}

/// Mock agent service with scripted responses for testing
///
/// Uploads return sequential file ids, run streams replay a scripted event
/// list, and every run stream carries a drop guard so tests can assert the
/// scoped resource was released exactly once.
pub struct MockAgentService {
    upload_error: Option<ChatError>,
    upload_counter: AtomicUsize,
    uploaded_paths: Mutex<Vec<PathBuf>>,
    created_messages: Mutex<Vec<CreatedMessage>>,
    run_events: Mutex<Vec<ChatResult<AgentStreamEvent>>>,
    messages: Mutex<Vec<ThreadMessage>>,
    saved_files: Mutex<Vec<(String, String)>>,
    stream_drops: Arc<AtomicUsize>,
}

impl Default for MockAgentService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAgentService {
    pub fn new() -> Self {
        Self {
            upload_error: None,
            upload_counter: AtomicUsize::new(0),
            uploaded_paths: Mutex::new(Vec::new()),
            created_messages: Mutex::new(Vec::new()),
            run_events: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
            saved_files: Mutex::new(Vec::new()),
            stream_drops: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Script the events yielded by the next run stream
    pub fn with_run_events(self, events: Vec<ChatResult<AgentStreamEvent>>) -> Self {
        *self.run_events.lock().unwrap() = events;
        self
    }

    /// Script the thread's message listing (newest first)
    pub fn with_messages(self, messages: Vec<ThreadMessage>) -> Self {
        *self.messages.lock().unwrap() = messages;
        self
    }

    /// Make every upload fail with `error`
    pub fn with_upload_error(mut self, error: ChatError) -> Self {
        self.upload_error = Some(error);
        self
    }

    /// Paths passed to `upload_file`, in order
    pub fn uploaded_paths(&self) -> Vec<PathBuf> {
        self.uploaded_paths.lock().unwrap().clone()
    }

    /// Messages created on the service, in order
    pub fn created_messages(&self) -> Vec<CreatedMessage> {
        self.created_messages.lock().unwrap().clone()
    }

    /// `(file_id, file_name)` pairs passed to `save_file`, in order
    pub fn saved_files(&self) -> Vec<(String, String)> {
        self.saved_files.lock().unwrap().clone()
    }

    /// How many run streams have been released so far
    pub fn stream_drop_count(&self) -> usize {
        self.stream_drops.load(Ordering::SeqCst)
    }
}

struct DropGuard(Arc<AtomicUsize>);

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AgentService for MockAgentService {
    async fn create_thread(&self) -> ChatResult<String> {
        Ok("thread_mock".to_string())
    }

    async fn upload_file(&self, path: &Path) -> ChatResult<String> {
        if let Some(error) = &self.upload_error {
            return Err(error.clone());
        }
        self.uploaded_paths.lock().unwrap().push(path.to_path_buf());
        let id = self.upload_counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("file_{id}"))
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: &str,
        content: &[ContentBlock],
        attachments: &[Attachment],
    ) -> ChatResult<()> {
        self.created_messages.lock().unwrap().push(CreatedMessage {
            thread_id: thread_id.to_string(),
            role: role.to_string(),
            content: content.to_vec(),
            attachments: attachments.to_vec(),
        });
        Ok(())
    }

    async fn stream_run(&self, _thread_id: &str, _agent_id: &str) -> ChatResult<RunEventStream> {
        let events = std::mem::take(&mut *self.run_events.lock().unwrap());
        let guard = DropGuard(self.stream_drops.clone());
        let stream = futures::stream::iter(events).map(move |event| {
            let _ = &guard;
            event
        });
        Ok(Box::pin(stream))
    }

    async fn list_messages(&self, _thread_id: &str) -> ChatResult<Vec<ThreadMessage>> {
        Ok(self.messages.lock().unwrap().clone())
    }

    async fn last_message_by_role(
        &self,
        _thread_id: &str,
        role: &str,
    ) -> ChatResult<Option<ThreadMessage>> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .find(|message| message.role == role)
            .cloned())
    }

    async fn save_file(&self, file_id: &str, file_name: &str) -> ChatResult<PathBuf> {
        self.saved_files
            .lock()
            .unwrap()
            .push((file_id.to_string(), file_name.to_string()));
        Ok(PathBuf::from(file_name))
    }
}
