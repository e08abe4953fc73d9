use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::events::{AgentStreamEvent, RunStatus};
use super::service::{
    AgentService, Annotation, Attachment, ContentBlock, MessageText, RunEventStream,
    ThreadMessage,
};
use crate::errors::{ChatError, ChatResult};

const UPLOAD_POLL_INTERVAL: Duration = Duration::from_millis(500);
const UPLOAD_POLL_ATTEMPTS: usize = 60;

/// REST/SSE client for the stateful agent service
///
/// Speaks the assistants wire shape: multipart file uploads, thread and
/// message resources, streamed runs framed as `event:`/`data:` pairs.
pub struct HttpAgentService {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAgentService {
    pub fn new<S: Into<String>>(endpoint: S, api_key: Option<String>) -> ChatResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()
            .map_err(|e| ChatError::Backend(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(api_key) => request.header("Authorization", format!("Bearer {api_key}")),
            None => request,
        }
    }

    async fn send_json(&self, request: RequestBuilder) -> ChatResult<Value> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ChatError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ChatError::Backend(format!(
                "Request failed: {status}\n{detail}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ChatError::Backend(e.to_string()))
    }
}

/// Map one SSE frame to a stream event; `None` skips frames with no
/// bearing on the dispatcher (step events, heartbeats, unknown kinds)
pub(crate) fn parse_run_event(event_type: &str, data: &str) -> Option<AgentStreamEvent> {
    if event_type == "error" {
        return Some(AgentStreamEvent::Error {
            payload: data.to_string(),
        });
    }

    let value: Value = serde_json::from_str(data).ok()?;

    if event_type == "thread.message.delta" {
        let mut text = String::new();
        if let Some(parts) = value["delta"]["content"].as_array() {
            for part in parts {
                if part["type"] == "text" {
                    if let Some(piece) = part["text"]["value"].as_str() {
                        text.push_str(piece);
                    }
                }
            }
        }
        return Some(AgentStreamEvent::MessageDelta { text });
    }

    // Run lifecycle events carry the status on the run object; step events
    // are a different resource and carry nothing the dispatcher needs
    if event_type.starts_with("thread.run.") && !event_type.starts_with("thread.run.step") {
        let status = value
            .get("status")
            .cloned()
            .and_then(|status| serde_json::from_value::<RunStatus>(status).ok())
            .unwrap_or(RunStatus::Unknown);
        let last_error = value["last_error"]["message"]
            .as_str()
            .map(str::to_string);
        return Some(AgentStreamEvent::RunStatus { status, last_error });
    }

    None
}

/// Parse one message object from a thread listing
pub(crate) fn parse_thread_message(value: &Value) -> ThreadMessage {
    let mut text: Option<MessageText> = None;
    let mut image_file_ids = Vec::new();

    if let Some(blocks) = value["content"].as_array() {
        for block in blocks {
            match block["type"].as_str() {
                Some("text") => {
                    if text.is_none() {
                        let annotations = block["text"]["annotations"]
                            .as_array()
                            .map(|annotations| {
                                annotations.iter().filter_map(parse_annotation).collect()
                            })
                            .unwrap_or_default();
                        text = Some(MessageText {
                            value: block["text"]["value"].as_str().unwrap_or_default().to_string(),
                            annotations,
                        });
                    }
                }
                Some("image_file") => {
                    if let Some(file_id) = block["image_file"]["file_id"].as_str() {
                        image_file_ids.push(file_id.to_string());
                    }
                }
                _ => {}
            }
        }
    }

    ThreadMessage {
        id: value["id"].as_str().unwrap_or_default().to_string(),
        role: value["role"].as_str().unwrap_or_default().to_string(),
        text,
        image_file_ids,
    }
}

fn parse_annotation(value: &Value) -> Option<Annotation> {
    let marker = value["text"].as_str().map(str::to_string);
    match value["type"].as_str()? {
        "url_citation" => Some(Annotation::UrlCitation {
            title: value["url_citation"]["title"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            url: value["url_citation"]["url"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            text: marker,
        }),
        "file_path" => Some(Annotation::FilePath {
            file_id: value["file_path"]["file_id"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            text: marker,
        }),
        _ => None,
    }
}

#[async_trait]
impl AgentService for HttpAgentService {
    async fn create_thread(&self) -> ChatResult<String> {
        let value = self
            .send_json(self.client.post(self.url("/threads")).json(&json!({})))
            .await?;
        value["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ChatError::Backend("thread creation returned no id".to_string()))
    }

    async fn upload_file(&self, path: &Path) -> ChatResult<String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ChatError::Backend(format!("failed to read {}: {e}", path.display())))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());

        let form = Form::new()
            .text("purpose", "agents")
            .part("file", Part::bytes(bytes).file_name(file_name));
        let response = self
            .authorize(self.client.post(self.url("/files")).multipart(form))
            .send()
            .await
            .map_err(|e| ChatError::Backend(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ChatError::Backend(format!(
                "Upload failed: {status}\n{detail}"
            )));
        }
        let value: Value = response
            .json()
            .await
            .map_err(|e| ChatError::Backend(e.to_string()))?;
        let file_id = value["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ChatError::Backend("upload returned no file id".to_string()))?;

        // Wait until the backend has processed the file
        for _ in 0..UPLOAD_POLL_ATTEMPTS {
            let value = self
                .send_json(self.client.get(self.url(&format!("/files/{file_id}"))))
                .await?;
            match value["status"].as_str() {
                Some("processed") | None => return Ok(file_id),
                Some("error") => {
                    return Err(ChatError::Backend(format!(
                        "file {file_id} failed processing"
                    )));
                }
                _ => tokio::time::sleep(UPLOAD_POLL_INTERVAL).await,
            }
        }

        Err(ChatError::Backend(format!(
            "file {file_id} was not processed in time"
        )))
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: &str,
        content: &[ContentBlock],
        attachments: &[Attachment],
    ) -> ChatResult<()> {
        let body = json!({
            "role": role,
            "content": content,
            "attachments": attachments,
        });
        self.send_json(
            self.client
                .post(self.url(&format!("/threads/{thread_id}/messages")))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn stream_run(&self, thread_id: &str, agent_id: &str) -> ChatResult<RunEventStream> {
        let body = json!({
            "assistant_id": agent_id,
            "stream": true,
        });
        let response = self
            .authorize(
                self.client
                    .post(self.url(&format!("/threads/{thread_id}/runs")))
                    .json(&body),
            )
            .send()
            .await
            .map_err(|e| ChatError::Backend(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ChatError::Backend(format!(
                "Run request failed: {status}\n{detail}"
            )));
        }

        let mut bytes = response.bytes_stream();
        let stream = try_stream! {
            let mut buffer = String::new();
            let mut event_type = String::new();
            'receive: while let Some(piece) = bytes.next().await {
                let piece = piece.map_err(|e| ChatError::Backend(e.to_string()))?;
                buffer.push_str(&String::from_utf8_lossy(&piece));

                while let Some(newline) = buffer.find('\n') {
                    let line = buffer.drain(..=newline).collect::<String>();
                    let line = line.trim();
                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    if let Some(name) = line.strip_prefix("event: ") {
                        event_type = name.to_string();
                    } else if let Some(data) = line.strip_prefix("data: ") {
                        if data == "[DONE]" {
                            break 'receive;
                        }
                        if let Some(event) = parse_run_event(&event_type, data) {
                            yield event;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn list_messages(&self, thread_id: &str) -> ChatResult<Vec<ThreadMessage>> {
        let value = self
            .send_json(
                self.client
                    .get(self.url(&format!("/threads/{thread_id}/messages"))),
            )
            .await?;
        Ok(value["data"]
            .as_array()
            .map(|messages| messages.iter().map(parse_thread_message).collect())
            .unwrap_or_default())
    }

    async fn last_message_by_role(
        &self,
        thread_id: &str,
        role: &str,
    ) -> ChatResult<Option<ThreadMessage>> {
        // The listing is newest first, so the first match is the latest
        let messages = self.list_messages(thread_id).await?;
        Ok(messages.into_iter().find(|message| message.role == role))
    }

    async fn save_file(&self, file_id: &str, file_name: &str) -> ChatResult<PathBuf> {
        let response = self
            .authorize(
                self.client
                    .get(self.url(&format!("/files/{file_id}/content"))),
            )
            .send()
            .await
            .map_err(|e| ChatError::Backend(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Backend(format!(
                "File download failed: {status}"
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ChatError::Backend(e.to_string()))?;

        let path = std::env::current_dir()
            .map_err(|e| ChatError::Backend(e.to_string()))?
            .join(file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| ChatError::Backend(e.to_string()))?;
        Ok(path)
    }
}
