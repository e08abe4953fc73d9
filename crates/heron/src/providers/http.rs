use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

use super::base::{ChatChunk, ChunkStream, Provider};
use crate::errors::{ChatError, ChatResult};

/// Streaming client for OpenAI-compatible chat-completion endpoints
///
/// Routing comes from the request parameters: `api_base` overrides the
/// default host, `api_key` becomes the bearer token, and `api_version` is
/// forwarded as the azure-style query parameter. The remaining parameters
/// are sent through verbatim as the request body.
pub struct HttpProvider {
    client: Client,
    default_host: String,
}

impl HttpProvider {
    pub fn new<S: Into<String>>(default_host: S) -> ChatResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()
            .map_err(|e| ChatError::Backend(e.to_string()))?;

        Ok(Self {
            client,
            default_host: default_host.into(),
        })
    }

    fn request_url(&self, params: &Value) -> String {
        let base = params
            .get("api_base")
            .and_then(Value::as_str)
            .unwrap_or(&self.default_host);
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }

    /// Strip client-routing keys; everything else is the provider payload
    fn request_body(params: &Value) -> Value {
        let mut body = params.clone();
        if let Some(object) = body.as_object_mut() {
            object.remove("api_key");
            object.remove("api_base");
            object.remove("api_version");
        }
        body
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn stream_chat(&self, params: &Value) -> ChatResult<ChunkStream> {
        let url = self.request_url(params);
        let body = Self::request_body(params);

        let mut request = self.client.post(&url).json(&body);
        if let Some(api_key) = params.get("api_key").and_then(Value::as_str) {
            request = request
                .header("Authorization", format!("Bearer {api_key}"))
                .header("api-key", api_key);
        }
        if let Some(api_version) = params.get("api_version").and_then(Value::as_str) {
            request = request.query(&[("api-version", api_version)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChatError::Backend(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {}
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                return Err(ChatError::Backend(format!("Server error: {status}")));
            }
            status => {
                let detail = response.text().await.unwrap_or_default();
                return Err(ChatError::Backend(format!(
                    "Request failed: {status}\n{detail}"
                )));
            }
        }

        let mut bytes = response.bytes_stream();
        let stream = try_stream! {
            let mut buffer = String::new();
            'receive: while let Some(piece) = bytes.next().await {
                let piece = piece.map_err(|e| ChatError::Backend(e.to_string()))?;
                buffer.push_str(&String::from_utf8_lossy(&piece));

                // Process complete lines, keeping any partial event buffered
                while let Some(newline) = buffer.find('\n') {
                    let line = buffer.drain(..=newline).collect::<String>();
                    let line = line.trim();
                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    if let Some(data) = line.strip_prefix("data: ") {
                        if data == "[DONE]" {
                            break 'receive;
                        }
                        match serde_json::from_str::<ChatChunk>(data) {
                            Ok(chunk) => yield chunk,
                            Err(e) => {
                                // Skip malformed events rather than failing the stream
                                tracing::warn!("Skipping unparsable SSE chunk: {}", e);
                            }
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sse_body(events: &[&str]) -> String {
        let mut body = String::new();
        for event in events {
            body.push_str("data: ");
            body.push_str(event);
            body.push_str("\n\n");
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    #[tokio::test]
    async fn test_stream_chat_accumulates_chunks() {
        let server = MockServer::start().await;
        let body = sse_body(&[
            r#"{"choices":[{"index":0,"delta":{"content":"Hello"}}]}"#,
            r#"{"choices":[{"index":0,"delta":{"content":" world!"}}]}"#,
            r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
        ]);
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"),
            )
            .mount(&server)
            .await;

        let provider = HttpProvider::new(server.uri()).unwrap();
        let params = json!({"model": "openai/gpt-4o", "messages": [], "stream": true});
        let chunks: Vec<ChatChunk> = provider
            .stream_chat(&params)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].delta_content(), Some("Hello"));
        assert_eq!(chunks[1].delta_content(), Some(" world!"));
        assert_eq!(chunks[2].delta_content(), None);
    }

    #[tokio::test]
    async fn test_routing_params_are_stripped_from_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(query_param("api-version", "2024-05-01"))
            .and(body_partial_json(json!({"model": "azure/gpt-4o"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(sse_body(&[]), "text/event-stream"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = HttpProvider::new("https://unused.example.com").unwrap();
        let params = json!({
            "model": "azure/gpt-4o",
            "messages": [],
            "stream": true,
            "api_key": "sk-test",
            "api_base": server.uri(),
            "api_version": "2024-05-01",
        });
        let chunks: Vec<ChatChunk> = provider
            .stream_chat(&params)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert!(chunks.is_empty());

        // Body must not leak the routing keys
        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body.get("api_key").is_none());
        assert!(body.get("api_base").is_none());
        assert!(body.get("api_version").is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = HttpProvider::new(server.uri()).unwrap();
        let params = json!({"model": "openai/gpt-4o", "messages": [], "stream": true});
        let err = provider.stream_chat(&params).await.err().unwrap();
        assert!(err.to_string().contains("Server error"));
    }
}
