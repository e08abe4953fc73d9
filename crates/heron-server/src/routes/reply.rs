use async_trait::async_trait;
use axum::{
    extract::State,
    http::{self, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::Stream;
use serde::Deserialize;
use serde_json::json;
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use heron::agents::http::HttpAgentService;
use heron::agents::pipeline::chat_agent;
use heron::agents::AGENT_PROVIDER;
use heron::completion::chat_completion;
use heron::config::{find_by_deployment, load_model_configs};
use heron::errors::{ChatError, ChatResult};
use heron::history::{append_message, UploadElement};
use heron::live::{ImageElement, LiveMessage};
use heron::models::role::Role;
use heron::providers::http::HttpProvider;
use heron::session::TurnContext;

use crate::auth::user_from_headers;
use crate::convert::PlainTextConverter;
use crate::state::AppState;

// Types matching the incoming JSON structure
#[derive(Debug, Deserialize)]
struct ReplyRequest {
    session_id: String,
    message: String,
    #[serde(default)]
    elements: Vec<ElementPayload>,
}

#[derive(Debug, Deserialize)]
struct ElementPayload {
    name: String,
    mime: String,
    path: String,
}

/// SSE response streaming live-message updates to the chat surface
pub struct SseResponse {
    rx: ReceiverStream<String>,
}

impl SseResponse {
    fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> axum::response::Response {
        let body = axum::body::Body::from_stream(self);

        http::Response::builder()
            .header("Content-Type", "text/event-stream")
            .header("Cache-Control", "no-cache")
            .header("Connection", "keep-alive")
            .body(body)
            .unwrap()
    }
}

fn sse_event(kind: &str, payload: &serde_json::Value) -> String {
    format!("event: {kind}\ndata: {payload}\n\n")
}

/// Live message publishing over the response channel
///
/// A send failure means the UI side of the channel is gone, which is the
/// "no target to update" condition.
struct ChannelMessage {
    tx: mpsc::Sender<String>,
}

#[async_trait]
impl LiveMessage for ChannelMessage {
    async fn publish(&mut self, text: &str) -> ChatResult<()> {
        self.tx
            .send(sse_event("message", &json!({ "text": text })))
            .await
            .map_err(|_| ChatError::NoLiveMessage)
    }

    async fn attach_images(&mut self, images: Vec<ImageElement>) -> ChatResult<()> {
        let images: Vec<_> = images
            .into_iter()
            .map(|image| json!({"name": image.name, "path": image.path}))
            .collect();
        self.tx
            .send(sse_event("images", &json!({ "images": images })))
            .await
            .map_err(|_| ChatError::NoLiveMessage)
    }
}

/// Run one conversation turn against the selected backend
///
/// The session snapshot is written back at the turn boundary whether the
/// turn succeeded or failed; only the reportable error differs.
async fn run_turn(
    state: AppState,
    request: ReplyRequest,
    tx: mpsc::Sender<String>,
) -> ChatResult<String> {
    let store = state.session(&request.session_id);
    let mut ctx = TurnContext::begin(store.as_ref());
    let result = execute_turn(&mut ctx, &state, &request, tx).await;
    ctx.finish();
    result
}

async fn execute_turn(
    ctx: &mut TurnContext<'_>,
    state: &AppState,
    request: &ReplyRequest,
    tx: mpsc::Sender<String>,
) -> ChatResult<String> {
    let elements: Vec<UploadElement> = request
        .elements
        .iter()
        .map(|element| UploadElement {
            name: element.name.clone(),
            mime: element.mime.clone(),
            path: element.path.clone(),
        })
        .collect();

    let converter = PlainTextConverter;
    let messages = append_message(ctx, Role::User, &request.message, &elements, &converter)?;

    let mut live = ChannelMessage { tx };
    let response = if ctx.settings.model_provider == AGENT_PROVIDER {
        let configs = load_model_configs();
        let llm_details = find_by_deployment(&configs, &ctx.profile)
            .cloned()
            .unwrap_or_default();
        let endpoint = llm_details.api_endpoint.clone().ok_or_else(|| {
            ChatError::reply(
                "chat_agent",
                ChatError::Config(format!("profile {} has no api endpoint", ctx.profile)),
            )
        })?;
        let service = HttpAgentService::new(endpoint, llm_details.api_key)
            .map_err(|e| ChatError::reply("chat_agent", e))?;

        chat_agent(ctx, &service, &mut live, &request.message).await?
    } else {
        let provider = HttpProvider::new(state.completions_host.clone())
            .map_err(|e| ChatError::reply("chat_completion", e))?;

        chat_completion(ctx, &provider, &mut live, &messages, false).await?
    };

    // Save the complete exchange back to the session
    append_message(ctx, Role::Assistant, &response, &[], &converter)?;
    Ok(response)
}

async fn handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ReplyRequest>,
) -> Result<SseResponse, StatusCode> {
    if user_from_headers(&headers).is_none() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    // Create channel for streaming
    let (tx, rx) = mpsc::channel(100);
    let stream = ReceiverStream::new(rx);

    tokio::spawn(async move {
        match run_turn(state, request, tx.clone()).await {
            Ok(_) => {}
            Err(err) => {
                // The reportable error becomes a distinct Error-authored
                // message; no automatic retry
                tracing::error!("Error: {}", err);
                let _ = tx
                    .send(sse_event(
                        "error",
                        &json!({"author": "Error", "text": format!("An error occurred: {err}")}),
                    ))
                    .await;
            }
        }
        let _ = tx.send(sse_event("done", &json!({}))).await;
    });

    Ok(SseResponse::new(stream))
}

pub fn routes(state: AppState) -> Router {
    Router::new().route("/reply", post(handler)).with_state(state)
}
