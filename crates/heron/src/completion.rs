//! Direct-completion pipeline: parameter building and stream consumption
//! for the hosted multi-provider chat endpoints.

use futures::StreamExt;
use serde_json::{json, Value};

use crate::config;
use crate::errors::{ChatError, ChatResult};
use crate::live::LiveMessage;
use crate::models::message::{messages_to_spec, Message};
use crate::providers::base::Provider;
use crate::session::TurnContext;

const PIPELINE: &str = "chat_completion";

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Models that reject a temperature parameter
const TEMPERATURE_EXCLUDED: [&str; 1] = ["o3-mini"];

fn search_web_tools() -> Value {
    json!([
        {
            "type": "function",
            "function": {
                "name": "search_web",
                "description": "Search the web using SERP API",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "The search query"}
                    },
                    "required": ["query"]
                }
            }
        }
    ])
}

/// Build the provider call specification for the current turn
///
/// The model configuration list is re-read on every call; a profile with no
/// matching entry yields an empty descriptor and the downstream call is what
/// fails. The message list is passed through without shape validation.
pub fn build_chat_parameters(
    ctx: &TurnContext<'_>,
    messages: &[Message],
    use_tools: bool,
) -> Value {
    let configs = config::load_model_configs();
    let llm_details = config::find_by_deployment(&configs, &ctx.profile)
        .cloned()
        .unwrap_or_default();

    let mut params = json!({
        "model": ctx.profile,
        "messages": messages_to_spec(messages),
        "stream": true,
    });
    let object = params.as_object_mut().unwrap();

    // Only add api_key if the descriptor carries one
    if let Some(api_key) = &llm_details.api_key {
        object.insert("api_key".to_string(), json!(api_key));
    }

    if ctx.settings.model_provider == "azure" {
        if let Some(api_version) = &llm_details.api_version {
            object.insert("api_version".to_string(), json!(api_version));
        }
        if let Some(api_endpoint) = &llm_details.api_endpoint {
            object.insert("api_base".to_string(), json!(api_endpoint));
        }
        // Some deployments reject a temperature parameter
        if !TEMPERATURE_EXCLUDED.contains(&ctx.settings.model_name.as_str()) {
            object.insert("temperature".to_string(), json!(ctx.settings.temperature));
        }
    } else {
        object.insert("temperature".to_string(), json!(ctx.settings.temperature));
    }

    if use_tools {
        object.insert("tools".to_string(), search_web_tools());
    }

    params
}

/// Generate a response from the configured provider, streaming into `live`
///
/// Returns the final assistant text. Any failure is re-raised as the single
/// reportable error for this pipeline; partial text already published stays
/// visible.
pub async fn chat_completion(
    ctx: &mut TurnContext<'_>,
    provider: &dyn Provider,
    live: &mut dyn LiveMessage,
    messages: &[Message],
    use_tools: bool,
) -> ChatResult<String> {
    run(ctx, provider, live, messages, use_tools)
        .await
        .map_err(|e| ChatError::reply(PIPELINE, e))
}

async fn run(
    ctx: &mut TurnContext<'_>,
    provider: &dyn Provider,
    live: &mut dyn LiveMessage,
    messages: &[Message],
    use_tools: bool,
) -> ChatResult<String> {
    live.publish(&format!("[{}] thinking...", ctx.settings.model_name))
        .await?;

    let params = build_chat_parameters(ctx, messages, use_tools);
    tracing::info!("Chat parameters: {}", params);

    let mut stream = provider.stream_chat(&params).await?;
    let mut buffer = String::new();
    let mut is_thinking = true;
    let mut last_citations: Option<Vec<String>> = None;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;

        if is_thinking {
            is_thinking = false;
            tracing::info!("Elapsed time: {:.2} seconds", ctx.elapsed_seconds());
        }

        if let Some(content) = chunk.delta_content() {
            if !content.is_empty() {
                buffer.push_str(content);
                live.publish(&buffer).await?;
            }
        }

        // Citations are not merged across chunks; the last bearer wins
        if chunk.citations.is_some() {
            last_citations = chunk.citations;
        }
    }
    tracing::info!("Last citations: {:?}", last_citations);

    if let Some(citations) = &last_citations {
        buffer.push_str("\n\n**Sources:**");
        // One flat list from a single chunk, rendered verbatim
        for citation in citations {
            buffer.push_str(&format!("\n[{citation}]({citation})"));
        }
    }

    // Drop a leading thinking block, keeping only the trailing text
    if buffer.starts_with(THINK_OPEN) {
        buffer = buffer
            .split(THINK_CLOSE)
            .last()
            .unwrap_or_default()
            .trim()
            .to_string();
    }

    live.publish(&buffer).await?;
    Ok(buffer)
}
