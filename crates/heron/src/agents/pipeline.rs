use futures::StreamExt;

use super::content::assemble_message;
use super::events::{AgentStreamEvent, RunStatus};
use super::service::{AgentService, Annotation, ROLE_AGENT, ROLE_USER};
use crate::citations::{self, CitationSource, INTERNAL_DOC_PREFIX};
use crate::config;
use crate::errors::{ChatError, ChatResult};
use crate::live::{ImageElement, LiveMessage};
use crate::session::TurnContext;

const PIPELINE: &str = "chat_agent";

const FALLBACK_DOCUMENT_NAME: &str = "Document";

/// Generate a response from the agent service, streaming into `live`
///
/// Uploads pending attachments, creates the user message on the session's
/// thread, consumes the run-event stream for perceived responsiveness, then
/// replaces the buffer with the authoritative final message and reconciles
/// its annotations into a deduplicated Sources block. Any failure anywhere
/// is re-raised once as the reportable error for this pipeline.
pub async fn chat_agent(
    ctx: &mut TurnContext<'_>,
    service: &dyn AgentService,
    live: &mut dyn LiveMessage,
    user_input: &str,
) -> ChatResult<String> {
    run(ctx, service, live, user_input)
        .await
        .map_err(|e| ChatError::reply(PIPELINE, e))
}

async fn run(
    ctx: &mut TurnContext<'_>,
    service: &dyn AgentService,
    live: &mut dyn LiveMessage,
    user_input: &str,
) -> ChatResult<String> {
    let configs = config::load_model_configs();
    let llm_details = config::find_by_deployment(&configs, &ctx.profile)
        .cloned()
        .unwrap_or_default();
    let agent_id = llm_details.model_id.clone().ok_or_else(|| {
        ChatError::Config(format!("profile {} has no agent id", ctx.profile))
    })?;

    live.publish(&format!("[{}] thinking...", ctx.settings.model_name))
        .await?;

    let thread_id = ctx
        .thread_id
        .clone()
        .ok_or_else(|| ChatError::Config("no active thread for this session".to_string()))?;

    let assembled = assemble_message(ctx, service, user_input).await?;
    service
        .create_message(
            &thread_id,
            ROLE_USER,
            &assembled.content,
            &assembled.attachments,
        )
        .await?;

    stream_run_events(ctx, service, live, &thread_id, &agent_id).await?;

    finalize(ctx, service, live, &thread_id).await
}

/// Consume the scoped run-event stream
///
/// Deltas are for perceived responsiveness only; the authoritative text is
/// fetched afterwards. The stream is released when this function returns or
/// propagates an error, either way exactly once.
async fn stream_run_events(
    ctx: &TurnContext<'_>,
    service: &dyn AgentService,
    live: &mut dyn LiveMessage,
    thread_id: &str,
    agent_id: &str,
) -> ChatResult<()> {
    let mut stream = service.stream_run(thread_id, agent_id).await?;
    let mut buffer = String::new();
    let mut is_thinking = true;

    while let Some(event) = stream.next().await {
        match event? {
            AgentStreamEvent::MessageDelta { text } => {
                buffer.push_str(&text);
                live.publish(&buffer).await?;

                if is_thinking {
                    tracing::info!("Elapsed time: {:.2} seconds", ctx.elapsed_seconds());
                    is_thinking = false;
                }
            }
            AgentStreamEvent::RunStatus {
                status: RunStatus::Failed,
                last_error,
            } => {
                let detail = last_error.unwrap_or_else(|| "unknown run error".to_string());
                tracing::error!("Run failed. Error: {}", detail);
                return Err(ChatError::RunFailed(detail));
            }
            AgentStreamEvent::RunStatus { .. } => {
                // Intermediate states and completion need no action here
            }
            AgentStreamEvent::Error { payload } => {
                tracing::error!("An error occurred. Data: {}", payload);
                return Err(ChatError::Backend(payload));
            }
        }
    }

    Ok(())
}

async fn finalize(
    ctx: &mut TurnContext<'_>,
    service: &dyn AgentService,
    live: &mut dyn LiveMessage,
    thread_id: &str,
) -> ChatResult<String> {
    // Persist every thread message's last generated image for display
    let messages = service.list_messages(thread_id).await?;
    let mut images = Vec::new();
    for message in &messages {
        if let Some(file_id) = message.image_file_ids.last() {
            let file_name = format!("{file_id}_image_file.png");
            let path = service.save_file(file_id, &file_name).await?;
            images.push(ImageElement {
                name: file_name,
                path,
            });
        }
    }
    if !images.is_empty() {
        live.attach_images(images).await?;
    }

    let response = service
        .last_message_by_role(thread_id, ROLE_AGENT)
        .await?
        .ok_or(ChatError::MissingResponse)?;
    let text = response.text.ok_or(ChatError::MissingResponse)?;

    // The authoritative text replaces whatever the deltas accumulated
    let mut buffer = text.value.clone();
    let mut sources = Vec::new();

    for annotation in &text.annotations {
        tracing::info!("Annotation: {:?}", annotation);

        // Annotation markers are removed wherever they appear in the text
        if let Some(marker) = annotation.marker() {
            if !marker.is_empty() {
                buffer = buffer.replace(marker, "");
            }
        }

        match annotation {
            Annotation::UrlCitation { title, url, .. } => {
                if url.starts_with(INTERNAL_DOC_PREFIX) {
                    // The backend encodes uploaded-file references as
                    // doc_N pseudo-URLs; treat them as file citations
                    let external_link = citations::document_link(title);
                    sources.push(CitationSource::File {
                        name: title.clone(),
                        file_id: url.clone(),
                        external_link,
                    });
                } else {
                    sources.push(CitationSource::Url {
                        title: title.clone(),
                        url: url.clone(),
                    });
                }
            }
            Annotation::FilePath { file_id, .. } => {
                let name = resolve_file_name(ctx, file_id);
                let external_link = citations::document_link(&name);
                sources.push(CitationSource::File {
                    name,
                    file_id: file_id.clone(),
                    external_link,
                });
            }
        }
    }

    if !sources.is_empty() {
        buffer = buffer.trim().to_string();
        buffer.push_str(&citations::render_sources(&sources));
    }

    live.publish(&buffer).await?;
    Ok(buffer)
}

/// Resolve an uploaded file's display name
///
/// Order: the session's file-id cache, then the first pending upload's
/// declared name (cached for reuse), then a generic placeholder.
fn resolve_file_name(ctx: &mut TurnContext<'_>, file_id: &str) -> String {
    if let Some(name) = ctx.file_id_names.get(file_id) {
        return name.clone();
    }

    for upload in &ctx.file_uploads {
        if !upload.path.is_empty() {
            let name = if upload.name.is_empty() {
                FALLBACK_DOCUMENT_NAME.to_string()
            } else {
                upload.name.clone()
            };
            ctx.file_id_names.insert(file_id.to_string(), name.clone());
            return name;
        }
    }

    FALLBACK_DOCUMENT_NAME.to_string()
}
