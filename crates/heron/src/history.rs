use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::path::Path;

use crate::errors::{ChatError, ChatResult};
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::session::{FileUpload, TurnContext};

/// Number of history entries kept after an assistant turn completes
const HISTORY_LIMIT: usize = 10;

/// Converts an uploaded document to text before it joins the prompt
///
/// The real markdown conversion is an external collaborator; this seam lets
/// the enclosing application plug one in.
pub trait DocumentConverter: Send + Sync {
    fn convert(&self, path: &Path) -> ChatResult<String>;
}

/// An attachment on an incoming chat message
#[derive(Debug, Clone, PartialEq)]
pub struct UploadElement {
    pub name: String,
    pub mime: String,
    pub path: String,
}

/// Append a message to the session history and return the outbound list
///
/// User attachments fan out by MIME type: images become base64 data-URL
/// parts (and pending uploads for the agent pipeline), everything else goes
/// through the converter and is recorded as extracted file text wrapped in
/// `<file_name:…>` markers. The returned list is always prefixed by exactly
/// one system message built from the current instructions.
pub fn append_message(
    ctx: &mut TurnContext<'_>,
    role: Role,
    content: &str,
    elements: &[UploadElement],
    converter: &dyn DocumentConverter,
) -> ChatResult<Vec<Message>> {
    let mut parts = vec![MessageContent::text(content)];
    let mut file_contents = Vec::new();
    let mut file_uploads = Vec::new();

    if role == Role::User {
        for element in elements {
            tracing::info!("Uploaded file: {} ({})", element.name, element.mime);

            let mut image_base64 = None;
            if element.mime.starts_with("image/") {
                let bytes = std::fs::read(&element.path).map_err(|e| {
                    ChatError::Backend(format!("failed to read {}: {e}", element.path))
                })?;
                let data_url = format!("data:{};base64,{}", element.mime, BASE64.encode(bytes));
                parts.push(MessageContent::image_url(&data_url));
                image_base64 = Some(data_url);
            } else {
                let text = converter.convert(Path::new(&element.path))?;
                file_contents.push(format!(
                    "<file_name:{0}>{1}</file_name:{0}>",
                    element.name, text
                ));
            }

            file_uploads.push(FileUpload {
                name: element.name.clone(),
                mime: element.mime.clone(),
                path: element.path.clone(),
                base64: image_base64,
            });
        }
    }

    // Each append replaces the pending upload state, so an assistant turn
    // clears what the preceding user turn recorded
    ctx.file_uploads = file_uploads;
    ctx.file_contents = file_contents.clone();

    if !file_contents.is_empty() {
        parts.push(MessageContent::text(file_contents.join("\n\n")));
    }

    let mut message = Message::new(role);
    message.content = parts;
    tracing::info!("[{}]: {} part(s)", role.as_str(), message.content.len());
    ctx.chat_history.push(message);

    // Prune to the most recent entries once an exchange completes
    if role == Role::Assistant && ctx.chat_history.len() > HISTORY_LIMIT {
        let excess = ctx.chat_history.len() - HISTORY_LIMIT;
        ctx.chat_history.drain(..excess);
    }

    let mut messages = vec![Message::system().with_text(&ctx.settings.instructions)];
    messages.extend(ctx.chat_history.iter().cloned());
    Ok(messages)
}
