use heron::errors::{ChatError, ChatResult};
use heron::history::DocumentConverter;
use std::path::Path;

/// Minimal document converter: passes UTF-8 text files through as-is
///
/// Rich file-to-markdown conversion is an external collaborator; this keeps
/// plain-text attachments working without one.
pub struct PlainTextConverter;

impl DocumentConverter for PlainTextConverter {
    fn convert(&self, path: &Path) -> ChatResult<String> {
        std::fs::read_to_string(path)
            .map_err(|e| ChatError::Backend(format!("failed to convert {}: {e}", path.display())))
    }
}
