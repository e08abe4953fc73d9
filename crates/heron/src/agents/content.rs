use std::path::Path;

use super::service::{AgentService, Attachment, ContentBlock, IMAGE_DETAIL_HIGH};
use crate::errors::ChatResult;
use crate::session::TurnContext;

/// Content blocks and attachments for one outbound agent message
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledMessage {
    pub content: Vec<ContentBlock>,
    pub attachments: Vec<Attachment>,
}

/// Build the content-block and attachment lists for one agent message
///
/// Baseline blocks are the user's input followed by one text block per
/// previously extracted file content. Every pending upload with a path is
/// uploaded to the service and attached with the code-interpreter
/// capability; an upload failure fails the whole operation. Image uploads
/// each add one high-detail image-file block after the baseline.
pub async fn assemble_message(
    ctx: &TurnContext<'_>,
    service: &dyn AgentService,
    user_input: &str,
) -> ChatResult<AssembledMessage> {
    let mut content = vec![ContentBlock::text(user_input)];
    for file_content in &ctx.file_contents {
        content.push(ContentBlock::text(file_content));
    }

    let mut attachments = Vec::new();
    for upload in &ctx.file_uploads {
        tracing::info!("File upload: {:?}", upload);
        if upload.path.is_empty() {
            continue;
        }

        let file_id = service.upload_file(Path::new(&upload.path)).await?;
        tracing::info!("File ID: {}", file_id);
        attachments.push(Attachment::code_interpreter(&file_id));

        if upload.mime.starts_with("image/") {
            content.push(ContentBlock::image_file(&file_id, IMAGE_DETAIL_HIGH));
        }
    }

    tracing::debug!("Content blocks: {:?}", content);
    tracing::debug!("Attachments: {:?}", attachments);
    Ok(AssembledMessage {
        content,
        attachments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::mock::MockAgentService;
    use crate::errors::ChatError;
    use crate::session::tests::MemoryStore;
    use crate::session::{FileUpload, TurnContext};

    fn upload(name: &str, mime: &str, path: &str) -> FileUpload {
        FileUpload {
            name: name.to_string(),
            mime: mime.to_string(),
            path: path.to_string(),
            base64: None,
        }
    }

    #[tokio::test]
    async fn test_baseline_blocks_without_uploads() {
        let store = MemoryStore::default();
        let mut ctx = TurnContext::begin(&store);
        ctx.file_contents = vec!["<file_name:notes.txt>notes</file_name:notes.txt>".to_string()];
        let service = MockAgentService::new();

        let assembled = assemble_message(&ctx, &service, "summarize this")
            .await
            .unwrap();
        assert_eq!(assembled.content.len(), 2);
        assert_eq!(assembled.content[0], ContentBlock::text("summarize this"));
        assert!(assembled.attachments.is_empty());
    }

    #[tokio::test]
    async fn test_image_upload_yields_exactly_two_blocks() {
        let store = MemoryStore::default();
        let mut ctx = TurnContext::begin(&store);
        ctx.file_uploads = vec![upload("photo.png", "image/png", "/tmp/photo.png")];
        let service = MockAgentService::new();

        let assembled = assemble_message(&ctx, &service, "what is this?")
            .await
            .unwrap();
        assert_eq!(assembled.content.len(), 2);
        assert_eq!(assembled.content[0], ContentBlock::text("what is this?"));
        assert!(matches!(
            assembled.content[1],
            ContentBlock::ImageFile { .. }
        ));
        assert_eq!(assembled.attachments.len(), 1);
    }

    #[tokio::test]
    async fn test_multiple_images_each_get_a_block() {
        let store = MemoryStore::default();
        let mut ctx = TurnContext::begin(&store);
        ctx.file_uploads = vec![
            upload("a.png", "image/png", "/tmp/a.png"),
            upload("b.png", "image/png", "/tmp/b.png"),
        ];
        let service = MockAgentService::new();

        let assembled = assemble_message(&ctx, &service, "compare").await.unwrap();
        let image_blocks = assembled
            .content
            .iter()
            .filter(|block| matches!(block, ContentBlock::ImageFile { .. }))
            .count();
        assert_eq!(image_blocks, 2);
        assert_eq!(assembled.attachments.len(), 2);
    }

    #[tokio::test]
    async fn test_document_upload_is_attached_without_image_block() {
        let store = MemoryStore::default();
        let mut ctx = TurnContext::begin(&store);
        ctx.file_uploads = vec![upload("report.pdf", "application/pdf", "/tmp/report.pdf")];
        let service = MockAgentService::new();

        let assembled = assemble_message(&ctx, &service, "analyze").await.unwrap();
        assert_eq!(assembled.content.len(), 1);
        assert_eq!(assembled.attachments.len(), 1);
        assert_eq!(assembled.attachments[0].tools[0].kind, "code_interpreter");
    }

    #[tokio::test]
    async fn test_pathless_upload_is_skipped() {
        let store = MemoryStore::default();
        let mut ctx = TurnContext::begin(&store);
        ctx.file_uploads = vec![upload("ghost.png", "image/png", "")];
        let service = MockAgentService::new();

        let assembled = assemble_message(&ctx, &service, "hi").await.unwrap();
        assert_eq!(assembled.content.len(), 1);
        assert!(assembled.attachments.is_empty());
    }

    #[tokio::test]
    async fn test_upload_failure_fails_the_whole_operation() {
        let store = MemoryStore::default();
        let mut ctx = TurnContext::begin(&store);
        ctx.file_uploads = vec![upload("a.pdf", "application/pdf", "/tmp/a.pdf")];
        let service = MockAgentService::new()
            .with_upload_error(ChatError::Backend("upload rejected".to_string()));

        let err = assemble_message(&ctx, &service, "hi").await.err().unwrap();
        assert!(err.to_string().contains("upload rejected"));
    }
}
