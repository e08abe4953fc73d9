use std::collections::HashSet;

/// Prefix the agent backend uses to encode uploaded-file references as
/// pseudo-URLs inside url-citation annotations
pub const INTERNAL_DOC_PREFIX: &str = "doc_";

/// Environment override for the external document-repository base path
pub const DOCS_BASE_URL_ENV: &str = "HERON_DOCS_BASE_URL";

const DEFAULT_DOCS_BASE_URL: &str = "https://docs.example.com/assistant/files/";

/// A normalized annotation, ready for rendering in the Sources block
#[derive(Debug, Clone, PartialEq)]
pub enum CitationSource {
    Url {
        title: String,
        url: String,
    },
    File {
        name: String,
        file_id: String,
        external_link: Option<String>,
    },
}

impl CitationSource {
    /// Deduplication key: `(type, title_or_name, url_or_link)`
    fn dedup_key(&self) -> (u8, &str, Option<&str>) {
        match self {
            CitationSource::Url { title, url } => (0, title, Some(url)),
            CitationSource::File {
                name,
                external_link,
                ..
            } => (1, name, external_link.as_deref()),
        }
    }

    fn render_line(&self) -> String {
        match self {
            CitationSource::Url { title, url } => format!("\n- [{title}]({url})"),
            CitationSource::File {
                name,
                file_id,
                external_link,
            } => match external_link {
                Some(link) => format!("\n- 📄 [{name}]({link})"),
                None => format!("\n- 📄 **{name}** (File ID: `{file_id}`)"),
            },
        }
    }
}

/// Synthesize an external document-repository link for an uploaded file
///
/// The display name is percent-encoded onto a fixed base path, overridable
/// via `HERON_DOCS_BASE_URL`. Failures degrade to `None` so a single bad
/// citation never aborts the turn.
pub fn document_link(name: &str) -> Option<String> {
    let base =
        std::env::var(DOCS_BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_DOCS_BASE_URL.to_string());
    if base.trim().is_empty() {
        tracing::error!("Failed to generate document link for {}: empty base path", name);
        return None;
    }

    let encoded = urlencoding::encode(name);
    let link = format!("{base}{encoded}");
    tracing::info!("Generated document link for {}: {}", name, link);
    Some(link)
}

/// Render the deduplicated Sources block, in first-seen order
///
/// Returns an empty string when there is nothing to cite.
pub fn render_sources(sources: &[CitationSource]) -> String {
    if sources.is_empty() {
        return String::new();
    }

    let mut seen: HashSet<(u8, String, Option<String>)> = HashSet::new();
    let mut block = "\n\n**Sources:**".to_string();

    for source in sources {
        let (kind, name, link) = source.dedup_key();
        let key = (kind, name.to_string(), link.map(str::to_string));
        if seen.insert(key) {
            block.push_str(&source.render_line());
        }
    }

    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn url(title: &str, url: &str) -> CitationSource {
        CitationSource::Url {
            title: title.to_string(),
            url: url.to_string(),
        }
    }

    fn file(name: &str, file_id: &str, link: Option<&str>) -> CitationSource {
        CitationSource::File {
            name: name.to_string(),
            file_id: file_id.to_string(),
            external_link: link.map(str::to_string),
        }
    }

    #[test]
    fn test_render_url_and_file_lines() {
        let block = render_sources(&[
            url("Doc", "https://ex.com"),
            file("report.pdf", "doc_0", Some("https://docs/report.pdf")),
            file("notes.txt", "file_9", None),
        ]);
        assert!(block.starts_with("\n\n**Sources:**"));
        assert!(block.contains("\n- [Doc](https://ex.com)"));
        assert!(block.contains("\n- 📄 [report.pdf](https://docs/report.pdf)"));
        assert!(block.contains("\n- 📄 **notes.txt** (File ID: `file_9`)"));
    }

    #[test]
    fn test_dedup_keeps_first_seen_order() {
        let block = render_sources(&[
            url("B", "https://b.com"),
            url("A", "https://a.com"),
            url("B", "https://b.com"),
        ]);
        let first = block.find("[B](https://b.com)").unwrap();
        let second = block.find("[A](https://a.com)").unwrap();
        assert!(first < second);
        assert_eq!(block.matches("[B](https://b.com)").count(), 1);
    }

    #[test]
    fn test_same_name_different_link_is_not_deduped() {
        let block = render_sources(&[
            file("report.pdf", "doc_0", Some("https://docs/a")),
            file("report.pdf", "doc_1", Some("https://docs/b")),
        ]);
        assert_eq!(block.matches("📄").count(), 2);
    }

    #[test]
    fn test_empty_sources_render_nothing() {
        assert_eq!(render_sources(&[]), "");
    }

    #[test]
    #[serial]
    fn test_document_link_percent_encodes() {
        std::env::set_var(DOCS_BASE_URL_ENV, "https://docs.internal/files/");
        let link = document_link("Q3 Report.pdf").unwrap();
        assert_eq!(link, "https://docs.internal/files/Q3%20Report.pdf");
        std::env::remove_var(DOCS_BASE_URL_ENV);
    }

    #[test]
    #[serial]
    fn test_document_link_empty_base_degrades() {
        std::env::set_var(DOCS_BASE_URL_ENV, "");
        assert!(document_link("report.pdf").is_none());
        std::env::remove_var(DOCS_BASE_URL_ENV);
    }
}
