use async_trait::async_trait;

use crate::application::FileReader;
use crate::domain::{DomainError, Node};

/// Splits Markdown into one document per header section.
///
/// A section starts at an ATX header line (`#` .. `######`) and runs to the next
/// one; lines inside fenced code blocks are never treated as headers. Text
/// before the first header forms its own section. Sections with no body are
/// dropped.
#[derive(Debug, Default, Clone)]
pub struct MarkdownReader;

struct Section {
    header: Option<String>,
    body: Vec<String>,
}

impl Section {
    fn into_document(self) -> Option<Node> {
        let body = self.body.join("\n").trim().to_string();
        if body.is_empty() {
            return None;
        }
        match self.header {
            Some(header) => {
                let title = header.trim_start_matches('#').trim().to_string();
                Some(Node::document(format!("{}\n{}", header, body)).with_metadata("header", title))
            }
            None => Some(Node::document(body)),
        }
    }
}

impl MarkdownReader {
    pub fn new() -> Self {
        Self
    }

    fn is_header(line: &str) -> bool {
        let level = line.chars().take_while(|c| *c == '#').count();
        (1..=6).contains(&level)
            && line[level..]
                .chars()
                .next()
                .map_or(true, |c| c == ' ' || c == '\t')
    }

    fn split_sections(text: &str) -> Vec<Node> {
        let mut documents = Vec::new();
        let mut current = Section {
            header: None,
            body: Vec::new(),
        };
        let mut in_fence = false;

        for line in text.lines() {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
            }

            if !in_fence && Self::is_header(line) {
                let finished = std::mem::replace(
                    &mut current,
                    Section {
                        header: Some(line.trim_end().to_string()),
                        body: Vec::new(),
                    },
                );
                documents.extend(finished.into_document());
            } else {
                current.body.push(line.to_string());
            }
        }
        documents.extend(current.into_document());

        documents
    }
}

#[async_trait]
impl FileReader for MarkdownReader {
    async fn load_data_as_content(&self, content: &[u8]) -> Result<Vec<Node>, DomainError> {
        let text = String::from_utf8_lossy(content);
        Ok(Self::split_sections(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_splits_on_headers() {
        let markdown = "intro line\n\n# Title\nbody one\n## Sub\nbody two\n";

        let docs = MarkdownReader::new()
            .load_data_as_content(markdown.as_bytes())
            .await
            .unwrap();

        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].text(), "intro line");
        assert_eq!(docs[1].text(), "# Title\nbody one");
        assert_eq!(docs[1].metadata()["header"], json!("Title"));
        assert_eq!(docs[2].text(), "## Sub\nbody two");
    }

    #[tokio::test]
    async fn test_ignores_hashes_in_code_fences_and_empty_sections() {
        let markdown = "# Empty\n# Code\n```sh\n# not a header\n```\n#hashtag\n";

        let docs = MarkdownReader::new()
            .load_data_as_content(markdown.as_bytes())
            .await
            .unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text(), "# Code\n```sh\n# not a header\n```\n#hashtag");
    }
}
