use async_trait::async_trait;

use crate::application::FileReader;
use crate::domain::{DomainError, Node};

/// Reads a whole file as one document. Invalid UTF-8 is replaced.
#[derive(Debug, Default, Clone)]
pub struct TextFileReader;

impl TextFileReader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileReader for TextFileReader {
    async fn load_data_as_content(&self, content: &[u8]) -> Result<Vec<Node>, DomainError> {
        let text = String::from_utf8_lossy(content).into_owned();
        Ok(vec![Node::document(text)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NodeKind;

    #[tokio::test]
    async fn test_reads_one_document() {
        let docs = TextFileReader::new()
            .load_data_as_content(b"plain text\nsecond line")
            .await
            .unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text(), "plain text\nsecond line");
        assert_eq!(docs[0].kind(), NodeKind::Document);
    }

    #[tokio::test]
    async fn test_lossy_utf8() {
        let docs = TextFileReader::new()
            .load_data_as_content(&[b'a', 0xff, b'b'])
            .await
            .unwrap();
        assert_eq!(docs[0].text(), "a\u{fffd}b");
    }
}
