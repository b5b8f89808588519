use async_trait::async_trait;

use crate::domain::{DomainError, Node};

/// Turns the raw bytes of one file into zero or more documents.
#[async_trait]
pub trait FileReader: Send + Sync {
    async fn load_data_as_content(&self, content: &[u8]) -> Result<Vec<Node>, DomainError>;
}
