use async_trait::async_trait;

use crate::application::FileReader;
use crate::domain::{DomainError, Node};

/// Placeholder registered for `.zip` files to show how extra formats plug in.
/// Always fails.
#[derive(Debug, Default, Clone)]
pub struct ZipReader;

impl ZipReader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileReader for ZipReader {
    async fn load_data_as_content(&self, _content: &[u8]) -> Result<Vec<Node>, DomainError> {
        Err(DomainError::not_implemented("zip reader"))
    }
}
