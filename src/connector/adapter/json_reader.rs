use async_trait::async_trait;
use serde_json::Value;

use crate::application::FileReader;
use crate::domain::{DomainError, Node};

/// Reads JSON: a top-level array gives one document per element, anything
/// else a single document. Text is the pretty-printed value.
#[derive(Debug, Default, Clone)]
pub struct JsonReader;

impl JsonReader {
    pub fn new() -> Self {
        Self
    }

    fn to_document(value: &Value) -> Result<Node, DomainError> {
        let text = serde_json::to_string_pretty(value)
            .map_err(|e| DomainError::internal(format!("Failed to render JSON: {}", e)))?;
        Ok(Node::document(text))
    }
}

#[async_trait]
impl FileReader for JsonReader {
    async fn load_data_as_content(&self, content: &[u8]) -> Result<Vec<Node>, DomainError> {
        let value: Value = serde_json::from_slice(content)
            .map_err(|e| DomainError::invalid_input(format!("Invalid JSON: {}", e)))?;

        match &value {
            Value::Array(items) => items.iter().map(Self::to_document).collect(),
            other => Ok(vec![Self::to_document(other)?]),
        }
    }
}
