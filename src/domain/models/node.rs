use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::DomainError;

/// Concrete node flavour, persisted alongside the node so it can be rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NodeKind {
    #[default]
    #[serde(rename = "TextNode")]
    Text,
    Document,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Text => "TextNode",
            NodeKind::Document => "Document",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TextNode" | "TEXT" => Some(NodeKind::Text),
            "Document" | "DOCUMENT" => Some(NodeKind::Document),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which metadata, if any, is rendered in front of the node text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataMode {
    All,
    Embed,
    Llm,
    None,
}

fn new_node_id() -> String {
    Uuid::new_v4().to_string()
}

/// A retrievable unit of content: text, an optional embedding and free-form
/// metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "id_", default = "new_node_id")]
    pub id: String,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub excluded_embed_metadata_keys: Vec<String>,
    #[serde(default)]
    pub excluded_llm_metadata_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_doc_id: Option<String>,
}

impl Node {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: new_node_id(),
            kind: NodeKind::Text,
            text: text.into(),
            embedding: None,
            metadata: Map::new(),
            excluded_embed_metadata_keys: Vec::new(),
            excluded_llm_metadata_keys: Vec::new(),
            ref_doc_id: None,
        }
    }

    /// A node produced directly by a reader.
    pub fn document(text: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Document,
            ..Self::new(text)
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_ref_doc_id(mut self, ref_doc_id: impl Into<String>) -> Self {
        self.ref_doc_id = Some(ref_doc_id.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn ref_doc_id(&self) -> Option<&str> {
        self.ref_doc_id.as_deref()
    }

    pub fn embedding(&self) -> Result<&[f32], DomainError> {
        self.embedding
            .as_deref()
            .ok_or_else(|| DomainError::invalid_input(format!("Embedding not set for node {}", self.id)))
    }

    pub fn set_content(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn get_metadata_str(&self, mode: MetadataMode) -> String {
        let excluded: &[String] = match mode {
            MetadataMode::All => &[],
            MetadataMode::Embed => &self.excluded_embed_metadata_keys,
            MetadataMode::Llm => &self.excluded_llm_metadata_keys,
            MetadataMode::None => return String::new(),
        };

        self.metadata
            .iter()
            .filter(|(key, _)| !excluded.contains(key))
            .map(|(key, value)| match value {
                Value::String(s) => format!("{}: {}", key, s),
                other => format!("{}: {}", key, other),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Node text, prefixed by the metadata selected by `mode`.
    pub fn get_content(&self, mode: MetadataMode) -> String {
        let metadata_str = self.get_metadata_str(mode);
        if metadata_str.is_empty() {
            self.text.clone()
        } else {
            format!("{}\n\n{}", metadata_str, self.text)
        }
    }
}
