//! Flattening of a [`Node`] into a metadata map suitable for a vector store
//! record, and the reverse reconstruction.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Node, NodeKind};
use crate::domain::DomainError;

pub const NODE_CONTENT_KEY: &str = "_node_content";
pub const NODE_TYPE_KEY: &str = "_node_type";
const REF_DOC_KEYS: [&str; 3] = ["document_id", "doc_id", "ref_doc_id"];
const NO_REF_DOC: &str = "None";

/// Serialized node body stored under `_node_content`. Metadata and embedding
/// live in the record itself and are never duplicated here.
#[derive(Debug, Serialize, Deserialize)]
struct NodeContent {
    #[serde(rename = "id_")]
    id: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    excluded_embed_metadata_keys: Vec<String>,
    #[serde(default)]
    excluded_llm_metadata_keys: Vec<String>,
    #[serde(default)]
    ref_doc_id: Option<String>,
}

/// Raw identifier and text used when a record carries no usable
/// `_node_content`.
#[derive(Debug, Clone)]
pub struct NodeFallback {
    pub id: String,
    pub text: String,
}

fn is_reserved_key(key: &str) -> bool {
    key == NODE_CONTENT_KEY || key == NODE_TYPE_KEY || REF_DOC_KEYS.contains(&key)
}

fn validate_is_flat(metadata: &Map<String, Value>) -> Result<(), DomainError> {
    for (key, value) in metadata {
        if value.is_object() || value.is_array() {
            return Err(DomainError::invalid_input(format!(
                "Value for metadata {} must be one of (string, number, boolean, null)",
                key
            )));
        }
    }
    Ok(())
}

pub fn node_to_metadata(
    node: &Node,
    remove_text: bool,
    flat: bool,
) -> Result<Map<String, Value>, DomainError> {
    if flat {
        validate_is_flat(&node.metadata)?;
    }
    if let Some(key) = node.metadata.keys().find(|key| is_reserved_key(key)) {
        return Err(DomainError::invalid_input(format!(
            "Metadata key {} of node {} is reserved for node reconstruction",
            key, node.id
        )));
    }

    let content = NodeContent {
        id: node.id.clone(),
        text: if remove_text {
            String::new()
        } else {
            node.text.clone()
        },
        excluded_embed_metadata_keys: node.excluded_embed_metadata_keys.clone(),
        excluded_llm_metadata_keys: node.excluded_llm_metadata_keys.clone(),
        ref_doc_id: node.ref_doc_id.clone(),
    };
    let node_content = serde_json::to_string(&content)
        .map_err(|e| DomainError::internal(format!("Failed to serialize node content: {}", e)))?;

    let mut metadata = node.metadata.clone();
    metadata.insert(NODE_CONTENT_KEY.to_string(), Value::String(node_content));
    metadata.insert(
        NODE_TYPE_KEY.to_string(),
        Value::String(node.kind.as_str().to_string()),
    );

    let ref_doc = node.ref_doc_id.as_deref().unwrap_or(NO_REF_DOC);
    for key in REF_DOC_KEYS {
        metadata.insert(key.to_string(), Value::String(ref_doc.to_string()));
    }

    Ok(metadata)
}

/// Rebuild a node from a stored metadata map. Reserved keys are stripped and
/// the remainder becomes the node's metadata. Falls back to `fallback` when
/// `_node_content` is missing or cannot be parsed.
pub fn metadata_dict_to_node(
    mut metadata: Map<String, Value>,
    fallback: Option<NodeFallback>,
) -> Result<Node, DomainError> {
    let node_content = metadata.remove(NODE_CONTENT_KEY);
    let node_type = metadata.remove(NODE_TYPE_KEY);
    let stored_ref_doc = metadata
        .get("ref_doc_id")
        .and_then(Value::as_str)
        .filter(|id| *id != NO_REF_DOC)
        .map(str::to_string);
    for key in REF_DOC_KEYS {
        metadata.remove(key);
    }

    let kind = node_type
        .as_ref()
        .and_then(Value::as_str)
        .and_then(NodeKind::parse)
        .unwrap_or_default();

    let parsed = node_content
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|raw| serde_json::from_str::<NodeContent>(raw).ok());

    match (parsed, fallback) {
        (Some(content), _) => Ok(Node {
            id: content.id,
            kind,
            text: content.text,
            embedding: None,
            metadata,
            excluded_embed_metadata_keys: content.excluded_embed_metadata_keys,
            excluded_llm_metadata_keys: content.excluded_llm_metadata_keys,
            ref_doc_id: content.ref_doc_id,
        }),
        (None, Some(fallback)) => Ok(Node {
            id: fallback.id,
            kind,
            text: fallback.text,
            embedding: None,
            metadata,
            excluded_embed_metadata_keys: Vec::new(),
            excluded_llm_metadata_keys: Vec::new(),
            ref_doc_id: stored_ref_doc,
        }),
        (None, None) => Err(DomainError::invalid_input(
            "Node content not found in metadata",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_to_metadata_adds_reserved_keys() {
        let node = Node::document("some text")
            .with_id("n1")
            .with_metadata("author", "ann")
            .with_ref_doc_id("doc-7");

        let metadata = node_to_metadata(&node, true, true).unwrap();

        assert_eq!(metadata["author"], json!("ann"));
        assert_eq!(metadata[NODE_TYPE_KEY], json!("Document"));
        assert_eq!(metadata["doc_id"], json!("doc-7"));
        assert_eq!(metadata["document_id"], json!("doc-7"));

        let content: Value =
            serde_json::from_str(metadata[NODE_CONTENT_KEY].as_str().unwrap()).unwrap();
        assert_eq!(content["id_"], json!("n1"));
        assert_eq!(content["text"], json!(""));
        assert!(content.get("metadata").is_none());
    }

    #[test]
    fn test_flat_metadata_rejects_nested_values() {
        let node = Node::new("x").with_metadata("tags", json!({"a": 1}));

        let err = node_to_metadata(&node, false, true).unwrap_err();
        assert!(err.to_string().contains("tags"));

        let nested = node_to_metadata(&node, false, false).unwrap();
        assert_eq!(nested["tags"], json!({"a": 1}));
    }

    #[test]
    fn test_reserved_metadata_keys_are_rejected() {
        for key in [NODE_CONTENT_KEY, NODE_TYPE_KEY, "document_id", "doc_id", "ref_doc_id"] {
            let node = Node::new("x").with_id("n").with_metadata(key, "user value");

            let err = node_to_metadata(&node, false, true).unwrap_err();

            assert!(
                matches!(err, DomainError::InvalidInput(ref m) if m.contains(key)),
                "{} should be reserved",
                key
            );
        }
    }

    #[test]
    fn test_rebuild_from_node_content() {
        let node = Node::new("original")
            .with_id("n2")
            .with_metadata("page", 4);
        let metadata = node_to_metadata(&node, false, true).unwrap();

        let rebuilt = metadata_dict_to_node(metadata, None).unwrap();

        assert_eq!(rebuilt.id(), "n2");
        assert_eq!(rebuilt.text(), "original");
        assert_eq!(rebuilt.kind(), NodeKind::Text);
        assert_eq!(rebuilt.ref_doc_id(), None);
        assert_eq!(rebuilt.metadata().len(), 1);
        assert_eq!(rebuilt.metadata()["page"], json!(4));
    }

    #[test]
    fn test_malformed_content_uses_fallback() {
        let mut metadata = Map::new();
        metadata.insert(NODE_CONTENT_KEY.to_string(), json!("{not json"));
        metadata.insert("ref_doc_id".to_string(), json!("parent"));
        metadata.insert("color".to_string(), json!("red"));

        let node = metadata_dict_to_node(
            metadata,
            Some(NodeFallback {
                id: "raw-id".to_string(),
                text: "raw text".to_string(),
            }),
        )
        .unwrap();

        assert_eq!(node.id(), "raw-id");
        assert_eq!(node.text(), "raw text");
        assert_eq!(node.ref_doc_id(), Some("parent"));
        assert_eq!(node.metadata().len(), 1);
    }

    #[test]
    fn test_missing_content_without_fallback_fails() {
        let err = metadata_dict_to_node(Map::new(), None).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }
}
