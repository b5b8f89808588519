use async_trait::async_trait;

use crate::domain::{DomainError, Node, VectorStoreQuery, VectorStoreQueryResult};

/// Vector storage and similarity search over nodes.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Whether the store keeps node text, so query results carry content.
    fn stores_text(&self) -> bool;

    /// Store nodes with their embeddings. Returns the stored identifiers in
    /// input order.
    async fn add(&self, nodes: &[Node]) -> Result<Vec<String>, DomainError>;

    async fn delete(&self, ref_doc_id: &str) -> Result<(), DomainError>;

    async fn query(&self, query: &VectorStoreQuery) -> Result<VectorStoreQueryResult, DomainError>;
}
