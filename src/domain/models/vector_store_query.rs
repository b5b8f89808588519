use serde::{Deserialize, Serialize};

use super::{MetadataFilters, Node};

pub const DEFAULT_SIMILARITY_TOP_K: usize = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreQuery {
    query_embedding: Option<Vec<f32>>,
    similarity_top_k: usize,
    filters: Option<MetadataFilters>,
    query_str: Option<String>,
}

impl VectorStoreQuery {
    pub fn new() -> Self {
        Self {
            query_embedding: None,
            similarity_top_k: DEFAULT_SIMILARITY_TOP_K,
            filters: None,
            query_str: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.query_embedding = Some(embedding);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        // Ensure at least 1 result is requested
        self.similarity_top_k = top_k.max(1);
        self
    }

    pub fn with_filters(mut self, filters: MetadataFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn with_query_str(mut self, query: impl Into<String>) -> Self {
        self.query_str = Some(query.into());
        self
    }

    pub fn query_embedding(&self) -> Option<&[f32]> {
        self.query_embedding.as_deref()
    }

    pub fn similarity_top_k(&self) -> usize {
        self.similarity_top_k
    }

    pub fn filters(&self) -> Option<&MetadataFilters> {
        self.filters.as_ref()
    }

    pub fn query_str(&self) -> Option<&str> {
        self.query_str.as_deref()
    }
}

impl Default for VectorStoreQuery {
    fn default() -> Self {
        Self::new()
    }
}

/// Rank-aligned query output: `ids[i]`, `nodes[i]` and `similarities[i]`
/// describe the same hit.
#[derive(Debug, Clone, Default)]
pub struct VectorStoreQueryResult {
    pub nodes: Vec<Node>,
    pub ids: Vec<String>,
    pub similarities: Vec<f32>,
}

impl VectorStoreQueryResult {
    pub fn push(&mut self, id: String, node: Node, similarity: f32) {
        self.ids.push(id);
        self.nodes.push(node);
        self.similarities.push(similarity);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let query = VectorStoreQuery::new()
            .with_embedding(vec![0.1, 0.2])
            .with_top_k(0)
            .with_query_str("what");

        assert_eq!(query.similarity_top_k(), 1);
        assert_eq!(query.query_embedding(), Some(&[0.1, 0.2][..]));
        assert_eq!(query.query_str(), Some("what"));
        assert!(query.filters().is_none());
        assert_eq!(VectorStoreQuery::default().similarity_top_k(), DEFAULT_SIMILARITY_TOP_K);
    }
}
