use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::DomainError;

/// A document as stored in, or returned by, the Data API.
pub type JsonDocument = Map<String, Value>;

pub const VECTOR_FIELD: &str = "$vector";
pub const SIMILARITY_FIELD: &str = "$similarity";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    Euclidean,
    DotProduct,
}

impl SimilarityMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityMetric::Cosine => "cosine",
            SimilarityMetric::Euclidean => "euclidean",
            SimilarityMetric::DotProduct => "dot_product",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Some(SimilarityMetric::Cosine),
            "euclidean" => Some(SimilarityMetric::Euclidean),
            "dot_product" | "dot" => Some(SimilarityMetric::DotProduct),
            _ => None,
        }
    }
}

impl std::fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorOptions {
    pub dimension: usize,
    #[serde(default)]
    pub metric: SimilarityMetric,
}

/// Which fields the collection indexes. At most one of `allow`/`deny` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexingOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateCollectionOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<VectorOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexing: Option<IndexingOptions>,
}

impl CreateCollectionOptions {
    pub fn vector(dimension: usize, metric: SimilarityMetric) -> Self {
        Self {
            vector: Some(VectorOptions { dimension, metric }),
            indexing: None,
        }
    }

    pub fn with_indexing(mut self, indexing: IndexingOptions) -> Self {
        self.indexing = Some(indexing);
        self
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.vector.as_ref().map(|v| v.metric).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sort {
    /// Order by similarity to the given vector, most similar first.
    Vector(Vec<f32>),
    Fields(Vec<(String, SortOrder)>),
}

impl Sort {
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        match self {
            Sort::Vector(vector) => {
                map.insert(VECTOR_FIELD.to_string(), Value::from(vector.clone()));
            }
            Sort::Fields(fields) => {
                for (field, order) in fields {
                    let direction = match order {
                        SortOrder::Ascending => 1,
                        SortOrder::Descending => -1,
                    };
                    map.insert(field.clone(), Value::from(direction));
                }
            }
        }
        Value::Object(map)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Option<Sort>,
    pub projection: Option<JsonDocument>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
    pub include_similarity: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteOneOptions {
    pub sort: Option<Sort>,
}

/// One `find` command. `page_state` is `None` for the first page.
#[derive(Debug, Clone, PartialEq)]
pub struct FindRequest {
    pub filter: JsonDocument,
    pub options: FindOptions,
    pub page_state: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FindPage {
    pub documents: Vec<JsonDocument>,
    pub next_page_state: Option<String>,
}

/// Transport for the Astra DB Data API commands used by the vector store.
///
/// Implementors own network, serialization and authentication. Errors are
/// surfaced as [`DomainError::Remote`] with the server's message and are never
/// retried here.
#[async_trait]
pub trait DataApi: Send + Sync {
    async fn create_collection(
        &self,
        name: &str,
        options: &CreateCollectionOptions,
    ) -> Result<(), DomainError>;

    /// Insert documents in one command. Returns the inserted ids in input
    /// order.
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<JsonDocument>,
    ) -> Result<Vec<Value>, DomainError>;

    /// Delete the first document matching `filter`. Returns the deleted count.
    async fn delete_one(
        &self,
        collection: &str,
        filter: JsonDocument,
        options: &DeleteOneOptions,
    ) -> Result<u64, DomainError>;

    async fn find_page(
        &self,
        collection: &str,
        request: &FindRequest,
    ) -> Result<FindPage, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sort_to_json() {
        assert_eq!(
            Sort::Vector(vec![1.0, 0.5]).to_json(),
            json!({"$vector": [1.0, 0.5]})
        );
        assert_eq!(
            Sort::Fields(vec![("year".to_string(), SortOrder::Descending)]).to_json(),
            json!({"year": -1})
        );
    }

    #[test]
    fn test_create_collection_options_serialize() {
        let options = CreateCollectionOptions::vector(3, SimilarityMetric::DotProduct);
        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            json!({"vector": {"dimension": 3, "metric": "dot_product"}})
        );
        assert_eq!(SimilarityMetric::parse("Euclidean"), Some(SimilarityMetric::Euclidean));
        assert_eq!(SimilarityMetric::parse("manhattan"), None);
    }
}
