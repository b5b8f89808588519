use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::TryStreamExt;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;

use super::astra_collection::{Collection, Database};
use super::astra_data_api_client::AstraDataApiClient;
use super::astra_filter::to_astra_filter;
use super::data_api::{
    CreateCollectionOptions, DataApi, DeleteOneOptions, FindOptions, JsonDocument, Sort,
    SIMILARITY_FIELD, VECTOR_FIELD,
};
use crate::application::VectorStore;
use crate::domain::{
    metadata_dict_to_node, node_to_metadata, DomainError, MetadataMode, Node, NodeFallback,
    VectorStoreQuery, VectorStoreQueryResult,
};

pub const DEFAULT_ID_KEY: &str = "_id";
pub const DEFAULT_CONTENT_KEY: &str = "content";

/// Field naming and metadata layout of stored records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstraVectorStoreConfig {
    pub id_key: String,
    pub content_key: String,
    /// Reject metadata values that are objects or arrays.
    pub flat_metadata: bool,
}

impl Default for AstraVectorStoreConfig {
    fn default() -> Self {
        Self {
            id_key: DEFAULT_ID_KEY.to_string(),
            content_key: DEFAULT_CONTENT_KEY.to_string(),
            flat_metadata: true,
        }
    }
}

/// Vector store backed by an Astra DB collection.
///
/// Starts disconnected; [`create_and_connect`](Self::create_and_connect) or
/// [`connect`](Self::connect) must bind a collection before `add`, `delete` or
/// `query`. Each data operation snapshots the bound collection when it starts,
/// so a concurrent reconnect only affects operations started after it.
pub struct AstraVectorStore {
    db: Database,
    config: AstraVectorStoreConfig,
    collection: RwLock<Option<Collection>>,
}

impl AstraVectorStore {
    pub fn new(api: Arc<dyn DataApi>, config: AstraVectorStoreConfig) -> Self {
        Self {
            db: Database::new(api),
            config,
            collection: RwLock::new(None),
        }
    }

    /// Build a store talking to Astra DB with credentials from the environment.
    pub fn from_env(config: AstraVectorStoreConfig) -> Result<Self, DomainError> {
        let client = AstraDataApiClient::from_env()?;
        Ok(Self::new(Arc::new(client), config))
    }

    pub fn client(&self) -> Arc<dyn DataApi> {
        self.db.api()
    }

    /// Create a collection (dimension and metric come from `options`) and
    /// bind it.
    pub async fn create_and_connect(
        &self,
        name: &str,
        options: &CreateCollectionOptions,
    ) -> Result<(), DomainError> {
        let collection = self.db.create_collection(name, options).await?;
        *self.collection.write().await = Some(collection);
        debug!("Created Astra DB collection {}", name);
        Ok(())
    }

    /// Bind an existing collection.
    pub async fn connect(&self, name: &str) -> Result<(), DomainError> {
        let collection = self.db.collection(name);
        *self.collection.write().await = Some(collection);
        debug!("Connected to Astra DB collection {}", name);
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.collection.read().await.is_some()
    }

    async fn active_collection(&self, action: &str) -> Result<Collection, DomainError> {
        self.collection
            .read()
            .await
            .clone()
            .ok_or_else(|| DomainError::not_connected(action))
    }

    /// Stored shape of one node: vector, id and content under their fields,
    /// then the flattened node metadata. Metadata may not use any of these
    /// field names nor `$similarity`, which queries strip from returned rows.
    pub fn build_record(&self, node: &Node) -> Result<JsonDocument, DomainError> {
        let embedding = node.embedding()?;
        let metadata = node_to_metadata(node, true, self.config.flat_metadata)?;

        let mut record = Map::new();
        record.insert(VECTOR_FIELD.to_string(), Value::from(embedding.to_vec()));
        record.insert(self.config.id_key.clone(), Value::String(node.id().to_string()));
        record.insert(
            self.config.content_key.clone(),
            Value::String(node.get_content(MetadataMode::None)),
        );

        for (key, value) in metadata {
            if key == SIMILARITY_FIELD || record.contains_key(&key) {
                return Err(DomainError::invalid_input(format!(
                    "Metadata key {} of node {} collides with a reserved field",
                    key,
                    node.id()
                )));
            }
            record.insert(key, value);
        }

        Ok(record)
    }

    /// Split a returned row into its id, content, similarity and a node rebuilt
    /// from the remaining fields.
    fn node_from_row(&self, mut row: JsonDocument) -> (String, Node, f32) {
        row.remove(VECTOR_FIELD);
        let similarity = row
            .remove(SIMILARITY_FIELD)
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0) as f32;
        let id = match row.remove(&self.config.id_key) {
            Some(Value::String(id)) => id,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let content = match row.remove(&self.config.content_key) {
            Some(Value::String(content)) => content,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        let fallback = NodeFallback {
            id: id.clone(),
            text: content.clone(),
        };
        // A fallback is always supplied, so reconstruction cannot fail.
        let mut node = metadata_dict_to_node(row, Some(fallback.clone())).unwrap_or_else(|_| {
            Node::new(fallback.text).with_id(fallback.id)
        });
        node.set_content(content);

        (id, node, similarity)
    }

    pub async fn delete_with_options(
        &self,
        ref_doc_id: &str,
        options: &DeleteOneOptions,
    ) -> Result<(), DomainError> {
        let collection = self.active_collection("deleting").await?;

        debug!("Deleting row with id {} from {}", ref_doc_id, collection.name());

        let mut filter = Map::new();
        filter.insert(
            self.config.id_key.clone(),
            Value::String(ref_doc_id.to_string()),
        );
        collection.delete_one(filter, options).await?;
        Ok(())
    }

    /// Similarity query. `options` supplies projection, skip and a sort used
    /// only when the query carries no embedding; limit and similarity scores
    /// always come from the query.
    pub async fn query_with_options(
        &self,
        query: &VectorStoreQuery,
        options: FindOptions,
    ) -> Result<VectorStoreQueryResult, DomainError> {
        let collection = self.active_collection("querying").await?;

        let filter = to_astra_filter(query.filters())?;
        let sort = match query.query_embedding() {
            Some(embedding) => Some(Sort::Vector(embedding.to_vec())),
            None => options.sort,
        };
        let find_options = FindOptions {
            sort,
            limit: Some(query.similarity_top_k()),
            include_similarity: true,
            ..options
        };

        let rows: Vec<JsonDocument> = collection.find(filter, find_options).try_collect().await?;

        let mut result = VectorStoreQueryResult::default();
        for row in rows {
            let (id, node, similarity) = self.node_from_row(row);
            result.push(id, node, similarity);
        }

        debug!("Query returned {} rows", result.len());
        Ok(result)
    }
}

#[async_trait]
impl VectorStore for AstraVectorStore {
    fn stores_text(&self) -> bool {
        true
    }

    async fn add(&self, nodes: &[Node]) -> Result<Vec<String>, DomainError> {
        let collection = self.active_collection("adding").await?;

        if nodes.is_empty() {
            return Ok(vec![]);
        }

        let records = nodes
            .iter()
            .map(|node| self.build_record(node))
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Adding {} rows to {}", records.len(), collection.name());

        let inserted = collection.insert_many(records).await?;

        Ok(inserted
            .into_iter()
            .map(|id| match id {
                Value::String(id) => id,
                other => other.to_string(),
            })
            .collect())
    }

    async fn delete(&self, ref_doc_id: &str) -> Result<(), DomainError> {
        self.delete_with_options(ref_doc_id, &DeleteOneOptions::default())
            .await
    }

    async fn query(&self, query: &VectorStoreQuery) -> Result<VectorStoreQueryResult, DomainError> {
        self.query_with_options(query, FindOptions::default()).await
    }
}
