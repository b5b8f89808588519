use std::sync::Arc;

use futures_util::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde_json::Value;
use tracing::debug;

use super::data_api::{
    CreateCollectionOptions, DataApi, DeleteOneOptions, FindOptions, FindRequest, JsonDocument,
};
use crate::domain::DomainError;

/// Handle on one named collection. Cheap to clone; clones share the client.
#[derive(Clone)]
pub struct Collection {
    api: Arc<dyn DataApi>,
    name: String,
}

impl Collection {
    pub fn new(api: Arc<dyn DataApi>, name: impl Into<String>) -> Self {
        Self {
            api,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn insert_many(&self, documents: Vec<JsonDocument>) -> Result<Vec<Value>, DomainError> {
        self.api.insert_many(&self.name, documents).await
    }

    pub async fn delete_one(
        &self,
        filter: JsonDocument,
        options: &DeleteOneOptions,
    ) -> Result<u64, DomainError> {
        self.api.delete_one(&self.name, filter, options).await
    }

    /// Stream every document matching `filter`, following page states until
    /// the server reports no more pages or `options.limit` documents were
    /// yielded.
    pub fn find(
        &self,
        filter: JsonDocument,
        options: FindOptions,
    ) -> BoxStream<'static, Result<JsonDocument, DomainError>> {
        let api = self.api.clone();
        let collection = self.name.clone();
        let limit = options.limit.unwrap_or(usize::MAX);
        let first = FindRequest {
            filter,
            options,
            page_state: None,
        };

        stream::try_unfold(Some(first), move |request| {
            let api = api.clone();
            let collection = collection.clone();
            async move {
                let request = match request {
                    Some(request) => request,
                    None => return Ok(None),
                };

                let page = api.find_page(&collection, &request).await?;
                debug!(
                    "Fetched page of {} documents from {}",
                    page.documents.len(),
                    collection
                );

                let next = page.next_page_state.map(|state| FindRequest {
                    page_state: Some(state),
                    ..request
                });
                Ok::<_, DomainError>(Some((page.documents, next)))
            }
        })
        .map_ok(|documents| stream::iter(documents.into_iter().map(Ok::<_, DomainError>)))
        .try_flatten()
        .take(limit)
        .boxed()
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection").field("name", &self.name).finish()
    }
}

/// Entry point for collection lifecycle on one keyspace.
#[derive(Clone)]
pub struct Database {
    api: Arc<dyn DataApi>,
}

impl Database {
    pub fn new(api: Arc<dyn DataApi>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> Arc<dyn DataApi> {
        self.api.clone()
    }

    pub async fn create_collection(
        &self,
        name: &str,
        options: &CreateCollectionOptions,
    ) -> Result<Collection, DomainError> {
        self.api.create_collection(name, options).await?;
        Ok(self.collection(name))
    }

    /// Bind an existing collection. Issues no request.
    pub fn collection(&self, name: &str) -> Collection {
        Collection::new(self.api.clone(), name)
    }
}
