use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::data_api::{
    CreateCollectionOptions, DataApi, DeleteOneOptions, FindPage, FindRequest, JsonDocument,
    SimilarityMetric, Sort, SortOrder, SIMILARITY_FIELD, VECTOR_FIELD,
};
use crate::domain::DomainError;

/// Documents per page for finds without a vector sort.
const PAGE_SIZE: usize = 20;

struct StoredCollection {
    metric: SimilarityMetric,
    documents: Vec<JsonDocument>,
}

/// In-process stand-in for the Data API. Understands the filter operators the
/// vector store emits, vector and field sorts, and page states. Every command
/// increments [`request_count`](Self::request_count).
pub struct InMemoryDataApi {
    collections: Arc<Mutex<HashMap<String, StoredCollection>>>,
    requests: AtomicUsize,
}

impl InMemoryDataApi {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(Mutex::new(HashMap::new())),
            requests: AtomicUsize::new(0),
        }
    }

    /// Number of commands received so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(AtomicOrdering::SeqCst)
    }

    pub async fn documents(&self, collection: &str) -> Vec<JsonDocument> {
        self.collections
            .lock()
            .await
            .get(collection)
            .map(|c| c.documents.clone())
            .unwrap_or_default()
    }

    fn record_request(&self) {
        self.requests.fetch_add(1, AtomicOrdering::SeqCst);
    }
}

impl Default for InMemoryDataApi {
    fn default() -> Self {
        Self::new()
    }
}

fn missing_collection(name: &str) -> DomainError {
    DomainError::remote(format!(
        "Collection does not exist, collection name: {}",
        name
    ))
}

#[async_trait]
impl DataApi for InMemoryDataApi {
    async fn create_collection(
        &self,
        name: &str,
        options: &CreateCollectionOptions,
    ) -> Result<(), DomainError> {
        self.record_request();
        let mut collections = self.collections.lock().await;
        collections
            .entry(name.to_string())
            .or_insert_with(|| StoredCollection {
                metric: options.metric(),
                documents: Vec::new(),
            });
        debug!("Created in-memory collection {}", name);
        Ok(())
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<JsonDocument>,
    ) -> Result<Vec<Value>, DomainError> {
        self.record_request();
        let mut collections = self.collections.lock().await;
        let stored = collections
            .get_mut(collection)
            .ok_or_else(|| missing_collection(collection))?;

        let mut prepared = Vec::with_capacity(documents.len());
        for mut document in documents {
            let id = document
                .get("_id")
                .cloned()
                .unwrap_or_else(|| Value::String(Uuid::new_v4().to_string()));
            let duplicate = stored
                .documents
                .iter()
                .chain(prepared.iter().map(|(_, d)| d))
                .any(|existing| existing.get("_id") == Some(&id));
            if duplicate {
                return Err(DomainError::remote(format!(
                    "Failed to insert document with _id {}: Document already exists with the given _id",
                    id
                )));
            }
            document.insert("_id".to_string(), id.clone());
            prepared.push((id, document));
        }

        let mut ids = Vec::with_capacity(prepared.len());
        for (id, document) in prepared {
            stored.documents.push(document);
            ids.push(id);
        }

        debug!("Inserted {} documents into {}", ids.len(), collection);
        Ok(ids)
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: JsonDocument,
        options: &DeleteOneOptions,
    ) -> Result<u64, DomainError> {
        self.record_request();
        let mut collections = self.collections.lock().await;
        let stored = collections
            .get_mut(collection)
            .ok_or_else(|| missing_collection(collection))?;

        let mut candidates: Vec<usize> = stored
            .documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| matches_filter(doc, &filter))
            .map(|(i, _)| i)
            .collect();

        if let Some(sort) = &options.sort {
            let mut scored: Vec<(usize, JsonDocument)> = candidates
                .iter()
                .map(|&i| (i, stored.documents[i].clone()))
                .collect();
            sort_documents(&mut scored, sort, stored.metric);
            candidates = scored.into_iter().map(|(i, _)| i).collect();
        }

        match candidates.first() {
            Some(&index) => {
                stored.documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn find_page(
        &self,
        collection: &str,
        request: &FindRequest,
    ) -> Result<FindPage, DomainError> {
        self.record_request();
        let collections = self.collections.lock().await;
        let stored = collections
            .get(collection)
            .ok_or_else(|| missing_collection(collection))?;
        let options = &request.options;

        let mut hits: Vec<(usize, JsonDocument)> = stored
            .documents
            .iter()
            .filter(|doc| matches_filter(doc, &request.filter))
            .cloned()
            .enumerate()
            .collect();

        let vector_sort = matches!(options.sort, Some(Sort::Vector(_)));
        if let Some(sort) = &options.sort {
            sort_documents(&mut hits, sort, stored.metric);
        }

        let mut hits: Vec<JsonDocument> = hits
            .into_iter()
            .map(|(_, doc)| doc)
            .skip(options.skip.unwrap_or(0))
            .take(options.limit.unwrap_or(usize::MAX))
            .collect();

        if !(vector_sort && options.include_similarity) {
            for doc in &mut hits {
                doc.remove(SIMILARITY_FIELD);
            }
        }
        if let Some(projection) = &options.projection {
            for doc in &mut hits {
                apply_projection(doc, projection);
            }
        }

        // Vector searches come back in a single page.
        if vector_sort {
            return Ok(FindPage {
                documents: hits,
                next_page_state: None,
            });
        }

        let offset = request
            .page_state
            .as_deref()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(0);
        let documents: Vec<JsonDocument> =
            hits.iter().skip(offset).take(PAGE_SIZE).cloned().collect();
        let next_page_state =
            (offset + PAGE_SIZE < hits.len()).then(|| (offset + PAGE_SIZE).to_string());

        Ok(FindPage {
            documents,
            next_page_state,
        })
    }
}

fn matches_filter(doc: &JsonDocument, filter: &JsonDocument) -> bool {
    filter.iter().all(|(key, condition)| match key.as_str() {
        "$and" => condition.as_array().is_some_and(|items| {
            items
                .iter()
                .all(|item| item.as_object().is_some_and(|f| matches_filter(doc, f)))
        }),
        "$or" => condition.as_array().is_some_and(|items| {
            items
                .iter()
                .any(|item| item.as_object().is_some_and(|f| matches_filter(doc, f)))
        }),
        field => field_matches(doc.get(field), condition),
    })
}

fn field_matches(value: Option<&Value>, condition: &Value) -> bool {
    match condition {
        Value::Object(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => ops
            .iter()
            .all(|(op, operand)| apply_operator(value, op, operand)),
        expected => value.is_some_and(|v| values_equal(v, expected)),
    }
}

/// Equality as the Data API applies it: numbers compare by value and an array
/// field matches when any element does.
fn values_equal(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    if let (Some(a), Some(b)) = (actual.as_f64(), expected.as_f64()) {
        return a == b;
    }
    match actual {
        Value::Array(items) if !expected.is_array() => items.iter().any(|i| values_equal(i, expected)),
        _ => false,
    }
}

fn compare(value: Option<&Value>, operand: &Value) -> Option<Ordering> {
    match (value?, operand) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn apply_operator(value: Option<&Value>, op: &str, operand: &Value) -> bool {
    let in_set = || {
        operand
            .as_array()
            .is_some_and(|set| value.is_some_and(|v| set.iter().any(|x| values_equal(v, x))))
    };
    match op {
        "$eq" => value.is_some_and(|v| values_equal(v, operand)),
        "$ne" => !value.is_some_and(|v| values_equal(v, operand)),
        "$gt" => compare(value, operand) == Some(Ordering::Greater),
        "$lt" => compare(value, operand) == Some(Ordering::Less),
        "$gte" => matches!(compare(value, operand), Some(Ordering::Greater | Ordering::Equal)),
        "$lte" => matches!(compare(value, operand), Some(Ordering::Less | Ordering::Equal)),
        "$in" => in_set(),
        "$nin" => !in_set(),
        "$size" => value
            .and_then(Value::as_array)
            .is_some_and(|items| Some(items.len() as u64) == operand.as_u64()),
        _ => false,
    }
}

fn document_vector(doc: &JsonDocument) -> Option<Vec<f32>> {
    doc.get(VECTOR_FIELD).and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect()
    })
}

/// Order `docs` by `sort`. A vector sort drops documents without a vector and
/// stores the score under `$similarity`.
fn sort_documents(docs: &mut Vec<(usize, JsonDocument)>, sort: &Sort, metric: SimilarityMetric) {
    match sort {
        Sort::Vector(query) => {
            docs.retain(|(_, doc)| document_vector(doc).is_some());
            for (_, doc) in docs.iter_mut() {
                let score = document_vector(doc)
                    .map(|v| similarity(metric, query, &v))
                    .unwrap_or(0.0);
                doc.insert(SIMILARITY_FIELD.to_string(), Value::from(score));
            }
            docs.sort_by(|a, b| {
                let score = |d: &JsonDocument| {
                    d.get(SIMILARITY_FIELD)
                        .and_then(Value::as_f64)
                        .unwrap_or(0.0)
                };
                score(&b.1)
                    .partial_cmp(&score(&a.1))
                    .unwrap_or(Ordering::Equal)
                    .then(a.0.cmp(&b.0))
            });
        }
        Sort::Fields(fields) => {
            docs.sort_by(|a, b| {
                for (field, order) in fields {
                    let ordering = compare(a.1.get(field), b.1.get(field).unwrap_or(&Value::Null))
                        .unwrap_or(Ordering::Equal);
                    let ordering = match order {
                        SortOrder::Ascending => ordering,
                        SortOrder::Descending => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                a.0.cmp(&b.0)
            });
        }
    }
}

fn apply_projection(doc: &mut JsonDocument, projection: &JsonDocument) {
    let included: Vec<&String> = projection
        .iter()
        .filter(|(_, v)| v.as_bool() == Some(true) || v.as_i64() == Some(1))
        .map(|(k, _)| k)
        .collect();

    if included.is_empty() {
        for (field, flag) in projection {
            if flag.as_bool() == Some(false) || flag.as_i64() == Some(0) {
                doc.remove(field);
            }
        }
    } else {
        doc.retain(|key, _| {
            key == "_id" || key == SIMILARITY_FIELD || included.iter().any(|k| *k == key)
        });
    }
}

/// Score in the Data API's normalised form for `metric`.
fn similarity(metric: SimilarityMetric, a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    match metric {
        SimilarityMetric::Cosine => (1.0 + cosine_similarity(a, b)) / 2.0,
        SimilarityMetric::DotProduct => {
            let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
            (1.0 + dot) / 2.0
        }
        SimilarityMetric::Euclidean => {
            let squared: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
            1.0 / (1.0 + squared)
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> JsonDocument {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_filter_operators() {
        let d = doc(json!({"year": 2021, "genre": "sf", "tags": ["a", "b"], "empty": []}));

        assert!(matches_filter(&d, &doc(json!({"genre": "sf"}))));
        assert!(matches_filter(&d, &doc(json!({"tags": "a"}))));
        assert!(matches_filter(&d, &doc(json!({"year": {"$gte": 2021, "$lt": 2022}}))));
        assert!(!matches_filter(&d, &doc(json!({"year": {"$gt": 2021}}))));
        assert!(matches_filter(&d, &doc(json!({"genre": {"$in": ["sf", "fantasy"]}}))));
        assert!(matches_filter(&d, &doc(json!({"genre": {"$nin": ["crime"]}}))));
        assert!(matches_filter(&d, &doc(json!({"missing": {"$ne": 1}}))));
        assert!(matches_filter(&d, &doc(json!({"empty": {"$size": 0}}))));
        assert!(!matches_filter(&d, &doc(json!({"tags": {"$size": 0}}))));
        assert!(matches_filter(
            &d,
            &doc(json!({"$or": [{"genre": "crime"}, {"year": 2021}]}))
        ));
        assert!(!matches_filter(
            &d,
            &doc(json!({"$and": [{"genre": "crime"}, {"year": 2021}]}))
        ));
    }

    #[test]
    fn test_similarity_metrics() {
        let a = [1.0, 0.0];
        assert!((similarity(SimilarityMetric::Cosine, &a, &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((similarity(SimilarityMetric::Cosine, &a, &[-1.0, 0.0])).abs() < 1e-6);
        assert!((similarity(SimilarityMetric::Euclidean, &a, &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((similarity(SimilarityMetric::DotProduct, &a, &[0.0, 1.0]) - 0.5).abs() < 1e-6);
        assert_eq!(similarity(SimilarityMetric::Cosine, &a, &[1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_find_pages_without_vector_sort() {
        let api = InMemoryDataApi::new();
        api.create_collection("c", &CreateCollectionOptions::default())
            .await
            .unwrap();
        let docs = (0..45).map(|i| doc(json!({"n": i}))).collect();
        api.insert_many("c", docs).await.unwrap();

        let mut request = FindRequest {
            filter: JsonDocument::new(),
            options: Default::default(),
            page_state: None,
        };
        let first = api.find_page("c", &request).await.unwrap();
        assert_eq!(first.documents.len(), PAGE_SIZE);
        assert_eq!(first.next_page_state.as_deref(), Some("20"));

        request.page_state = Some("40".to_string());
        let last = api.find_page("c", &request).await.unwrap();
        assert_eq!(last.documents.len(), 5);
        assert!(last.next_page_state.is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_ids() {
        let api = InMemoryDataApi::new();
        api.create_collection("c", &CreateCollectionOptions::default())
            .await
            .unwrap();
        api.insert_many("c", vec![doc(json!({"_id": "a"}))])
            .await
            .unwrap();

        let err = api
            .insert_many("c", vec![doc(json!({"_id": "a"}))])
            .await
            .unwrap_err();
        assert!(err.is_remote());
        assert_eq!(api.documents("c").await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_a_remote_error() {
        let api = InMemoryDataApi::new();
        let err = api.insert_many("nope", vec![]).await.unwrap_err();
        assert!(err.is_remote());
        assert_eq!(api.request_count(), 1);
    }
}
