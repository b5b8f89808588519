//! Tests for the Data API HTTP client against a local fake server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use astraindex::{
    AstraDataApiClient, AstraDbParams, AstraVectorStore, AstraVectorStoreConfig,
    CreateCollectionOptions, DataApi, DeleteOneOptions, FilterOperator, IndexingOptions,
    MetadataFilter, MetadataFilters, SimilarityMetric, Sort, SortOrder, VectorStore,
    VectorStoreQuery,
};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

const TOKEN: &str = "AstraCS:test-token";

#[derive(Debug, Clone)]
struct Recorded {
    path: String,
    token: Option<String>,
    user_agent: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct FakeDataApi {
    requests: Arc<Mutex<Vec<Recorded>>>,
    find_responses: Arc<Mutex<VecDeque<Value>>>,
}

impl FakeDataApi {
    fn with_find_responses(responses: Vec<Value>) -> Self {
        Self {
            requests: Arc::default(),
            find_responses: Arc::new(Mutex::new(responses.into())),
        }
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

async fn handle(
    State(state): State<FakeDataApi>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.requests.lock().unwrap().push(Recorded {
        path: uri.path().to_string(),
        token: header("token"),
        user_agent: header("user-agent"),
        body: body.clone(),
    });

    if uri.path().ends_with("/broken") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    if uri.path().ends_with("/missing") {
        return Json(json!({
            "errors": [{
                "message": "Collection does not exist, collection name: missing",
                "errorCode": "COLLECTION_NOT_EXIST"
            }]
        }))
        .into_response();
    }

    let command = body
        .as_object()
        .and_then(|o| o.keys().next().cloned())
        .unwrap_or_default();
    let response = match command.as_str() {
        "createCollection" => json!({"status": {"ok": 1}}),
        "insertMany" => {
            let ids: Vec<Value> = body["insertMany"]["documents"]
                .as_array()
                .map(|docs| docs.iter().map(|d| d["_id"].clone()).collect())
                .unwrap_or_default();
            json!({"status": {"insertedIds": ids}})
        }
        "deleteOne" => json!({"status": {"deletedCount": 1}}),
        "find" => state
            .find_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| json!({"data": {"documents": [], "nextPageState": null}})),
        other => json!({"errors": [{"message": format!("unknown command {}", other)}]}),
    };

    Json(response).into_response()
}

/// Serve `state` on an ephemeral port and return a client pointed at it.
async fn spawn_fake(state: FakeDataApi) -> AstraDataApiClient {
    let app = Router::new()
        .route("/{*path}", post(handle))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    AstraDataApiClient::new(
        AstraDbParams::new(TOKEN, format!("http://{}", addr)).with_namespace("ks"),
    )
}

#[tokio::test]
async fn create_collection_posts_to_keyspace() {
    let fake = FakeDataApi::default();
    let client = spawn_fake(fake.clone()).await;

    client
        .create_collection(
            "docs",
            &CreateCollectionOptions::vector(3, SimilarityMetric::Euclidean),
        )
        .await
        .expect("create");

    let requests = fake.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/api/json/v1/ks");
    assert_eq!(requests[0].token.as_deref(), Some(TOKEN));
    assert!(requests[0]
        .user_agent
        .as_deref()
        .is_some_and(|ua| ua.starts_with("astraindex/")));
    assert_eq!(
        requests[0].body,
        json!({"createCollection": {
            "name": "docs",
            "options": {"vector": {"dimension": 3, "metric": "euclidean"}}
        }})
    );
}

#[tokio::test]
async fn create_collection_sends_indexing_options() {
    let fake = FakeDataApi::default();
    let client = spawn_fake(fake.clone()).await;

    let options = CreateCollectionOptions::vector(2, SimilarityMetric::Cosine).with_indexing(
        IndexingOptions {
            allow: None,
            deny: Some(vec!["_node_content".to_string()]),
        },
    );
    client.create_collection("docs", &options).await.expect("create");

    assert_eq!(
        fake.requests()[0].body["createCollection"]["options"],
        json!({
            "vector": {"dimension": 2, "metric": "cosine"},
            "indexing": {"deny": ["_node_content"]}
        })
    );
}

#[tokio::test]
async fn insert_many_returns_inserted_ids() {
    let fake = FakeDataApi::default();
    let client = spawn_fake(fake.clone()).await;

    let docs = vec![
        json!({"_id": "a", "n": 1}).as_object().cloned().unwrap(),
        json!({"_id": 7, "n": 2}).as_object().cloned().unwrap(),
    ];
    let ids = client.insert_many("docs", docs).await.expect("insert");

    assert_eq!(ids, vec![json!("a"), json!(7)]);
    let requests = fake.requests();
    assert_eq!(requests[0].path, "/api/json/v1/ks/docs");
    assert_eq!(requests[0].body["insertMany"]["options"], json!({"ordered": false}));
}

#[tokio::test]
async fn delete_one_sends_filter_and_sort() {
    let fake = FakeDataApi::default();
    let client = spawn_fake(fake.clone()).await;

    let filter = json!({"_id": "a"}).as_object().cloned().unwrap();
    let deleted = client
        .delete_one(
            "docs",
            filter,
            &DeleteOneOptions {
                sort: Some(Sort::Fields(vec![("year".to_string(), SortOrder::Ascending)])),
            },
        )
        .await
        .expect("delete");

    assert_eq!(deleted, 1);
    assert_eq!(
        fake.requests()[0].body,
        json!({"deleteOne": {"filter": {"_id": "a"}, "sort": {"year": 1}}})
    );
}

#[tokio::test]
async fn vector_store_query_over_http() {
    let fake = FakeDataApi::with_find_responses(vec![json!({
        "data": {
            "documents": [
                {"_id": "n1", "content": "first", "$vector": [1.0, 0.0], "$similarity": 0.9, "lang": "en"},
                {"_id": "n2", "content": "second", "$similarity": 0.4}
            ],
            "nextPageState": null
        }
    })]);
    let client = spawn_fake(fake.clone()).await;
    let store = AstraVectorStore::new(Arc::new(client), AstraVectorStoreConfig::default());
    store.connect("docs").await.expect("connect");

    let query = VectorStoreQuery::new()
        .with_embedding(vec![1.0, 0.0])
        .with_top_k(5)
        .with_filters(MetadataFilters::new(vec![MetadataFilter::new(
            "lang",
            FilterOperator::In,
            json!(["en", "fr"]),
        )]));
    let result = store.query(&query).await.expect("query");

    assert_eq!(result.ids, vec!["n1", "n2"]);
    assert_eq!(result.nodes[0].text(), "first");
    assert_eq!(result.nodes[0].metadata()["lang"], json!("en"));
    assert!((result.similarities[0] - 0.9).abs() < 1e-6);
    assert!((result.similarities[1] - 0.4).abs() < 1e-6);

    let requests = fake.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].body,
        json!({"find": {
            "filter": {"$and": [{"lang": {"$in": ["en", "fr"]}}]},
            "sort": {"$vector": [1.0, 0.0]},
            "options": {"limit": 5, "includeSimilarity": true}
        }})
    );
}

#[tokio::test]
async fn find_follows_next_page_state() {
    let fake = FakeDataApi::with_find_responses(vec![
        json!({"data": {"documents": [{"_id": "a", "content": "A"}], "nextPageState": "page-2"}}),
        json!({"data": {"documents": [{"_id": "b", "content": "B"}], "nextPageState": null}}),
    ]);
    let client = spawn_fake(fake.clone()).await;
    let store = AstraVectorStore::new(Arc::new(client), AstraVectorStoreConfig::default());
    store.connect("docs").await.expect("connect");

    let result = store
        .query(&VectorStoreQuery::new().with_top_k(10))
        .await
        .expect("query");

    assert_eq!(result.ids, vec!["a", "b"]);
    let requests = fake.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].body["find"]["options"].get("pageState").is_none());
    assert_eq!(requests[1].body["find"]["options"]["pageState"], json!("page-2"));
    assert_eq!(requests[0].body["find"]["filter"], json!({}));
}

#[tokio::test]
async fn data_api_errors_become_remote_errors() {
    let fake = FakeDataApi::default();
    let client = spawn_fake(fake.clone()).await;

    let err = client.insert_many("missing", vec![]).await.unwrap_err();
    assert!(err.is_remote());
    assert!(err.to_string().contains("COLLECTION_NOT_EXIST"));

    let err = client.insert_many("broken", vec![]).await.unwrap_err();
    assert!(err.is_remote());
    assert!(err.to_string().contains("500"));
}
