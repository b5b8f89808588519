use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::data_api::{
    CreateCollectionOptions, DataApi, DeleteOneOptions, FindPage, FindRequest, JsonDocument,
};
use crate::domain::DomainError;

pub const TOKEN_ENV: &str = "ASTRA_DB_APPLICATION_TOKEN";
pub const ENDPOINT_ENV: &str = "ASTRA_DB_API_ENDPOINT";
pub const NAMESPACE_ENV: &str = "ASTRA_DB_NAMESPACE";
pub const DEFAULT_NAMESPACE: &str = "default_keyspace";
const API_PATH: &str = "api/json/v1";
const CALLER: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Connection parameters for one Astra DB keyspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstraDbParams {
    pub token: String,
    pub endpoint: String,
    pub namespace: String,
}

impl AstraDbParams {
    pub fn new(token: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            endpoint: endpoint.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Read the parameters from the environment:
    ///
    /// | Variable                     | Default            |
    /// |------------------------------|--------------------|
    /// | `ASTRA_DB_APPLICATION_TOKEN` | required           |
    /// | `ASTRA_DB_API_ENDPOINT`      | required           |
    /// | `ASTRA_DB_NAMESPACE`         | `default_keyspace` |
    pub fn from_env() -> Result<Self, DomainError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, DomainError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let token = non_empty(TOKEN_ENV).ok_or_else(|| {
            DomainError::missing_config(format!("Must specify {} via env variable.", TOKEN_ENV))
        })?;
        let endpoint = non_empty(ENDPOINT_ENV).ok_or_else(|| {
            DomainError::missing_config(format!("Must specify {} via env variable.", ENDPOINT_ENV))
        })?;
        let namespace = non_empty(NAMESPACE_ENV).unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        Ok(Self {
            token,
            endpoint,
            namespace,
        })
    }
}

#[derive(Deserialize)]
struct CommandResponse {
    #[serde(default)]
    status: Option<Map<String, Value>>,
    #[serde(default)]
    data: Option<ResponseData>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Deserialize)]
struct ResponseData {
    #[serde(default)]
    documents: Vec<JsonDocument>,
    #[serde(rename = "nextPageState", default)]
    next_page_state: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
}

/// HTTP client for the Astra DB Data API (JSON API v1).
///
/// Every command is a `POST` of a single-key JSON object to either the
/// keyspace URL (collection lifecycle) or the collection URL (data commands).
/// Authentication is the application token in the `Token` header.
pub struct AstraDataApiClient {
    client: reqwest::Client,
    token: String,
    /// `{endpoint}/api/json/v1/{namespace}`
    keyspace_url: String,
}

impl AstraDataApiClient {
    pub fn new(params: AstraDbParams) -> Self {
        let endpoint = params.endpoint.trim_end_matches('/');
        Self {
            client: reqwest::Client::new(),
            token: params.token,
            keyspace_url: format!("{}/{}/{}", endpoint, API_PATH, params.namespace),
        }
    }

    pub fn from_env() -> Result<Self, DomainError> {
        Ok(Self::new(AstraDbParams::from_env()?))
    }

    pub fn keyspace_url(&self) -> &str {
        &self.keyspace_url
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.keyspace_url, collection)
    }

    async fn command(&self, url: &str, body: Value) -> Result<CommandResponse, DomainError> {
        let response = self
            .client
            .post(url)
            .header("Token", &self.token)
            .header(reqwest::header::USER_AGENT, CALLER)
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::remote(format!("Data API request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Data API returned {status}: {body}");
            return Err(DomainError::remote(format!(
                "Data API returned {status}: {body}"
            )));
        }

        let parsed: CommandResponse = response
            .json()
            .await
            .map_err(|e| DomainError::remote(format!("Failed to parse Data API response: {e}")))?;

        if !parsed.errors.is_empty() {
            let message = parsed
                .errors
                .iter()
                .map(|e| match &e.error_code {
                    Some(code) => format!("{} ({})", e.message, code),
                    None => e.message.clone(),
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(DomainError::remote(message));
        }

        Ok(parsed)
    }

    fn status_field(response: &CommandResponse, field: &str) -> Option<Value> {
        response.status.as_ref().and_then(|s| s.get(field)).cloned()
    }
}

#[async_trait]
impl DataApi for AstraDataApiClient {
    async fn create_collection(
        &self,
        name: &str,
        options: &CreateCollectionOptions,
    ) -> Result<(), DomainError> {
        let options = serde_json::to_value(options)
            .map_err(|e| DomainError::internal(format!("Failed to encode options: {e}")))?;
        let body = json!({
            "createCollection": {
                "name": name,
                "options": options,
            }
        });
        self.command(&self.keyspace_url, body).await?;
        debug!("createCollection {} ok", name);
        Ok(())
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<JsonDocument>,
    ) -> Result<Vec<Value>, DomainError> {
        let body = json!({
            "insertMany": {
                "documents": documents,
                "options": { "ordered": false },
            }
        });
        let response = self.command(&self.collection_url(collection), body).await?;

        match Self::status_field(&response, "insertedIds") {
            Some(Value::Array(ids)) => Ok(ids),
            _ => Err(DomainError::remote(
                "insertMany response did not contain insertedIds",
            )),
        }
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: JsonDocument,
        options: &DeleteOneOptions,
    ) -> Result<u64, DomainError> {
        let mut command = Map::new();
        command.insert("filter".to_string(), Value::Object(filter));
        if let Some(sort) = &options.sort {
            command.insert("sort".to_string(), sort.to_json());
        }
        let body = json!({ "deleteOne": command });
        let response = self.command(&self.collection_url(collection), body).await?;

        Ok(Self::status_field(&response, "deletedCount")
            .and_then(|v| v.as_u64())
            .unwrap_or(0))
    }

    async fn find_page(
        &self,
        collection: &str,
        request: &FindRequest,
    ) -> Result<FindPage, DomainError> {
        let find = &request.options;

        let mut options = Map::new();
        if let Some(limit) = find.limit {
            options.insert("limit".to_string(), Value::from(limit));
        }
        if let Some(skip) = find.skip {
            options.insert("skip".to_string(), Value::from(skip));
        }
        if find.include_similarity {
            options.insert("includeSimilarity".to_string(), Value::Bool(true));
        }
        if let Some(state) = &request.page_state {
            options.insert("pageState".to_string(), Value::String(state.clone()));
        }

        let mut command = Map::new();
        command.insert("filter".to_string(), Value::Object(request.filter.clone()));
        if let Some(sort) = &find.sort {
            command.insert("sort".to_string(), sort.to_json());
        }
        if let Some(projection) = &find.projection {
            command.insert("projection".to_string(), Value::Object(projection.clone()));
        }
        if !options.is_empty() {
            command.insert("options".to_string(), Value::Object(options));
        }

        let body = json!({ "find": command });
        let response = self.command(&self.collection_url(collection), body).await?;

        let data = response.data.unwrap_or(ResponseData {
            documents: Vec::new(),
            next_page_state: None,
        });
        Ok(FindPage {
            documents: data.documents,
            next_page_state: data.next_page_state,
        })
    }
}
