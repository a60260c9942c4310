//! OpenSearch storage implementation.
//!
//! Speaks the cluster's REST API directly:
//!
//! ```text
//! HEAD   /{index}                          exists
//! PUT    /{index}                          create with settings + mappings
//! PUT    /{index}/_doc/{id}?refresh=true   put with id
//! POST   /{index}/_doc?refresh=true        put, id assigned by the cluster
//! GET    /{index}/_doc/{id}                get (404 -> None)
//! POST   /{index}/_update/{id}?refresh=true  partial update {doc}
//! DELETE /{index}/_doc/{id}?refresh=true   delete
//! POST   /{index}/_search                  {from, size, query, track_total_hits}
//! ```
//!
//! A page beyond the cluster's result window (`index.max_result_window`)
//! is answered with the exact total and no hits.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::config::StoreConfig;
use crate::error::{AppError, Result};
use crate::storage::{
    Document, DocumentStore, IndexCreation, IndexDefinition, SearchHits, SearchRequest,
    StoredDocument, WriteOutcome, WriteResult,
};
use crate::utils::http;

const ALREADY_EXISTS: &str = "resource_already_exists_exception";
const WINDOW_TOO_LARGE: &str = "Result window is too large";

/// Remote OpenSearch cluster.
#[derive(Clone)]
pub struct OpenSearchStore {
    client: Client,
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
}

impl OpenSearchStore {
    /// Create a store for the cluster at `base_url`.
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::config(format!(
                "store host {base_url} cannot be used as a base URL"
            )));
        }
        Ok(Self {
            client,
            base_url,
            username: None,
            password: None,
        })
    }

    /// Use HTTP basic auth for every request.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.username = Some(username.into());
        self.password = password;
        self
    }

    /// Build a store from configuration.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let client = http::create_store_client(config)?;
        let store = Self::new(client, &config.host)?;
        Ok(match &config.username {
            Some(user) => store.with_basic_auth(user.clone(), config.password.clone()),
            None => store,
        })
    }

    fn url(&self, segments: &[&str], refresh: bool) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if refresh {
            url.query_pairs_mut().append_pair("refresh", "true");
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_ref()),
            None => builder,
        }
    }

    /// Turn an unexpected response into a store error carrying its body.
    async fn failure(response: Response) -> AppError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        AppError::store(status, body)
    }

    async fn send_search(&self, index: &str, request: &SearchRequest) -> Result<Response> {
        Ok(self
            .request(Method::POST, self.url(&[index, "_search"], false))
            .json(&request.to_body())
            .send()
            .await?)
    }

    async fn hits(response: Response) -> Result<SearchHits> {
        let body: SearchResponse = response.json().await?;
        Ok(SearchHits {
            total: body.hits.total.value(),
            hits: body
                .hits
                .hits
                .into_iter()
                .map(|hit| StoredDocument {
                    id: hit.id,
                    source: hit.source,
                })
                .collect(),
        })
    }

    fn outcome(result: &str, status: StatusCode) -> Result<WriteOutcome> {
        WriteOutcome::from_result(result).ok_or_else(|| {
            AppError::store(status.as_u16(), format!("unexpected write result '{result}'"))
        })
    }
}

#[derive(Deserialize)]
struct WriteResponse {
    #[serde(rename = "_id")]
    id: String,
    result: String,
}

#[derive(Deserialize)]
struct GetResponse {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source", default)]
    source: Option<Document>,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Deserialize)]
struct HitsEnvelope {
    total: TotalHits,
    hits: Vec<Hit>,
}

/// `hits.total` is an object on current clusters and a bare count on old ones.
#[derive(Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Object { value: u64 },
    Count(u64),
}

impl TotalHits {
    fn value(&self) -> u64 {
        match self {
            TotalHits::Object { value } | TotalHits::Count(value) => *value,
        }
    }
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: Document,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
}

#[async_trait]
impl DocumentStore for OpenSearchStore {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        let response = self
            .request(Method::HEAD, self.url(&[index], false))
            .send()
            .await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::failure(response).await),
        }
    }

    async fn create_index(
        &self,
        index: &str,
        definition: &IndexDefinition,
    ) -> Result<IndexCreation> {
        let response = self
            .request(Method::PUT, self.url(&[index], false))
            .json(&definition.to_body())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            log::info!("Created index '{}'", index);
            return Ok(IndexCreation::Created);
        }

        let body = response.text().await.unwrap_or_default();
        let raced = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error.kind == ALREADY_EXISTS)
            .unwrap_or(false);
        if status == StatusCode::BAD_REQUEST && raced {
            log::debug!("Index '{}' was created concurrently", index);
            return Ok(IndexCreation::AlreadyExists);
        }
        Err(AppError::store(status.as_u16(), body))
    }

    async fn put(
        &self,
        index: &str,
        id: Option<&str>,
        document: &Document,
    ) -> Result<WriteResult> {
        let builder = match id {
            Some(id) => self.request(Method::PUT, self.url(&[index, "_doc", id], true)),
            None => self.request(Method::POST, self.url(&[index, "_doc"], true)),
        };
        let response = builder.json(document).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::failure(response).await);
        }
        let body: WriteResponse = response.json().await?;
        Ok(WriteResult {
            outcome: Self::outcome(&body.result, status)?,
            id: body.id,
        })
    }

    async fn get(&self, index: &str, id: &str) -> Result<Option<StoredDocument>> {
        let response = self
            .request(Method::GET, self.url(&[index, "_doc", id], false))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: GetResponse = response.json().await?;
                Ok(match (body.found, body.source) {
                    (true, Some(source)) => Some(StoredDocument { id: body.id, source }),
                    _ => None,
                })
            }
            _ => Err(Self::failure(response).await),
        }
    }

    async fn update(&self, index: &str, id: &str, fields: &Document) -> Result<WriteOutcome> {
        let response = self
            .request(Method::POST, self.url(&[index, "_update", id], true))
            .json(&json!({ "doc": fields }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::not_found(format!("Document in '{index}'"), id));
        }
        if !status.is_success() {
            return Err(Self::failure(response).await);
        }
        let body: WriteResponse = response.json().await?;
        Self::outcome(&body.result, status)
    }

    async fn delete(&self, index: &str, id: &str) -> Result<WriteOutcome> {
        let response = self
            .request(Method::DELETE, self.url(&[index, "_doc", id], true))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::not_found(format!("Document in '{index}'"), id));
        }
        if !status.is_success() {
            return Err(Self::failure(response).await);
        }
        let body: WriteResponse = response.json().await?;
        Self::outcome(&body.result, status)
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> Result<SearchHits> {
        let response = self.send_search(index, request).await?;
        let status = response.status();
        if status.is_success() {
            return Self::hits(response).await;
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST && body.contains(WINDOW_TOO_LARGE) {
            log::debug!(
                "Page at offset {} is past the result window of '{}'",
                request.from,
                index
            );
            let response = self.send_search(index, &request.count_only()).await?;
            if !response.status().is_success() {
                return Err(Self::failure(response).await);
            }
            let counted = Self::hits(response).await?;
            return Ok(SearchHits {
                total: counted.total,
                hits: Vec::new(),
            });
        }
        Err(AppError::store(status.as_u16(), body))
    }
}
