//! Document store abstractions.
//!
//! A store holds named indices of JSON documents keyed by id. Two backends
//! implement [`DocumentStore`]:
//!
//! - [`OpenSearchStore`]: the remote cluster, spoken to over its REST API
//! - [`MemoryStore`]: an in-process stand-in for tests and local runs
//!
//! Every write asks for synchronous visibility (`refresh=true` on the wire),
//! so a search issued right after a write observes it.

pub mod memory;
pub mod opensearch;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::Result;

pub use memory::MemoryStore;
pub use opensearch::OpenSearchStore;

/// Stored document body.
pub type Document = Map<String, Value>;

/// Field type declared in an index mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Float,
    Boolean,
}

/// Settings and field mapping used when creating an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub shards: u32,
    pub replicas: u32,
    pub properties: BTreeMap<String, FieldType>,
}

impl IndexDefinition {
    /// Create a definition with one shard and one replica.
    pub fn new(fields: &[(&str, FieldType)]) -> Self {
        Self {
            shards: 1,
            replicas: 1,
            properties: fields
                .iter()
                .map(|(name, ty)| (name.to_string(), *ty))
                .collect(),
        }
    }

    pub fn with_settings(mut self, shards: u32, replicas: u32) -> Self {
        self.shards = shards;
        self.replicas = replicas;
        self
    }

    /// Request body for index creation.
    pub fn to_body(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, ty)| (name.clone(), json!({ "type": ty })))
            .collect();

        json!({
            "settings": {
                "index": {
                    "number_of_shards": self.shards,
                    "number_of_replicas": self.replicas,
                }
            },
            "mappings": { "properties": properties }
        })
    }
}

/// Result of an `ensure_index` / `create_index` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexCreation {
    Created,
    AlreadyExists,
}

/// What a write did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Updated,
    Deleted,
    NoOp,
}

impl WriteOutcome {
    /// Parse the `result` field of a store write response.
    pub fn from_result(result: &str) -> Option<Self> {
        match result {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "deleted" => Some(Self::Deleted),
            "noop" => Some(Self::NoOp),
            _ => None,
        }
    }
}

/// Id and outcome of a `put`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    pub id: String,
    pub outcome: WriteOutcome,
}

/// A document together with its id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub source: Document,
}

/// Search query modes.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    MatchAll,
    MultiMatch { query: String, fields: Vec<String> },
    /// Every term of `value` must occur in `field`.
    Match { field: String, value: String },
}

impl Query {
    pub fn to_json(&self) -> Value {
        match self {
            Query::MatchAll => json!({ "match_all": {} }),
            Query::MultiMatch { query, fields } => {
                json!({ "multi_match": { "query": query, "fields": fields } })
            }
            Query::Match { field, value } => {
                let mut clause = Map::new();
                clause.insert(
                    field.clone(),
                    json!({ "query": value, "operator": "and" }),
                );
                json!({ "match": clause })
            }
        }
    }
}

/// Offset-limited search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: Query,
    pub from: u64,
    pub size: u64,
}

impl SearchRequest {
    /// Request body. Totals are counted exactly, past the cluster's default cap.
    pub fn to_body(&self) -> Value {
        json!({
            "from": self.from,
            "size": self.size,
            "query": self.query.to_json(),
            "track_total_hits": true,
        })
    }

    /// The same query with no hits requested, for counting matches only.
    pub fn count_only(&self) -> Self {
        Self {
            query: self.query.clone(),
            from: 0,
            size: 0,
        }
    }
}

/// One page of hits plus the total match count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    pub total: u64,
    pub hits: Vec<StoredDocument>,
}

/// Trait for document store backends.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool>;

    /// Create an index. Losing a creation race reports `AlreadyExists`
    /// instead of failing.
    async fn create_index(&self, index: &str, definition: &IndexDefinition)
    -> Result<IndexCreation>;

    /// Create the index only if it is missing.
    async fn ensure_index(
        &self,
        index: &str,
        definition: &IndexDefinition,
    ) -> Result<IndexCreation> {
        if self.index_exists(index).await? {
            return Ok(IndexCreation::AlreadyExists);
        }
        self.create_index(index, definition).await
    }

    /// Create or overwrite a document. The store assigns an id when `id` is `None`.
    async fn put(&self, index: &str, id: Option<&str>, document: &Document)
    -> Result<WriteResult>;

    /// Fetch a document; absence is `Ok(None)`.
    async fn get(&self, index: &str, id: &str) -> Result<Option<StoredDocument>>;

    /// Merge `fields` into an existing document. Fails with `NotFound` if absent.
    async fn update(&self, index: &str, id: &str, fields: &Document) -> Result<WriteOutcome>;

    /// Remove a document. Fails with `NotFound` if absent.
    async fn delete(&self, index: &str, id: &str) -> Result<WriteOutcome>;

    async fn search(&self, index: &str, request: &SearchRequest) -> Result<SearchHits>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_definition_body() {
        let definition = IndexDefinition::new(&[
            ("name", FieldType::Text),
            ("price", FieldType::Float),
            ("in_stock", FieldType::Boolean),
        ])
        .with_settings(2, 0);

        let body = definition.to_body();
        assert_eq!(body["settings"]["index"]["number_of_shards"], 2);
        assert_eq!(body["settings"]["index"]["number_of_replicas"], 0);
        assert_eq!(body["mappings"]["properties"]["name"]["type"], "text");
        assert_eq!(body["mappings"]["properties"]["price"]["type"], "float");
        assert_eq!(body["mappings"]["properties"]["in_stock"]["type"], "boolean");
    }

    #[test]
    fn test_query_bodies() {
        assert_eq!(Query::MatchAll.to_json(), json!({ "match_all": {} }));

        let multi = Query::MultiMatch {
            query: "chair".into(),
            fields: vec!["name".into(), "description".into()],
        };
        assert_eq!(
            multi.to_json(),
            json!({ "multi_match": { "query": "chair", "fields": ["name", "description"] } })
        );

        let request = SearchRequest {
            query: Query::Match {
                field: "country".into(),
                value: "Japan".into(),
            },
            from: 10,
            size: 10,
        };
        assert_eq!(
            request.to_body(),
            json!({
                "from": 10,
                "size": 10,
                "query": { "match": { "country": { "query": "Japan", "operator": "and" } } },
                "track_total_hits": true
            })
        );
        assert_eq!(request.count_only().size, 0);
        assert_eq!(request.count_only().from, 0);
    }

    #[test]
    fn test_write_outcome_parsing() {
        assert_eq!(WriteOutcome::from_result("created"), Some(WriteOutcome::Created));
        assert_eq!(WriteOutcome::from_result("noop"), Some(WriteOutcome::NoOp));
        assert_eq!(WriteOutcome::from_result("not_found"), None);
    }
}
