//! In-process storage implementation.
//!
//! Mirrors the observable behaviour of the remote store closely enough for
//! tests and offline runs: per-index id uniqueness, immediate visibility of
//! writes, and analyzed-text `match` semantics (a query matches when any of
//! its lowercase terms occurs in the field). Hits come back in insertion
//! order instead of by relevance.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::storage::{
    Document, DocumentStore, IndexCreation, IndexDefinition, Query, SearchHits, SearchRequest,
    StoredDocument, WriteOutcome, WriteResult,
};

#[derive(Debug)]
struct Entry {
    seq: u64,
    source: Document,
}

#[derive(Debug)]
struct MemoryIndex {
    definition: Option<IndexDefinition>,
    docs: HashMap<String, Entry>,
    next_seq: u64,
}

impl MemoryIndex {
    fn new(definition: Option<IndexDefinition>) -> Self {
        Self {
            definition,
            docs: HashMap::new(),
            next_seq: 0,
        }
    }
}

/// Document store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    indices: RwLock<HashMap<String, MemoryIndex>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapping the index was created with, if it was created explicitly.
    pub async fn definition(&self, index: &str) -> Option<IndexDefinition> {
        self.indices
            .read()
            .await
            .get(index)
            .and_then(|idx| idx.definition.clone())
    }

    pub async fn index_count(&self) -> usize {
        self.indices.read().await.len()
    }

    /// Number of documents in an index.
    pub async fn len(&self, index: &str) -> usize {
        self.indices
            .read()
            .await
            .get(index)
            .map_or(0, |idx| idx.docs.len())
    }
}

/// Lowercase alphanumeric terms, the way a standard analyzer splits text.
fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn field_terms(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => terms(s),
        Value::Array(values) => values.iter().flat_map(field_terms).collect(),
        Value::Number(n) => vec![n.to_string()],
        Value::Bool(b) => vec![b.to_string()],
        _ => Vec::new(),
    }
}

/// Whether `field` holds any of `query_terms`, or all of them when `require_all`.
fn field_matches(
    source: &Document,
    field: &str,
    query_terms: &[String],
    require_all: bool,
) -> bool {
    source.get(field).is_some_and(|value| {
        let values = field_terms(value);
        if require_all {
            !query_terms.is_empty() && query_terms.iter().all(|t| values.contains(t))
        } else {
            query_terms.iter().any(|t| values.contains(t))
        }
    })
}

fn matches(query: &Query, source: &Document) -> bool {
    match query {
        Query::MatchAll => true,
        Query::Match { field, value } => field_matches(source, field, &terms(value), true),
        Query::MultiMatch { query, fields } => {
            let query_terms = terms(query);
            fields
                .iter()
                .any(|f| field_matches(source, f, &query_terms, false))
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        Ok(self.indices.read().await.contains_key(index))
    }

    async fn create_index(
        &self,
        index: &str,
        definition: &IndexDefinition,
    ) -> Result<IndexCreation> {
        let mut indices = self.indices.write().await;
        if indices.contains_key(index) {
            return Ok(IndexCreation::AlreadyExists);
        }
        indices.insert(index.to_string(), MemoryIndex::new(Some(definition.clone())));
        log::info!("Created index '{}'", index);
        Ok(IndexCreation::Created)
    }

    async fn put(
        &self,
        index: &str,
        id: Option<&str>,
        document: &Document,
    ) -> Result<WriteResult> {
        let mut indices = self.indices.write().await;
        // Writing to a missing index creates it without a mapping, like the remote store.
        let idx = indices
            .entry(index.to_string())
            .or_insert_with(|| MemoryIndex::new(None));

        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

        let outcome = match idx.docs.get_mut(&id) {
            Some(entry) => {
                entry.source = document.clone();
                WriteOutcome::Updated
            }
            None => {
                let seq = idx.next_seq;
                idx.next_seq += 1;
                idx.docs.insert(
                    id.clone(),
                    Entry {
                        seq,
                        source: document.clone(),
                    },
                );
                WriteOutcome::Created
            }
        };
        Ok(WriteResult { id, outcome })
    }

    async fn get(&self, index: &str, id: &str) -> Result<Option<StoredDocument>> {
        let indices = self.indices.read().await;
        Ok(indices
            .get(index)
            .and_then(|idx| idx.docs.get(id))
            .map(|entry| StoredDocument {
                id: id.to_string(),
                source: entry.source.clone(),
            }))
    }

    async fn update(&self, index: &str, id: &str, fields: &Document) -> Result<WriteOutcome> {
        let mut indices = self.indices.write().await;
        let entry = indices
            .get_mut(index)
            .and_then(|idx| idx.docs.get_mut(id))
            .ok_or_else(|| AppError::not_found(format!("Document in '{index}'"), id))?;

        let mut changed = false;
        for (key, value) in fields {
            if entry.source.get(key) != Some(value) {
                entry.source.insert(key.clone(), value.clone());
                changed = true;
            }
        }
        Ok(if changed {
            WriteOutcome::Updated
        } else {
            WriteOutcome::NoOp
        })
    }

    async fn delete(&self, index: &str, id: &str) -> Result<WriteOutcome> {
        let mut indices = self.indices.write().await;
        indices
            .get_mut(index)
            .and_then(|idx| idx.docs.remove(id))
            .map(|_| WriteOutcome::Deleted)
            .ok_or_else(|| AppError::not_found(format!("Document in '{index}'"), id))
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> Result<SearchHits> {
        let indices = self.indices.read().await;
        let idx = indices
            .get(index)
            .ok_or_else(|| AppError::store(404, format!("no such index [{index}]")))?;

        let mut matched: Vec<(&String, &Entry)> = idx
            .docs
            .iter()
            .filter(|(_, entry)| matches(&request.query, &entry.source))
            .collect();
        matched.sort_by_key(|(_, entry)| entry.seq);

        let total = matched.len() as u64;
        let hits = matched
            .into_iter()
            .skip(usize::try_from(request.from).unwrap_or(usize::MAX))
            .take(usize::try_from(request.size).unwrap_or(usize::MAX))
            .map(|(id, entry)| StoredDocument {
                id: id.clone(),
                source: entry.source.clone(),
            })
            .collect();

        Ok(SearchHits { total, hits })
    }
}
