//! Typed CRUD over a document store.
//!
//! A [`Repository`] binds one resource kind to one index. It converts records
//! to stored documents (the `id` lives in the document key, never in the body)
//! and back, validates input before writing, and reports missing ids as
//! `NotFound` named after the kind.

mod resources;

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{ItemFields, Page, PageRequest, Record, UniversityFields, Validate};
use crate::storage::{
    Document, DocumentStore, IndexCreation, IndexDefinition, Query, SearchRequest,
    StoredDocument, WriteOutcome,
};

pub use resources::Resource;

pub type ItemRepository = Repository<ItemFields>;
pub type UniversityRepository = Repository<UniversityFields>;

/// Repository for one resource kind.
pub struct Repository<R: Resource> {
    store: Arc<dyn DocumentStore>,
    index: String,
    definition: IndexDefinition,
    _kind: PhantomData<fn() -> R>,
}

impl<R: Resource> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            index: self.index.clone(),
            definition: self.definition.clone(),
            _kind: PhantomData,
        }
    }
}

/// Serialize a value into a document body.
fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::validation(format!(
            "expected an object, got {other}"
        ))),
    }
}

impl<R: Resource> Repository<R> {
    pub fn new(store: Arc<dyn DocumentStore>, index: impl Into<String>) -> Self {
        Self {
            store,
            index: index.into(),
            definition: R::mapping(),
            _kind: PhantomData,
        }
    }

    /// Override the shard/replica counts used when the index is created.
    pub fn with_index_settings(mut self, shards: u32, replicas: u32) -> Self {
        self.definition = self.definition.with_settings(shards, replicas);
        self
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Create the index with this kind's mapping if it does not exist yet.
    pub async fn ensure_index(&self) -> Result<IndexCreation> {
        self.store.ensure_index(&self.index, &self.definition).await
    }

    fn not_found(&self, id: &str) -> AppError {
        AppError::not_found(R::KIND, id)
    }

    fn to_record(&self, doc: StoredDocument) -> Result<Record<R>> {
        let fields: R = serde_json::from_value(Value::Object(doc.source))?;
        Ok(Record::new(doc.id, fields))
    }

    /// Validate and store a new record under a freshly generated id.
    pub async fn create(&self, fields: R) -> Result<Record<R>> {
        fields.validate()?;
        let id = Uuid::new_v4().to_string();
        match self.put(&id, &fields).await? {
            WriteOutcome::Created => Ok(Record::new(id, fields)),
            other => Err(AppError::store(
                500,
                format!("failed to create {} {id}: store reported {other:?}", R::KIND),
            )),
        }
    }

    /// Write a record under a caller-chosen id, overwriting any existing one.
    pub async fn put(&self, id: &str, fields: &R) -> Result<WriteOutcome> {
        let document = to_document(fields)?;
        let result = self.store.put(&self.index, Some(id), &document).await?;
        Ok(result.outcome)
    }

    /// Fetch a record, or `None` when the id is absent.
    pub async fn find(&self, id: &str) -> Result<Option<Record<R>>> {
        self.store
            .get(&self.index, id)
            .await?
            .map(|doc| self.to_record(doc))
            .transpose()
    }

    pub async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.store.get(&self.index, id).await?.is_some())
    }

    /// Fetch a record; an absent id is `NotFound`.
    pub async fn get(&self, id: &str) -> Result<Record<R>> {
        self.find(id).await?.ok_or_else(|| self.not_found(id))
    }

    /// Apply the supplied patch fields and return the merged record.
    pub async fn update(&self, id: &str, patch: &R::Patch) -> Result<Record<R>> {
        patch.validate()?;
        if !self.exists(id).await? {
            return Err(self.not_found(id));
        }

        let fields = to_document(patch)?;
        if !fields.is_empty() {
            let outcome = self
                .store
                .update(&self.index, id, &fields)
                .await
                .map_err(|e| if e.is_not_found() { self.not_found(id) } else { e })?;
            log::debug!("{} {} update: {:?}", R::KIND, id, outcome);
        }
        self.get(id).await
    }

    /// Remove a record; an absent id is `NotFound`.
    pub async fn delete(&self, id: &str) -> Result<()> {
        if !self.exists(id).await? {
            return Err(self.not_found(id));
        }
        match self.store.delete(&self.index, id).await {
            Ok(WriteOutcome::Deleted) => Ok(()),
            Ok(other) => Err(AppError::store(
                500,
                format!("failed to delete {} {id}: store reported {other:?}", R::KIND),
            )),
            Err(e) if e.is_not_found() => Err(self.not_found(id)),
            Err(e) => Err(e),
        }
    }

    /// Free-text search over this kind's search fields; no text lists everything.
    pub async fn search(&self, text: Option<&str>, page: PageRequest) -> Result<Page<Record<R>>> {
        let query = match text.map(str::trim).filter(|t| !t.is_empty()) {
            Some(text) => Query::MultiMatch {
                query: text.to_string(),
                fields: R::SEARCH_FIELDS.iter().map(|f| f.to_string()).collect(),
            },
            None => Query::MatchAll,
        };
        self.query(query, page).await
    }

    /// Records whose `field` matches `value`.
    pub async fn find_by(
        &self,
        field: &str,
        value: &str,
        page: PageRequest,
    ) -> Result<Page<Record<R>>> {
        let query = Query::Match {
            field: field.to_string(),
            value: value.to_string(),
        };
        self.query(query, page).await
    }

    async fn query(&self, query: Query, page: PageRequest) -> Result<Page<Record<R>>> {
        let request = SearchRequest {
            query,
            from: page.offset(),
            size: page.size,
        };
        let hits = self.store.search(&self.index, &request).await?;
        let data = hits
            .hits
            .into_iter()
            .map(|doc| self.to_record(doc))
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(page, hits.total, data))
    }
}
