// src/context.rs

//! Wiring of store, repositories and services.
//!
//! Everything is built from explicit handles: production code passes an
//! [`OpenSearchStore`] and [`HipolabsProvider`], tests pass a
//! [`MemoryStore`](crate::storage::MemoryStore) and a stub provider.

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::repository::{ItemRepository, UniversityRepository};
use crate::services::{HipolabsProvider, UniversityDirectory, UniversityProvider};
use crate::storage::{DocumentStore, IndexCreation, OpenSearchStore};

/// Shared handles used by the CLI and any API layer.
#[derive(Clone)]
pub struct AppContext {
    pub items: ItemRepository,
    pub universities: UniversityDirectory,
}

impl AppContext {
    pub fn new(
        config: &Config,
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn UniversityProvider>,
    ) -> Self {
        let (shards, replicas) = (config.store.shards, config.store.replicas);
        let items = ItemRepository::new(Arc::clone(&store), &config.indices.items)
            .with_index_settings(shards, replicas);
        let universities = UniversityRepository::new(store, &config.indices.universities)
            .with_index_settings(shards, replicas);

        Self {
            items,
            universities: UniversityDirectory::new(universities, provider),
        }
    }

    /// Connect to the configured cluster and provider.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(OpenSearchStore::from_config(&config.store)?);
        let provider = Arc::new(HipolabsProvider::from_config(&config.provider)?);
        Ok(Self::new(config, store, provider))
    }

    /// Create both indices if missing. Run once at startup.
    pub async fn ensure_indices(&self) -> Result<(IndexCreation, IndexCreation)> {
        futures::try_join!(
            self.items.ensure_index(),
            self.universities.repository().ensure_index()
        )
    }
}
