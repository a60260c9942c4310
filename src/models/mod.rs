// src/models/mod.rs

//! Domain models for the directory.
//!
//! Each resource kind has a `*Fields` struct (what is stored), a `*Patch`
//! struct (a partial update where `None` means "leave unchanged") and is
//! returned to callers wrapped in [`Record`], which adds the document id.

mod item;
mod page;
mod university;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use item::{Item, ItemFields, ItemPatch};
pub use page::{Page, PageRequest};
pub use university::{RawUniversity, SaveResult, University, UniversityFields, UniversityPatch};

/// A stored record together with its document id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: String,
    #[serde(flatten)]
    pub fields: T,
}

impl<T> Record<T> {
    pub fn new(id: impl Into<String>, fields: T) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Input checks applied before anything reaches the store.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}
