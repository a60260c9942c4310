//! Per-kind index mappings and search fields.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::models::{ItemFields, ItemPatch, UniversityFields, UniversityPatch, Validate};
use crate::storage::{FieldType, IndexDefinition};

/// A resource kind stored in its own index.
pub trait Resource: Serialize + DeserializeOwned + Validate + Send + Sync + 'static {
    /// Partial update accepted for this kind.
    type Patch: Serialize + Validate + Send + Sync;

    /// Name used in error messages.
    const KIND: &'static str;

    /// Fields searched by free-text queries.
    const SEARCH_FIELDS: &'static [&'static str];

    fn mapping() -> IndexDefinition;
}

impl Resource for ItemFields {
    type Patch = ItemPatch;

    const KIND: &'static str = "Item";
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "description"];

    fn mapping() -> IndexDefinition {
        IndexDefinition::new(&[
            ("name", FieldType::Text),
            ("description", FieldType::Text),
            ("price", FieldType::Float),
            ("in_stock", FieldType::Boolean),
        ])
    }
}

impl Resource for UniversityFields {
    type Patch = UniversityPatch;

    const KIND: &'static str = "University";
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "country"];

    fn mapping() -> IndexDefinition {
        IndexDefinition::new(&[
            ("name", FieldType::Text),
            ("country", FieldType::Text),
            ("state_province", FieldType::Text),
            ("domains", FieldType::Text),
            ("web_pages", FieldType::Text),
            ("alpha_two_code", FieldType::Text),
        ])
    }
}
