//! Service layer for the directory.
//!
//! This module contains the business logic for:
//! - Fetching candidate universities from the external provider (`HipolabsProvider`)
//! - Country lookups with cache-aside backfill (`UniversityDirectory`)

mod provider;
mod universities;

pub use provider::{HipolabsProvider, UniversityProvider};
pub use universities::UniversityDirectory;
