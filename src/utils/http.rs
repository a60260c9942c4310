// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::config::{ProviderConfig, StoreConfig};
use crate::error::Result;

/// Create the client used to talk to the document store.
///
/// Certificate verification follows `verify_certs`; clusters with
/// self-signed certificates are common in development.
pub fn create_store_client(config: &StoreConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .danger_accept_invalid_certs(!config.verify_certs)
        .build()?;
    Ok(client)
}

/// Create the client used to call the external university provider.
pub fn create_provider_client(config: &ProviderConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}
