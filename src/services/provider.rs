// src/services/provider.rs

//! External university data provider.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::config::ProviderConfig;
use crate::error::{AppError, Result};
use crate::models::RawUniversity;
use crate::utils::http;

/// Source of candidate university records for a country.
#[async_trait]
pub trait UniversityProvider: Send + Sync {
    /// Fetch raw candidates for `country`, in the provider's order.
    ///
    /// Any non-success response or transport failure is an `Upstream` error.
    async fn fetch_candidates(&self, country: &str) -> Result<Vec<RawUniversity>>;
}

/// Client for the universities.hipolabs.com search API.
#[derive(Clone)]
pub struct HipolabsProvider {
    client: Client,
    base_url: Url,
}

impl HipolabsProvider {
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
        })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let client = http::create_provider_client(config)?;
        Self::new(client, &config.base_url)
    }

    /// `{base_url}?country=<country>`, with the country percent-encoded.
    fn search_url(&self, country: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair("country", country);
        url
    }
}

#[async_trait]
impl UniversityProvider for HipolabsProvider {
    async fn fetch_candidates(&self, country: &str) -> Result<Vec<RawUniversity>> {
        let url = self.search_url(country);
        log::debug!("Fetching universities from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(AppError::upstream_unreachable)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AppError::upstream(
                status.as_u16(),
                format!("Failed to fetch universities for '{country}'"),
            ));
        }

        let candidates: Vec<RawUniversity> = response.json().await.map_err(|e| {
            AppError::upstream(status.as_u16(), format!("Invalid provider payload: {e}"))
        })?;
        log::info!(
            "Provider returned {} candidates for '{}'",
            candidates.len(),
            country
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn provider_for(server: &MockServer) -> HipolabsProvider {
        HipolabsProvider::new(Client::new(), &format!("{}/search", server.uri())).unwrap()
    }

    #[test]
    fn test_search_url_encodes_country() {
        let provider =
            HipolabsProvider::new(Client::new(), "http://universities.hipolabs.com/search")
                .unwrap();
        assert_eq!(
            provider.search_url("United States").as_str(),
            "http://universities.hipolabs.com/search?country=United+States"
        );
    }

    #[tokio::test]
    async fn test_fetch_candidates_parses_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("country", "Kenya"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "name": "University of Nairobi",
                    "domains": ["uonbi.ac.ke"],
                    "web_pages": ["https://uonbi.ac.ke"],
                    "country": "Kenya",
                    "alpha_two_code": "KE",
                    "state-province": null
                },
                { "name": "No Domain College", "country": "Kenya" }
            ])))
            .mount(&server)
            .await;

        let candidates = provider_for(&server).fetch_candidates("Kenya").await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].natural_key(), Some("uonbi.ac.ke"));
        assert_eq!(candidates[1].natural_key(), None);
    }

    #[tokio::test]
    async fn test_non_success_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = provider_for(&server).fetch_candidates("Kenya").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream { status: Some(503), .. }));
    }

    #[tokio::test]
    async fn test_unreachable_is_upstream_error() {
        // Nothing listens on the discard port.
        let provider = HipolabsProvider::new(Client::new(), "http://127.0.0.1:9/search").unwrap();
        let err = provider.fetch_candidates("Kenya").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream { status: None, .. }));
    }
}
