// src/services/universities.rs

//! University lookups by country with cache-aside backfill.
//!
//! A lookup first searches the local index. Only when the store has no
//! matches at all for the country does it call the external provider, write
//! the new candidates, and search again. There is no per-country lock: two
//! concurrent misses may both backfill, which rewrites identical documents
//! under the same ids and can over-count `total_saved`.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{Page, PageRequest, RawUniversity, SaveResult, University};
use crate::repository::UniversityRepository;
use crate::services::UniversityProvider;
use crate::storage::WriteOutcome;

const COUNTRY_FIELD: &str = "country";

/// Country lookup service over the universities index.
#[derive(Clone)]
pub struct UniversityDirectory {
    universities: UniversityRepository,
    provider: Arc<dyn UniversityProvider>,
}

impl UniversityDirectory {
    pub fn new(universities: UniversityRepository, provider: Arc<dyn UniversityProvider>) -> Self {
        Self {
            universities,
            provider,
        }
    }

    pub fn repository(&self) -> &UniversityRepository {
        &self.universities
    }

    /// Universities in `country`, backfilling from the provider on a miss.
    ///
    /// A page past the last one is still a hit when the country has data.
    /// When the provider knows nothing about the country the result is an
    /// empty page with `total == 0`.
    pub async fn lookup_by_country(
        &self,
        country: &str,
        page: PageRequest,
    ) -> Result<Page<University>> {
        let country = normalize(country)?;

        let probe = self.find(country, page).await?;
        if !probe.is_empty() || probe.total > 0 {
            log::debug!(
                "Cache hit for '{}': {} of {} on page {}",
                country,
                probe.data.len(),
                probe.total,
                page.page
            );
            return Ok(probe);
        }

        log::info!("Cache miss for '{}', fetching from provider", country);
        let result = self.fetch_and_save(country).await?;
        log::info!(
            "Backfilled '{}': {} fetched, {} saved",
            country,
            result.total_fetched,
            result.total_saved
        );

        self.find(country, page).await
    }

    /// Fetch every candidate for `country` and store the new ones.
    pub async fn fetch_and_save(&self, country: &str) -> Result<SaveResult> {
        let country = normalize(country)?;
        let candidates = self.provider.fetch_candidates(country).await?;
        let total_fetched = candidates.len();
        let total_saved = self.save_candidates(candidates).await?;
        Ok(SaveResult {
            total_fetched,
            total_saved,
        })
    }

    /// Store candidates in order, returning how many were newly created.
    ///
    /// Candidates without a domain are skipped. So is any candidate whose
    /// first domain is already stored, including one written earlier in the
    /// same batch. Processing is sequential so that check sees earlier writes.
    pub async fn save_candidates(&self, candidates: Vec<RawUniversity>) -> Result<usize> {
        let mut saved = 0;

        for candidate in candidates {
            let Some(id) = candidate.natural_key().map(str::to_string) else {
                log::debug!(
                    "Skipping candidate without domains: {:?}",
                    candidate.name.as_deref().unwrap_or("<unnamed>")
                );
                continue;
            };

            if self.universities.exists(&id).await? {
                log::debug!("Skipping existing university {}", id);
                continue;
            }

            let fields = candidate.into_fields();
            if self.universities.put(&id, &fields).await? == WriteOutcome::Created {
                saved += 1;
            }
        }

        Ok(saved)
    }

    async fn find(&self, country: &str, page: PageRequest) -> Result<Page<University>> {
        self.universities.find_by(COUNTRY_FIELD, country, page).await
    }
}

fn normalize(country: &str) -> Result<&str> {
    let country = country.trim();
    if country.is_empty() {
        return Err(AppError::validation("country must not be empty"));
    }
    Ok(country)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::models::UniversityFields;
    use crate::storage::{DocumentStore, MemoryStore};

    /// Provider returning a fixed response and counting calls.
    struct StubProvider {
        response: Mutex<Result<Vec<RawUniversity>>>,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn returning(candidates: Vec<RawUniversity>) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(Ok(candidates)),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(Err(AppError::upstream(status, "unavailable"))),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UniversityProvider for StubProvider {
        async fn fetch_candidates(&self, _country: &str) -> Result<Vec<RawUniversity>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &*self.response.lock().unwrap() {
                Ok(candidates) => Ok(candidates.clone()),
                Err(AppError::Upstream { status, message }) => Err(AppError::Upstream {
                    status: *status,
                    message: message.clone(),
                }),
                Err(other) => panic!("unsupported stub error {other}"),
            }
        }
    }

    fn candidate(name: &str, domains: &[&str], country: &str) -> RawUniversity {
        serde_json::from_value(json!({
            "name": name,
            "domains": domains,
            "web_pages": domains.iter().map(|d| format!("https://{d}")).collect::<Vec<_>>(),
            "country": country,
            "alpha_two_code": "XX",
        }))
        .unwrap()
    }

    async fn directory(provider: Arc<StubProvider>) -> (Arc<MemoryStore>, UniversityDirectory) {
        let store = Arc::new(MemoryStore::new());
        let repo = UniversityRepository::new(store.clone(), "universities");
        repo.ensure_index().await.unwrap();
        (store, UniversityDirectory::new(repo, provider))
    }

    fn first_page() -> PageRequest {
        PageRequest::new(1, 10).unwrap()
    }

    #[tokio::test]
    async fn test_cache_hit_never_calls_provider() {
        let provider = StubProvider::returning(vec![]);
        let (_, directory) = directory(provider.clone()).await;
        for i in 0..12 {
            let domain = format!("u{i}.jp");
            let fields = candidate(&format!("Uni {i}"), &[domain.as_str()], "Japan").into_fields();
            directory.repository().put(&domain, &fields).await.unwrap();
        }

        let page = directory.lookup_by_country("Japan", first_page()).await.unwrap();
        assert_eq!(provider.calls(), 0);
        assert_eq!(page.total, 12);
        assert_eq!(page.data.len(), 10);
        assert_eq!(page.remaining, 2);
    }

    #[tokio::test]
    async fn test_page_past_end_is_hit() {
        let provider = StubProvider::returning(vec![candidate("Late", &["late.jp"], "Japan")]);
        let (_, directory) = directory(provider.clone()).await;
        let fields = candidate("Uni", &["u.jp"], "Japan").into_fields();
        directory.repository().put("u.jp", &fields).await.unwrap();

        let page = directory
            .lookup_by_country("Japan", PageRequest::new(5, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(provider.calls(), 0);
        assert!(page.data.is_empty());
        assert_eq!(page.total, 1);
        assert_eq!(page.remaining, 0);
    }

    #[tokio::test]
    async fn test_miss_backfills_then_hits() {
        let provider = StubProvider::returning(vec![
            candidate("Nairobi", &["uonbi.ac.ke"], "Kenya"),
            candidate("Kenyatta", &["ku.ac.ke"], "Kenya"),
            candidate("Strathmore", &["strathmore.edu"], "Kenya"),
        ]);
        let (_, directory) = directory(provider.clone()).await;

        let first = directory.lookup_by_country("Kenya", first_page()).await.unwrap();
        assert_eq!(first.total, 3);
        assert_eq!(first.data[0].id, "uonbi.ac.ke");
        assert_eq!(first.data[0].fields.name, "Nairobi");

        let second = directory.lookup_by_country("Kenya", first_page()).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_country_sharing_a_word_is_still_a_miss() {
        let provider = StubProvider::returning(vec![candidate("MIT", &["mit.edu"], "United States")]);
        let (_, directory) = directory(provider.clone()).await;
        let oxford = candidate("Oxford", &["ox.ac.uk"], "United Kingdom").into_fields();
        directory.repository().put("ox.ac.uk", &oxford).await.unwrap();

        let page = directory
            .lookup_by_country("United States", first_page())
            .await
            .unwrap();
        assert_eq!(provider.calls(), 1);
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].id, "mit.edu");
    }

    #[tokio::test]
    async fn test_fetch_and_save_counts_only_new_records() {
        let provider = StubProvider::returning(vec![
            candidate("Nairobi", &["uonbi.ac.ke"], "Kenya"),
            candidate("Kenyatta", &["ku.ac.ke"], "Kenya"),
            candidate("Strathmore", &["strathmore.edu"], "Kenya"),
        ]);
        let (store, directory) = directory(provider).await;
        let existing = candidate("Kenyatta (old)", &["ku.ac.ke"], "Kenya").into_fields();
        directory.repository().put("ku.ac.ke", &existing).await.unwrap();

        let result = directory.fetch_and_save("Kenya").await.unwrap();
        assert_eq!(
            result,
            SaveResult {
                total_fetched: 3,
                total_saved: 2
            }
        );
        // The existing record is left untouched.
        let kept = directory.repository().get("ku.ac.ke").await.unwrap();
        assert_eq!(kept.fields.name, "Kenyatta (old)");
        assert_eq!(store.len("universities").await, 3);
    }

    #[tokio::test]
    async fn test_natural_key_and_empty_domains() {
        let mut no_domains = candidate("Nowhere", &[], "Peru");
        no_domains.domains = Some(vec![]);
        let provider = StubProvider::returning(vec![
            candidate("XY", &["x.edu", "y.edu"], "Peru"),
            no_domains,
            RawUniversity {
                name: Some("Absent".into()),
                country: Some("Peru".into()),
                ..RawUniversity::default()
            },
        ]);
        let (store, directory) = directory(provider).await;

        let result = directory.fetch_and_save("Peru").await.unwrap();
        assert_eq!(result.total_fetched, 3);
        assert_eq!(result.total_saved, 1);
        assert_eq!(store.len("universities").await, 1);

        let stored = directory.repository().get("x.edu").await.unwrap();
        assert_eq!(stored.fields.domains, vec!["x.edu".to_string(), "y.edu".to_string()]);
        assert!(directory.repository().find("y.edu").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_key_in_one_response_first_wins() {
        let provider = StubProvider::returning(vec![
            candidate("First", &["dup.edu"], "Chile"),
            candidate("Second", &["dup.edu"], "Chile"),
        ]);
        let (_, directory) = directory(provider).await;

        let result = directory.fetch_and_save("Chile").await.unwrap();
        assert_eq!(result.total_saved, 1);
        let stored = directory.repository().get("dup.edu").await.unwrap();
        assert_eq!(stored.fields.name, "First");
    }

    #[tokio::test]
    async fn test_upstream_failure_fails_lookup() {
        let provider = StubProvider::failing(503);
        let (_, directory) = directory(provider.clone()).await;

        let err = directory
            .lookup_by_country("Kenya", first_page())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream { status: Some(503), .. }));
        assert_eq!(err.status_code(), 502);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_country_returns_empty_page() {
        let provider = StubProvider::returning(vec![]);
        let (_, directory) = directory(provider.clone()).await;

        let page = directory.lookup_by_country("Atlantis", first_page()).await.unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.remaining, 0);

        // Still empty, so the next lookup asks the provider again.
        directory.lookup_by_country("Atlantis", first_page()).await.unwrap();
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_blank_country_is_rejected() {
        let provider = StubProvider::returning(vec![]);
        let (_, directory) = directory(provider.clone()).await;

        let err = directory.lookup_by_country("  ", first_page()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_misses_converge() {
        let provider = StubProvider::returning(vec![
            candidate("A", &["a.edu"], "Ghana"),
            candidate("B", &["b.edu"], "Ghana"),
        ]);
        let (store, directory) = directory(provider).await;

        let (left, right) = tokio::join!(
            directory.lookup_by_country("Ghana", first_page()),
            directory.lookup_by_country("Ghana", first_page()),
        );
        assert_eq!(left.unwrap().total, 2);
        assert_eq!(right.unwrap().total, 2);
        assert_eq!(store.len("universities").await, 2);
        assert!(store.get("universities", "a.edu").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_backfilled_records_round_trip_through_fields() {
        let provider = StubProvider::returning(vec![candidate("Andes", &["andes.edu.co"], "Colombia")]);
        let (_, directory) = directory(provider).await;

        let page = directory.lookup_by_country("Colombia", first_page()).await.unwrap();
        let expected = UniversityFields {
            web_pages: vec!["https://andes.edu.co".into()],
            state_province: None,
            name: "Andes".into(),
            domains: vec!["andes.edu.co".into()],
            country: "Colombia".into(),
            alpha_two_code: "XX".into(),
        };
        assert_eq!(page.data[0].fields, expected);
    }
}
