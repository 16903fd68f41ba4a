//! Crawl orchestration.
//!
//! Sites are crawled one at a time with a pause between them; within a site
//! detail pages are fetched sequentially with a randomized delay. A single
//! run guard covers the whole crawler, so a second `run_all`/`run_one` while
//! one is active is rejected instead of racing the existence checks.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use rand::Rng;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::classify::Classifier;
use crate::config::{KeywordDictionaries, SiteDescriptor, SiteRegistry};
use crate::credit::CreditDetector;
use crate::entities::{CrawlLogEntry, CrawlStatus, PolicyCandidate, RunReport};
use crate::extractor::{ExtractError, ListPage, StrategyRegistry, extract_detail};
use crate::fetcher::{FetchError, Fetcher};
use crate::repositories::PolicyStore;
use crate::translate::TranslationEnricher;

/// Errors surfaced to callers of the boundary operations.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("unknown site: {0}")]
    UnknownSite(String),

    #[error("a crawl run is already in progress")]
    AlreadyRunning,
}

/// Failure that ends one site's run. Recorded in its crawl log entry.
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("list page fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("list page extraction failed: {0}")]
    Extract(#[from] ExtractError),
}

/// Politeness delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Pause between two consecutive sites.
    pub site_delay: Duration,
    pub detail_delay_min: Duration,
    pub detail_delay_max: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            site_delay: Duration::from_secs(3),
            detail_delay_min: Duration::from_millis(500),
            detail_delay_max: Duration::from_millis(1500),
        }
    }
}

impl Pacing {
    /// No delays at all. Used by tests.
    pub fn none() -> Self {
        Self {
            site_delay: Duration::ZERO,
            detail_delay_min: Duration::ZERO,
            detail_delay_max: Duration::ZERO,
        }
    }

    fn detail_delay(&self) -> Duration {
        if self.detail_delay_max <= self.detail_delay_min {
            return self.detail_delay_min;
        }
        rand::thread_rng().gen_range(self.detail_delay_min..=self.detail_delay_max)
    }
}

/// What happened to one extracted item. Dropped items count as neither new
/// nor duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Added,
    Duplicate,
    Dropped,
}

pub struct Crawler {
    sites: SiteRegistry,
    fetcher: Fetcher,
    strategies: StrategyRegistry,
    classifier: Classifier,
    credit: CreditDetector,
    translator: TranslationEnricher,
    store: Arc<dyn PolicyStore>,
    pacing: Pacing,
    run_guard: Mutex<()>,
}

impl Crawler {
    /// Crawler with the built-in strategies, default fetcher and pacing, and
    /// dictionary-only translation into en/vi/th.
    pub fn new(
        sites: SiteRegistry,
        dictionaries: &KeywordDictionaries,
        store: Arc<dyn PolicyStore>,
    ) -> Self {
        Self {
            sites,
            fetcher: Fetcher::default(),
            strategies: StrategyRegistry::with_builtin(),
            classifier: Classifier::from_dictionaries(dictionaries),
            credit: CreditDetector::new(dictionaries.credit.clone()),
            translator: TranslationEnricher::new(
                None,
                vec!["en".to_string(), "vi".to_string(), "th".to_string()],
            ),
            store,
            pacing: Pacing::default(),
            run_guard: Mutex::new(()),
        }
    }

    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_strategies(mut self, strategies: StrategyRegistry) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_translator(mut self, translator: TranslationEnricher) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn store(&self) -> &Arc<dyn PolicyStore> {
        &self.store
    }

    /// Every configured site, enabled or not, in registry order.
    pub fn list_sites(&self) -> &[SiteDescriptor] {
        self.sites.all()
    }

    pub async fn list_logs(&self, limit: usize) -> anyhow::Result<Vec<CrawlLogEntry>> {
        self.store.list_crawl_logs(limit).await
    }

    pub fn is_running(&self) -> bool {
        self.run_guard.try_lock().is_err()
    }

    /// Crawl every enabled site in order. One site's failure never aborts
    /// the batch.
    pub async fn run_all(&self) -> Result<RunReport, CrawlError> {
        let _guard = self
            .run_guard
            .try_lock()
            .map_err(|_| CrawlError::AlreadyRunning)?;

        let sites: Vec<&SiteDescriptor> = self.sites.enabled().collect();
        info!(sites = sites.len(), "crawl run started");

        let mut results = Vec::with_capacity(sites.len());
        for (idx, site) in sites.iter().enumerate() {
            if idx > 0 && !self.pacing.site_delay.is_zero() {
                tokio::time::sleep(self.pacing.site_delay).await;
            }
            results.push(self.crawl_site(site).await);
        }

        let report = RunReport {
            timestamp: Utc::now(),
            total_sites: sites.len(),
            total_new_added: results.iter().map(|r| r.new_added).sum(),
            results,
        };
        info!(
            sites = report.total_sites,
            new_added = report.total_new_added,
            errors = report
                .results
                .iter()
                .filter(|r| r.status == CrawlStatus::Error)
                .count(),
            "crawl run finished"
        );
        Ok(report)
    }

    /// Crawl a single site by id, whether or not it is enabled.
    pub async fn run_one(&self, site_id: &str) -> Result<CrawlLogEntry, CrawlError> {
        let site = self
            .sites
            .get(site_id)
            .ok_or_else(|| CrawlError::UnknownSite(site_id.to_string()))?;
        let _guard = self
            .run_guard
            .try_lock()
            .map_err(|_| CrawlError::AlreadyRunning)?;

        Ok(self.crawl_site(site).await)
    }

    #[instrument(skip_all, fields(site = %site.id))]
    async fn crawl_site(&self, site: &SiteDescriptor) -> CrawlLogEntry {
        let started_at = Utc::now();
        let mut entry = CrawlLogEntry {
            site_id: site.id.clone(),
            site_name: site.name.clone(),
            status: CrawlStatus::Success,
            total_found: 0,
            new_added: 0,
            duplicates_skipped: 0,
            error_message: None,
            started_at,
            completed_at: started_at,
        };

        match self.process_site(site, &mut entry).await {
            Ok(()) => info!(
                found = entry.total_found,
                new_added = entry.new_added,
                duplicates = entry.duplicates_skipped,
                "site crawled"
            ),
            Err(err) => {
                error!(error = %err, "site crawl failed");
                entry.status = CrawlStatus::Error;
                entry.error_message = Some(err.to_string());
            }
        }
        entry.completed_at = Utc::now();

        if let Err(err) = self.store.append_crawl_log(&entry).await {
            warn!(error = %err, "failed to write crawl log");
        }
        entry
    }

    async fn process_site(
        &self,
        site: &SiteDescriptor,
        entry: &mut CrawlLogEntry,
    ) -> Result<(), SiteError> {
        let response = self.fetcher.fetch(&site.url).await?;
        let page = ListPage::from(&response);
        let today = page.today;

        let candidates: Vec<PolicyCandidate> = self
            .strategies
            .extract(&page, site)?
            .into_iter()
            .filter(PolicyCandidate::has_usable_title)
            .collect();
        entry.total_found = candidates.len() as u32;

        for candidate in candidates {
            match self.process_item(site, candidate, today).await {
                ItemOutcome::Added => entry.new_added += 1,
                ItemOutcome::Duplicate => entry.duplicates_skipped += 1,
                ItemOutcome::Dropped => {}
            }
        }
        Ok(())
    }

    async fn process_item(
        &self,
        site: &SiteDescriptor,
        mut candidate: PolicyCandidate,
        today: NaiveDate,
    ) -> ItemOutcome {
        self.classifier.enrich(&mut candidate, &site.category, today);

        match self.store.exists(&candidate.dedup_key()).await {
            Ok(true) => {
                debug!(title = %candidate.title, "duplicate skipped");
                return ItemOutcome::Duplicate;
            }
            Ok(false) => {}
            Err(err) => {
                warn!(title = %candidate.title, error = %err, "existence check failed, item skipped");
                return ItemOutcome::Dropped;
            }
        }

        self.fetch_detail(site, &mut candidate).await;

        let text = if candidate.content.is_empty() {
            candidate.summary.clone()
        } else {
            candidate.content.clone()
        };
        let analysis = self
            .credit
            .analyze(&text, &candidate.title, &candidate.category);
        candidate.credit_required = analysis.is_required;
        candidate.credit_keywords = analysis.matched_keywords;

        candidate.translations = self.translator.translate_candidate(&candidate).await;

        if self.persist(&candidate).await {
            ItemOutcome::Added
        } else {
            ItemOutcome::Dropped
        }
    }

    /// Fill content and attachments from the detail page. Any failure keeps
    /// the list-page summary as content.
    async fn fetch_detail(&self, site: &SiteDescriptor, candidate: &mut PolicyCandidate) {
        candidate.content = candidate.summary.clone();
        // Items without their own detail page point back at the list page.
        let Ok(detail_url) = Url::parse(&candidate.original_url) else {
            return;
        };
        if !matches!(detail_url.scheme(), "http" | "https")
            || Url::parse(&site.url).is_ok_and(|list| list == detail_url)
        {
            return;
        }

        let delay = self.pacing.detail_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let response = match self.fetcher.fetch(detail_url.as_str()).await {
            Ok(response) => response,
            Err(err) => {
                warn!(title = %candidate.title, url = %candidate.original_url, error = %err, "detail fetch failed");
                return;
            }
        };

        match extract_detail(&response.body_utf8, &response.url_final, &site.locators) {
            Ok(detail) => {
                if !detail.content.is_empty() {
                    candidate.content = detail.content;
                }
                candidate.attachments = detail.attachments;
            }
            Err(err) => {
                warn!(title = %candidate.title, error = %err, "detail extraction failed");
            }
        }
    }

    async fn persist(&self, candidate: &PolicyCandidate) -> bool {
        let first = match self.store.insert_policy(candidate).await {
            Ok(id) => {
                debug!(%id, title = %candidate.title, "policy stored");
                return true;
            }
            Err(err) => err,
        };

        warn!(title = %candidate.title, error = %first, "save failed, retrying without translations");
        match self.store.insert_policy(&candidate.untranslated()).await {
            Ok(id) => {
                debug!(%id, title = %candidate.title, "untranslated policy stored");
                true
            }
            Err(err) => {
                warn!(title = %candidate.title, error = %err, "save failed, item dropped");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{DedupKey, PolicyStatus};
    use crate::repositories::MockPolicyStore;
    use mockall::predicate::*;

    fn dictionaries() -> KeywordDictionaries {
        KeywordDictionaries::load(None).unwrap()
    }

    fn registry(url: &str) -> SiteRegistry {
        SiteRegistry::from_json(
            &format!(
                r#"{{"sites":[{{"id":"eps","name":"EPS","url":"{url}","category":"employment",
                   "locators":{{"list":"tr","title":"a","link":"a@href"}}}}]}}"#
            ),
            "test",
        )
        .unwrap()
    }

    #[test]
    fn pacing_delay_stays_in_range() {
        let pacing = Pacing::default();
        for _ in 0..20 {
            let delay = pacing.detail_delay();
            assert!(delay >= Duration::from_millis(500) && delay <= Duration::from_millis(1500));
        }
        assert!(Pacing::none().detail_delay().is_zero());
    }

    #[tokio::test]
    async fn unknown_site_is_rejected() {
        let store = Arc::new(MockPolicyStore::new());
        let crawler = Crawler::new(registry("https://x.go.kr/"), &dictionaries(), store);
        let err = crawler.run_one("nope").await.unwrap_err();
        assert!(matches!(err, CrawlError::UnknownSite(id) if id == "nope"));
    }

    #[tokio::test]
    async fn failed_translated_save_retries_untranslated() {
        let mut store = MockPolicyStore::new();
        store
            .expect_insert_policy()
            .withf(|p: &PolicyCandidate| !p.translations.is_empty())
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("document too large")));
        store
            .expect_insert_policy()
            .withf(|p: &PolicyCandidate| p.translations.is_empty())
            .times(1)
            .returning(|_| Ok(uuid::Uuid::new_v4()));

        let crawler = Crawler::new(registry("https://x.go.kr/"), &dictionaries(), Arc::new(store));
        let mut candidate = PolicyCandidate::skeleton("eps", "eps-1", "채용 안내", "https://x.go.kr/");
        candidate.translations = crawler.translator.translate_candidate(&candidate).await;
        assert!(crawler.persist(&candidate).await);
    }

    #[tokio::test]
    async fn item_is_dropped_when_both_saves_fail() {
        let mut store = MockPolicyStore::new();
        store
            .expect_insert_policy()
            .times(2)
            .returning(|_| Err(anyhow::anyhow!("connection closed")));

        let crawler = Crawler::new(registry("https://x.go.kr/"), &dictionaries(), Arc::new(store));
        let candidate = PolicyCandidate::skeleton("eps", "eps-1", "채용 안내", "https://x.go.kr/");
        assert!(!crawler.persist(&candidate).await);
    }

    #[tokio::test]
    async fn duplicates_skip_detail_and_save() {
        let mut store = MockPolicyStore::new();
        store
            .expect_exists()
            .with(function(|key: &DedupKey| key.title == "고용허가제 안내"))
            .times(1)
            .returning(|_| Ok(true));
        store.expect_insert_policy().never();

        let crawler = Crawler::new(registry("https://x.go.kr/"), &dictionaries(), Arc::new(store))
            .with_pacing(Pacing::none());
        let site = crawler.sites.get("eps").unwrap().clone();
        let candidate =
            PolicyCandidate::skeleton("eps", "eps-1", "고용허가제 안내", "https://x.go.kr/view?id=1");
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let outcome = crawler.process_item(&site, candidate, today).await;
        assert_eq!(outcome, ItemOutcome::Duplicate);
    }

    #[tokio::test]
    async fn failed_existence_check_drops_the_item() {
        let mut store = MockPolicyStore::new();
        store
            .expect_exists()
            .returning(|_| Err(anyhow::anyhow!("pool timed out")));
        store.expect_insert_policy().never();

        let crawler = Crawler::new(registry("https://x.go.kr/"), &dictionaries(), Arc::new(store))
            .with_pacing(Pacing::none());
        let site = crawler.sites.get("eps").unwrap().clone();
        let candidate = PolicyCandidate::skeleton("eps", "eps-3", "근로자 지원 안내", "https://x.go.kr/");
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(
            crawler.process_item(&site, candidate, today).await,
            ItemOutcome::Dropped
        );
    }

    #[tokio::test]
    async fn list_page_items_keep_summary_and_get_credit_verdict() {
        let mut store = MockPolicyStore::new();
        store.expect_exists().returning(|_| Ok(false));
        store
            .expect_insert_policy()
            .withf(|p: &PolicyCandidate| {
                p.content == p.summary
                    && p.credit_required
                    && p.credit_keywords == vec!["대출 심사".to_string()]
                    && p.status == PolicyStatus::Open
                    && p.translations.len() == 3
            })
            .times(1)
            .returning(|_| Ok(uuid::Uuid::new_v4()));

        let crawler = Crawler::new(registry("https://x.go.kr/"), &dictionaries(), Arc::new(store))
            .with_pacing(Pacing::none());
        let site = crawler.sites.get("eps").unwrap().clone();
        // Links back to the list page itself, so no detail fetch happens.
        let candidate =
            PolicyCandidate::skeleton("eps", "eps-2", "소상공인 대출 심사 안내", "https://x.go.kr/");
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(
            crawler.process_item(&site, candidate, today).await,
            ItemOutcome::Added
        );
    }
}
