//! List-page and detail-page extraction.
//!
//! Every site goes through an [`ExtractionStrategy`]. Sites whose markup
//! defies generic rules get a custom strategy registered by id; every other
//! site uses [`GenericExtractor`], driven by the site's field locators.

pub mod custom;
pub mod detail;
pub mod dom;
pub mod generic;
pub mod reader;

pub use custom::{BizinfoExtractor, HikoreaExtractor, KStartupExtractor, MoelExtractor};
pub use detail::{DetailContent, extract_detail};
pub use generic::GenericExtractor;

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::classify::today_kst;
use crate::config::SiteDescriptor;
use crate::entities::PolicyCandidate;
use crate::fetcher::PageResponse;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// A fetched list page ready for extraction.
#[derive(Debug, Clone)]
pub struct ListPage {
    pub url: Url,
    pub html: String,
    /// Reference date for short `MM-DD` dates on the page.
    pub today: NaiveDate,
}

impl ListPage {
    pub fn new(url: Url, html: impl Into<String>) -> Self {
        Self {
            url,
            html: html.into(),
            today: today_kst(),
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }
}

impl From<&PageResponse> for ListPage {
    fn from(resp: &PageResponse) -> Self {
        Self::new(resp.url_final.clone(), resp.body_utf8.clone())
    }
}

/// Turns one site's list page into candidate skeletons.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(
        &self,
        page: &ListPage,
        site: &SiteDescriptor,
    ) -> Result<Vec<PolicyCandidate>, ExtractError>;
}

/// Strategies by site id, with the generic extractor as default.
pub struct StrategyRegistry {
    custom: HashMap<String, Box<dyn ExtractionStrategy>>,
    generic: GenericExtractor,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self {
            custom: HashMap::new(),
            generic: GenericExtractor,
        }
    }

    /// Registry with the built-in custom strategies.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("bizinfo", BizinfoExtractor);
        registry.register("hikorea", HikoreaExtractor);
        registry.register("moel", MoelExtractor);
        registry.register("k_startup", KStartupExtractor);
        registry
    }

    /// Register a custom strategy for a specific site id
    pub fn register<S: ExtractionStrategy + 'static>(&mut self, site_id: &str, strategy: S) {
        self.custom.insert(site_id.to_string(), Box::new(strategy));
    }

    pub fn strategy_for(&self, site_id: &str) -> &dyn ExtractionStrategy {
        self.custom
            .get(site_id)
            .map(|s| s.as_ref())
            .unwrap_or(&self.generic)
    }

    /// Site ids with a custom strategy
    pub fn registered_sites(&self) -> Vec<&str> {
        let mut sites: Vec<&str> = self.custom.keys().map(String::as_str).collect();
        sites.sort_unstable();
        sites
    }

    /// Run the site's strategy and drop repeats of the same title and link.
    pub fn extract(
        &self,
        page: &ListPage,
        site: &SiteDescriptor,
    ) -> Result<Vec<PolicyCandidate>, ExtractError> {
        let strategy = self.strategy_for(&site.id);
        let candidates = strategy.extract(page, site)?;

        let mut seen = HashSet::new();
        let unique: Vec<PolicyCandidate> = candidates
            .into_iter()
            .filter(|c| seen.insert((c.title.clone(), c.original_url.clone())))
            .collect();

        debug!(
            site = %site.id,
            strategy = strategy.name(),
            found = unique.len(),
            "list page extracted"
        );
        Ok(unique)
    }
}

#[cfg(all(test, feature = "fuzz"))]
mod properties;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::{FieldLocators, SiteDescriptor};

    pub fn site(id: &str, url: &str, locators: FieldLocators) -> SiteDescriptor {
        SiteDescriptor {
            id: id.to_string(),
            name: format!("{id} site"),
            url: url.to_string(),
            enabled: true,
            category: "employment".to_string(),
            locators,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::site;
    use super::*;
    use crate::config::FieldLocators;

    struct Fixed;

    impl ExtractionStrategy for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn extract(
            &self,
            _page: &ListPage,
            site: &SiteDescriptor,
        ) -> Result<Vec<PolicyCandidate>, ExtractError> {
            let one = PolicyCandidate::skeleton(&site.id, "a", "같은 공고 제목", "https://x/1");
            Ok(vec![one.clone(), one])
        }
    }

    #[test]
    fn builtin_registration() {
        let registry = StrategyRegistry::with_builtin();
        assert_eq!(
            registry.registered_sites(),
            vec!["bizinfo", "hikorea", "k_startup", "moel"]
        );
        assert_eq!(registry.strategy_for("hikorea").name(), "hikorea");
        assert_eq!(registry.strategy_for("eps").name(), "generic");
    }

    #[test]
    fn repeated_rows_are_collapsed() {
        let mut registry = StrategyRegistry::new();
        registry.register("dup", Fixed);
        let page = ListPage::new(Url::parse("https://x/").unwrap(), "");
        let site = site("dup", "https://x/", FieldLocators::default());
        assert_eq!(registry.extract(&page, &site).unwrap().len(), 1);
    }
}
