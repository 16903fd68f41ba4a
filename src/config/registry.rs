use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use super::ConfigError;

const DEFAULT_SITES: &str = include_str!("../../config/sites.json");

/// Optional field-locator rules for one crawl target.
///
/// `list`, `title`, `date` and `link` drive the generic list-page extractor.
/// `link` uses the `selector@attr` form, e.g. `td.left a@href`. `content` and
/// `attachments` are used on detail pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLocators {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Fixed organization name for every row of this site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Row-relative selector for the organization cell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<String>,
}

impl FieldLocators {
    pub fn link_locator(&self) -> Option<LinkLocator> {
        self.link.as_deref().map(LinkLocator::parse)
    }
}

/// A parsed `selector@attr` link locator. Without `@` the attribute is `href`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkLocator {
    pub selector: String,
    pub attr: String,
}

impl LinkLocator {
    pub fn parse(raw: &str) -> Self {
        match raw.rsplit_once('@') {
            Some((selector, attr)) if !attr.trim().is_empty() && !attr.contains(' ') => Self {
                selector: selector.trim().to_string(),
                attr: attr.trim().to_string(),
            },
            _ => Self {
                selector: raw.trim().to_string(),
                attr: "href".to_string(),
            },
        }
    }
}

/// One crawl target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDescriptor {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub category: String,
    #[serde(default)]
    pub locators: FieldLocators,
}

fn default_enabled() -> bool {
    true
}

impl SiteDescriptor {
    /// Base for resolving relative links: the configured base URL, else the
    /// list page URL itself.
    pub fn base_url(&self) -> Option<Url> {
        self.locators
            .base_url
            .as_deref()
            .and_then(|base| Url::parse(base).ok())
            .or_else(|| Url::parse(&self.url).ok())
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    sites: Vec<SiteDescriptor>,
}

/// The static list of crawl targets, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    sites: Vec<SiteDescriptor>,
}

impl SiteRegistry {
    /// Load from `path`, or the embedded default registry when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_json(&raw, &path.display().to_string())
            }
            None => Self::from_json(DEFAULT_SITES, "embedded sites.json"),
        }
    }

    pub fn from_json(raw: &str, what: &str) -> Result<Self, ConfigError> {
        let file: RegistryFile = serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
            what: what.to_string(),
            source,
        })?;
        Self::new(file.sites)
    }

    pub fn new(sites: Vec<SiteDescriptor>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for site in &sites {
            if site.id.trim().is_empty() {
                return Err(ConfigError::Registry("site with empty id".into()));
            }
            if !seen.insert(site.id.as_str()) {
                return Err(ConfigError::Registry(format!("duplicate site id '{}'", site.id)));
            }
            Url::parse(&site.url).map_err(|e| {
                ConfigError::Registry(format!("site '{}' has invalid url: {e}", site.id))
            })?;
            if let Some(base) = &site.locators.base_url {
                Url::parse(base).map_err(|e| {
                    ConfigError::Registry(format!("site '{}' has invalid base_url: {e}", site.id))
                })?;
            }
        }
        Ok(Self { sites })
    }

    pub fn all(&self) -> &[SiteDescriptor] {
        &self.sites
    }

    pub fn enabled(&self) -> impl Iterator<Item = &SiteDescriptor> {
        self.sites.iter().filter(|site| site.enabled)
    }

    pub fn get(&self, id: &str) -> Option<&SiteDescriptor> {
        self.sites.iter().find(|site| site.id == id)
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_registry_loads() {
        let registry = SiteRegistry::load(None).unwrap();
        assert_eq!(registry.len(), 21);

        let seoul = registry.get("seoul_global").unwrap();
        assert!(!seoul.enabled);
        assert_eq!(registry.enabled().count(), 20);

        let eps = registry.get("eps").unwrap();
        assert_eq!(eps.category, "employment");
        assert_eq!(eps.locators.organization.as_deref(), Some("한국산업인력공단"));
    }

    #[test]
    fn link_locator_splits_attribute() {
        let link = LinkLocator::parse("td.left a:not(.btn_file)@href");
        assert_eq!(link.selector, "td.left a:not(.btn_file)");
        assert_eq!(link.attr, "href");

        let bare = LinkLocator::parse("a.more");
        assert_eq!(bare.selector, "a.more");
        assert_eq!(bare.attr, "href");

        let data = LinkLocator::parse(".item a@data-url");
        assert_eq!(data.attr, "data-url");
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let raw = r#"{"sites":[
            {"id":"a","name":"A","url":"https://a.example","category":"x"},
            {"id":"a","name":"B","url":"https://b.example","category":"x"}
        ]}"#;
        let err = SiteRegistry::from_json(raw, "test").unwrap_err();
        assert!(matches!(err, ConfigError::Registry(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn invalid_urls_are_rejected() {
        let raw = r#"{"sites":[{"id":"a","name":"A","url":"not a url","category":"x"}]}"#;
        assert!(SiteRegistry::from_json(raw, "test").is_err());
    }

    #[test]
    fn base_url_falls_back_to_site_url() {
        let raw = r#"{"sites":[{"id":"a","name":"A","url":"https://a.example/list.do","category":"x"}]}"#;
        let registry = SiteRegistry::from_json(raw, "test").unwrap();
        let site = registry.get("a").unwrap();
        assert!(site.enabled);
        assert_eq!(site.base_url().unwrap().as_str(), "https://a.example/list.do");
    }
}
