//! Configuration handling for the crawler.
//!
//! Process settings come from environment variables with development
//! defaults (`Config::from_env`). The site registry and keyword dictionaries
//! are static JSON documents loaded once at startup, see [`registry`] and
//! [`keywords`].

pub mod keywords;
pub mod registry;

pub use keywords::{CreditKeywords, KeywordDictionaries, KeywordEntry, KeywordTable};
pub use registry::{FieldLocators, LinkLocator, SiteDescriptor, SiteRegistry};

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Environment variable names. Public so tests and binaries can refer to them.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_SITES_PATH: &str = "SITES_PATH";
pub const ENV_KEYWORDS_PATH: &str = "KEYWORDS_PATH";
pub const ENV_SCHEDULE_MORNING: &str = "SCHEDULE_MORNING";
pub const ENV_SCHEDULE_EVENING: &str = "SCHEDULE_EVENING";
pub const ENV_SCHEDULER_ENABLED: &str = "SCHEDULER_ENABLED";
pub const ENV_GOOGLE_TRANSLATE_API_KEY: &str = "GOOGLE_TRANSLATE_API_KEY";
pub const ENV_DEEPL_API_KEY: &str = "DEEPL_API_KEY";
pub const ENV_TRANSLATION_LANGUAGES: &str = "TRANSLATION_LANGUAGES";
pub const ENV_SITE_DELAY_MS: &str = "SITE_DELAY_MS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5001";
// 09:00 and 18:00 KST expressed in UTC (sec min hour day month weekday).
const DEFAULT_SCHEDULE_MORNING: &str = "0 0 0 * * *";
const DEFAULT_SCHEDULE_EVENING: &str = "0 0 9 * * *";
const DEFAULT_TRANSLATION_LANGUAGES: &str = "en,vi,th";
const DEFAULT_SITE_DELAY_MS: u64 = 3_000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Application runtime configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    database_url: Option<String>,
    bind_addr: String,
    sites_path: Option<PathBuf>,
    keywords_path: Option<PathBuf>,
    morning_schedule: String,
    evening_schedule: String,
    scheduler_enabled: bool,
    google_translate_api_key: Option<String>,
    deepl_api_key: Option<String>,
    translation_languages: Vec<String>,
    site_delay: Duration,
    request_timeout: Duration,
}

impl Config {
    /// Load from environment variables, falling back to development defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let translation_languages = parse_languages(
            &env::var(ENV_TRANSLATION_LANGUAGES)
                .unwrap_or_else(|_| DEFAULT_TRANSLATION_LANGUAGES.to_string()),
        );

        Ok(Self {
            database_url: non_empty_var(ENV_DATABASE_URL),
            bind_addr: env::var(ENV_BIND_ADDR).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            sites_path: non_empty_var(ENV_SITES_PATH).map(PathBuf::from),
            keywords_path: non_empty_var(ENV_KEYWORDS_PATH).map(PathBuf::from),
            morning_schedule: env::var(ENV_SCHEDULE_MORNING)
                .unwrap_or_else(|_| DEFAULT_SCHEDULE_MORNING.to_string()),
            evening_schedule: env::var(ENV_SCHEDULE_EVENING)
                .unwrap_or_else(|_| DEFAULT_SCHEDULE_EVENING.to_string()),
            scheduler_enabled: parse_bool(ENV_SCHEDULER_ENABLED, true)?,
            google_translate_api_key: non_empty_var(ENV_GOOGLE_TRANSLATE_API_KEY),
            deepl_api_key: non_empty_var(ENV_DEEPL_API_KEY),
            translation_languages,
            site_delay: Duration::from_millis(parse_u64(ENV_SITE_DELAY_MS, DEFAULT_SITE_DELAY_MS)?),
            request_timeout: Duration::from_secs(parse_u64(
                ENV_REQUEST_TIMEOUT_SECS,
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
        })
    }

    /// Development defaults (mirrors `from_env` with no env overrides).
    pub fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            sites_path: None,
            keywords_path: None,
            morning_schedule: DEFAULT_SCHEDULE_MORNING.to_string(),
            evening_schedule: DEFAULT_SCHEDULE_EVENING.to_string(),
            scheduler_enabled: true,
            google_translate_api_key: None,
            deepl_api_key: None,
            translation_languages: parse_languages(DEFAULT_TRANSLATION_LANGUAGES),
            site_delay: Duration::from_millis(DEFAULT_SITE_DELAY_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// PostgreSQL URL. `None` runs the in-memory store.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }
    /// TCP bind address (host:port) for the admin HTTP server.
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }
    pub fn sites_path(&self) -> Option<&PathBuf> {
        self.sites_path.as_ref()
    }
    pub fn keywords_path(&self) -> Option<&PathBuf> {
        self.keywords_path.as_ref()
    }
    pub fn morning_schedule(&self) -> &str {
        &self.morning_schedule
    }
    pub fn evening_schedule(&self) -> &str {
        &self.evening_schedule
    }
    pub fn scheduler_enabled(&self) -> bool {
        self.scheduler_enabled
    }
    pub fn google_translate_api_key(&self) -> Option<&str> {
        self.google_translate_api_key.as_deref()
    }
    pub fn deepl_api_key(&self) -> Option<&str> {
        self.deepl_api_key.as_deref()
    }
    pub fn translation_languages(&self) -> &[String] {
        &self.translation_languages
    }
    /// Pause inserted between two consecutive sites.
    pub fn site_delay(&self) -> Duration {
        self.site_delay
    }
    /// Per-request network timeout.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

// API keys stay out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("bind_addr", &self.bind_addr)
            .field("sites_path", &self.sites_path)
            .field("keywords_path", &self.keywords_path)
            .field("morning_schedule", &self.morning_schedule)
            .field("evening_schedule", &self.evening_schedule)
            .field("scheduler_enabled", &self.scheduler_enabled)
            .field("google_translate", &self.google_translate_api_key.is_some())
            .field("deepl", &self.deepl_api_key.is_some())
            .field("translation_languages", &self.translation_languages)
            .field("site_delay", &self.site_delay)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Errors that can occur while building a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid site registry: {0}")]
    Registry(String),

    #[error("invalid keyword dictionaries: {0}")]
    Keywords(String),
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(field: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(field) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidValue {
                field,
                reason: format!("expected a boolean, got '{other}'"),
            }),
        },
    }
}

fn parse_u64(field: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(field) {
        Err(_) => Ok(default),
        Ok(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
            field,
            reason: format!("{e}"),
        }),
    }
}

fn parse_languages(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|lang| lang.trim().to_ascii_lowercase())
        .filter(|lang| !lang.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Ensure environment-variable manipulating tests run serially.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            ENV_DATABASE_URL,
            ENV_BIND_ADDR,
            ENV_SITES_PATH,
            ENV_KEYWORDS_PATH,
            ENV_SCHEDULE_MORNING,
            ENV_SCHEDULE_EVENING,
            ENV_SCHEDULER_ENABLED,
            ENV_GOOGLE_TRANSLATE_API_KEY,
            ENV_DEEPL_API_KEY,
            ENV_TRANSLATION_LANGUAGES,
            ENV_SITE_DELAY_MS,
            ENV_REQUEST_TIMEOUT_SECS,
        ] {
            unsafe {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn defaults_when_env_missing() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.database_url(), None);
        assert_eq!(cfg.bind_addr(), DEFAULT_BIND_ADDR);
        assert_eq!(cfg.translation_languages(), ["en", "vi", "th"]);
        assert_eq!(cfg.site_delay(), Duration::from_secs(3));
        assert!(cfg.scheduler_enabled());
    }

    #[test]
    fn overrides_when_env_present() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_DATABASE_URL, "postgres://user:pw@db:5432/policies");
            env::set_var(ENV_BIND_ADDR, "0.0.0.0:9000");
            env::set_var(ENV_SCHEDULER_ENABLED, "false");
            env::set_var(ENV_TRANSLATION_LANGUAGES, " EN, vi ,, ");
            env::set_var(ENV_SITE_DELAY_MS, "250");
            env::set_var(ENV_DEEPL_API_KEY, "deepl-key");
        }
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.database_url(), Some("postgres://user:pw@db:5432/policies"));
        assert_eq!(cfg.bind_addr(), "0.0.0.0:9000");
        assert!(!cfg.scheduler_enabled());
        assert_eq!(cfg.translation_languages(), ["en", "vi"]);
        assert_eq!(cfg.site_delay(), Duration::from_millis(250));
        assert_eq!(cfg.deepl_api_key(), Some("deepl-key"));
        assert!(!format!("{cfg:?}").contains("deepl-key"));
        clear_env();
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_SITE_DELAY_MS, "soon");
        }
        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: ENV_SITE_DELAY_MS,
                ..
            }
        ));
        clear_env();
    }
}
