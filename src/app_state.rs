use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::config::{Config, KeywordDictionaries, SiteRegistry};
use crate::crawler::{Crawler, Pacing};
use crate::fetcher::Fetcher;
use crate::repositories::{MemoryStore, PgPolicyStore, PolicyStore};
use crate::scheduler::Scheduler;
use crate::translate::TranslationEnricher;

#[derive(Clone)]
pub struct AppState {
    pub crawler: Arc<Crawler>,
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self {
            crawler: Arc::clone(scheduler.crawler()),
            scheduler,
        }
    }

    pub fn store(&self) -> &Arc<dyn PolicyStore> {
        self.crawler.store()
    }

    /// Wire the crawler and scheduler from configuration. Without a
    /// `DATABASE_URL` everything runs against the in-memory store.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let crawler = Arc::new(build_crawler(config).await?);
        let scheduler = Scheduler::new(
            crawler,
            config.morning_schedule(),
            config.evening_schedule(),
            config.scheduler_enabled(),
        )
        .await;
        Ok(Self::new(Arc::new(scheduler)))
    }
}

/// Crawler for the given configuration. Shared by the api and worker binaries.
pub async fn build_crawler(config: &Config) -> anyhow::Result<Crawler> {
    let sites = SiteRegistry::load(config.sites_path().map(|p| p.as_path()))
        .context("failed to load site registry")?;
    let dictionaries = KeywordDictionaries::load(config.keywords_path().map(|p| p.as_path()))
        .context("failed to load keyword dictionaries")?;
    let store = connect_store(config).await?;
    let translator =
        TranslationEnricher::from_config(config).context("failed to set up translation")?;
    let fetcher = Fetcher::with_timeout(config.request_timeout())
        .context("failed to build http client")?;

    info!(
        sites = sites.len(),
        store = store.backend(),
        translator = translator.provider_name(),
        "crawler configured"
    );

    Ok(Crawler::new(sites, &dictionaries, store)
        .with_fetcher(fetcher)
        .with_translator(translator)
        .with_pacing(Pacing {
            site_delay: config.site_delay(),
            ..Pacing::default()
        }))
}

async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn PolicyStore>> {
    let Some(url) = config.database_url() else {
        warn!("DATABASE_URL not set, running in demo mode with an in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(url)
        .await
        .context("failed to connect to database")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;
    Ok(Arc::new(PgPolicyStore::new(pool)))
}
