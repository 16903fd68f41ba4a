use anyhow::Context;
use policyscan::config::{Config, KeywordDictionaries, SiteRegistry};

/// Validate configuration and the site/keyword documents, then print a summary.
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    println!("config: {config:?}");

    let sites = SiteRegistry::load(config.sites_path().map(|p| p.as_path()))
        .context("failed to load site registry")?;
    let dictionaries = KeywordDictionaries::load(config.keywords_path().map(|p| p.as_path()))
        .context("failed to load keyword dictionaries")?;

    println!(
        "sites: {} ({} enabled), categories: {}, visas: {}",
        sites.len(),
        sites.enabled().count(),
        dictionaries.categories.entries().len(),
        dictionaries.visas.entries().len()
    );
    for site in sites.all() {
        let marker = if site.enabled { ' ' } else { '-' };
        println!("{marker} {:<14} {:<10} {}", site.id, site.category, site.url);
    }
    Ok(())
}
