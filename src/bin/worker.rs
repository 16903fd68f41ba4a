use anyhow::Result;
use policyscan::{app_state::build_crawler, config::Config};
use tracing_subscriber::EnvFilter;

/// One-shot crawl. With a site id argument only that site is crawled,
/// otherwise every enabled site. The report is printed as JSON.
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        builder.json().init();
    } else {
        builder.init();
    }

    let config = Config::from_env()?;
    let crawler = build_crawler(&config).await?;

    let output = match std::env::args().nth(1) {
        Some(site_id) => serde_json::to_string_pretty(&crawler.run_one(&site_id).await?)?,
        None => serde_json::to_string_pretty(&crawler.run_all().await?)?,
    };
    println!("{output}");
    Ok(())
}
