//! Quote Anchor driver
//!
//! Loads a saved HTML page, anchors the quotes stored for its URL and prints
//! the highlighted page to stdout.

use anyhow::{bail, Context};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quote_anchor::{Config, DocumentSession, HttpDataUrlResolver, QuoteEngine, SqliteQuoteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quote_anchor=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    let args: Vec<String> = std::env::args().collect();
    let (page_path, page_url) = match args.as_slice() {
        [_, path, url] => (path, url),
        _ => bail!("usage: quote-anchor <page.html> <page-url>"),
    };

    tracing::info!("Starting Quote Anchor v{}", env!("CARGO_PKG_VERSION"));

    let html = tokio::fs::read_to_string(page_path)
        .await
        .with_context(|| format!("failed to read {}", page_path))?;

    let store = SqliteQuoteStore::connect(&config.store.database_url)
        .await
        .context("failed to open quote database")?;
    tracing::info!("Database initialized at {}", config.store.database_url);

    let resolver = HttpDataUrlResolver::new(&config.fetch).context("failed to build HTTP client")?;
    let mut engine = QuoteEngine::new(store, resolver, &config);
    let mut session = DocumentSession::parse(&html, page_url);

    let report = engine.load(&mut session).await?;
    tracing::info!(
        "Anchored {} quotes ({} failed) on {}",
        report.anchored.len(),
        report.failed,
        session.normalized_url()
    );

    println!("{}", session.document().to_html());
    Ok(())
}
