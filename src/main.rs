//! trend-aggregator binary entrypoint.
//!
//! `trend-aggregator [aggregate]` prints the ordered keyword list as JSON.
//! `trend-aggregator scrape` refreshes `content/products.json` from bestseller pages.

use anyhow::{bail, Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trend_aggregator::ingest::cache::write_products;
use trend_aggregator::ingest::extract::Extractor;
use trend_aggregator::ingest::fetch::HttpFetcher;
use trend_aggregator::ingest::scrape::{run_scrape, DEFAULT_PER_MARKET};
use trend_aggregator::{Aggregator, AggregatorConfig};

/// Logs go to stderr so stdout stays machine-readable.
/// `LOG_FORMAT=json` switches to structured JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trend_aggregator=info,ingest=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

async fn cmd_aggregate(cfg: &AggregatorConfig) -> Result<()> {
    let aggregator = Aggregator::from_config(cfg)?;
    let run = aggregator.aggregate(&cfg.markets, cfg.per_market);

    let topics = match cfg.deadline {
        Some(budget) => tokio::time::timeout(budget, run)
            .await
            .with_context(|| format!("aggregation exceeded {}s budget", budget.as_secs()))?,
        None => run.await,
    };

    if topics.is_empty() {
        tracing::warn!("no topics available this run");
    }
    println!("{}", serde_json::to_string_pretty(&topics)?);
    Ok(())
}

async fn cmd_scrape(cfg: &AggregatorConfig) -> Result<()> {
    let fetcher = HttpFetcher::new(cfg.fetch_config())?;
    let extractor = Extractor::new()?;
    let records = run_scrape(&fetcher, &extractor, &cfg.markets, DEFAULT_PER_MARKET).await;
    write_products(&cfg.products_path, &records)?;
    tracing::info!(count = records.len(), path = %cfg.products_path.display(), "scrape complete");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AggregatorConfig::from_env().context("loading configuration")?;
    tracing::info!(
        markets = ?cfg.markets,
        per_market = cfg.per_market,
        proxies = cfg.proxies.len(),
        denylist = cfg.denylist.len(),
        "config loaded"
    );

    match std::env::args().nth(1).as_deref() {
        None | Some("aggregate") => cmd_aggregate(&cfg).await,
        Some("scrape") => cmd_scrape(&cfg).await,
        Some(other) => bail!("unknown command {other:?} (expected `aggregate` or `scrape`)"),
    }
}
