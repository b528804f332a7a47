// src/ingest/scrape.rs
//! The separate scrape run that produces `content/products.json`.

use std::collections::HashSet;

use crate::ingest::extract::Extractor;
use crate::ingest::fetch::Fetcher;
use crate::ingest::normalize::normalize;
use crate::ingest::sources::bestseller_url;
use crate::ingest::types::{Market, ProductRecord, RecordSource, SourceKind};

/// Bestseller titles requested per market by default.
pub const DEFAULT_PER_MARKET: usize = 20;

/// Scrape bestsellers for each market in order and return deduplicated records.
/// A failing market is logged and skipped.
pub async fn run_scrape(
    fetcher: &dyn Fetcher,
    extractor: &Extractor,
    markets: &[Market],
    per_market: usize,
) -> Vec<ProductRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for &market in markets {
        let url = bestseller_url(market);
        let titles = match fetcher.fetch(url).await {
            Ok(body) => match extractor.extract(&body, SourceKind::Bestseller, per_market) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(target: "ingest", %market, error = %e, "bestseller parse failed");
                    continue;
                }
            },
            Err(e) => {
                tracing::warn!(target: "ingest", %market, error = %e, "bestseller fetch failed");
                continue;
            }
        };

        let mut added = 0usize;
        for raw in titles {
            let Some(title) = normalize(&raw) else { continue };
            if !seen.insert(title.to_lowercase()) {
                continue;
            }
            let mut rec = ProductRecord::new(title, market, RecordSource::Scrape);
            rec.url = Some(url.to_string());
            out.push(rec);
            added += 1;
        }
        tracing::info!(target: "ingest", %market, added, "scraped bestsellers");
    }

    out
}
