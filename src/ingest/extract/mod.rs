// src/ingest/extract/mod.rs
pub mod feed;
pub mod strategies;

use metrics::histogram;
use std::collections::HashSet;

use crate::error::AggregateError;
use crate::ingest::types::SourceKind;
use strategies::{ExtractionStrategy, Page};

/// Turns fetched bodies into raw candidate titles. Pure: no network I/O.
pub struct Extractor {
    bestseller: Vec<Box<dyn ExtractionStrategy>>,
    trending: Vec<Box<dyn ExtractionStrategy>>,
}

impl Extractor {
    pub fn new() -> Result<Self, AggregateError> {
        Ok(Self {
            bestseller: strategies::bestseller_chain()?,
            trending: strategies::trending_chain()?,
        })
    }

    /// Replace the bestseller chain (e.g. when a storefront changes markup).
    pub fn with_bestseller_strategies(mut self, chain: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        self.bestseller = chain;
        self
    }

    pub fn with_trending_strategies(mut self, chain: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        self.trending = chain;
        self
    }

    /// Extract at most `limit` raw titles from `body` for the given source kind.
    pub fn extract(
        &self,
        body: &str,
        kind: SourceKind,
        limit: usize,
    ) -> Result<Vec<String>, AggregateError> {
        if body.trim().is_empty() {
            return Err(AggregateError::parse(kind, "empty body"));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let t0 = std::time::Instant::now();
        let min_len = kind.min_title_len();
        let out = match kind {
            SourceKind::NewsFeed => feed::parse_headlines(body, min_len, limit)?,
            SourceKind::Bestseller => run_chain(&self.bestseller, body, min_len, limit),
            SourceKind::TrendingVideo => run_chain(&self.trending, body, min_len, limit),
        };
        histogram!("extract_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }
}

/// First strategy with matches wins; later strategies only top up while under `limit`.
fn run_chain(
    chain: &[Box<dyn ExtractionStrategy>],
    body: &str,
    min_len: usize,
    limit: usize,
) -> Vec<String> {
    let page = Page::parse(body);
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(limit);

    for strategy in chain {
        if out.len() >= limit {
            break;
        }
        let found = strategy.candidates(&page, min_len);
        tracing::debug!(target: "ingest", strategy = strategy.name(), found = found.len(), "strategy ran");
        for c in found {
            if out.len() >= limit {
                break;
            }
            if seen.insert(c.to_lowercase()) {
                out.push(c);
            }
        }
    }
    out
}
