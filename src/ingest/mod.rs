// src/ingest/mod.rs
pub mod cache;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod retry;
pub mod scrape;
pub mod sources;
pub mod types;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::AggregatorConfig;
use crate::error::AggregateError;
use crate::ingest::cache::{FileProductCache, ProductCache};
use crate::ingest::extract::Extractor;
use crate::ingest::fetch::{Fetcher, HttpFetcher};
use crate::ingest::normalize::normalize;
use crate::ingest::sources::SourceToggles;
use crate::ingest::types::{Keyword, Market, SourceQuery};

/// Floor for the overall result size.
pub const MIN_RESULT_LIMIT: usize = 10;

/// One-time metrics registration (so series show up once a recorder is installed).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "aggregate_candidates_total",
            "Raw candidates collected from the cache or live sources."
        );
        describe_counter!("aggregate_kept_total", "Keywords returned to the caller.");
        describe_counter!(
            "aggregate_denied_total",
            "Candidates dropped by the denylist or by normalization."
        );
        describe_counter!(
            "aggregate_dedup_total",
            "Candidates dropped as case-insensitive duplicates."
        );
        describe_counter!(
            "aggregate_source_errors_total",
            "Per-source fetch/parse errors."
        );
        describe_counter!(
            "aggregate_cache_hits_total",
            "Aggregations served from the products cache."
        );
        describe_counter!("fetch_attempts_total", "HTTP attempts, retries included.");
        describe_counter!("fetch_failures_total", "Fetches that exhausted retries.");
        describe_histogram!("extract_ms", "Extraction time in milliseconds.");
        describe_gauge!(
            "aggregate_last_run_ts",
            "Unix ts when aggregation last ran."
        );
    });
}

/// Disallowed substrings, matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denylist {
    terms: Vec<String>,
}

impl Denylist {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for t in terms {
            let t = t.as_ref().trim().to_lowercase();
            if !t.is_empty() && !out.contains(&t) {
                out.push(t);
            }
        }
        Self { terms: out }
    }

    pub fn empty() -> Self {
        Self { terms: Vec::new() }
    }

    /// Sensitive or controversial topic markers that make poor affiliate content.
    pub fn builtin_terms() -> &'static [&'static str] {
        &[
            "election", "politic", "shooting", "terror", "abortion", "covid", "vaccine", "lawsuit",
        ]
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_denied(&self, text: &str) -> bool {
        if self.terms.is_empty() {
            return false;
        }
        let lower = text.to_lowercase();
        self.terms.iter().any(|t| lower.contains(t.as_str()))
    }
}

impl Default for Denylist {
    fn default() -> Self {
        Self::new(Self::builtin_terms())
    }
}

/// Normalize → denylist → case-insensitive dedup (first wins) → truncate.
/// Returns (kept, filtered_count, dedup_count).
pub fn normalize_filter_dedup<I>(
    raw: I,
    denylist: &Denylist,
    limit: usize,
) -> (Vec<Keyword>, usize, usize)
where
    I: IntoIterator<Item = String>,
{
    let mut filtered_out = 0usize;
    let mut dedup_out = 0usize;
    let mut seen: HashSet<String> = HashSet::new();
    let mut keep: Vec<Keyword> = Vec::new();

    for candidate in raw {
        let Some(clean) = normalize(&candidate) else {
            filtered_out += 1;
            continue;
        };
        if denylist.is_denied(&clean) {
            filtered_out += 1;
            continue;
        }
        if !seen.insert(clean.to_lowercase()) {
            dedup_out += 1;
            continue;
        }
        keep.push(clean);
    }

    keep.truncate(limit);
    (keep, filtered_out, dedup_out)
}

/// `max(per_source * |markets|, 10)`.
pub fn result_limit(markets: &[Market], per_source: usize) -> usize {
    per_source
        .saturating_mul(markets.len())
        .max(MIN_RESULT_LIMIT)
}

/// Owns one aggregation policy: cache-first, then live sources in fixed order.
pub struct Aggregator {
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<dyn ProductCache>,
    extractor: Extractor,
    denylist: Denylist,
    toggles: SourceToggles,
}

impl Aggregator {
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: Arc<dyn ProductCache>, extractor: Extractor) -> Self {
        Self {
            fetcher,
            cache,
            extractor,
            denylist: Denylist::default(),
            toggles: SourceToggles::default(),
        }
    }

    /// Wire the production collaborators (HTTP fetcher, products.json on disk).
    pub fn from_config(cfg: &AggregatorConfig) -> Result<Self, AggregateError> {
        let fetcher = HttpFetcher::new(cfg.fetch_config())?;
        let cache = FileProductCache::new(&cfg.products_path);
        Ok(Self::new(Arc::new(fetcher), Arc::new(cache), Extractor::new()?)
            .with_denylist(Denylist::new(&cfg.denylist))
            .with_sources(cfg.sources))
    }

    pub fn with_denylist(mut self, denylist: Denylist) -> Self {
        self.denylist = denylist;
        self
    }

    pub fn with_sources(mut self, toggles: SourceToggles) -> Self {
        self.toggles = toggles;
        self
    }

    /// Ordered, unique keywords; at most `max(per_source * |markets|, 10)` of them.
    /// Never fails: source errors are logged and contribute nothing.
    pub async fn aggregate(&self, markets: &[Market], per_source: usize) -> Vec<Keyword> {
        ensure_metrics_described();
        let per_source = per_source.max(1);
        let limit = result_limit(markets, per_source);
        gauge!("aggregate_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

        if let Some(cached) = self.from_cache(markets, limit) {
            counter!("aggregate_cache_hits_total").increment(1);
            counter!("aggregate_kept_total").increment(cached.len() as u64);
            tracing::info!(target: "ingest", kept = cached.len(), limit, "served from products cache");
            return cached;
        }

        let raw = self.collect_live(markets, limit).await;
        counter!("aggregate_candidates_total").increment(raw.len() as u64);

        let (kept, filtered, dedup) = normalize_filter_dedup(raw, &self.denylist, limit);
        counter!("aggregate_denied_total").increment(filtered as u64);
        counter!("aggregate_dedup_total").increment(dedup as u64);
        counter!("aggregate_kept_total").increment(kept.len() as u64);

        tracing::info!(
            target: "ingest",
            kept = kept.len(),
            filtered,
            dedup,
            limit,
            "live aggregation done"
        );
        kept
    }

    /// `Some` only when the cache yields at least one usable keyword.
    fn from_cache(&self, markets: &[Market], limit: usize) -> Option<Vec<Keyword>> {
        let items = match self.cache.load() {
            Ok(Some(items)) => items,
            Ok(None) => {
                tracing::debug!(target: "ingest", "no products cache");
                return None;
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = %e, "products cache unreadable; going live");
                return None;
            }
        };

        let titles: Vec<String> = items
            .into_iter()
            .filter(|p| p.market.map_or(true, |m| markets.is_empty() || markets.contains(&m)))
            .map(|p| p.title)
            .collect();
        counter!("aggregate_candidates_total").increment(titles.len() as u64);

        let (kept, filtered, dedup) = normalize_filter_dedup(titles, &self.denylist, limit);
        counter!("aggregate_denied_total").increment(filtered as u64);
        counter!("aggregate_dedup_total").increment(dedup as u64);

        if kept.is_empty() {
            tracing::info!(target: "ingest", "products cache has no usable titles");
            None
        } else {
            Some(kept)
        }
    }

    async fn collect_live(&self, markets: &[Market], limit: usize) -> Vec<String> {
        let mut raw = Vec::new();
        for query in sources::plan(markets, limit, self.toggles) {
            match self.run_query(&query).await {
                Ok(mut found) => {
                    tracing::debug!(
                        target: "ingest",
                        source = %query.kind,
                        market = ?query.market,
                        found = found.len(),
                        "source ok"
                    );
                    raw.append(&mut found);
                }
                Err(e) => {
                    tracing::warn!(
                        target: "ingest",
                        source = %query.kind,
                        market = ?query.market,
                        error = %e,
                        "source error"
                    );
                    counter!("aggregate_source_errors_total").increment(1);
                }
            }
        }
        raw
    }

    async fn run_query(&self, query: &SourceQuery) -> Result<Vec<String>, AggregateError> {
        let url = sources::url_for(query);
        let body = self.fetcher.fetch(&url).await?;
        self.extractor.extract(&body, query.kind, query.limit)
    }
}
