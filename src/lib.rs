// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod error;
pub mod ingest;

// ---- Re-exports for stable public API ----
pub use crate::config::AggregatorConfig;
pub use crate::error::AggregateError;
pub use crate::ingest::types::{Keyword, Market, ProductRecord, RecordSource, SourceKind, SourceQuery};
pub use crate::ingest::{Aggregator, Denylist};

use tracing::info;

/// Build the production aggregator from the environment and run one aggregation.
/// Configuration errors are returned; source failures only shrink the result.
///
/// ```ignore
/// let topics = trend_aggregator::aggregate_from_env().await?;
/// for t in &topics { /* hand each keyword to the generator */ }
/// ```
pub async fn aggregate_from_env() -> anyhow::Result<Vec<Keyword>> {
    let cfg = AggregatorConfig::from_env()?;
    let aggregator = Aggregator::from_config(&cfg)?;
    let topics = aggregator.aggregate(&cfg.markets, cfg.per_market).await;
    info!(count = topics.len(), "aggregation finished");
    Ok(topics)
}
