// src/ingest/cache.rs
//! Read side of `content/products.json`, injected into the aggregator, plus the
//! writer used by the separate scrape run.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AggregateError;
use crate::ingest::types::{Market, ProductRecord};

pub const DEFAULT_PRODUCTS_PATH: &str = "content/products.json";

/// The only fields the aggregator cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedProduct {
    pub title: String,
    /// `None` when the record carries no market, or one this build does not know.
    pub market: Option<Market>,
}

/// Read-only persisted product list.
pub trait ProductCache: Send + Sync {
    /// `Ok(None)` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<Vec<CachedProduct>>, AggregateError>;
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    market: Option<String>,
}

/// Decode a products.json body. Entries without a title are skipped here; title
/// cleaning is the aggregator's job.
pub fn parse_products(json: &str, origin: &str) -> Result<Vec<CachedProduct>, AggregateError> {
    let raw: Vec<RawEntry> = serde_json::from_str(json).map_err(|e| AggregateError::CacheRead {
        path: origin.to_string(),
        reason: e.to_string(),
    })?;

    Ok(raw
        .into_iter()
        .filter_map(|r| {
            let title = r.title?;
            let market = r.market.as_deref().and_then(|m| m.parse::<Market>().ok());
            Some(CachedProduct { title, market })
        })
        .collect())
}

/// products.json on disk.
#[derive(Debug, Clone)]
pub struct FileProductCache {
    path: PathBuf,
}

impl FileProductCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for FileProductCache {
    fn default() -> Self {
        Self::new(DEFAULT_PRODUCTS_PATH)
    }
}

impl ProductCache for FileProductCache {
    fn load(&self) -> Result<Option<Vec<CachedProduct>>, AggregateError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let origin = self.path.display().to_string();
        let content = fs::read_to_string(&self.path).map_err(|e| AggregateError::CacheRead {
            path: origin.clone(),
            reason: e.to_string(),
        })?;
        let items = parse_products(&content, &origin)?;
        tracing::info!(target: "ingest", path = %origin, titles = items.len(), "loaded products cache");
        Ok(Some(items))
    }
}

/// In-memory product list (tests, or a list handed over by another stage).
#[derive(Debug, Clone, Default)]
pub struct StaticProducts {
    items: Option<Vec<CachedProduct>>,
}

impl StaticProducts {
    /// A cache that has never been written.
    pub fn empty() -> Self {
        Self { items: None }
    }

    pub fn from_titles<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: Some(
                titles
                    .into_iter()
                    .map(|t| CachedProduct {
                        title: t.into(),
                        market: None,
                    })
                    .collect(),
            ),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, AggregateError> {
        Ok(Self {
            items: Some(parse_products(json, "<memory>")?),
        })
    }
}

impl ProductCache for StaticProducts {
    fn load(&self) -> Result<Option<Vec<CachedProduct>>, AggregateError> {
        Ok(self.items.clone())
    }
}

/// Persist records as a pretty JSON array, creating parent directories.
pub fn write_products(path: &Path, records: &[ProductRecord]) -> Result<(), AggregateError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(records)
        .map_err(|e| AggregateError::Config(format!("serializing products: {e}")))?;
    fs::write(path, body)?;
    tracing::info!(target: "ingest", path = %path.display(), count = records.len(), "wrote products");
    Ok(())
}
