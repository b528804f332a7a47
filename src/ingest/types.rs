// src/ingest/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AggregateError;

/// Normalized topic string handed to the generation stage.
pub type Keyword = String;

/// Regional storefront identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    IN,
    US,
    UK,
    CA,
    DE,
}

impl Market {
    pub fn code(self) -> &'static str {
        match self {
            Market::IN => "IN",
            Market::US => "US",
            Market::UK => "UK",
            Market::CA => "CA",
            Market::DE => "DE",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Market {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Ok(Market::IN),
            "US" => Ok(Market::US),
            // GB is the ISO code; UK is what the storefront uses
            "UK" | "GB" => Ok(Market::UK),
            "CA" => Ok(Market::CA),
            "DE" => Ok(Market::DE),
            other => Err(AggregateError::Config(format!("unknown market: {other}"))),
        }
    }
}

/// Kind of upstream document a [`SourceQuery`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Bestseller,
    NewsFeed,
    TrendingVideo,
}

impl SourceKind {
    /// Minimum trimmed length a raw candidate must exceed to be accepted.
    pub fn min_title_len(self) -> usize {
        match self {
            SourceKind::Bestseller | SourceKind::TrendingVideo => 8,
            SourceKind::NewsFeed => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Bestseller => "bestseller",
            SourceKind::NewsFeed => "news_feed",
            SourceKind::TrendingVideo => "trending_video",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a persisted record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    #[default]
    Scrape,
    Feed,
    Cache,
}

/// One entry of `content/products.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub title: String,
    pub market: Market,
    #[serde(default)]
    pub source: RecordSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ProductRecord {
    pub fn new(title: impl Into<String>, market: Market, source: RecordSource) -> Self {
        Self {
            title: title.into(),
            market,
            source,
            asin: None,
            price: None,
            rating: None,
            reviews_count: None,
            features: Vec::new(),
            image_urls: Vec::new(),
            url: None,
        }
    }
}

/// One fetch-and-extract request. `market` is `None` for global sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceQuery {
    pub market: Option<Market>,
    pub limit: usize,
    pub kind: SourceKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_parse_is_case_insensitive() {
        assert_eq!("us".parse::<Market>().unwrap(), Market::US);
        assert_eq!(" In ".parse::<Market>().unwrap(), Market::IN);
        assert_eq!("gb".parse::<Market>().unwrap(), Market::UK);
        assert!("XX".parse::<Market>().is_err());
    }

    #[test]
    fn record_serializes_without_empty_optionals() {
        let r = ProductRecord::new("Echo Dot (5th Gen)", Market::US, RecordSource::Scrape);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"title": "Echo Dot (5th Gen)", "market": "US", "source": "scrape"})
        );
    }
}
