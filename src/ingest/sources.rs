// src/ingest/sources.rs
use crate::ingest::types::{Market, SourceKind, SourceQuery};

pub const TRENDING_VIDEO_URL: &str = "https://www.youtube.com/feed/trending";

/// Bestseller listing page for a storefront.
pub fn bestseller_url(market: Market) -> &'static str {
    match market {
        Market::IN => "https://www.amazon.in/gp/bestsellers",
        Market::US => "https://www.amazon.com/Best-Sellers/zgbs",
        Market::UK => "https://www.amazon.co.uk/gp/bestsellers",
        Market::CA => "https://www.amazon.ca/gp/bestsellers",
        Market::DE => "https://www.amazon.de/gp/bestsellers",
    }
}

/// Regional top-stories RSS feed.
pub fn news_feed_url(market: Market) -> String {
    let (hl, gl, lang) = match market {
        Market::IN => ("en-IN", "IN", "en"),
        Market::US => ("en-US", "US", "en"),
        Market::UK => ("en-GB", "GB", "en"),
        Market::CA => ("en-CA", "CA", "en"),
        Market::DE => ("de", "DE", "de"),
    };
    format!("https://news.google.com/rss?hl={hl}&gl={gl}&ceid={gl}:{lang}")
}

/// URL to fetch for a query.
pub fn url_for(query: &SourceQuery) -> String {
    match (query.kind, query.market) {
        (SourceKind::Bestseller, Some(m)) => bestseller_url(m).to_string(),
        (SourceKind::NewsFeed, Some(m)) => news_feed_url(m),
        // Without a market the storefront default is used
        (SourceKind::Bestseller, None) => bestseller_url(Market::US).to_string(),
        (SourceKind::NewsFeed, None) => news_feed_url(Market::US),
        (SourceKind::TrendingVideo, _) => TRENDING_VIDEO_URL.to_string(),
    }
}

/// Which optional source kinds take part in live aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceToggles {
    pub news_feeds: bool,
    pub trending_video: bool,
}

impl Default for SourceToggles {
    fn default() -> Self {
        Self {
            news_feeds: true,
            trending_video: true,
        }
    }
}

/// Queries in the fixed enumeration order: per-market bestsellers, per-market
/// feeds, then global trending. Every query may fill the whole result `limit`;
/// the merge stage truncates.
pub fn plan(markets: &[Market], limit: usize, toggles: SourceToggles) -> Vec<SourceQuery> {
    let mut out: Vec<SourceQuery> = markets
        .iter()
        .map(|&m| SourceQuery {
            market: Some(m),
            limit,
            kind: SourceKind::Bestseller,
        })
        .collect();

    if toggles.news_feeds {
        out.extend(markets.iter().map(|&m| SourceQuery {
            market: Some(m),
            limit,
            kind: SourceKind::NewsFeed,
        }));
    }

    if toggles.trending_video {
        out.push(SourceQuery {
            market: None,
            limit,
            kind: SourceKind::TrendingVideo,
        });
    }
    out
}
