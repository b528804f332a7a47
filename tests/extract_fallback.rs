// tests/extract_fallback.rs
use trend_aggregator::ingest::extract::strategies::{EmbeddedRunsTitles, Page, SelectorStrategy};
use trend_aggregator::ingest::extract::Extractor;
use trend_aggregator::{AggregateError, SourceKind};

const FALLBACK: &str = include_str!("fixtures/bestsellers_fallback.html");
const TRENDING: &str = include_str!("fixtures/trending.html");
const US_NEWS: &str = include_str!("fixtures/news_us.xml");

#[test]
fn later_strategies_top_up_in_chain_order() {
    let ex = Extractor::new().unwrap();
    let out = ex.extract(FALLBACK, SourceKind::Bestseller, 5).unwrap();
    assert_eq!(
        out,
        vec![
            "Instant Pot Duo 7-in-1 Electric Pressure Cooker",
            "Ninja Professional Blender 1000W",
            "Crocs Unisex Classic Clogs",
            "Hydro Flask Wide Mouth Bottle",
            "Kasa Smart Plug Mini 15A",
        ]
    );
}

#[test]
fn primary_strategy_alone_when_it_fills_the_limit() {
    let ex = Extractor::new().unwrap();
    let out = ex.extract(FALLBACK, SourceKind::Bestseller, 1).unwrap();
    assert_eq!(out, vec!["Instant Pot Duo 7-in-1 Electric Pressure Cooker"]);
}

#[test]
fn limit_zero_extracts_nothing() {
    let ex = Extractor::new().unwrap();
    assert!(ex.extract(FALLBACK, SourceKind::Bestseller, 0).unwrap().is_empty());
}

#[test]
fn trending_page_uses_markup_then_embedded_json() {
    let ex = Extractor::new().unwrap();
    let out = ex.extract(TRENDING, SourceKind::TrendingVideo, 5).unwrap();
    assert_eq!(
        out,
        vec![
            "I Tested Every Budget Air Fryer",
            "Unboxing the Pixel 9 Pro",
            "Desk Setup Tour 2024",
        ]
    );
}

#[test]
fn news_feed_skips_too_short_headlines() {
    let ex = Extractor::new().unwrap();
    let out = ex.extract(US_NEWS, SourceKind::NewsFeed, 10).unwrap();
    assert_eq!(
        out,
        vec![
            "Best Early Prime Day Deals on Headphones - The Verge",
            "2024 Election Guide: What to Know - NYT",
        ]
    );
}

#[test]
fn html_instead_of_feed_is_a_parse_error() {
    let ex = Extractor::new().unwrap();
    let err = ex.extract(FALLBACK, SourceKind::NewsFeed, 5).unwrap_err();
    assert!(matches!(err, AggregateError::Parse { .. }));
}

#[test]
fn custom_chain_replaces_default() {
    let chain = SelectorStrategy::new("hydro-only", ".zg-item-immersion")
        .unwrap()
        .text(".p13n-sc-truncate")
        .unwrap();
    let ex = Extractor::new()
        .unwrap()
        .with_bestseller_strategies(vec![Box::new(chain)]);
    let out = ex.extract(FALLBACK, SourceKind::Bestseller, 5).unwrap();
    assert_eq!(out, vec!["Hydro Flask Wide Mouth Bottle"]);
}

#[test]
fn trending_chain_can_be_narrowed_to_embedded_json() {
    let ex = Extractor::new()
        .unwrap()
        .with_trending_strategies(vec![Box::new(EmbeddedRunsTitles)]);
    let out = ex.extract(TRENDING, SourceKind::TrendingVideo, 5).unwrap();
    assert_eq!(out, vec!["I Tested Every Budget Air Fryer", "Desk Setup Tour 2024"]);
}

#[test]
fn page_keeps_raw_body_for_script_scanning() {
    let page = Page::parse(TRENDING);
    assert!(page.raw.contains("ytInitialData"));
}
