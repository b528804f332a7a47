// src/ingest/extract/strategies.rs
//! Ordered extraction strategies. Each one knows a single markup shape and
//! returns accepted candidates in document order; the [`super::Extractor`]
//! decides how strategies are combined.

use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::AggregateError;

/// A parsed page plus its raw body (some strategies scan embedded scripts).
pub struct Page<'a> {
    pub raw: &'a str,
    pub doc: Html,
}

impl<'a> Page<'a> {
    pub fn parse(raw: &'a str) -> Self {
        Self {
            raw,
            doc: Html::parse_document(raw),
        }
    }
}

pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Candidates whose trimmed length exceeds `min_len`, in encounter order.
    fn candidates(&self, page: &Page<'_>, min_len: usize) -> Vec<String>;
}

/// Accept a raw candidate: collapse inner whitespace and check the length floor.
pub fn accept(raw: &str, min_len: usize) -> Option<String> {
    let t = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (t.chars().count() > min_len).then_some(t)
}

/// Where inside a container the title lives.
pub enum TitleSource {
    Text(Selector),
    Attr(Selector, &'static str),
}

impl TitleSource {
    fn read(&self, container: ElementRef<'_>, min_len: usize) -> Option<String> {
        match self {
            TitleSource::Text(sel) => container
                .select(sel)
                .find_map(|el| accept(&el.text().collect::<Vec<_>>().join(" "), min_len)),
            TitleSource::Attr(sel, attr) => container
                .select(sel)
                .find_map(|el| el.value().attr(attr).and_then(|v| accept(v, min_len))),
        }
    }
}

/// Container selector plus title sources tried in order per container.
/// The first source that yields an accepted title wins for that container.
pub struct SelectorStrategy {
    name: String,
    container: Selector,
    sources: Vec<TitleSource>,
}

impl SelectorStrategy {
    pub fn new(name: impl Into<String>, container: &str) -> Result<Self, AggregateError> {
        Ok(Self {
            name: name.into(),
            container: parse_selector(container)?,
            sources: Vec::new(),
        })
    }

    pub fn text(mut self, selector: &str) -> Result<Self, AggregateError> {
        self.sources.push(TitleSource::Text(parse_selector(selector)?));
        Ok(self)
    }

    pub fn attr(mut self, selector: &str, attr: &'static str) -> Result<Self, AggregateError> {
        self.sources
            .push(TitleSource::Attr(parse_selector(selector)?, attr));
        Ok(self)
    }

    /// Image alt-text as the last resort once text selectors are exhausted.
    pub fn alt_fallback(self) -> Result<Self, AggregateError> {
        self.attr("img[alt]", "alt")
    }
}

impl ExtractionStrategy for SelectorStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn candidates(&self, page: &Page<'_>, min_len: usize) -> Vec<String> {
        page.doc
            .select(&self.container)
            .filter_map(|c| self.sources.iter().find_map(|s| s.read(c, min_len)))
            .collect()
    }
}

fn parse_selector(s: &str) -> Result<Selector, AggregateError> {
    Selector::parse(s).map_err(|e| AggregateError::parse("selector", format!("{s}: {e}")))
}

/// Titles embedded in page JSON as `"title":{"runs":[{"text":"..."}]}`.
pub struct EmbeddedRunsTitles;

fn re_runs() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#""title":\s*\{\s*"runs":\s*\[\s*\{\s*"text":\s*"((?:[^"\\]|\\.)*)""#)
            .expect("runs regex")
    })
}

impl ExtractionStrategy for EmbeddedRunsTitles {
    fn name(&self) -> &str {
        "embedded-json-runs"
    }

    fn candidates(&self, page: &Page<'_>, min_len: usize) -> Vec<String> {
        re_runs()
            .captures_iter(page.raw)
            .filter_map(|c| c.get(1))
            .filter_map(|m| serde_json::from_str::<String>(&format!("\"{}\"", m.as_str())).ok())
            .filter_map(|t| accept(&t, min_len))
            .collect()
    }
}

/// Default chain for bestseller listing pages, most specific markup first.
pub fn bestseller_chain() -> Result<Vec<Box<dyn ExtractionStrategy>>, AggregateError> {
    const TEXT: &str = ".p13n-sc-truncate, .p13n-sc-truncated, [class*='p13n-sc-css-line-clamp']";
    Ok(vec![
        Box::new(
            SelectorStrategy::new("zg-ordered-list", "#zg-ordered-list li")?
                .text(TEXT)?
                .text(".a-link-normal")?
                .alt_fallback()?,
        ),
        Box::new(
            SelectorStrategy::new("zg-grid", "#gridItemRoot, .zg-grid-general-faceout")?
                .text(TEXT)?
                .text(".a-link-normal")?
                .alt_fallback()?,
        ),
        Box::new(
            SelectorStrategy::new("zg-item-immersion", ".zg-item-immersion")?
                .text(TEXT)?
                .text(".a-link-normal")?
                .alt_fallback()?,
        ),
        Box::new(
            SelectorStrategy::new("carousel", ".a-carousel li, .a-carousel-card")?
                .text(TEXT)?
                .text(".a-link-normal")?
                .alt_fallback()?,
        ),
    ])
}

/// Default chain for trending-video pages.
pub fn trending_chain() -> Result<Vec<Box<dyn ExtractionStrategy>>, AggregateError> {
    Ok(vec![
        Box::new(
            SelectorStrategy::new("video-title", "ytd-video-renderer, ytd-rich-item-renderer")?
                .attr("a#video-title", "title")?
                .text("#video-title")?,
        ),
        Box::new(
            SelectorStrategy::new("video-title-anchor", "a#video-title")?
                .attr("a#video-title", "title")?,
        ),
        Box::new(EmbeddedRunsTitles),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_collapses_and_checks_length() {
        assert_eq!(accept("  Echo   Dot\n5th Gen ", 8).as_deref(), Some("Echo Dot 5th Gen"));
        assert_eq!(accept("Shop now", 8), None);
        assert_eq!(accept("123456789", 8).as_deref(), Some("123456789"));
    }

    #[test]
    fn text_preferred_over_alt() {
        let html = r#"<ul id="zg-ordered-list">
            <li><img alt="Alt Title For Item"><span class="p13n-sc-truncate">Text Title For Item</span></li>
            <li><img alt="Only Alt Text Here"></li>
        </ul>"#;
        let page = Page::parse(html);
        let s = SelectorStrategy::new("t", "#zg-ordered-list li")
            .unwrap()
            .text(".p13n-sc-truncate")
            .unwrap()
            .alt_fallback()
            .unwrap();
        assert_eq!(
            s.candidates(&page, 8),
            vec!["Text Title For Item".to_string(), "Only Alt Text Here".to_string()]
        );
    }

    #[test]
    fn short_text_falls_through_to_next_source() {
        let html = r#"<div class="zg-item-immersion"><a class="a-link-normal">4.5 out</a><img alt="Portable Blender Pro"></div>"#;
        let page = Page::parse(html);
        let s = SelectorStrategy::new("t", ".zg-item-immersion")
            .unwrap()
            .text(".a-link-normal")
            .unwrap()
            .alt_fallback()
            .unwrap();
        assert_eq!(s.candidates(&page, 8), vec!["Portable Blender Pro".to_string()]);
    }

    #[test]
    fn embedded_runs_are_unescaped() {
        let raw = r#"<script>var d = {"title":{"runs":[{"text":"Top 10 \"Budget\" Phones"}]},"x":1,
            "title": {"runs": [{"text": "Unboxing the New Console"}]}};</script>"#;
        let page = Page::parse(raw);
        assert_eq!(
            EmbeddedRunsTitles.candidates(&page, 8),
            vec![
                "Top 10 \"Budget\" Phones".to_string(),
                "Unboxing the New Console".to_string()
            ]
        );
    }

    #[test]
    fn invalid_selector_is_a_parse_error() {
        let err = SelectorStrategy::new("bad", "li[[").err().unwrap();
        assert!(matches!(err, AggregateError::Parse { .. }));
    }

    #[test]
    fn default_chains_build() {
        assert_eq!(bestseller_chain().unwrap().len(), 4);
        assert_eq!(trending_chain().unwrap().len(), 3);
    }
}
