// src/ingest/extract/feed.rs
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::AggregateError;
use crate::ingest::extract::strategies::accept;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Atom {
    #[serde(rename = "entry", default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    title: Option<AtomText>,
}

// Atom titles may carry a `type` attribute, so read the text node explicitly.
#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

/// Headlines from an RSS 2.0 or Atom body. Entries whose trimmed
/// headline does not exceed `min_len` are skipped.
pub fn parse_headlines(body: &str, min_len: usize, limit: usize) -> Result<Vec<String>, AggregateError> {
    let xml = scrub_html_entities_for_xml(body);

    let titles: Vec<String> = if xml.contains("<feed") && !xml.contains("<rss") {
        let atom: Atom = from_str(&xml).map_err(|e| AggregateError::parse("atom_feed", e))?;
        atom.entry
            .into_iter()
            .filter_map(|e| e.title.map(|t| t.value))
            .collect()
    } else {
        let rss: Rss = from_str(&xml).map_err(|e| AggregateError::parse("rss_feed", e))?;
        rss.channel.item.into_iter().filter_map(|i| i.title).collect()
    };

    Ok(titles
        .iter()
        .filter_map(|t| accept(t, min_len))
        .take(limit)
        .collect())
}

// quick-xml only knows the XML predefined entities; feeds routinely embed HTML ones.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
