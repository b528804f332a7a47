// src/config/mod.rs
//! Environment-driven configuration. Everything is plain key/value; parsing
//! runs over a lookup function so tests never have to touch the process env.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::cache::DEFAULT_PRODUCTS_PATH;
use crate::ingest::fetch::{FetchConfig, Politeness, DEFAULT_USER_AGENT};
use crate::ingest::retry::RetryPolicy;
use crate::ingest::sources::SourceToggles;
use crate::ingest::types::Market;
use crate::ingest::Denylist;

pub const ENV_MARKETS: &str = "MARKETS";
pub const ENV_POSTS_PER_MARKET: &str = "POSTS_PER_MARKET";
pub const ENV_PROXY_LIST: &str = "PROXY_LIST";
pub const ENV_USER_AGENT: &str = "SCRAPER_USER_AGENT";
pub const ENV_PRODUCTS_PATH: &str = "PRODUCTS_PATH";
pub const ENV_DENYLIST: &str = "DENYLIST";
pub const ENV_DENYLIST_PATH: &str = "DENYLIST_PATH";
pub const ENV_ENABLE_NEWS_FEEDS: &str = "ENABLE_NEWS_FEEDS";
pub const ENV_ENABLE_TRENDING_VIDEO: &str = "ENABLE_TRENDING_VIDEO";
pub const ENV_FETCH_MAX_ATTEMPTS: &str = "FETCH_MAX_ATTEMPTS";
pub const ENV_FETCH_BASE_DELAY_MS: &str = "FETCH_BASE_DELAY_MS";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "FETCH_TIMEOUT_SECS";
pub const ENV_FETCH_DELAY_MS: &str = "FETCH_DELAY_MS";
pub const ENV_AGGREGATE_DEADLINE_SECS: &str = "AGGREGATE_DEADLINE_SECS";

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub markets: Vec<Market>,
    /// `perSource`: posts wanted per market.
    pub per_market: usize,
    pub proxies: Vec<String>,
    pub user_agent: String,
    pub products_path: PathBuf,
    pub denylist: Vec<String>,
    pub sources: SourceToggles,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub timeout: Duration,
    pub politeness: Option<Politeness>,
    pub deadline: Option<Duration>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            markets: vec![Market::IN, Market::US],
            per_market: 2,
            proxies: Vec::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            products_path: PathBuf::from(DEFAULT_PRODUCTS_PATH),
            denylist: Denylist::builtin_terms()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sources: SourceToggles::default(),
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(12),
            politeness: Some(Politeness::default()),
            deadline: None,
        }
    }
}

impl AggregatorConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(raw) = get(ENV_MARKETS) {
            cfg.markets = parse_markets(&raw)?;
        }
        if let Some(raw) = get(ENV_POSTS_PER_MARKET) {
            let n: usize = raw
                .parse()
                .with_context(|| format!("{ENV_POSTS_PER_MARKET}={raw}"))?;
            if n == 0 {
                bail!("{ENV_POSTS_PER_MARKET} must be positive");
            }
            cfg.per_market = n;
        }
        if let Some(raw) = get(ENV_PROXY_LIST) {
            cfg.proxies = split_list(&raw);
        }
        if let Some(ua) = get(ENV_USER_AGENT) {
            cfg.user_agent = ua;
        }
        if let Some(p) = get(ENV_PRODUCTS_PATH) {
            cfg.products_path = PathBuf::from(p);
        }
        if let Some(raw) = get(ENV_DENYLIST) {
            cfg.denylist = clean_terms(split_list(&raw));
        }
        // File terms extend whatever list is in effect
        if let Some(path) = get(ENV_DENYLIST_PATH) {
            let extra = load_terms(Path::new(&path))?;
            let current = std::mem::take(&mut cfg.denylist);
            cfg.denylist = clean_terms(current.into_iter().chain(extra));
        }
        if let Some(raw) = get(ENV_ENABLE_NEWS_FEEDS) {
            cfg.sources.news_feeds = parse_bool(ENV_ENABLE_NEWS_FEEDS, &raw)?;
        }
        if let Some(raw) = get(ENV_ENABLE_TRENDING_VIDEO) {
            cfg.sources.trending_video = parse_bool(ENV_ENABLE_TRENDING_VIDEO, &raw)?;
        }
        if let Some(raw) = get(ENV_FETCH_MAX_ATTEMPTS) {
            let n: u32 = raw
                .parse()
                .with_context(|| format!("{ENV_FETCH_MAX_ATTEMPTS}={raw}"))?;
            cfg.max_attempts = n.clamp(1, crate::ingest::retry::MAX_ATTEMPTS_CAP);
        }
        if let Some(raw) = get(ENV_FETCH_BASE_DELAY_MS) {
            let ms: u64 = raw
                .parse()
                .with_context(|| format!("{ENV_FETCH_BASE_DELAY_MS}={raw}"))?;
            cfg.base_delay = Duration::from_millis(ms);
        }
        if let Some(raw) = get(ENV_FETCH_TIMEOUT_SECS) {
            let s: u64 = raw
                .parse()
                .with_context(|| format!("{ENV_FETCH_TIMEOUT_SECS}={raw}"))?;
            cfg.timeout = Duration::from_secs(s.max(1));
        }
        if let Some(raw) = get(ENV_FETCH_DELAY_MS) {
            cfg.politeness = parse_politeness(&raw)?;
        }
        if let Some(raw) = get(ENV_AGGREGATE_DEADLINE_SECS) {
            let s: u64 = raw
                .parse()
                .with_context(|| format!("{ENV_AGGREGATE_DEADLINE_SECS}={raw}"))?;
            cfg.deadline = (s > 0).then(|| Duration::from_secs(s));
        }

        Ok(cfg)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.base_delay)
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            user_agent: self.user_agent.clone(),
            proxies: self.proxies.clone(),
            timeout: self.timeout,
            retry: self.retry_policy(),
            politeness: self.politeness,
        }
    }
}

#[derive(Deserialize)]
struct TermsFile {
    terms: Vec<String>,
}

/// Denylist terms from a file: a JSON array for `.json`, otherwise TOML `terms = [..]`.
pub fn load_terms(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("{ENV_DENYLIST_PATH}: reading {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let terms = if is_json {
        serde_json::from_str::<Vec<String>>(&content)
            .with_context(|| format!("{}: expected a JSON array of strings", path.display()))?
    } else {
        toml::from_str::<TermsFile>(&content)
            .with_context(|| format!("{}: expected `terms = [..]`", path.display()))?
            .terms
    };
    Ok(clean_terms(terms))
}

/// Trim, drop empties, dedupe case-insensitively; first spelling and order win.
fn clean_terms<I: IntoIterator<Item = String>>(items: I) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o.eq_ignore_ascii_case(t)) {
            out.push(t.to_string());
        }
    }
    out
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Comma-separated market codes, order preserved, repeats dropped.
pub fn parse_markets(raw: &str) -> Result<Vec<Market>> {
    let mut out: Vec<Market> = Vec::new();
    for code in split_list(raw) {
        let m: Market = code.parse().map_err(|e| anyhow!("{ENV_MARKETS}: {e}"))?;
        if !out.contains(&m) {
            out.push(m);
        }
    }
    if out.is_empty() {
        bail!("{ENV_MARKETS} is empty");
    }
    Ok(out)
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{key}: expected a boolean, got {other:?}"),
    }
}

/// `0` disables, `N` is a fixed delay, `MIN-MAX` a jittered range (milliseconds).
fn parse_politeness(raw: &str) -> Result<Option<Politeness>> {
    let (lo, hi) = match raw.split_once('-') {
        Some((a, b)) => (a.trim().parse::<u64>()?, b.trim().parse::<u64>()?),
        None => {
            let v = raw.parse::<u64>()?;
            (v, v)
        }
    };
    if lo.max(hi) == 0 {
        return Ok(None);
    }
    Ok(Some(Politeness {
        min: Duration::from_millis(lo.min(hi)),
        max: Duration::from_millis(lo.max(hi)),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| m.get(k).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let cfg = AggregatorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.markets, vec![Market::IN, Market::US]);
        assert_eq!(cfg.per_market, 2);
        assert!(cfg.proxies.is_empty());
        assert_eq!(cfg.products_path, PathBuf::from("content/products.json"));
        assert!(cfg.denylist.iter().any(|t| t == "election"));
        assert_eq!(cfg.politeness, Some(Politeness::default()));
        assert!(cfg.deadline.is_none());
    }

    #[test]
    fn reads_all_keys() {
        let cfg = AggregatorConfig::from_lookup(lookup(&[
            ("MARKETS", "us, uk ,US"),
            ("POSTS_PER_MARKET", "5"),
            ("PROXY_LIST", "http://p1:8080, ,http://p2:8080"),
            ("DENYLIST", "crypto, Gambling"),
            ("ENABLE_NEWS_FEEDS", "false"),
            ("ENABLE_TRENDING_VIDEO", "0"),
            ("FETCH_MAX_ATTEMPTS", "9"),
            ("FETCH_BASE_DELAY_MS", "250"),
            ("FETCH_DELAY_MS", "0"),
            ("AGGREGATE_DEADLINE_SECS", "90"),
        ]))
        .unwrap();
        assert_eq!(cfg.markets, vec![Market::US, Market::UK]);
        assert_eq!(cfg.per_market, 5);
        assert_eq!(cfg.proxies, vec!["http://p1:8080", "http://p2:8080"]);
        assert_eq!(cfg.denylist, vec!["crypto", "Gambling"]);
        assert!(!cfg.sources.news_feeds);
        assert!(!cfg.sources.trending_video);
        assert_eq!(cfg.max_attempts, 4);
        assert_eq!(cfg.base_delay, Duration::from_millis(250));
        assert!(cfg.politeness.is_none());
        assert_eq!(cfg.deadline, Some(Duration::from_secs(90)));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(AggregatorConfig::from_lookup(lookup(&[("MARKETS", "US,ZZ")])).is_err());
        assert!(AggregatorConfig::from_lookup(lookup(&[("POSTS_PER_MARKET", "0")])).is_err());
        assert!(AggregatorConfig::from_lookup(lookup(&[("POSTS_PER_MARKET", "two")])).is_err());
        assert!(AggregatorConfig::from_lookup(lookup(&[("ENABLE_NEWS_FEEDS", "maybe")])).is_err());
    }

    #[test]
    fn politeness_forms() {
        assert_eq!(parse_politeness("0").unwrap(), None);
        assert_eq!(
            parse_politeness("1000").unwrap(),
            Some(Politeness {
                min: Duration::from_millis(1000),
                max: Duration::from_millis(1000)
            })
        );
        assert_eq!(
            parse_politeness("1400-600").unwrap(),
            Some(Politeness {
                min: Duration::from_millis(600),
                max: Duration::from_millis(1400)
            })
        );
        assert!(parse_politeness("fast").is_err());
    }

    #[test]
    fn denylist_file_extends_env_terms() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("denylist.toml");
        fs::write(&path, r#"terms = [" Tariff ", "", "CRYPTO", "tariff"]"#).unwrap();
        let path_str = path.display().to_string();

        let cfg = AggregatorConfig::from_lookup(lookup(&[
            ("DENYLIST", "crypto, casino"),
            ("DENYLIST_PATH", path_str.as_str()),
        ]))
        .unwrap();
        assert_eq!(cfg.denylist, vec!["crypto", "casino", "Tariff"]);
    }

    #[test]
    fn terms_format_follows_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("terms.json");
        fs::write(&json, r#"["lottery", "  weapons ", ""]"#).unwrap();
        assert_eq!(load_terms(&json).unwrap(), vec!["lottery", "weapons"]);

        // TOML body behind a .json name is rejected, not guessed
        let mislabelled = dir.path().join("wrong.json");
        fs::write(&mislabelled, r#"terms = ["x"]"#).unwrap();
        assert!(load_terms(&mislabelled).is_err());

        assert!(load_terms(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn fetch_config_carries_retry_policy() {
        let cfg = AggregatorConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            ..AggregatorConfig::default()
        };
        let fc = cfg.fetch_config();
        assert_eq!(fc.retry.max_attempts, 3);
        assert_eq!(fc.retry.delay_for(2), Duration::from_millis(200));
    }
}
