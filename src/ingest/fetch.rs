// src/ingest/fetch.rs
use async_trait::async_trait;
use metrics::counter;
use rand::Rng;
use reqwest::Client;
use std::time::Duration;

use crate::error::AggregateError;
use crate::ingest::retry::RetryPolicy;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; TrendAggregatorBot/0.1; +https://github.com/trend-aggregator/bot)";

/// `fetch(url) -> body`. Implementations handle their own retries.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, AggregateError>;
}

/// Jittered pause inserted after each successful fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Politeness {
    pub min: Duration,
    pub max: Duration,
}

impl Default for Politeness {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(800),
            max: Duration::from_millis(1400),
        }
    }
}

impl Politeness {
    fn sample(&self) -> Duration {
        let lo = self.min.as_millis() as u64;
        let hi = (self.max.as_millis() as u64).max(lo);
        Duration::from_millis(rand::rng().random_range(lo..=hi))
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub proxies: Vec<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// `None` disables the post-fetch delay (tests, local fixtures).
    pub politeness: Option<Politeness>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxies: Vec::new(),
            timeout: Duration::from_secs(12),
            retry: RetryPolicy::default(),
            politeness: Some(Politeness::default()),
        }
    }
}

/// reqwest-backed fetcher. One client per configured proxy; a random one is used per fetch.
pub struct HttpFetcher {
    clients: Vec<Client>,
    retry: RetryPolicy,
    politeness: Option<Politeness>,
}

impl HttpFetcher {
    pub fn new(cfg: FetchConfig) -> Result<Self, AggregateError> {
        let mut clients = Vec::with_capacity(cfg.proxies.len().max(1));
        for p in &cfg.proxies {
            let proxy = match reqwest::Proxy::all(p.as_str()) {
                Ok(proxy) => proxy,
                Err(e) => {
                    tracing::warn!(target: "ingest", proxy = %p, error = %e, "skipping invalid proxy");
                    continue;
                }
            };
            clients.push(build_client(&cfg, Some(proxy))?);
        }
        if clients.is_empty() {
            clients.push(build_client(&cfg, None)?);
        }

        Ok(Self {
            clients,
            retry: cfg.retry,
            politeness: cfg.politeness,
        })
    }

    fn pick_client(&self) -> &Client {
        if self.clients.len() == 1 {
            return &self.clients[0];
        }
        let i = rand::rng().random_range(0..self.clients.len());
        &self.clients[i]
    }

    async fn fetch_once(&self, url: &str, attempt: u32) -> Result<String, AggregateError> {
        counter!("fetch_attempts_total").increment(1);
        let client = self.pick_client();

        let resp = client
            .get(url)
            .send()
            .await
            .map_err(|e| AggregateError::network(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::debug!(target: "ingest", %url, attempt, status = status.as_u16(), "non-success status");
            return Err(AggregateError::Network {
                url: url.to_string(),
                status: Some(status.as_u16()),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        resp.text().await.map_err(|e| AggregateError::network(url, e))
    }
}

fn build_client(cfg: &FetchConfig, proxy: Option<reqwest::Proxy>) -> Result<Client, AggregateError> {
    let mut builder = Client::builder()
        .user_agent(cfg.user_agent.as_str())
        .connect_timeout(Duration::from_secs(4))
        .timeout(cfg.timeout);
    // PROXY_LIST is the only proxy source; system proxy variables are ignored
    builder = match proxy {
        Some(p) => builder.proxy(p),
        None => builder.no_proxy(),
    };
    builder
        .build()
        .map_err(|e| AggregateError::Config(format!("http client: {e}")))
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AggregateError> {
        let body = self
            .retry
            .run(move |attempt| self.fetch_once(url, attempt))
            .await
            .inspect_err(|e| {
                counter!("fetch_failures_total").increment(1);
                tracing::warn!(target: "ingest", %url, error = %e, "fetch failed after retries");
            })?;

        if let Some(p) = self.politeness {
            let pause = p.sample();
            tokio::time::sleep(pause).await;
        }
        Ok(body)
    }
}
