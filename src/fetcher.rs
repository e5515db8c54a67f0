use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::{Config, FETCH_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::types::{CachedListing, CategoryPage, ItemData};

/// Source of current price/listing data.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch_item(&self, link: &str) -> Result<ItemData>;

    async fn fetch_category(&self, link: &str) -> Result<CategoryPage>;

    async fn fetch_search(&self, query: &str, tld: &str) -> Result<Vec<CachedListing>>;

    /// True when a retry path exists that makes waiting after a failure pointless.
    fn has_alternate_path(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// ProxyPool
// ---------------------------------------------------------------------------

/// Round-robin set of HTTP clients, one per proxy.
pub struct ProxyPool {
    clients: Vec<reqwest::Client>,
    next: AtomicUsize,
}

impl ProxyPool {
    /// Load proxies from `path`. Returns `Ok(None)` when the file does not exist
    /// or lists no usable proxy.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        let urls = parse_proxy_lines(&contents);

        let mut clients = Vec::with_capacity(urls.len());
        for url in &urls {
            match reqwest::Proxy::all(url.as_str()) {
                Ok(proxy) => clients.push(build_client(Some(proxy))?),
                Err(e) => warn!("[FETCH] skipping invalid proxy {url}: {e}"),
            }
        }

        if clients.is_empty() {
            return Ok(None);
        }
        info!(proxies = clients.len(), "[FETCH] proxy pool loaded from {}", path.display());
        Ok(Some(Self {
            clients,
            next: AtomicUsize::new(0),
        }))
    }

    fn next_client(&self) -> &reqwest::Client {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        &self.clients[idx]
    }
}

/// One proxy URL per line. Blank lines and `#` comments are skipped; a bare
/// `host:port` gets an `http://` scheme.
pub fn parse_proxy_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| {
            if l.contains("://") {
                l.to_string()
            } else {
                format!("http://{l}")
            }
        })
        .collect()
}

fn build_client(proxy: Option<reqwest::Proxy>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(FETCH_TIMEOUT_SECS));
    if let Some(proxy) = proxy {
        builder = builder.proxy(proxy);
    }
    Ok(builder.build()?)
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// Fetches from the scraper endpoint at `SOURCE_API_URL`:
/// `/item?link=`, `/category?link=`, `/search?query=&tld=`.
pub struct HttpFetcher {
    base_url: String,
    direct: reqwest::Client,
    proxies: Option<ProxyPool>,
}

impl HttpFetcher {
    pub fn new(cfg: &Config) -> Result<Self> {
        Ok(Self {
            base_url: cfg.source_api_url.trim_end_matches('/').to_string(),
            direct: build_client(None)?,
            proxies: ProxyPool::load(Path::new(&cfg.proxy_list_path))?,
        })
    }

    fn client(&self) -> &reqwest::Client {
        match &self.proxies {
            Some(pool) => pool.next_client(),
            None => &self.direct,
        }
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "[FETCH] GET");
        let resp = self.client().get(&url).query(query).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        decode_response(path, status, &body)
    }
}

/// Turn a scraper response into `T`. Non-2xx statuses and bodies that do not
/// match the expected shape are fetch failures.
fn decode_response<T>(path: &str, status: reqwest::StatusCode, body: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    if !status.is_success() {
        return Err(AppError::Fetch(format!("{path} returned {status}")));
    }
    serde_json::from_str(body)
        .map_err(|e| AppError::Fetch(format!("unexpected response from {path}: {e}")))
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch_item(&self, link: &str) -> Result<ItemData> {
        self.get_json("/item", &[("link", link)]).await
    }

    async fn fetch_category(&self, link: &str) -> Result<CategoryPage> {
        self.get_json("/category", &[("link", link)]).await
    }

    async fn fetch_search(&self, query: &str, tld: &str) -> Result<Vec<CachedListing>> {
        self.get_json("/search", &[("query", query), ("tld", tld)]).await
    }

    /// Only a pool loaded at startup counts. A file that appears later, or one
    /// with no usable proxy, leaves requests on the direct client.
    fn has_alternate_path(&self) -> bool {
        self.proxies.is_some()
    }
}
