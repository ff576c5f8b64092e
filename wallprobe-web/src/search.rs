//! Keyword search collaborator: turns a phrase into candidate target URLs.
//!
//! The bundled [`SiteSearch`] scrapes a search engine's HTML result page for
//! links into the target domain. It is a best-effort discovery aid, so it
//! never fails: a network error yields the configured fallback list and a
//! timeout yields nothing.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use wallprobe_http::header::{ACCEPT_ENCODING, HeaderMap, HeaderValue, REFERER};
use wallprobe_http::{HttpClient, HttpError, RequestOpts};

pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.google.com/search";
const SEARCH_ACCEPT_ENCODING: &str = "gzip, deflate";

/// Anything that can map a keyword phrase to candidate URLs.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Vec<String>;
}

/// `site:`-restricted web search scraped from the result page.
#[derive(Clone)]
pub struct SiteSearch {
    http: HttpClient,
    endpoint: String,
    domain: String,
    fallback: Vec<String>,
    timeout: Duration,
    limit: usize,
}

impl SiteSearch {
    pub fn new(http: HttpClient, domain: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            domain: domain.into(),
            fallback: Vec::new(),
            timeout: Duration::from_secs(10),
            limit: 5,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// URLs returned when the search engine cannot be reached.
    pub fn with_fallback(mut self, urls: Vec<String>) -> Self {
        self.fallback = urls;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// The search page URL for `query`.
    ///
    /// ```no_run
    /// # fn demo() -> Result<(), wallprobe_http::HttpError> {
    /// use wallprobe_web::SiteSearch;
    ///
    /// let search = SiteSearch::new(wallprobe_http::HttpClient::new()?, "zhihu.com");
    /// assert_eq!(
    ///     search.search_url("rust async"),
    ///     "https://www.google.com/search?q=site:zhihu.com+rust+async"
    /// );
    /// # Ok(()) }
    /// ```
    pub fn search_url(&self, query: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        format!("{}?q=site:{}+{}", self.endpoint, self.domain, encoded)
    }
}

#[async_trait]
impl SearchProvider for SiteSearch {
    async fn search(&self, query: &str) -> Vec<String> {
        let url = self.search_url(query);
        let opts = search_opts(self.timeout);

        match self.http.get_page(&url, opts).await {
            Ok(page) => {
                let links = extract_links(&page.body, &self.domain, self.limit);
                tracing::info!(query, found = links.len(), status = %page.status, "search.done");
                links
            }
            Err(HttpError::Timeout(ms)) => {
                tracing::warn!(query, timeout_ms = ms, "search.timeout");
                Vec::new()
            }
            Err(err) => {
                tracing::warn!(
                    query,
                    error = %err,
                    fallback = self.fallback.len(),
                    "search.failed.using_fallback"
                );
                self.fallback.clone()
            }
        }
    }
}

/// Search pages get no `Referer` and no brotli.
fn search_opts(timeout: Duration) -> RequestOpts {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(SEARCH_ACCEPT_ENCODING));
    RequestOpts {
        timeout: Some(timeout),
        headers: Some(headers),
        omit_headers: vec![REFERER],
    }
}

/// Links into `domain` found in `html`, de-duplicated in order of first
/// appearance, skipping search-engine self links and cache entries.
pub fn extract_links(html: &str, domain: &str, limit: usize) -> Vec<String> {
    let pattern = format!(r#"https?://[^"'\s]*{}[^"'\s]*"#, regex::escape(domain));
    let Ok(re) = Regex::new(&pattern) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    re.find_iter(html)
        .map(|m| m.as_str())
        .filter(|u| !u.contains("google.com") && !u.contains("cache:"))
        .filter(|u| seen.insert(*u))
        .take(limit)
        .map(str::to_string)
        .collect()
}
