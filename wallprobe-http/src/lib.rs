//! Single-shot HTTP GET client that looks like a desktop browser.
//!
//! - One attempt per call: no retries, no redirect following, no cookies
//! - Fixed browser-like header set (see [`browser_headers`])
//! - Bodies decoded chunk by chunk through [`decode::ContentDecoder`];
//!   the HTTP stack's own decompression is disabled
//! - A deadline covers the whole exchange, from request start to body
//!   complete; on expiry the in-flight request is dropped, closing the socket
//! - Optional *raw* request/response logging via `WALLPROBE_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust,no_run
//! # async fn demo() -> Result<(), wallprobe_http::HttpError> {
//! let client = wallprobe_http::HttpClient::new()?;
//! let page = client
//!     .get_page("https://www.zhihu.com", wallprobe_http::RequestOpts::default())
//!     .await?;
//! println!("{} -> {} chars", page.status, page.char_len());
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), final errors, and (optionally)
//! raw request/response lines (target `http.raw`) when `WALLPROBE_HTTP_RAW=1`.

pub mod decode;

pub use reqwest::header;

use decode::{ContentDecoder, DecodeError, Encoding};
use reqwest::header::{
    ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONNECTION, CONTENT_ENCODING, HeaderMap,
    HeaderName, HeaderValue, LOCATION, REFERER, SERVER, USER_AGENT,
};
use reqwest::{Client, StatusCode, Url, redirect};
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "WALLPROBE_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)
const SNIPPET_CHARS: usize = 500;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Render a best-effort curl command for repro/debug, with cookies redacted.
fn make_curl(url: &Url, headers: &HeaderMap) -> String {
    let mut parts = vec!["curl".to_string(), "-XGET".to_string()];
    for (key, val) in redact_headers(headers) {
        parts.push(format!("-H '{}: {}'", key, val.replace('\'', r"'\''")));
    }
    parts.push(format!("'{}'", url.as_str()));
    parts.join(" ")
}

/// Redact cookie headers for logging
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let mut val = v.to_str().unwrap_or("").to_string();
            if key.eq_ignore_ascii_case("cookie") || key.eq_ignore_ascii_case("set-cookie") {
                val = "<redacted>".into();
            }
            (key, val)
        })
        .collect()
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("client build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("timed out after {0} ms")]
    Timeout(u64),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

impl HttpError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpError::Timeout(_))
    }
}

// ==============================
// Headers & Request Options
// ==============================

pub const USER_AGENT_VALUE: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ACCEPT_VALUE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "zh-CN,zh;q=0.9,en;q=0.8";
const ACCEPT_ENCODING_VALUE: &str = "gzip, deflate, br";
const REFERER_VALUE: &str = "https://www.google.com/";

/// The fixed header set every request carries.
///
/// ```
/// use reqwest::header::{ACCEPT_ENCODING, REFERER};
///
/// let headers = wallprobe_http::browser_headers();
/// assert_eq!(headers[ACCEPT_ENCODING], "gzip, deflate, br");
/// assert_eq!(headers[REFERER], "https://www.google.com/");
/// ```
pub fn browser_headers() -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
    h.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
    h.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
    h.insert(ACCEPT_ENCODING, HeaderValue::from_static(ACCEPT_ENCODING_VALUE));
    h.insert(REFERER, HeaderValue::from_static(REFERER_VALUE));
    h.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    h
}

/// Per-request tuning knobs.
///
/// ```
/// use std::time::Duration;
/// use wallprobe_http::RequestOpts;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(10)),
///     ..Default::default()
/// };
/// assert!(opts.headers.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts {
    pub timeout: Option<Duration>,
    /// Extra headers merged over the browser header set.
    pub headers: Option<HeaderMap>,
    /// Browser headers left off this request.
    pub omit_headers: Vec<HeaderName>,
}

// ==============================
// Response
// ==============================

/// A fully read, decoded response.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub encoding: Encoding,
    /// Decoded body, lossily converted to UTF-8.
    pub body: String,
    /// Request start to body complete.
    pub elapsed: Duration,
}

impl Page {
    /// Body length in characters.
    pub fn char_len(&self) -> usize {
        self.body.chars().count()
    }

    pub fn header(&self, name: impl reqwest::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn server(&self) -> Option<&str> {
        self.header(SERVER)
    }

    pub fn location(&self) -> Option<&str> {
        self.header(LOCATION)
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}

// ==============================
// Client
// ==============================

#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    headers: HeaderMap,
    pub default_timeout: Duration,
}

impl HttpClient {
    /// Construct a client with the browser header set.
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use wallprobe_http::{HttpClient, HttpError};
    ///
    /// let client = HttpClient::new()?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new() -> Result<Self, HttpError> {
        let inner = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(redirect::Policy::none())
            .no_gzip()
            .no_brotli()
            .no_deflate()
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            inner,
            headers: browser_headers(),
            default_timeout: Duration::from_secs(15),
        })
    }

    /// Override the default deadline returned by [`HttpClient::new`].
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use wallprobe_http::{HttpClient, HttpError};
    ///
    /// let client = HttpClient::new()?.with_timeout(Duration::from_secs(2));
    /// assert_eq!(client.default_timeout, Duration::from_secs(2));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// GET `url` once and read the decoded body.
    ///
    /// A malformed URL fails with [`HttpError::Url`] before any network activity.
    pub async fn get_page(&self, url: &str, opts: RequestOpts) -> Result<Page, HttpError> {
        let url = Url::parse(url).map_err(|e| HttpError::Url(e.to_string()))?;
        let timeout = opts.timeout.unwrap_or(self.default_timeout);

        let mut headers = self.headers.clone();
        for name in &opts.omit_headers {
            headers.remove(name);
        }
        if let Some(extra) = opts.headers {
            headers.extend(extra);
        }

        let req_id = Uuid::new_v4().simple().to_string();
        tracing::debug!(
            req_id=%req_id,
            host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            timeout_ms=timeout.as_millis() as u64,
            "http.request.start"
        );
        if raw_enabled() {
            let curl = make_curl(&url, &headers);
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        let t0 = Instant::now();
        let exchange = self.exchange(&req_id, url, headers);
        // Dropping `exchange` on expiry aborts the connection.
        let page = match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(mut page)) => {
                page.elapsed = t0.elapsed();
                page
            }
            Ok(Err(err)) => {
                tracing::warn!(req_id=%req_id, error=%err, "http.error");
                return Err(err);
            }
            Err(_) => {
                let ms = timeout.as_millis() as u64;
                tracing::warn!(req_id=%req_id, timeout_ms=ms, "http.timeout");
                return Err(HttpError::Timeout(ms));
            }
        };

        tracing::debug!(
            req_id=%req_id,
            status=%page.status,
            duration_ms=page.elapsed_ms(),
            encoding=%page.encoding,
            body_chars=page.char_len(),
            server=?page.server(),
            location=?page.location(),
            "http.response.complete"
        );
        Ok(page)
    }

    async fn exchange(&self, req_id: &str, url: Url, headers: HeaderMap) -> Result<Page, HttpError> {
        let mut resp = self
            .inner
            .get(url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(network_error)?;

        let status = resp.status();
        let resp_headers = resp.headers().clone();
        let encoding = Encoding::from_token(
            resp_headers
                .get(CONTENT_ENCODING)
                .and_then(|v| v.to_str().ok()),
        );
        tracing::debug!(
            req_id=%req_id,
            %status,
            %encoding,
            "http.response.headers"
        );

        let mut decoder = ContentDecoder::new(encoding, Vec::new());
        while let Some(chunk) = resp.chunk().await.map_err(network_error)? {
            decoder.push(&chunk)?;
        }
        let bytes = decoder.finish()?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        if raw_enabled() {
            let hdrs = redact_headers(&resp_headers);
            let truncated = body.len() > RAW_MAX_BODY;
            let text = snip_chars(&body, RAW_MAX_BODY);
            tracing::info!(
                target:"http.raw",
                %req_id,
                status=%status,
                headers=?hdrs,
                body=%text,
                truncated
            );
        }
        tracing::trace!(
            req_id=%req_id,
            body_snippet=%snip_body(&body),
            "http.response.body_snippet"
        );

        Ok(Page {
            url,
            status,
            headers: resp_headers,
            encoding,
            body,
            elapsed: Duration::ZERO,
        })
    }
}

// ==============================
// Helpers
// ==============================

// Only the connect timeout can fire inside `exchange`. It means no connection,
// so it stays a network error; `Timeout` is reserved for the request deadline.
fn network_error(err: reqwest::Error) -> HttpError {
    if err.is_timeout() {
        return HttpError::Network(format!(
            "no connection within {} ms: {err}",
            CONNECT_TIMEOUT.as_millis()
        ));
    }
    HttpError::Network(err.to_string())
}

/// Truncate to `max` characters without splitting a code point.
fn snip_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

pub fn snip_body(body: &str) -> String {
    let mut snip = snip_chars(body, SNIPPET_CHARS);
    if snip.len() < body.len() {
        snip.push_str("...");
    }
    snip
}
