//! Direct fetch: one plain HTTP GET, classified.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use wallprobe_common::{Classifier, Outcome};
use wallprobe_http::{HttpClient, HttpError, Page, RequestOpts};

use crate::extract::{extract_title, preview};
use crate::types::FetchResult;

const PREVIEW_MIN_CHARS: usize = 100;
const PREVIEW_CHARS: usize = 150;

/// Anything that can turn a URL into a [`FetchResult`].
///
/// Implementations never return errors: every failure is folded into the
/// result's outcome and error message.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> FetchResult;
}

/// [`PageFetcher`] backed by the browser-looking [`HttpClient`].
#[derive(Clone)]
pub struct DirectFetcher {
    http: HttpClient,
    classifier: Classifier,
}

impl DirectFetcher {
    pub fn new(http: HttpClient, classifier: Classifier) -> Self {
        Self { http, classifier }
    }

    fn from_page(&self, url: &str, page: Page) -> FetchResult {
        let status = page.status.as_u16();
        let content_length = page.char_len();
        let outcome = self.classifier.classify(status, content_length, &page.body);
        let preview = (content_length > PREVIEW_MIN_CHARS).then(|| preview(&page.body, PREVIEW_CHARS));

        FetchResult {
            url: url.to_string(),
            status_code: Some(status),
            content_length,
            response_time_ms: page.elapsed_ms(),
            outcome,
            title: extract_title(&page.body),
            error: None,
            server: page.server().map(str::to_string),
            location: page.location().map(str::to_string),
            preview,
        }
    }
}

#[async_trait]
impl PageFetcher for DirectFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> FetchResult {
        let started = Instant::now();
        let opts = RequestOpts {
            timeout: Some(timeout),
            ..Default::default()
        };

        match self.http.get_page(url, opts).await {
            Ok(page) => {
                let result = self.from_page(url, page);
                tracing::info!(
                    url,
                    status = ?result.status_code,
                    chars = result.content_length,
                    elapsed_ms = result.response_time_ms,
                    outcome = %result.outcome,
                    "direct.fetch"
                );
                result
            }
            Err(err) => {
                let outcome = match err {
                    HttpError::Timeout(_) => Outcome::TimedOut,
                    _ => Outcome::Failed,
                };
                tracing::warn!(url, error = %err, %outcome, "direct.fetch.error");
                FetchResult::errored(
                    url,
                    outcome,
                    err.to_string(),
                    started.elapsed().as_millis() as u64,
                )
            }
        }
    }
}
