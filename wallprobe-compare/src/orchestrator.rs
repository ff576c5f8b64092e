use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::time::sleep;
use wallprobe_web::{BrowserProbe, PageFetcher};

use crate::report::{ComparisonEntry, ComparisonReport, RunMode};

/// Gaps inserted between consecutive steps of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Between the direct fetch and the probe of the same URL.
    pub method_gap: Duration,
    /// Between URLs in a comparison run.
    pub url_gap: Duration,
    /// Between URLs in a direct-only run.
    pub direct_url_gap: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            method_gap: Duration::from_secs(2),
            url_gap: Duration::from_secs(3),
            direct_url_gap: Duration::from_secs(2),
        }
    }
}

/// Runs targets one at a time through the direct fetcher and, in comparison
/// mode, the browser probe.
///
/// Every step is awaited before the next one starts and no step can abort the
/// run: failures are already folded into the per-method results.
pub struct Orchestrator {
    fetcher: Arc<dyn PageFetcher>,
    probe: Arc<dyn BrowserProbe>,
    fetch_timeout: Duration,
    pacing: Pacing,
}

impl Orchestrator {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        probe: Arc<dyn BrowserProbe>,
        fetch_timeout: Duration,
        pacing: Pacing,
    ) -> Self {
        Self {
            fetcher,
            probe,
            fetch_timeout,
            pacing,
        }
    }

    /// Direct fetch, pause, browser probe for each URL in order.
    pub async fn run_comparison(&self, urls: &[String]) -> ComparisonReport {
        self.run(urls, RunMode::Comparison).await
    }

    /// Direct fetch only; entries carry no probe result.
    pub async fn run_direct(&self, urls: &[String]) -> ComparisonReport {
        self.run(urls, RunMode::Direct).await
    }

    async fn run(&self, urls: &[String], mode: RunMode) -> ComparisonReport {
        let with_probe = mode == RunMode::Comparison;
        let started_at = Utc::now();
        let clock = Instant::now();
        let gap = if with_probe {
            self.pacing.url_gap
        } else {
            self.pacing.direct_url_gap
        };
        tracing::info!(urls = urls.len(), with_probe, "compare.start");

        let mut entries = Vec::with_capacity(urls.len());
        for (i, url) in urls.iter().enumerate() {
            if i > 0 {
                tracing::debug!(gap_ms = gap.as_millis() as u64, "compare.pause.url");
                sleep(gap).await;
            }
            tracing::info!(index = i + 1, total = urls.len(), url = %url, "compare.url");

            let fetch = self.fetcher.fetch(url, self.fetch_timeout).await;
            let probe = if with_probe {
                sleep(self.pacing.method_gap).await;
                Some(self.probe.probe(url).await)
            } else {
                None
            };

            let entry = ComparisonEntry {
                url: url.clone(),
                fetch,
                probe,
            };
            if let Some(verdict) = entry.verdict() {
                tracing::info!(url = %url, verdict = verdict.label(), "compare.verdict");
            }
            entries.push(entry);
        }

        let elapsed = clock.elapsed();
        tracing::info!(
            urls = entries.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "compare.done"
        );
        ComparisonReport {
            mode,
            entries,
            started_at,
            elapsed,
        }
    }
}
