use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use wallprobe_common::Outcome;
use wallprobe_web::extract::shorten;
use wallprobe_web::{ExternalProbeResult, FetchResult};

const TITLE_DISPLAY_CHARS: usize = 60;
const RULE_WIDTH: usize = 80;

/// Which kind of run produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Direct fetch and browser probe for every URL.
    Comparison,
    /// Direct fetch only.
    Direct,
}

/// Which retrieval method a tally or verdict talks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Direct,
    Probe,
}

impl Method {
    pub fn label(self) -> &'static str {
        match self {
            Method::Direct => "direct http",
            Method::Probe => "browser probe",
        }
    }
}

/// Who got real content for one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    ProbeWins,
    DirectWins,
    BothSucceeded,
    BothFailed,
}

impl Verdict {
    pub fn from_outcomes(direct: Outcome, probe: Outcome) -> Self {
        match (direct.is_success(), probe.is_success()) {
            (false, true) => Verdict::ProbeWins,
            (true, false) => Verdict::DirectWins,
            (true, true) => Verdict::BothSucceeded,
            (false, false) => Verdict::BothFailed,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::ProbeWins => "browser probe wins",
            Verdict::DirectWins => "direct http wins",
            Verdict::BothSucceeded => "both methods succeeded",
            Verdict::BothFailed => "both methods failed",
        }
    }
}

/// Everything learned about one target URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonEntry {
    pub url: String,
    pub fetch: FetchResult,
    pub probe: Option<ExternalProbeResult>,
}

impl ComparisonEntry {
    pub fn outcome(&self, method: Method) -> Option<Outcome> {
        match method {
            Method::Direct => Some(self.fetch.outcome),
            Method::Probe => self.probe.as_ref().map(|p| p.outcome),
        }
    }

    /// `None` for direct-only runs.
    pub fn verdict(&self) -> Option<Verdict> {
        self.probe
            .as_ref()
            .map(|p| Verdict::from_outcomes(self.fetch.outcome, p.outcome))
    }
}

/// Outcome counts for one method. Timeouts count as failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MethodTally {
    pub attempts: usize,
    pub successes: usize,
    pub partial: usize,
    pub blocked: usize,
    pub redirected: usize,
    pub failed: usize,
}

impl MethodTally {
    pub fn record(&mut self, outcome: Outcome) {
        self.attempts += 1;
        match outcome {
            Outcome::Success => self.successes += 1,
            Outcome::PartialSuccess => self.partial += 1,
            Outcome::Blocked => self.blocked += 1,
            Outcome::Redirected => self.redirected += 1,
            Outcome::Failed | Outcome::TimedOut => self.failed += 1,
        }
    }

    /// Attempts counted as successes. A direct run also counts partial pages,
    /// since any 200 reached the site; a comparison only counts full content.
    pub fn succeeded(&self, mode: RunMode) -> usize {
        match mode {
            RunMode::Comparison => self.successes,
            RunMode::Direct => self.successes + self.partial,
        }
    }

    /// [`succeeded`](Self::succeeded) as a percentage; 0 when nothing was attempted.
    pub fn success_rate(&self, mode: RunMode) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        self.succeeded(mode) as f64 * 100.0 / self.attempts as f64
    }
}

/// Result of one run, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub mode: RunMode,
    pub entries: Vec<ComparisonEntry>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl ComparisonReport {
    pub fn success_rate(&self, method: Method) -> f64 {
        self.tally(method).success_rate(self.mode)
    }

    pub fn tally(&self, method: Method) -> MethodTally {
        let mut tally = MethodTally::default();
        self.entries
            .iter()
            .filter_map(|e| e.outcome(method))
            .for_each(|o| tally.record(o));
        tally
    }

    pub fn verdicts(&self) -> Vec<(&str, Verdict)> {
        self.entries
            .iter()
            .filter_map(|e| e.verdict().map(|v| (e.url.as_str(), v)))
            .collect()
    }

    /// Plain-text summary for the terminal.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(RULE_WIDTH);
        let started = self.started_at.with_timezone(&Local);

        let _ = writeln!(out, "{rule}");
        let _ = writeln!(
            out,
            "{} report: {} url(s), started {}, took {:.1}s",
            self.kind(),
            self.entries.len(),
            started.format("%Y-%m-%d %H:%M:%S"),
            self.elapsed.as_secs_f64()
        );
        let _ = writeln!(out, "{rule}");

        for (i, entry) in self.entries.iter().enumerate() {
            let _ = writeln!(out, "\n{}. {}", i + 1, entry.url);
            render_fetch(&mut out, &entry.fetch);
            if let Some(probe) = &entry.probe {
                render_probe(&mut out, probe);
            }
            if let Some(verdict) = entry.verdict() {
                let _ = writeln!(out, "   verdict: {}", verdict.label());
            }
        }

        let _ = writeln!(out, "\n{rule}");
        for &method in self.methods() {
            render_tally(&mut out, method, &self.tally(method), self.mode);
        }
        out
    }

    /// Markdown document with one section per URL and a summary table.
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        let started = self.started_at.with_timezone(&Local);

        let _ = writeln!(out, "# wallprobe {} report\n", self.kind());
        let _ = writeln!(
            out,
            "Started {}, {} url(s), took {:.1}s.",
            started.format("%Y-%m-%d %H:%M:%S"),
            self.entries.len(),
            self.elapsed.as_secs_f64()
        );

        for (i, entry) in self.entries.iter().enumerate() {
            let _ = writeln!(out, "\n## {}. {}\n", i + 1, entry.url);
            let _ = writeln!(out, "| method | outcome | status | chars | ms | notes |");
            let _ = writeln!(out, "|---|---|---|---|---|---|");
            let f = &entry.fetch;
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} |",
                Method::Direct.label(),
                f.outcome,
                f.status_code.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
                f.content_length,
                f.response_time_ms,
                md_cell(f.error.as_deref().or(f.location.as_deref()).or(f.title.as_deref()))
            );
            if let Some(p) = &entry.probe {
                let _ = writeln!(
                    out,
                    "| {} | {} | - | {} | {} | {} |",
                    Method::Probe.label(),
                    p.outcome,
                    p.content_length,
                    p.response_time_ms,
                    md_cell(p.error.as_deref().or(p.title.as_deref()))
                );
            }
            if let Some(verdict) = entry.verdict() {
                let _ = writeln!(out, "\n**Verdict:** {}", verdict.label());
            }
        }

        let _ = writeln!(out, "\n---\n\n## Summary\n");
        let _ = writeln!(out, "| method | succeeded | rate | partial | blocked | redirected | failed |");
        let _ = writeln!(out, "|---|---|---|---|---|---|---|");
        for &method in self.methods() {
            let t = self.tally(method);
            let _ = writeln!(
                out,
                "| {} | {}/{} | {:.1}% | {} | {} | {} | {} |",
                method.label(),
                t.succeeded(self.mode),
                t.attempts,
                t.success_rate(self.mode),
                t.partial,
                t.blocked,
                t.redirected,
                t.failed
            );
        }
        out
    }

    fn kind(&self) -> &'static str {
        match self.mode {
            RunMode::Comparison => "comparison",
            RunMode::Direct => "access",
        }
    }

    fn methods(&self) -> &'static [Method] {
        match self.mode {
            RunMode::Comparison => &[Method::Direct, Method::Probe],
            RunMode::Direct => &[Method::Direct],
        }
    }
}

fn md_cell(text: Option<&str>) -> String {
    text.map(|t| shorten(t, TITLE_DISPLAY_CHARS).replace('|', "\\|").replace('\n', " "))
        .unwrap_or_default()
}

fn render_fetch(out: &mut String, r: &FetchResult) {
    let status = r
        .status_code
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());
    let _ = writeln!(
        out,
        "   {:<14} {} (status {}, {} chars, {} ms)",
        format!("{}:", Method::Direct.label()),
        r.outcome,
        status,
        r.content_length,
        r.response_time_ms
    );
    let _ = writeln!(out, "   {:<14} {}", "", r.outcome.analysis());
    if let Some(server) = &r.server {
        let _ = writeln!(out, "   {:<14} server {}", "", server);
    }
    if let Some(location) = &r.location {
        let _ = writeln!(out, "   {:<14} -> {}", "", location);
    }
    if let Some(title) = &r.title {
        let _ = writeln!(out, "   {:<14} title: {}", "", shorten(title, TITLE_DISPLAY_CHARS));
    }
    if let Some(preview) = &r.preview {
        let _ = writeln!(out, "   {:<14} preview: {}...", "", preview);
    }
    if let Some(err) = &r.error {
        let _ = writeln!(out, "   {:<14} error: {}", "", err);
    }
}

fn render_probe(out: &mut String, r: &ExternalProbeResult) {
    let _ = writeln!(
        out,
        "   {:<14} {} ({} chars, {} quality, {} ms)",
        format!("{}:", Method::Probe.label()),
        r.outcome,
        r.content_length,
        r.quality.label(),
        r.response_time_ms
    );
    if let Some(title) = &r.title {
        let _ = writeln!(out, "   {:<14} title: {}", "", shorten(title, TITLE_DISPLAY_CHARS));
    }
    if let Some(err) = &r.error {
        let _ = writeln!(out, "   {:<14} error: {}", "", err);
    }
}

fn render_tally(out: &mut String, method: Method, t: &MethodTally, mode: RunMode) {
    let _ = writeln!(
        out,
        "{:<14} {}/{} succeeded ({:.1}%), {} partial, {} blocked, {} redirected, {} failed",
        method.label(),
        t.succeeded(mode),
        t.attempts,
        t.success_rate(mode),
        t.partial,
        t.blocked,
        t.redirected,
        t.failed
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use wallprobe_web::ContentQuality;

    fn fetch(url: &str, outcome: Outcome) -> FetchResult {
        FetchResult {
            url: url.to_string(),
            status_code: Some(200),
            content_length: 10,
            response_time_ms: 5,
            outcome,
            title: None,
            error: None,
            server: None,
            location: None,
            preview: None,
        }
    }

    fn probe(url: &str, outcome: Outcome) -> ExternalProbeResult {
        ExternalProbeResult {
            url: url.to_string(),
            content_length: 10,
            title: Some("a question".to_string()),
            outcome,
            response_time_ms: 900,
            error: None,
            quality: ContentQuality::Basic,
        }
    }

    fn entry(direct: Outcome, rendered: Option<Outcome>) -> ComparisonEntry {
        ComparisonEntry {
            url: "https://www.zhihu.com/question/1".to_string(),
            fetch: fetch("https://www.zhihu.com/question/1", direct),
            probe: rendered.map(|o| probe("https://www.zhihu.com/question/1", o)),
        }
    }

    fn report(entries: Vec<ComparisonEntry>) -> ComparisonReport {
        let mode = if entries.iter().any(|e| e.probe.is_some()) {
            RunMode::Comparison
        } else {
            RunMode::Direct
        };
        ComparisonReport {
            mode,
            entries,
            started_at: Utc::now(),
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn verdict_covers_every_combination() {
        use Outcome::*;
        assert_eq!(Verdict::from_outcomes(Blocked, Success), Verdict::ProbeWins);
        assert_eq!(Verdict::from_outcomes(Success, Redirected), Verdict::DirectWins);
        assert_eq!(Verdict::from_outcomes(Success, Success), Verdict::BothSucceeded);
        assert_eq!(Verdict::from_outcomes(PartialSuccess, TimedOut), Verdict::BothFailed);
    }

    #[test]
    fn direct_only_entries_have_no_verdict() {
        assert_eq!(entry(Outcome::Success, None).verdict(), None);
        assert_eq!(
            entry(Outcome::Blocked, Some(Outcome::Success)).verdict(),
            Some(Verdict::ProbeWins)
        );
    }

    #[test]
    fn tallies_fold_timeouts_into_failures() {
        let r = report(vec![
            entry(Outcome::Success, Some(Outcome::Success)),
            entry(Outcome::Blocked, Some(Outcome::Redirected)),
            entry(Outcome::TimedOut, Some(Outcome::PartialSuccess)),
            entry(Outcome::Failed, Some(Outcome::Success)),
        ]);

        let direct = r.tally(Method::Direct);
        assert_eq!(
            direct,
            MethodTally {
                attempts: 4,
                successes: 1,
                partial: 0,
                blocked: 1,
                redirected: 0,
                failed: 2,
            }
        );
        assert_eq!(direct.success_rate(RunMode::Comparison), 25.0);

        let probe = r.tally(Method::Probe);
        assert_eq!(probe.attempts, 4);
        assert_eq!(probe.successes, 2);
        assert_eq!(probe.partial, 1);
        assert_eq!(probe.redirected, 1);
        assert_eq!(probe.success_rate(RunMode::Comparison), 50.0);
    }

    #[test]
    fn empty_tally_has_zero_rate() {
        assert_eq!(MethodTally::default().success_rate(RunMode::Direct), 0.0);
        assert_eq!(MethodTally::default().success_rate(RunMode::Comparison), 0.0);
        assert_eq!(report(vec![]).tally(Method::Probe).attempts, 0);
    }

    #[test]
    fn render_lists_entries_and_rates() {
        let r = report(vec![
            entry(Outcome::Blocked, Some(Outcome::Success)),
            entry(Outcome::Success, Some(Outcome::Success)),
            entry(Outcome::Success, Some(Outcome::Failed)),
        ]);
        let text = r.render();
        assert!(text.contains("comparison report: 3 url(s)"), "{text}");
        assert!(text.contains("browser probe wins"));
        assert!(text.contains("both methods succeeded"));
        assert!(text.contains("direct http wins"));
        assert!(text.contains("2/3 succeeded (66.7%)"));
        assert!(text.contains("title: a question"));
        assert!(text.contains("basic quality"));
    }

    #[test]
    fn direct_run_renders_without_probe_section() {
        let r = report(vec![entry(Outcome::PartialSuccess, None)]);
        let text = r.render();
        assert!(text.contains("access report"));
        assert!(!text.contains("browser probe"));
        assert!(text.contains("1/1 succeeded (100.0%)"), "{text}");
        assert_eq!(r.verdicts(), vec![]);
    }

    #[test]
    fn direct_runs_count_partial_pages_as_reached() {
        let r = report(vec![
            entry(Outcome::Success, None),
            entry(Outcome::PartialSuccess, None),
            entry(Outcome::Blocked, None),
            entry(Outcome::TimedOut, None),
        ]);
        assert_eq!(r.mode, RunMode::Direct);
        assert_eq!(r.tally(Method::Direct).succeeded(RunMode::Direct), 2);
        assert_eq!(r.success_rate(Method::Direct), 50.0);
        assert!(r.render().contains("2/4 succeeded (50.0%), 1 partial"));
    }

    #[test]
    fn comparison_runs_count_only_full_pages() {
        let r = report(vec![
            entry(Outcome::Success, Some(Outcome::PartialSuccess)),
            entry(Outcome::PartialSuccess, Some(Outcome::Success)),
        ]);
        assert_eq!(r.mode, RunMode::Comparison);
        assert_eq!(r.success_rate(Method::Direct), 50.0);
        assert_eq!(r.success_rate(Method::Probe), 50.0);
        let text = r.render();
        assert!(text.contains("1/2 succeeded (50.0%), 1 partial"), "{text}");
        assert!(!text.contains("2/2 succeeded"));
    }

    #[test]
    fn mode_decides_the_header_even_without_entries() {
        let mut r = report(vec![]);
        r.mode = RunMode::Comparison;
        assert!(r.render().contains("comparison report: 0 url(s)"));
        assert!(r.render().contains("browser probe"));
    }

    #[test]
    fn markdown_has_a_table_per_url_and_a_summary() {
        let mut blocked = entry(Outcome::Blocked, Some(Outcome::Success));
        blocked.fetch.status_code = Some(403);
        blocked.fetch.error = Some("x | y".to_string());
        let r = report(vec![blocked]);

        let md = r.render_markdown();
        assert!(md.starts_with("# wallprobe comparison report\n"), "{md}");
        assert!(md.contains("## 1. https://www.zhihu.com/question/1"));
        assert!(md.contains("| direct http | blocked | 403 | 10 | 5 | x \\| y |"), "{md}");
        assert!(md.contains("| browser probe | success | - | 10 | 900 | a question |"));
        assert!(md.contains("**Verdict:** browser probe wins"));
        assert!(md.contains("## Summary"));
        assert!(md.contains("| browser probe | 1/1 | 100.0% | 0 | 0 | 0 | 0 |"), "{md}");
    }
}
