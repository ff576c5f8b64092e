//! Outcome classification for probe attempts.
//!
//! Two heuristics live here. The status path looks at an HTTP status code and
//! the decoded body length. The rendered path, used for pages retrieved by an
//! external browser probe, looks for known marker text in the page body.
//!
//! Both are best-effort pattern matching against one site's behavior, not a
//! protocol-level signal. Marker strings and thresholds are plain data so they
//! can be updated from configuration without touching the rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic classification of a single fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    PartialSuccess,
    Blocked,
    Redirected,
    Failed,
    TimedOut,
}

impl Outcome {
    /// Short label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::PartialSuccess => "partial success",
            Outcome::Blocked => "blocked",
            Outcome::Redirected => "redirected",
            Outcome::Failed => "failed",
            Outcome::TimedOut => "timed out",
        }
    }

    /// One-line explanation of what the outcome usually means for the target site.
    pub fn analysis(self) -> &'static str {
        match self {
            Outcome::Success => "full page content retrieved",
            Outcome::PartialSuccess => "little content, possibly a simplified page",
            Outcome::Blocked => "anti-scraping defense triggered",
            Outcome::Redirected => "redirected instead of serving content",
            Outcome::Failed => "request failed",
            Outcome::TimedOut => "no complete response before the timeout",
        }
    }

    /// Only a full-content fetch counts as a success.
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Site-specific page text that betrays a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerSet {
    /// Text of the page served in place of real content ("soft block").
    pub soft_block: Vec<String>,
    /// Text of an explicit access-denied page.
    pub access_denied: Vec<String>,
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self {
            soft_block: vec!["荒原".to_string()],
            access_denied: vec!["访问失败".to_string()],
        }
    }
}

impl MarkerSet {
    fn hit(markers: &[String], text: &str) -> bool {
        markers
            .iter()
            .filter(|m| !m.is_empty())
            .any(|m| text.contains(m.as_str()))
    }
}

/// Content length thresholds, in characters. Both bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// A 200 response must be strictly longer than this to be a full success.
    pub direct_success_len: usize,
    /// A rendered page must be strictly longer than this to be a full success.
    pub rendered_success_len: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            direct_success_len: 5000,
            rendered_success_len: 1000,
        }
    }
}

/// Outcome classifier carrying its marker and threshold data.
///
/// ```
/// use wallprobe_common::{Classifier, Outcome};
///
/// let classifier = Classifier::default();
/// assert_eq!(classifier.classify(302, 0, ""), Outcome::Redirected);
/// assert_eq!(classifier.classify_rendered("欢迎来到荒原"), Outcome::Redirected);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classifier {
    pub markers: MarkerSet,
    pub thresholds: Thresholds,
}

impl Classifier {
    pub fn new(markers: MarkerSet, thresholds: Thresholds) -> Self {
        Self {
            markers,
            thresholds,
        }
    }

    /// Classify a direct HTTP response. Rules apply in order; the body text is
    /// accepted for symmetry with the rendered path but not consulted.
    pub fn classify(&self, status: u16, body_len: usize, _body_text: &str) -> Outcome {
        match status {
            300..=399 => Outcome::Redirected,
            403 => Outcome::Blocked,
            200 if body_len > self.thresholds.direct_success_len => Outcome::Success,
            200 => Outcome::PartialSuccess,
            _ => Outcome::Failed,
        }
    }

    /// Classify a page rendered by the external browser probe.
    ///
    /// Marker text overrides length: a soft-block marker wins over an
    /// access-denied marker, and either wins over any length.
    pub fn classify_rendered(&self, body_text: &str) -> Outcome {
        if MarkerSet::hit(&self.markers.soft_block, body_text) {
            return Outcome::Redirected;
        }
        if MarkerSet::hit(&self.markers.access_denied, body_text) {
            return Outcome::Failed;
        }
        if body_text.chars().count() > self.thresholds.rendered_success_len {
            Outcome::Success
        } else {
            Outcome::PartialSuccess
        }
    }
}

/// Classify a direct HTTP response with the default thresholds.
pub fn classify(status: u16, body_len: usize, body_text: &str) -> Outcome {
    Classifier::default().classify(status, body_len, body_text)
}
