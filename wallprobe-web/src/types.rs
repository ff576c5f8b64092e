use serde::Serialize;
use wallprobe_common::Outcome;

/// Result of one direct HTTP attempt.
///
/// Either `status_code` (with `content_length`) or `error` is meaningful,
/// never both. A timeout is reported through `outcome`, not a status code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResult {
    pub url: String,
    pub status_code: Option<u16>,
    /// Decoded body length in characters.
    pub content_length: usize,
    pub response_time_ms: u64,
    pub outcome: Outcome,
    pub title: Option<String>,
    pub error: Option<String>,
    /// `Server` response header.
    pub server: Option<String>,
    /// Redirect target, when the server sent one.
    pub location: Option<String>,
    pub preview: Option<String>,
}

impl FetchResult {
    /// A result for an attempt that produced no response.
    pub fn errored(url: &str, outcome: Outcome, error: String, response_time_ms: u64) -> Self {
        Self {
            url: url.to_string(),
            status_code: None,
            content_length: 0,
            response_time_ms,
            outcome,
            title: None,
            error: Some(error),
            server: None,
            location: None,
            preview: None,
        }
    }
}

/// Result of one external browser probe run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalProbeResult {
    pub url: String,
    /// Rendered content length in characters.
    pub content_length: usize,
    pub title: Option<String>,
    pub outcome: Outcome,
    pub response_time_ms: u64,
    pub error: Option<String>,
    pub quality: ContentQuality,
}

/// Rough grade of how much text a rendered page yielded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentQuality {
    /// More than 1000 characters.
    Excellent,
    /// More than 200 characters.
    Good,
    Basic,
}

impl ContentQuality {
    pub fn from_chars(chars: usize) -> Self {
        match chars {
            n if n > 1000 => ContentQuality::Excellent,
            n if n > 200 => ContentQuality::Good,
            _ => ContentQuality::Basic,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ContentQuality::Excellent => "excellent",
            ContentQuality::Good => "good",
            ContentQuality::Basic => "basic",
        }
    }
}
