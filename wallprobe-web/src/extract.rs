//! Text helpers for fetched pages: the `<title>`, a whitespace-collapsed
//! preview, and char-safe shortening for terminal output.

use regex::Regex;
use std::sync::LazyLock;

// FIXME(parser): this is pattern matching, not HTML parsing. Entities stay
// encoded, and a `</title>` inside a script or comment ends the match early.
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title(?:\s[^>]*)?>(.*?)</title>").expect("title regex compiles")
});

/// First `<title>` of the document, trimmed. `None` when there is no title
/// element or the first one is blank.
///
/// ```
/// use wallprobe_web::extract::extract_title;
///
/// assert_eq!(extract_title("<TITLE> 知乎 - 有问题 </TITLE>").as_deref(), Some("知乎 - 有问题"));
/// assert_eq!(extract_title("<notitle/>"), None);
/// ```
pub fn extract_title(html: &str) -> Option<String> {
    let caps = TITLE_RE.captures(html)?;
    let title = caps.get(1)?.as_str().trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

/// Collapse whitespace runs to one space, trim, and keep at most `max_chars`
/// characters.
pub fn preview(html: &str, max_chars: usize) -> String {
    let collapsed = html.split_whitespace().collect::<Vec<_>>().join(" ");
    take_chars(&collapsed, max_chars).to_string()
}

/// Like [`preview`] for already-clean text, marking truncation with `...`.
pub fn shorten(text: &str, max_chars: usize) -> String {
    let head = take_chars(text, max_chars);
    if head.len() < text.len() {
        format!("{head}...")
    } else {
        head.to_string()
    }
}

fn take_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
