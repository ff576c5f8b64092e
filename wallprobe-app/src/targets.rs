use std::collections::HashSet;
use std::time::Duration;

use tokio::time::sleep;
use wallprobe_config::WallprobeConfig;
use wallprobe_web::SearchProvider;

/// What the user asked to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRequest {
    /// A single URL given on the command line.
    Url(String),
    /// Keywords joined into one search phrase.
    Keywords(String),
    /// The configured comparison URL list.
    DefaultUrls,
    /// The configured keyword list, searched one after another.
    DefaultKeywords,
}

impl TargetRequest {
    /// `site_domain` lets a bare host such as `zhuanlan.zhihu.com/p/1` count
    /// as a URL; any other word is a keyword.
    pub fn from_args(targets: &[String], defaults: bool, compare: bool, site_domain: &str) -> Self {
        match targets.first() {
            Some(first) => match with_scheme(first, site_domain) {
                Some(url) => TargetRequest::Url(url),
                None => TargetRequest::Keywords(targets.join(" ")),
            },
            None if compare => TargetRequest::DefaultUrls,
            None if defaults => TargetRequest::DefaultKeywords,
            None => TargetRequest::DefaultUrls,
        }
    }
}

/// `https://` is assumed for scheme-relative and bare site URLs.
fn with_scheme(arg: &str, site_domain: &str) -> Option<String> {
    if arg.starts_with("http") {
        return Some(arg.to_string());
    }
    if let Some(rest) = arg.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    let host = arg.split(['/', '?', '#']).next().unwrap_or_default();
    let on_site = !site_domain.is_empty()
        && (host == site_domain || host.ends_with(&format!(".{site_domain}")));
    on_site.then(|| format!("https://{arg}"))
}

/// Turn a request into a de-duplicated, capped URL list.
pub async fn resolve(
    request: &TargetRequest,
    cfg: &WallprobeConfig,
    search: &dyn SearchProvider,
) -> Vec<String> {
    let urls = match request {
        TargetRequest::Url(url) => vec![url.clone()],
        TargetRequest::Keywords(query) => search.search(query).await,
        TargetRequest::DefaultUrls => cfg.compare_urls.clone(),
        TargetRequest::DefaultKeywords => {
            search_all(&cfg.default_keywords, search, cfg.pacing.search_gap()).await
        }
    };
    dedupe_capped(urls, cfg.max_targets)
}

async fn search_all(keywords: &[String], search: &dyn SearchProvider, gap: Duration) -> Vec<String> {
    let mut urls = Vec::new();
    for (i, keyword) in keywords.iter().enumerate() {
        if i > 0 {
            sleep(gap).await;
        }
        let found = search.search(keyword).await;
        tracing::info!(keyword = %keyword, found = found.len(), "targets.search");
        urls.extend(found);
    }
    urls
}

fn dedupe_capped(urls: Vec<String>, cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|u| seen.insert(u.clone()))
        .take(cap)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedSearch {
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedSearch {
        fn new() -> Self {
            Self {
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SearchProvider for ScriptedSearch {
        async fn search(&self, query: &str) -> Vec<String> {
            self.queries.lock().unwrap().push(query.to_string());
            (1..=3)
                .map(|n| format!("https://www.zhihu.com/question/{n}"))
                .chain([format!("https://zhuanlan.zhihu.com/p/{}", query.len())])
                .collect()
        }
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    const SITE: &str = "zhihu.com";

    #[test]
    fn request_follows_arguments() {
        assert_eq!(
            TargetRequest::from_args(&args(&["https://www.zhihu.com", "extra"]), false, false, SITE),
            TargetRequest::Url("https://www.zhihu.com".into())
        );
        assert_eq!(
            TargetRequest::from_args(&args(&["rust", "async"]), true, false, SITE),
            TargetRequest::Keywords("rust async".into())
        );
        assert_eq!(
            TargetRequest::from_args(&[], true, true, SITE),
            TargetRequest::DefaultUrls
        );
        assert_eq!(
            TargetRequest::from_args(&[], true, false, SITE),
            TargetRequest::DefaultKeywords
        );
    }

    #[test]
    fn missing_scheme_defaults_to_https() {
        assert_eq!(
            TargetRequest::from_args(&args(&["zhuanlan.zhihu.com/p/123"]), false, false, SITE),
            TargetRequest::Url("https://zhuanlan.zhihu.com/p/123".into())
        );
        assert_eq!(
            TargetRequest::from_args(&args(&["zhihu.com"]), false, false, SITE),
            TargetRequest::Url("https://zhihu.com".into())
        );
        assert_eq!(
            TargetRequest::from_args(&args(&["//www.zhihu.com/question/1"]), false, false, SITE),
            TargetRequest::Url("https://www.zhihu.com/question/1".into())
        );
    }

    #[test]
    fn off_site_words_stay_keywords() {
        assert_eq!(
            TargetRequest::from_args(&args(&["notzhihu.com", "rust"]), false, false, SITE),
            TargetRequest::Keywords("notzhihu.com rust".into())
        );
        assert_eq!(
            TargetRequest::from_args(&args(&["zhihu"]), false, false, ""),
            TargetRequest::Keywords("zhihu".into())
        );
    }

    #[tokio::test]
    async fn single_url_skips_search() {
        let search = ScriptedSearch::new();
        let urls = resolve(
            &TargetRequest::Url("https://www.zhihu.com".into()),
            &WallprobeConfig::default(),
            &search,
        )
        .await;
        assert_eq!(urls, vec!["https://www.zhihu.com"]);
        assert!(search.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn default_keywords_are_searched_in_turn_and_capped() {
        let mut cfg = WallprobeConfig::default();
        cfg.default_keywords = args(&["a", "bb"]);
        cfg.pacing.search_gap_ms = 10;
        cfg.max_targets = 5;

        let search = ScriptedSearch::new();
        let urls = resolve(&TargetRequest::DefaultKeywords, &cfg, &search).await;

        assert_eq!(*search.queries.lock().unwrap(), vec!["a", "bb"]);
        assert_eq!(
            urls,
            vec![
                "https://www.zhihu.com/question/1",
                "https://www.zhihu.com/question/2",
                "https://www.zhihu.com/question/3",
                "https://zhuanlan.zhihu.com/p/1",
                "https://zhuanlan.zhihu.com/p/2",
            ]
        );
    }

    #[tokio::test]
    async fn default_urls_come_from_config() {
        let mut cfg = WallprobeConfig::default();
        cfg.compare_urls = args(&["https://a.example", "https://a.example", "https://b.example"]);
        let urls = resolve(&TargetRequest::DefaultUrls, &cfg, &ScriptedSearch::new()).await;
        assert_eq!(urls, vec!["https://a.example", "https://b.example"]);
    }
}
