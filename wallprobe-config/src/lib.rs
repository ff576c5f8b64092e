//! Loader for wallprobe configuration with YAML + environment overlays.
//!
//! Sources merge in this order, later ones winning:
//!
//! 1. built-in defaults (every field has one, so an empty config is valid)
//! 2. YAML files and inline snippets, in the order they were added
//! 3. `WALLPROBE__`-prefixed environment variables, `__` separating nested
//!    keys (`WALLPROBE__FETCH__TIMEOUT_MS=5000`); the URL and keyword lists
//!    accept comma-separated values
//!
//! `${VAR}` placeholders in any string are expanded afterwards.
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use wallprobe_common::{Classifier, MarkerSet, Thresholds};

const MAX_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "WALLPROBE";
const LIST_KEYS: [&str; 3] = ["default_keywords", "compare_urls", "fallback_urls"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallprobeConfig {
    /// Domain keyword searches are restricted to.
    pub site_domain: String,
    /// Upper bound on resolved targets per run.
    pub max_targets: usize,
    /// Searched in turn by `--defaults` in access mode.
    pub default_keywords: Vec<String>,
    /// Targets of `--defaults --compare`.
    pub compare_urls: Vec<String>,
    /// Returned by keyword search when the engine is unreachable.
    pub fallback_urls: Vec<String>,
    pub fetch: FetchSection,
    pub probe: ProbeSection,
    pub pacing: PacingSection,
    pub markers: MarkerSet,
    pub thresholds: Thresholds,
}

impl Default for WallprobeConfig {
    fn default() -> Self {
        Self {
            site_domain: "zhihu.com".into(),
            max_targets: 5,
            default_keywords: vec!["人工智能".into(), "Python编程".into(), "React开发".into()],
            compare_urls: vec![
                "https://zhuanlan.zhihu.com/p/579628061".into(),
                "https://zhuanlan.zhihu.com/p/400000000".into(),
                "https://www.zhihu.com/question/20297063".into(),
                "https://www.zhihu.com".into(),
            ],
            fallback_urls: vec![
                "https://zhuanlan.zhihu.com/p/579628061".into(),
                "https://www.zhihu.com/question/20297063".into(),
                "https://zhuanlan.zhihu.com/p/400000000".into(),
                "https://www.zhihu.com/question/300000000".into(),
            ],
            fetch: FetchSection::default(),
            probe: ProbeSection::default(),
            pacing: PacingSection::default(),
            markers: MarkerSet::default(),
            thresholds: Thresholds::default(),
        }
    }
}

impl WallprobeConfig {
    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.markers.clone(), self.thresholds)
    }
}

/// Request deadlines, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    /// Direct fetch in access (tester) mode.
    pub timeout_ms: u64,
    pub search_timeout_ms: u64,
    /// Direct fetch in comparison mode.
    pub compare_timeout_ms: u64,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            search_timeout_ms: 10_000,
            compare_timeout_ms: 10_000,
        }
    }
}

impl FetchSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    pub fn compare_timeout(&self) -> Duration {
        Duration::from_millis(self.compare_timeout_ms)
    }
}

/// External browser probe launch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSection {
    pub interpreter: String,
    /// May start with `~`.
    pub script: String,
    pub timeout_ms: u64,
}

impl Default for ProbeSection {
    fn default() -> Self {
        Self {
            interpreter: "python3".into(),
            script: "~/Linkgo/web_agent.py".into(),
            timeout_ms: 120_000,
        }
    }
}

impl ProbeSection {
    /// Script path with a leading `~` replaced by the home directory.
    pub fn script_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.script).into_owned())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Pauses between steps, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingSection {
    pub method_gap_ms: u64,
    pub url_gap_ms: u64,
    pub direct_url_gap_ms: u64,
    pub search_gap_ms: u64,
}

impl Default for PacingSection {
    fn default() -> Self {
        Self {
            method_gap_ms: 2_000,
            url_gap_ms: 3_000,
            direct_url_gap_ms: 2_000,
            search_gap_ms: 2_000,
        }
    }
}

impl PacingSection {
    pub fn method_gap(&self) -> Duration {
        Duration::from_millis(self.method_gap_ms)
    }

    pub fn url_gap(&self) -> Duration {
        Duration::from_millis(self.url_gap_ms)
    }

    pub fn direct_url_gap(&self) -> Duration {
        Duration::from_millis(self.direct_url_gap_ms)
    }

    pub fn search_gap(&self) -> Duration {
        Duration::from_millis(self.search_gap_ms)
    }
}

/// `$XDG_CONFIG_HOME/wallprobe/config.yaml` or the platform equivalent.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wallprobe").join("config.yaml"))
}

/// Expand `$VAR` and `${VAR}` in every string of the merged tree.
fn expand_placeholders(value: &mut Value) {
    match value {
        Value::String(s) if s.contains('$') => *s = expand_str(s),
        Value::Array(items) => items.iter_mut().for_each(expand_placeholders),
        Value::Object(fields) => fields.values_mut().for_each(expand_placeholders),
        _ => {}
    }
}

/// Set variables are substituted until the text stops changing or the depth
/// cap is hit; unset ones stay literal so the rest of the string still expands.
fn expand_str(raw: &str) -> String {
    let mut cur = raw.to_string();
    for _ in 0..MAX_EXPANSION_DEPTH {
        let next =
            shellexpand::env_with_context_no_errors(&cur, |name| std::env::var(name).ok())
                .into_owned();
        if next == cur {
            break;
        }
        cur = next;
    }
    cur
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct WallprobeConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for WallprobeConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl WallprobeConfigLoader {
    /// Start from built-in defaults.
    ///
    /// ```
    /// use wallprobe_config::WallprobeConfigLoader;
    ///
    /// let config = WallprobeConfigLoader::new()
    ///     .with_yaml_str("max_targets: 3")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.max_targets, 3);
    /// assert_eq!(config.fetch.timeout_ms, 15_000);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a config file that must exist; format is inferred from the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a config file that is skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use wallprobe_config::WallprobeConfigLoader;
    ///
    /// let cfg = WallprobeConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// compare_urls:
    ///   - "https://www.zhihu.com"
    /// markers:
    ///   soft_block: ["blocked-page"]
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.compare_urls, vec!["https://www.zhihu.com"]);
    /// assert_eq!(cfg.markers.soft_block, vec!["blocked-page"]);
    /// assert_eq!(cfg.markers.access_denied, vec!["访问失败"]);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// Environment overrides are applied on top of every file, then `${VAR}`
    /// placeholders are expanded.
    pub fn load(self) -> Result<WallprobeConfig, ConfigError> {
        let env = LIST_KEYS.iter().fold(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
            |env, key| env.with_list_parse_key(key),
        );
        let cfg = self.builder.add_source(env).build()?;

        let mut tree: Value = cfg.try_deserialize()?;
        expand_placeholders(&mut tree);

        serde_json::from_value(tree).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilde_in_script_is_expanded() {
        temp_env::with_var("HOME", Some("/home/probe"), || {
            let probe = ProbeSection::default();
            assert_eq!(
                probe.script_path(),
                PathBuf::from("/home/probe/Linkgo/web_agent.py")
            );
        });
    }

    #[test]
    fn durations_follow_millis() {
        let pacing = PacingSection::default();
        assert_eq!(pacing.method_gap(), Duration::from_secs(2));
        assert_eq!(pacing.url_gap(), Duration::from_secs(3));
        assert_eq!(FetchSection::default().compare_timeout(), Duration::from_secs(10));
        assert_eq!(ProbeSection::default().timeout(), Duration::from_secs(120));
    }
}
