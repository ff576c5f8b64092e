//! Logging setup for wallprobe runs.
//!
//! stdout belongs to the report, so diagnostics go to a daily rolling file
//! and, with `--verbose`, to stderr as well. [`init_logging`] is safe to call
//! more than once; later calls return the path chosen by the first.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

const LOG_DIR_ENV: &str = "WALLPROBE_LOG_DIR";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Encoding of log lines, in the file and on stderr alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Used for the default directory and the file name.
    pub app_name: &'static str,
    /// Wins over `WALLPROBE_LOG_DIR` and `~/.local/share/<app_name>`.
    pub log_dir: Option<PathBuf>,
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: &'static str,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "wallprobe",
            log_dir: None,
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "info",
        }
    }
}

/// Where the log directory came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirSource {
    Explicit,
    Env,
    Default,
}

/// Install the global subscriber and return today's log file.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(path.clone());
    }

    let env_dir = std::env::var(LOG_DIR_ENV).ok();
    let (dir, source) = resolve_log_dir(config.app_name, config.log_dir.as_deref(), env_dir.as_deref());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    // tracing-appender names daily files `<prefix>.<YYYY-MM-DD>`.
    let prefix = format!("{}.log", config.app_name);
    let path = dir.join(format!("{prefix}.{}", Local::now().format("%Y-%m-%d")));

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, &prefix));
    let _ = LOG_GUARD.set(guard);

    let mut layers = vec![format_layer(config.format, writer, false)];
    if config.emit_stderr {
        layers.push(format_layer(config.format, std::io::stderr, true));
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.default_filter));

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    tracing::debug!(path = %path.display(), source = ?source, "log.file");
    let _ = LOG_PATH.set(path.clone());
    Ok(path)
}

fn format_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(ansi).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    }
}

fn resolve_log_dir(
    app_name: &str,
    explicit: Option<&Path>,
    env_dir: Option<&str>,
) -> (PathBuf, DirSource) {
    let home = std::env::var("HOME").ok();
    let under_home = |p: &Path| match (p.strip_prefix("~"), &home) {
        (Ok(rest), Some(home)) => Path::new(home).join(rest),
        _ => p.to_path_buf(),
    };

    match (explicit, env_dir.filter(|d| !d.is_empty())) {
        (Some(dir), _) => (under_home(dir), DirSource::Explicit),
        (None, Some(dir)) => (under_home(Path::new(dir)), DirSource::Env),
        (None, None) => {
            let base = home.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
            (base.join(".local/share").join(app_name), DirSource::Default)
        }
    }
}
