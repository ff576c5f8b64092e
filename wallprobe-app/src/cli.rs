use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use wallprobe_common::observability::LogFormat;

#[derive(Debug, Parser)]
#[command(
    name = "wallprobe",
    about = "Check whether a site's pages can be read by plain HTTP or only through a real browser",
    version,
    after_help = "Examples:\n  wallprobe https://zhuanlan.zhihu.com/p/123456\n  wallprobe rust async\n  wallprobe --defaults\n  wallprobe --compare"
)]
pub struct Cli {
    /// A URL (starting with http) or keywords to search the site for
    pub targets: Vec<String>,

    /// Run the direct fetch and the browser probe side by side
    #[arg(long)]
    pub compare: bool,

    /// Use the configured default keywords (or comparison URLs with --compare)
    #[arg(long)]
    pub defaults: bool,

    /// YAML config file; defaults to the per-user config if it exists
    #[arg(long, env = "WALLPROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write logs to stderr
    #[arg(long, short)]
    pub verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    /// How the report is printed on stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl Cli {
    /// Nothing to do without targets unless a preset run was requested.
    pub fn wants_help(&self) -> bool {
        self.targets.is_empty() && !self.defaults && !self.compare
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}
