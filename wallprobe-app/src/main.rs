use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use wallprobe_common::WallprobeError;
use wallprobe_common::observability::{LogConfig, init_logging};
use wallprobe_compare::{ComparisonReport, Orchestrator, Pacing};
use wallprobe_config::{WallprobeConfig, WallprobeConfigLoader, default_config_path};
use wallprobe_http::HttpClient;
use wallprobe_web::{DirectFetcher, ProbeCommand, ScriptProbe, SiteSearch};

use cli::{Cli, OutputFormat};
use targets::TargetRequest;

mod cli;
mod targets;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.wants_help() {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    }

    let cfg = load_config(&cli)?;
    let log_path = init_logging(LogConfig {
        emit_stderr: cli.verbose,
        format: cli.log_format.into(),
        ..LogConfig::default()
    })?;
    tracing::info!(log = %log_path.display(), compare = cli.compare, "wallprobe.start");

    let http = HttpClient::new()?;
    let classifier = cfg.classifier();

    let search = SiteSearch::new(http.clone(), cfg.site_domain.clone())
        .with_fallback(cfg.fallback_urls.clone())
        .with_timeout(cfg.fetch.search_timeout())
        .with_limit(cfg.max_targets);
    let request =
        TargetRequest::from_args(&cli.targets, cli.defaults, cli.compare, &cfg.site_domain);
    let urls = targets::resolve(&request, &cfg, &search).await;
    if urls.is_empty() {
        eprintln!("no URLs to test for {request:?}");
        return Ok(());
    }

    eprintln!("testing {} url(s):", urls.len());
    for (i, url) in urls.iter().enumerate() {
        eprintln!("{}. {}", i + 1, url);
    }

    let fetcher = DirectFetcher::new(http, classifier.clone());
    let probe = ScriptProbe::new(
        ProbeCommand {
            interpreter: cfg.probe.interpreter.clone(),
            script: cfg.probe.script_path(),
            timeout: cfg.probe.timeout(),
        },
        classifier,
    );
    let pacing = Pacing {
        method_gap: cfg.pacing.method_gap(),
        url_gap: cfg.pacing.url_gap(),
        direct_url_gap: cfg.pacing.direct_url_gap(),
    };
    let fetch_timeout = if cli.compare {
        cfg.fetch.compare_timeout()
    } else {
        cfg.fetch.timeout()
    };
    let orchestrator = Orchestrator::new(Arc::new(fetcher), Arc::new(probe), fetch_timeout, pacing);

    let report = if cli.compare {
        orchestrator.run_comparison(&urls).await
    } else {
        orchestrator.run_direct(&urls).await
    };

    print!("{}", render(&report, cli.format)?);
    eprintln!("logs: {}", log_path.display());
    Ok(())
}

fn load_config(cli: &Cli) -> wallprobe_common::Result<WallprobeConfig> {
    let loader = WallprobeConfigLoader::new();
    let loader = match (&cli.config, default_config_path()) {
        (Some(path), _) => loader.with_file(path),
        (None, Some(path)) => loader.with_optional_file(path),
        (None, None) => loader,
    };
    loader
        .load()
        .map_err(|e| WallprobeError::Config(e.to_string()))
}

fn render(report: &ComparisonReport, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => report.render(),
        OutputFormat::Markdown => report.render_markdown(),
        OutputFormat::Json => serde_json::to_string_pretty(report)? + "\n",
    })
}
