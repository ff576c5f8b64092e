//! Bridge to the out-of-process browser probe.
//!
//! The probe is an opaque script run as `<interpreter> <script> <url>`. It
//! must print a single JSON object `{ "content": "...", "title": "..." }` on
//! stdout and exit 0. Anything else is a failed probe whose message carries
//! enough of the child's output to diagnose it.
//!
//! Unlike a bare `wait`, the bridge enforces a deadline: a hung browser is
//! killed and reported as timed out instead of stalling the whole run.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use wallprobe_common::{Classifier, Outcome};

use crate::types::{ContentQuality, ExternalProbeResult};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to collect probe output: {0}")]
    Wait(#[source] std::io::Error),
    #[error("probe exited with {}: {stderr}", exit_label(.code))]
    Exit { code: Option<i32>, stderr: String },
    #[error("probe output is not valid JSON ({message}); raw output: {raw}")]
    Parse { message: String, raw: String },
    #[error("probe killed after {0} ms")]
    Timeout(u64),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {c}"),
        None => "a signal".to_string(),
    }
}

/// What the probe script prints on success. Extra keys are ignored.
#[derive(Debug, Deserialize)]
struct ProbePayload {
    #[serde(default)]
    content: String,
    #[serde(default)]
    title: Option<String>,
}

/// Anything that can render a URL in a real browser.
#[async_trait]
pub trait BrowserProbe: Send + Sync {
    async fn probe(&self, url: &str) -> ExternalProbeResult;
}

/// How to launch the probe script.
#[derive(Debug, Clone)]
pub struct ProbeCommand {
    pub interpreter: String,
    pub script: PathBuf,
    pub timeout: Duration,
}

/// [`BrowserProbe`] that shells out to a script.
#[derive(Debug, Clone)]
pub struct ScriptProbe {
    command: ProbeCommand,
    classifier: Classifier,
}

impl ScriptProbe {
    pub fn new(command: ProbeCommand, classifier: Classifier) -> Self {
        Self {
            command,
            classifier,
        }
    }

    async fn run(&self, url: &str) -> Result<ProbePayload, ProbeError> {
        let ProbeCommand {
            interpreter,
            script,
            timeout,
        } = &self.command;

        let child = Command::new(interpreter)
            .arg(script)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProbeError::Spawn {
                program: interpreter.clone(),
                source,
            })?;
        tracing::debug!(url, pid = ?child.id(), script = %script.display(), "probe.spawned");

        // Dropping the `wait_with_output` future drops the child, which kills it.
        let output = match tokio::time::timeout(*timeout, child.wait_with_output()).await {
            Ok(res) => res.map_err(ProbeError::Wait)?,
            Err(_) => return Err(ProbeError::Timeout(timeout.as_millis() as u64)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!(
            url,
            code = ?output.status.code(),
            stdout_bytes = output.stdout.len(),
            stderr = %stderr.trim(),
            "probe.exit"
        );

        if !output.status.success() {
            return Err(ProbeError::Exit {
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        serde_json::from_str::<ProbePayload>(stdout.trim()).map_err(|e| ProbeError::Parse {
            message: e.to_string(),
            raw: stdout.trim().to_string(),
        })
    }
}

#[async_trait]
impl BrowserProbe for ScriptProbe {
    async fn probe(&self, url: &str) -> ExternalProbeResult {
        let started = Instant::now();
        let res = self.run(url).await;
        let response_time_ms = started.elapsed().as_millis() as u64;

        match res {
            Ok(payload) => {
                let outcome = self.classifier.classify_rendered(&payload.content);
                let content_length = payload.content.chars().count();
                let result = ExternalProbeResult {
                    url: url.to_string(),
                    content_length,
                    title: payload
                        .title
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty()),
                    outcome,
                    response_time_ms,
                    error: None,
                    quality: ContentQuality::from_chars(content_length),
                };
                tracing::info!(
                    url,
                    chars = result.content_length,
                    quality = result.quality.label(),
                    elapsed_ms = response_time_ms,
                    %outcome,
                    "probe.result"
                );
                result
            }
            Err(err) => {
                let outcome = match err {
                    ProbeError::Timeout(_) => Outcome::TimedOut,
                    _ => Outcome::Failed,
                };
                tracing::warn!(url, error = %err, %outcome, "probe.error");
                ExternalProbeResult {
                    url: url.to_string(),
                    content_length: 0,
                    title: None,
                    outcome,
                    response_time_ms,
                    error: Some(err.to_string()),
                    quality: ContentQuality::Basic,
                }
            }
        }
    }
}
