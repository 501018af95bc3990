//! Replay of a JSONL wire-event stream through a capture session.
//!
//! Each input line is one [`WireEvent`]; malformed lines are skipped with a
//! warning so a partially damaged stream still yields an artifact.

use std::path::PathBuf;

use anyhow::{Context, Result};
use capture_tap::{SessionConfig, WireEvent};
use export_store::{ExportConfig, ExportReport};
use tracing::{debug, info, warn};

use crate::runtime::CaptureRuntime;

pub struct ReplayOptions {
    pub events: PathBuf,
    pub session: SessionConfig,
    pub export: ExportConfig,
}

pub async fn run(options: &ReplayOptions) -> Result<ExportReport> {
    let runtime = CaptureRuntime::start(options.session.clone(), options.export.clone())
        .context("starting capture session")?;

    let mut progress = runtime.handle().subscribe_progress();
    let progress_task = tokio::spawn(async move {
        while let Ok(update) = progress.recv().await {
            info!(
                target: "apitap",
                recorded = update.recorded,
                pending = update.pending,
                url = %update.last_url,
                "captured call"
            );
        }
    });

    let raw = tokio::fs::read_to_string(&options.events)
        .await
        .with_context(|| format!("reading event stream {}", options.events.display()))?;

    let mut fed = 0usize;
    for (line_no, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<WireEvent>(line) {
            Ok(event) => {
                runtime.handle().ingest(event);
                fed += 1;
            }
            Err(err) => {
                warn!(
                    target: "apitap",
                    line = line_no + 1,
                    %err,
                    "skipping malformed event line"
                );
            }
        }
    }
    debug!(target: "apitap", fed, "event stream replayed");

    let report = runtime
        .stop()
        .await?
        .context("session already stopped")?;
    progress_task.abort();

    info!(
        target: "apitap",
        path = %report.path.display(),
        total = report.total_captured,
        reduced = report.reduced_fidelity,
        "capture complete"
    );
    Ok(report)
}
