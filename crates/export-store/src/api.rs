//! Artifact assembly and delivery.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Map;
use tracing::{info, warn};

use capture_tap::SessionSnapshot;
use safe_json::faithful_json;

use crate::errors::{ExportErrKind, ExportError};
use crate::model::ExportArtifact;
use crate::writer;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Destination of the artifact file.
    pub path: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("api_capture.json"),
        }
    }
}

/// Outcome of one delivery.
#[derive(Clone, Debug)]
pub struct ExportReport {
    pub path: PathBuf,
    pub total_captured: usize,
    pub reduced_fidelity: bool,
}

/// Deliver a finished session to disk.
///
/// The full-fidelity attempt serializes ancillary page state exactly; if any
/// of it cannot be represented the export retries with the reduced schema,
/// dropping the ancillary fields and flagging the artifact. A failure past
/// the fallback is terminal and surfaced to the caller.
pub fn deliver(
    snapshot: &SessionSnapshot,
    config: &ExportConfig,
) -> Result<ExportReport, ExportError> {
    let (data, reduced) = match render_full(snapshot) {
        Ok(data) => (data, false),
        Err(reason) => {
            warn!(
                target: "export-store",
                session = %snapshot.session,
                %reason,
                "full-fidelity export failed, falling back to reduced schema"
            );
            (render_reduced(snapshot)?, true)
        }
    };

    let path = writer::write_atomic(&config.path, &data)
        .map_err(|err| ExportErrKind::IoFailed(err.to_string()))?;

    info!(
        target: "export-store",
        session = %snapshot.session,
        path = %path.display(),
        captured = snapshot.calls.len(),
        bytes = data.len(),
        reduced,
        "artifact delivered"
    );

    Ok(ExportReport {
        path,
        total_captured: snapshot.calls.len(),
        reduced_fidelity: reduced,
    })
}

fn render_full(snapshot: &SessionSnapshot) -> Result<Vec<u8>, String> {
    let mut artifact = ExportArtifact::from_snapshot(snapshot);
    if !snapshot.page_state.is_empty() {
        let mut state = Map::new();
        for (name, value) in &snapshot.page_state {
            let rendered = faithful_json(value)
                .map_err(|err| format!("page_state.{name}: {err}"))?;
            state.insert(name.clone(), rendered);
        }
        artifact.page_state = Some(state);
    }
    serde_json::to_vec_pretty(&artifact).map_err(|err| err.to_string())
}

fn render_reduced(snapshot: &SessionSnapshot) -> Result<Vec<u8>, ExportError> {
    let mut artifact = ExportArtifact::from_snapshot(snapshot);
    artifact.reduced_fidelity = Some(true);
    serde_json::to_vec_pretty(&artifact)
        .map_err(|err| ExportErrKind::Serialize(err.to_string()).into())
}
