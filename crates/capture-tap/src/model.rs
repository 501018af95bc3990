//! Captured-call records and progress payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// Which observation entry point produced a call.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Direct,
    Event,
}

/// One observed outbound request in its terminal state.
///
/// Exactly one of `response`, `response_text` and `error` is populated once
/// the call has completed; `seq` reflects issuance order even though the
/// buffer holds calls in completion order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapturedCall {
    pub seq: u64,
    pub url: String,
    pub method: String,
    pub transport: TransportKind,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Published on the progress bus as calls reach their terminal state.
#[derive(Clone, Debug, Serialize)]
pub struct CaptureProgress {
    pub recorded: usize,
    pub pending: usize,
    pub last_url: String,
}

/// Broadcast channel for capture progress.
pub type ProgressBus = broadcast::Sender<CaptureProgress>;
