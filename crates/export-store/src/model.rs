//! The stable external artifact schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use capture_tap::{CapturedCall, SessionSnapshot};

/// One call as projected into the artifact. Exactly one of `response`,
/// `response_text` and `error` is present.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiCallRecord {
    pub url: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    /// Issuance-order id; the list itself is in completion order.
    pub seq: u64,
}

impl From<&CapturedCall> for ApiCallRecord {
    fn from(call: &CapturedCall) -> Self {
        Self {
            url: call.url.clone(),
            method: call.method.clone(),
            status: call.status,
            timestamp: call.started_at,
            response: call.response.clone(),
            response_text: call.response_text.clone(),
            error: call.error.clone(),
            duration_ms: call.duration_ms,
            request_body: call.request_body.clone(),
            seq: call.seq,
        }
    }
}

/// The exported snapshot document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportArtifact {
    pub scrape_timestamp: DateTime<Utc>,
    pub url: String,
    pub api_calls: Vec<ApiCallRecord>,
    pub total_captured: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_state: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduced_fidelity: Option<bool>,
}

impl ExportArtifact {
    /// Project a snapshot into the artifact shape, without page state.
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        let api_calls: Vec<ApiCallRecord> =
            snapshot.calls.iter().map(ApiCallRecord::from).collect();
        Self {
            scrape_timestamp: snapshot.stopped_at,
            url: snapshot.page_url.clone(),
            total_captured: api_calls.len(),
            api_calls,
            page_state: None,
            reduced_fidelity: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture_tap::TransportKind;

    fn call(seq: u64, url: &str) -> CapturedCall {
        CapturedCall {
            seq,
            url: url.to_string(),
            method: "GET".into(),
            transport: TransportKind::Direct,
            started_at: Utc::now(),
            status: Some(200),
            duration_ms: Some(12),
            request_body: None,
            response: Some(serde_json::json!({"ok": true})),
            response_text: None,
            error: None,
        }
    }

    fn snapshot(calls: Vec<CapturedCall>) -> SessionSnapshot {
        SessionSnapshot {
            session: apitap_core_types::SessionId::new(),
            started_at: Utc::now(),
            stopped_at: Utc::now(),
            page_url: "https://example.com/trading".into(),
            calls,
            page_state: Vec::new(),
        }
    }

    #[test]
    fn total_captured_matches_call_count() {
        let artifact = ExportArtifact::from_snapshot(&snapshot(vec![
            call(1, "https://api.host/a"),
            call(2, "https://api.host/b"),
        ]));
        assert_eq!(artifact.total_captured, artifact.api_calls.len());
        assert_eq!(artifact.total_captured, 2);
    }

    #[test]
    fn empty_sessions_produce_well_formed_artifacts() {
        let artifact = ExportArtifact::from_snapshot(&snapshot(vec![]));
        assert_eq!(artifact.total_captured, 0);
        let rendered = serde_json::to_value(&artifact).expect("serialize");
        assert_eq!(rendered["api_calls"], serde_json::json!([]));
        assert_eq!(rendered["total_captured"], serde_json::json!(0));
    }

    #[test]
    fn absent_options_are_omitted_from_the_document() {
        let artifact = ExportArtifact::from_snapshot(&snapshot(vec![call(1, "https://a")]));
        let rendered = serde_json::to_value(&artifact).expect("serialize");
        let entry = &rendered["api_calls"][0];
        assert!(entry.get("error").is_none());
        assert!(entry.get("response_text").is_none());
        assert!(entry.get("response").is_some());
        assert!(rendered.get("reduced_fidelity").is_none());
    }
}
