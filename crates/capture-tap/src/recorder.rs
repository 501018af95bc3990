//! Capture buffer and completion correlation.
//!
//! Pending calls are keyed by sequence id (direct path) or by the caller's
//! correlation id (event path) until their completion arrives; terminal calls
//! are appended to the buffer exactly once, in completion order. After the
//! recorder is sealed, late completions are dropped rather than recorded.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use safe_json::{preview, sanitize, Dynamic, SanitizeConfig, BINARY_SENTINEL};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::model::{CaptureProgress, CapturedCall, ProgressBus, TransportKind};

/// Correlation key for an in-flight call.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PendingKey {
    /// Direct transport, keyed by the assigned sequence id.
    Direct(u64),
    /// Event transport, keyed by the caller's correlation id.
    Event(u64),
}

/// Terminal result delivered by either transport.
#[derive(Clone, Debug)]
pub enum Outcome {
    Success { status: u16, body: Option<Vec<u8>> },
    Failure { error: String },
}

#[derive(Debug)]
struct PendingCall {
    seq: u64,
    url: String,
    method: String,
    transport: TransportKind,
    started_at: DateTime<Utc>,
    issued: Instant,
    request_body: Option<Value>,
}

pub struct Recorder {
    next_seq: AtomicU64,
    pending: DashMap<PendingKey, PendingCall>,
    buffer: Mutex<Vec<CapturedCall>>,
    sealed: AtomicBool,
    progress: ProgressBus,
    sanitize_cfg: SanitizeConfig,
}

impl Recorder {
    pub fn new(sanitize_cfg: SanitizeConfig, progress_buffer: usize) -> Self {
        let (progress, _) = broadcast::channel(progress_buffer.max(1));
        Self {
            next_seq: AtomicU64::new(1),
            pending: DashMap::new(),
            buffer: Mutex::new(Vec::new()),
            sealed: AtomicBool::new(false),
            progress,
            sanitize_cfg,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CaptureProgress> {
        self.progress.subscribe()
    }

    /// Record issuance on the direct path; returns the assigned sequence id.
    pub fn begin_direct(&self, method: &str, url: &str, body: Option<&Dynamic>) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let request_body = body.map(|value| sanitize(value, &self.sanitize_cfg));
        self.pending.insert(
            PendingKey::Direct(seq),
            PendingCall {
                seq,
                url: url.to_string(),
                method: method.to_string(),
                transport: TransportKind::Direct,
                started_at: Utc::now(),
                issued: Instant::now(),
                request_body,
            },
        );
        seq
    }

    /// Record issuance on the event path, keyed by the caller's id.
    pub fn begin_event(&self, id: u64, method: String, url: String) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.pending.insert(
            PendingKey::Event(id),
            PendingCall {
                seq,
                url,
                method,
                transport: TransportKind::Event,
                started_at: Utc::now(),
                issued: Instant::now(),
                request_body: None,
            },
        );
    }

    /// Attach the request body observed at the send step of the event path.
    pub fn attach_event_body(&self, id: u64, body: Option<&str>) {
        if let Some(mut entry) = self.pending.get_mut(&PendingKey::Event(id)) {
            entry.request_body = body.map(|text| classify_text(text, self.sanitize_cfg.max_text));
        }
    }

    /// Move one in-flight call to its terminal state.
    ///
    /// Unmatched keys (out-of-scope or already completed) and completions
    /// arriving after [`Recorder::seal`] are dropped.
    pub fn complete(&self, key: PendingKey, outcome: Outcome) {
        if self.sealed.load(Ordering::SeqCst) {
            self.pending.remove(&key);
            debug!(target: "capture-tap", ?key, "late completion dropped after seal");
            return;
        }
        let Some((_, pending)) = self.pending.remove(&key) else {
            debug!(target: "capture-tap", ?key, "unmatched completion ignored");
            return;
        };

        let mut call = CapturedCall {
            seq: pending.seq,
            url: pending.url,
            method: pending.method,
            transport: pending.transport,
            started_at: pending.started_at,
            status: None,
            duration_ms: Some(pending.issued.elapsed().as_millis() as u64),
            request_body: pending.request_body,
            response: None,
            response_text: None,
            error: None,
        };

        match outcome {
            Outcome::Success { status, body } => {
                call.status = Some(status);
                match body {
                    Some(bytes) => match String::from_utf8(bytes) {
                        Ok(text) => match serde_json::from_str::<Value>(&text) {
                            Ok(json) => call.response = Some(json),
                            Err(_) => {
                                call.response_text =
                                    Some(preview(&text, self.sanitize_cfg.max_text));
                            }
                        },
                        Err(_) => call.response_text = Some(BINARY_SENTINEL.to_string()),
                    },
                    None => call.response_text = Some(String::new()),
                }
            }
            Outcome::Failure { error } => {
                call.duration_ms = None;
                call.error = Some(error);
            }
        }

        debug!(
            target: "capture-tap",
            seq = call.seq,
            url = %call.url,
            status = ?call.status,
            "captured call"
        );

        let recorded = {
            let mut buffer = self.buffer.lock();
            buffer.push(call.clone());
            buffer.len()
        };
        let _ = self.progress.send(CaptureProgress {
            recorded,
            pending: self.pending.len(),
            last_url: call.url,
        });
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn recorded_len(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Stop accepting completions; in-flight calls past this point are lost.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
    }

    /// Take the ordered buffer. Call after [`Recorder::seal`].
    pub fn drain(&self) -> Vec<CapturedCall> {
        std::mem::take(&mut *self.buffer.lock())
    }
}

/// Request bodies observed as text: structured JSON when it parses,
/// otherwise a bounded preview.
fn classify_text(text: &str, max_chars: usize) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(json) => json,
        Err(_) => Value::String(preview(text, max_chars)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> Recorder {
        Recorder::new(SanitizeConfig::default(), 16)
    }

    #[test]
    fn json_bodies_land_in_response() {
        let rec = recorder();
        let seq = rec.begin_direct("GET", "https://api.host/a", None);
        rec.complete(
            PendingKey::Direct(seq),
            Outcome::Success {
                status: 200,
                body: Some(br#"{"id":1}"#.to_vec()),
            },
        );
        let calls = rec.drain();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].status, Some(200));
        assert_eq!(calls[0].response, Some(serde_json::json!({"id": 1})));
        assert!(calls[0].response_text.is_none());
        assert!(calls[0].error.is_none());
    }

    #[test]
    fn non_json_bodies_become_bounded_previews() {
        let rec = recorder();
        let seq = rec.begin_direct("GET", "https://api.host/b", None);
        rec.complete(
            PendingKey::Direct(seq),
            Outcome::Success {
                status: 404,
                body: Some(b"not found".to_vec()),
            },
        );
        let calls = rec.drain();
        assert_eq!(calls[0].response_text.as_deref(), Some("not found"));
        assert!(calls[0].response.is_none());
    }

    #[test]
    fn invalid_utf8_bodies_become_binary_sentinel() {
        let rec = recorder();
        let seq = rec.begin_direct("GET", "https://api.host/c", None);
        rec.complete(
            PendingKey::Direct(seq),
            Outcome::Success {
                status: 200,
                body: Some(vec![0xff, 0xfe, 0x00]),
            },
        );
        let calls = rec.drain();
        assert_eq!(calls[0].response_text.as_deref(), Some(BINARY_SENTINEL));
    }

    #[test]
    fn failures_carry_error_only() {
        let rec = recorder();
        let seq = rec.begin_direct("GET", "https://api.host/d", None);
        rec.complete(
            PendingKey::Direct(seq),
            Outcome::Failure {
                error: "connection refused".into(),
            },
        );
        let calls = rec.drain();
        assert_eq!(calls[0].error.as_deref(), Some("connection refused"));
        assert!(calls[0].status.is_none());
        assert!(calls[0].response.is_none());
        assert!(calls[0].response_text.is_none());
    }

    #[test]
    fn completions_after_seal_are_dropped() {
        let rec = recorder();
        let seq = rec.begin_direct("GET", "https://api.host/e", None);
        rec.seal();
        rec.complete(
            PendingKey::Direct(seq),
            Outcome::Success {
                status: 200,
                body: None,
            },
        );
        assert_eq!(rec.recorded_len(), 0);
        assert_eq!(rec.pending_len(), 0);
    }

    #[test]
    fn a_call_is_never_recorded_twice() {
        let rec = recorder();
        let seq = rec.begin_direct("GET", "https://api.host/f", None);
        let outcome = Outcome::Success {
            status: 200,
            body: None,
        };
        rec.complete(PendingKey::Direct(seq), outcome.clone());
        rec.complete(PendingKey::Direct(seq), outcome);
        assert_eq!(rec.recorded_len(), 1);
    }

    #[test]
    fn sequence_ids_reflect_issuance_order() {
        let rec = recorder();
        let first = rec.begin_direct("GET", "https://api.host/1", None);
        let second = rec.begin_direct("GET", "https://api.host/2", None);
        assert!(second > first);
        // Complete out of order; buffer order is completion order.
        rec.complete(
            PendingKey::Direct(second),
            Outcome::Success {
                status: 200,
                body: None,
            },
        );
        rec.complete(
            PendingKey::Direct(first),
            Outcome::Success {
                status: 200,
                body: None,
            },
        );
        let calls = rec.drain();
        assert_eq!(calls[0].seq, second);
        assert_eq!(calls[1].seq, first);
    }
}
