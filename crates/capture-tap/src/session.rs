//! Session lifecycle: single-instance start, bounded window, idempotent stop.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use apitap_core_types::SessionId;
use chrono::{DateTime, Utc};
use safe_json::Dynamic;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::TapError;
use crate::filter::UrlFilter;
use crate::model::{CaptureProgress, CapturedCall};
use crate::provider::StateProvider;
use crate::recorder::{Outcome, PendingKey, Recorder};
use crate::transport::{HttpTransport, InterceptedTransport};
use crate::wire::WireEvent;

/// The two intercepted entry points are process-wide singletons; only one
/// session may hold them at a time.
static CAPTURE_SLOT: AtomicBool = AtomicBool::new(false);

const DRAIN_TICK_MS: u64 = 25;

/// Immutable view of a finished session, handed to the exporter.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    pub session: SessionId,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub page_url: String,
    pub calls: Vec<CapturedCall>,
    pub page_state: Vec<(String, Dynamic)>,
}

pub(crate) struct SessionInner {
    id: SessionId,
    config: SessionConfig,
    filter: UrlFilter,
    recorder: Recorder,
    cancel: CancellationToken,
    observing: AtomicBool,
    finalized: AtomicBool,
    slot_released: AtomicBool,
    started_at: DateTime<Utc>,
    providers: Vec<Box<dyn StateProvider>>,
}

impl SessionInner {
    pub(crate) fn observing(&self) -> bool {
        self.observing.load(Ordering::SeqCst)
    }

    pub(crate) fn filter_matches(&self, url: &str) -> bool {
        self.filter.matches(url)
    }

    pub(crate) fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    fn release_slot(&self) {
        if !self.slot_released.swap(true, Ordering::SeqCst) {
            CAPTURE_SLOT.store(false, Ordering::SeqCst);
        }
    }

    /// Restore pass-through behavior, drain in-flight calls within the grace
    /// window, then seal the buffer and build the snapshot. Runs at most once;
    /// later callers get `None`.
    async fn finalize(&self) -> Option<SessionSnapshot> {
        if self.finalized.swap(true, Ordering::SeqCst) {
            return None;
        }
        // New issuances stop here; in-flight completions are still accepted
        // until the grace window closes.
        self.observing.store(false, Ordering::SeqCst);

        let deadline = Instant::now() + Duration::from_millis(self.config.grace_ms);
        while self.recorder.pending_len() > 0 && Instant::now() < deadline {
            sleep(Duration::from_millis(DRAIN_TICK_MS)).await;
        }
        let abandoned = self.recorder.pending_len();
        self.recorder.seal();

        let stopped_at = Utc::now();
        let calls = self.recorder.drain();

        let mut page_state = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            match provider.collect() {
                Ok(value) => page_state.push((provider.name().to_string(), value)),
                Err(err) => {
                    warn!(
                        target: "capture-tap",
                        provider = provider.name(),
                        %err,
                        "state provider failed"
                    );
                    page_state.push((
                        provider.name().to_string(),
                        Dynamic::text(format!("[Provider Error: {err}]")),
                    ));
                }
            }
        }

        self.release_slot();

        let endpoints: BTreeSet<&str> = calls
            .iter()
            .map(|call| call.url.split('?').next().unwrap_or_default())
            .collect();
        info!(
            target: "capture-tap",
            session = %self.id,
            captured = calls.len(),
            endpoints = endpoints.len(),
            abandoned,
            "capture session finalized"
        );
        if abandoned > 0 {
            debug!(
                target: "capture-tap",
                session = %self.id,
                abandoned,
                "in-flight calls did not complete within the grace window"
            );
        }

        Some(SessionSnapshot {
            session: self.id.clone(),
            started_at: self.started_at,
            stopped_at,
            page_url: self.config.page_url.clone(),
            calls,
            page_state,
        })
    }
}

/// Owner of the intercepted entry points.
///
/// `start` claims the process-wide capture slot; a second `start` while a
/// session is active is rejected rather than silently re-wrapped.
pub struct Interceptor;

impl Interceptor {
    pub fn start(config: SessionConfig) -> Result<SessionHandle, TapError> {
        Self::start_with(config, Vec::new())
    }

    pub fn start_with(
        config: SessionConfig,
        providers: Vec<Box<dyn StateProvider>>,
    ) -> Result<SessionHandle, TapError> {
        if CAPTURE_SLOT.swap(true, Ordering::SeqCst) {
            return Err(TapError::AlreadyActive);
        }

        let id = SessionId::new();
        let filter = UrlFilter::new(config.filter.clone());
        let recorder = Recorder::new(config.sanitize, config.progress_buffer);
        info!(
            target: "capture-tap",
            session = %id,
            window_ms = config.window_ms,
            grace_ms = config.grace_ms,
            filter = ?config.filter,
            "capture session started"
        );

        let inner = Arc::new(SessionInner {
            id,
            config,
            filter,
            recorder,
            cancel: CancellationToken::new(),
            observing: AtomicBool::new(true),
            finalized: AtomicBool::new(false),
            slot_released: AtomicBool::new(false),
            started_at: Utc::now(),
            providers,
        });

        Ok(SessionHandle { inner })
    }
}

/// Handle for one active capture session.
///
/// Dropping the handle without stopping releases the capture slot and
/// restores pass-through behavior, discarding the buffer.
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

impl SessionHandle {
    /// Wrap a transport so calls through it are observed while the session
    /// is active. After stop, the wrapper forwards untouched.
    pub fn transport(&self, inner: Arc<dyn HttpTransport>) -> InterceptedTransport {
        InterceptedTransport::new(self.inner.clone(), inner)
    }

    /// Feed one lifecycle event from the event-based entry point.
    ///
    /// Issuance (`Opened`) requires an observing session; completions are
    /// still accepted during the grace window after stop.
    pub fn ingest(&self, event: WireEvent) {
        match event {
            WireEvent::Opened { id, method, url } => {
                if self.inner.observing() && self.inner.filter_matches(&url) {
                    self.inner.recorder.begin_event(id, method, url);
                }
            }
            WireEvent::BodySent { id, body } => {
                self.inner.recorder.attach_event_body(id, body.as_deref());
            }
            WireEvent::Loaded { id, status, body } => {
                self.inner.recorder.complete(
                    PendingKey::Event(id),
                    Outcome::Success {
                        status,
                        body: body.map(String::into_bytes),
                    },
                );
            }
            WireEvent::Failed { id, error } => {
                self.inner
                    .recorder
                    .complete(PendingKey::Event(id), Outcome::Failure { error });
            }
        }
    }

    pub fn subscribe_progress(&self) -> broadcast::Receiver<CaptureProgress> {
        self.inner.recorder.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.inner.observing()
    }

    /// Block until the window elapses or a stop signal arrives, then
    /// finalize. `None` when another caller finalized first.
    pub async fn wait(&self) -> Option<SessionSnapshot> {
        let window = Duration::from_millis(self.inner.config.window_ms);
        tokio::select! {
            _ = self.inner.cancel.cancelled() => {}
            _ = sleep(window) => {}
        }
        self.inner.finalize().await
    }

    /// Explicit stop signal. Idempotent: the first caller gets the snapshot,
    /// later calls get `None` and never fail.
    pub async fn stop(&self) -> Option<SessionSnapshot> {
        self.inner.cancel.cancel();
        self.inner.finalize().await
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.inner.observing.store(false, Ordering::SeqCst);
        self.inner.cancel.cancel();
        self.inner.release_slot();
    }
}
