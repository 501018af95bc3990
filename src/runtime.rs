//! Session and exporter wired together.

use capture_tap::{Interceptor, SessionConfig, SessionHandle, StateProvider, TapError};
use export_store::{deliver, ExportConfig, ExportError, ExportReport};

/// One capture session plus its delivery target.
///
/// Stopping through the runtime finalizes the session and delivers the
/// artifact in one step; the export runs exactly once because only the
/// first stop yields a snapshot.
pub struct CaptureRuntime {
    handle: SessionHandle,
    export: ExportConfig,
}

impl CaptureRuntime {
    pub fn start(session: SessionConfig, export: ExportConfig) -> Result<Self, TapError> {
        Ok(Self {
            handle: Interceptor::start(session)?,
            export,
        })
    }

    pub fn start_with(
        session: SessionConfig,
        export: ExportConfig,
        providers: Vec<Box<dyn StateProvider>>,
    ) -> Result<Self, TapError> {
        Ok(Self {
            handle: Interceptor::start_with(session, providers)?,
            export,
        })
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Stop the session and deliver the artifact. `Ok(None)` when the
    /// session was already finalized by an earlier stop or the timer.
    pub async fn stop(&self) -> Result<Option<ExportReport>, ExportError> {
        match self.handle.stop().await {
            Some(snapshot) => deliver(&snapshot, &self.export).map(Some),
            None => Ok(None),
        }
    }

    /// Await the session window (or an explicit stop), then deliver.
    pub async fn wait(&self) -> Result<Option<ExportReport>, ExportError> {
        match self.handle.wait().await {
            Some(snapshot) => deliver(&snapshot, &self.export).map(Some),
            None => Ok(None),
        }
    }
}
