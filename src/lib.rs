//! Apitap library surface.
//!
//! Exposes the capture runtime (session + export wired together) and the
//! JSONL event-stream replay used by the `apitap` binary.

pub mod replay;
pub mod runtime;

pub use capture_tap::{Interceptor, SessionConfig, SessionHandle, WireEvent};
pub use export_store::{ExportConfig, ExportReport};
pub use runtime::CaptureRuntime;
