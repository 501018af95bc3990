//! Transparent capture of outbound HTTP calls.
//!
//! An [`Interceptor`] owns one process-wide capture session at a time. Two
//! observation entry points feed it: a wrapped request/response transport
//! ([`InterceptedTransport`], the awaited path) and an open/send/load/error
//! event stream ([`WireEvent`], the event-driven path). Both converge on one
//! completion notification inside the recorder, so filtering and
//! serialization stay transport-agnostic. Stopping the session restores
//! pass-through behavior exactly once and yields an immutable
//! [`SessionSnapshot`] for export.

pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod provider;
pub mod recorder;
pub mod session;
pub mod transport;
pub mod wire;

pub use config::SessionConfig;
pub use error::TapError;
pub use filter::UrlFilter;
pub use model::{CaptureProgress, CapturedCall, ProgressBus, TransportKind};
pub use provider::{ProviderError, StateProvider};
pub use session::{Interceptor, SessionHandle, SessionSnapshot};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, InterceptedTransport, TransportError,
};
pub use wire::WireEvent;
