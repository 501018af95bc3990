//! Export of finished capture sessions.
//!
//! Turns a [`capture_tap::SessionSnapshot`] into the stable artifact schema
//! downstream tools consume and delivers it as one atomically written JSON
//! file. The full-fidelity attempt includes ancillary page state serialized
//! exactly; when that fails the exporter falls back to the reduced schema
//! instead of losing the session.

pub mod api;
pub mod errors;
pub mod model;
pub mod writer;

pub use api::{deliver, ExportConfig, ExportReport};
pub use errors::{ExportErrKind, ExportError};
pub use model::{ApiCallRecord, ExportArtifact};
