//! Extension point supplying ancillary application state at session stop.

use safe_json::Dynamic;
use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum ProviderError {
    #[error("state unavailable: {0}")]
    Unavailable(String),
    #[error("access denied")]
    AccessDenied,
}

/// Supplies one named chunk of already-validated ambient state.
///
/// Providers run exactly once, when the session is finalized. A failing
/// provider contributes an error note under its name instead of aborting
/// the export.
pub trait StateProvider: Send + Sync {
    fn name(&self) -> &str;
    fn collect(&self) -> Result<Dynamic, ProviderError>;
}
