use apitap_core_types::ApitapError;
use thiserror::Error;

/// Errors surfaced by the capture tap.
#[derive(Clone, Debug, Error)]
pub enum TapError {
    #[error("capture already active")]
    AlreadyActive,
    #[error("channel closed")]
    ChannelClosed,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TapError> for ApitapError {
    fn from(value: TapError) -> Self {
        ApitapError::new(value.to_string())
    }
}
