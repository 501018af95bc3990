use thiserror::Error;

use apitap_core_types::ApitapError;

#[derive(Clone, Debug, Error)]
pub enum ExportErrKind {
    #[error("artifact serialization failed: {0}")]
    Serialize(String),
    #[error("io failure: {0}")]
    IoFailed(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Debug, Error)]
#[error(transparent)]
pub struct ExportError(pub ExportErrKind);

impl ExportError {
    pub fn new(kind: ExportErrKind) -> Self {
        Self(kind)
    }

    pub fn kind(&self) -> &ExportErrKind {
        &self.0
    }
}

impl From<ExportErrKind> for ExportError {
    fn from(kind: ExportErrKind) -> Self {
        ExportError(kind)
    }
}

impl From<ExportError> for ApitapError {
    fn from(value: ExportError) -> Self {
        ApitapError::new(value.to_string())
    }
}
