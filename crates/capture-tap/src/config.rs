//! Configuration types for capture sessions.

use safe_json::SanitizeConfig;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Wall-clock bound on the session; the timer path of [`crate::SessionHandle::wait`].
    pub window_ms: u64,
    /// How long in-flight calls are awaited after the stop signal before the
    /// buffer is sealed.
    pub grace_ms: u64,
    /// URL fragments selecting in-scope calls; empty matches everything.
    pub filter: Vec<String>,
    /// Originating page address recorded in the export artifact.
    pub page_url: String,
    /// Bounds applied when serializing captured payloads.
    pub sanitize: SanitizeConfig,
    /// Capacity of the progress broadcast channel.
    pub progress_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_ms: 30_000,
            grace_ms: 2_000,
            filter: Vec::new(),
            page_url: String::new(),
            sanitize: SanitizeConfig::default(),
            progress_buffer: 64,
        }
    }
}
