//! Event-based observation entry point.
//!
//! The lifecycle of one call arrives as discrete events carrying a caller
//! assigned correlation id: method and URL at `opened`, the request body at
//! `body_sent`, completion via `loaded` or `failed`. The shape matches an
//! XHR lifecycle or a DevTools-protocol network feed and serializes as
//! tagged JSON lines for replay.

use serde::{Deserialize, Serialize};

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WireEvent {
    Opened {
        id: u64,
        #[serde(default = "default_method")]
        method: String,
        url: String,
    },
    BodySent {
        id: u64,
        #[serde(default)]
        body: Option<String>,
    },
    Loaded {
        id: u64,
        status: u16,
        #[serde(default)]
        body: Option<String>,
    },
    Failed {
        id: u64,
        error: String,
    },
}
