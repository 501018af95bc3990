//! Direct-call observation entry point.
//!
//! [`InterceptedTransport`] wraps any [`HttpTransport`] and is a strict
//! observer: every call still reaches the real transport and the real result
//! is returned unchanged; capture reads a duplicate of the response body.

use std::sync::Arc;

use async_trait::async_trait;
use safe_json::Dynamic;
use thiserror::Error;

use crate::recorder::{Outcome, PendingKey};
use crate::session::SessionInner;

#[derive(Clone, Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectFailed(String),
    #[error("io failure: {0}")]
    Io(String),
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// An outbound request as handed over by the observed caller. The body is a
/// runtime value; encoding it for the wire is the inner transport's concern.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub body: Option<Dynamic>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>, body: Option<Dynamic>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            body,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url, None)
    }

    pub fn post(url: impl Into<String>, body: Dynamic) -> Self {
        Self::new("POST", url, Some(body))
    }
}

#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self::new(status, body.as_bytes().to_vec())
    }
}

/// The async "issue request, await response" boundary.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Observer wrapper around a real transport.
pub struct InterceptedTransport {
    session: Arc<SessionInner>,
    inner: Arc<dyn HttpTransport>,
}

impl InterceptedTransport {
    pub(crate) fn new(session: Arc<SessionInner>, inner: Arc<dyn HttpTransport>) -> Self {
        Self { session, inner }
    }
}

#[async_trait]
impl HttpTransport for InterceptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if !self.session.observing() || !self.session.filter_matches(&request.url) {
            return self.inner.execute(request).await;
        }

        let seq = self.session.recorder().begin_direct(
            &request.method,
            &request.url,
            request.body.as_ref(),
        );
        let result = self.inner.execute(request).await;
        match &result {
            Ok(response) => {
                // Duplicate the body for capture; the caller consumes the
                // original untouched.
                self.session.recorder().complete(
                    PendingKey::Direct(seq),
                    Outcome::Success {
                        status: response.status,
                        body: Some(response.body.clone()),
                    },
                );
            }
            Err(err) => {
                self.session.recorder().complete(
                    PendingKey::Direct(seq),
                    Outcome::Failure {
                        error: err.to_string(),
                    },
                );
            }
        }
        result
    }
}
