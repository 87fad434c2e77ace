//! Side channel describing every request the client sends and every
//! response it receives.
//!
//! Records are handed to a `TraceObserver`. The default observer turns them
//! into `tracing` events; a UI can install its own to show the exchange.
//! Bearer credentials are redacted and response bodies truncated before a
//! record is built.

use tracing::{debug, warn};

use crate::http::{HttpRequest, HttpResponse};

/// Response bodies longer than this many characters are cut in records.
pub const MAX_TRACED_BODY_CHARS: usize = 2000;

const REDACTED: &str = "Bearer ***REDACTED***";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceRecord {
    Request {
        label: &'static str,
        method: &'static str,
        url: String,
        headers: Vec<(String, String)>,
        body: Option<String>,
    },
    Response {
        label: &'static str,
        status: u16,
        content_type: String,
        body: String,
    },
    Failure {
        label: &'static str,
        message: String,
    },
}

impl TraceRecord {
    pub fn request(label: &'static str, request: &HttpRequest) -> Self {
        let headers = request
            .headers
            .iter()
            .map(|(name, value)| {
                if name.eq_ignore_ascii_case("authorization") {
                    (name.clone(), REDACTED.to_string())
                } else {
                    (name.clone(), value.clone())
                }
            })
            .collect();
        TraceRecord::Request {
            label,
            method: request.method.as_str(),
            url: request.url.clone(),
            headers,
            body: request.body.clone(),
        }
    }

    pub fn response(label: &'static str, response: &HttpResponse) -> Self {
        TraceRecord::Response {
            label,
            status: response.status,
            content_type: response.content_type().to_string(),
            body: truncate_body(&response.body),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TraceRecord::Request { label, .. }
            | TraceRecord::Response { label, .. }
            | TraceRecord::Failure { label, .. } => label,
        }
    }
}

/// Keep the first `MAX_TRACED_BODY_CHARS` characters, marking the cut with `…`.
pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_TRACED_BODY_CHARS) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}

pub trait TraceObserver: Send + Sync {
    fn record(&self, record: &TraceRecord);
}

/// Emits each record as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TraceObserver for TracingObserver {
    fn record(&self, record: &TraceRecord) {
        match record {
            TraceRecord::Request { label, method, url, headers, body } => {
                debug!(label, method, url = %url, ?headers, body = body.as_deref().unwrap_or(""), "request");
            }
            TraceRecord::Response { label, status, content_type, body } => {
                debug!(label, status, content_type = %content_type, body = %body, "response");
            }
            TraceRecord::Failure { label, message } => {
                warn!(label, error = %message, "request failed");
            }
        }
    }
}

impl<F> TraceObserver for F
where
    F: Fn(&TraceRecord) + Send + Sync,
{
    fn record(&self, record: &TraceRecord) {
        self(record)
    }
}
