//! Access logging.
//!
//! [`Logger`] times every request and emits one `INFO` event on the
//! `wiretap::access` target when the inner endpoint is done:
//!
//! ```text
//! [GET] /items/42 200 1.204ms
//! ```
//!
//! The status comes from a [`LoggedResponse`] that stands in for the real
//! writer and remembers the last status written through it. The line is
//! emitted from a drop guard, so it is written even when the inner endpoint
//! panics or its future is dropped mid-request.

use std::fmt;
use std::time::Duration;

use http::{HeaderMap, Method, StatusCode, Uri};
use tokio::time::Instant;
use tracing::info;

use crate::error::Error;
use crate::handler::{BoxFuture, Endpoint};
use crate::request::Request;
use crate::writer::{Hijacker, ResponseWriter, Upgrade};

// ── LoggedResponse ────────────────────────────────────────────────────────────

/// A [`ResponseWriter`] that forwards everything to the real writer and
/// records the status code.
///
/// `status` is `200 OK` until [`write_header`](ResponseWriter::write_header)
/// is called, and the last value written after that.
pub struct LoggedResponse<'a> {
    parent: &'a mut dyn ResponseWriter,
    status: StatusCode,
}

impl<'a> LoggedResponse<'a> {
    pub fn new(parent: &'a mut dyn ResponseWriter) -> Self {
        Self { parent, status: StatusCode::OK }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl ResponseWriter for LoggedResponse<'_> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.parent.headers_mut()
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        self.parent.write(buf)
    }

    fn write_header(&mut self, status: StatusCode) {
        self.status = status;
        self.parent.write_header(status);
    }

    fn hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        Some(self)
    }
}

impl Hijacker for LoggedResponse<'_> {
    /// Delegates to the real writer.
    ///
    /// # Panics
    ///
    /// Panics if the real writer cannot be hijacked. Only hijack when the
    /// underlying writer is known to support it.
    fn hijack(&mut self) -> Result<Upgrade, Error> {
        match self.parent.hijacker() {
            Some(hijacker) => hijacker.hijack(),
            None => panic!("response writer does not support hijacking"),
        }
    }
}

// ── Access ────────────────────────────────────────────────────────────────────

/// One access-log record. Its `Display` form is the logged line.
///
/// `uri` is the request target as the client wrote it on an HTTP/1.1 request
/// line: path and query, without scheme or authority.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Access {
    pub method: Method,
    pub uri: Uri,
    pub status: StatusCode,
    pub elapsed: Duration,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} {:?}",
            self.method,
            self.uri,
            self.status.as_u16(),
            self.elapsed
        )
    }
}

/// Path and query of `uri`. HTTP/2 requests arrive with an absolute URI;
/// only authority-form targets (`CONNECT host:port`) are kept whole.
fn request_target(uri: &Uri) -> Uri {
    match uri.path_and_query() {
        Some(pq) => Uri::from(pq.clone()),
        None => uri.clone(),
    }
}

/// Owns the wrapped writer for the duration of the request and logs on drop.
struct AccessGuard<'a> {
    method: Method,
    uri: Uri,
    started: Instant,
    response: LoggedResponse<'a>,
}

impl Drop for AccessGuard<'_> {
    fn drop(&mut self) {
        let access = Access {
            method: self.method.clone(),
            uri: self.uri.clone(),
            status: self.response.status(),
            elapsed: self.started.elapsed(),
        };
        info!(target: "wiretap::access", "{access}");
    }
}

// ── Logger ────────────────────────────────────────────────────────────────────

/// Access-logging middleware. Build with [`logger`].
pub struct Logger<E> {
    next: E,
}

/// Wraps `next` so every request it serves is logged.
pub fn logger<E: Endpoint>(next: E) -> Logger<E> {
    Logger { next }
}

impl<E: Endpoint> Endpoint for Logger<E> {
    fn call<'a>(&'a self, res: &'a mut dyn ResponseWriter, req: Request) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let response = LoggedResponse::new(res);
            let mut guard = AccessGuard {
                method: req.method().clone(),
                uri: request_target(req.uri()),
                started: Instant::now(),
                response,
            };
            self.next.call(&mut guard.response, req).await;
        })
    }
}
