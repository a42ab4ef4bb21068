//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri, Version};

/// An incoming HTTP request with its body already collected.
pub struct Request {
    parts: Parts,
    body: Bytes,
    body_complete: bool,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    pub(crate) fn from_parts(parts: Parts, body: Bytes) -> Self {
        Self { parts, body, body_complete: true, params: HashMap::new() }
    }

    /// A request whose body could not be read. It still travels through the
    /// endpoint chain so middleware sees it; [`Handler`](crate::Handler)s are
    /// not called and the client gets `400 Bad Request`.
    pub(crate) fn truncated(parts: Parts) -> Self {
        Self { body_complete: false, ..Self::from_parts(parts, Bytes::new()) }
    }

    pub fn method(&self) -> &Method { &self.parts.method }
    pub fn uri(&self) -> &Uri { &self.parts.uri }
    pub fn path(&self) -> &str { self.parts.uri.path() }
    pub fn version(&self) -> Version { self.parts.version }
    pub fn headers(&self) -> &HeaderMap { &self.parts.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// `false` when reading the body failed part-way (client reset, bad
    /// chunked framing). [`body`](Request::body) is then empty.
    pub fn body_complete(&self) -> bool { self.body_complete }

    /// Case-insensitive header lookup. Values that are not visible ASCII are
    /// treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name)?.to_str().ok()
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::from_parts(parts, body)
    }
}
