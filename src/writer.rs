//! The response-writer capability set.
//!
//! Handlers that return a [`Response`](crate::Response) never see a writer:
//! the framework writes the value for them. Writer-level code (middleware,
//! [`Endpoint`](crate::Endpoint) implementations, protocol upgrades) talks to
//! a [`ResponseWriter`] directly:
//!
//! ```text
//! headers_mut()   ← mutate response headers before they are sent
//! write_header()  ← set the status code (last call wins)
//! write()         ← append body bytes
//! hijacker()      ← probe for the optional hijack capability
//! ```
//!
//! Hijacking hands the raw connection to the caller. With hyper the
//! connection only becomes available once the `101 Switching Protocols`
//! response has gone out, so [`Hijacker::hijack`] returns an [`Upgrade`]
//! future rather than the connection itself. Await it from a spawned task.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::error::Error;
use crate::handler::BoxFuture;

// ── Traits ────────────────────────────────────────────────────────────────────

/// Sends headers, a status code, and body bytes back to the client.
pub trait ResponseWriter: Send {
    /// The header map that will be sent with the response.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Appends `buf` to the response body and returns the number of bytes
    /// accepted.
    fn write(&mut self, buf: &[u8]) -> Result<usize, Error>;

    /// Sets the response status code.
    fn write_header(&mut self, status: StatusCode);

    /// Returns the hijack capability if this writer has one.
    fn hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        None
    }
}

/// Takes raw ownership of the underlying connection.
pub trait Hijacker: Send {
    fn hijack(&mut self) -> Result<Upgrade, Error>;
}

// ── Connection ────────────────────────────────────────────────────────────────

/// Any bidirectional byte stream a hijacked connection can be backed by.
pub trait Io: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Io for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// A hijacked connection. The HTTP layer no longer reads from or writes to it.
pub struct Connection {
    io: Box<dyn Io>,
}

impl Connection {
    pub fn new(io: impl Io + 'static) -> Self {
        Self { io: Box::new(io) }
    }
}

impl AsyncRead for Connection {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.io).poll_read(cx, buf)
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut *self.io).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.io).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.io).poll_shutdown(cx)
    }
}

// ── Upgrade ───────────────────────────────────────────────────────────────────

/// Resolves to the hijacked [`Connection`] once the writer releases it.
pub struct Upgrade(BoxFuture<'static, Result<Connection, Error>>);

impl Upgrade {
    pub fn new<F>(fut: F) -> Self
    where
        F: Future<Output = Result<Connection, Error>> + Send + 'static,
    {
        Self(Box::pin(fut))
    }

    /// An upgrade whose connection is available immediately.
    pub fn ready(conn: Connection) -> Self {
        Self::new(std::future::ready(Ok(conn)))
    }
}

impl From<OnUpgrade> for Upgrade {
    fn from(on_upgrade: OnUpgrade) -> Self {
        Self::new(async move {
            let upgraded = on_upgrade.await?;
            Ok(Connection::new(TokioIo::new(upgraded)))
        })
    }
}

impl Future for Upgrade {
    type Output = Result<Connection, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.0.as_mut().poll(cx)
    }
}

// ── BufferedWriter ────────────────────────────────────────────────────────────

enum UpgradeState {
    Unsupported,
    Pending(OnUpgrade),
    Taken,
}

/// The writer the server hands to every request.
///
/// Headers, status, and body are buffered and become a single hyper response
/// once the endpoint returns. Hijacking is available only when hyper attached
/// an upgrade handle to the request (HTTP/1.1 `Upgrade:` or `CONNECT`). After
/// a hijack, body writes fail with [`Error::Hijacked`].
pub struct BufferedWriter {
    headers: HeaderMap,
    status: StatusCode,
    body: BytesMut,
    upgrade: UpgradeState,
}

impl BufferedWriter {
    pub fn new() -> Self {
        Self {
            headers: HeaderMap::new(),
            status: StatusCode::OK,
            body: BytesMut::new(),
            upgrade: UpgradeState::Unsupported,
        }
    }

    pub(crate) fn upgradeable(on_upgrade: OnUpgrade) -> Self {
        Self { upgrade: UpgradeState::Pending(on_upgrade), ..Self::new() }
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl Default for BufferedWriter {
    fn default() -> Self { Self::new() }
}

impl ResponseWriter for BufferedWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        if matches!(self.upgrade, UpgradeState::Taken) {
            return Err(Error::Hijacked);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    // Still honoured after a hijack: the 101 that releases the connection
    // is only sent once the endpoint returns.
    fn write_header(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        if matches!(self.upgrade, UpgradeState::Unsupported) {
            None
        } else {
            Some(self)
        }
    }
}

impl Hijacker for BufferedWriter {
    fn hijack(&mut self) -> Result<Upgrade, Error> {
        match std::mem::replace(&mut self.upgrade, UpgradeState::Taken) {
            UpgradeState::Pending(on_upgrade) => Ok(Upgrade::from(on_upgrade)),
            UpgradeState::Taken => Err(Error::AlreadyHijacked),
            UpgradeState::Unsupported => {
                self.upgrade = UpgradeState::Unsupported;
                Err(Error::Io(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "request did not ask for a protocol upgrade",
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;
    use http::HeaderValue;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn buffers_into_a_single_response() {
        let mut w = BufferedWriter::new();
        w.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        w.write_header(StatusCode::ACCEPTED);
        assert_eq!(w.write(b"hello ").unwrap(), 6);
        assert_eq!(w.write(b"world").unwrap(), 5);

        let response = w.into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"hello world");
    }

    #[test]
    fn status_defaults_to_ok_and_last_write_wins() {
        let mut w = BufferedWriter::new();
        assert_eq!(w.status(), StatusCode::OK);
        w.write_header(StatusCode::NOT_FOUND);
        w.write_header(StatusCode::GONE);
        assert_eq!(w.status(), StatusCode::GONE);
    }

    #[test]
    fn plain_requests_cannot_be_hijacked() {
        let mut w = BufferedWriter::new();
        assert!(w.hijacker().is_none());
        let err = w.hijack().err().unwrap();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::Unsupported));
        // A failed attempt leaves the writer usable.
        assert_eq!(w.write(b"ok").unwrap(), 2);
    }

    #[test]
    fn hijack_is_taken_once_and_blocks_body_writes() {
        let on_upgrade = hyper::upgrade::on(&mut http::Request::new(()));
        let mut w = BufferedWriter::upgradeable(on_upgrade);
        w.write(b"before").unwrap();

        let hijacker = w.hijacker().expect("upgradeable writer offers hijack");
        assert!(hijacker.hijack().is_ok());

        assert!(matches!(w.write(b"after"), Err(Error::Hijacked)));
        assert!(matches!(w.hijack(), Err(Error::AlreadyHijacked)));
        w.write_header(StatusCode::SWITCHING_PROTOCOLS);
        assert_eq!(w.status(), StatusCode::SWITCHING_PROTOCOLS);
        assert_eq!(w.body(), b"before");
    }

    #[tokio::test]
    async fn connection_delegates_reads_and_writes() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (near, mut far) = tokio::io::duplex(64);
        let mut conn = Upgrade::ready(Connection::new(near)).await.unwrap();

        conn.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        far.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        far.write_all(b"pong").await.unwrap();
        conn.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");
    }
}
