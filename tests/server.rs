//! End-to-end tests: a real server on an ephemeral port, raw HTTP/1.1 over TCP
//! plus one HTTP/2 client.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::header::{CONNECTION, HeaderValue, UPGRADE};
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Empty};
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing_subscriber::fmt::MakeWriter;
use wiretap::{middleware, BoxFuture, Endpoint, Error, Request, ResponseWriter, Router, Server};

// ── log capture ───────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Capture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Capture {
    fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .without_time()
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    fn access_lines(&self) -> Vec<String> {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf)
            .lines()
            .filter_map(|line| line.split_once("wiretap::access: ").map(|(_, msg)| msg.to_owned()))
            .collect()
    }
}

// ── app ───────────────────────────────────────────────────────────────────────

/// Writes 404 and then the body, through the writer.
struct Ping;

impl Endpoint for Ping {
    fn call<'a>(&'a self, res: &'a mut dyn ResponseWriter, _req: Request) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            res.write_header(StatusCode::NOT_FOUND);
            let _ = res.write(b"not found");
        })
    }
}

/// Switches to a protocol that echoes five bytes back.
struct Echo;

impl Endpoint for Echo {
    fn call<'a>(&'a self, res: &'a mut dyn ResponseWriter, _req: Request) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            res.headers_mut().insert(CONNECTION, HeaderValue::from_static("upgrade"));
            res.headers_mut().insert(UPGRADE, HeaderValue::from_static("echo"));
            res.write_header(StatusCode::SWITCHING_PROTOCOLS);

            let Some(hijacker) = res.hijacker() else { return };
            let Ok(upgrade) = hijacker.hijack() else { return };

            tokio::spawn(async move {
                let Ok(mut conn) = upgrade.await else { return };
                let mut buf = [0u8; 5];
                if conn.read_exact(&mut buf).await.is_ok() {
                    let _ = conn.write_all(&buf).await;
                    let _ = conn.flush().await;
                }
            });
        })
    }
}

async fn item(req: Request) -> String {
    format!("item {}", req.param("id").unwrap_or("?"))
}

fn app() -> impl Endpoint {
    middleware::logger(
        Router::new()
            .route(Method::GET, "/ping", Ping)
            .route(Method::GET, "/echo", Echo)
            .on(Method::GET, "/items/{id}", item),
    )
}

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), Error>>,
}

impl Running {
    async fn start(endpoint: impl Endpoint) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(
            Server::from_listener(listener).serve_with_shutdown(endpoint, async move {
                let _ = stopped.await;
            }),
        );
        Self { addr, stop, handle }
    }

    async fn shutdown(self) {
        let _ = self.stop.send(());
        self.handle.await.unwrap().unwrap();
    }
}

/// Sends a `Connection: close` GET and returns (status line, body).
async fn get(addr: SocketAddr, path: &str) -> (String, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let raw = String::from_utf8(raw).unwrap();
    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    let status_line = head.lines().next().unwrap().to_owned();
    (status_line, body.to_owned())
}

/// Reads up to and including the blank line that ends the response head.
async fn read_head(stream: &mut TcpStream) -> String {
    let mut head = Vec::new();
    while !head.ends_with(b"\r\n\r\n") {
        head.push(stream.read_u8().await.unwrap());
    }
    String::from_utf8(head).unwrap()
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ping_returns_404_and_is_logged() {
    let (capture, _guard) = Capture::install();
    let server = Running::start(app()).await;

    let (status_line, body) = get(server.addr, "/ping").await;
    assert_eq!(status_line, "HTTP/1.1 404 Not Found");
    assert_eq!(body, "not found");

    let lines = capture.access_lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("[GET] /ping 404 "), "{}", lines[0]);

    server.shutdown().await;
}

#[tokio::test]
async fn logged_url_keeps_the_query_string() {
    let (capture, _guard) = Capture::install();
    let server = Running::start(app()).await;

    let (status_line, body) = get(server.addr, "/items/42?verbose=1").await;
    assert_eq!(status_line, "HTTP/1.1 200 OK");
    assert_eq!(body, "item 42");

    let (status_line, _) = get(server.addr, "/missing").await;
    assert_eq!(status_line, "HTTP/1.1 404 Not Found");

    let lines = capture.access_lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("[GET] /items/42?verbose=1 200 "), "{}", lines[0]);
    assert!(lines[1].starts_with("[GET] /missing 404 "), "{}", lines[1]);

    server.shutdown().await;
}

#[tokio::test]
async fn upgrade_hijacks_through_the_logger() {
    let (capture, _guard) = Capture::install();
    let server = Running::start(app()).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"GET /echo HTTP/1.1\r\nHost: localhost\r\nConnection: upgrade\r\nUpgrade: echo\r\n\r\n")
        .await
        .unwrap();

    let head = read_head(&mut stream).await;
    assert!(head.starts_with("HTTP/1.1 101 Switching Protocols\r\n"), "{head}");

    stream.write_all(b"hello").await.unwrap();
    let mut echoed = [0u8; 5];
    stream.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, b"hello");

    let lines = capture.access_lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("[GET] /echo 101 "), "{}", lines[0]);

    drop(stream);
    server.shutdown().await;
}

#[tokio::test]
async fn http2_requests_log_path_and_query() {
    let (capture, _guard) = Capture::install();
    let server = Running::start(app()).await;

    let stream = TcpStream::connect(server.addr).await.unwrap();
    let (mut sender, conn) =
        hyper::client::conn::http2::handshake(TokioExecutor::new(), TokioIo::new(stream))
            .await
            .unwrap();
    let conn = tokio::spawn(conn);

    // HTTP/2 carries scheme and authority as pseudo-headers, so the server
    // sees an absolute URI.
    let request = http::Request::get(format!("http://{}/ping?x=1", server.addr))
        .body(Empty::<Bytes>::new())
        .unwrap();
    let response = sender.send_request(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"not found");

    drop(sender);
    let _ = conn.await;

    let lines = capture.access_lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("[GET] /ping?x=1 404 "), "{}", lines[0]);

    server.shutdown().await;
}
