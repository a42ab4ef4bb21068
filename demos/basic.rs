//! Minimal wiretap demo — JSON endpoints, a 404 route, and an echo upgrade,
//! all behind the access logger.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl http://localhost:3000/ping
//!   curl -i -H 'Connection: upgrade' -H 'Upgrade: echo' http://localhost:3000/echo
//!
//! Each request prints a line such as `[GET] /users/42 200 48.3µs`.

use http::header::{HeaderValue, CONNECTION, UPGRADE};
use http::{Method, StatusCode, Version};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use wiretap::{middleware, BoxFuture, Endpoint, Request, Response, ResponseWriter, Router, Server};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = Router::new()
        .on(Method::GET,  "/users/{id}", get_user)
        .on(Method::POST, "/users",      create_user)
        .on(Method::GET,  "/ping",       ping)
        .route(Method::GET, "/echo", Echo);

    Server::bind("0.0.0.0:3000")
        .serve(middleware::logger(app))
        .await
        .expect("server error");
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#).into_bytes())
}

// POST /users
async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }
    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(br#"{"id":"99","name":"new_user"}"#.to_vec())
}

// GET /ping → 404, logged as such
async fn ping(_req: Request) -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}

// GET /echo with `Upgrade: echo` → 101, then echoes every byte until EOF.
struct Echo;

impl Endpoint for Echo {
    fn call<'a>(&'a self, res: &'a mut dyn ResponseWriter, req: Request) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            // Behind the logger, hijacking a writer that cannot be hijacked
            // panics, so only try when hyper will have offered an upgrade.
            let wants_echo = req.header("upgrade").is_some_and(|p| p.eq_ignore_ascii_case("echo"));
            if req.version() != Version::HTTP_11 || !wants_echo {
                res.headers_mut().insert(UPGRADE, HeaderValue::from_static("echo"));
                res.write_header(StatusCode::UPGRADE_REQUIRED);
                return;
            }

            res.headers_mut().insert(CONNECTION, HeaderValue::from_static("upgrade"));
            res.headers_mut().insert(UPGRADE, HeaderValue::from_static("echo"));
            res.write_header(StatusCode::SWITCHING_PROTOCOLS);

            let upgrade = match res.hijacker().map(|h| h.hijack()) {
                Some(Ok(upgrade)) => upgrade,
                Some(Err(e)) => {
                    tracing::warn!("hijack failed: {e}");
                    return;
                }
                None => return,
            };

            tokio::spawn(async move {
                let mut conn = match upgrade.await {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!("upgrade failed: {e}");
                        return;
                    }
                };
                let mut buf = [0u8; 1024];
                loop {
                    match conn.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if conn.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        })
    }
}
