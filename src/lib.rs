//! # wiretap
//!
//! Access logging for HTTP services, and the minimal hyper framework it
//! runs on.
//!
//! [`middleware::logger`] wraps any [`Endpoint`] and writes one line per
//! request once the endpoint is done:
//!
//! ```text
//! [GET] /items/42 200 1.204ms
//! ```
//!
//! The status comes from a [`middleware::LoggedResponse`] that sits between
//! the endpoint and the real [`ResponseWriter`]. It forwards headers, body
//! bytes, and the hijack capability untouched, so websocket-style upgrades
//! keep working behind the logger.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::{Method, StatusCode};
//! use wiretap::{middleware, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     let app = Router::new()
//!         .on(Method::GET,  "/users/{id}", get_user)
//!         .on(Method::POST, "/users",      create_user);
//!
//!     Server::bind("0.0.0.0:3000")
//!         .serve(middleware::logger(app))
//!         .await
//!         .unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes())
//! }
//!
//! async fn create_user(req: Request) -> Response {
//!     if req.body().is_empty() {
//!         return Response::status(StatusCode::BAD_REQUEST);
//!     }
//!     Response::builder()
//!         .status(StatusCode::CREATED)
//!         .header("location", "/users/99")
//!         .json(br#"{"id":"99"}"#.to_vec())
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;
mod writer;

pub mod middleware;

pub use error::Error;
pub use handler::{BoxFuture, BoxedEndpoint, Endpoint, Handler};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use writer::{BufferedWriter, Connection, Hijacker, Io, ResponseWriter, Upgrade};
