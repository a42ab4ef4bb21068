//! Middleware layer.
//!
//! Middleware is an [`Endpoint`](crate::Endpoint) that wraps another
//! endpoint. It sees the request before the inner endpoint does and can
//! substitute its own [`ResponseWriter`](crate::ResponseWriter) to observe
//! what the inner endpoint writes. Since the wrapper is itself an endpoint,
//! middleware stacks by nesting:
//!
//! ```rust,no_run
//! use wiretap::{middleware, Router, Server};
//!
//! # async fn run() -> Result<(), wiretap::Error> {
//! let app = middleware::logger(Router::new());
//! Server::bind("0.0.0.0:3000").serve(app).await
//! # }
//! ```
//!
//! Built-in middleware:
//! - [`logger`] — one access line per request with method, URL, status, latency

mod logger;

pub use logger::{logger, Access, LoggedResponse, Logger};
