//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. You register a path, you
//! get a handler. A `Router` is itself an [`Endpoint`], so it can be wrapped
//! by middleware and handed to [`Server::serve`](crate::Server::serve).

use std::collections::HashMap;

use http::header::{HeaderValue, ALLOW};
use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;
use tracing::error;

use crate::handler::{BoxFuture, BoxedEndpoint, Endpoint, Handler};
use crate::request::Request;
use crate::response::Response;
use crate::writer::ResponseWriter;

/// The application router.
///
/// Build it once at startup. Each [`Router::on`] / [`Router::route`] call
/// returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedEndpoint>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use wiretap::{Request, Response, Router};
    /// # use http::Method;
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,  "/users/{id}", get_user)
    ///     .on(Method::POST, "/users",      create_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route pattern or conflicts with one
    /// already registered for `method`.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.add(method, path, handler.into_boxed_handler())
    }

    /// Register a writer-level [`Endpoint`], e.g. one that hijacks the
    /// connection. Same path syntax and panics as [`Router::on`].
    pub fn route(self, method: Method, path: &str, endpoint: impl Endpoint) -> Self {
        self.add(method, path, std::sync::Arc::new(endpoint))
    }

    fn add(mut self, method: Method, path: &str, endpoint: BoxedEndpoint) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, endpoint)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<(&BoxedEndpoint, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((matched.value, params))
    }

    /// Methods under which `path` is registered, sorted for a stable `allow` header.
    fn allowed(&self, path: &str) -> Vec<&str> {
        let mut methods: Vec<&str> = self.routes.iter()
            .filter(|(_, tree)| tree.at(path).is_ok())
            .map(|(method, _)| method.as_str())
            .collect();
        methods.sort_unstable();
        methods
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

impl Endpoint for Router {
    fn call<'a>(&'a self, res: &'a mut dyn ResponseWriter, mut req: Request) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if let Some((endpoint, params)) = self.lookup(req.method(), req.path()) {
                req.params = params;
                return endpoint.call(res, req).await;
            }

            let allowed = self.allowed(req.path());
            let response = if allowed.is_empty() {
                Response::status(StatusCode::NOT_FOUND)
            } else {
                if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
                    res.headers_mut().insert(ALLOW, value);
                }
                Response::status(StatusCode::METHOD_NOT_ALLOWED)
            };
            if let Err(e) = response.write_to(res) {
                error!("failed to write response: {e}");
            }
        })
    }
}
