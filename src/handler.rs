//! Handler and endpoint traits, and type erasure.
//!
//! # Two levels
//!
//! An [`Endpoint`] is the writer-level interface: it receives the request and
//! a `&mut dyn ResponseWriter` and writes whatever it likes. Routers,
//! middleware, and protocol upgrades live at this level.
//!
//! A [`Handler`] is the value-level convenience: any `async fn` that takes a
//! [`Request`] and returns `impl IntoResponse`. Every handler is turned into
//! an endpoint when it is registered:
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ router.on(Method::GET, "/", hello)
//! hello.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                       ← stored as BoxedEndpoint
//!        ↓
//! endpoint.call(&mut writer, req)  at request time ← one vtable dispatch
//!        ↓
//! hello(req).await.into_response().write_to(writer)
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::StatusCode;
use tracing::error;

use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::writer::ResponseWriter;

/// A heap-allocated, type-erased future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A shared, type-erased endpoint.
pub type BoxedEndpoint = Arc<dyn Endpoint>;

// ── Endpoint ──────────────────────────────────────────────────────────────────

/// Serves one request by writing to a [`ResponseWriter`].
///
/// Implement this directly when you need the writer itself, e.g. to hijack
/// the connection for a protocol upgrade:
///
/// ```rust,no_run
/// use wiretap::{BoxFuture, Endpoint, Request, ResponseWriter};
/// use http::StatusCode;
///
/// struct Teapot;
///
/// impl Endpoint for Teapot {
///     fn call<'a>(&'a self, res: &'a mut dyn ResponseWriter, _req: Request) -> BoxFuture<'a, ()> {
///         Box::pin(async move {
///             res.write_header(StatusCode::IM_A_TEAPOT);
///             let _ = res.write(b"short and stout");
///         })
///     }
/// }
/// ```
pub trait Endpoint: Send + Sync + 'static {
    fn call<'a>(&'a self, res: &'a mut dyn ResponseWriter, req: Request) -> BoxFuture<'a, ()>;
}

impl<E: Endpoint + ?Sized> Endpoint for Arc<E> {
    fn call<'a>(&'a self, res: &'a mut dyn ResponseWriter, req: Request) -> BoxFuture<'a, ()> {
        (**self).call(res, req)
    }
}

impl<E: Endpoint + ?Sized> Endpoint for Box<E> {
    fn call<'a>(&'a self, res: &'a mut dyn ResponseWriter, req: Request) -> BoxFuture<'a, ()> {
        (**self).call(res, req)
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// The trait is sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedEndpoint;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedEndpoint {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Bridges a value-returning handler to the writer-level [`Endpoint`].
struct FnHandler<F>(F);

impl<F, Fut, R> Endpoint for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call<'a>(&'a self, res: &'a mut dyn ResponseWriter, req: Request) -> BoxFuture<'a, ()> {
        if !req.body_complete() {
            return Box::pin(async move {
                if let Err(e) = Response::status(StatusCode::BAD_REQUEST).write_to(res) {
                    error!("failed to write response: {e}");
                }
            });
        }
        let fut = (self.0)(req);
        Box::pin(async move {
            if let Err(e) = fut.await.into_response().write_to(res) {
                error!("failed to write response: {e}");
            }
        })
    }
}
