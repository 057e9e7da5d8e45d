//! Non-auth route middlewares.
//!
//! A middleware sees the request and the route it matched, and may
//! contribute keys to the overlay. An error aborts the request.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::{Map, Value};

use super::request::RequestView;
use crate::error::HandlerError;
use crate::route::LeafNode;

/// Keys a middleware adds to the overlay.
pub type Contribution = Map<String, Value>;

/// A middleware declared on a route.
pub trait Middleware: Send + Sync + 'static {
    /// Runs the middleware. `Ok(None)` contributes nothing.
    fn apply<'a>(
        &'a self,
        request: &'a RequestView,
        route: &'a LeafNode,
    ) -> BoxFuture<'a, Result<Option<Contribution>, HandlerError>>;
}

/// Synchronous closure middleware, built by [`from_fn`].
pub struct FnMiddleware<F> {
    f: F,
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&RequestView, &LeafNode) -> Result<Option<Contribution>, HandlerError>
        + Send
        + Sync
        + 'static,
{
    fn apply<'a>(
        &'a self,
        request: &'a RequestView,
        route: &'a LeafNode,
    ) -> BoxFuture<'a, Result<Option<Contribution>, HandlerError>> {
        let result = (self.f)(request, route);
        Box::pin(async move { result })
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware").finish_non_exhaustive()
    }
}

/// Wraps a synchronous closure as a middleware.
pub fn from_fn<F>(f: F) -> Arc<dyn Middleware>
where
    F: Fn(&RequestView, &LeafNode) -> Result<Option<Contribution>, HandlerError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnMiddleware { f })
}
