//! Controller contract and the per-route declaration builder.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::http::Method;

use super::builder::TreeBuilder;
use super::node::{DeclaredError, HandlerFuture, RouteMeta, RouteNode};
use crate::dispatch::{AuthScheme, Middleware, Payload, RequestView};
use crate::error::{ApiError, ConfigError, HandlerError};
use crate::schema::{Model, ModelRef, short_type_name};

/// A set of routes sharing one live instance.
///
/// ```
/// use std::sync::Arc;
///
/// use declaro::dispatch::{Payload, RequestView};
/// use declaro::error::HandlerError;
/// use declaro::route::{Controller, Route};
///
/// #[derive(Default)]
/// struct Ping;
///
/// impl Ping {
///     async fn ping(self: Arc<Self>, _req: RequestView) -> Result<Payload, HandlerError> {
///         Ok(Payload::json(serde_json::json!({"pong": true})))
///     }
/// }
///
/// impl Controller for Ping {
///     fn routes() -> Vec<Route<Self>> {
///         vec![Route::get("/ping", Self::ping).summary("Liveness probe")]
///     }
/// }
/// ```
pub trait Controller: Default + Send + Sync + 'static {
    /// Routes in declaration order.
    fn routes() -> Vec<Route<Self>>;

    /// Display name, used as the default tag of the routes.
    fn name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }
}

pub(crate) type UnboundHandler<C> =
    Arc<dyn Fn(Arc<C>, RequestView) -> HandlerFuture + Send + Sync>;

/// Declared request slot: one model or ranked candidates.
#[derive(Debug, Clone)]
pub(crate) struct SlotDecl {
    pub(crate) models: Vec<ModelRef>,
    pub(crate) union: bool,
}

impl SlotDecl {
    fn single(model: ModelRef) -> Self {
        Self {
            models: vec![model],
            union: false,
        }
    }

    fn union(models: Vec<ModelRef>) -> Self {
        Self {
            models,
            union: true,
        }
    }
}

/// Sub-controller referenced by a mount directive.
#[derive(Clone, Copy)]
pub(crate) struct MountTarget {
    pub(crate) name: &'static str,
    pub(crate) build: fn(&mut TreeBuilder) -> Result<Vec<RouteNode>, ConfigError>,
}

pub(crate) enum RouteKind<C> {
    Endpoint {
        method: Method,
        handler: UnboundHandler<C>,
    },
    Mount(MountTarget),
}

/// Declaration of one route of controller `C`.
///
/// Built with the method constructors ([`Route::get`], [`Route::post`], ...)
/// or [`Route::mount`], then refined with the slot and documentation
/// setters.
pub struct Route<C> {
    pub(crate) kind: RouteKind<C>,
    pub(crate) path: String,
    pub(crate) body: Option<SlotDecl>,
    pub(crate) query: Option<SlotDecl>,
    pub(crate) params: Option<SlotDecl>,
    pub(crate) responses: Vec<ModelRef>,
    pub(crate) errors: Vec<DeclaredError>,
    pub(crate) auth: Vec<Arc<dyn AuthScheme>>,
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
    pub(crate) meta: RouteMeta,
}

impl<C: Controller> Route<C> {
    fn with_kind(kind: RouteKind<C>, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            body: None,
            query: None,
            params: None,
            responses: Vec::new(),
            errors: Vec::new(),
            auth: Vec::new(),
            middlewares: Vec::new(),
            meta: RouteMeta::default(),
        }
    }

    /// Route for an arbitrary method. Methods the router cannot serve are
    /// rejected when the tree is built.
    pub fn new<F, Fut>(method: Method, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<C>, RequestView) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload, HandlerError>> + Send + 'static,
    {
        let handler: UnboundHandler<C> =
            Arc::new(move |controller: Arc<C>, request: RequestView| -> HandlerFuture {
                Box::pin(handler(controller, request))
            });
        Self::with_kind(RouteKind::Endpoint { method, handler }, path)
    }

    /// `GET` route.
    pub fn get<F, Fut>(path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<C>, RequestView) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload, HandlerError>> + Send + 'static,
    {
        Self::new(Method::GET, path, handler)
    }

    /// `POST` route.
    pub fn post<F, Fut>(path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<C>, RequestView) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload, HandlerError>> + Send + 'static,
    {
        Self::new(Method::POST, path, handler)
    }

    /// `PUT` route.
    pub fn put<F, Fut>(path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<C>, RequestView) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload, HandlerError>> + Send + 'static,
    {
        Self::new(Method::PUT, path, handler)
    }

    /// `PATCH` route.
    pub fn patch<F, Fut>(path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<C>, RequestView) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload, HandlerError>> + Send + 'static,
    {
        Self::new(Method::PATCH, path, handler)
    }

    /// `DELETE` route.
    pub fn delete<F, Fut>(path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<C>, RequestView) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload, HandlerError>> + Send + 'static,
    {
        Self::new(Method::DELETE, path, handler)
    }

    /// `HEAD` route.
    pub fn head<F, Fut>(path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<C>, RequestView) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload, HandlerError>> + Send + 'static,
    {
        Self::new(Method::HEAD, path, handler)
    }

    /// `OPTIONS` route.
    pub fn options<F, Fut>(path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<C>, RequestView) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload, HandlerError>> + Send + 'static,
    {
        Self::new(Method::OPTIONS, path, handler)
    }

    /// `TRACE` route.
    pub fn trace<F, Fut>(path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<C>, RequestView) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload, HandlerError>> + Send + 'static,
    {
        Self::new(Method::TRACE, path, handler)
    }

    /// Mounts the routes of `S` under `prefix`.
    pub fn mount<S: Controller>(prefix: impl Into<String>) -> Self {
        let target = MountTarget {
            name: S::name(),
            build: TreeBuilder::build::<S>,
        };
        Self::with_kind(RouteKind::Mount(target), prefix)
    }

    /// Binds the body to `T`.
    #[must_use]
    pub fn body<T: Model>(mut self) -> Self {
        self.body = Some(SlotDecl::single(ModelRef::of::<T>()));
        self
    }

    /// Binds the body to the first of `candidates` that parses.
    #[must_use]
    pub fn body_one_of(mut self, candidates: Vec<ModelRef>) -> Self {
        self.body = Some(SlotDecl::union(candidates));
        self
    }

    /// Binds the query string to `T`.
    #[must_use]
    pub fn query<T: Model>(mut self) -> Self {
        self.query = Some(SlotDecl::single(ModelRef::of::<T>()));
        self
    }

    /// Binds the query string to the first of `candidates` that parses.
    #[must_use]
    pub fn query_one_of(mut self, candidates: Vec<ModelRef>) -> Self {
        self.query = Some(SlotDecl::union(candidates));
        self
    }

    /// Binds the path parameters to `T`.
    #[must_use]
    pub fn params<T: Model>(mut self) -> Self {
        self.params = Some(SlotDecl::single(ModelRef::of::<T>()));
        self
    }

    /// Declares a response candidate. May be called more than once.
    #[must_use]
    pub fn response<T: Model>(mut self) -> Self {
        self.responses.push(ModelRef::of::<T>());
        self
    }

    /// Declares an error type the handler may raise.
    #[must_use]
    pub fn error<E: ApiError>(mut self) -> Self {
        self.errors.push(DeclaredError::of::<E>());
        self
    }

    /// Appends an auth scheme.
    #[must_use]
    pub fn auth(mut self, scheme: Arc<dyn AuthScheme>) -> Self {
        self.auth.push(scheme);
        self
    }

    /// Appends a middleware.
    #[must_use]
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Sets the summary.
    #[must_use]
    pub fn summary(mut self, text: impl Into<String>) -> Self {
        self.meta.summary = Some(text.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.meta.description = Some(text.into());
        self
    }

    /// Adds a tag. Routes without tags use the controller name.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.meta.tags.push(tag.into());
        self
    }

    /// Sets the operation id.
    #[must_use]
    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.meta.operation_id = Some(id.into());
        self
    }
}

impl<C> fmt::Debug for Route<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = match &self.kind {
            RouteKind::Endpoint { method, .. } => method.as_str(),
            RouteKind::Mount(_) => super::node::MOUNT_METHOD,
        };
        f.debug_struct("Route")
            .field("method", &method)
            .field("path", &self.path)
            .field("body", &self.body)
            .field("query", &self.query)
            .field("params", &self.params)
            .field("responses", &self.responses)
            .field("errors", &self.errors)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}
