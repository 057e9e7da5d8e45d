//! Compiled route tree.
//!
//! The tree is built once at boot and never mutated afterwards. The router
//! sink and the document generator walk the same nodes.

use std::fmt;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use futures_util::future::BoxFuture;

use crate::dispatch::{AuthScheme, Middleware, Payload, RequestView};
use crate::error::{ApiError, HandlerError};
use crate::schema::{ClassSchema, Envelope, ModelRef};

/// Method name reserved for mount nodes.
pub const MOUNT_METHOD: &str = "mount";

/// Future returned by a bound handler.
pub type HandlerFuture = BoxFuture<'static, Result<Payload, HandlerError>>;

/// Handler bound to its live controller instance.
pub type Handler = Arc<dyn Fn(RequestView) -> HandlerFuture + Send + Sync>;

/// Request section a schema can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Request body.
    Body,
    /// Query string.
    Query,
    /// Path parameters.
    Params,
}

impl Slot {
    /// Validation order of the request slots.
    pub const ALL: [Slot; 3] = [Slot::Body, Slot::Query, Slot::Params];

    /// Lowercase name, also the overlay key of the slot.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Query => "query",
            Self::Params => "params",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A model bound to a slot together with its compiled schema.
///
/// `schema` is `None` when the model has no ruled field.
#[derive(Debug, Clone)]
pub struct BoundSchema {
    /// Originating model, used to instantiate the concrete type.
    pub model: ModelRef,
    /// Compiled schema.
    pub schema: Option<Arc<ClassSchema>>,
}

/// Schema binding of one request slot.
#[derive(Debug, Clone)]
pub enum SlotBinding {
    /// One schema.
    Single(BoundSchema),
    /// Ranked candidates; the first that parses wins.
    Union(Vec<BoundSchema>),
}

impl SlotBinding {
    /// Candidates in rank order. A single binding has exactly one.
    #[must_use]
    pub fn candidates(&self) -> &[BoundSchema] {
        match self {
            Self::Single(bound) => std::slice::from_ref(bound),
            Self::Union(candidates) => candidates,
        }
    }

    /// Declared content type of the binding, taken from the first candidate
    /// that declares one.
    #[must_use]
    pub fn content_type(&self) -> Option<&'static str> {
        self.candidates()
            .iter()
            .find_map(|bound| bound.model.content_type())
    }
}

/// Schema bindings of a leaf, one per request slot.
#[derive(Debug, Clone, Default)]
pub struct SlotBindings {
    /// Body binding.
    pub body: Option<SlotBinding>,
    /// Query binding.
    pub query: Option<SlotBinding>,
    /// Path parameter binding.
    pub params: Option<SlotBinding>,
}

impl SlotBindings {
    /// Binding of `slot`.
    #[must_use]
    pub fn get(&self, slot: Slot) -> Option<&SlotBinding> {
        match slot {
            Slot::Body => self.body.as_ref(),
            Slot::Query => self.query.as_ref(),
            Slot::Params => self.params.as_ref(),
        }
    }

    /// Returns `true` when at least one request slot is bound.
    #[must_use]
    pub fn any(&self) -> bool {
        Slot::ALL.iter().any(|slot| self.get(*slot).is_some())
    }
}

/// A declared response candidate.
#[derive(Debug, Clone)]
pub struct ResponseBinding {
    /// Response model.
    pub model: ModelRef,
    /// Compiled schema of the response data.
    pub schema: Option<Arc<ClassSchema>>,
}

impl ResponseBinding {
    /// Declared envelope, or `200 OK` when the model declares none.
    #[must_use]
    pub fn envelope(&self) -> Envelope {
        self.model.envelope().unwrap_or_default()
    }
}

/// Error type a route declares it may raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclaredError {
    /// HTTP status.
    pub status: StatusCode,
    /// Documented status message.
    pub message: &'static str,
    /// Error class name.
    pub name: &'static str,
}

impl DeclaredError {
    /// Status metadata of `E`.
    #[must_use]
    pub fn of<E: ApiError>() -> Self {
        Self {
            status: E::STATUS,
            message: E::STATUS_MESSAGE,
            name: E::name(),
        }
    }
}

/// Free-text documentation of a route.
#[derive(Debug, Clone, Default)]
pub struct RouteMeta {
    /// Short summary.
    pub summary: Option<String>,
    /// Long description.
    pub description: Option<String>,
    /// Explicit tags; empty means "use the controller name".
    pub tags: Vec<String>,
    /// Explicit operation id.
    pub operation_id: Option<String>,
}

/// An endpoint.
pub struct LeafNode {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the enclosing mount, with `:name` placeholders.
    pub path: String,
    /// Name of the declaring controller.
    pub controller: &'static str,
    /// Request slot bindings.
    pub slots: SlotBindings,
    /// Declared response candidates.
    pub responses: Vec<ResponseBinding>,
    /// Declared error types.
    pub errors: Vec<DeclaredError>,
    /// Auth schemes, run in order before anything else.
    pub auth: Vec<Arc<dyn AuthScheme>>,
    /// Non-auth middlewares, run in order after auth.
    pub middlewares: Vec<Arc<dyn Middleware>>,
    /// Documentation metadata.
    pub meta: RouteMeta,
    pub(crate) handler: Handler,
}

impl LeafNode {
    /// Tags of the operation: the declared ones or the controller name.
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        if self.meta.tags.is_empty() {
            vec![self.controller.to_string()]
        } else {
            self.meta.tags.clone()
        }
    }

    /// Invokes the bound handler.
    pub(crate) fn invoke(&self, view: RequestView) -> HandlerFuture {
        (self.handler)(view)
    }
}

impl fmt::Debug for LeafNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafNode")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("controller", &self.controller)
            .field("slots", &self.slots)
            .field("responses", &self.responses)
            .field("errors", &self.errors)
            .field(
                "auth",
                &self.auth.iter().map(|a| a.scheme_name()).collect::<Vec<_>>(),
            )
            .field("middlewares", &self.middlewares.len())
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// A sub-router: path prefix plus ordered children.
#[derive(Debug)]
pub struct MountNode {
    /// Prefix applied to every child.
    pub prefix: String,
    /// Name of the mounted controller.
    pub controller: &'static str,
    /// Children in declaration order.
    pub children: Vec<RouteNode>,
}

/// One entry of the compiled route tree.
#[derive(Debug)]
pub enum RouteNode {
    /// Sub-router.
    Mount(MountNode),
    /// Endpoint.
    Leaf(Arc<LeafNode>),
}

impl RouteNode {
    /// HTTP method of the node; mounts use [`MOUNT_METHOD`].
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Mount(_) => MOUNT_METHOD,
            Self::Leaf(leaf) => leaf.method.as_str(),
        }
    }
}

/// A leaf together with its fully prefixed path.
#[derive(Debug, Clone)]
pub struct Endpoint<'a> {
    /// Full path with `:name` placeholders.
    pub path: String,
    /// The leaf.
    pub leaf: &'a Arc<LeafNode>,
}

/// Flattens `nodes` depth-first in declaration order, joining mount
/// prefixes onto `prefix`.
#[must_use]
pub fn endpoints<'a>(nodes: &'a [RouteNode], prefix: &str) -> Vec<Endpoint<'a>> {
    let mut out = Vec::new();
    collect(nodes, prefix, &mut out);
    out
}

fn collect<'a>(nodes: &'a [RouteNode], prefix: &str, out: &mut Vec<Endpoint<'a>>) {
    for node in nodes {
        match node {
            RouteNode::Mount(mount) => {
                let nested = super::path::join(prefix, &mount.prefix);
                collect(&mount.children, &nested, out);
            }
            RouteNode::Leaf(leaf) => out.push(Endpoint {
                path: super::path::join(prefix, &leaf.path),
                leaf,
            }),
        }
    }
}
