//! Route tree builder.
//!
//! Walks a controller's declarations, recursing into mounted
//! sub-controllers, and compiles every slot binding through the shared
//! [`SchemaCompiler`]. Each controller is instantiated once; its handlers
//! are bound to that instance.

use std::any::TypeId;
use std::sync::Arc;

use axum::http::Method;

use super::controller::{Controller, RouteKind, SlotDecl};
use super::node::{
    BoundSchema, Handler, LeafNode, MountNode, ResponseBinding, RouteNode, SlotBinding,
    SlotBindings,
};
use crate::dispatch::RequestView;
use crate::error::ConfigError;
use crate::schema::{ModelRef, SchemaCompiler, SchemaRegistry};

const SUPPORTED_METHODS: [Method; 8] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
    Method::TRACE,
];

/// Builds route trees over one compiler session.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    compiler: SchemaCompiler,
    mounts: Vec<(TypeId, &'static str)>,
}

impl TreeBuilder {
    /// Creates a builder with an empty compiler session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the route nodes of `C`, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a route uses an unsupported method or
    /// a malformed path, when a bound model cannot be synthesized, or when
    /// `C` is mounted inside itself.
    pub fn build<C: Controller>(&mut self) -> Result<Vec<RouteNode>, ConfigError> {
        let type_id = TypeId::of::<C>();
        if self.mounts.iter().any(|(id, _)| *id == type_id) {
            return Err(ConfigError::RecursiveMount {
                controller: C::name(),
            });
        }

        self.mounts.push((type_id, C::name()));
        let built = self.build_routes::<C>();
        self.mounts.pop();
        built
    }

    /// Schema compiler of this session.
    #[must_use]
    pub fn compiler(&self) -> &SchemaCompiler {
        &self.compiler
    }

    /// Ends the session and freezes the shared schema registry.
    #[must_use]
    pub fn finish(self) -> SchemaRegistry {
        self.compiler.finish()
    }

    fn build_routes<C: Controller>(&mut self) -> Result<Vec<RouteNode>, ConfigError> {
        let instance = Arc::new(C::default());
        let mut nodes = Vec::new();

        for route in C::routes() {
            match route.kind {
                RouteKind::Mount(target) => {
                    let children = (target.build)(self)?;
                    tracing::debug!(
                        controller = target.name,
                        prefix = %route.path,
                        parent = C::name(),
                        "controller mounted"
                    );
                    nodes.push(RouteNode::Mount(MountNode {
                        prefix: route.path,
                        controller: target.name,
                        children,
                    }));
                }
                RouteKind::Endpoint { method, handler } => {
                    if !SUPPORTED_METHODS.contains(&method) {
                        return Err(ConfigError::UnsupportedMethod {
                            method: method.to_string(),
                            path: route.path,
                        });
                    }
                    super::path::to_template(&route.path)?;

                    let slots = SlotBindings {
                        body: self.bind_slot(route.body)?,
                        query: self.bind_slot(route.query)?,
                        params: self.bind_slot(route.params)?,
                    };
                    let responses = route
                        .responses
                        .into_iter()
                        .map(|model| {
                            Ok(ResponseBinding {
                                schema: self.compiler.synthesize(&model)?,
                                model,
                            })
                        })
                        .collect::<Result<Vec<_>, ConfigError>>()?;

                    let bound: Handler = {
                        let instance = Arc::clone(&instance);
                        Arc::new(move |request: RequestView| handler(Arc::clone(&instance), request))
                    };

                    tracing::info!(
                        method = %method,
                        path = %route.path,
                        controller = C::name(),
                        "route registered"
                    );
                    nodes.push(RouteNode::Leaf(Arc::new(LeafNode {
                        method,
                        path: route.path,
                        controller: C::name(),
                        slots,
                        responses,
                        errors: route.errors,
                        auth: route.auth,
                        middlewares: route.middlewares,
                        meta: route.meta,
                        handler: bound,
                    })));
                }
            }
        }

        Ok(nodes)
    }

    fn bind_slot(&mut self, decl: Option<SlotDecl>) -> Result<Option<SlotBinding>, ConfigError> {
        let Some(decl) = decl else {
            return Ok(None);
        };
        let mut bound = decl
            .models
            .into_iter()
            .map(|model| self.bind_model(model))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        if decl.union {
            if bound.is_empty() {
                tracing::warn!("union slot declared without candidates; ignoring it");
                return Ok(None);
            }
            Ok(Some(SlotBinding::Union(bound)))
        } else {
            Ok(bound.pop().map(SlotBinding::Single))
        }
    }

    fn bind_model(&mut self, model: ModelRef) -> Result<BoundSchema, ConfigError> {
        Ok(BoundSchema {
            schema: self.compiler.synthesize(&model)?,
            model,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::route::node::Slot;
    use crate::testing::{
        ApiRoot, CreateItem, ItemController, LoopController, Marker, SubController,
        WeirdController,
    };

    fn leaves(nodes: &[RouteNode]) -> Vec<(&str, &str)> {
        nodes
            .iter()
            .filter_map(|node| match node {
                RouteNode::Leaf(leaf) => Some((leaf.method.as_str(), leaf.path.as_str())),
                RouteNode::Mount(_) => None,
            })
            .collect()
    }

    #[test]
    fn leaves_keep_declaration_order() {
        let mut builder = TreeBuilder::new();
        let Ok(nodes) = builder.build::<ItemController>() else {
            panic!("build failed");
        };
        assert_eq!(
            leaves(&nodes),
            [
                ("GET", "/items/:id"),
                ("POST", "/items"),
                ("POST", "/pets"),
                ("POST", "/private"),
                ("GET", "/raw"),
                ("POST", "/upload"),
            ]
        );
    }

    #[test]
    fn mounts_nest_children_under_prefix() {
        let mut builder = TreeBuilder::new();
        let Ok(nodes) = builder.build::<ApiRoot>() else {
            panic!("build failed");
        };
        let methods: Vec<&str> = nodes.iter().map(RouteNode::method).collect();
        assert_eq!(methods, ["GET", "GET", "mount"]);
        let Some(RouteNode::Mount(mount)) = nodes.get(2) else {
            panic!("expected a mount node");
        };
        assert_eq!(mount.prefix, "/sub");
        assert_eq!(mount.controller, "SubController");
        assert_eq!(mount.children.len(), SubController::ROUTE_COUNT);
    }

    #[test]
    fn slots_are_compiled_once_per_model() {
        let mut builder = TreeBuilder::new();
        let Ok(nodes) = builder.build::<ItemController>() else {
            panic!("build failed");
        };
        let Some(RouteNode::Leaf(create)) = nodes.get(1) else {
            panic!("expected create leaf");
        };
        let Some(SlotBinding::Single(body)) = create.slots.get(Slot::Body) else {
            panic!("expected single body binding");
        };
        assert!(body.schema.is_some());
        assert_eq!(body.model.type_id(), TypeId::of::<CreateItem>());
        assert!(builder.compiler().references(&ModelRef::of::<CreateItem>()) >= 1);

        let Some(RouteNode::Leaf(pets)) = nodes.get(2) else {
            panic!("expected pets leaf");
        };
        let Some(SlotBinding::Union(candidates)) = pets.slots.get(Slot::Body) else {
            panic!("expected union body binding");
        };
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn empty_marker_binds_without_schema() {
        let mut builder = TreeBuilder::new();
        let Ok(nodes) = builder.build::<ItemController>() else {
            panic!("build failed");
        };
        let Some(RouteNode::Leaf(raw)) = nodes.get(4) else {
            panic!("expected raw leaf");
        };
        let Some(SlotBinding::Single(query)) = raw.slots.get(Slot::Query) else {
            panic!("expected query binding");
        };
        assert_eq!(query.model.type_id(), TypeId::of::<Marker>());
        assert!(query.schema.is_none());
    }

    #[test]
    fn recursive_mount_is_rejected() {
        let mut builder = TreeBuilder::new();
        let result = builder.build::<LoopController>();
        assert!(matches!(
            result,
            Err(ConfigError::RecursiveMount {
                controller: "LoopController"
            })
        ));
    }

    #[test]
    fn unsupported_method_is_rejected() {
        let mut builder = TreeBuilder::new();
        let result = builder.build::<WeirdController>();
        assert!(matches!(result, Err(ConfigError::UnsupportedMethod { .. })));
    }
}
