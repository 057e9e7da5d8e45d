//! Route declarations and the compiled route tree.
//!
//! ```text
//! Controller::routes ──► TreeBuilder ──► Vec<RouteNode> ──┬──► axum::Router
//!                            │                            └──► API document
//!                            └──► SchemaRegistry
//! ```

pub mod builder;
pub mod controller;
pub mod node;
pub mod path;

use serde_json::Value;

pub use builder::TreeBuilder;
pub use controller::{Controller, Route};
pub use node::{
    BoundSchema, Endpoint, DeclaredError, Handler, HandlerFuture, LeafNode, MOUNT_METHOD, MountNode,
    ResponseBinding, RouteMeta, RouteNode, Slot, SlotBinding, SlotBindings,
};

use crate::config::ServerConfig;
use crate::error::ConfigError;
use crate::schema::SchemaRegistry;

/// Read-only output of a compilation: the route tree and the frozen shared
/// schema registry. Both the router and the document are derived from it.
#[derive(Debug)]
pub struct CompiledApi {
    tree: Vec<RouteNode>,
    registry: SchemaRegistry,
}

impl CompiledApi {
    /// Builds the route tree rooted at `Root`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] met while building. The tree is
    /// not usable in that case.
    pub fn compile<Root: Controller>() -> Result<Self, ConfigError> {
        let mut builder = TreeBuilder::new();
        let tree = builder.build::<Root>()?;
        let registry = builder.finish();
        tracing::info!(
            root = Root::name(),
            shared_schemas = registry.len(),
            "route tree compiled"
        );
        Ok(Self { tree, registry })
    }

    /// Root nodes of the tree.
    #[must_use]
    pub fn tree(&self) -> &[RouteNode] {
        &self.tree
    }

    /// Shared schema registry.
    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Every leaf with its full path under `prefix`.
    #[must_use]
    pub fn endpoints(&self, prefix: &str) -> Vec<Endpoint<'_>> {
        node::endpoints(&self.tree, prefix)
    }

    /// Request-handling router serving every leaf under
    /// `config.api_prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPath`] or
    /// [`ConfigError::UnsupportedMethod`] when a route cannot be registered.
    pub fn router(&self, config: &ServerConfig) -> Result<axum::Router, ConfigError> {
        crate::dispatch::router::into_router(self, config)
    }

    /// API document: `base` with every operation merged into its `paths`
    /// and the shared schemas and security schemes into its `components`.
    #[must_use]
    pub fn document(&self, base: Value, prefix: &str) -> Value {
        crate::docs::generate(&self.tree, &self.registry, base, prefix)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::testing::ApiRoot;

    #[test]
    fn endpoints_carry_full_paths() {
        let Ok(api) = CompiledApi::compile::<ApiRoot>() else {
            panic!("compile failed");
        };
        let paths: Vec<String> = api
            .endpoints("/api")
            .into_iter()
            .map(|e| format!("{} {}", e.leaf.method, e.path))
            .collect();
        assert_eq!(
            paths,
            [
                "GET /api/status",
                "GET /api/version",
                "GET /api/sub/items/:id",
                "GET /api/sub/items",
            ]
        );
    }
}
