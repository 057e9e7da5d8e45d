//! # declaro
//!
//! Declarative API compiler on top of axum.
//!
//! Controllers declare their routes once: method, path, request slot
//! models, response models, error types and auth schemes. From those
//! declarations the crate derives both the live request router (with
//! per-route validation and authentication) and the OpenAPI document that
//! describes it, so the two can never drift apart.
//!
//! ## Architecture
//!
//! ```text
//! Model::describe ──► TypeDescriptors (schema/)
//!                          │
//! Controller::routes ──► TreeBuilder (route/) ──► SchemaCompiler (schema/)
//!                          │                            │
//!                          ▼                            ▼
//!                   Vec<RouteNode>               SchemaRegistry
//!                          │                            │
//!              ┌───────────┴──────────┐                 │
//!              ▼                      ▼                 │
//!      axum::Router (dispatch/)   OpenAPI (docs/) ◄─────┘
//! ```

pub mod api;
pub mod config;
pub mod dispatch;
pub mod docs;
pub mod error;
pub mod route;
pub mod schema;

#[cfg(test)]
pub(crate) mod testing;
