//! Schema layer: field rules, the descriptor registry, the synthesizer and
//! the runtime validator built from them.
//!
//! ```text
//! Model::describe ──► TypeDescriptors ──► SchemaCompiler ──► ClassSchema
//!                                              │                 │
//!                                              ▼                 ├──► parse (dispatch)
//!                                        SchemaRegistry ─────────┴──► JSON Schema (docs)
//! ```

pub mod descriptor;
pub mod error_tree;
pub mod json_schema;
pub mod rule;
pub mod synth;
pub mod validate;

pub use descriptor::{Envelope, FieldSet, Model, ModelRef, TypeDescriptors, short_type_name};
pub use error_tree::ErrorTree;
pub use rule::{FieldKind, FieldRule, Format, Nested, Primitive};
pub use synth::{ClassSchema, CompiledField, SchemaCompiler, SchemaRegistry, Shape};
