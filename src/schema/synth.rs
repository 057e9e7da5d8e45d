//! Schema synthesizer and the compiler session that caches its output.
//!
//! [`SchemaCompiler`] turns a [`ModelRef`] into an immutable [`ClassSchema`]
//! at most once per type. Every reference is counted; on the second one the
//! schema is promoted into the shared registry under its module-qualified
//! name so the document generator can emit `$ref`s. Promotion never changes
//! validation.
//!
//! The compiler is only mutated while the route tree is being built.
//! [`SchemaCompiler::finish`] freezes it into a read-only [`SchemaRegistry`].

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;

use super::descriptor::{ModelRef, TypeDescriptors};
use super::rule::{FieldRule, Nested, Primitive};
use crate::error::ConfigError;

/// Resolved target of a nested reference.
#[derive(Debug, Clone)]
pub enum Shape {
    /// Built-in primitive; needs no caching.
    Primitive(Primitive),
    /// Compiled model schema.
    Class(Arc<ClassSchema>),
}

/// One field of a compiled schema.
#[derive(Debug, Clone)]
pub struct CompiledField {
    /// Field name.
    pub name: String,
    /// Declared rule.
    pub rule: FieldRule,
    /// Resolved nested target for array and object rules.
    pub nested: Option<Shape>,
    /// Default copied from the model prototype.
    pub default: Option<Value>,
}

impl CompiledField {
    /// Whether a request must provide this field.
    #[must_use]
    pub fn is_required(&self) -> bool {
        !self.rule.is_optional() && self.default.is_none()
    }
}

/// Compiled structural schema of a model.
#[derive(Debug, Clone)]
pub struct ClassSchema {
    type_id: TypeId,
    name: String,
    fields: Vec<CompiledField>,
}

impl ClassSchema {
    /// Type identity of the model.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Module-qualified model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[CompiledField] {
        &self.fields
    }

    /// Field named `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&CompiledField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug)]
struct CacheEntry {
    schema: Option<Arc<ClassSchema>>,
    references: u32,
}

/// Compiler session: descriptor table, schema cache and promotion state.
#[derive(Debug, Default)]
pub struct SchemaCompiler {
    descriptors: TypeDescriptors,
    cache: HashMap<TypeId, CacheEntry>,
    in_progress: Vec<(TypeId, String)>,
    shared: BTreeMap<String, Arc<ClassSchema>>,
    shared_ids: HashSet<TypeId>,
}

impl SchemaCompiler {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Synthesizes the schema of `model`.
    ///
    /// Returns `None` when the model has no ruled field; a slot bound to it
    /// contributes nothing to validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RecursiveModel`] when the model reaches itself
    /// through nested fields, and [`ConfigError::Prototype`] when its
    /// prototype cannot be serialized into an object.
    pub fn synthesize(&mut self, model: &ModelRef) -> Result<Option<Arc<ClassSchema>>, ConfigError> {
        let type_id = model.type_id();

        if let Some(entry) = self.cache.get_mut(&type_id) {
            entry.references = entry.references.saturating_add(1);
            let schema = entry.schema.clone();
            if let Some(schema) = &schema
                && entry.references >= 2
            {
                self.promote(schema);
            }
            return Ok(schema);
        }

        if self.in_progress.iter().any(|(id, _)| *id == type_id) {
            let chain = self
                .in_progress
                .iter()
                .map(|(_, name)| name.as_str())
                .chain(std::iter::once(model.name()))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ConfigError::RecursiveModel {
                model: model.qualified_name(),
                chain,
            });
        }

        self.in_progress.push((type_id, model.name().to_string()));
        let built = self.build(model);
        self.in_progress.pop();
        let schema = built?;

        self.cache.insert(
            type_id,
            CacheEntry {
                schema: schema.clone(),
                references: 1,
            },
        );
        Ok(schema)
    }

    /// Resolves a nested reference. Empty models resolve to a free-form
    /// object.
    ///
    /// # Errors
    ///
    /// Propagates [`SchemaCompiler::synthesize`] errors.
    pub fn resolve(&mut self, nested: &Nested) -> Result<Shape, ConfigError> {
        match nested {
            Nested::Primitive(primitive) => Ok(Shape::Primitive(*primitive)),
            Nested::Model(model) => Ok(self
                .synthesize(model)?
                .map_or(Shape::Primitive(Primitive::Object), Shape::Class)),
        }
    }

    /// Number of references recorded for `model` so far.
    #[must_use]
    pub fn references(&self, model: &ModelRef) -> u32 {
        self.cache
            .get(&model.type_id())
            .map_or(0, |entry| entry.references)
    }

    /// Freezes the session into a read-only registry.
    #[must_use]
    pub fn finish(self) -> SchemaRegistry {
        tracing::debug!(shared = self.shared.len(), "schema registry frozen");
        SchemaRegistry {
            shared: self.shared,
            shared_ids: self.shared_ids,
        }
    }

    fn build(&mut self, model: &ModelRef) -> Result<Option<Arc<ClassSchema>>, ConfigError> {
        let fields = self.descriptors.describe(model).clone();
        if fields.is_empty() {
            return Ok(None);
        }

        let prototype = match model.prototype() {
            Ok(None) => serde_json::Map::new(),
            Ok(Some(Value::Object(map))) => map,
            Ok(Some(_)) => {
                return Err(ConfigError::PrototypeShape {
                    model: model.qualified_name(),
                });
            }
            Err(source) => {
                return Err(ConfigError::Prototype {
                    model: model.qualified_name(),
                    source,
                });
            }
        };

        let mut compiled = Vec::with_capacity(fields.len());
        for (name, rule) in fields.iter() {
            let nested = match rule.nested() {
                Some(target) => Some(self.resolve(target)?),
                None => None,
            };
            let default = prototype.get(name).filter(|v| !v.is_null()).cloned();
            compiled.push(CompiledField {
                name: name.to_string(),
                rule: rule.clone(),
                nested,
                default,
            });
        }

        Ok(Some(Arc::new(ClassSchema {
            type_id: model.type_id(),
            name: model.qualified_name(),
            fields: compiled,
        })))
    }

    fn promote(&mut self, schema: &Arc<ClassSchema>) {
        if self.shared_ids.contains(&schema.type_id) {
            return;
        }
        match self.shared.get(schema.name()) {
            Some(existing) if existing.type_id != schema.type_id => {
                tracing::warn!(
                    name = schema.name(),
                    "another model already shares this name; keeping schema inline"
                );
                // Mark as seen so the warning is not repeated.
                self.shared_ids.insert(schema.type_id);
            }
            _ => {
                tracing::debug!(name = schema.name(), "promoting schema to shared registry");
                self.shared.insert(schema.name().to_string(), Arc::clone(schema));
                self.shared_ids.insert(schema.type_id);
            }
        }
    }
}

/// Read-only registry of shared schemas, produced by
/// [`SchemaCompiler::finish`].
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    shared: BTreeMap<String, Arc<ClassSchema>>,
    shared_ids: HashSet<TypeId>,
}

impl SchemaRegistry {
    /// Shared name of `schema`, if it was promoted under its own name.
    #[must_use]
    pub fn shared_name<'a>(&self, schema: &'a ClassSchema) -> Option<&'a str> {
        self.shared
            .get(schema.name())
            .filter(|s| s.type_id == schema.type_id)
            .map(|_| schema.name())
    }

    /// Shared schema registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<ClassSchema>> {
        self.shared.get(name)
    }

    /// Shared schemas ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<ClassSchema>)> {
        self.shared.iter().map(|(n, s)| (n.as_str(), s))
    }

    /// Number of shared schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Returns `true` when nothing was promoted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.is_empty()
    }
}
