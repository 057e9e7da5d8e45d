//! Type descriptor registry.
//!
//! Models describe their fields once through [`Model::describe`]; the
//! resulting [`FieldSet`] is the side table the synthesizer reads. Fields
//! that carry no rule are invisible to validation and documentation.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::rule::FieldRule;

/// Response metadata attached to a model type.
///
/// A handler result whose type declares an envelope is wrapped as
/// `{code, message, data}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    /// Status code, also used as the HTTP status.
    pub status: u16,
    /// Status message.
    pub message: &'static str,
}

impl Envelope {
    /// Creates an envelope with the given status code and message.
    #[must_use]
    pub const fn new(status: u16, message: &'static str) -> Self {
        Self { status, message }
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(200, "OK")
    }
}

/// A type whose fields carry validation rules.
///
/// ```
/// use declaro::schema::{FieldRule, FieldSet, Model};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Pagination {
///     page: u32,
///     limit: u32,
/// }
///
/// impl Model for Pagination {
///     fn describe(fields: &mut FieldSet) {
///         fields
///             .field("page", FieldRule::integer().coerce().min(1.0))
///             .field("limit", FieldRule::integer().coerce().min(1.0).max(100.0));
///     }
///
///     fn prototype() -> Option<Self> {
///         Some(Self { page: 1, limit: 10 })
///     }
/// }
/// ```
pub trait Model: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Module qualifier; keeps same-named models from different modules
    /// apart in the shared schema registry.
    const MODULE: &'static str = "";

    /// Registers the rules of this model's fields, in declaration order.
    fn describe(fields: &mut FieldSet);

    /// Default instance. Every non-null value of a ruled field becomes that
    /// field's default.
    fn prototype() -> Option<Self> {
        None
    }

    /// Response envelope metadata.
    fn envelope() -> Option<Envelope> {
        None
    }

    /// Content type of the request body bound to this model.
    fn content_type() -> Option<&'static str> {
        None
    }

    /// Unqualified display name.
    fn name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// Strips the module path and generic arguments from a type name.
#[must_use]
pub fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Type-erased handle on a [`Model`] implementation.
#[derive(Clone, Copy)]
pub struct ModelRef {
    type_id: TypeId,
    name: fn() -> &'static str,
    module: &'static str,
    describe: fn(&mut FieldSet),
    prototype: fn() -> Result<Option<Value>, serde_json::Error>,
    instantiate: fn(Value) -> Result<Arc<dyn Any + Send + Sync>, serde_json::Error>,
    envelope: fn() -> Option<Envelope>,
    content_type: fn() -> Option<&'static str>,
}

impl ModelRef {
    /// Handle on `T`.
    #[must_use]
    pub fn of<T: Model>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: T::name,
            module: T::MODULE,
            describe: T::describe,
            prototype: || T::prototype().map(|p| serde_json::to_value(&p)).transpose(),
            instantiate: |value| {
                let instance: T = serde_json::from_value(value)?;
                Ok(Arc::new(instance) as Arc<dyn Any + Send + Sync>)
            },
            envelope: T::envelope,
            content_type: T::content_type,
        }
    }

    /// Type identity.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Unqualified name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        (self.name)()
    }

    /// Module-qualified name, `module.Name` or just `Name`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        if self.module.is_empty() {
            self.name().to_string()
        } else {
            format!("{}.{}", self.module, self.name())
        }
    }

    /// Serialized prototype, if the model declares one.
    ///
    /// # Errors
    ///
    /// Returns the serializer error when the prototype cannot be encoded.
    pub fn prototype(&self) -> Result<Option<Value>, serde_json::Error> {
        (self.prototype)()
    }

    /// Builds a concrete instance from validated data.
    ///
    /// # Errors
    ///
    /// Returns the deserializer error when `value` does not fit the type.
    pub fn instantiate(&self, value: Value) -> Result<Arc<dyn Any + Send + Sync>, serde_json::Error> {
        (self.instantiate)(value)
    }

    /// Envelope metadata of the model.
    #[must_use]
    pub fn envelope(&self) -> Option<Envelope> {
        (self.envelope)()
    }

    /// Declared body content type of the model.
    #[must_use]
    pub fn content_type(&self) -> Option<&'static str> {
        (self.content_type)()
    }

    fn describe_into(&self, fields: &mut FieldSet) {
        (self.describe)(fields);
    }
}

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRef")
            .field("name", &self.qualified_name())
            .finish_non_exhaustive()
    }
}

/// Ordered field-name → rule table of one model.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    fields: Vec<(String, FieldRule)>,
}

impl FieldSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `rule` for `name`. Re-registering a field replaces its
    /// rule and keeps its original position.
    pub fn field(&mut self, name: impl Into<String>, rule: FieldRule) -> &mut Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = rule,
            None => self.fields.push((name, rule)),
        }
        self
    }

    /// Rule registered for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldRule> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, rule)| rule)
    }

    /// Iterates fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.fields.iter().map(|(n, r)| (n.as_str(), r))
    }

    /// Number of ruled fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when no field carries a rule.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Side table of field sets, one per model type.
#[derive(Debug, Default)]
pub struct TypeDescriptors {
    sets: HashMap<TypeId, FieldSet>,
}

impl TypeDescriptors {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Field set of `model`, describing it on first access.
    pub fn describe(&mut self, model: &ModelRef) -> &FieldSet {
        self.sets.entry(model.type_id()).or_insert_with(|| {
            let mut fields = FieldSet::new();
            model.describe_into(&mut fields);
            fields
        })
    }

    /// Registers one rule for `(type_id, field)`; last writer wins.
    pub fn register(&mut self, type_id: TypeId, field: impl Into<String>, rule: FieldRule) {
        self.sets.entry(type_id).or_default().field(field, rule);
    }

    /// Rule registered for `(type_id, field)`.
    #[must_use]
    pub fn rule(&self, type_id: TypeId, field: &str) -> Option<&FieldRule> {
        self.sets.get(&type_id).and_then(|set| set.get(field))
    }
}
