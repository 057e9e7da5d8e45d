//! Field rules: the validation contract attached to one field of a model.
//!
//! A [`FieldRule`] is built once, when a model describes itself, and is
//! immutable afterwards. Rules never live on model instances; they are
//! collected into a [`FieldSet`](super::FieldSet) keyed by the model's type.

use super::descriptor::{Model, ModelRef};

/// String formats understood by the validator.
///
/// A formatted string is checked by its format only; length bounds are
/// ignored when a format is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// `local@domain.tld`
    Email,
    /// RFC 4122 UUID, e.g. `3fa85f64-5717-4562-b3fc-2c963f66afa6`.
    Uuid,
    /// Absolute URL with a scheme and a host.
    Url,
    /// Dotted-quad IPv4 address.
    Ipv4,
    /// IPv6 address.
    Ipv6,
    /// ISO-8601 calendar date, `2023-10-05`.
    IsoDate,
    /// ISO-8601 time of day, `14:30:00`.
    IsoTime,
    /// ISO-8601 / RFC 3339 date-time, `2023-10-05T14:30:00Z`.
    IsoDateTime,
    /// ISO-8601 duration, `P3Y6M4DT12H30M5S`.
    IsoDuration,
}

impl Format {
    /// Returns the JSON-Schema `format` keyword for this format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Uuid => "uuid",
            Self::Url => "uri",
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
            Self::IsoDate => "date",
            Self::IsoTime => "time",
            Self::IsoDateTime => "date-time",
            Self::IsoDuration => "duration",
        }
    }
}

/// Built-in wrapper types that can be referenced wherever a model can.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Any string.
    String,
    /// Any JSON number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// A date or date-time string.
    Date,
    /// A free-form JSON object.
    Object,
    /// A JSON array of anything.
    Array,
}

/// Target of an array or object rule: a primitive or another model.
#[derive(Debug, Clone, Copy)]
pub enum Nested {
    /// A built-in primitive.
    Primitive(Primitive),
    /// A model type, synthesized recursively.
    Model(ModelRef),
}

impl From<Primitive> for Nested {
    fn from(primitive: Primitive) -> Self {
        Self::Primitive(primitive)
    }
}

impl From<ModelRef> for Nested {
    fn from(model: ModelRef) -> Self {
        Self::Model(model)
    }
}

/// Kind-specific part of a [`FieldRule`].
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// A string, optionally constrained by a format or by length bounds.
    String {
        /// Format check replacing the length bounds.
        format: Option<Format>,
        /// Minimum number of characters.
        min_length: Option<usize>,
        /// Maximum number of characters.
        max_length: Option<usize>,
    },
    /// A number.
    Number {
        /// Reject values with a fractional part.
        integer: bool,
        /// Inclusive lower bound.
        min: Option<f64>,
        /// Inclusive upper bound.
        max: Option<f64>,
    },
    /// A boolean.
    Boolean,
    /// An array whose items follow `items`.
    Array {
        /// Item type.
        items: Nested,
        /// Minimum number of items.
        min_items: Option<usize>,
        /// Maximum number of items.
        max_items: Option<usize>,
    },
    /// A nested object.
    Object {
        /// Object type.
        target: Nested,
    },
    /// One of a fixed list of strings.
    Enum {
        /// Accepted values, in declaration order.
        values: Vec<String>,
    },
    /// An uploaded file.
    File {
        /// Minimum size in bytes.
        min_size: Option<u64>,
        /// Maximum size in bytes.
        max_size: Option<u64>,
        /// Accepted MIME types; empty accepts any.
        mime: Vec<String>,
    },
}

impl FieldKind {
    /// Short kind name used in error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::String { .. } => "string",
            Self::Number { integer: true, .. } => "integer",
            Self::Number { .. } => "number",
            Self::Boolean => "boolean",
            Self::Array { .. } => "array",
            Self::Object { .. } => "object",
            Self::Enum { .. } => "enum",
            Self::File { .. } => "file",
        }
    }
}

/// Validation contract of one model field.
///
/// ```
/// use declaro::schema::{FieldRule, Format};
///
/// let rule = FieldRule::string()
///     .format(Format::Email)
///     .optional()
///     .describe("Contact address");
/// assert!(rule.is_optional());
/// ```
#[derive(Debug, Clone)]
pub struct FieldRule {
    kind: FieldKind,
    optional: bool,
    coerce: bool,
    description: Option<String>,
}

impl FieldRule {
    fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            optional: false,
            coerce: false,
            description: None,
        }
    }

    /// A string field.
    #[must_use]
    pub fn string() -> Self {
        Self::new(FieldKind::String {
            format: None,
            min_length: None,
            max_length: None,
        })
    }

    /// A number field.
    #[must_use]
    pub fn number() -> Self {
        Self::new(FieldKind::Number {
            integer: false,
            min: None,
            max: None,
        })
    }

    /// A number field that rejects fractional values.
    #[must_use]
    pub fn integer() -> Self {
        Self::new(FieldKind::Number {
            integer: true,
            min: None,
            max: None,
        })
    }

    /// A boolean field.
    #[must_use]
    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    /// An array of `T` items.
    #[must_use]
    pub fn array_of<T: Model>() -> Self {
        Self::array(Nested::Model(ModelRef::of::<T>()))
    }

    /// An array of primitive items.
    #[must_use]
    pub fn array_of_primitive(items: Primitive) -> Self {
        Self::array(Nested::Primitive(items))
    }

    fn array(items: Nested) -> Self {
        Self::new(FieldKind::Array {
            items,
            min_items: None,
            max_items: None,
        })
    }

    /// A nested `T` object.
    #[must_use]
    pub fn object<T: Model>() -> Self {
        Self::new(FieldKind::Object {
            target: Nested::Model(ModelRef::of::<T>()),
        })
    }

    /// A free-form object.
    #[must_use]
    pub fn any_object() -> Self {
        Self::new(FieldKind::Object {
            target: Nested::Primitive(Primitive::Object),
        })
    }

    /// A string restricted to `values`.
    #[must_use]
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(FieldKind::Enum {
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// An uploaded file (multipart bodies).
    #[must_use]
    pub fn file() -> Self {
        Self::new(FieldKind::File {
            min_size: None,
            max_size: None,
            mime: Vec::new(),
        })
    }

    /// Sets the string format. No effect on other kinds.
    #[must_use]
    pub fn format(mut self, value: Format) -> Self {
        if let FieldKind::String { format, .. } = &mut self.kind {
            *format = Some(value);
        }
        self
    }

    /// Sets the minimum string length. No effect on other kinds.
    #[must_use]
    pub fn min_length(mut self, value: usize) -> Self {
        if let FieldKind::String { min_length, .. } = &mut self.kind {
            *min_length = Some(value);
        }
        self
    }

    /// Sets the maximum string length. No effect on other kinds.
    #[must_use]
    pub fn max_length(mut self, value: usize) -> Self {
        if let FieldKind::String { max_length, .. } = &mut self.kind {
            *max_length = Some(value);
        }
        self
    }

    /// Sets the inclusive numeric lower bound. No effect on other kinds.
    #[must_use]
    pub fn min(mut self, value: f64) -> Self {
        if let FieldKind::Number { min, .. } = &mut self.kind {
            *min = Some(value);
        }
        self
    }

    /// Sets the inclusive numeric upper bound. No effect on other kinds.
    #[must_use]
    pub fn max(mut self, value: f64) -> Self {
        if let FieldKind::Number { max, .. } = &mut self.kind {
            *max = Some(value);
        }
        self
    }

    /// Sets the minimum array length. No effect on other kinds.
    #[must_use]
    pub fn min_items(mut self, value: usize) -> Self {
        if let FieldKind::Array { min_items, .. } = &mut self.kind {
            *min_items = Some(value);
        }
        self
    }

    /// Sets the maximum array length. No effect on other kinds.
    #[must_use]
    pub fn max_items(mut self, value: usize) -> Self {
        if let FieldKind::Array { max_items, .. } = &mut self.kind {
            *max_items = Some(value);
        }
        self
    }

    /// Sets the minimum file size in bytes. No effect on other kinds.
    #[must_use]
    pub fn min_size(mut self, value: u64) -> Self {
        if let FieldKind::File { min_size, .. } = &mut self.kind {
            *min_size = Some(value);
        }
        self
    }

    /// Sets the maximum file size in bytes. No effect on other kinds.
    #[must_use]
    pub fn max_size(mut self, value: u64) -> Self {
        if let FieldKind::File { max_size, .. } = &mut self.kind {
            *max_size = Some(value);
        }
        self
    }

    /// Adds an accepted MIME type. No effect on other kinds.
    #[must_use]
    pub fn mime(mut self, value: impl Into<String>) -> Self {
        if let FieldKind::File { mime, .. } = &mut self.kind {
            mime.push(value.into());
        }
        self
    }

    /// Marks the field as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Accepts stringly-typed input and converts it (numbers, booleans).
    #[must_use]
    pub fn coerce(mut self) -> Self {
        self.coerce = true;
        self
    }

    /// Attaches a human-readable description.
    #[must_use]
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Kind-specific contract.
    #[must_use]
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Whether the field may be absent.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Whether string input is converted before checking.
    #[must_use]
    pub fn coerces(&self) -> bool {
        self.coerce
    }

    /// Human-readable description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Nested target of an array or object rule.
    #[must_use]
    pub fn nested(&self) -> Option<&Nested> {
        match &self.kind {
            FieldKind::Array { items, .. } => Some(items),
            FieldKind::Object { target } => Some(target),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn string_modifiers_apply() {
        let rule = FieldRule::string().min_length(2).max_length(5).optional();
        let FieldKind::String {
            format,
            min_length,
            max_length,
        } = rule.kind()
        else {
            panic!("expected string kind");
        };
        assert_eq!(*format, None);
        assert_eq!(*min_length, Some(2));
        assert_eq!(*max_length, Some(5));
        assert!(rule.is_optional());
    }

    #[test]
    fn modifiers_for_other_kinds_are_ignored() {
        let rule = FieldRule::boolean().min_length(3).min(1.0).format(Format::Email);
        assert!(matches!(rule.kind(), FieldKind::Boolean));
    }

    #[test]
    fn number_bounds_and_coerce() {
        let rule = FieldRule::integer().min(1.0).max(100.0).coerce();
        let FieldKind::Number { integer, min, max } = rule.kind() else {
            panic!("expected number kind");
        };
        assert!(*integer);
        assert_eq!(*min, Some(1.0));
        assert_eq!(*max, Some(100.0));
        assert!(rule.coerces());
        assert_eq!(rule.kind().name(), "integer");
    }

    #[test]
    fn enumeration_keeps_declaration_order() {
        let rule = FieldRule::enumeration(["driver", "parent", "admin"]);
        let FieldKind::Enum { values } = rule.kind() else {
            panic!("expected enum kind");
        };
        assert_eq!(values, &["driver", "parent", "admin"]);
    }

    #[test]
    fn primitive_array_has_nested_target() {
        let rule = FieldRule::array_of_primitive(Primitive::String).min_items(1);
        assert!(matches!(
            rule.nested(),
            Some(Nested::Primitive(Primitive::String))
        ));
        assert!(FieldRule::string().nested().is_none());
    }

    #[test]
    fn file_constraints_accumulate_mime_types() {
        let rule = FieldRule::file()
            .max_size(1024)
            .mime("image/png")
            .mime("image/jpeg");
        let FieldKind::File { max_size, mime, .. } = rule.kind() else {
            panic!("expected file kind");
        };
        assert_eq!(*max_size, Some(1024));
        assert_eq!(mime.len(), 2);
    }

    #[test]
    fn format_keywords_follow_json_schema() {
        assert_eq!(Format::IsoDateTime.as_str(), "date-time");
        assert_eq!(Format::Url.as_str(), "uri");
        assert_eq!(Format::IsoDuration.as_str(), "duration");
    }
}
