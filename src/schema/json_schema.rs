//! JSON-Schema rendering of compiled schemas for the API document.

use serde_json::{Map, Value, json};

use super::rule::{FieldKind, Primitive};
use super::synth::{ClassSchema, CompiledField, SchemaRegistry, Shape};

/// Prefix of shared schema references.
pub const COMPONENTS_PREFIX: &str = "#/components/schemas/";

impl ClassSchema {
    /// Inline object schema of this model. Nested shared models are
    /// referenced, not inlined.
    #[must_use]
    pub fn to_json_schema(&self, registry: &SchemaRegistry) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in self.fields() {
            properties.insert(field.name.clone(), field_schema(field, registry));
            if field.is_required() {
                required.push(Value::String(field.name.clone()));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), Value::Array(required));
        }
        Value::Object(schema)
    }
}

/// `$ref` to `schema` when it is shared, its inline schema otherwise.
#[must_use]
pub fn schema_ref(schema: &ClassSchema, registry: &SchemaRegistry) -> Value {
    match registry.shared_name(schema) {
        Some(name) => json!({ "$ref": format!("{COMPONENTS_PREFIX}{name}") }),
        None => schema.to_json_schema(registry),
    }
}

/// Schema of a nested shape.
#[must_use]
pub fn shape_schema(shape: &Shape, registry: &SchemaRegistry) -> Value {
    match shape {
        Shape::Class(schema) => schema_ref(schema, registry),
        Shape::Primitive(primitive) => primitive_schema(*primitive),
    }
}

/// Schema of a built-in primitive.
#[must_use]
pub fn primitive_schema(primitive: Primitive) -> Value {
    match primitive {
        Primitive::String => json!({"type": "string"}),
        Primitive::Number => json!({"type": "number"}),
        Primitive::Boolean => json!({"type": "boolean"}),
        Primitive::Date => json!({"type": "string", "format": "date-time"}),
        Primitive::Object => json!({"type": "object"}),
        Primitive::Array => json!({"type": "array", "items": {}}),
    }
}

/// Schema of a single field, including its description and default.
#[must_use]
pub fn field_schema(field: &CompiledField, registry: &SchemaRegistry) -> Value {
    let mut schema = match field.rule.kind() {
        FieldKind::String {
            format,
            min_length,
            max_length,
        } => {
            let mut s = object(json!({"type": "string"}));
            match format {
                Some(format) => {
                    s.insert("format".into(), json!(format.as_str()));
                }
                None => {
                    insert_opt(&mut s, "minLength", min_length.map(Value::from));
                    insert_opt(&mut s, "maxLength", max_length.map(Value::from));
                }
            }
            s
        }
        FieldKind::Number { integer, min, max } => {
            let kind = if *integer { "integer" } else { "number" };
            let mut s = object(json!({ "type": kind }));
            insert_opt(&mut s, "minimum", min.map(Value::from));
            insert_opt(&mut s, "maximum", max.map(Value::from));
            s
        }
        FieldKind::Boolean => object(json!({"type": "boolean"})),
        FieldKind::Enum { values } => object(json!({"type": "string", "enum": values})),
        FieldKind::Array {
            min_items,
            max_items,
            ..
        } => {
            let items = field
                .nested
                .as_ref()
                .map_or_else(|| json!({}), |shape| shape_schema(shape, registry));
            let mut s = object(json!({"type": "array", "items": items}));
            insert_opt(&mut s, "minItems", min_items.map(Value::from));
            insert_opt(&mut s, "maxItems", max_items.map(Value::from));
            s
        }
        FieldKind::Object { .. } => {
            let nested = field
                .nested
                .as_ref()
                .map_or_else(|| primitive_schema(Primitive::Object), |shape| {
                    shape_schema(shape, registry)
                });
            // A `$ref` cannot carry siblings in older drafts; wrap it.
            if nested.get("$ref").is_some()
                && (field.rule.description().is_some() || field.default.is_some())
            {
                object(json!({ "allOf": [nested] }))
            } else {
                object(nested)
            }
        }
        FieldKind::File { mime, .. } => {
            let mut s = object(json!({"type": "string", "format": "binary"}));
            if let [single] = mime.as_slice() {
                s.insert("contentMediaType".into(), json!(single));
            }
            s
        }
    };

    insert_opt(
        &mut schema,
        "description",
        field.rule.description().map(Value::from),
    );
    insert_opt(&mut schema, "default", field.default.clone());
    Value::Object(schema)
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value);
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::schema::descriptor::{Model, ModelRef};
    use crate::schema::synth::SchemaCompiler;
    use crate::testing::{BusData, BusMetadata, Contact, Pagination};

    fn compile<T: Model>(compiler: &mut SchemaCompiler) -> Arc<ClassSchema> {
        let Ok(Some(schema)) = compiler.synthesize(&ModelRef::of::<T>()) else {
            panic!("expected a schema");
        };
        schema
    }

    #[test]
    fn object_schema_lists_required_fields() {
        let mut compiler = SchemaCompiler::new();
        let schema = compile::<Pagination>(&mut compiler);
        let registry = compiler.finish();
        let json = schema.to_json_schema(&registry);
        assert_eq!(json["type"], "object");
        assert!(json.get("required").is_none());
        assert_eq!(json["properties"]["page"]["type"], "integer");
        assert_eq!(json["properties"]["page"]["minimum"], 1.0);
        assert_eq!(json["properties"]["page"]["default"], 1);
        assert_eq!(
            json["properties"]["search"]["description"],
            "Search term to filter results"
        );
    }

    #[test]
    fn formats_and_enums_render() {
        let mut compiler = SchemaCompiler::new();
        let schema = compile::<Contact>(&mut compiler);
        let registry = compiler.finish();
        let json = schema.to_json_schema(&registry);
        assert_eq!(json["properties"]["when"]["format"], "date-time");
        assert_eq!(json["properties"]["role"]["enum"], json!(["driver", "parent"]));
        let Some(required) = json["required"].as_array() else {
            panic!("required list");
        };
        assert!(!required.contains(&json!("role")));
        assert!(required.contains(&json!("email")));
    }

    #[test]
    fn nested_models_inline_until_shared() {
        let mut compiler = SchemaCompiler::new();
        let bus = compile::<BusData>(&mut compiler);
        let registry = compiler.finish();
        let json = bus.to_json_schema(&registry);
        assert_eq!(json["properties"]["metadata"]["type"], "object");
        assert_eq!(json["properties"]["stops"]["items"]["type"], "string");
    }

    #[test]
    fn shared_models_are_referenced() {
        let mut compiler = SchemaCompiler::new();
        let bus = compile::<BusData>(&mut compiler);
        let _ = compile::<BusMetadata>(&mut compiler);
        let registry = compiler.finish();
        let json = bus.to_json_schema(&registry);
        assert_eq!(
            json["properties"]["metadata"]["$ref"],
            "#/components/schemas/BusMetadata"
        );
    }
}
