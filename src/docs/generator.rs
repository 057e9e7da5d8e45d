//! API document generator.
//!
//! Walks the compiled tree the way the router does and emits one operation
//! per `(path, method)`. The output only depends on the tree and the frozen
//! registry, so generating twice yields identical documents.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};
use utoipa::openapi::{InfoBuilder, OpenApiBuilder};

use crate::error::ConfigError;
use crate::route::node::endpoints;
use crate::route::path::{placeholders, to_template};
use crate::route::{DeclaredError, LeafNode, ResponseBinding, RouteNode, SlotBinding};
use crate::schema::json_schema::{field_schema, schema_ref};
use crate::schema::{CompiledField, SchemaRegistry};

const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Empty OpenAPI document with the given title and version.
///
/// # Errors
///
/// Returns [`ConfigError::Document`] if the document cannot be serialized.
pub fn base_document(title: &str, version: &str) -> Result<Value, ConfigError> {
    let openapi = OpenApiBuilder::new()
        .info(InfoBuilder::new().title(title).version(version).build())
        .build();
    Ok(serde_json::to_value(&openapi)?)
}

/// Merges the operations of `tree` (under `prefix`) into `base`.
///
/// Shared schemas go to `components.schemas`; auth schemes go to
/// `components.securitySchemes`, where the first registration of a name
/// wins. A non-object `base` is replaced by an empty document.
#[must_use]
pub fn generate(
    tree: &[RouteNode],
    registry: &SchemaRegistry,
    base: Value,
    prefix: &str,
) -> Value {
    let mut paths: BTreeMap<String, Map<String, Value>> = BTreeMap::new();
    let mut security_schemes = Map::new();

    for endpoint in endpoints(tree, prefix) {
        let template = match to_template(&endpoint.path) {
            Ok(template) => template,
            Err(err) => {
                tracing::warn!(path = %endpoint.path, error = %err, "route left out of the document");
                continue;
            }
        };
        let methods = paths.entry(template).or_default();
        let method = endpoint.leaf.method.as_str().to_ascii_lowercase();
        if methods.contains_key(&method) {
            continue;
        }
        let op = operation(&endpoint.path, endpoint.leaf, registry, &mut security_schemes);
        methods.insert(method, op);
    }

    let mut document = match base {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let mut doc_paths = take_object(&mut document, "paths");
    for (path, methods) in paths {
        doc_paths.insert(path, Value::Object(methods));
    }
    document.insert("paths".into(), Value::Object(doc_paths));

    if !registry.is_empty() || !security_schemes.is_empty() {
        let mut components = take_object(&mut document, "components");
        if !registry.is_empty() {
            let mut schemas = take_object(&mut components, "schemas");
            for (name, schema) in registry.iter() {
                schemas.insert(name.to_string(), schema.to_json_schema(registry));
            }
            components.insert("schemas".into(), Value::Object(schemas));
        }
        if !security_schemes.is_empty() {
            let mut schemes = take_object(&mut components, "securitySchemes");
            for (name, scheme) in security_schemes {
                schemes.entry(name).or_insert(scheme);
            }
            components.insert("securitySchemes".into(), Value::Object(schemes));
        }
        document.insert("components".into(), Value::Object(components));
    }

    Value::Object(document)
}

fn take_object(map: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match map.remove(key) {
        Some(Value::Object(inner)) => inner,
        _ => Map::new(),
    }
}

fn operation(
    path: &str,
    leaf: &LeafNode,
    registry: &SchemaRegistry,
    security_schemes: &mut Map<String, Value>,
) -> Value {
    let mut op = Map::new();
    op.insert("tags".into(), json!(leaf.tags()));
    if let Some(summary) = &leaf.meta.summary {
        op.insert("summary".into(), json!(summary));
    }
    if let Some(description) = &leaf.meta.description {
        op.insert("description".into(), json!(description));
    }
    if let Some(id) = &leaf.meta.operation_id {
        op.insert("operationId".into(), json!(id));
    }

    let mut parameters = Vec::new();
    if let Some(query) = &leaf.slots.query {
        for (field, required) in union_fields(query) {
            parameters.push(parameter(field, "query", required, registry));
        }
    }
    let mut documented = Vec::new();
    if let Some(params) = &leaf.slots.params {
        for (field, _) in union_fields(params) {
            documented.push(field.name.as_str());
            parameters.push(parameter(field, "path", !field.rule.is_optional(), registry));
        }
    }
    for name in placeholders(path) {
        if !documented.contains(&name) {
            parameters.push(json!({
                "name": name,
                "in": "path",
                "required": true,
                "schema": {"type": "string"},
            }));
        }
    }
    if !parameters.is_empty() {
        op.insert("parameters".into(), Value::Array(parameters));
    }

    if let Some(body) = &leaf.slots.body {
        let content_type = body.content_type().unwrap_or(DEFAULT_CONTENT_TYPE);
        op.insert(
            "requestBody".into(),
            json!({
                "required": true,
                "content": { content_type: { "schema": binding_schema(body, registry) } },
            }),
        );
    }

    let mut responses: BTreeMap<String, Value> = BTreeMap::new();
    for response in &leaf.responses {
        let envelope = response.envelope();
        responses.insert(
            envelope.status.to_string(),
            json!({
                "description": envelope.message,
                "content": { DEFAULT_CONTENT_TYPE: { "schema": envelope_schema(response, registry) } },
            }),
        );
    }
    for error in &leaf.errors {
        responses.insert(error.status.as_u16().to_string(), error_response(error));
    }
    if leaf.slots.any() {
        responses
            .entry("400".to_string())
            .or_insert_with(validation_response);
    }

    if !leaf.auth.is_empty() {
        let mut security = Vec::new();
        for scheme in &leaf.auth {
            let name = scheme.scheme_name();
            if !security_schemes.contains_key(name) {
                match serde_json::to_value(scheme.security_scheme()) {
                    Ok(value) => {
                        security_schemes.insert(name.to_string(), value);
                    }
                    Err(err) => {
                        tracing::warn!(scheme = name, error = %err, "security scheme not serializable");
                    }
                }
            }
            security.push(json!({ name: [] }));
        }
        op.insert("security".into(), Value::Array(security));
        responses.insert("401".to_string(), unauthorized_response());
    }

    if responses.is_empty() {
        responses.insert("200".to_string(), json!({"description": "OK"}));
    }
    op.insert(
        "responses".into(),
        Value::Object(responses.into_iter().collect()),
    );

    Value::Object(op)
}

/// Fields of every candidate, first declaration wins. A field is required
/// only when every candidate requires it.
fn union_fields(binding: &SlotBinding) -> Vec<(&CompiledField, bool)> {
    let candidates = binding.candidates();
    let mut fields: Vec<(&CompiledField, bool)> = Vec::new();
    for bound in candidates {
        let Some(schema) = &bound.schema else {
            continue;
        };
        for field in schema.fields() {
            if fields.iter().any(|(f, _)| f.name == field.name) {
                continue;
            }
            let required = candidates.iter().all(|other| {
                other
                    .schema
                    .as_ref()
                    .and_then(|s| s.field(&field.name))
                    .is_some_and(CompiledField::is_required)
            });
            fields.push((field, required));
        }
    }
    fields
}

fn parameter(
    field: &CompiledField,
    location: &str,
    required: bool,
    registry: &SchemaRegistry,
) -> Value {
    let mut param = Map::new();
    param.insert("name".into(), json!(field.name));
    param.insert("in".into(), json!(location));
    param.insert("required".into(), json!(required));
    if let Some(description) = field.rule.description() {
        param.insert("description".into(), json!(description));
    }
    param.insert("schema".into(), field_schema(field, registry));
    Value::Object(param)
}

fn binding_schema(binding: &SlotBinding, registry: &SchemaRegistry) -> Value {
    let schema_of = |bound: &crate::route::BoundSchema| {
        bound
            .schema
            .as_ref()
            .map_or_else(|| json!({"type": "object"}), |s| schema_ref(s, registry))
    };
    match binding {
        SlotBinding::Single(bound) => schema_of(bound),
        SlotBinding::Union(candidates) => {
            json!({ "oneOf": candidates.iter().map(schema_of).collect::<Vec<_>>() })
        }
    }
}

fn envelope_schema(response: &ResponseBinding, registry: &SchemaRegistry) -> Value {
    let mut properties = Map::new();
    properties.insert(
        "code".into(),
        json!({
            "type": "integer",
            "description": "HTTP status code",
            "minimum": 200,
            "maximum": 299,
        }),
    );
    properties.insert(
        "message".into(),
        json!({"type": "string", "description": "Human-readable status message"}),
    );
    if let Some(schema) = &response.schema {
        properties.insert("data".into(), schema_ref(schema, registry));
    }
    json!({"type": "object", "properties": properties})
}

fn error_properties() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "code".into(),
        json!({
            "type": "integer",
            "description": "HTTP status code of the error",
            "minimum": 400,
            "maximum": 599,
        }),
    );
    properties.insert(
        "message".into(),
        json!({"type": "string", "description": "Human-readable error message"}),
    );
    properties
}

fn error_response(error: &DeclaredError) -> Value {
    let mut properties = error_properties();
    properties.insert(
        "name".into(),
        json!({"type": "string", "description": "Error class name", "example": error.name}),
    );
    json!({
        "description": error.message,
        "content": { DEFAULT_CONTENT_TYPE: { "schema": {
            "title": "ApiErrorResponse",
            "type": "object",
            "properties": properties,
        }}},
    })
}

fn validation_response() -> Value {
    let mut properties = error_properties();
    properties.insert(
        "name".into(),
        json!({"type": "string", "description": "Error class name", "example": "ValidationError"}),
    );
    properties.insert(
        "errors".into(),
        json!({"type": "object", "description": "Failing field paths and their messages"}),
    );
    json!({
        "description": "Validation failed",
        "content": { DEFAULT_CONTENT_TYPE: { "schema": {
            "title": "ValidationErrorResponse",
            "type": "object",
            "properties": properties,
        }}},
    })
}

fn unauthorized_response() -> Value {
    json!({
        "description": "Unauthorized",
        "content": { DEFAULT_CONTENT_TYPE: { "schema": {
            "type": "object",
            "properties": error_properties(),
        }}},
    })
}
