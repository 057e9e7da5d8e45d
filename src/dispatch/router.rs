//! Router sink: turns the compiled tree into an [`axum::Router`].
//!
//! Leaves are flattened into full paths and grouped per path, one
//! [`MethodRouter`] each. The first registration of a `(path, method)` pair
//! wins; later ones are skipped with a warning.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes, to_bytes};
use axum::extract::{FromRequest, FromRequestParts, Multipart, Path, Request};
use axum::http::{Method, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter};
use serde_json::{Map, Value};

use super::dispatcher::dispatch;
use super::request::{RawRequest, UploadedFile};
use crate::config::ServerConfig;
use crate::error::{ConfigError, DispatchError};
use crate::route::path::to_template;
use crate::route::{CompiledApi, LeafNode};

struct PathGroup {
    template: String,
    shape: String,
    leaves: Vec<(Method, Arc<LeafNode>)>,
}

/// Builds the router of `api`, with every route under
/// `config.api_prefix`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPath`] for malformed paths or for two
/// paths that differ only in placeholder names, and
/// [`ConfigError::UnsupportedMethod`] for methods axum cannot route.
pub fn into_router(api: &CompiledApi, config: &ServerConfig) -> Result<Router, ConfigError> {
    let mut groups: Vec<PathGroup> = Vec::new();
    let mut by_template: HashMap<String, usize> = HashMap::new();
    let mut by_shape: HashMap<String, String> = HashMap::new();

    for endpoint in api.endpoints(&config.api_prefix) {
        let template = to_template(&endpoint.path)?;
        let shape = placeholder_shape(&template);
        if let Some(existing) = by_shape.get(&shape)
            && *existing != template
        {
            return Err(ConfigError::InvalidPath {
                path: endpoint.path,
                reason: "conflicts with a route using other placeholder names",
            });
        }
        by_shape.insert(shape.clone(), template.clone());

        let index = *by_template.entry(template.clone()).or_insert_with(|| {
            groups.push(PathGroup {
                template: template.clone(),
                shape,
                leaves: Vec::new(),
            });
            groups.len() - 1
        });
        let Some(group) = groups.get_mut(index) else {
            continue;
        };

        let method = endpoint.leaf.method.clone();
        if group.leaves.iter().any(|(m, _)| *m == method) {
            tracing::warn!(
                method = %method,
                path = %endpoint.path,
                controller = endpoint.leaf.controller,
                "duplicate route; keeping the first registration"
            );
            continue;
        }
        group.leaves.push((method, Arc::clone(endpoint.leaf)));
    }

    let limit = config.body_limit_bytes;
    let mut router = Router::new();
    for group in groups {
        let mut methods = MethodRouter::new();
        for (method, leaf) in group.leaves {
            let filter =
                MethodFilter::try_from(method.clone()).map_err(|_| ConfigError::UnsupportedMethod {
                    method: method.to_string(),
                    path: group.template.clone(),
                })?;
            let handler = move |request: Request| {
                let leaf = Arc::clone(&leaf);
                async move { serve(leaf, request, limit).await }
            };
            methods = methods.on(filter, handler);
        }
        tracing::debug!(path = %group.template, shape = %group.shape, "path routed");
        router = router.route(&group.template, methods);
    }
    Ok(router)
}

/// `/items/{id}` → `/items/{}`.
fn placeholder_shape(template: &str) -> String {
    template
        .split('/')
        .map(|segment| {
            if segment.starts_with('{') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

async fn serve(leaf: Arc<LeafNode>, request: Request, limit: usize) -> Response {
    let raw = match read_request(request, limit).await {
        Ok(raw) => raw,
        Err(err) => return err.into_response(),
    };
    match dispatch(&leaf, raw).await {
        Ok(payload) => payload.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn read_request(request: Request, limit: usize) -> Result<RawRequest, DispatchError> {
    let (mut parts, body) = request.into_parts();

    let params = match Path::<HashMap<String, String>>::from_request_parts(&mut parts, &()).await {
        Ok(Path(params)) => params
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect(),
        Err(_) => Map::new(),
    };

    let mut raw = RawRequest::new(parts.method.clone(), parts.uri.clone());
    raw.headers = parts.headers.clone();
    raw.params = Value::Object(params);
    raw.query = parts
        .uri
        .query()
        .map_or_else(|| Value::Object(Map::new()), |q| decode_pairs(q.as_bytes()));

    let bytes = to_bytes(body, limit)
        .await
        .map_err(|_| DispatchError::PayloadRejected(format!("Request body exceeds {limit} bytes")))?;
    if bytes.is_empty() {
        return Ok(raw);
    }

    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if content_type.starts_with("multipart/form-data") {
        let request = Request::from_parts(parts, Body::from(bytes));
        if let Err(reason) = read_multipart(request, &mut raw).await {
            raw.body_error = Some(reason);
        }
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        raw.body = decode_pairs(&bytes);
    } else if content_type.is_empty() || content_type.contains("json") {
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => raw.body = value,
            Err(err) => raw.body_error = Some(format!("Malformed JSON body: {err}")),
        }
    } else {
        raw.body = Value::String(String::from_utf8_lossy(&bytes).into_owned());
    }

    Ok(raw)
}

async fn read_multipart(request: Request, raw: &mut RawRequest) -> Result<(), String> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| e.body_text())?;
    let mut fields = Map::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
        let name = field.name().unwrap_or_default().to_string();
        if field.file_name().is_some() {
            let filename = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let data: Bytes = field.bytes().await.map_err(|e| e.body_text())?;
            let file = UploadedFile {
                filename,
                content_type,
                data,
            };
            fields.insert(name.clone(), file.descriptor());
            raw.files.insert(name, file);
        } else {
            let text = field.text().await.map_err(|e| e.body_text())?;
            push_value(&mut fields, name, Value::String(text));
        }
    }

    raw.body = Value::Object(fields);
    Ok(())
}

/// Decodes `a=1&b=2&a=3` into `{"a": ["1", "3"], "b": "2"}`.
fn decode_pairs(input: &[u8]) -> Value {
    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(input) {
        push_value(&mut map, key.into_owned(), Value::String(value.into_owned()));
    }
    Value::Object(map)
}

fn push_value(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(key, value);
        }
    }
}
