//! Request representation handed to auth schemes, middlewares and handlers.
//!
//! [`RawRequest`] is the decoded request as it arrived. [`Overlay`] holds
//! what the dispatcher derived from it (validated slots and contributed
//! keys). [`RequestView`] reads the overlay first and falls back to the raw
//! request; it never writes to either.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::route::Slot;
use crate::schema::ModelRef;

/// Key/value data an auth scheme resolves a request to.
pub type Principal = Map<String, Value>;

/// A file part of a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-side file name.
    pub filename: Option<String>,
    /// Declared content type of the part.
    pub content_type: Option<String>,
    /// File contents.
    pub data: Bytes,
}

impl UploadedFile {
    /// Descriptor validated by `file` rules: `{filename, content_type, size}`.
    #[must_use]
    pub fn descriptor(&self) -> Value {
        json!({
            "filename": self.filename,
            "content_type": self.content_type,
            "size": self.data.len(),
        })
    }
}

/// Decoded request. Every section is a JSON object, empty when absent.
#[derive(Debug, Clone)]
pub struct RawRequest {
    /// HTTP method.
    pub method: Method,
    /// Request URI.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
    /// Path parameters.
    pub params: Value,
    /// Query string; repeated keys become arrays.
    pub query: Value,
    /// Decoded body; file parts appear as descriptors.
    pub body: Value,
    /// Why the body could not be decoded. Reported only when a body
    /// schema is bound.
    pub body_error: Option<String>,
    /// File parts by field name.
    pub files: HashMap<String, UploadedFile>,
}

impl RawRequest {
    /// Empty request for `method` and `uri`.
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            params: Value::Object(Map::new()),
            query: Value::Object(Map::new()),
            body: Value::Object(Map::new()),
            body_error: None,
            files: HashMap::new(),
        }
    }

    /// Raw content of `slot`.
    #[must_use]
    pub fn section(&self, slot: Slot) -> &Value {
        match slot {
            Slot::Body => &self.body,
            Slot::Query => &self.query,
            Slot::Params => &self.params,
        }
    }
}

/// Outcome of validating one slot.
#[derive(Clone)]
pub struct Validated {
    model: ModelRef,
    value: Value,
    instance: Option<Arc<dyn Any + Send + Sync>>,
}

impl Validated {
    pub(crate) fn new(
        model: ModelRef,
        value: Value,
        instance: Option<Arc<dyn Any + Send + Sync>>,
    ) -> Self {
        Self {
            model,
            value,
            instance,
        }
    }

    /// Model the slot was resolved to. For union slots, the winning
    /// candidate.
    #[must_use]
    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    /// Cleaned value: unknown keys stripped, defaults filled, coercions
    /// applied.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Concrete instance, when the resolved model is `T`.
    #[must_use]
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.instance.as_deref().and_then(|i| i.downcast_ref::<T>())
    }
}

impl fmt::Debug for Validated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validated")
            .field("model", &self.model)
            .field("value", &self.value)
            .field("typed", &self.instance.is_some())
            .finish()
    }
}

/// Per-request values consulted ahead of the raw request.
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    body: Option<Validated>,
    query: Option<Validated>,
    params: Option<Validated>,
    extras: Map<String, Value>,
}

impl Overlay {
    /// Validated value of `slot`.
    #[must_use]
    pub fn slot(&self, slot: Slot) -> Option<&Validated> {
        match slot {
            Slot::Body => self.body.as_ref(),
            Slot::Query => self.query.as_ref(),
            Slot::Params => self.params.as_ref(),
        }
    }

    /// Keys contributed by auth schemes and middlewares.
    #[must_use]
    pub fn extras(&self) -> &Map<String, Value> {
        &self.extras
    }

    pub(crate) fn set_slot(&mut self, slot: Slot, validated: Validated) {
        match slot {
            Slot::Body => self.body = Some(validated),
            Slot::Query => self.query = Some(validated),
            Slot::Params => self.params = Some(validated),
        }
    }

    /// Later contributions overwrite earlier ones key by key.
    pub(crate) fn merge(&mut self, data: Map<String, Value>) {
        self.extras.extend(data);
    }
}

/// Read-only layered view of a request.
#[derive(Debug, Clone)]
pub struct RequestView {
    raw: Arc<RawRequest>,
    overlay: Arc<Overlay>,
}

impl RequestView {
    /// View of `raw` through `overlay`.
    #[must_use]
    pub fn new(raw: Arc<RawRequest>, overlay: Overlay) -> Self {
        Self {
            raw,
            overlay: Arc::new(overlay),
        }
    }

    /// Value of `key`: a validated slot, then a contributed key, then the
    /// raw section.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        let slot = match key {
            "body" => Some(Slot::Body),
            "query" => Some(Slot::Query),
            "params" => Some(Slot::Params),
            _ => None,
        };
        if let Some(slot) = slot
            && let Some(validated) = self.overlay.slot(slot)
        {
            return Some(validated.value());
        }
        if let Some(value) = self.overlay.extras.get(key) {
            return Some(value);
        }
        slot.map(|slot| self.raw.section(slot))
    }

    /// Body as seen by the handler.
    #[must_use]
    pub fn body_value(&self) -> &Value {
        self.slot_value(Slot::Body)
    }

    /// Query as seen by the handler.
    #[must_use]
    pub fn query_value(&self) -> &Value {
        self.slot_value(Slot::Query)
    }

    /// Path parameters as seen by the handler.
    #[must_use]
    pub fn params_value(&self) -> &Value {
        self.slot_value(Slot::Params)
    }

    /// Typed body, when the body slot resolved to `T`.
    #[must_use]
    pub fn body<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.typed(Slot::Body)
    }

    /// Typed query, when the query slot resolved to `T`.
    #[must_use]
    pub fn query<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.typed(Slot::Query)
    }

    /// Typed path parameters, when the params slot resolved to `T`.
    #[must_use]
    pub fn params<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.typed(Slot::Params)
    }

    /// Model a slot resolved to.
    #[must_use]
    pub fn resolved_model(&self, slot: Slot) -> Option<&ModelRef> {
        self.overlay.slot(slot).map(Validated::model)
    }

    /// One path parameter as a string.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params_value().get(name).and_then(Value::as_str)
    }

    /// Key contributed by an auth scheme or a middleware.
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.overlay.extras.get(key)
    }

    /// Contributed key deserialized as `T`.
    #[must_use]
    pub fn extra_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.extra(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Header value, when present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.raw.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.raw.headers
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.raw.method
    }

    /// Request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.raw.uri
    }

    /// Uploaded file of a multipart body.
    #[must_use]
    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.raw.files.get(field)
    }

    /// Request as it arrived.
    #[must_use]
    pub fn raw(&self) -> &RawRequest {
        &self.raw
    }

    /// Overlay derived by the dispatcher.
    #[must_use]
    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    fn slot_value(&self, slot: Slot) -> &Value {
        match self.overlay.slot(slot) {
            Some(validated) => validated.value(),
            None => self.raw.section(slot),
        }
    }

    fn typed<T: Send + Sync + 'static>(&self, slot: Slot) -> Option<&T> {
        self.overlay.slot(slot).and_then(Validated::downcast::<T>)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::testing::{Dog, ItemParams};

    fn raw() -> Arc<RawRequest> {
        let mut raw = RawRequest::new(Method::GET, Uri::from_static("/items/42?x=1"));
        raw.params = json!({"id": "42", "stray": "1"});
        raw.query = json!({"x": "1"});
        Arc::new(raw)
    }

    #[test]
    fn falls_back_to_raw_sections() {
        let view = RequestView::new(raw(), Overlay::default());
        assert_eq!(view.get("query"), Some(&json!({"x": "1"})));
        assert_eq!(view.param("stray"), Some("1"));
        assert!(view.get("user").is_none());
        assert!(view.params::<ItemParams>().is_none());
    }

    #[test]
    fn overlay_wins_over_raw() {
        let mut overlay = Overlay::default();
        let model = ModelRef::of::<ItemParams>();
        let Ok(instance) = model.instantiate(json!({"id": "42"})) else {
            panic!("instantiate failed");
        };
        overlay.set_slot(
            Slot::Params,
            Validated::new(model, json!({"id": "42"}), Some(instance)),
        );
        overlay.merge(Map::from_iter([("user".to_string(), json!({"id": 7}))]));

        let view = RequestView::new(raw(), overlay);
        assert_eq!(view.get("params"), Some(&json!({"id": "42"})));
        assert!(view.param("stray").is_none());
        assert_eq!(view.get("user"), Some(&json!({"id": 7})));
        let Some(params) = view.params::<ItemParams>() else {
            panic!("typed params");
        };
        assert_eq!(params.id, "42");
        assert!(view.params::<Dog>().is_none());
        assert_eq!(view.raw().params, json!({"id": "42", "stray": "1"}));
    }

    #[test]
    fn extras_deserialize_on_demand() {
        let mut overlay = Overlay::default();
        overlay.merge(Map::from_iter([("user_id".to_string(), json!(7))]));
        let view = RequestView::new(raw(), overlay);
        assert_eq!(view.extra_as::<u32>("user_id"), Some(7));
        assert_eq!(view.extra_as::<String>("user_id"), None);
    }

    #[test]
    fn file_descriptor_reports_size() {
        let file = UploadedFile {
            filename: Some("a.png".into()),
            content_type: Some("image/png".into()),
            data: Bytes::from_static(b"12345"),
        };
        assert_eq!(
            file.descriptor(),
            json!({"filename": "a.png", "content_type": "image/png", "size": 5})
        );
    }
}
