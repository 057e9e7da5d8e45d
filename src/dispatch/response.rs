//! Handler results and response envelopes.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use crate::error::HandlerError;
use crate::schema::{Envelope, Model};

/// Value returned by a handler.
///
/// A payload built from a model that declares an [`Envelope`] is sent as
/// `{code, message, data}` with the envelope code as HTTP status. Anything
/// else is sent unmodified with `200 OK`.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    data: Value,
    envelope: Option<Envelope>,
}

impl Payload {
    /// Payload of a model value, carrying the model's envelope.
    ///
    /// # Errors
    ///
    /// Returns an internal [`HandlerError`] when `value` cannot be
    /// serialized.
    pub fn of<T: Model>(value: &T) -> Result<Self, HandlerError> {
        let data = serde_json::to_value(value).map_err(HandlerError::internal)?;
        Ok(Self {
            data,
            envelope: T::envelope(),
        })
    }

    /// Raw JSON payload, sent unwrapped.
    #[must_use]
    pub fn json(data: Value) -> Self {
        Self {
            data,
            envelope: None,
        }
    }

    /// Declared envelope, if any.
    #[must_use]
    pub fn envelope(&self) -> Option<Envelope> {
        self.envelope
    }

    /// HTTP status the payload is sent with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.envelope
            .and_then(|e| StatusCode::from_u16(e.status).ok())
            .unwrap_or(StatusCode::OK)
    }

    /// Response body: the envelope when one is declared, the raw data
    /// otherwise.
    #[must_use]
    pub fn into_body(self) -> Value {
        match self.envelope {
            Some(envelope) => json!({
                "code": envelope.status,
                "message": envelope.message,
                "data": self.data,
            }),
            None => self.data,
        }
    }
}

impl IntoResponse for Payload {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self.into_body())).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::testing::{CreatedItem, PlainItem};

    #[test]
    fn enveloped_model_is_wrapped() {
        let Ok(payload) = Payload::of(&CreatedItem {
            id: "1".into(),
            name: "pen".into(),
        }) else {
            panic!("serializable");
        };
        assert_eq!(payload.status(), StatusCode::CREATED);
        assert_eq!(
            payload.into_body(),
            json!({"code": 201, "message": "Created", "data": {"id": "1", "name": "pen"}})
        );
    }

    #[test]
    fn plain_model_is_sent_raw() {
        let Ok(payload) = Payload::of(&PlainItem {
            id: "1".into(),
        }) else {
            panic!("serializable");
        };
        assert_eq!(payload.status(), StatusCode::OK);
        assert_eq!(payload.into_body(), json!({"id": "1"}));
    }

    #[test]
    fn json_payload_has_no_envelope() {
        let payload = Payload::json(json!([1, 2]));
        assert!(payload.envelope().is_none());
        assert_eq!(payload.into_body(), json!([1, 2]));
    }
}
