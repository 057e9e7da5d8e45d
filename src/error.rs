//! Error types with HTTP status code mapping.
//!
//! - [`ConfigError`]: boot-time failures while compiling controllers. Fatal.
//! - [`DispatchError`]: per-request failures resolved by the dispatcher
//!   (authentication, validation) plus handler errors passed through.
//! - [`HandlerError`]: whatever a business handler or middleware raises.
//!   The dispatcher never inspects it.
//!
//! Every error response follows the same shape:
//! ```json
//! { "code": 400, "message": "Validation failed", "name": "ValidationError", "errors": { ... } }
//! ```

use std::borrow::Cow;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::route::Slot;
use crate::schema::ErrorTree;
use crate::schema::descriptor::short_type_name;

/// Structured JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// HTTP status code.
    pub code: u16,
    /// Human-readable error message.
    pub message: String,
    /// Error class name.
    pub name: String,
    /// Field-path → messages tree for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorTree>,
}

impl ErrorResponse {
    fn into_response_with(self, status: StatusCode) -> Response {
        let mut response = axum::Json(self).into_response();
        *response.status_mut() = status;
        response
    }
}

/// Boot-time configuration error. The route tree is not usable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A model reaches itself through nested fields.
    #[error("model {model} is recursive: {chain}")]
    RecursiveModel {
        /// Qualified model name.
        model: String,
        /// Reference chain that closes the cycle.
        chain: String,
    },

    /// A controller is mounted inside itself.
    #[error("controller {controller} is mounted inside itself")]
    RecursiveMount {
        /// Controller name.
        controller: &'static str,
    },

    /// The prototype of a model could not be serialized.
    #[error("prototype of model {model} cannot be serialized: {source}")]
    Prototype {
        /// Qualified model name.
        model: String,
        /// Serializer error.
        #[source]
        source: serde_json::Error,
    },

    /// The prototype of a model did not serialize into an object.
    #[error("prototype of model {model} is not a JSON object")]
    PrototypeShape {
        /// Qualified model name.
        model: String,
    },

    /// A route declares an HTTP method the router cannot serve.
    #[error("unsupported HTTP method {method} on {path}")]
    UnsupportedMethod {
        /// Declared method.
        method: String,
        /// Declared path.
        path: String,
    },

    /// A route path cannot be translated into a router template.
    #[error("invalid route path {path:?}: {reason}")]
    InvalidPath {
        /// Declared path.
        path: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The base API document could not be built.
    #[error("base document error: {0}")]
    Document(#[from] serde_json::Error),
}

/// Status metadata of an error type a route declares it may raise.
///
/// Declared errors are documentation only; nothing enforces them at
/// runtime.
pub trait ApiError: std::error::Error + Send + Sync + 'static {
    /// HTTP status of the error.
    const STATUS: StatusCode = StatusCode::INTERNAL_SERVER_ERROR;

    /// Status message documented for the error.
    const STATUS_MESSAGE: &'static str = "Internal Server Error";

    /// Error class name.
    fn name() -> &'static str
    where
        Self: Sized,
    {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// Error raised by a handler or a middleware.
#[derive(Debug)]
pub struct HandlerError {
    status: StatusCode,
    name: Cow<'static, str>,
    message: String,
    source: Option<anyhow::Error>,
}

impl HandlerError {
    /// Creates an error with an explicit status, name and message.
    #[must_use]
    pub fn new(
        status: StatusCode,
        name: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            name: name.into(),
            message: message.into(),
            source: None,
        }
    }

    /// `400 BadRequestError`.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BadRequestError", message)
    }

    /// `403 ForbiddenError`.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "ForbiddenError", message)
    }

    /// `404 NotFoundError`.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NotFoundError", message)
    }

    /// `500 InternalServerError` wrapping an arbitrary error.
    #[must_use]
    pub fn internal(error: impl Into<anyhow::Error>) -> Self {
        let error = error.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            name: Cow::Borrowed("InternalServerError"),
            message: error.to_string(),
            source: Some(error),
        }
    }

    /// HTTP status of the error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Error class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Underlying cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl<E: ApiError> From<E> for HandlerError {
    fn from(error: E) -> Self {
        Self::new(E::STATUS, E::name(), error.to_string())
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(name = %self.name, error = %self.message, "handler failed");
        }
        ErrorResponse {
            code: self.status.as_u16(),
            message: self.message,
            name: self.name.into_owned(),
            errors: None,
        }
        .into_response_with(self.status)
    }
}

/// Per-request failure surfaced by the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// An auth scheme rejected the request.
    #[error("authentication required ({scheme})")]
    AuthenticationRequired {
        /// Name of the rejecting scheme.
        scheme: &'static str,
    },

    /// A single-schema slot failed validation.
    #[error("{slot} validation failed: {errors}")]
    ValidationFailed {
        /// Failing slot.
        slot: Slot,
        /// Field-path → messages tree.
        errors: ErrorTree,
    },

    /// No candidate of a union slot matched.
    #[error("{slot} matched no candidate: {errors}")]
    UnionValidationFailed {
        /// Failing slot.
        slot: Slot,
        /// Deep union of every candidate's errors.
        errors: ErrorTree,
    },

    /// The request body exceeds the configured limit or could not be read.
    #[error("request body rejected: {0}")]
    PayloadRejected(String),

    /// Raised by the handler or a middleware; passed through unmodified.
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl DispatchError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationRequired { .. } => StatusCode::UNAUTHORIZED,
            Self::ValidationFailed { .. } | Self::UnionValidationFailed { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadRejected(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Handler(e) => e.status_code(),
        }
    }

    /// Field errors carried by validation failures.
    #[must_use]
    pub fn errors(&self) -> Option<&ErrorTree> {
        match self {
            Self::ValidationFailed { errors, .. } | Self::UnionValidationFailed { errors, .. } => {
                Some(errors)
            }
            _ => None,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::Handler(e) => return e.into_response(),
            Self::AuthenticationRequired { .. } => ErrorResponse {
                code: status.as_u16(),
                message: "Unauthorized".to_string(),
                name: "UnauthorizedError".to_string(),
                errors: None,
            },
            Self::ValidationFailed { slot, errors } | Self::UnionValidationFailed { slot, errors } => {
                ErrorResponse {
                    code: status.as_u16(),
                    message: format!("Invalid request {slot}"),
                    name: "ValidationError".to_string(),
                    errors: Some(errors),
                }
            }
            Self::PayloadRejected(reason) => ErrorResponse {
                code: status.as_u16(),
                message: reason,
                name: "PayloadTooLargeError".to_string(),
                errors: None,
            },
        };
        body.into_response_with(status)
    }
}
