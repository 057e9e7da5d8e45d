//! API document generation and serving.
//!
//! The document is a pure function of the compiled tree and the frozen
//! schema registry. [`router`] serves it as JSON at
//! `<docs_path>/openapi.json`, with an interactive UI at `<docs_path>` when
//! the `swagger-ui` feature is enabled.

pub mod generator;

use axum::Router;
use serde_json::Value;

pub use generator::{base_document, generate};

/// Router serving `document` under `docs_path`.
#[cfg(feature = "swagger-ui")]
pub fn router(document: Value, docs_path: &str) -> Router {
    use utoipa_swagger_ui::SwaggerUi;

    let base = docs_path.trim_end_matches('/');
    Router::new().merge(
        SwaggerUi::new(base.to_string())
            .external_url_unchecked(format!("{base}/openapi.json"), document),
    )
}

/// Router serving `document` under `docs_path`.
#[cfg(not(feature = "swagger-ui"))]
pub fn router(document: Value, docs_path: &str) -> Router {
    use std::sync::Arc;

    use axum::Json;
    use axum::routing::get;

    let base = docs_path.trim_end_matches('/');
    let document = Arc::new(document);
    Router::new().route(
        &format!("{base}/openapi.json"),
        get(move || {
            let document = Arc::clone(&document);
            async move { Json(Value::clone(&document)) }
        }),
    )
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn serves_the_document_as_json() {
        let app = router(json!({"openapi": "3.1.0", "paths": {}}), "/docs");
        let Ok(request) = Request::get("/docs/openapi.json").body(Body::empty()) else {
            panic!("request");
        };
        let Ok(response) = app.oneshot(request).await else {
            panic!("infallible");
        };
        assert_eq!(response.status(), StatusCode::OK);
        let Ok(bytes) = to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body");
        };
        let Ok(body) = serde_json::from_slice::<Value>(&bytes) else {
            panic!("json body");
        };
        assert_eq!(body["openapi"], "3.1.0");
    }
}
