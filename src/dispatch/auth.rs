//! Authentication schemes.
//!
//! A scheme resolves a request to a [`Principal`] or rejects it. It also
//! describes itself for the API document; its name is the key under
//! `components.securitySchemes`.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};

use super::request::{Principal, RequestView};

/// An authentication scheme declared on a route.
pub trait AuthScheme: Send + Sync + 'static {
    /// Stable scheme name, unique per scheme type.
    fn scheme_name(&self) -> &'static str;

    /// Security scheme entry of the API document.
    fn security_scheme(&self) -> SecurityScheme;

    /// Resolves the request to principal data, or `None` to reject it.
    fn validate<'a>(&'a self, request: &'a RequestView) -> BoxFuture<'a, Option<Principal>>;
}

/// Checks a credential extracted by a scheme.
pub trait TokenVerifier: Send + Sync + 'static {
    /// Principal data of `token`, or `None` when it is not valid.
    fn verify<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Option<Principal>>;
}

impl<F> TokenVerifier for F
where
    F: Fn(&str) -> Option<Principal> + Send + Sync + 'static,
{
    fn verify<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Option<Principal>> {
        let principal = self(token);
        Box::pin(async move { principal })
    }
}

/// `Authorization: Bearer <token>`.
#[derive(Clone)]
pub struct BearerAuth {
    verifier: Arc<dyn TokenVerifier>,
    bearer_format: Option<String>,
}

impl BearerAuth {
    /// Scheme delegating token checks to `verifier`.
    #[must_use]
    pub fn new(verifier: impl TokenVerifier) -> Self {
        Self {
            verifier: Arc::new(verifier),
            bearer_format: None,
        }
    }

    /// Documents the token format, e.g. `JWT`.
    #[must_use]
    pub fn bearer_format(mut self, format: impl Into<String>) -> Self {
        self.bearer_format = Some(format.into());
        self
    }
}

impl AuthScheme for BearerAuth {
    fn scheme_name(&self) -> &'static str {
        "BearerAuth"
    }

    fn security_scheme(&self) -> SecurityScheme {
        let mut http = HttpBuilder::new().scheme(HttpAuthScheme::Bearer);
        if let Some(format) = &self.bearer_format {
            http = http.bearer_format(format.clone());
        }
        SecurityScheme::Http(http.build())
    }

    fn validate<'a>(&'a self, request: &'a RequestView) -> BoxFuture<'a, Option<Principal>> {
        Box::pin(async move {
            let header = request.header("authorization")?;
            let (scheme, token) = header.split_once(' ')?;
            if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
                tracing::debug!("authorization header is not a bearer token");
                return None;
            }
            self.verifier.verify(token.trim()).await
        })
    }
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuth")
            .field("bearer_format", &self.bearer_format)
            .finish_non_exhaustive()
    }
}

/// API key carried in a request header.
#[derive(Clone)]
pub struct ApiKeyAuth {
    header: String,
    verifier: Arc<dyn TokenVerifier>,
}

impl ApiKeyAuth {
    /// Scheme reading the key from `header`.
    #[must_use]
    pub fn new(header: impl Into<String>, verifier: impl TokenVerifier) -> Self {
        Self {
            header: header.into(),
            verifier: Arc::new(verifier),
        }
    }
}

impl AuthScheme for ApiKeyAuth {
    fn scheme_name(&self) -> &'static str {
        "ApiKeyAuth"
    }

    fn security_scheme(&self) -> SecurityScheme {
        SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(self.header.clone())))
    }

    fn validate<'a>(&'a self, request: &'a RequestView) -> BoxFuture<'a, Option<Principal>> {
        Box::pin(async move {
            let key = request.header(&self.header)?;
            self.verifier.verify(key).await
        })
    }
}

impl fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyAuth")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::http::{HeaderValue, Method, Uri};
    use serde_json::json;

    use super::*;
    use crate::dispatch::request::{Overlay, RawRequest};

    fn view_with(header: &'static str, value: &'static str) -> RequestView {
        let mut raw = RawRequest::new(Method::GET, Uri::from_static("/"));
        raw.headers.insert(header, HeaderValue::from_static(value));
        RequestView::new(Arc::new(raw), Overlay::default())
    }

    fn admin_only(token: &str) -> Option<Principal> {
        (token == "admin-token")
            .then(|| Principal::from_iter([("user".to_string(), json!({"role": "admin"}))]))
    }

    #[tokio::test]
    async fn bearer_accepts_known_token() {
        let auth = BearerAuth::new(admin_only);
        let view = view_with("authorization", "Bearer admin-token");
        let Some(principal) = auth.validate(&view).await else {
            panic!("expected a principal");
        };
        assert_eq!(principal.get("user"), Some(&json!({"role": "admin"})));
    }

    #[tokio::test]
    async fn bearer_rejects_other_schemes_and_tokens() {
        let auth = BearerAuth::new(admin_only);
        assert!(auth.validate(&view_with("authorization", "Basic admin-token")).await.is_none());
        assert!(auth.validate(&view_with("authorization", "Bearer nope")).await.is_none());
        assert!(auth.validate(&view_with("x-other", "Bearer admin-token")).await.is_none());
    }

    #[test]
    fn api_key_reads_its_header() {
        let auth = ApiKeyAuth::new("x-api-key", admin_only);
        let view = view_with("x-api-key", "admin-token");
        assert!(tokio_test::block_on(auth.validate(&view)).is_some());
    }

    #[test]
    fn schemes_describe_themselves() {
        let bearer = BearerAuth::new(admin_only).bearer_format("JWT");
        let Ok(json) = serde_json::to_value(bearer.security_scheme()) else {
            panic!("serializable scheme");
        };
        assert_eq!(json["type"], "http");
        assert_eq!(json["scheme"], "bearer");
        assert_eq!(json["bearerFormat"], "JWT");

        let key = ApiKeyAuth::new("x-api-key", admin_only);
        let Ok(json) = serde_json::to_value(key.security_scheme()) else {
            panic!("serializable scheme");
        };
        assert_eq!(json["type"], "apiKey");
        assert_eq!(json["in"], "header");
        assert_eq!(json["name"], "x-api-key");
    }
}
