//! System endpoints: health check.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::dispatch::{Payload, RequestView};
use crate::error::HandlerError;
use crate::route::{Controller, Route};
use crate::schema::{FieldRule, FieldSet, Format, Model};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `healthy` while the process serves requests.
    pub status: String,
    /// Current server time.
    pub timestamp: String,
    /// Crate version.
    pub version: String,
}

impl Model for HealthResponse {
    fn describe(fields: &mut FieldSet) {
        fields
            .field("status", FieldRule::string())
            .field("timestamp", FieldRule::string().format(Format::IsoDateTime))
            .field("version", FieldRule::string());
    }
}

/// Routes served next to the API, outside any resource.
#[derive(Debug, Default)]
pub struct SystemController;

impl SystemController {
    async fn health(self: Arc<Self>, _req: RequestView) -> Result<Payload, HandlerError> {
        Payload::of(&HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}

impl Controller for SystemController {
    fn routes() -> Vec<Route<Self>> {
        vec![
            Route::get("/health", Self::health)
                .response::<HealthResponse>()
                .tag("System")
                .summary("Health check")
                .description("Returns service health status, version, and current timestamp."),
        ]
    }
}
