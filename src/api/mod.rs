//! Application routes served by the binary.
//!
//! [`ApiRouter`] is the root controller: system routes at the top level and
//! the bus fleet under `/buses`. The whole tree is served under
//! `ServerConfig::api_prefix`.

pub mod buses;
pub mod models;
pub mod system;

use std::sync::OnceLock;

use serde_json::json;

use crate::dispatch::Principal;
use crate::route::{Controller, Route};

static ADMIN_TOKEN: OnceLock<String> = OnceLock::new();

/// Installs the bearer token accepted by the protected routes.
///
/// Only the first call has an effect; returns `false` when a token was
/// already installed.
pub fn set_admin_token(token: impl Into<String>) -> bool {
    ADMIN_TOKEN.set(token.into()).is_ok()
}

/// Principal of the admin token, or `None` for any other token.
pub(crate) fn admin_principal(token: &str) -> Option<Principal> {
    let expected = ADMIN_TOKEN.get()?;
    (expected == token)
        .then(|| Principal::from_iter([("user".to_string(), json!({"role": "admin"}))]))
}

/// Root controller of the application.
#[derive(Debug, Default)]
pub struct ApiRouter;

impl Controller for ApiRouter {
    fn routes() -> Vec<Route<Self>> {
        vec![
            Route::mount::<system::SystemController>("/"),
            Route::mount::<buses::BusController>("/buses"),
        ]
    }
}
