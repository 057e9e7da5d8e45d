//! declaro server entry point.
//!
//! Compiles the application routes once, then serves them together with
//! the generated API document.

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use declaro::api::{self, ApiRouter};
use declaro::config::{LogFormat, ServerConfig};
use declaro::docs;
use declaro::route::CompiledApi;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServerConfig::from_env()
        .map_err(|err| anyhow::anyhow!("invalid configuration: {err}"))?;
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting declaro");

    match &config.admin_token {
        Some(token) => {
            api::set_admin_token(token.clone());
        }
        None => tracing::warn!("ADMIN_TOKEN is not set; protected routes reject every request"),
    }

    // Compile the route tree; configuration errors stop the boot here
    let compiled = CompiledApi::compile::<ApiRouter>().context("route tree compilation failed")?;
    let routes = compiled.router(&config).context("router construction failed")?;

    let base = docs::base_document(&config.api_title, &config.api_version)?;
    let document = compiled.document(base, &config.api_prefix);
    tracing::info!(
        docs = %config.docs_path,
        operations = compiled.endpoints(&config.api_prefix).len(),
        "API document generated"
    );

    let app = routes
        .merge(docs::router(document, &config.docs_path))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
