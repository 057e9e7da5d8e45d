//! Server configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`). Missing or unparseable values fall back to defaults, except
//! `LISTEN_ADDR`, which must be a valid socket address when set.

use std::net::SocketAddr;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Top-level server configuration.
///
/// Loaded once at startup via [`ServerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Maximum accepted request body size in bytes.
    pub body_limit_bytes: usize,

    /// Path the API document UI is served under.
    pub docs_path: String,

    /// Title of the generated API document.
    pub api_title: String,

    /// Version of the generated API document.
    pub api_version: String,

    /// Prefix prepended to every route, in both the router and the document.
    pub api_prefix: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Bearer token accepted by the protected demo routes. Unset means
    /// every protected request is rejected.
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            body_limit_bytes: 2 * 1024 * 1024,
            docs_path: "/docs".to_string(),
            api_title: "declaro".to_string(),
            api_version: env!("CARGO_PKG_VERSION").to_string(),
            api_prefix: String::new(),
            log_format: LogFormat::Text,
            admin_token: None,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let listen_addr = match lookup("LISTEN_ADDR") {
            Some(raw) => raw.parse()?,
            None => defaults.listen_addr,
        };

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase) {
            Some(f) if f == "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            listen_addr,
            body_limit_bytes: parse_env(&lookup, "BODY_LIMIT_BYTES", defaults.body_limit_bytes),
            docs_path: lookup("DOCS_PATH")
                .map(|raw| normalize_prefix(&raw))
                .filter(|path| !path.is_empty())
                .unwrap_or(defaults.docs_path),
            api_title: lookup("API_TITLE").unwrap_or(defaults.api_title),
            api_version: lookup("API_VERSION").unwrap_or(defaults.api_version),
            api_prefix: normalize_prefix(&lookup("API_PREFIX").unwrap_or_default()),
            log_format,
            admin_token: lookup("ADMIN_TOKEN").filter(|token| !token.is_empty()),
        })
    }
}

/// Parses a variable as `T`, returning `default` on missing or invalid
/// values.
fn parse_env<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// `api/v1/` → `/api/v1`; empty and `/` → empty.
fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let Ok(config) = ServerConfig::from_lookup(|key| vars.get(key).cloned()) else {
            panic!("config should load");
        };
        config
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = load(&[]);
        assert_eq!(config.listen_addr.port(), 3000);
        assert_eq!(config.body_limit_bytes, 2 * 1024 * 1024);
        assert_eq!(config.docs_path, "/docs");
        assert_eq!(config.api_prefix, "");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn values_are_read_and_normalized() {
        let config = load(&[
            ("LISTEN_ADDR", "127.0.0.1:8080"),
            ("BODY_LIMIT_BYTES", "1024"),
            ("DOCS_PATH", "api-docs/"),
            ("API_PREFIX", "api/v1"),
            ("API_TITLE", "School Bus API"),
            ("LOG_FORMAT", "JSON"),
            ("ADMIN_TOKEN", "s3cret"),
        ]);
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.body_limit_bytes, 1024);
        assert_eq!(config.docs_path, "/api-docs");
        assert_eq!(config.api_prefix, "/api/v1");
        assert_eq!(config.api_title, "School Bus API");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.admin_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let config = load(&[("BODY_LIMIT_BYTES", "lots")]);
        assert_eq!(config.body_limit_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn invalid_listen_addr_is_an_error() {
        let result = ServerConfig::from_lookup(|key| {
            (key == "LISTEN_ADDR").then(|| "not-an-address".to_string())
        });
        assert!(result.is_err());
    }
}
