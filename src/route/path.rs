//! Route path helpers.
//!
//! Controllers declare paths with `:name` placeholders. The router and the
//! emitted document both use `{name}` templates.

use crate::error::ConfigError;

/// Joins a mount prefix and a route path into one normalized path.
///
/// The result always starts with `/`, never ends with one (except the root
/// itself), and never contains empty segments.
#[must_use]
pub fn join(prefix: &str, path: &str) -> String {
    let segments: Vec<&str> = prefix
        .split('/')
        .chain(path.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Translates `:name` placeholders into `{name}` templates.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPath`] when a placeholder has no name or a
/// name with characters outside `[A-Za-z0-9_]`, or when a segment already
/// uses brace syntax.
pub fn to_template(path: &str) -> Result<String, ConfigError> {
    let invalid = |reason| ConfigError::InvalidPath {
        path: path.to_string(),
        reason,
    };

    let mut segments = Vec::new();
    for segment in path.split('/') {
        if segment.contains('{') || segment.contains('}') {
            return Err(invalid("use `:name` placeholders, not braces"));
        }
        match segment.strip_prefix(':') {
            Some("") => return Err(invalid("placeholder without a name")),
            Some(name) if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') => {
                return Err(invalid("placeholder names are limited to [A-Za-z0-9_]"));
            }
            Some(name) => segments.push(format!("{{{name}}}")),
            None => segments.push(segment.to_string()),
        }
    }
    Ok(segments.join("/"))
}

/// Placeholder names of `path`, in order.
#[must_use]
pub fn placeholders(path: &str) -> Vec<&str> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix(':'))
        .filter(|name| !name.is_empty())
        .collect()
}
