//! Site parameters.
//!
//! Configuration is a flat key/value overlay: stock defaults, optionally
//! overridden by a `params.json` file next to the content directory. The
//! recognized keys are typed fields; anything else is kept as-is and passed
//! through to every template context, so templates can consume free-form
//! site-wide values (`author`, `analytics_id`, ...) without code changes.
//!
//! ```json
//! {
//!     "subtitle": "Field Notes",
//!     "site_url": "https://example.org",
//!     "base_path": "/site",
//!     "author": "Admin"
//! }
//! ```
//!
//! A missing `params.json` means stock defaults. A malformed one is a fatal
//! startup error — the build never proceeds with partially-applied
//! configuration.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("params.json parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Global site parameters.
///
/// Every field has a stock default; `params.json` files are sparse and
/// override only what they name. Unrecognized keys land in `extra` and are
/// merged into every template context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Prefix for site-absolute links in templates.
    pub base_path: String,
    /// Output root the site is written to.
    pub output_path: PathBuf,
    /// Content root that is scanned and rendered.
    pub input_path: PathBuf,
    pub subtitle: String,
    pub site_url: String,
    pub current_year: i32,
    /// Explicit navigation list; derived from top-level content
    /// directories when absent.
    pub nav: Option<Vec<String>>,
    /// Free-form keys passed through to every template context.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            output_path: PathBuf::from("_site"),
            input_path: PathBuf::from("content"),
            subtitle: "Lorem Ipsum".to_string(),
            site_url: "http://localhost:8000".to_string(),
            current_year: chrono::Local::now().year(),
            nav: None,
            extra: BTreeMap::new(),
        }
    }
}

impl Params {
    /// Base template context: all global parameters, extras included.
    /// Node-specific keys are layered on top by the renderer and win on
    /// collision.
    pub fn base_context(&self) -> tera::Context {
        let mut ctx = tera::Context::new();
        ctx.insert("base_path", &self.base_path);
        ctx.insert("subtitle", &self.subtitle);
        ctx.insert("site_url", &self.site_url);
        ctx.insert("current_year", &self.current_year);
        for (key, value) in &self.extra {
            ctx.insert(key, value);
        }
        ctx
    }
}

/// Load parameters, overlaying `params.json` onto the defaults when the
/// file exists. Parse failures are fatal.
pub fn load(path: &Path) -> Result<Params, ConfigError> {
    if !path.exists() {
        return Ok(Params::default());
    }
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // =========================================================================
    // Defaults and overlay
    // =========================================================================

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let params = load(&tmp.path().join("params.json")).unwrap();
        assert_eq!(params.subtitle, "Lorem Ipsum");
        assert_eq!(params.input_path, PathBuf::from("content"));
        assert_eq!(params.output_path, PathBuf::from("_site"));
        assert!(params.extra.is_empty());
    }

    #[test]
    fn partial_file_overrides_only_named_keys() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("params.json");
        std::fs::write(&path, r#"{"subtitle": "Field Notes"}"#).unwrap();

        let params = load(&path).unwrap();
        assert_eq!(params.subtitle, "Field Notes");
        assert_eq!(params.site_url, "http://localhost:8000");
    }

    #[test]
    fn unknown_keys_flow_into_extra() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("params.json");
        std::fs::write(&path, r#"{"author": "Admin", "links": ["a", "b"]}"#).unwrap();

        let params = load(&path).unwrap();
        assert_eq!(params.extra["author"], serde_json::json!("Admin"));
        assert_eq!(params.extra["links"], serde_json::json!(["a", "b"]));
    }

    #[test]
    fn malformed_json_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("params.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(load(&path), Err(ConfigError::Json(_))));
    }

    // =========================================================================
    // Template context
    // =========================================================================

    #[test]
    fn base_context_contains_globals_and_extras() {
        let mut params = Params::default();
        params.subtitle = "Notes".into();
        params
            .extra
            .insert("author".into(), serde_json::json!("Admin"));

        let ctx = params.base_context();
        let json = ctx.into_json();
        assert_eq!(json["subtitle"], "Notes");
        assert_eq!(json["author"], "Admin");
        assert!(json.get("current_year").is_some());
    }

    #[test]
    fn nav_override_parses() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("params.json");
        std::fs::write(&path, r#"{"nav": ["blog", "projects"]}"#).unwrap();

        let params = load(&path).unwrap();
        assert_eq!(params.nav, Some(vec!["blog".into(), "projects".into()]));
    }
}
