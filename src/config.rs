//! Application settings.
//!
//! Settings are deserialized from TOML (or built in code) during the
//! single-threaded setup phase and shared read-only with every request
//! afterwards.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Application-wide settings.
///
/// ```toml
/// document_root = "templates"
///
/// [sessions]
/// directory = "/var/lib/app/sessions"
/// max_age = 10080
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root directory for file-based templates. Template render keys are
    /// looked up relative to this directory.
    pub document_root: Option<PathBuf>,
    /// Session persistence settings.
    pub sessions: SessionSettings,
}

/// Settings for the file-backed session store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Directory holding one file per live session.
    pub directory: PathBuf,
    /// Cookie Max-Age for newly minted session ids.
    pub max_age: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./sessions"),
            max_age: 10080,
        }
    }
}

impl Settings {
    /// Parse settings from a TOML string.
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        toml::from_str(raw).context("failed to parse settings TOML")
    }

    /// Load settings from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.document_root.is_none());
        assert_eq!(settings.sessions.directory, PathBuf::from("./sessions"));
        assert_eq!(settings.sessions.max_age, 10080);
    }

    #[test]
    fn test_from_toml_str() {
        let settings = Settings::from_toml_str(
            r#"
            document_root = "tpl"

            [sessions]
            directory = "/tmp/sess"
            max_age = 60
            "#,
        )
        .unwrap();
        assert_eq!(settings.document_root, Some(PathBuf::from("tpl")));
        assert_eq!(settings.sessions.directory, PathBuf::from("/tmp/sess"));
        assert_eq!(settings.sessions.max_age, 60);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let settings = Settings::from_toml_str("document_root = \"tpl\"").unwrap();
        assert_eq!(settings.sessions.max_age, 10080);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(Settings::from_toml_str("document_root = [").is_err());
    }
}
