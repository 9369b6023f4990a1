use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::oracle::{ResearchScope, BUILTIN_SCOPES};

/// Application-level constants
pub const APP_NAME: &str = "PaperLens";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.1:8b";
pub const DEFAULT_VISION_MODEL: &str = "llama3.2-vision:11b";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,paperlens=debug,reqwest=warn"
}

/// Get the application data directory (`~/PaperLens/`).
///
/// Falls back to the working directory when no home directory is known.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default folder scanned for PDFs.
pub fn default_papers_dir() -> PathBuf {
    app_data_dir().join("papers")
}

/// Default SQLite database file.
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("papers.db")
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },

    #[error("Unknown research scope `{0}` (expected one of {known}, or set PAPERLENS_TOPIC)", known = BUILTIN_SCOPES.join(", "))]
    UnknownScope(String),
}

/// Runtime configuration, read from `PAPERLENS_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub papers_dir: PathBuf,
    pub db_path: PathBuf,
    pub ollama_url: String,
    pub model: String,
    pub vision_model: String,
    pub timeout_secs: u64,
    pub scope: ResearchScope,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            papers_dir: default_papers_dir(),
            db_path: default_db_path(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            scope: ResearchScope::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let timeout_secs = match get("PAPERLENS_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidValue {
                    var: "PAPERLENS_TIMEOUT_SECS",
                    value: raw,
                })?,
            None => defaults.timeout_secs,
        };

        let scope = match get("PAPERLENS_TOPIC") {
            Some(topic) => ResearchScope::custom(&topic),
            None => match get("PAPERLENS_SCOPE") {
                Some(name) => parse_scope(&name)?,
                None => defaults.scope,
            },
        };

        Ok(Self {
            papers_dir: get("PAPERLENS_PAPERS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.papers_dir),
            db_path: get("PAPERLENS_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            ollama_url: get("PAPERLENS_OLLAMA_URL").unwrap_or(defaults.ollama_url),
            model: get("PAPERLENS_MODEL").unwrap_or(defaults.model),
            vision_model: get("PAPERLENS_VISION_MODEL").unwrap_or(defaults.vision_model),
            timeout_secs,
            scope,
        })
    }
}

/// Resolve a built-in scope by name.
pub fn parse_scope(name: &str) -> Result<ResearchScope, ConfigError> {
    ResearchScope::from_name(name).ok_or_else(|| ConfigError::UnknownScope(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn app_data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with("PaperLens"));
        assert!(default_db_path().starts_with(app_data_dir()));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.ollama_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.scope, ResearchScope::default());
        assert_eq!(config.db_path, default_db_path());
    }

    #[test]
    fn variables_override_defaults() {
        let config = config_from(&[
            ("PAPERLENS_PAPERS_DIR", "/data/pdfs"),
            ("PAPERLENS_DB_PATH", "/data/papers.db"),
            ("PAPERLENS_MODEL", "qwen2.5:14b"),
            ("PAPERLENS_TIMEOUT_SECS", "60"),
            ("PAPERLENS_SCOPE", "power-system-protection"),
        ])
        .unwrap();
        assert_eq!(config.papers_dir, PathBuf::from("/data/pdfs"));
        assert_eq!(config.db_path, PathBuf::from("/data/papers.db"));
        assert_eq!(config.model, "qwen2.5:14b");
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.scope.name, "power-system-protection");
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = config_from(&[("PAPERLENS_MODEL", "   ")]).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn custom_topic_wins_over_scope_name() {
        let config = config_from(&[
            ("PAPERLENS_SCOPE", "power-system-protection"),
            ("PAPERLENS_TOPIC", "Hydrology"),
        ])
        .unwrap();
        assert_eq!(config.scope.name, "custom");
        assert_eq!(config.scope.topic, "Hydrology");
    }

    #[test]
    fn bad_timeout_is_rejected() {
        for raw in ["soon", "0", "-5"] {
            let err = config_from(&[("PAPERLENS_TIMEOUT_SECS", raw)]).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { var: "PAPERLENS_TIMEOUT_SECS", .. }));
        }
    }

    #[test]
    fn unknown_scope_is_rejected() {
        let err = config_from(&[("PAPERLENS_SCOPE", "astrophysics")]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownScope(name) if name == "astrophysics"));
    }
}
