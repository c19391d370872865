use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BackendConfig {
    /// Project URL of the hosted backend, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Public (anon) API key sent with every request.
    pub api_key: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    pub backend: Option<BackendConfig>,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            backend: None,
            currency: default_currency(),
            data_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "loanboard", "loanboard")
            .context("Could not determine project directories")
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// The backend section, or an error pointing at `setup` when it is absent.
    pub fn backend(&self) -> Result<&BackendConfig> {
        self.backend.as_ref().context(
            "No backend configured. Run `loanboard setup` and fill in backend.url and backend.api_key",
        )
    }
}

pub const DEFAULT_CONFIG: &str = r#"---
backend:
  url: "https://your-project.supabase.co"
  api_key: "your-anon-key"

currency: "USD"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
backend:
  url: "https://abc.supabase.co"
  api_key: "anon-key"
currency: "EUR"
data_path: "/tmp/loanboard"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        let backend = config.backend().unwrap();
        assert_eq!(backend.url, "https://abc.supabase.co");
        assert_eq!(backend.api_key, "anon-key");
        assert_eq!(config.currency, "EUR");
        assert_eq!(
            config.default_data_path().unwrap(),
            PathBuf::from("/tmp/loanboard")
        );
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = serde_yaml::from_str("data_path: null").unwrap();
        assert_eq!(config.currency, "USD");
        assert!(config.backend.is_none());
        assert!(config.backend().is_err());
    }

    #[test]
    fn test_default_config_template_parses() {
        let config: AppConfig = serde_yaml::from_str(DEFAULT_CONFIG).unwrap();
        assert!(config.backend.is_some());
        assert_eq!(config.currency, "USD");
    }

    #[test]
    fn test_load_from_path_reports_missing_file() {
        let err = AppConfig::load_from_path("/definitely/not/here.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
