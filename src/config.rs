//! Runtime configuration.
//!
//! Defaults, then `genforge/config.json` in the platform config directory,
//! then environment variables:
//! - `GENFORGE_API_URL` - Base URL of the chat completions API
//! - `GENFORGE_API_KEY` - API key (falls back to `DEEPSEEK_API_KEY`)
//! - `GENFORGE_MODEL` - Model name
//! - `GENFORGE_PROJECTS_ROOT` - Where generations are written
//! - `GENFORGE_STRICTNESS` - `strict` or `lenient` manifest handling
//!
//! The binary applies its command-line flags last.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::manifest::Strictness;
use crate::replay::DEFAULT_ENTRYPOINT;
use crate::service::{ChatClientConfig, DEFAULT_SYSTEM_DIRECTIVE};

const APP_NAME: &str = "genforge";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generation service connection.
    pub service: ChatClientConfig,
    /// Root of `<project>/<generation>/` output directories.
    pub projects_root: PathBuf,
    /// File name the replay runner searches for.
    pub entrypoint: String,
    pub strictness: Strictness,
    /// Allocation tries before a version conflict is surfaced.
    pub allocation_attempts: u32,
    /// Write `.reports.md` into each generation.
    pub write_report: bool,
    pub system_directive: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ChatClientConfig::default(),
            projects_root: default_projects_root(),
            entrypoint: DEFAULT_ENTRYPOINT.to_string(),
            strictness: Strictness::Strict,
            allocation_attempts: 3,
            write_report: true,
            system_directive: DEFAULT_SYSTEM_DIRECTIVE.to_string(),
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    /// Falls back to defaults when the file is missing or fails to parse.
    pub fn load() -> Self {
        let mut config = match Self::try_load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn try_load() -> Result<Self> {
        let Some(config_path) = config_path() else {
            return Ok(Self::default());
        };
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config = serde_json::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Apply environment overrides read through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("GENFORGE_API_URL") {
            self.service.base_url = url;
        }
        if let Some(key) = var("GENFORGE_API_KEY").or_else(|| var("DEEPSEEK_API_KEY")) {
            self.service.api_key = Some(key);
        }
        if let Some(model) = var("GENFORGE_MODEL") {
            self.service.model = model;
        }
        if let Some(root) = var("GENFORGE_PROJECTS_ROOT") {
            self.projects_root = PathBuf::from(root);
        }
        if let Some(strictness) = var("GENFORGE_STRICTNESS") {
            match strictness.parse() {
                Ok(s) => self.strictness = s,
                Err(e) => tracing::warn!("Ignoring GENFORGE_STRICTNESS: {}", e),
            }
        }
    }
}

fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

fn default_projects_root() -> PathBuf {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().join("projects"))
        .unwrap_or_else(|| PathBuf::from("generated_code"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn env_overrides_defaults() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GENFORGE_API_URL", "http://localhost:9999/v1"),
            ("DEEPSEEK_API_KEY", "secret"),
            ("GENFORGE_PROJECTS_ROOT", "/tmp/gen"),
            ("GENFORGE_STRICTNESS", "lenient"),
        ]);
        let mut config = Config::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.service.base_url, "http://localhost:9999/v1");
        assert_eq!(config.service.api_key.as_deref(), Some("secret"));
        assert_eq!(config.projects_root, PathBuf::from("/tmp/gen"));
        assert_eq!(config.strictness, Strictness::Lenient);
    }

    #[test]
    fn genforge_key_wins_over_deepseek_key() {
        let env: HashMap<&str, &str> =
            HashMap::from([("GENFORGE_API_KEY", "mine"), ("DEEPSEEK_API_KEY", "other")]);
        let mut config = Config::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.service.api_key.as_deref(), Some("mine"));
    }

    #[test]
    fn partial_config_file_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{"entrypoint": "run.sh"}"#).unwrap();
        assert_eq!(config.entrypoint, "run.sh");
        assert_eq!(config.allocation_attempts, 3);
        assert_eq!(config.strictness, Strictness::Strict);
    }
}
