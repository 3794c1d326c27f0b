//! Resolved configuration and its rendering for `elevate config show`.

use serde::Serialize;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Output format for [`ResolvedConfig::render`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShowFormat {
    /// TOML, as it would appear in a config file.
    #[default]
    Toml,
    /// Pretty-printed JSON.
    Json,
}

/// A loaded configuration together with where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// The merged, validated configuration.
    pub config: Config,
    /// Config files that were found and merged, lowest precedence first.
    pub loaded_files: Vec<String>,
    /// Environment variables that contributed a value.
    pub env_vars: Vec<String>,
}

impl ResolvedConfig {
    /// Render the merged configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SerializeError`] if serialization fails.
    pub fn render(&self, format: ShowFormat) -> ConfigResult<String> {
        match format {
            ShowFormat::Toml => toml::to_string_pretty(&self.config)
                .map_err(|e| ConfigError::SerializeError(e.to_string())),
            ShowFormat::Json => serde_json::to_string_pretty(&self.config)
                .map_err(|e| ConfigError::SerializeError(e.to_string())),
        }
    }

    /// One line per source, for a header above [`render`](Self::render).
    #[must_use]
    pub fn sources(&self) -> Vec<String> {
        let mut lines = vec!["defaults (embedded)".to_owned()];
        lines.extend(self.env_vars.iter().map(|var| format!("env {var}")));
        lines.extend(self.loaded_files.iter().map(|path| format!("file {path}")));
        lines
    }
}
