use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path of the file.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A config file is not valid TOML or does not match the schema.
    #[error("failed to parse config {path}: {source}")]
    ParseError {
        /// Path of the file, or a `<...>` label for in-memory sources.
        path: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// An environment variable holds a value that cannot be used.
    #[error("invalid environment variable {var}: {message}")]
    EnvError {
        /// Name of the variable.
        var: String,
        /// What is wrong with it.
        message: String,
    },

    /// A value is out of range or inconsistent.
    #[error("invalid config field {field}: {message}")]
    ValidationError {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The resolved configuration could not be rendered.
    #[error("failed to render config: {0}")]
    SerializeError(String),

    /// The home directory could not be determined.
    #[error("could not determine home directory")]
    NoHomeDir,
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
