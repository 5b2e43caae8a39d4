//! Top-level error taxonomy for the `skylift` CLI.
//!
//! Every failure a command can hit at the boundary is folded into
//! [`LaunchError`], which carries a stable kind string alongside the
//! human-readable message. The binary catches the error exactly once, prints
//! `kind: message` under a fixed banner, and exits 1.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::info::InfoStoreError;
use crate::launcher::{FactoryError, ProviderError};

/// Errors surfaced to the operator by any subcommand.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Raised when `create` would overwrite an existing cluster info file.
    #[error(
        "{path} already exists! Delete this or specify a different cluster info path with the -i option"
    )]
    InputConflict {
        /// Info path that already exists.
        path: Utf8PathBuf,
    },
    /// Raised when a non-create command is pointed at a missing info file.
    #[error("no cluster info found at {path}; run create first or pass -i")]
    MissingInfoJson {
        /// Info path that does not exist.
        path: Utf8PathBuf,
    },
    /// Raised when the info file exists but does not parse as JSON.
    #[error("Invalid JSON in {path}: {message}")]
    InvalidJson {
        /// Info path with the unparseable content.
        path: Utf8PathBuf,
        /// Diagnostic from the JSON parser.
        message: String,
    },
    /// Raised when the configuration file is missing, malformed, or fails
    /// schema validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Raised when the provider identity in config or info is unrecognised.
    #[error(transparent)]
    Factory(#[from] FactoryError),
    /// Raised when `--env` looks like an assignment rather than an allowlist.
    #[error(
        "the --env option can only pass through environment variables from the current \
         environment; set variables according to the shell being used"
    )]
    EnvAssignment,
    /// Raised when allowlisted environment variables are not set.
    #[error("environment variable arguments have been indicated but not set: {names:?}")]
    MissingEnvVars {
        /// Every allowlisted name absent from the current environment.
        names: Vec<String>,
    },
    /// Raised when reading or writing the info file fails for reasons other
    /// than absence or malformed content.
    #[error("cluster info storage failure: {message}")]
    Storage {
        /// Description of the underlying I/O or serialization failure.
        message: String,
    },
    /// Raised when a launcher operation fails; provider errors are surfaced
    /// as-is.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl LaunchError {
    /// Stable kind string printed alongside the message.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InputConflict { .. } => "InputConflict",
            Self::MissingInfoJson { .. } => "MissingInfoJSON",
            Self::InvalidJson { .. } => "InvalidJSON",
            Self::Config(_) => "ConfigError",
            Self::Factory(_) => "UnsupportedProvider",
            Self::EnvAssignment => "OptionError",
            Self::MissingEnvVars { .. } => "MissingInput",
            Self::Storage { .. } => "StorageError",
            Self::Provider(_) => "ProviderError",
        }
    }
}

impl From<InfoStoreError> for LaunchError {
    fn from(value: InfoStoreError) -> Self {
        match value {
            InfoStoreError::Missing { path } => Self::MissingInfoJson { path },
            InfoStoreError::Parse { path, message } => Self::InvalidJson { path, message },
            InfoStoreError::Io { path, message } => Self::Storage {
                message: format!("{path}: {message}"),
            },
            InfoStoreError::Serialize { message } => Self::Storage { message },
        }
    }
}
