//! Launcher abstraction over provisioning providers.
//!
//! A launcher drives one cluster through its lifecycle: `create` provisions
//! infrastructure and returns the durable cluster info handle, `wait` blocks
//! until the cluster is ready, `describe` snapshots its composition, `test`
//! runs the validation suite against it, and `delete` tears it down. The
//! factory functions pick the concrete implementation from the provider
//! identity carried in the configuration or the persisted info document.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ClusterConfig;
use crate::info::ClusterInfo;
use crate::providers::{Provider, onprem::OnpremLauncher, stub::StubLauncher};

/// Future returned by launcher operations.
pub type LauncherFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Interface implemented by provider-specific launchers.
pub trait Launcher: std::fmt::Debug {
    /// Provisions the cluster and returns the handle to persist.
    ///
    /// May take substantial wall-clock time; provider failures are surfaced
    /// as-is.
    fn create(&self) -> LauncherFuture<'_, ClusterInfo>;

    /// Blocks until the cluster reports ready.
    ///
    /// Safe to call again once the cluster is already ready.
    fn wait(&self) -> LauncherFuture<'_, ()>;

    /// Returns a read-only snapshot of cluster composition.
    fn describe(&self) -> LauncherFuture<'_, ClusterDescription>;

    /// Runs the validation suite against the cluster.
    ///
    /// `extra_args` are forwarded verbatim and `env` is the complete
    /// environment of the suite process; nothing else from the invoking
    /// process leaks through. Returns the suite's exit code unchanged.
    fn test<'a>(
        &'a self,
        extra_args: &'a [String],
        env: &'a BTreeMap<String, String>,
    ) -> LauncherFuture<'a, i32>;

    /// Tears down all provisioned resources.
    ///
    /// Must be safe to call on a partially-created cluster; each provider
    /// documents its partial-failure semantics.
    fn delete(&self) -> LauncherFuture<'_, ()>;
}

/// Snapshot of cluster composition returned by [`Launcher::describe`].
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ClusterDescription {
    /// Master nodes.
    pub masters: Vec<NodeSummary>,
    /// Agent nodes.
    pub agents: Vec<NodeSummary>,
}

/// Addresses of a single cluster node.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NodeSummary {
    /// Address the node is reachable on from outside the cluster.
    pub public_ip: String,
    /// Cluster-internal address, when the provider assigns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<String>,
}

/// Errors raised by launcher operations. Provider failures are wrapped with
/// enough context for the operator without this layer interpreting them.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ProviderError {
    /// Raised when the persisted cluster info cannot be interpreted by the
    /// provider that wrote it.
    #[error("invalid cluster info for provider {provider}: {message}")]
    InvalidInfo {
        /// Provider identity.
        provider: &'static str,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when a lifecycle operation fails.
    #[error("{message}")]
    Operation {
        /// Human-readable error message.
        message: String,
    },
    /// Raised when an operation exceeds its deadline.
    #[error("timeout waiting for {what}")]
    Timeout {
        /// Description of what was being waited on.
        what: String,
    },
    /// Raised when the validation suite cannot be started.
    #[error("test runner failed to start: {message}")]
    TestRunner {
        /// Human-readable error message.
        message: String,
    },
}

/// Errors raised while selecting a launcher implementation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum FactoryError {
    /// Raised when the provider identity is not recognised.
    #[error("provider '{provider}' is not supported")]
    UnsupportedProvider {
        /// Identity that could not be matched.
        provider: String,
    },
    /// Raised when the cluster info document does not name a provider.
    #[error("cluster info does not name a provider")]
    MissingProviderIdentity,
}

/// Builds a launcher from a validated configuration.
///
/// # Errors
///
/// Returns [`FactoryError::UnsupportedProvider`] when the configured
/// provider identity is unrecognised.
pub fn launcher_from_config(
    config: &ClusterConfig,
) -> Result<Box<dyn Launcher + Send + Sync>, FactoryError> {
    match Provider::from_identity(&config.provider) {
        Some(Provider::Stub) => Ok(Box::new(StubLauncher::from_config(config))),
        Some(Provider::Onprem) => Ok(Box::new(OnpremLauncher::from_config(config))),
        None => Err(FactoryError::UnsupportedProvider {
            provider: config.provider.clone(),
        }),
    }
}

/// Builds a launcher from a previously persisted cluster info document.
///
/// # Errors
///
/// Returns [`FactoryError::MissingProviderIdentity`] when the document does
/// not name a provider and [`FactoryError::UnsupportedProvider`] when the
/// named provider is unrecognised.
pub fn launcher_from_info(
    info: &ClusterInfo,
) -> Result<Box<dyn Launcher + Send + Sync>, FactoryError> {
    let identity = info
        .provider()
        .ok_or(FactoryError::MissingProviderIdentity)?;
    match Provider::from_identity(identity) {
        Some(Provider::Stub) => Ok(Box::new(StubLauncher::from_info(info))),
        Some(Provider::Onprem) => Ok(Box::new(OnpremLauncher::from_info(info))),
        None => Err(FactoryError::UnsupportedProvider {
            provider: identity.to_owned(),
        }),
    }
}
