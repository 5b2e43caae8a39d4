//! Core library for the skylift cluster orchestrator.
//!
//! The crate drives compute clusters through a five-step lifecycle
//! (create → wait → describe → pytest → delete) behind a provider-polymorphic
//! launcher abstraction. The durable state between invocations is a single
//! canonical JSON document, the cluster info handle.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod info;
pub mod launcher;
pub mod logging;
pub mod providers;

pub use config::{ClusterConfig, ConfigError};
pub use error::LaunchError;
pub use info::{ClusterInfo, InfoStoreError};
pub use launcher::{
    ClusterDescription, FactoryError, Launcher, LauncherFuture, NodeSummary, ProviderError,
    launcher_from_config, launcher_from_info,
};
pub use providers::{Provider, onprem::OnpremLauncher, stub::StubLauncher};
