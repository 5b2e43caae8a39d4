//! Deterministic in-process provider.
//!
//! The stub provider exists so the full command lifecycle can be exercised
//! without any infrastructure: `create` synthesizes a cluster record with
//! documentation-range addresses, `wait` reports ready immediately, and
//! `delete` releases nothing. The validation suite still runs for real via
//! the shared suite runner.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ClusterConfig;
use crate::info::ClusterInfo;
use crate::launcher::{ClusterDescription, Launcher, LauncherFuture, NodeSummary, ProviderError};
use crate::providers::{DEFAULT_TEST_COMMAND, run_suite};

const PROVIDER: &str = "stub";

/// State persisted in the cluster info document.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
struct StubState {
    provider: String,
    cluster_id: String,
    deployment_name: String,
    masters: Vec<NodeSummary>,
    agents: Vec<NodeSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    test_command: Option<Vec<String>>,
}

/// Cluster shape captured from the configuration before `create` runs.
#[derive(Clone, Debug)]
struct PendingCluster {
    deployment_name: String,
    num_masters: u32,
    num_agents: u32,
    test_command: Option<Vec<String>>,
}

impl PendingCluster {
    /// Synthesizes the cluster record. Addresses come from the RFC 5737
    /// documentation ranges so they can never collide with real machines.
    fn provision(&self) -> StubState {
        let masters = (0..self.num_masters)
            .map(|index| NodeSummary {
                public_ip: format!("203.0.113.{}", index + 1),
                private_ip: Some(format!("10.0.0.{}", index + 1)),
            })
            .collect();
        let agents = (0..self.num_agents)
            .map(|index| NodeSummary {
                public_ip: format!("198.51.100.{}", index + 1),
                private_ip: Some(format!("10.0.1.{}", index + 1)),
            })
            .collect();
        StubState {
            provider: String::from(PROVIDER),
            cluster_id: Uuid::new_v4().to_string(),
            deployment_name: self.deployment_name.clone(),
            masters,
            agents,
            test_command: self.test_command.clone(),
        }
    }
}

#[derive(Clone, Debug)]
enum Source {
    Config(PendingCluster),
    Info(Value),
}

/// Launcher for the stub provider.
#[derive(Clone, Debug)]
pub struct StubLauncher {
    source: Source,
}

impl StubLauncher {
    /// Builds a launcher that will provision a fresh stub cluster.
    #[must_use]
    pub fn from_config(config: &ClusterConfig) -> Self {
        Self {
            source: Source::Config(PendingCluster {
                deployment_name: config.deployment_name.clone(),
                num_masters: config.num_masters,
                num_agents: config.num_agents,
                test_command: config.test_command.clone(),
            }),
        }
    }

    /// Builds a launcher bound to a previously persisted cluster.
    ///
    /// The document is interpreted lazily; a malformed payload surfaces on
    /// the first operation that needs it.
    #[must_use]
    pub fn from_info(info: &ClusterInfo) -> Self {
        Self {
            source: Source::Info(info.as_value().clone()),
        }
    }

    fn state(&self) -> Result<StubState, ProviderError> {
        match &self.source {
            Source::Info(value) => {
                serde_json::from_value(value.clone()).map_err(|err| ProviderError::InvalidInfo {
                    provider: PROVIDER,
                    message: err.to_string(),
                })
            }
            Source::Config(_) => Err(ProviderError::Operation {
                message: String::from(
                    "launcher was built from a configuration; create the cluster first",
                ),
            }),
        }
    }
}

impl Launcher for StubLauncher {
    fn create(&self) -> LauncherFuture<'_, ClusterInfo> {
        Box::pin(async move {
            let Source::Config(pending) = &self.source else {
                return Err(ProviderError::Operation {
                    message: String::from("launcher is already bound to an existing cluster"),
                });
            };
            let state = pending.provision();
            info!(
                cluster_id = %state.cluster_id,
                masters = state.masters.len(),
                agents = state.agents.len(),
                "provisioned stub cluster"
            );
            let value = serde_json::to_value(&state).map_err(|err| ProviderError::Operation {
                message: err.to_string(),
            })?;
            Ok(ClusterInfo::from_value(value))
        })
    }

    fn wait(&self) -> LauncherFuture<'_, ()> {
        Box::pin(async move {
            let state = self.state()?;
            debug!(cluster_id = %state.cluster_id, "stub cluster is always ready");
            Ok(())
        })
    }

    fn describe(&self) -> LauncherFuture<'_, ClusterDescription> {
        Box::pin(async move {
            let state = self.state()?;
            Ok(ClusterDescription {
                masters: state.masters,
                agents: state.agents,
            })
        })
    }

    fn test<'a>(
        &'a self,
        extra_args: &'a [String],
        env: &'a BTreeMap<String, String>,
    ) -> LauncherFuture<'a, i32> {
        Box::pin(async move {
            let state = self.state()?;
            let command = state
                .test_command
                .unwrap_or_else(|| vec![String::from(DEFAULT_TEST_COMMAND)]);
            run_suite(&command, extra_args, env).await
        })
    }

    // Nothing real was provisioned, so teardown always succeeds; in
    // particular it is safe after a failed or partial create.
    fn delete(&self) -> LauncherFuture<'_, ()> {
        Box::pin(async move {
            let state = self.state()?;
            info!(cluster_id = %state.cluster_id, "released stub cluster");
            Ok(())
        })
    }
}
