//! Launcher for clusters built from pre-provisioned hosts.
//!
//! The onprem provider never creates machines: `create` partitions the
//! configured `hosts` list into masters and agents and records the result in
//! the cluster info document. Readiness is observed by polling each node's
//! SSH TCP endpoint, and teardown leaves the operator-owned machines in
//! place, so both `wait` and `delete` are idempotent and safe regardless of
//! how far a previous `create` got.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, trace};

use crate::config::ClusterConfig;
use crate::info::ClusterInfo;
use crate::launcher::{ClusterDescription, Launcher, LauncherFuture, NodeSummary, ProviderError};
use crate::providers::{DEFAULT_TEST_COMMAND, run_suite};

const PROVIDER: &str = "onprem";
const DEFAULT_SSH_PORT: u16 = 22;
const POLL_INTERVAL: Duration = Duration::from_secs(2);
const WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// State persisted in the cluster info document.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
struct OnpremState {
    provider: String,
    deployment_name: String,
    masters: Vec<NodeSummary>,
    agents: Vec<NodeSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ssh_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    test_command: Option<Vec<String>>,
}

/// Inputs captured from the configuration before `create` runs.
#[derive(Clone, Debug)]
struct PendingCluster {
    deployment_name: String,
    num_masters: u32,
    hosts: Vec<String>,
    ssh_user: Option<String>,
    test_command: Option<Vec<String>>,
}

#[derive(Clone, Debug)]
enum Source {
    Config(PendingCluster),
    Info(Value),
}

/// Launcher for the onprem provider.
#[derive(Clone, Debug)]
pub struct OnpremLauncher {
    source: Source,
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl OnpremLauncher {
    /// Builds a launcher that will record a cluster over the configured
    /// hosts.
    #[must_use]
    pub fn from_config(config: &ClusterConfig) -> Self {
        Self {
            source: Source::Config(PendingCluster {
                deployment_name: config.deployment_name.clone(),
                num_masters: config.num_masters,
                hosts: config.hosts.clone(),
                ssh_user: config.ssh_user.clone(),
                test_command: config.test_command.clone(),
            }),
            poll_interval: POLL_INTERVAL,
            wait_timeout: WAIT_TIMEOUT,
        }
    }

    /// Builds a launcher bound to a previously persisted cluster.
    #[must_use]
    pub fn from_info(info: &ClusterInfo) -> Self {
        Self {
            source: Source::Info(info.as_value().clone()),
            poll_interval: POLL_INTERVAL,
            wait_timeout: WAIT_TIMEOUT,
        }
    }

    /// Overrides the readiness polling interval.
    ///
    /// This is primarily used by tests to keep timeout scenarios fast.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Overrides the readiness deadline.
    ///
    /// This is primarily used by tests to keep timeout scenarios fast.
    #[must_use]
    pub const fn with_wait_timeout(mut self, deadline: Duration) -> Self {
        self.wait_timeout = deadline;
        self
    }

    fn state(&self) -> Result<OnpremState, ProviderError> {
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

    async fn wait_for_endpoint(&self, target: &str) -> Result<(), ProviderError> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            match timeout(self.poll_interval, TcpStream::connect(target)).await {
                Ok(Ok(_)) => return Ok(()),
                Ok(Err(err)) => {
                    trace!(%target, error = %err, "ssh endpoint not reachable yet");
                }
                Err(_) => {
                    trace!(%target, "ssh connection attempt timed out");
                }
            }
            if Instant::now() >= deadline {
                return Err(ProviderError::Timeout {
                    what: format!("ssh on {target}"),
                });
            }
            sleep(self.poll_interval).await;
        }
    }
}

impl PendingCluster {
    fn provision(&self) -> Result<OnpremState, ProviderError> {
        if self.hosts.is_empty() {
            return Err(ProviderError::Operation {
                message: String::from("the onprem provider requires a non-empty hosts list"),
            });
        }
        let num_masters = usize::try_from(self.num_masters).map_err(|_| {
            ProviderError::Operation {
                message: String::from("num_masters does not fit this platform"),
            }
        })?;
        if num_masters > self.hosts.len() {
            return Err(ProviderError::Operation {
                message: format!(
                    "hosts lists {} entries but num_masters is {num_masters}",
                    self.hosts.len()
                ),
            });
        }

        let node = |host: &String| NodeSummary {
            public_ip: host.clone(),
            private_ip: None,
        };
        Ok(OnpremState {
            provider: String::from(PROVIDER),
            deployment_name: self.deployment_name.clone(),
            masters: self.hosts.iter().take(num_masters).map(node).collect(),
            agents: self.hosts.iter().skip(num_masters).map(node).collect(),
            ssh_user: self.ssh_user.clone(),
            test_command: self.test_command.clone(),
        })
    }
}

/// Resolves a configured endpoint to a connectable `host:port` target.
fn ssh_target(endpoint: &str) -> String {
    if endpoint.contains(':') {
        endpoint.to_owned()
    } else {
        format!("{endpoint}:{DEFAULT_SSH_PORT}")
    }
}

impl Launcher for OnpremLauncher {
    fn create(&self) -> LauncherFuture<'_, ClusterInfo> {
        Box::pin(async move {
            let Source::Config(pending) = &self.source else {
                return Err(ProviderError::Operation {
                    message: String::from("launcher is already bound to an existing cluster"),
                });
            };
            let state = pending.provision()?;
            info!(
                deployment = %state.deployment_name,
                masters = state.masters.len(),
                agents = state.agents.len(),
                "recorded onprem cluster over pre-provisioned hosts"
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
            for node in state.masters.iter().chain(state.agents.iter()) {
                let target = ssh_target(&node.public_ip);
                debug!(%target, "waiting for ssh");
                self.wait_for_endpoint(&target).await?;
            }
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

    // The hosts are operator-owned, so teardown only relinquishes the
    // recorded handle and is safe at any point of the lifecycle.
    fn delete(&self) -> LauncherFuture<'_, ()> {
        Box::pin(async move {
            let state = self.state()?;
            info!(
                deployment = %state.deployment_name,
                "leaving pre-provisioned hosts in place"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::net::TcpListener;

    fn onprem_config(hosts: Vec<String>, num_masters: u32) -> ClusterConfig {
        ClusterConfig {
            provider: String::from(PROVIDER),
            deployment_name: String::from("lab"),
            num_masters,
            num_agents: 0,
            instance_type: None,
            region: None,
            ssh_user: Some(String::from("ops")),
            hosts,
            test_command: None,
        }
    }

    fn fast(launcher: OnpremLauncher) -> OnpremLauncher {
        launcher
            .with_poll_interval(Duration::from_millis(10))
            .with_wait_timeout(Duration::from_millis(100))
    }

    #[tokio::test]
    async fn create_partitions_hosts_into_roles() {
        let hosts = vec![
            String::from("10.1.0.1"),
            String::from("10.1.0.2"),
            String::from("10.1.0.3"),
        ];
        let launcher = OnpremLauncher::from_config(&onprem_config(hosts, 1));

        let info = launcher
            .create()
            .await
            .unwrap_or_else(|err| panic!("create: {err}"));

        let state: OnpremState = serde_json::from_value(info.as_value().clone())
            .unwrap_or_else(|err| panic!("state: {err}"));
        assert_eq!(state.masters.len(), 1);
        assert_eq!(state.agents.len(), 2);
        assert_eq!(state.ssh_user.as_deref(), Some("ops"));
    }

    #[tokio::test]
    async fn create_requires_hosts() {
        let launcher = OnpremLauncher::from_config(&onprem_config(Vec::new(), 1));

        let err = launcher.create().await.expect_err("no hosts should fail");

        assert!(
            matches!(err, ProviderError::Operation { .. }),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn create_rejects_more_masters_than_hosts() {
        let launcher =
            OnpremLauncher::from_config(&onprem_config(vec![String::from("10.1.0.1")], 3));

        let err = launcher.create().await.expect_err("too few hosts");

        let ProviderError::Operation { ref message } = err else {
            panic!("expected Operation error, got {err}");
        };
        assert!(message.contains("num_masters"), "message: {message}");
    }

    #[tokio::test]
    async fn wait_succeeds_once_endpoints_accept() {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|err| panic!("bind: {err}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|err| panic!("local addr: {err}"));
        let info = ClusterInfo::from_value(json!({
            "provider": PROVIDER,
            "deployment_name": "lab",
            "masters": [{"public_ip": addr.to_string()}],
            "agents": [],
        }));
        let launcher = fast(OnpremLauncher::from_info(&info));

        launcher
            .wait()
            .await
            .unwrap_or_else(|err| panic!("wait: {err}"));
    }

    #[tokio::test]
    async fn wait_times_out_against_a_closed_port() {
        // Bind then drop to obtain a port that is known to refuse.
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|err| panic!("bind: {err}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|err| panic!("local addr: {err}"));
        drop(listener);
        let info = ClusterInfo::from_value(json!({
            "provider": PROVIDER,
            "deployment_name": "lab",
            "masters": [{"public_ip": addr.to_string()}],
            "agents": [],
        }));
        let launcher = fast(OnpremLauncher::from_info(&info));

        let err = launcher.wait().await.expect_err("closed port should time out");

        assert!(
            matches!(err, ProviderError::Timeout { .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn ssh_targets_default_the_port() {
        assert_eq!(ssh_target("10.1.0.1"), "10.1.0.1:22");
        assert_eq!(ssh_target("10.1.0.1:2222"), "10.1.0.1:2222");
    }
}
