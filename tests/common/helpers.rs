//! Shared helpers for CLI behavioural tests.

use std::path::PathBuf;

use serde_json::json;
use tempfile::TempDir;

/// Minimal valid configuration for the stub provider.
pub const STUB_CONFIG: &str = "provider: stub\ndeployment_name: ci-smoke\nnum_agents: 2\n";

pub fn config_path(tmp: &TempDir) -> PathBuf {
    tmp.path().join("config.yaml")
}

pub fn info_path(tmp: &TempDir) -> PathBuf {
    tmp.path().join("cluster_info.json")
}

pub fn write_stub_config(tmp: &TempDir) -> PathBuf {
    let path = config_path(tmp);
    std::fs::write(&path, STUB_CONFIG).unwrap_or_else(|err| panic!("write config: {err}"));
    path
}

/// Writes a cluster info document for the stub provider with the given
/// validation-suite argv.
pub fn write_stub_info(tmp: &TempDir, test_command: &[&str]) -> PathBuf {
    let path = info_path(tmp);
    let value = json!({
        "provider": "stub",
        "cluster_id": "11111111-2222-3333-4444-555555555555",
        "deployment_name": "ci-smoke",
        "masters": [{"public_ip": "203.0.113.1", "private_ip": "10.0.0.1"}],
        "agents": [],
        "test_command": test_command,
    });
    std::fs::write(&path, value.to_string())
        .unwrap_or_else(|err| panic!("write info: {err}"));
    path
}
