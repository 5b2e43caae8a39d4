//! Declarative cluster configuration loading and validation.
//!
//! The configuration is a YAML document naming the provider to drive and the
//! shape of the cluster to build. It is read once by `create`, validated as a
//! whole, and never persisted; the durable handle written afterwards is the
//! cluster info document, not the config.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::Deserialize;
use std::io;
use thiserror::Error;

fn default_num_masters() -> u32 {
    1
}

/// Validated description of the cluster to build.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ClusterConfig {
    /// Identity of the provisioning provider (for example `stub` or
    /// `onprem`).
    pub provider: String,
    /// Human readable deployment name, used to label provider resources.
    pub deployment_name: String,
    /// Number of master nodes. Must be at least one.
    #[serde(default = "default_num_masters")]
    pub num_masters: u32,
    /// Number of agent nodes.
    #[serde(default)]
    pub num_agents: u32,
    /// Provider-specific machine flavour for new nodes.
    #[serde(default)]
    pub instance_type: Option<String>,
    /// Provider-specific placement region or zone.
    #[serde(default)]
    pub region: Option<String>,
    /// Login user for SSH access to cluster nodes.
    #[serde(default)]
    pub ssh_user: Option<String>,
    /// Pre-provisioned `host` or `host:port` endpoints, consumed by the
    /// onprem provider instead of creating machines.
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Override for the validation suite argv run by `pytest`.
    #[serde(default)]
    pub test_command: Option<Vec<String>>,
}

impl ClusterConfig {
    /// Reads and validates the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] when the file is absent,
    /// [`ConfigError::Parse`] when it is not well-formed YAML matching the
    /// schema, and [`ConfigError::Invalid`] when semantic validation fails.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = read_file(path)?;
        let config: Self = serde_yaml::from_str(&contents).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Performs semantic validation, collecting every offending field so the
    /// operator can fix the file in one pass.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming all fields that failed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut fields = Vec::new();
        if self.provider.trim().is_empty() {
            fields.push(String::from("provider"));
        }
        if !is_valid_deployment_name(&self.deployment_name) {
            fields.push(String::from("deployment_name"));
        }
        if self.num_masters == 0 {
            fields.push(String::from("num_masters"));
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { fields })
        }
    }
}

/// Deployment names label provider resources, so they are restricted to
/// DNS-friendly characters.
fn is_valid_deployment_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
}

fn read_file(path: &Utf8Path) -> Result<String, ConfigError> {
    let parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| ConfigError::NotFound {
        path: path.to_path_buf(),
    })?;

    let dir = match Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Err(err) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                message: err.to_string(),
            });
        }
    };

    match dir.read_to_string(file_name) {
        Ok(contents) => Ok(contents),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        }),
        Err(err) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            message: err.to_string(),
        }),
    }
}

/// Errors raised while loading or validating a cluster configuration.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Raised when no configuration file exists at the given path.
    #[error("config file not found at {path}")]
    NotFound {
        /// Path that was probed.
        path: Utf8PathBuf,
    },
    /// Raised when the file exists but cannot be read.
    #[error("failed to read config at {path}: {message}")]
    Read {
        /// Path that could not be read.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when the content is not valid YAML matching the schema.
    #[error("failed to parse config at {path}: {message}")]
    Parse {
        /// Path that could not be parsed.
        path: Utf8PathBuf,
        /// Diagnostic from the YAML parser.
        message: String,
    },
    /// Raised when semantic validation rejects one or more fields.
    #[error("invalid configuration fields: {}", fields.join(", "))]
    Invalid {
        /// Every field that failed validation.
        fields: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use tempfile::TempDir;

    fn write_config(tmp: &TempDir, contents: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(tmp.path().join("config.yaml"))
            .unwrap_or_else(|err| panic!("temp path should be utf8: {}", err.display()));
        std::fs::write(&path, contents).unwrap_or_else(|err| panic!("write config: {err}"));
        path
    }

    #[fixture]
    fn valid_config() -> ClusterConfig {
        ClusterConfig {
            provider: String::from("stub"),
            deployment_name: String::from("ci-smoke"),
            num_masters: 1,
            num_agents: 2,
            instance_type: None,
            region: None,
            ssh_user: None,
            hosts: Vec::new(),
            test_command: None,
        }
    }

    #[rstest]
    fn load_parses_a_minimal_document(valid_config: ClusterConfig) {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let path = write_config(
            &tmp,
            "provider: stub\ndeployment_name: ci-smoke\nnum_agents: 2\n",
        );

        let config = ClusterConfig::load(&path).unwrap_or_else(|err| panic!("load: {err}"));

        assert_eq!(config, valid_config);
    }

    #[test]
    fn load_reports_missing_file() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let path = Utf8PathBuf::from_path_buf(tmp.path().join("absent.yaml"))
            .unwrap_or_else(|err| panic!("temp path should be utf8: {}", err.display()));

        let err = ClusterConfig::load(&path).expect_err("missing file should fail");

        assert!(
            matches!(err, ConfigError::NotFound { .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn load_reports_malformed_yaml_with_path() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let path = write_config(&tmp, "provider: [unclosed\n");

        let err = ClusterConfig::load(&path).expect_err("malformed yaml should fail");

        let ConfigError::Parse { path: ref p, .. } = err else {
            panic!("expected Parse error, got {err}");
        };
        assert_eq!(p, &path);
    }

    #[test]
    fn load_rejects_unknown_fields() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let path = write_config(
            &tmp,
            "provider: stub\ndeployment_name: ci\nnum_maters: 3\n",
        );

        let err = ClusterConfig::load(&path).expect_err("typoed field should fail");

        assert!(
            matches!(err, ConfigError::Parse { .. }),
            "unexpected error: {err}"
        );
    }

    #[rstest]
    fn validate_collects_every_offending_field(valid_config: ClusterConfig) {
        let config = ClusterConfig {
            provider: String::new(),
            deployment_name: String::from("has spaces"),
            num_masters: 0,
            ..valid_config
        };

        let err = config.validate().expect_err("validation should fail");

        let ConfigError::Invalid { fields } = err else {
            panic!("expected Invalid error");
        };
        assert_eq!(fields, ["provider", "deployment_name", "num_masters"]);
    }

    #[rstest]
    #[case("ci-smoke", true)]
    #[case("a1", true)]
    #[case("", false)]
    #[case("under_score", false)]
    #[case("space name", false)]
    fn deployment_name_charset(#[case] name: &str, #[case] ok: bool) {
        assert_eq!(is_valid_deployment_name(name), ok, "name: {name:?}");
    }
}
