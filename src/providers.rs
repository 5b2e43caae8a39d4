//! Provider launcher implementations.
//!
//! Real cloud backends live behind the same [`crate::launcher::Launcher`]
//! contract; this crate ships the two providers that work without a cloud
//! account. The stub provider synthesizes a cluster in-process and the
//! onprem provider drives a set of pre-provisioned hosts.

pub mod onprem;
pub mod stub;

use std::collections::BTreeMap;

use tokio::process::Command;

use crate::launcher::ProviderError;

/// Provider identities recognised by the launcher factory.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Provider {
    /// Deterministic in-process provider.
    Stub,
    /// Pre-provisioned host provider.
    Onprem,
}

impl Provider {
    /// Parses a provider identity string.
    #[must_use]
    pub fn from_identity(identity: &str) -> Option<Self> {
        match identity {
            "stub" => Some(Self::Stub),
            "onprem" => Some(Self::Onprem),
            _ => None,
        }
    }

    /// Canonical identity string for this provider.
    #[must_use]
    pub const fn identity(self) -> &'static str {
        match self {
            Self::Stub => "stub",
            Self::Onprem => "onprem",
        }
    }
}

/// Validation suite argv used when the configuration does not override it.
pub const DEFAULT_TEST_COMMAND: &str = "pytest";

/// Spawns the validation suite and returns its exit code unchanged.
///
/// The child environment is built solely from `env`; nothing from the
/// invoking process environment is forwarded. `extra_args` are appended
/// after the configured argv.
pub(crate) async fn run_suite(
    command: &[String],
    extra_args: &[String],
    env: &BTreeMap<String, String>,
) -> Result<i32, ProviderError> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| ProviderError::TestRunner {
            message: String::from("test command is empty"),
        })?;

    let status = Command::new(program)
        .args(args)
        .args(extra_args)
        .env_clear()
        .envs(env)
        .status()
        .await
        .map_err(|err| ProviderError::TestRunner {
            message: format!("{program}: {err}"),
        })?;

    status.code().ok_or_else(|| ProviderError::Operation {
        message: String::from("test suite terminated by a signal"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_identities_round_trip() {
        for provider in [Provider::Stub, Provider::Onprem] {
            assert_eq!(Provider::from_identity(provider.identity()), Some(provider));
        }
        assert_eq!(Provider::from_identity("azure"), None);
    }

    #[tokio::test]
    async fn run_suite_preserves_exit_codes() {
        let command = vec![
            String::from("/bin/sh"),
            String::from("-c"),
            String::from("exit 7"),
        ];
        let code = run_suite(&command, &[], &BTreeMap::new())
            .await
            .unwrap_or_else(|err| panic!("run suite: {err}"));
        assert_eq!(code, 7);
    }

    #[tokio::test]
    async fn run_suite_appends_extra_args() {
        let command = vec![
            String::from("/bin/sh"),
            String::from("-c"),
            String::from(r#"test "$1" = "--verbose""#),
            String::from("sh"),
        ];
        let code = run_suite(&command, &[String::from("--verbose")], &BTreeMap::new())
            .await
            .unwrap_or_else(|err| panic!("run suite: {err}"));
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn run_suite_forwards_only_the_given_environment() {
        // HOME is set for the test process; with env_clear it must not reach
        // the child. FORWARDED comes solely from the allowlist map.
        let command = vec![
            String::from("/bin/sh"),
            String::from("-c"),
            String::from(r#"test -z "${HOME:-}" && test "${FORWARDED:-}" = "yes""#),
        ];
        let mut env = BTreeMap::new();
        env.insert(String::from("FORWARDED"), String::from("yes"));
        let code = run_suite(&command, &[], &env)
            .await
            .unwrap_or_else(|err| panic!("run suite: {err}"));
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn run_suite_rejects_an_empty_command() {
        let err = run_suite(&[], &[], &BTreeMap::new())
            .await
            .expect_err("empty command should fail");
        assert!(
            matches!(err, ProviderError::TestRunner { .. }),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn run_suite_reports_unstartable_programs() {
        let command = vec![String::from("/nonexistent/skylift-test-runner")];
        let err = run_suite(&command, &[], &BTreeMap::new())
            .await
            .expect_err("missing program should fail");
        assert!(
            matches!(err, ProviderError::TestRunner { .. }),
            "unexpected error: {err}"
        );
    }
}
