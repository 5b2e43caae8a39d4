//! Command dispatch.
//!
//! Each subcommand is a single transition from parsed invocation to terminal
//! exit code: enforce the info-path precondition, build the right launcher,
//! invoke one lifecycle operation, and translate the outcome. There are no
//! retries at this layer; anything recoverable is reported through
//! [`LaunchError`] and caught once in `main`.

use std::collections::BTreeMap;
use std::env;
use std::io::{self, Write};

use crate::cli::{
    Command, CreateCommand, DeleteCommand, DescribeCommand, PytestCommand, WaitCommand,
};
use crate::config::ClusterConfig;
use crate::error::LaunchError;
use crate::info;
use crate::launcher::{launcher_from_config, launcher_from_info};

/// Executes one subcommand and returns the process exit code.
///
/// # Errors
///
/// Returns [`LaunchError`] for every recoverable failure; the caller prints
/// it once and exits 1.
pub async fn run(command: Command) -> Result<i32, LaunchError> {
    match command {
        Command::Create(args) => create(args).await,
        Command::Wait(args) => wait(args).await,
        Command::Describe(args) => describe(args).await,
        Command::Pytest(args) => pytest(args).await,
        Command::Delete(args) => delete(args).await,
    }
}

async fn create(args: CreateCommand) -> Result<i32, LaunchError> {
    if info::exists(&args.info_path)? {
        return Err(LaunchError::InputConflict {
            path: args.info_path,
        });
    }

    let config = ClusterConfig::load(&args.config_path)?;
    let launcher = launcher_from_config(&config)?;
    let cluster_info = launcher.create().await?;
    info::write(&args.info_path, &cluster_info)?;
    tracing::info!(path = %args.info_path, "cluster info written");
    Ok(0)
}

async fn wait(args: WaitCommand) -> Result<i32, LaunchError> {
    let cluster_info = info::read(&args.info_path)?;
    let launcher = launcher_from_info(&cluster_info)?;
    launcher.wait().await?;
    writeln!(io::stdout(), "Cluster is ready!").ok();
    Ok(0)
}

async fn describe(args: DescribeCommand) -> Result<i32, LaunchError> {
    let cluster_info = info::read(&args.info_path)?;
    let launcher = launcher_from_info(&cluster_info)?;
    let description = launcher.describe().await?;
    let value = serde_json::to_value(&description).map_err(|err| LaunchError::Storage {
        message: err.to_string(),
    })?;
    writeln!(io::stdout(), "{}", info::to_canonical_json(&value)?).ok();
    Ok(0)
}

async fn pytest(args: PytestCommand) -> Result<i32, LaunchError> {
    let cluster_info = info::read(&args.info_path)?;
    let launcher = launcher_from_info(&cluster_info)?;
    let env_map = env_allowlist(args.env.as_deref())?;
    let code = launcher.test(&args.extras, &env_map).await?;
    Ok(code)
}

async fn delete(args: DeleteCommand) -> Result<i32, LaunchError> {
    let cluster_info = info::read(&args.info_path)?;
    let launcher = launcher_from_info(&cluster_info)?;
    launcher.delete().await?;
    tracing::info!(path = %args.info_path, "cluster deleted; info file left in place");
    Ok(0)
}

/// Builds the test-run environment from a comma-delimited allowlist of
/// variable names, resolved against the current process environment.
///
/// # Errors
///
/// Returns [`LaunchError::EnvAssignment`] when the list contains `=` and
/// [`LaunchError::MissingEnvVars`] naming every listed variable that is not
/// set.
pub fn env_allowlist(raw: Option<&str>) -> Result<BTreeMap<String, String>, LaunchError> {
    env_allowlist_from(raw, |name| env::var(name).ok())
}

fn env_allowlist_from(
    raw: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<BTreeMap<String, String>, LaunchError> {
    let Some(list) = raw else {
        return Ok(BTreeMap::new());
    };
    if list.contains('=') {
        // The operator tried an assignment rather than an allowlist.
        return Err(LaunchError::EnvAssignment);
    }

    let mut resolved = BTreeMap::new();
    let mut missing = Vec::new();
    for name in list.split(',') {
        match lookup(name) {
            Some(value) => {
                resolved.insert(name.to_owned(), value);
            }
            None => missing.push(name.to_owned()),
        }
    }
    if missing.is_empty() {
        Ok(resolved)
    } else {
        Err(LaunchError::MissingEnvVars { names: missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_env(name: &str) -> Option<String> {
        match name {
            "CLUSTER_URL" => Some(String::from("https://cluster.example")),
            "SSH_KEY" => Some(String::from("/tmp/key")),
            _ => None,
        }
    }

    #[test]
    fn no_allowlist_yields_an_empty_environment() {
        let env = env_allowlist_from(None, fake_env)
            .unwrap_or_else(|err| panic!("allowlist: {err}"));
        assert!(env.is_empty());
    }

    #[test]
    fn allowlist_resolves_values_from_the_environment() {
        let env = env_allowlist_from(Some("CLUSTER_URL,SSH_KEY"), fake_env)
            .unwrap_or_else(|err| panic!("allowlist: {err}"));

        assert_eq!(env.len(), 2);
        assert_eq!(
            env.get("CLUSTER_URL").map(String::as_str),
            Some("https://cluster.example")
        );
    }

    #[test]
    fn assignment_syntax_is_rejected_before_lookup() {
        let err = env_allowlist_from(Some("CLUSTER_URL=https://x"), fake_env)
            .expect_err("assignment should fail");
        assert!(matches!(err, LaunchError::EnvAssignment));
    }

    #[test]
    fn missing_variables_are_reported_together() {
        let err = env_allowlist_from(Some("CLUSTER_URL,ABSENT_ONE,ABSENT_TWO"), fake_env)
            .expect_err("missing variables should fail");

        let LaunchError::MissingEnvVars { names } = err else {
            panic!("expected MissingEnvVars");
        };
        assert_eq!(names, ["ABSENT_ONE", "ABSENT_TWO"]);
    }
}
