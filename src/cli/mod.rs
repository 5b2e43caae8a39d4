//! Command-line interface definitions for the `skylift` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};

/// Top-level CLI for the `skylift` binary.
#[derive(Debug, Parser)]
#[command(
    name = "skylift",
    about = "Provision, inspect, and tear down compute clusters",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Verbosity of diagnostic output.
    #[arg(
        short = 'L',
        long = "log-level",
        global = true,
        value_enum,
        default_value_t = LogLevel::Info
    )]
    pub log_level: LogLevel,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands exposed by the CLI.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the cluster described by the configuration file and dump its
    /// handle to the info path for use by the other subcommands.
    #[command(name = "create")]
    Create(CreateCommand),
    /// Block until the cluster is up and running.
    #[command(name = "wait")]
    Wait(WaitCommand),
    /// Print additional information about the composition of the cluster.
    #[command(name = "describe")]
    Describe(DescribeCommand),
    /// Run the integration test suite against the cluster.
    #[command(name = "pytest")]
    Pytest(PytestCommand),
    /// Destroy the provided cluster deployment.
    #[command(name = "delete")]
    Delete(DeleteCommand),
}

/// Arguments for the `skylift create` subcommand.
#[derive(Debug, Parser)]
pub struct CreateCommand {
    /// Path of the config to create the cluster from.
    #[arg(short = 'c', long = "config-path", default_value = "config.yaml")]
    pub config_path: Utf8PathBuf,

    /// JSON file output by create and consumed by wait, describe, pytest,
    /// and delete.
    #[arg(short = 'i', long = "info-path", default_value = "cluster_info.json")]
    pub info_path: Utf8PathBuf,
}

/// Arguments for the `skylift wait` subcommand.
#[derive(Debug, Parser)]
pub struct WaitCommand {
    /// JSON file output by a previous create.
    #[arg(short = 'i', long = "info-path", default_value = "cluster_info.json")]
    pub info_path: Utf8PathBuf,
}

/// Arguments for the `skylift describe` subcommand.
#[derive(Debug, Parser)]
pub struct DescribeCommand {
    /// JSON file output by a previous create.
    #[arg(short = 'i', long = "info-path", default_value = "cluster_info.json")]
    pub info_path: Utf8PathBuf,
}

/// Arguments for the `skylift pytest` subcommand.
#[derive(Debug, Parser)]
pub struct PytestCommand {
    /// JSON file output by a previous create.
    #[arg(short = 'i', long = "info-path", default_value = "cluster_info.json")]
    pub info_path: Utf8PathBuf,

    /// Comma-delimited list of environment variables to pass from the local
    /// environment into the test environment.
    #[arg(short = 'e', long = "env", value_name = "VAR1,VAR2,...")]
    pub env: Option<String>,

    /// Extra options and arguments forwarded verbatim to the test suite
    /// (separate them with --).
    #[arg(last = true, value_name = "EXTRA_ARGS")]
    pub extras: Vec<String>,
}

/// Arguments for the `skylift delete` subcommand.
#[derive(Debug, Parser)]
pub struct DeleteCommand {
    /// JSON file output by a previous create.
    #[arg(short = 'i', long = "info-path", default_value = "cluster_info.json")]
    pub info_path: Utf8PathBuf,
}

/// Log levels accepted by the `-L` option.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum LogLevel {
    /// Only unrecoverable failures.
    Critical,
    /// Errors.
    Error,
    /// Warnings and errors.
    Warning,
    /// Routine progress output.
    #[default]
    Info,
    /// Verbose diagnostics.
    Debug,
    /// Very verbose diagnostics.
    Trace,
}
