//! Process-wide logging setup.
//!
//! Initialized exactly once at entry; the process is short-lived so there is
//! no reinitialization path. Events go to standard error so command output
//! on standard output stays consumable by scripts.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

/// Maps the CLI level onto a tracing filter. `critical` has no direct
/// equivalent and collapses onto `error`.
#[must_use]
pub const fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Critical | LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warning => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    }
}

/// Installs the global subscriber at the requested level.
///
/// `RUST_LOG` may refine the filter per target. Repeated calls are ignored,
/// which keeps the function safe under test harnesses that share a process.
pub fn init(level: LogLevel) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_filter(level).into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_collapses_onto_error() {
        assert_eq!(level_filter(LogLevel::Critical), LevelFilter::ERROR);
        assert_eq!(level_filter(LogLevel::Error), LevelFilter::ERROR);
    }

    #[test]
    fn remaining_levels_map_one_to_one() {
        assert_eq!(level_filter(LogLevel::Warning), LevelFilter::WARN);
        assert_eq!(level_filter(LogLevel::Info), LevelFilter::INFO);
        assert_eq!(level_filter(LogLevel::Debug), LevelFilter::DEBUG);
        assert_eq!(level_filter(LogLevel::Trace), LevelFilter::TRACE);
    }

    #[test]
    fn init_is_idempotent() {
        init(LogLevel::Info);
        init(LogLevel::Debug);
    }
}
