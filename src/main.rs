//! Binary entry point for the skylift CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;

use skylift::cli::Cli;
use skylift::error::LaunchError;
use skylift::{dispatch, logging};

const ERROR_BANNER: &str = "skylift encountered an error!";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_level);

    let exit_code = match dispatch::run(cli.command).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn report_error(err: &LaunchError) {
    write_error(io::stdout(), err);
}

fn write_error(mut target: impl Write, err: &LaunchError) {
    writeln!(target, "{ERROR_BANNER}").ok();
    writeln!(target, "{}: {err}", err.kind()).ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn write_error_prints_banner_kind_and_message() {
        let mut buf = Vec::new();
        let err = LaunchError::InputConflict {
            path: Utf8PathBuf::from("cluster_info.json"),
        };

        write_error(&mut buf, &err);

        let rendered = String::from_utf8(buf).unwrap_or_else(|err| panic!("utf8: {err}"));
        let mut lines = rendered.lines();
        assert_eq!(lines.next(), Some(ERROR_BANNER));
        let detail = lines.next().unwrap_or_default();
        assert!(detail.starts_with("InputConflict: "), "detail: {detail}");
        assert!(detail.contains("cluster_info.json"), "detail: {detail}");
    }
}
