//! # strata CLI
//!
//! Runs a command in an isolated container built from a locally stored
//! image. The same binary is re-executed inside the container namespaces
//! to finish setup before the user command starts.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod commands;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;

#[allow(clippy::print_stderr)]
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let failure_status = cli.command.failure_status();
    match commands::execute(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX)),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(failure_status)
        }
    }
}
