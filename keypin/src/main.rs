use std::process::ExitCode;

use clap::{Parser, Subcommand};
use keypin::{check::CheckArgs, hash::HashArgs};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

#[derive(Debug, Parser)]
#[clap(name = "keypin", version)]
pub struct App {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the pin of certificates before they are deployed
    Hash(HashArgs),
    /// Check a certificate chain against a host and a set of pins
    Check(CheckArgs),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let app = App::parse();
    tracing::debug!(?app, "arguments parsed");

    let result = match app.command {
        Command::Hash(args) => keypin::hash::run(args),
        Command::Check(args) => keypin::check::run(args),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
