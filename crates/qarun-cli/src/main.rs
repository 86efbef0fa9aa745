//! qarun - run quality-assurance sessions in isolated, lock-pinned environments

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser as _;
use qarun_cli::{Cli, handlers};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    handlers::init_logging(&cli);
    handlers::handle(cli).await
}
