// weldx_cli/src/main.rs

use clap::Parser;
use weldx_cli::cli::Cli;

fn main() -> anyhow::Result<()> {
    weldx_cli::run(Cli::parse())
}
