// weldx_cli/src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// weldx: inspect, validate and query welding experiment files.
///
/// This struct defines the command-line arguments of the `weldx` binary.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the configuration TOML file.
    #[arg(short, long, default_value = "assets/config/weldx.toml")]
    pub config: PathBuf,

    /// Overrides the configured log level (e.g. `debug` or `weldx_core=trace`).
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the entries of a file and print coordinate system trees.
    Inspect { file: PathBuf },

    /// Validate a file, or every `.asdf`/`.yaml`/`.yml` file below a directory.
    Validate { path: PathBuf },

    /// Print the transformation of one coordinate system in another.
    Transform {
        file: PathBuf,
        /// The coordinate system to express.
        #[arg(long)]
        from: String,
        /// The reference coordinate system.
        #[arg(long)]
        to: String,
        /// Top-level entry holding the hierarchy (defaults to the first one found).
        #[arg(long)]
        csm: Option<String>,
        /// Times in seconds to sample time-dependent transformations at.
        #[arg(long, num_args = 1..)]
        at: Vec<f64>,
    },

    /// Write an example file with a moving torch over a seam.
    Demo { out: PathBuf },

    /// Print the effective configuration as TOML.
    Config,
}
