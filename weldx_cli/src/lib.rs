// weldx_cli/src/lib.rs

use anyhow::{bail, Context};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

// This prelude is for convenience for other files WITHIN the weldx_cli crate.
pub mod prelude;

pub mod cli;
pub mod commands;
pub mod config;

use crate::cli::{Cli, Command};
use crate::commands::{demo, inspect, transform, validate};
use crate::config::WeldxConfig;

/// Installs the global subscriber. `RUST_LOG` wins over `level`.
///
/// Logs go to stderr so command output on stdout stays clean.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be set (tests, embedding applications).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Loads the configuration and runs one subcommand.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = WeldxConfig::load(&cli.config)
        .with_context(|| format!("invalid configuration in {}", cli.config.display()))?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    init_logging(&config.logging.level);
    debug!("configuration: {:?}", config);

    match cli.command {
        Command::Inspect { file } => {
            let file = commands::load(&file, config.validator())?;
            print!("{}", inspect::inspect(&file)?);
        }
        Command::Validate { path } => {
            let reports = validate::validate_path(&path, config.validator());
            if reports.is_empty() {
                bail!("no .asdf, .yaml or .yml files found at {}", path.display());
            }
            let mut invalid = 0;
            for report in &reports {
                if report.is_valid() {
                    println!("ok      {}", report.path.display());
                } else {
                    invalid += 1;
                    println!("invalid {}", report.path.display());
                    for problem in &report.problems {
                        println!("        {problem}");
                    }
                }
            }
            println!("{} file(s) checked, {} invalid", reports.len(), invalid);
            if invalid > 0 {
                bail!("{invalid} file(s) failed validation");
            }
        }
        Command::Transform {
            file,
            from,
            to,
            csm,
            at,
        } => {
            let file = commands::load(&file, config.validator())?;
            let text = transform::transform(
                &file,
                csm.as_deref(),
                &from,
                &to,
                &at,
                config.interpolation.extrapolate,
            )?;
            print!("{text}");
        }
        Command::Demo { out } => {
            let file = demo::build_demo_file()?;
            file.write(&out)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!("demo file written to {}", out.display());
        }
        Command::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}
