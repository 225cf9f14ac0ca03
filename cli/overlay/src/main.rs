//! Overlay CLI: resolve launcher manifests against local artifact overrides.

mod commands;
mod config;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::OverlayConfig;

#[derive(Parser)]
#[command(name = "overlay", version, about = "Local artifact-overlay resolver")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Launcher base directory (default: ~/.runelite)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
    /// Configuration file (default: nearest overlay.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a launcher manifest with local overrides
    Resolve {
        /// Input manifest (JSON)
        #[arg(long)]
        manifest: PathBuf,
        /// Write the reconciled manifest here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Write the manifest even if some artifacts fail verification
        #[arg(long)]
        allow_mismatch: bool,
        /// Launch arguments to patch
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Show cached artifacts, overrides and snapshots
    Inspect {
        /// Preview where each artifact of this manifest would resolve from
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Print the content hash of a file
    Hash {
        /// File to hash
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// Log to stderr so stdout carries only command output.
///
/// `RUST_LOG` takes precedence over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Resolve {
            manifest,
            output,
            allow_mismatch,
            args,
        } => {
            let config = OverlayConfig::resolve(cli.config.as_deref(), &cwd)?;
            commands::resolve::run(
                config.reconcile_config(cli.base_dir.as_deref())?,
                &manifest,
                output.as_deref(),
                &args,
                allow_mismatch,
            )
        }

        Commands::Inspect { manifest } => {
            let config = OverlayConfig::resolve(cli.config.as_deref(), &cwd)?;
            let layout = config.layout(cli.base_dir.as_deref())?;
            commands::inspect::run(&layout, manifest.as_deref())
        }

        Commands::Hash { file } => commands::hash::run(&file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn resolve_collects_trailing_args() {
        let cli = Cli::try_parse_from([
            "overlay",
            "--base-dir",
            "/tmp/base",
            "resolve",
            "--manifest",
            "bootstrap.json",
            "--",
            "--debug",
            "--no-developer-mode",
        ])
        .unwrap();
        assert_eq!(cli.base_dir, Some(PathBuf::from("/tmp/base")));
        match cli.command {
            Commands::Resolve { manifest, args, .. } => {
                assert_eq!(manifest, PathBuf::from("bootstrap.json"));
                assert_eq!(args, vec!["--debug", "--no-developer-mode"]);
            }
            _ => panic!("expected resolve"),
        }
    }
}
