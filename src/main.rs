//! # `graftset`
//!
//! `graftset` builds a new project out of several reusable file trees.
//! Each tree ("source") is described once in `~/.graftset/sources.yaml`;
//! named groups of sources ("source sets") make up project templates.
//!
//! ## Usage
//!
//! **Build a project from a source set:**
//! ```sh
//! graftset project -o ./work -p my-service --source-set rust-service
//! ```
//!
//! **Build from explicit sources with a values file:**
//! ```sh
//! graftset project -o ./work -p my-service --sources base,ci -f values.yaml
//! ```
//!
//! **List the values a source set needs:**
//! ```sh
//! graftset values --source-set rust-service > values.yaml
//! ```
//!
//! PATs can be supplied through `GRAFTSET_<AUTH_ALIAS>_PAT` instead of the
//! configuration file.

use clap::Parser as _;
use graftset::cli::{Args, Command};
use graftset::error::exit_code_for;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    let args = Args::parse();

    // `values` writes YAML to stdout; keep the log quiet unless asked
    let log_level = if matches!(args.command, Command::Values(_)) && !args.verbose {
        "error"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = args.source_config_path();
    let result = match args.command {
        Command::Project(ref project) => graftset::run_project(project, &config_path).map(|_| ()),
        Command::Values(ref values) => {
            graftset::run_values(values, &config_path).map(|yaml| print!("{yaml}"))
        }
    };

    if let Err(err) = result {
        error!("{err:#}");
        std::process::exit(exit_code_for(&err));
    }
}
