//! `graftset` - scaffold projects by composing file trees from several sources
//!
//! Sources (git repositories today; local folders and blob storage are
//! declared but not fetchable) are resolved from a YAML configuration,
//! fetched concurrently, merged into one project directory, and every
//! `*.template` file in the result is rendered from user supplied values.

pub mod cli;
pub mod config;
pub mod error;
pub mod operations;
pub mod sources;
pub mod system;
pub mod template;
pub mod ui;
pub mod utils;

use anyhow::Result;
use cli::{ProjectArgs, ValuesArgs};
use config::SourceConfig;
use operations::{ProjectOperation, ProjectSummary, ValuesOperation};
use sources::SourceService;
use std::sync::Arc;
use system::{RealSystem, System};
use ui::DialoguerPrompter;

/// Build a project on disk, prompting on the terminal when no values file is given
pub fn run_project(args: &ProjectArgs, config_path: &str) -> Result<ProjectSummary> {
    let system: Arc<dyn System> = Arc::new(RealSystem::new());
    let config = SourceConfig::load_from_file(system.as_ref(), config_path)?;
    let sources = SourceService::new(Arc::clone(&system));
    let prompter = DialoguerPrompter::new();

    ProjectOperation::new(args.clone(), config, sources, system.as_ref(), &prompter).execute()
}

/// Return the values the selected templates require, as a YAML document
pub fn run_values(args: &ValuesArgs, config_path: &str) -> Result<String> {
    let system: Arc<dyn System> = Arc::new(RealSystem::new());
    let config = SourceConfig::load_from_file(system.as_ref(), config_path)?;
    let selection = args.selection.selection()?;
    let sources = SourceService::new(system);

    let skeleton = ValuesOperation::new(config, sources, selection).execute()?;
    Ok(skeleton.to_yaml_string()?)
}
