use crate::config::{ResolutionError, Selection};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Environment variable naming the source configuration file
pub const SOURCE_CONFIG_ENV: &str = "GRAFTSET_SOURCE_CONFIG";

/// Command-line arguments for graftset
#[derive(Parser, Debug, Clone)]
#[command(name = "graftset")]
#[command(about = "Scaffold projects by composing file trees from multiple sources")]
#[command(long_about = None)]
#[command(version)]
pub struct Args {
    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Source configuration file [default: ~/.graftset/sources.yaml]
    #[arg(
        short = 's',
        long = "source-config",
        value_name = "PATH",
        global = true,
        env = SOURCE_CONFIG_ENV
    )]
    pub source_config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Path of the source configuration, falling back to the home directory
    #[must_use]
    pub fn source_config_path(&self) -> String {
        self.source_config
            .clone()
            .unwrap_or_else(default_source_config_path)
    }
}

/// `~/.graftset/sources.yaml`, or a relative path when there is no home
#[must_use]
pub fn default_source_config_path() -> String {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".graftset")
        .join("sources.yaml")
        .display()
        .to_string()
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch the selected sources into a new project and render its templates
    Project(ProjectArgs),

    /// Print the values the selected sources' templates require, as YAML
    Values(ValuesArgs),
}

/// Which sources to build: a source set or an explicit list
#[derive(clap::Args, Debug, Clone, Default)]
#[group(required = true, multiple = false)]
pub struct SelectionArgs {
    /// Source set (defined in the source configuration) to build
    #[arg(long = "source-set", value_name = "ALIAS")]
    pub source_set: Option<String>,

    /// Comma-separated sources (defined in the source configuration) to build
    #[arg(long, value_name = "ALIAS", value_delimiter = ',')]
    pub sources: Vec<String>,
}

impl SelectionArgs {
    pub fn selection(&self) -> Result<Selection, ResolutionError> {
        Selection::from_parts(self.source_set.clone(), self.sources.clone())
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Directory the sources are rendered into
    #[arg(short, long, value_name = "PATH")]
    pub output_path: PathBuf,

    /// Name of the new project
    #[arg(short, long, value_name = "NAME")]
    pub project_name: Option<String>,

    /// Build the project in <output-path>/<project-name>
    #[arg(
        short,
        long,
        value_name = "BOOL",
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub append_name: bool,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// YAML document with the template values (skips the interactive form)
    #[arg(short = 'f', long, value_name = "PATH")]
    pub values_file: Option<String>,

    /// Check every required value before rendering anything
    #[arg(long)]
    pub fail_on_missing: bool,

    /// Print the resolved plan without fetching or writing
    #[arg(long)]
    pub dry_run: bool,
}

impl ProjectArgs {
    /// Where the project is built: the output path, plus the project name
    /// when it is set and appending is enabled
    #[must_use]
    pub fn project_root(&self) -> PathBuf {
        match self.project_name.as_deref() {
            Some(name) if self.append_name && !name.is_empty() => self.output_path.join(name),
            _ => self.output_path.clone(),
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct ValuesArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("graftset").chain(argv.iter().copied()))
    }

    #[test]
    fn project_with_source_set() {
        let args = parse(&["project", "-o", "/out", "-p", "demo", "--source-set", "web"]).unwrap();
        let Command::Project(project) = args.command else {
            panic!("expected project command");
        };
        assert_eq!(
            project.selection.selection().unwrap(),
            Selection::SourceSet("web".to_owned())
        );
        assert!(project.append_name);
        assert_eq!(project.project_root(), PathBuf::from("/out/demo"));
    }

    #[test]
    fn append_name_can_be_disabled() {
        let args = parse(&[
            "project",
            "-o",
            "/out",
            "-p",
            "demo",
            "--append-name=false",
            "--sources",
            "a,b",
        ])
        .unwrap();
        let Command::Project(project) = args.command else {
            panic!("expected project command");
        };
        assert_eq!(project.project_root(), PathBuf::from("/out"));
        assert_eq!(
            project.selection.selection().unwrap(),
            Selection::Sources(vec!["a".to_owned(), "b".to_owned()])
        );
    }

    #[test]
    fn selection_is_required_and_exclusive() {
        assert!(parse(&["values"]).is_err());
        assert!(parse(&["values", "--source-set", "x", "--sources", "a"]).is_err());
        assert!(parse(&["values", "--sources", "a"]).is_ok());
    }

    #[test]
    fn output_path_is_required() {
        assert!(parse(&["project", "--source-set", "x"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = parse(&[
            "values",
            "--sources",
            "a",
            "-v",
            "--source-config",
            "/cfg.yaml",
        ])
        .unwrap();
        assert!(args.verbose);
        assert_eq!(args.source_config_path(), "/cfg.yaml");
    }
}
