//! Project operation coordination

use super::fetch::fetch_into;
use crate::cli::ProjectArgs;
use crate::config::SourceConfig;
use crate::config::yaml::load_values_file;
use crate::sources::{FetchContext, SourceService};
use crate::system::System;
use crate::template::TemplateService;
use crate::ui::Prompter;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What a project run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    pub root: PathBuf,
    /// Aliases of the sources merged (or, for a dry run, that would be)
    pub sources: Vec<String>,
    /// Final paths of the rendered templates
    pub templates: Vec<PathBuf>,
    pub dry_run: bool,
}

/// Builds one project: resolve, fetch, merge, then render templates
#[non_exhaustive]
pub struct ProjectOperation<'src> {
    args: ProjectArgs,
    config: SourceConfig,
    sources: SourceService,
    system: &'src dyn System,
    prompter: &'src dyn Prompter,
    ctx: FetchContext,
}

impl<'src> ProjectOperation<'src> {
    /// `system` is where the project is written; `prompter` is used when no
    /// values file is given
    #[must_use]
    pub fn new(
        args: ProjectArgs,
        config: SourceConfig,
        sources: SourceService,
        system: &'src dyn System,
        prompter: &'src dyn Prompter,
    ) -> Self {
        Self {
            args,
            config,
            sources,
            system,
            prompter,
            ctx: FetchContext::new(),
        }
    }

    #[must_use]
    pub fn with_context(mut self, ctx: FetchContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Execute the project operation
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The selection names an unknown source set, source or auth
    /// - The values file cannot be loaded
    /// - Any source fails to fetch
    /// - A template cannot be parsed, uses an unsupported construct, lacks a
    ///   value, or cannot be written or renamed
    pub fn execute(mut self) -> Result<ProjectSummary> {
        let selection = self.args.selection.selection()?;
        self.sources.resolve(&self.config, &selection)?;
        let root = self.args.project_root();
        let aliases: Vec<String> = self
            .sources
            .targets()
            .iter()
            .map(|t| t.target().alias().to_owned())
            .collect();

        if self.args.dry_run {
            self.preview_operations(&root);
            return Ok(ProjectSummary {
                root,
                sources: aliases,
                templates: Vec::new(),
                dry_run: true,
            });
        }

        // A broken values file should fail before anything is fetched
        let document = match self.args.values_file {
            Some(ref path) => Some(load_values_file(self.system, path)?),
            None => None,
        };

        info!("Building project in {}", root.display());
        let merged = fetch_into(&self.sources, &self.ctx, self.system, &root)?;

        let mut templates = TemplateService::new(self.system);
        templates.discover(&root)?;
        templates.parse_all()?;
        templates.build_requirement_skeleton()?;
        templates.apply_defaults(self.sources.defaults());

        if let Some(document) = document {
            debug!("using values file");
            templates.populate_from_document(document);
        } else {
            templates.populate_interactive(self.prompter)?;
        }

        templates.execute_all(self.args.fail_on_missing)?;
        let rendered = templates.finalize()?;

        info!(
            "Project ready: {} source(s), {} template(s) rendered",
            merged.len(),
            rendered.len()
        );

        Ok(ProjectSummary {
            root,
            sources: merged,
            templates: rendered,
            dry_run: false,
        })
    }

    fn preview_operations(&self, root: &Path) {
        info!("Dry run preview - no files will be modified:");
        info!("");
        info!("Project root: {}", root.display());
        info!("Planned fetches:");

        for (index, bound) in self.sources.targets().iter().enumerate() {
            let target = bound.target();
            let source = &target.source;
            info!("  [{}] {} ({})", index + 1, source.alias, source.source_type);
            if let Some(ref url) = source.url {
                info!("      - Url: {url}");
            }
            info!("      - Path: {}", source.path);
            if let Some(ref reference) = source.reference {
                info!("      - Ref: {reference}");
            }
            if let Some(ref auth) = target.auth {
                info!("      - Auth: {}", auth.auth_alias);
            }
        }

        match self.args.values_file {
            Some(ref path) => info!("Values from: {path}"),
            None => info!("Values from: interactive form"),
        }

        info!("");
        info!("Run without --dry-run to build the project.");
    }
}
