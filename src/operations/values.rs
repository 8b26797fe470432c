//! Values operation: report the keys the selected templates require

use super::fetch::fetch_into;
use crate::config::{Selection, SourceConfig};
use crate::sources::{FetchContext, SourceService};
use crate::system::MemorySystem;
use crate::template::{TemplateError, TemplateService, TemplateValues};
use anyhow::Result;
use std::path::Path;
use tracing::warn;

/// Scratch root the sources are merged into; never touches the disk
const SCRATCH_ROOT: &str = "temp";

/// Fetches the selection into memory and builds its requirement skeleton
#[non_exhaustive]
pub struct ValuesOperation {
    config: SourceConfig,
    sources: SourceService,
    selection: Selection,
    ctx: FetchContext,
}

impl ValuesOperation {
    #[must_use]
    pub fn new(config: SourceConfig, sources: SourceService, selection: Selection) -> Self {
        Self {
            config,
            sources,
            selection,
            ctx: FetchContext::new(),
        }
    }

    #[must_use]
    pub fn with_context(mut self, ctx: FetchContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Return the requirement skeleton, pre-filled with source set defaults
    ///
    /// Unsupported constructs are logged and skipped so that every
    /// extractable key is still reported.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution or any fetch fails, or a template
    /// cannot be read or parsed.
    pub fn execute(mut self) -> Result<TemplateValues> {
        self.sources.resolve(&self.config, &self.selection)?;

        let scratch = MemorySystem::new();
        let root = Path::new(SCRATCH_ROOT);
        fetch_into(&self.sources, &self.ctx, &scratch, root)?;

        let mut templates = TemplateService::new(&scratch);
        templates.discover(root)?;
        templates.parse_all()?;
        match templates.build_requirement_skeleton() {
            Ok(_) => {}
            Err(TemplateError::UnsupportedConstructs { errors }) => {
                for err in &errors {
                    warn!("{err}");
                }
            }
            Err(other) => return Err(other.into()),
        }
        templates.apply_defaults(self.sources.defaults());

        Ok(templates.skeleton().clone())
    }
}
