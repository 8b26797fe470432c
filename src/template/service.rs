//! Template pipeline over a merged file tree
//!
//! discover -> parse -> build skeleton -> populate -> validate -> execute -> finalize

use super::TemplateError;
use super::extract::extract_keys;
use super::parse::{Template, parse};
use super::render::render;
use super::values::TemplateValues;
use crate::system::System;
use crate::ui::{self, Prompter};
use crate::utils::path::{is_template_file, is_within_vcs_dir, strip_template_suffix};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Discovers, analyses and renders the `.template` files of one tree
///
/// Templates are kept sorted by path, so execution and renaming always run
/// in the same order.
pub struct TemplateService<'sys> {
    system: &'sys dyn System,
    discovered: Vec<PathBuf>,
    templates: BTreeMap<PathBuf, Template>,
    skeleton: TemplateValues,
    values: TemplateValues,
    executed: Vec<PathBuf>,
}

impl<'sys> TemplateService<'sys> {
    #[must_use]
    pub fn new(system: &'sys dyn System) -> Self {
        Self {
            system,
            discovered: Vec::new(),
            templates: BTreeMap::new(),
            skeleton: TemplateValues::new(),
            values: TemplateValues::new(),
            executed: Vec::new(),
        }
    }

    /// Find every `.template` file under `root`, skipping `.git` directories
    ///
    /// # Errors
    ///
    /// Returns an error if `root` does not exist or cannot be walked.
    pub fn discover(&mut self, root: &Path) -> Result<&[PathBuf], TemplateError> {
        if !self.system.exists(root) {
            return Err(TemplateError::RootNotFound {
                path: root.to_path_buf(),
            });
        }

        let entries = self
            .system
            .walk_dir(root)
            .map_err(|source| TemplateError::Read {
                path: root.to_path_buf(),
                source,
            })?;

        self.discovered = entries
            .into_iter()
            .filter(|entry| entry.is_file)
            .filter(|entry| !is_within_vcs_dir(&entry.path, root))
            .filter(|entry| is_template_file(&entry.path))
            .map(|entry| entry.path)
            .collect();

        debug!(
            root = %root.display(),
            templates = self.discovered.len(),
            "discovered template files"
        );
        Ok(&self.discovered)
    }

    /// Parse every discovered template; the first failure aborts
    ///
    /// # Errors
    ///
    /// Returns an error if a template cannot be read or has a syntax error.
    pub fn parse_all(&mut self) -> Result<(), TemplateError> {
        for path in &self.discovered {
            let content =
                self.system
                    .read_to_string(path)
                    .map_err(|source| TemplateError::Read {
                        path: path.clone(),
                        source,
                    })?;

            let template =
                parse(&path.display().to_string(), &content).map_err(|err| {
                    TemplateError::Parse {
                        path: path.clone(),
                        line: err.line,
                        message: err.message,
                    }
                })?;

            self.templates.insert(path.clone(), template);
        }

        debug!(templates = self.templates.len(), "parsed templates");
        Ok(())
    }

    /// Build the requirement skeleton from every parsed template
    ///
    /// The skeleton holds every accepted key even when some nodes were
    /// rejected.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::UnsupportedConstructs`] listing every
    /// rejected node across all templates.
    pub fn build_requirement_skeleton(&mut self) -> Result<&TemplateValues, TemplateError> {
        let mut skeleton = TemplateValues::new();
        let mut errors = Vec::new();

        for (path, template) in &self.templates {
            for node in extract_keys(template, &mut skeleton) {
                errors.push(TemplateError::UnsupportedConstruct {
                    path: path.clone(),
                    node,
                });
            }
        }

        self.skeleton = skeleton;
        if errors.is_empty() {
            Ok(&self.skeleton)
        } else {
            Err(TemplateError::UnsupportedConstructs { errors })
        }
    }

    /// Pre-fill skeleton leaves from dotted-path defaults
    pub fn apply_defaults(&mut self, defaults: &BTreeMap<String, String>) -> usize {
        let applied = self.skeleton.apply_defaults(defaults);
        debug!(applied, "applied source set defaults");
        applied
    }

    #[must_use]
    pub const fn skeleton(&self) -> &TemplateValues {
        &self.skeleton
    }

    #[must_use]
    pub const fn values(&self) -> &TemplateValues {
        &self.values
    }

    /// Ask for every skeleton key through `prompter`
    ///
    /// # Errors
    ///
    /// Returns an error if the prompter fails.
    pub fn populate_interactive(&mut self, prompter: &dyn Prompter) -> anyhow::Result<()> {
        self.values = ui::populate(&self.skeleton, prompter)?;
        Ok(())
    }

    /// Use `document` as the values, replacing the skeleton wholesale
    pub fn populate_from_document(&mut self, document: TemplateValues) {
        self.values = document;
    }

    /// Dotted paths `skeleton` requires that `candidate` lacks
    #[must_use]
    pub fn validate(skeleton: &TemplateValues, candidate: &TemplateValues) -> Vec<String> {
        skeleton.missing_keys(candidate)
    }

    /// Render every template in place, still under its `.template` name
    ///
    /// With `fail_on_missing`, the values are checked against the skeleton
    /// first and nothing is written when a key is missing. Otherwise the
    /// first template that needs a missing key fails.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is missing or a template cannot be
    /// rendered or written.
    pub fn execute_all(&mut self, fail_on_missing: bool) -> Result<(), TemplateError> {
        if fail_on_missing {
            let keys = Self::validate(&self.skeleton, &self.values);
            if !keys.is_empty() {
                return Err(TemplateError::MissingValues { keys });
            }
        }

        for (path, template) in &self.templates {
            let rendered = render(path, template, &self.values)?;
            self.system
                .write(path, rendered.as_bytes())
                .map_err(|source| TemplateError::Write {
                    path: path.clone(),
                    source,
                })?;
            debug!(path = %path.display(), "rendered template");
            self.executed.push(path.clone());
        }

        info!(templates = self.executed.len(), "rendered templates");
        Ok(())
    }

    /// Drop the `.template` suffix from every rendered file
    ///
    /// Renames already done are kept when a later one fails.
    ///
    /// # Errors
    ///
    /// Returns an error if a rendered file is missing or cannot be renamed.
    pub fn finalize(&mut self) -> Result<Vec<PathBuf>, TemplateError> {
        let mut finalized = Vec::with_capacity(self.executed.len());

        for from in std::mem::take(&mut self.executed) {
            let to = strip_template_suffix(&from);
            if !self.system.is_file(&from) {
                return Err(TemplateError::Rename {
                    source: io::Error::new(io::ErrorKind::NotFound, "file does not exist"),
                    from,
                    to,
                });
            }
            self.system
                .rename(&from, &to)
                .map_err(|source| TemplateError::Rename {
                    from: from.clone(),
                    to: to.clone(),
                    source,
                })?;
            debug!(from = %from.display(), to = %to.display(), "finalized template");
            finalized.push(to);
        }

        Ok(finalized)
    }
}
