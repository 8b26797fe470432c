//! Values form: one prompt per dotted key
//!
//! The requirement skeleton is flattened into dotted paths, each path is
//! asked for, and the answers are rebuilt into a nested map.

use crate::template::TemplateValues;
use anyhow::{Context as _, Result};
use dialoguer::{Input, theme::ColorfulTheme};
use std::collections::BTreeMap;
use tracing::debug;

/// Collects one answer per dotted key
pub trait Prompter {
    /// Ask for every key of `fields`; the map values are the defaults shown
    ///
    /// Returns the answers keyed by the same dotted paths.
    fn prompt(&self, fields: &BTreeMap<String, String>) -> Result<BTreeMap<String, String>>;
}

/// Terminal prompter built on `dialoguer`
#[derive(Default)]
pub struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl DialoguerPrompter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompter for DialoguerPrompter {
    fn prompt(&self, fields: &BTreeMap<String, String>) -> Result<BTreeMap<String, String>> {
        let mut answers = BTreeMap::new();

        for (key, default) in fields {
            let mut input = Input::<String>::with_theme(&self.theme)
                .with_prompt(key.as_str())
                .allow_empty(true);
            if !default.is_empty() {
                input = input.default(default.clone());
            }
            let answer = input
                .interact_text()
                .with_context(|| format!("Failed to read a value for {key}"))?;
            answers.insert(key.clone(), answer);
        }

        Ok(answers)
    }
}

/// Populate `skeleton` through `prompter`: flatten, ask, rebuild
///
/// Keys the prompter leaves out keep their skeleton value, so no required
/// key is ever dropped.
pub fn populate(skeleton: &TemplateValues, prompter: &dyn Prompter) -> Result<TemplateValues> {
    let fields = skeleton.flatten();
    debug!(fields = fields.len(), "prompting for template values");

    let answers = prompter.prompt(&fields)?;

    let mut values = TemplateValues::rebuild(&fields);
    values.merge_flat(&answers);
    Ok(values)
}
