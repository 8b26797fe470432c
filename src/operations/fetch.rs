//! Fetch-and-merge step shared by every command

use crate::sources::{FetchContext, SafeFs, SourceService};
use crate::system::System;
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};

/// Fetch every resolved source concurrently and merge the results into
/// `root` of `target`
///
/// Successful sources are merged before failures are reported.
///
/// # Errors
///
/// Returns an error if:
/// - Any source failed to fetch (all failures are reported together)
/// - A fetched tree could not be written into the target
pub fn fetch_into(
    sources: &SourceService,
    ctx: &FetchContext,
    target: &dyn System,
    root: &Path,
) -> Result<Vec<String>> {
    let progress = fetch_spinner(sources.targets().len());

    let streams = sources.fetch_all(ctx);
    let safe = SafeFs::new(target);
    let outcome = streams.drain_into(&safe, root);
    progress.finish_and_clear();
    let outcome = outcome?;

    for failure in &outcome.failures {
        error!(source = %failure.alias, "{}", failure.cause);
    }
    let merged = outcome.into_result()?;

    info!(
        sources = merged.len(),
        root = %root.display(),
        "merged sources"
    );
    Ok(merged)
}

fn fetch_spinner(count: usize) -> ProgressBar {
    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        progress.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    progress.set_message(format!("Fetching {count} source(s)..."));
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}
