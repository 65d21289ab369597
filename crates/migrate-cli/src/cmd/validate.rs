use anyhow::Context;
use migrate_core::memory::InMemoryStack;
use migrate_core::ScriptRunner;
use std::sync::Arc;

use crate::cmd::{ConfigArgs, RunExit, Selection};
use crate::output::print_reports;
use crate::scripts::CatalogEntry;

/// Run the selected scripts' builder calls and validators only. The stack is
/// never contacted, so no credentials are needed. Unlike `run`, every
/// selected script is checked even after one is invalid.
pub fn run(
    catalog: &[CatalogEntry],
    selection: &Selection,
    config: &ConfigArgs,
    json: bool,
) -> anyhow::Result<()> {
    let entries = selection.resolve(catalog)?;
    let runner = ScriptRunner::new(Arc::new(InMemoryStack::new()))
        .config(config.load().context("failed to load script config")?);

    let rt = tokio::runtime::Runtime::new()?;
    let reports = rt.block_on(async {
        let mut reports = Vec::with_capacity(entries.len());
        for entry in &entries {
            reports.push(runner.validate(&entry.script).await);
        }
        reports
    });

    print_reports(catalog, &reports, json)?;
    match RunExit::from_reports(&reports) {
        Some(exit) => Err(exit.into()),
        None => Ok(()),
    }
}
