use anyhow::Context;
use migrate_core::{MigrationScript, RunnerOptions, ScriptRunner};
use std::sync::Arc;

use crate::cmd::{ConfigArgs, RunExit, Selection, StackArgs};
use crate::output::print_reports;
use crate::scripts::CatalogEntry;

pub fn run(
    catalog: &[CatalogEntry],
    selection: &Selection,
    stack: &StackArgs,
    config: &ConfigArgs,
    max_attempts: u32,
    json: bool,
) -> anyhow::Result<()> {
    let entries = selection.resolve(catalog)?;
    let settings = stack.settings()?;
    let client = stack_client::connect(stack.host.as_deref(), &settings)
        .context("failed to build stack client")?;

    let runner = ScriptRunner::new(Arc::new(client))
        .settings(settings)
        .config(config.load().context("failed to load script config")?)
        .options(RunnerOptions { max_attempts });

    let scripts: Vec<&dyn MigrationScript> = entries
        .iter()
        .map(|e| &e.script as &dyn MigrationScript)
        .collect();

    let rt = tokio::runtime::Runtime::new()?;
    let reports = rt.block_on(runner.run_batch(&scripts));

    print_reports(catalog, &reports, json)?;
    match RunExit::from_reports(&reports) {
        Some(exit) => Err(exit.into()),
        None => Ok(()),
    }
}
