//! Script runner.
//!
//! One script, one [`RunContext`]: the script body declares its changes,
//! every dispatched action is validated, and only a clean script has its
//! task groups executed. Errors never escape as `Err`; they end up as
//! [`Diagnostic`]s on the returned [`ScriptReport`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::action::{ActionKind, SourceLocation};
use crate::client::StackClient;
use crate::config::{ScriptConfig, StackSettings};
use crate::diagnostics::Diagnostic;
use crate::error::MigrationError;
use crate::migration::Migration;
use crate::registry::{Registry, RunContext};
use crate::retry::MAX_RETRY;
use crate::task::{TaskContext, TaskExecutor, TaskFailure, TaskOutcome};
use crate::validator::{ValidationContext, ValidatorChain};

// ---------------------------------------------------------------------------
// Script contract
// ---------------------------------------------------------------------------

/// Everything a script body receives.
pub struct ScriptParams {
    pub migration: Migration,
    pub client: Arc<dyn StackClient>,
    pub settings: StackSettings,
    pub config: Arc<ScriptConfig>,
}

#[async_trait]
pub trait MigrationScript: Send + Sync {
    fn name(&self) -> &str;

    /// Where the script is defined; used for errors no builder call can be
    /// blamed for.
    fn location(&self) -> &SourceLocation;

    async fn run(&self, params: ScriptParams) -> anyhow::Result<()>;
}

type ScriptBody = Box<dyn Fn(ScriptParams) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// A script backed by an async function.
pub struct FnScript {
    name: String,
    location: SourceLocation,
    body: ScriptBody,
}

impl fmt::Debug for FnScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnScript")
            .field("name", &self.name)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// Wrap an async function as a named script defined at the caller's location.
#[track_caller]
pub fn script<F, Fut>(name: impl Into<String>, body: F) -> FnScript
where
    F: Fn(ScriptParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    FnScript {
        name: name.into(),
        location: SourceLocation::caller(),
        body: Box::new(move |params| -> BoxFuture<'static, anyhow::Result<()>> {
            Box::pin(body(params))
        }),
    }
}

#[async_trait]
impl MigrationScript for FnScript {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> &SourceLocation {
        &self.location
    }

    async fn run(&self, params: ScriptParams) -> anyhow::Result<()> {
        (self.body)(params).await
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptStatus {
    /// Validated and every task group executed.
    Succeeded,
    /// Validated; execution was not requested.
    Validated,
    /// Validation found errors; nothing executed.
    Invalid,
    /// A task group failed during execution.
    Failed,
}

impl ScriptStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ScriptStatus::Succeeded => "succeeded",
            ScriptStatus::Validated => "validated",
            ScriptStatus::Invalid => "invalid",
            ScriptStatus::Failed => "failed",
        }
    }

    pub fn is_ok(self) -> bool {
        matches!(self, ScriptStatus::Succeeded | ScriptStatus::Validated)
    }
}

impl fmt::Display for ScriptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptReport {
    pub script: String,
    pub run_id: Uuid,
    pub status: ScriptStatus,
    pub diagnostics: Vec<Diagnostic>,
    pub tasks: Vec<TaskOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ScriptReport {
    fn finish(mut self, status: ScriptStatus) -> Self {
        self.status = status;
        self.finished_at = Utc::now();
        tracing::info!(status = %status, diagnostics = self.diagnostics.len(), "script finished");
        self
    }
}

// ---------------------------------------------------------------------------
// ScriptRunner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Attempts per remote call, including the first.
    pub max_attempts: u32,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRY,
        }
    }
}

pub struct ScriptRunner {
    client: Arc<dyn StackClient>,
    settings: StackSettings,
    config: Arc<ScriptConfig>,
    options: RunnerOptions,
    validators: ValidatorChain,
}

impl ScriptRunner {
    pub fn new(client: Arc<dyn StackClient>) -> Self {
        Self {
            client,
            settings: StackSettings::default(),
            config: Arc::new(ScriptConfig::default()),
            options: RunnerOptions::default(),
            validators: ValidatorChain::default(),
        }
    }

    pub fn settings(mut self, settings: StackSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn config(mut self, config: ScriptConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn validators(mut self, validators: ValidatorChain) -> Self {
        self.validators = validators;
        self
    }

    /// Run, validate and, if clean, execute one script.
    pub async fn run(&self, script: &dyn MigrationScript) -> ScriptReport {
        self.process(script, true).await
    }

    /// Run and validate one script without executing any task group.
    pub async fn validate(&self, script: &dyn MigrationScript) -> ScriptReport {
        self.process(script, false).await
    }

    /// Run scripts one at a time, each with a fresh run context. Stops after
    /// the first script that does not succeed.
    pub async fn run_batch(&self, scripts: &[&dyn MigrationScript]) -> Vec<ScriptReport> {
        let mut reports = Vec::with_capacity(scripts.len());
        for script in scripts {
            let report = self.run(*script).await;
            let ok = report.status.is_ok();
            reports.push(report);
            if !ok {
                tracing::warn!(script = script.name(), "stopping batch");
                break;
            }
        }
        reports
    }

    async fn process(&self, script: &dyn MigrationScript, execute: bool) -> ScriptReport {
        let run = RunContext::new();
        let span = tracing::info_span!("script", name = script.name(), run_id = %run.run_id());
        self.process_in(script, run, execute).instrument(span).await
    }

    async fn process_in(
        &self,
        script: &dyn MigrationScript,
        run: RunContext,
        execute: bool,
    ) -> ScriptReport {
        let started_at = Utc::now();
        run.with(Registry::reset);

        let params = ScriptParams {
            migration: Migration::new(run.clone()),
            client: self.client.clone(),
            settings: self.settings.clone(),
            config: self.config.clone(),
        };
        let outcome = AssertUnwindSafe(script.run(params)).catch_unwind().await;
        let script_error = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("{e:#}")),
            Err(panic) => Some(panic_message(panic.as_ref())),
        };
        if let Some(message) = script_error {
            tracing::warn!(error = %message, "script aborted");
            record_script_error(&run, script, message);
        }

        let report = ScriptReport {
            script: script.name().to_string(),
            run_id: run.run_id(),
            status: ScriptStatus::Invalid,
            diagnostics: run.with(|r| self.validators.validate_all(r)),
            tasks: Vec::new(),
            started_at,
            finished_at: started_at,
        };
        if !report.diagnostics.is_empty() {
            return report.finish(ScriptStatus::Invalid);
        }
        if !execute {
            return report.finish(ScriptStatus::Validated);
        }

        let ctx = TaskContext::new(self.client.clone(), run.clone())
            .with_max_attempts(self.options.max_attempts);
        let execution = TaskExecutor::new(ctx).drain().await;
        let mut report = ScriptReport {
            tasks: execution.outcomes,
            ..report
        };
        match execution.failure {
            None => report.finish(ScriptStatus::Succeeded),
            Some(failure) => {
                report.diagnostics = self.report_failure(&run, script, failure);
                report.finish(ScriptStatus::Failed)
            }
        }
    }

    /// Record a failed task group as an action at the declaration that
    /// queued it, and validate that action into diagnostics.
    fn report_failure(
        &self,
        run: &RunContext,
        script: &dyn MigrationScript,
        failure: TaskFailure,
    ) -> Vec<Diagnostic> {
        let location = failure
            .origin
            .clone()
            .unwrap_or_else(|| script.location().clone());
        let kind = match failure.error {
            MigrationError::Api(error) => ActionKind::ApiError {
                task: failure.title,
                error,
            },
            other => ActionKind::ScriptError {
                message: other.to_string(),
                function: Some(failure.step),
            },
        };
        run.with(|r| {
            r.dispatch(kind, location);
            let ctx = ValidationContext { registry: r };
            r.actions()
                .last()
                .map(|action| self.validators.validate(action, &ctx))
                .unwrap_or_default()
        })
    }
}

/// Record an error that escaped the script body, blamed on the last builder
/// call made (or the script itself if none was). A usage error already
/// recorded at its call site is not recorded twice.
fn record_script_error(run: &RunContext, script: &dyn MigrationScript, message: String) {
    run.with(|r| {
        let last = r.actions().last();
        if matches!(last.map(|a| &a.kind), Some(ActionKind::ScriptError { .. })) {
            return;
        }
        let location = last
            .map(|a| a.location.clone())
            .unwrap_or_else(|| script.location().clone());
        let function = last.map(|a| a.tag().as_str().to_string());
        r.dispatch(ActionKind::ScriptError { message, function }, location);
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "script panicked".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorKind;
    use crate::memory::InMemoryStack;
    use crate::task::TaskStatus;
    use crate::types::ContentType;
    use serde_json::json;

    async fn create_blog(p: ScriptParams) -> anyhow::Result<()> {
        let blog = p.migration.create_content_type(
            "blog",
            json!({ "title": "Blog", "description": "Posts" }),
        );
        blog.create_field("Title").data_type("text").mandatory(true);
        Ok(())
    }

    async fn missing_title(p: ScriptParams) -> anyhow::Result<()> {
        p.migration
            .create_content_type("blog", json!({ "description": "Posts" }));
        Ok(())
    }

    async fn bails(p: ScriptParams) -> anyhow::Result<()> {
        p.migration.delete_content_type("old");
        anyhow::bail!("boom")
    }

    async fn panics(_p: ScriptParams) -> anyhow::Result<()> {
        panic!("kaboom")
    }

    async fn edits_unknown(p: ScriptParams) -> anyhow::Result<()> {
        p.migration
            .edit_content_type("ghost", json!({ "title": "Ghost" }));
        Ok(())
    }

    async fn misuses_move(p: ScriptParams) -> anyhow::Result<()> {
        let blog = p.migration.create_content_type(
            "blog",
            json!({ "title": "Blog", "description": "Posts" }),
        );
        blog.to_the_top()?;
        Ok(())
    }

    async fn deletes_unknown_field(p: ScriptParams) -> anyhow::Result<()> {
        let blog = p.migration.create_content_type(
            "blog",
            json!({ "title": "Blog", "description": "Posts" }),
        );
        blog.create_field("a");
        blog.delete_field("ghost");
        Ok(())
    }

    async fn reads_config(p: ScriptParams) -> anyhow::Result<()> {
        let title = p.config.get_str("title").unwrap_or("Untitled").to_string();
        p.migration
            .create_content_type("blog", json!({ "title": title, "description": "d" }));
        Ok(())
    }

    fn runner(stack: &Arc<InMemoryStack>) -> ScriptRunner {
        ScriptRunner::new(stack.clone())
    }

    #[tokio::test]
    async fn clean_script_executes() {
        let stack = Arc::new(InMemoryStack::new());
        let report = runner(&stack).run(&script("create_blog", create_blog)).await;
        assert_eq!(report.status, ScriptStatus::Succeeded);
        assert!(report.diagnostics.is_empty());
        assert_eq!(report.tasks[0].title, "Created content type 'blog'");
        assert_eq!(stack.content_type("blog").unwrap().schema[0].uid, "title");
    }

    #[tokio::test]
    async fn missing_title_blocks_all_remote_calls() {
        let stack = Arc::new(InMemoryStack::new());
        let report = runner(&stack).run(&script("missing_title", missing_title)).await;
        assert_eq!(report.status, ScriptStatus::Invalid);
        let messages: Vec<_> = report.diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["title is missing."]);
        assert!(stack.calls().is_empty());
    }

    #[tokio::test]
    async fn deleting_undeclared_field_on_create_never_reaches_stack() {
        let stack = Arc::new(InMemoryStack::new());
        let report = runner(&stack)
            .run(&script("deletes_unknown_field", deletes_unknown_field))
            .await;
        assert_eq!(report.status, ScriptStatus::Invalid);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].kind, ErrorKind::InvalidField);
        assert_eq!(
            report.diagnostics[0].message,
            "ghost cannot be deleted from 'blog', which is being created."
        );
        assert!(stack.calls().is_empty());
        assert!(stack.content_type("blog").is_none());
    }

    #[tokio::test]
    async fn script_error_is_blamed_on_last_call() {
        let stack = Arc::new(InMemoryStack::new());
        let report = runner(&stack).run(&script("bails", bails)).await;
        assert_eq!(report.status, ScriptStatus::Invalid);
        assert_eq!(report.diagnostics.len(), 1);
        let d = &report.diagnostics[0];
        assert_eq!(d.kind, ErrorKind::Script);
        assert_eq!(d.message, "boom (in delete_content_type)");
        assert!(d.file.ends_with("runner.rs"));
        assert!(stack.calls().is_empty());
    }

    #[tokio::test]
    async fn panic_is_caught() {
        let stack = Arc::new(InMemoryStack::new());
        let s = script("panics", panics);
        let report = runner(&stack).run(&s).await;
        assert_eq!(report.status, ScriptStatus::Invalid);
        assert_eq!(report.diagnostics[0].message, "kaboom");
        assert_eq!(report.diagnostics[0].line, s.location().line);
    }

    #[tokio::test]
    async fn usage_error_reported_once_at_call_site() {
        let stack = Arc::new(InMemoryStack::new());
        let report = runner(&stack).run(&script("misuses_move", misuses_move)).await;
        assert_eq!(report.status, ScriptStatus::Invalid);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(
            report.diagnostics[0].message,
            "to_the_top called without a preceding move_field (in to_the_top)"
        );
    }

    #[tokio::test]
    async fn api_failure_after_retries_becomes_diagnostic() {
        let stack = Arc::new(InMemoryStack::new());
        let report = runner(&stack).run(&script("edits_unknown", edits_unknown)).await;
        assert_eq!(report.status, ScriptStatus::Failed);
        assert_eq!(stack.call_count("fetch_content_type"), MAX_RETRY as usize);
        let d = &report.diagnostics[0];
        assert_eq!(d.kind, ErrorKind::Api);
        assert_eq!(
            d.message,
            concat!(
                "Editing content type 'ghost': ",
                "The Content Type 'ghost' was not found. Please try again."
            )
        );
        assert!(matches!(report.tasks[0].status, TaskStatus::Failed { .. }));
        assert_eq!(report.tasks[0].title, "Failed to edit content type 'ghost'");
    }

    #[tokio::test]
    async fn max_attempts_is_configurable() {
        let stack = Arc::new(InMemoryStack::new());
        let report = runner(&stack)
            .options(RunnerOptions { max_attempts: 1 })
            .run(&script("edits_unknown", edits_unknown))
            .await;
        assert_eq!(report.status, ScriptStatus::Failed);
        assert_eq!(stack.call_count("fetch_content_type"), 1);
    }

    #[tokio::test]
    async fn validate_never_executes() {
        let stack = Arc::new(InMemoryStack::new());
        let report = runner(&stack).validate(&script("create_blog", create_blog)).await;
        assert_eq!(report.status, ScriptStatus::Validated);
        assert!(report.tasks.is_empty());
        assert!(stack.calls().is_empty());
    }

    #[tokio::test]
    async fn batch_stops_at_first_failure() {
        let stack = Arc::new(InMemoryStack::new());
        let first = script("create_blog", create_blog);
        let second = script("missing_title", missing_title);
        let third = script("bails", bails);
        let reports = runner(&stack).run_batch(&[&first, &second, &third]).await;
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].status, ScriptStatus::Succeeded);
        assert_eq!(reports[1].status, ScriptStatus::Invalid);
        assert_ne!(reports[0].run_id, reports[1].run_id);
    }

    #[tokio::test]
    async fn runs_do_not_share_declarations() {
        let stack = Arc::new(InMemoryStack::new());
        let r = runner(&stack);
        let first = r.run(&script("missing_title", missing_title)).await;
        assert_eq!(first.status, ScriptStatus::Invalid);
        let second = r.run(&script("create_blog", create_blog)).await;
        assert_eq!(second.status, ScriptStatus::Succeeded);
    }

    #[tokio::test]
    async fn config_reaches_the_script() {
        let stack = Arc::new(InMemoryStack::new());
        let config = ScriptConfig::load(None, &["title:From Config".to_string()]).unwrap();
        let report = runner(&stack)
            .config(config)
            .run(&script("reads_config", reads_config))
            .await;
        assert_eq!(report.status, ScriptStatus::Succeeded);
        let created: ContentType = stack.content_type("blog").unwrap();
        assert_eq!(created.title, "From Config");
    }

    #[test]
    fn report_serializes_status_snake_case() {
        let now = Utc::now();
        let report = ScriptReport {
            script: "s".into(),
            run_id: Uuid::nil(),
            status: ScriptStatus::Invalid,
            diagnostics: Vec::new(),
            tasks: Vec::new(),
            started_at: now,
            finished_at: now,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "invalid");
    }
}
