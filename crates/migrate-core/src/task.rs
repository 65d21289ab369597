//! Task groups and their sequential execution.
//!
//! Every top-level declaration queues one [`TaskGroup`]. After validation the
//! [`TaskExecutor`] drains the queue and runs the groups strictly in order,
//! each group's steps strictly in order. Only leaf remote calls are retried
//! (see [`TaskContext`]); a failed step fails its group and stops the run.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::action::SourceLocation;
use crate::client::{ApiResult, StackClient};
use crate::error::{MigrationError, Result};
use crate::locale::order_by_fallback;
use crate::registry::RunContext;
use crate::retry::{with_retry, MAX_RETRY};
use crate::types::{ContentType, Entry, Locale};

// ---------------------------------------------------------------------------
// TaskContext
// ---------------------------------------------------------------------------

/// What a running step can reach: the remote client (through retried
/// helpers) and the run's registry.
#[derive(Clone)]
pub struct TaskContext {
    client: Arc<dyn StackClient>,
    run: RunContext,
    max_attempts: u32,
}

impl TaskContext {
    pub fn new(client: Arc<dyn StackClient>, run: RunContext) -> Self {
        Self {
            client,
            run,
            max_attempts: MAX_RETRY,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn run(&self) -> &RunContext {
        &self.run
    }

    pub fn client(&self) -> &dyn StackClient {
        self.client.as_ref()
    }

    async fn retried<T, F, Fut>(&self, label: &str, call: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        with_retry(label, self.max_attempts, call).await
    }

    // ── Retried remote helpers ──

    pub async fn fetch_content_type(&self, uid: &str) -> ApiResult<ContentType> {
        self.retried("fetch_content_type", || self.client.fetch_content_type(uid))
            .await
    }

    pub async fn create_content_type(&self, content_type: &ContentType) -> ApiResult<ContentType> {
        self.retried("create_content_type", || {
            self.client.create_content_type(content_type)
        })
        .await
    }

    pub async fn update_content_type(&self, content_type: &ContentType) -> ApiResult<ContentType> {
        self.retried("update_content_type", || {
            self.client.update_content_type(content_type)
        })
        .await
    }

    pub async fn delete_content_type(&self, uid: &str, force: bool) -> ApiResult<()> {
        self.retried("delete_content_type", || {
            self.client.delete_content_type(uid, force)
        })
        .await
    }

    pub async fn fetch_locales(&self) -> ApiResult<Vec<Locale>> {
        self.retried("fetch_locales", || self.client.fetch_locales())
            .await
    }

    /// The stack's locales, each placed after its fallback locale.
    pub async fn ordered_locales(&self) -> ApiResult<Vec<Locale>> {
        Ok(order_by_fallback(self.fetch_locales().await?))
    }

    pub async fn fetch_entries(&self, content_type: &str, locale: &str) -> ApiResult<Vec<Entry>> {
        self.retried("fetch_entries", || {
            self.client.fetch_entries(content_type, locale)
        })
        .await
    }

    pub async fn create_entry(
        &self,
        content_type: &str,
        locale: &str,
        entry: &Entry,
    ) -> ApiResult<Entry> {
        self.retried("create_entry", || {
            self.client.create_entry(content_type, locale, entry)
        })
        .await
    }

    pub async fn update_entry(
        &self,
        content_type: &str,
        locale: &str,
        entry: &Entry,
    ) -> ApiResult<Entry> {
        self.retried("update_entry", || {
            self.client.update_entry(content_type, locale, entry)
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Step / TaskGroup
// ---------------------------------------------------------------------------

pub type StepFuture = BoxFuture<'static, Result<()>>;

/// One async operation inside a task group.
pub struct Step {
    pub name: String,
    run: Box<dyn FnOnce(TaskContext) -> StepFuture + Send>,
}

impl Step {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(TaskContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            run: Box::new(move |ctx| -> StepFuture { Box::pin(f(ctx)) }),
        }
    }

    async fn execute(self, ctx: TaskContext) -> Result<()> {
        (self.run)(ctx).await
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish()
    }
}

/// A titled unit of remote work.
#[derive(Debug)]
pub struct TaskGroup {
    pub title: String,
    pub success_title: String,
    pub fail_title: String,
    pub steps: Vec<Step>,
    /// Where the declaration that queued this group was made.
    pub origin: Option<SourceLocation>,
}

impl TaskGroup {
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            success_title: title.clone(),
            fail_title: title.clone(),
            title,
            steps: Vec::new(),
            origin: None,
        }
    }

    pub fn success_title(mut self, title: impl Into<String>) -> Self {
        self.success_title = title.into();
        self
    }

    pub fn fail_title(mut self, title: impl Into<String>) -> Self {
        self.fail_title = title.into();
        self
    }

    pub fn step<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(TaskContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.steps.push(Step::new(name, f));
        self
    }

    pub fn origin(mut self, location: SourceLocation) -> Self {
        self.origin = Some(location);
        self
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    Succeeded,
    Failed { reason: String },
    /// Not run because an earlier group failed.
    Skipped,
}

/// How one task group ended, under the title shown for that ending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub title: String,
    #[serde(flatten)]
    pub status: TaskStatus,
}

#[derive(Debug)]
pub struct TaskFailure {
    pub title: String,
    pub step: String,
    pub origin: Option<SourceLocation>,
    pub error: MigrationError,
}

#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub outcomes: Vec<TaskOutcome>,
    pub failure: Option<TaskFailure>,
}

impl ExecutionReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

// ---------------------------------------------------------------------------
// TaskExecutor
// ---------------------------------------------------------------------------

pub struct TaskExecutor {
    ctx: TaskContext,
}

impl TaskExecutor {
    pub fn new(ctx: TaskContext) -> Self {
        Self { ctx }
    }

    /// Drain the run's queued task groups and execute them.
    pub async fn drain(&self) -> ExecutionReport {
        let groups = self.ctx.run().with(|r| r.take_task_groups());
        self.run(groups).await
    }

    /// Execute `groups` in order. The first failing group stops the run;
    /// the groups after it are reported as skipped.
    pub async fn run(&self, groups: Vec<TaskGroup>) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        for group in groups {
            if report.failure.is_some() {
                report.outcomes.push(TaskOutcome {
                    title: group.title,
                    status: TaskStatus::Skipped,
                });
                continue;
            }

            tracing::info!(task = %group.title, steps = group.steps.len(), "running task");
            let TaskGroup {
                title,
                success_title,
                fail_title,
                steps,
                origin,
            } = group;

            let mut failed = None;
            for step in steps {
                let name = step.name.clone();
                if let Err(e) = step.execute(self.ctx.clone()).await {
                    failed = Some((name, e));
                    break;
                }
            }

            match failed {
                None => {
                    tracing::info!(task = %success_title, "task succeeded");
                    report.outcomes.push(TaskOutcome {
                        title: success_title,
                        status: TaskStatus::Succeeded,
                    });
                }
                Some((step, error)) => {
                    tracing::error!(
                        task = %fail_title,
                        step = %step,
                        error = %error,
                        "task failed"
                    );
                    report.outcomes.push(TaskOutcome {
                        title: fail_title,
                        status: TaskStatus::Failed {
                            reason: error.to_string(),
                        },
                    });
                    report.failure = Some(TaskFailure {
                        title,
                        step,
                        origin,
                        error,
                    });
                }
            }
        }

        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
