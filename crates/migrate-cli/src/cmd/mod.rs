pub mod list;
pub mod run;
pub mod validate;

use clap::Args;
use migrate_core::{ScriptConfig, ScriptReport, ScriptStatus, StackSettings};
use std::path::PathBuf;

use crate::scripts::CatalogEntry;

// ---------------------------------------------------------------------------
// Shared arguments
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct Selection {
    /// Script name (see `csmig list`)
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub name: Option<String>,

    /// Every bundled script, in catalog order
    #[arg(long)]
    pub all: bool,
}

impl Selection {
    pub fn resolve<'a>(
        &self,
        catalog: &'a [CatalogEntry],
    ) -> anyhow::Result<Vec<&'a CatalogEntry>> {
        if self.all {
            return Ok(catalog.iter().collect());
        }
        let Some(name) = self.name.as_deref() else {
            anyhow::bail!("specify a script name or --all");
        };
        match catalog.iter().find(|e| e.name() == name) {
            Some(entry) => Ok(vec![entry]),
            None => anyhow::bail!("unknown script '{name}' (see `csmig list`)"),
        }
    }
}

#[derive(Args, Debug)]
pub struct StackArgs {
    /// Stack API key
    #[arg(long, env = "CSMIG_API_KEY")]
    pub api_key: Option<String>,

    /// Management token sent as the authorization header
    #[arg(long, env = "CSMIG_MANAGEMENT_TOKEN", hide_env_values = true)]
    pub management_token: Option<String>,

    /// Branch to migrate
    #[arg(long, env = "CSMIG_BRANCH")]
    pub branch: Option<String>,

    /// API host (default: the public content management API)
    #[arg(long, env = "CSMIG_HOST")]
    pub host: Option<String>,
}

impl StackArgs {
    pub fn settings(&self) -> anyhow::Result<StackSettings> {
        let Some(api_key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
            anyhow::bail!("--api-key (or CSMIG_API_KEY) is required to run scripts");
        };
        let mut settings = StackSettings::new(api_key);
        if let Some(token) = &self.management_token {
            settings = settings.with_management_token(token);
        }
        if let Some(branch) = &self.branch {
            settings = settings.with_branch(branch);
        }
        Ok(settings)
    }
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// JSON object file passed to scripts as configuration
    #[arg(long)]
    pub config_file: Option<PathBuf>,

    /// Inline `key:value` configuration; overrides the file (repeatable)
    #[arg(long = "config", value_name = "KEY:VALUE")]
    pub config: Vec<String>,
}

impl ConfigArgs {
    pub fn load(&self) -> anyhow::Result<ScriptConfig> {
        Ok(ScriptConfig::load(self.config_file.as_deref(), &self.config)?)
    }
}

// ---------------------------------------------------------------------------
// RunExit: typed non-zero exit codes
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum RunExit {
    Failed { script: String },
    Invalid { script: String },
}

impl RunExit {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunExit::Failed { .. } => 1,
            RunExit::Invalid { .. } => 2,
        }
    }

    /// The first report that did not end well, if any.
    pub fn from_reports(reports: &[ScriptReport]) -> Option<Self> {
        let report = reports.iter().find(|r| !r.status.is_ok())?;
        let script = report.script.clone();
        Some(match report.status {
            ScriptStatus::Invalid => RunExit::Invalid { script },
            _ => RunExit::Failed { script },
        })
    }
}

impl std::fmt::Display for RunExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunExit::Failed { script } => write!(f, "script '{script}' failed"),
            RunExit::Invalid { script } => write!(f, "script '{script}' is invalid"),
        }
    }
}

impl std::error::Error for RunExit {}
