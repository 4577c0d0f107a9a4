use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::eligibility::ProjectConfig;
use crate::error::BacklogError;
use crate::model::{Project, ProjectId, TypeId};

/// Directory holding the store and its configuration.
pub const BACKLOG_DIR: &str = ".backlog";
pub const CONFIG_FILE: &str = "config.toml";
pub const DB_FILE: &str = "backlog.db";

/// Written by `bl init`. Story types must be configured before anything is
/// ordered.
pub const CONFIG_TEMPLATE: &str = r#"# Item types that take part in backlog ordering.
[backlogs]
story_types = [1, 2]
task_type = 3

# Per-project story types override the global list.
# [projects."7"]
# story_types = [4]

[engine]
max_retries = 3
retry_backoff_ms = 25
busy_timeout_ms = 5000
"#;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogConfig {
    #[serde(default)]
    pub backlogs: BacklogsConfig,
    /// Keyed by project id (TOML table keys are strings).
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectOverride>,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogsConfig {
    #[serde(default)]
    pub story_types: BTreeSet<TypeId>,
    /// The task type is never orderable, even if listed as a story type.
    #[serde(default)]
    pub task_type: Option<TypeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectOverride {
    #[serde(default)]
    pub story_types: Option<BTreeSet<TypeId>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Extra attempts after a busy/locked store before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl BacklogConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`BacklogError::Config`] on malformed TOML or when
    /// [`validate`](Self::validate) fails.
    pub fn from_toml_str(raw: &str) -> Result<Self, BacklogError> {
        let config: Self =
            toml::from_str(raw).map_err(|err| BacklogError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field rules that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`BacklogError::Config`] when a project key is not a valid
    /// project id, or when the task type is also configured as a story type.
    pub fn validate(&self) -> Result<(), BacklogError> {
        for key in self.projects.keys() {
            key.parse::<ProjectId>()
                .map_err(|err| BacklogError::Config(format!("[projects.\"{key}\"]: {err}")))?;
        }

        let Some(task_type) = self.backlogs.task_type else {
            return Ok(());
        };
        if self.backlogs.story_types.contains(&task_type) {
            return Err(BacklogError::Config(format!(
                "task type {task_type} is also listed in backlogs.story_types"
            )));
        }
        for (key, project) in &self.projects {
            if project
                .story_types
                .as_ref()
                .is_some_and(|types| types.contains(&task_type))
            {
                return Err(BacklogError::Config(format!(
                    "task type {task_type} is also listed in projects.\"{key}\".story_types"
                )));
            }
        }
        Ok(())
    }

    /// Story types in effect for `project`.
    #[must_use]
    pub fn story_types_for(&self, project: ProjectId) -> &BTreeSet<TypeId> {
        self.projects
            .iter()
            .find(|(key, _)| key.parse::<ProjectId>().is_ok_and(|id| id == project))
            .and_then(|(_, over)| over.story_types.as_ref())
            .unwrap_or(&self.backlogs.story_types)
    }

    /// Classifier input for one project.
    #[must_use]
    pub fn for_project(&self, project: &Project) -> ProjectConfig {
        ProjectConfig::new(
            project.id,
            project.backlogs_enabled,
            self.story_types_for(project.id).iter().copied(),
        )
    }
}

#[must_use]
pub fn backlog_dir(root: &Path) -> PathBuf {
    root.join(BACKLOG_DIR)
}

#[must_use]
pub fn config_path(root: &Path) -> PathBuf {
    backlog_dir(root).join(CONFIG_FILE)
}

#[must_use]
pub fn db_path(root: &Path) -> PathBuf {
    backlog_dir(root).join(DB_FILE)
}

/// Load `.backlog/config.toml` under `root`, falling back to defaults when
/// the file does not exist.
///
/// # Errors
///
/// Fails when the file cannot be read, is not valid TOML, or does not pass
/// [`BacklogConfig::validate`].
pub fn load_config(root: &Path) -> Result<BacklogConfig> {
    let path = config_path(root);
    if !path.exists() {
        return Ok(BacklogConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    BacklogConfig::from_toml_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_retry_backoff_ms() -> u64 {
    25
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}
