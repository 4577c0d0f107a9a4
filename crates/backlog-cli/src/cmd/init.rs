//! `bl init` — create `.backlog/` with a config template and an empty store.

use crate::output::{OutputMode, render};
use anyhow::{Context as _, Result};
use backlog_core::Backlog;
use backlog_core::config::{CONFIG_TEMPLATE, backlog_dir, config_path, db_path, load_config};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config.toml with the template.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct InitReport {
    config: PathBuf,
    store: PathBuf,
    config_written: bool,
}

/// Execute `bl init`:
///
/// ```text
/// .backlog/
///   config.toml   (story types and engine settings)
///   backlog.db    (SQLite item store, migrated to the latest schema)
/// ```
///
/// # Errors
///
/// Returns an error if the directory cannot be created, the config cannot be
/// written or parsed, or the store cannot be opened.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let dir = backlog_dir(project_root);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let config = config_path(project_root);
    let config_written = args.force || !config.exists();
    if config_written {
        std::fs::write(&config, CONFIG_TEMPLATE)
            .with_context(|| format!("Failed to write config: {}", config.display()))?;
    }

    let store = db_path(project_root);
    Backlog::open(&store, load_config(project_root)?)?;
    tracing::info!(path = %store.display(), "store initialized");

    let report = InitReport {
        config,
        store,
        config_written,
    };
    render(output, &report, |r, w| {
        writeln!(w, "✓ Initialized .backlog/")?;
        let note = if r.config_written { "" } else { " (kept existing)" };
        writeln!(w, "  Config: {}{note}", r.config.display())?;
        writeln!(w, "  Store:  {}", r.store.display())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_template_and_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        run_init(&InitArgs { force: false }, OutputMode::Text, dir.path()).expect("init");
        assert!(config_path(dir.path()).exists());
        assert!(db_path(dir.path()).exists());
        let config = load_config(dir.path()).expect("config");
        assert_eq!(config.backlogs.story_types.len(), 2);
    }

    #[test]
    fn init_keeps_existing_config_without_force() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(backlog_dir(dir.path())).expect("mkdir");
        std::fs::write(config_path(dir.path()), "[backlogs]\nstory_types = [9]\n").expect("write");

        run_init(&InitArgs { force: false }, OutputMode::Text, dir.path()).expect("init");
        let config = load_config(dir.path()).expect("config");
        assert_eq!(config.backlogs.story_types.len(), 1);

        run_init(&InitArgs { force: true }, OutputMode::Text, dir.path()).expect("re-init");
        let config = load_config(dir.path()).expect("config");
        assert_eq!(config.backlogs.story_types.len(), 2);
    }
}
