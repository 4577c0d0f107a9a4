pub mod check;
pub mod create;
pub mod delete;
pub mod init;
pub mod list;
pub mod move_project;
pub mod project;
pub mod rebuild;
pub mod reorder;
pub mod sprint;
pub mod update;

use crate::output::NotInitialized;
use anyhow::Context as _;
use backlog_core::config::{backlog_dir, db_path, load_config};
use backlog_core::model::Item;
use backlog_core::{Backlog, Position};
use std::io::{self, Write};
use std::path::Path;

/// Open the store under `project_root/.backlog/` with its configuration.
///
/// # Errors
///
/// [`NotInitialized`] when `bl init` has not been run, or any config/store
/// failure.
pub fn open_backlog(project_root: &Path) -> anyhow::Result<Backlog> {
    let dir = backlog_dir(project_root);
    if !dir.is_dir() {
        return Err(NotInitialized(dir).into());
    }
    let config = load_config(project_root)?;
    Backlog::open(&db_path(project_root), config)
        .with_context(|| format!("open store under {}", dir.display()))
}

pub(crate) fn fmt_position(position: Option<Position>) -> String {
    position.map_or_else(|| "-".to_string(), |p| p.to_string())
}

pub(crate) fn fmt_sprint(item: &Item) -> String {
    item.sprint_id
        .map_or_else(|| "backlog".to_string(), |sprint| sprint.to_string())
}

/// One tab-separated row per item: id, position, sprint, type, subject.
pub(crate) fn item_row(w: &mut dyn Write, item: &Item) -> io::Result<()> {
    writeln!(
        w,
        "{}\t{}\t{}\t{}\t{}",
        item.id,
        fmt_position(item.position),
        fmt_sprint(item),
        item.type_id,
        item.subject
    )
}

pub(crate) fn item_pretty(w: &mut dyn Write, item: &Item) -> io::Result<()> {
    crate::output::pretty_section(w, &format!("Item {}", item.id))?;
    crate::output::pretty_kv(w, "Subject", &item.subject)?;
    crate::output::pretty_kv(w, "Project", item.project_id.to_string())?;
    crate::output::pretty_kv(w, "Type", item.type_id.to_string())?;
    crate::output::pretty_kv(w, "Sprint", fmt_sprint(item))?;
    crate::output::pretty_kv(w, "Position", fmt_position(item.position))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_without_init_is_not_initialized() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = open_backlog(dir.path()).expect_err("must fail");
        assert!(err.downcast_ref::<NotInitialized>().is_some());
    }

    #[test]
    fn unpositioned_items_render_as_dash() {
        assert_eq!(fmt_position(None), "-");
        assert_eq!(fmt_position(Some(3)), "3");
    }
}
