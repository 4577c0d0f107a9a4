//! `bl rebuild-positions` — re-sequence every scope of a project.

use super::open_backlog;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};
use backlog_core::model::ProjectId;
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct RebuildArgs {
    /// Project id.
    #[arg(long)]
    pub project: ProjectId,
}

/// # Errors
///
/// Returns an error if the store cannot be opened or the project is unknown.
pub fn run_rebuild(args: &RebuildArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let mut backlog = open_backlog(project_root)?;
    let report = backlog.rebuild_positions(args.project)?;
    render_mode(
        output,
        &report,
        |r, w| {
            writeln!(
                w,
                "scopes={} renumbered={} cleared={}",
                r.scopes, r.renumbered, r.cleared
            )
        },
        |r, w| {
            pretty_section(w, &format!("Rebuilt positions of project {}", r.project_id))?;
            pretty_kv(w, "Scopes", r.scopes.to_string())?;
            pretty_kv(w, "Renumbered", r.renumbered.to_string())?;
            pretty_kv(w, "Cleared", r.cleared.to_string())
        },
    )
}
