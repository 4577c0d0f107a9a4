//! `bl move-project` — move an item to another project.

use super::{item_pretty, item_row, open_backlog};
use crate::output::{OutputMode, render_mode};
use backlog_core::model::{ItemId, ProjectId, SprintId};
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct MoveProjectArgs {
    /// Item id.
    pub id: ItemId,

    /// Target project id.
    #[arg(long)]
    pub to: ProjectId,

    /// Plan into this sprint. Without it the current sprint is kept when the
    /// target may use it.
    #[arg(long)]
    pub sprint: Option<SprintId>,
}

/// # Errors
///
/// Returns an error if the store cannot be opened or the move is rejected.
pub fn run_move_project(
    args: &MoveProjectArgs,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let mut backlog = open_backlog(project_root)?;
    let item = backlog.move_to_project(args.id, args.to, args.sprint)?;
    render_mode(output, &item, |item, w| item_row(w, item), |item, w| item_pretty(w, item))
}
