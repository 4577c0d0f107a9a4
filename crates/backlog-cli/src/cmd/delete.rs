//! `bl delete` — delete an item and close the gap it leaves.

use super::open_backlog;
use crate::output::{OutputMode, render_success};
use backlog_core::model::ItemId;
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Item id.
    pub id: ItemId,
}

/// # Errors
///
/// Returns an error if the store cannot be opened or the item is unknown.
pub fn run_delete(args: &DeleteArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let mut backlog = open_backlog(project_root)?;
    backlog.delete_item(args.id)?;
    render_success(output, &format!("Deleted item {}", args.id))
}
