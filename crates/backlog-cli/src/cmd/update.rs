//! `bl update` — change type, sprint, or subject of an item.

use super::{item_pretty, item_row, open_backlog};
use crate::output::{OutputMode, render_mode};
use backlog_core::model::{ItemChanges, ItemId, SprintId, TypeId};
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Item id.
    pub id: ItemId,

    /// New item type id.
    #[arg(long = "type")]
    pub type_id: Option<TypeId>,

    /// Plan the item into this sprint.
    #[arg(long, conflicts_with = "no_sprint")]
    pub sprint: Option<SprintId>,

    /// Take the item out of its sprint (back to the product backlog).
    #[arg(long)]
    pub no_sprint: bool,

    /// New subject.
    #[arg(long)]
    pub subject: Option<String>,
}

impl UpdateArgs {
    fn changes(&self) -> ItemChanges {
        let sprint_id = if self.no_sprint {
            Some(None)
        } else {
            self.sprint.map(Some)
        };
        ItemChanges {
            type_id: self.type_id,
            sprint_id,
            subject: self.subject.clone(),
        }
    }
}

/// # Errors
///
/// Returns an error if the store cannot be opened or the update is rejected.
pub fn run_update(args: &UpdateArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let mut backlog = open_backlog(project_root)?;
    let item = backlog.update_item(args.id, &args.changes())?;
    render_mode(output, &item, |item, w| item_row(w, item), |item, w| item_pretty(w, item))
}
