//! `bl create` — create an item; stories are ordered into their scope.

use super::{item_pretty, item_row, open_backlog};
use crate::output::{OutputMode, render_mode};
use backlog_core::model::{ItemId, NewItem, Placement, ProjectId, SprintId, TypeId};
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Project id.
    #[arg(long)]
    pub project: ProjectId,

    /// Item type id.
    #[arg(long = "type")]
    pub type_id: TypeId,

    /// Item subject.
    #[arg(long)]
    pub subject: String,

    /// Sprint id; omit for the product backlog.
    #[arg(long)]
    pub sprint: Option<SprintId>,

    /// Place directly after this item instead of at the bottom.
    #[arg(long, conflicts_with = "top")]
    pub after: Option<ItemId>,

    /// Place at the top instead of at the bottom.
    #[arg(long)]
    pub top: bool,
}

impl CreateArgs {
    const fn placement(&self) -> Placement {
        match (self.after, self.top) {
            (Some(pred), _) => Placement::After(pred),
            (None, true) => Placement::Top,
            (None, false) => Placement::Bottom,
        }
    }
}

/// # Errors
///
/// Returns an error if the store cannot be opened or the creation is
/// rejected.
pub fn run_create(args: &CreateArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let mut backlog = open_backlog(project_root)?;
    let item = backlog.create_item(&NewItem {
        project_id: args.project,
        type_id: args.type_id,
        sprint_id: args.sprint,
        subject: args.subject.clone(),
        placement: args.placement(),
    })?;
    render_mode(output, &item, |item, w| item_row(w, item), |item, w| item_pretty(w, item))
}
