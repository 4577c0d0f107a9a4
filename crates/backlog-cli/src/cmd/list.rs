//! `bl list` — ordered stories of a project's product backlog and sprints.

use super::{fmt_position, item_row, open_backlog};
use crate::output::{OutputMode, pretty_section, render_mode};
use backlog_core::model::{ProjectId, SprintId};
use backlog_core::{Scope, ScopeListing};
use clap::Args;
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Project id.
    #[arg(long)]
    pub project: ProjectId,

    /// Only this sprint.
    #[arg(long, conflicts_with = "product_backlog")]
    pub sprint: Option<SprintId>,

    /// Only the product backlog.
    #[arg(long)]
    pub product_backlog: bool,
}

fn listing_text(w: &mut dyn Write, listings: &[ScopeListing]) -> io::Result<()> {
    for listing in listings {
        for item in &listing.items {
            item_row(w, item)?;
        }
    }
    Ok(())
}

fn listing_pretty(w: &mut dyn Write, listings: &[ScopeListing]) -> io::Result<()> {
    for (index, listing) in listings.iter().enumerate() {
        if index > 0 {
            writeln!(w)?;
        }
        pretty_section(w, listing.sprint_name.as_deref().unwrap_or("Product backlog"))?;
        if listing.items.is_empty() {
            writeln!(w, "  (empty)")?;
        }
        for item in &listing.items {
            writeln!(
                w,
                "{:>4}  #{:<6} {}",
                fmt_position(item.position),
                item.id,
                item.subject
            )?;
        }
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the store cannot be opened or the project is unknown.
pub fn run_list(args: &ListArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let backlog = open_backlog(project_root)?;
    let mut listings = backlog.backlogs(args.project)?;
    if args.product_backlog {
        listings.retain(|listing| listing.scope.is_product_backlog());
    } else if let Some(sprint) = args.sprint {
        let scope = Scope::sprint(args.project, sprint);
        listings.retain(|listing| listing.scope == scope);
        if listings.is_empty() {
            anyhow::bail!("sprint {sprint} is not visible from project {}", args.project);
        }
    }
    render_mode(
        output,
        listings.as_slice(),
        |l, w| listing_text(w, l),
        |l, w| listing_pretty(w, l),
    )
}
