//! `bl sprint` — create sprints and list the ones a project can plan into.

use super::open_backlog;
use crate::output::{OutputMode, render};
use backlog_core::model::{ProjectId, Sharing, Sprint};
use clap::{Args, Subcommand};
use std::io::{self, Write};
use std::path::Path;

#[derive(Subcommand, Debug)]
pub enum SprintCommand {
    /// Create a sprint owned by a project.
    Add(AddArgs),
    /// List sprints owned by or shared with a project.
    List {
        /// Project id.
        #[arg(long)]
        project: ProjectId,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Sprint name.
    pub name: String,

    /// Owning project id.
    #[arg(long)]
    pub project: ProjectId,

    /// Who else may plan into the sprint: none, descendants, hierarchy, tree, system.
    #[arg(long, default_value = "none")]
    pub sharing: Sharing,
}

fn sprint_row(w: &mut dyn Write, sprint: &Sprint) -> io::Result<()> {
    writeln!(
        w,
        "{}\t{}\t{}\t{}",
        sprint.id, sprint.project_id, sprint.sharing, sprint.name
    )
}

/// # Errors
///
/// Returns an error if the store cannot be opened or the operation is
/// rejected.
pub fn run_sprint(
    command: &SprintCommand,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let mut backlog = open_backlog(project_root)?;
    match command {
        SprintCommand::Add(args) => {
            let sprint = backlog.add_sprint(args.project, &args.name, args.sharing)?;
            render(output, &sprint, |s, w| {
                writeln!(
                    w,
                    "✓ Created sprint {} ({}) in project {}, sharing {}",
                    s.id, s.name, s.project_id, s.sharing
                )
            })
        }
        SprintCommand::List { project } => {
            let sprints = backlog.sprints_for(*project)?;
            render(output, &sprints, |sprints, w| {
                for sprint in sprints {
                    sprint_row(w, sprint)?;
                }
                Ok(())
            })
        }
    }
}
