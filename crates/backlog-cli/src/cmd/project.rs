//! `bl project` — create and list projects, toggle their backlogs module.

use super::open_backlog;
use crate::output::{OutputMode, pretty_section, render, render_mode};
use backlog_core::model::{Project, ProjectId};
use clap::{Args, Subcommand};
use std::io::{self, Write};
use std::path::Path;

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Create a project.
    Add(AddArgs),
    /// List all projects.
    List,
    /// Enable the backlogs module and number the project's stories.
    EnableBacklogs {
        /// Project id.
        id: ProjectId,
    },
    /// Disable the backlogs module and clear every position in the project.
    DisableBacklogs {
        /// Project id.
        id: ProjectId,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Project name.
    pub name: String,

    /// Parent project id.
    #[arg(long)]
    pub parent: Option<ProjectId>,

    /// Create the project without the backlogs module.
    #[arg(long)]
    pub no_backlogs: bool,
}

fn project_row(w: &mut dyn Write, project: &Project) -> io::Result<()> {
    writeln!(
        w,
        "{}\t{}\t{}\t{}",
        project.id,
        project
            .parent_id
            .map_or_else(|| "-".to_string(), |p| p.to_string()),
        if project.backlogs_enabled { "backlogs" } else { "-" },
        project.name
    )
}

/// # Errors
///
/// Returns an error if the store cannot be opened or the operation is
/// rejected.
pub fn run_project(
    command: &ProjectCommand,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let mut backlog = open_backlog(project_root)?;
    match command {
        ProjectCommand::Add(args) => {
            let project = backlog.add_project(&args.name, args.parent, !args.no_backlogs)?;
            render(output, &project, |p, w| {
                writeln!(w, "✓ Created project {} ({})", p.id, p.name)
            })
        }
        ProjectCommand::List => {
            let projects = backlog.projects()?;
            render_mode(
                output,
                &projects,
                |projects, w| {
                    for project in projects {
                        project_row(w, project)?;
                    }
                    Ok(())
                },
                |projects, w| {
                    pretty_section(w, "Projects")?;
                    if projects.is_empty() {
                        writeln!(w, "(none)")?;
                    }
                    for project in projects {
                        project_row(w, project)?;
                    }
                    Ok(())
                },
            )
        }
        ProjectCommand::EnableBacklogs { id } | ProjectCommand::DisableBacklogs { id } => {
            let enabled = matches!(command, ProjectCommand::EnableBacklogs { .. });
            let report = backlog.set_backlogs_enabled(*id, enabled)?;
            render(output, &report, |r, w| {
                writeln!(
                    w,
                    "✓ Backlogs {} for project {}: {} renumbered, {} cleared",
                    if enabled { "enabled" } else { "disabled" },
                    r.project_id,
                    r.renumbered,
                    r.cleared
                )
            })
        }
    }
}
