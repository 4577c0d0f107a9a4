//! `bl check` — report position problems without changing anything.
//!
//! Exits non-zero when any issue is found so it can gate scripts.

use super::open_backlog;
use crate::output::{OutputMode, render_mode};
use backlog_core::model::ProjectId;
use clap::Args;
use serde::Serialize;
use std::path::Path;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Project id.
    #[arg(long)]
    pub project: ProjectId,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    project_id: ProjectId,
    ok: bool,
    issues: Vec<IssueRow>,
}

#[derive(Debug, Serialize)]
struct IssueRow {
    kind: &'static str,
    message: String,
}

/// # Errors
///
/// Returns an error if the store cannot be opened, the project is unknown,
/// or issues were found.
pub fn run_check(args: &CheckArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let backlog = open_backlog(project_root)?;
    let issues = backlog.check(args.project)?;
    let report = CheckReport {
        project_id: args.project,
        ok: issues.is_empty(),
        issues: issues
            .iter()
            .map(|issue| IssueRow {
                kind: issue.kind(),
                message: issue.to_string(),
            })
            .collect(),
    };

    render_mode(
        output,
        &report,
        |r, w| {
            for issue in &r.issues {
                writeln!(w, "{}\t{}", issue.kind, issue.message)?;
            }
            Ok(())
        },
        |r, w| {
            if r.ok {
                return writeln!(w, "✓ project {} positions are consistent", r.project_id);
            }
            writeln!(w, "✗ project {}: {} issue(s)", r.project_id, r.issues.len())?;
            for issue in &r.issues {
                writeln!(w, "  - [{}] {}", issue.kind, issue.message)?;
            }
            writeln!(w, "  Run `bl rebuild-positions --project {}` to repair.", r.project_id)
        },
    )?;

    if !report.ok {
        tracing::warn!(project = %args.project, issues = report.issues.len(), "position check failed");
        anyhow::bail!("{} position issue(s) found", report.issues.len());
    }
    Ok(())
}
