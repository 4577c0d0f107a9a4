//! `bl reorder` — apply a drag-and-drop result.
//!
//! Ids are taken as raw strings so malformed input is reported as an invalid
//! request (`E2001`) rather than a usage error.

use super::open_backlog;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};
use backlog_core::ReorderRequest;
use backlog_core::model::ProjectId;
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct ReorderArgs {
    /// Project the drop happened in.
    #[arg(long)]
    pub project: ProjectId,

    /// Id of the dropped item.
    #[arg(long)]
    pub dropped: String,

    /// Visible order after the drop, comma separated.
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub order: Vec<String>,

    /// Also move to another scope first: a sprint id or `product_backlog`.
    #[arg(long)]
    pub moveto: Option<String>,
}

/// # Errors
///
/// Returns an error if the request is malformed, the store cannot be opened,
/// or the reorder is rejected.
pub fn run_reorder(args: &ReorderArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let request = ReorderRequest::parse(&args.order, &args.dropped, args.moveto.as_deref())?;
    let mut backlog = open_backlog(project_root)?;
    let outcome = backlog.reorder(args.project, &request)?;

    render_mode(
        output,
        &outcome,
        |o, w| writeln!(w, "{}\t{}\t{}", o.item_id, o.scope, o.position),
        |o, w| {
            pretty_section(w, &format!("Reordered item {}", o.item_id))?;
            if let Some(from) = o.transferred_from {
                pretty_kv(w, "From", from.to_string())?;
            }
            pretty_kv(w, "Scope", o.scope.to_string())?;
            pretty_kv(w, "Position", o.position.to_string())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: ReorderArgs,
    }

    #[test]
    fn order_splits_on_commas() {
        let args = Harness::parse_from([
            "reorder", "--project", "1", "--dropped", "3", "--order", "1,2,4,3,5",
        ])
        .args;
        assert_eq!(args.order, ["1", "2", "4", "3", "5"]);
        assert!(args.moveto.is_none());
    }

    #[test]
    fn moveto_is_kept_raw() {
        let args = Harness::parse_from([
            "reorder",
            "--project",
            "1",
            "--dropped",
            "3",
            "--order",
            "3",
            "--moveto",
            "product_backlog",
        ])
        .args;
        assert_eq!(args.moveto.as_deref(), Some("product_backlog"));
    }

    #[test]
    fn malformed_ids_are_invalid_requests() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = ReorderArgs {
            project: ProjectId::new(1),
            dropped: "x".into(),
            order: vec!["x".into()],
            moveto: None,
        };
        let err = run_reorder(&args, OutputMode::Text, dir.path()).expect_err("must fail");
        let code = err
            .downcast_ref::<backlog_core::BacklogError>()
            .map(backlog_core::BacklogError::code);
        assert_eq!(code, Some(backlog_core::ErrorCode::InvalidRequest));
    }
}
