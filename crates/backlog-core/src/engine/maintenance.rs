//! Position repair and consistency checks for a whole project.

use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::{now_us, require_project};
use crate::config::BacklogConfig;
use crate::db::{positions, query};
use crate::error::BacklogError;
use crate::model::{Item, ItemId, ProjectId};
use crate::position::{Position, PositionError, PositionPlan, PositionUpdate, ScopeList};
use crate::scope::{Scope, resolve_scope};

/// Summary of a position rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    pub project_id: ProjectId,
    /// Scopes that hold at least one eligible item.
    pub scopes: usize,
    /// Eligible items whose position changed.
    pub renumbered: usize,
    /// Ineligible items whose stale position was cleared.
    pub cleared: usize,
}

/// One problem found by [`check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionIssue {
    /// The stored sequence of a scope is not `1..n`.
    Broken(PositionError),
    /// An eligible item has no position.
    Unpositioned { item: ItemId, scope: Scope },
    /// An ineligible item still carries a position.
    Stray { item: ItemId, position: Position },
}

impl PositionIssue {
    /// Short machine-friendly label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Broken(_) => "broken_sequence",
            Self::Unpositioned { .. } => "unpositioned",
            Self::Stray { .. } => "stray_position",
        }
    }
}

impl fmt::Display for PositionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Broken(err) => write!(f, "{err}"),
            Self::Unpositioned { item, scope } => {
                write!(f, "item {item} in {scope} has no position")
            }
            Self::Stray { item, position } => {
                write!(f, "item {item} is not ordered but holds position {position}")
            }
        }
    }
}

/// Project items split into eligible rows per scope and ineligible items that
/// still hold a position.
struct Partition {
    scopes: BTreeMap<Scope, Vec<(ItemId, Option<Position>)>>,
    stray: Vec<(ItemId, Position)>,
}

fn partition(
    conn: &Connection,
    config: &BacklogConfig,
    project: ProjectId,
) -> Result<Partition, BacklogError> {
    let project = require_project(conn, project)?;
    let classifier = config.for_project(&project);
    let items: Vec<Item> = query::list_project_items(conn, project.id)?;

    let mut out = Partition {
        scopes: BTreeMap::new(),
        stray: Vec::new(),
    };
    for item in items {
        match resolve_scope(&item.attrs(), &classifier) {
            Some(scope) => out
                .scopes
                .entry(scope)
                .or_default()
                .push((item.id, item.position)),
            None => {
                if let Some(position) = item.position {
                    out.stray.push((item.id, position));
                }
            }
        }
    }
    Ok(out)
}

/// Re-sequence every scope of `project` to `1..n` (ordering by stored
/// position, unpositioned last, ties by id) and clear stray positions.
pub(super) fn rebuild(
    conn: &Connection,
    config: &BacklogConfig,
    project: ProjectId,
) -> Result<RebuildReport, BacklogError> {
    let Partition { scopes, stray } = partition(conn, config, project)?;

    let mut plan = PositionPlan::from_updates(stray.iter().map(|&(item_id, position)| {
        PositionUpdate {
            item_id,
            from: Some(position),
            to: None,
        }
    }));
    let mut report = RebuildReport {
        project_id: project,
        scopes: scopes.len(),
        renumbered: 0,
        cleared: stray.len(),
    };

    let touched: Vec<Scope> = scopes.keys().copied().collect();
    for (scope, rows) in scopes {
        let (_, repairs) = ScopeList::repaired(scope, rows);
        report.renumbered += repairs.len();
        plan = plan.merge(repairs);
    }

    positions::apply(conn, &plan)?;
    positions::verify(conn, &touched)?;
    query::mark_rebuilt(conn, now_us())?;

    tracing::info!(
        %project,
        scopes = report.scopes,
        renumbered = report.renumbered,
        cleared = report.cleared,
        "positions rebuilt"
    );
    Ok(report)
}

/// Report contiguity and membership problems of `project` without writing.
pub(super) fn check(
    conn: &Connection,
    config: &BacklogConfig,
    project: ProjectId,
) -> Result<Vec<PositionIssue>, BacklogError> {
    let Partition { scopes, stray } = partition(conn, config, project)?;
    let mut issues = Vec::new();

    for (scope, rows) in scopes {
        let mut ranked = Vec::with_capacity(rows.len());
        for (item, position) in rows {
            match position {
                Some(position) => ranked.push((item, position)),
                None => issues.push(PositionIssue::Unpositioned { item, scope }),
            }
        }
        if let Err(err) = ScopeList::from_ranked(scope, ranked) {
            issues.push(PositionIssue::Broken(err));
        }
    }
    issues.extend(
        stray
            .into_iter()
            .map(|(item, position)| PositionIssue::Stray { item, position }),
    );

    if !issues.is_empty() {
        tracing::warn!(%project, issues = issues.len(), "position check found problems");
    }
    Ok(issues)
}
