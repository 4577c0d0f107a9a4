//! Drag-and-drop reorder protocol.
//!
//! A client submits the visible order after a drop and the id of the item
//! that was dropped. Only the dropped item's predecessor in that order is
//! used: the numeric slot is derived from the stored scope, so stale
//! client-side positions cannot corrupt the sequence. An optional
//! [`MoveTo`] directive first transfers the item to another scope of the
//! same project (appended at the bottom), then the predecessor rule places
//! it.

use rusqlite::Connection;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::config::BacklogConfig;
use crate::db::{positions, query};
use crate::engine::{not_found, now_us, require_item, require_project, require_reachable_sprint};
use crate::error::{BacklogError, EntityKind};
use crate::model::{ItemAttrs, ItemId, ProjectId, SprintId};
use crate::position::{self, Position, PositionPlan};
use crate::scope::{Scope, resolve_scope};

/// Literal accepted for "move to the product backlog".
pub const PRODUCT_BACKLOG: &str = "product_backlog";

/// Optional scope change that accompanies a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveTo {
    ProductBacklog,
    Sprint(SprintId),
}

impl MoveTo {
    #[must_use]
    pub const fn scope_in(self, project: ProjectId) -> Scope {
        match self {
            Self::ProductBacklog => Scope::product_backlog(project),
            Self::Sprint(sprint) => Scope::sprint(project, sprint),
        }
    }
}

impl fmt::Display for MoveTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProductBacklog => f.write_str(PRODUCT_BACKLOG),
            Self::Sprint(sprint) => write!(f, "{sprint}"),
        }
    }
}

impl FromStr for MoveTo {
    type Err = BacklogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed == PRODUCT_BACKLOG {
            return Ok(Self::ProductBacklog);
        }
        trimmed
            .parse::<SprintId>()
            .map(Self::Sprint)
            .map_err(|err| BacklogError::invalid(format!("moveto: {err}")))
    }
}

/// A parsed drag-and-drop submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderRequest {
    /// Visible order after the drop.
    pub ordered_ids: Vec<ItemId>,
    pub dropped_id: ItemId,
    pub move_to: Option<MoveTo>,
}

impl ReorderRequest {
    /// Parse raw client values.
    ///
    /// # Errors
    ///
    /// Returns [`BacklogError::InvalidRequest`] for any non-numeric id or an
    /// unknown `move_to` value.
    pub fn parse<S: AsRef<str>>(
        ordered_ids: &[S],
        dropped_id: &str,
        move_to: Option<&str>,
    ) -> Result<Self, BacklogError> {
        let parse_id = |raw: &str| {
            raw.parse::<ItemId>()
                .map_err(|err| BacklogError::invalid(err.to_string()))
        };
        Ok(Self {
            ordered_ids: ordered_ids
                .iter()
                .map(|raw| parse_id(raw.as_ref()))
                .collect::<Result<_, _>>()?,
            dropped_id: parse_id(dropped_id)?,
            move_to: move_to.map(str::parse).transpose()?,
        })
    }

    /// The item right before the dropped one, `None` when it was dropped first.
    ///
    /// # Errors
    ///
    /// Returns [`BacklogError::InvalidRequest`] when the dropped id is missing
    /// from `ordered_ids` or listed more than once.
    pub fn predecessor(&self) -> Result<Option<ItemId>, BacklogError> {
        predecessor_of(&self.ordered_ids, self.dropped_id)
    }
}

/// # Errors
///
/// Returns [`BacklogError::InvalidRequest`] when `dropped` is not in
/// `ordered` exactly once.
pub fn predecessor_of(ordered: &[ItemId], dropped: ItemId) -> Result<Option<ItemId>, BacklogError> {
    let mut hits = ordered
        .iter()
        .enumerate()
        .filter(|&(_, &id)| id == dropped)
        .map(|(index, _)| index);
    let Some(index) = hits.next() else {
        return Err(BacklogError::invalid(format!(
            "dropped item {dropped} is not in the submitted order"
        )));
    };
    if hits.next().is_some() {
        return Err(BacklogError::invalid(format!(
            "dropped item {dropped} appears more than once in the submitted order"
        )));
    }
    Ok(index.checked_sub(1).map(|prev| ordered[prev]))
}

/// Where the dropped item ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReorderOutcome {
    pub item_id: ItemId,
    pub scope: Scope,
    pub position: Position,
    /// Previous scope when the drop also changed scope.
    pub transferred_from: Option<Scope>,
}

pub(crate) fn apply(
    conn: &Connection,
    config: &BacklogConfig,
    project_id: ProjectId,
    request: &ReorderRequest,
) -> Result<ReorderOutcome, BacklogError> {
    let predecessor = request.predecessor()?;
    let dropped = request.dropped_id;

    let project = require_project(conn, project_id)?;
    let item = require_item(conn, dropped)?;
    if item.project_id != project.id {
        return Err(not_found(EntityKind::Item, dropped.get()));
    }
    let Some(current) = item.tracked_scope() else {
        return Err(BacklogError::invalid(format!(
            "item {dropped} is not ordered in any backlog"
        )));
    };

    if let Some(MoveTo::Sprint(sprint)) = request.move_to {
        require_reachable_sprint(conn, sprint, project.id)?;
    }
    let target = request
        .move_to
        .map_or(current, |move_to| move_to.scope_in(project.id));

    // Step one: scope transfer, bottom of the target.
    let mut list = positions::load_scope(conn, target)?;
    let mut plan = PositionPlan::default();
    let attrs = ItemAttrs {
        sprint_id: target.sprint_id,
        ..item.attrs()
    };
    let transferred_from = (target != current).then_some(current);
    if transferred_from.is_some() {
        if resolve_scope(&attrs, &config.for_project(&project)) != Some(target) {
            return Err(BacklogError::invalid(format!(
                "item {dropped} is not a story of project {}",
                project.id
            )));
        }
        let mut source = positions::load_scope(conn, current)?;
        plan = position::transfer(&mut source, &mut list, dropped, None)?;
    }

    // Step two: directly after the predecessor, or first.
    if let Some(pred) = predecessor {
        require_item(conn, pred)?;
        if !list.contains(pred) {
            return Err(BacklogError::invalid(format!(
                "predecessor {pred} is not in {target}"
            )));
        }
    }
    plan = plan.merge(list.place_after(dropped, predecessor)?);

    tracing::debug!(
        item = %dropped,
        predecessor = ?predecessor,
        updates = plan.len(),
        "reorder plan"
    );

    positions::release(conn, &plan)?;
    if transferred_from.is_some() {
        query::update_item_attrs(conn, dropped, &attrs, None, now_us())?;
    }
    positions::assign(conn, &plan)?;
    let mut touched = vec![target];
    touched.extend(transferred_from);
    positions::verify(conn, &touched)?;

    let position = list.position_of(dropped).ok_or(position::PositionError::NotInScope {
        item: dropped,
        scope: target,
    })?;
    tracing::info!(
        item = %dropped,
        scope = %target,
        position,
        transferred = transferred_from.is_some(),
        "item reordered"
    );

    Ok(ReorderOutcome {
        item_id: dropped,
        scope: target,
        position,
        transferred_from,
    })
}
