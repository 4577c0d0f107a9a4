//! Item lifecycle hooks: create, update, project move, delete.
//!
//! Each hook computes the item's scope before and after the mutation and
//! lets [`super::reposition`] repair both sequences around the attribute
//! write.

use rusqlite::Connection;

use super::{
    now_us, project_tree, reposition, require_item, require_project, require_reachable_sprint,
    require_sprint,
};
use crate::config::BacklogConfig;
use crate::db::query;
use crate::error::BacklogError;
use crate::model::{Item, ItemAttrs, ItemChanges, ItemId, NewItem, Placement, ProjectId, SprintId};
use crate::scope::{Scope, resolve_scope};

fn resolve_for(
    conn: &Connection,
    config: &BacklogConfig,
    attrs: &ItemAttrs,
) -> Result<Option<Scope>, BacklogError> {
    let project = require_project(conn, attrs.project_id)?;
    Ok(resolve_scope(attrs, &config.for_project(&project)))
}

pub(super) fn create(
    conn: &Connection,
    config: &BacklogConfig,
    new: &NewItem,
) -> Result<Item, BacklogError> {
    require_project(conn, new.project_id)?;
    if let Some(sprint) = new.sprint_id {
        require_reachable_sprint(conn, sprint, new.project_id)?;
    }

    let attrs = ItemAttrs {
        project_id: new.project_id,
        type_id: new.type_id,
        sprint_id: new.sprint_id,
    };
    let after = resolve_for(conn, config, &attrs)?;
    if after.is_none() && new.placement != Placement::Bottom {
        tracing::debug!(placement = ?new.placement, "placement ignored for untracked item");
    }

    let id = query::insert_item(conn, &attrs, &new.subject, now_us())?;
    reposition(conn, id, None, after, new.placement, |_| Ok(()))?;

    let item = require_item(conn, id)?;
    tracing::info!(item = %id, project = %new.project_id, position = ?item.position, "item created");
    Ok(item)
}

pub(super) fn update(
    conn: &Connection,
    config: &BacklogConfig,
    id: ItemId,
    changes: &ItemChanges,
) -> Result<Item, BacklogError> {
    let item = require_item(conn, id)?;
    if changes.is_empty() {
        return Ok(item);
    }
    if let Some(Some(sprint)) = changes.sprint_id {
        require_reachable_sprint(conn, sprint, item.project_id)?;
    }

    let attrs = changes.apply_to(item.attrs());
    let after = resolve_for(conn, config, &attrs)?;
    let subject = changes.subject.as_deref();
    reposition(conn, id, item.tracked_scope(), after, Placement::Bottom, |conn| {
        Ok(query::update_item_attrs(conn, id, &attrs, subject, now_us())?)
    })?;

    let updated = require_item(conn, id)?;
    tracing::info!(
        item = %id,
        from = ?item.position,
        to = ?updated.position,
        "item updated"
    );
    Ok(updated)
}

/// Sprint the item carries into `target`: the explicit one (which must be
/// reachable), else the current one when it is shared with `target`.
fn sprint_after_move(
    conn: &Connection,
    item: &Item,
    target: ProjectId,
    explicit: Option<SprintId>,
) -> Result<Option<SprintId>, BacklogError> {
    if let Some(sprint) = explicit {
        return Ok(Some(require_reachable_sprint(conn, sprint, target)?.id));
    }
    let Some(current) = item.sprint_id else {
        return Ok(None);
    };
    let sprint = require_sprint(conn, current)?;
    let kept = sprint.is_shared_with(target, &project_tree(conn)?);
    tracing::debug!(item = %item.id, sprint = %current, kept, "sprint on project move");
    Ok(kept.then_some(current))
}

pub(super) fn move_to_project(
    conn: &Connection,
    config: &BacklogConfig,
    id: ItemId,
    target: ProjectId,
    sprint: Option<SprintId>,
) -> Result<Item, BacklogError> {
    let item = require_item(conn, id)?;
    require_project(conn, target)?;
    if target == item.project_id && sprint.is_none() {
        return Ok(item);
    }

    let attrs = ItemAttrs {
        project_id: target,
        type_id: item.type_id,
        sprint_id: sprint_after_move(conn, &item, target, sprint)?,
    };
    let after = resolve_for(conn, config, &attrs)?;
    reposition(conn, id, item.tracked_scope(), after, Placement::Bottom, |conn| {
        Ok(query::update_item_attrs(conn, id, &attrs, None, now_us())?)
    })?;

    let moved = require_item(conn, id)?;
    tracing::info!(
        item = %id,
        from = %item.project_id,
        to = %target,
        sprint = ?moved.sprint_id,
        position = ?moved.position,
        "item moved to project"
    );
    Ok(moved)
}

pub(super) fn delete(conn: &Connection, id: ItemId) -> Result<(), BacklogError> {
    let item = require_item(conn, id)?;
    reposition(conn, id, item.tracked_scope(), None, Placement::Bottom, |conn| {
        Ok(query::delete_item(conn, id)?)
    })?;
    tracing::info!(item = %id, "item deleted");
    Ok(())
}
