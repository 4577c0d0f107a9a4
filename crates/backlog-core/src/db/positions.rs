//! Persistence adapter for position plans.
//!
//! The store carries a unique index over `(project, sprint, position)`, so a
//! plan is written in two phases: every touched row is first released
//! (`position = NULL`), then every row with a target slot is assigned. No
//! intermediate state can collide with a row that has not moved yet.

use rusqlite::{Connection, params};

use crate::error::BacklogError;
use crate::model::ItemId;
use crate::position::{Position, PositionPlan, ScopeList};
use crate::scope::Scope;

/// Stored `(item, position)` rows of a scope, ordered by position.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn scope_rows(conn: &Connection, scope: Scope) -> rusqlite::Result<Vec<(ItemId, Position)>> {
    let mut stmt = conn.prepare(
        "SELECT item_id, position
         FROM items
         WHERE project_id = ?1 AND sprint_id IS ?2 AND position IS NOT NULL
         ORDER BY position, item_id",
    )?;
    stmt.query_map(params![scope.project_id, scope.sprint_id], |row| {
        Ok((row.get(0)?, row.get(1)?))
    })?
    .collect()
}

/// Snapshot a scope for the position maintainer, verifying contiguity.
///
/// # Errors
///
/// Returns [`BacklogError::InvariantViolation`] when the stored sequence is
/// not `1..n`, or a storage error if the query fails.
pub fn load_scope(conn: &Connection, scope: Scope) -> Result<ScopeList, BacklogError> {
    let rows = scope_rows(conn, scope)?;
    Ok(ScopeList::from_ranked(scope, rows)?)
}

/// Phase one: clear the position of every row the plan touches.
///
/// # Errors
///
/// Returns an error if an update fails.
pub fn release(conn: &Connection, plan: &PositionPlan) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare("UPDATE items SET position = NULL WHERE item_id = ?1")?;
    for update in plan.updates().iter().filter(|u| u.from.is_some()) {
        stmt.execute([update.item_id])?;
    }
    Ok(())
}

/// Phase two: write every target slot.
///
/// # Errors
///
/// Returns an error if an update fails (a unique-index violation means the
/// plan did not match the stored scope).
pub fn assign(conn: &Connection, plan: &PositionPlan) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare("UPDATE items SET position = ?2 WHERE item_id = ?1")?;
    for update in plan.updates() {
        if let Some(position) = update.to {
            stmt.execute(params![update.item_id, position])?;
        }
    }
    Ok(())
}

/// Release then assign. Use [`release`] and [`assign`] directly when item
/// attributes change between the two phases.
///
/// # Errors
///
/// Returns an error if an update fails.
pub fn apply(conn: &Connection, plan: &PositionPlan) -> rusqlite::Result<()> {
    release(conn, plan)?;
    assign(conn, plan)
}

/// Re-read every scope and check that it is still `1..n`.
///
/// # Errors
///
/// Returns [`BacklogError::InvariantViolation`] for the first broken scope.
pub fn verify(conn: &Connection, scopes: &[Scope]) -> Result<(), BacklogError> {
    for &scope in scopes {
        let list = load_scope(conn, scope)?;
        tracing::trace!(%scope, len = list.len(), "scope verified");
    }
    Ok(())
}
