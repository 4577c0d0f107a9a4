//! Typed reads and attribute writes for projects, sprints, and items.
//!
//! All functions take a shared `&Connection` (a `Transaction` derefs to one)
//! and return `rusqlite::Result` so the engine can tell a busy store apart
//! from other failures. The `position` column is never written here; see
//! [`super::positions`].

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::model::{Item, ItemAttrs, ItemId, Project, ProjectId, Sharing, Sprint, SprintId};
use crate::scope::Scope;

const ITEM_COLUMNS: &str = "item_id, project_id, type_id, sprint_id, subject, position, \
                            created_at_us, updated_at_us";

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        project_id: row.get(1)?,
        type_id: row.get(2)?,
        sprint_id: row.get(3)?,
        subject: row.get(4)?,
        position: row.get(5)?,
        created_at_us: row.get(6)?,
        updated_at_us: row.get(7)?,
    })
}

fn row_to_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        backlogs_enabled: row.get(3)?,
    })
}

fn row_to_sprint(row: &Row<'_>) -> rusqlite::Result<Sprint> {
    let sharing: String = row.get(3)?;
    Ok(Sprint {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        sharing: sharing
            .parse::<Sharing>()
            .map_err(|err| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(err)))?,
    })
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// Insert a project and return its id.
///
/// # Errors
///
/// Returns an error if the insert fails (e.g. unknown parent).
pub fn insert_project(
    conn: &Connection,
    name: &str,
    parent_id: Option<ProjectId>,
    backlogs_enabled: bool,
    now_us: i64,
) -> rusqlite::Result<ProjectId> {
    conn.execute(
        "INSERT INTO projects (name, parent_id, backlogs_enabled, created_at_us)
         VALUES (?1, ?2, ?3, ?4)",
        params![name, parent_id, backlogs_enabled, now_us],
    )?;
    Ok(ProjectId::new(conn.last_insert_rowid()))
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn get_project(conn: &Connection, id: ProjectId) -> rusqlite::Result<Option<Project>> {
    conn.query_row(
        "SELECT project_id, name, parent_id, backlogs_enabled FROM projects WHERE project_id = ?1",
        [id],
        row_to_project,
    )
    .optional()
}

/// All projects ordered by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_projects(conn: &Connection) -> rusqlite::Result<Vec<Project>> {
    let mut stmt = conn.prepare(
        "SELECT project_id, name, parent_id, backlogs_enabled FROM projects ORDER BY project_id",
    )?;
    stmt.query_map([], row_to_project)?.collect()
}

/// Returns `false` when no project has this id.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn set_backlogs_enabled(
    conn: &Connection,
    id: ProjectId,
    enabled: bool,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE projects SET backlogs_enabled = ?2 WHERE project_id = ?1",
        params![id, enabled],
    )?;
    Ok(changed > 0)
}

// ---------------------------------------------------------------------------
// Sprints
// ---------------------------------------------------------------------------

/// Insert a sprint owned by `project_id` and return its id.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_sprint(
    conn: &Connection,
    project_id: ProjectId,
    name: &str,
    sharing: Sharing,
    now_us: i64,
) -> rusqlite::Result<SprintId> {
    conn.execute(
        "INSERT INTO sprints (project_id, name, sharing, created_at_us) VALUES (?1, ?2, ?3, ?4)",
        params![project_id, name, sharing.as_str(), now_us],
    )?;
    Ok(SprintId::new(conn.last_insert_rowid()))
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn get_sprint(conn: &Connection, id: SprintId) -> rusqlite::Result<Option<Sprint>> {
    conn.query_row(
        "SELECT sprint_id, project_id, name, sharing FROM sprints WHERE sprint_id = ?1",
        [id],
        row_to_sprint,
    )
    .optional()
}

/// All sprints ordered by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_sprints(conn: &Connection) -> rusqlite::Result<Vec<Sprint>> {
    let mut stmt =
        conn.prepare("SELECT sprint_id, project_id, name, sharing FROM sprints ORDER BY sprint_id")?;
    stmt.query_map([], row_to_sprint)?.collect()
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Insert an unpositioned item and return its id.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_item(
    conn: &Connection,
    attrs: &ItemAttrs,
    subject: &str,
    now_us: i64,
) -> rusqlite::Result<ItemId> {
    conn.execute(
        "INSERT INTO items (project_id, type_id, sprint_id, subject, position,
                            created_at_us, updated_at_us)
         VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?5)",
        params![attrs.project_id, attrs.type_id, attrs.sprint_id, subject, now_us],
    )?;
    Ok(ItemId::new(conn.last_insert_rowid()))
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn get_item(conn: &Connection, id: ItemId) -> rusqlite::Result<Option<Item>> {
    conn.query_row(
        &format!("SELECT {ITEM_COLUMNS} FROM items WHERE item_id = ?1"),
        [id],
        row_to_item,
    )
    .optional()
}

/// Overwrite the eligibility attributes (and optionally the subject).
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn update_item_attrs(
    conn: &Connection,
    id: ItemId,
    attrs: &ItemAttrs,
    subject: Option<&str>,
    now_us: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE items
         SET project_id = ?2, type_id = ?3, sprint_id = ?4,
             subject = COALESCE(?5, subject), updated_at_us = ?6
         WHERE item_id = ?1",
        params![id, attrs.project_id, attrs.type_id, attrs.sprint_id, subject, now_us],
    )?;
    Ok(())
}

/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_item(conn: &Connection, id: ItemId) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM items WHERE item_id = ?1", [id])?;
    Ok(())
}

/// Every item of a project: product backlog first, then by sprint, each
/// ordered by position (unpositioned last) and id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_project_items(conn: &Connection, project: ProjectId) -> rusqlite::Result<Vec<Item>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS}
         FROM items
         WHERE project_id = ?1
         ORDER BY sprint_id IS NOT NULL, sprint_id, position IS NULL, position, item_id"
    ))?;
    stmt.query_map([project], row_to_item)?.collect()
}

/// Positioned members of `scope` in order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_scope_items(conn: &Connection, scope: Scope) -> rusqlite::Result<Vec<Item>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS}
         FROM items
         WHERE project_id = ?1 AND sprint_id IS ?2 AND position IS NOT NULL
         ORDER BY position, item_id"
    ))?;
    stmt.query_map(params![scope.project_id, scope.sprint_id], row_to_item)?
        .collect()
}

/// Record the time of the last position rebuild.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn mark_rebuilt(conn: &Connection, now_us: i64) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE store_meta SET last_rebuild_at_us = ?1 WHERE id = 1",
        [now_us],
    )?;
    Ok(())
}
