//! The backlog engine: every position-affecting operation as one
//! `BEGIN IMMEDIATE` transaction over the item store.
//!
//! Taking the write lock before any scope row is read serializes concurrent
//! operations on the same scope. A busy store is retried a bounded number of
//! times (`[engine] max_retries`) with linear backoff; after that the caller
//! sees [`BacklogError::ConflictRetryable`]. Any error before commit drops
//! the transaction, which rolls every write back.

mod lifecycle;
mod maintenance;

pub use maintenance::{PositionIssue, RebuildReport};

use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use std::path::Path;

use crate::config::BacklogConfig;
use crate::db::{self, positions, query};
use crate::error::{BacklogError, EntityKind};
use crate::model::{
    Item, ItemChanges, ItemId, NewItem, Placement, Project, ProjectId, ProjectTree, Sharing, Sprint,
    SprintId,
};
use crate::position::{self, PositionPlan, ScopeList};
use crate::reorder::{self, ReorderOutcome, ReorderRequest};
use crate::scope::{Scope, ScopeTransition};

/// Ordered items of one scope, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeListing {
    pub scope: Scope,
    /// `None` for the product backlog.
    pub sprint_name: Option<String>,
    pub items: Vec<Item>,
}

/// Handle over one item store and the configuration that classifies its
/// items.
#[derive(Debug)]
pub struct Backlog {
    conn: Connection,
    config: BacklogConfig,
}

impl Backlog {
    /// Open (or create) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the store cannot
    /// be opened and migrated.
    pub fn open(path: &Path, config: BacklogConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let conn = db::open_store(path, config.engine.busy_timeout())?;
        Ok(Self { conn, config })
    }

    /// A private in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the schema cannot
    /// be created.
    pub fn in_memory(config: BacklogConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let conn = db::open_in_memory()?;
        Ok(Self { conn, config })
    }

    #[must_use]
    pub const fn config(&self) -> &BacklogConfig {
        &self.config
    }

    /// Run `op` in an immediate transaction, retrying while the store is busy.
    fn write<T>(
        &mut self,
        op: &'static str,
        mut f: impl FnMut(&Connection, &BacklogConfig) -> Result<T, BacklogError>,
    ) -> Result<T, BacklogError> {
        let engine = self.config.engine;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match run_transaction(&mut self.conn, &self.config, &mut f) {
                Err(err) if err.is_retryable() && attempt <= engine.max_retries => {
                    tracing::warn!(op, attempt, "store busy, retrying");
                    std::thread::sleep(engine.retry_backoff() * attempt);
                }
                Err(BacklogError::ConflictRetryable { .. }) => {
                    tracing::warn!(op, attempts = attempt, "store busy, giving up");
                    return Err(BacklogError::ConflictRetryable { attempts: attempt });
                }
                Err(err) => {
                    tracing::debug!(op, error = %err, "operation rolled back");
                    return Err(err);
                }
                Ok(value) => return Ok(value),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Projects and sprints
    // -----------------------------------------------------------------------

    /// Create a project, optionally under `parent`.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for a blank name, `NotFound` for an unknown parent.
    pub fn add_project(
        &mut self,
        name: &str,
        parent: Option<ProjectId>,
        backlogs_enabled: bool,
    ) -> Result<Project, BacklogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BacklogError::invalid("project name must not be empty"));
        }
        self.write("add_project", |conn, _| {
            if let Some(parent) = parent {
                require_project(conn, parent)?;
            }
            let id = query::insert_project(conn, name, parent, backlogs_enabled, now_us())?;
            tracing::info!(project = %id, name, "project created");
            require_project(conn, id)
        })
    }

    /// Enable or disable the backlogs module of a project and re-sequence its
    /// scopes: disabling clears every position, enabling numbers the stories.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown project.
    pub fn set_backlogs_enabled(
        &mut self,
        project: ProjectId,
        enabled: bool,
    ) -> Result<RebuildReport, BacklogError> {
        self.write("set_backlogs_enabled", |conn, config| {
            if !query::set_backlogs_enabled(conn, project, enabled)? {
                return Err(not_found(EntityKind::Project, project.get()));
            }
            tracing::info!(%project, enabled, "backlogs module toggled");
            maintenance::rebuild(conn, config, project)
        })
    }

    /// Create a sprint owned by `project`.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for a blank name, `NotFound` for an unknown project.
    pub fn add_sprint(
        &mut self,
        project: ProjectId,
        name: &str,
        sharing: Sharing,
    ) -> Result<Sprint, BacklogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BacklogError::invalid("sprint name must not be empty"));
        }
        self.write("add_sprint", |conn, _| {
            require_project(conn, project)?;
            let id = query::insert_sprint(conn, project, name, sharing, now_us())?;
            tracing::info!(sprint = %id, %project, %sharing, "sprint created");
            require_sprint(conn, id)
        })
    }

    // -----------------------------------------------------------------------
    // Item lifecycle
    // -----------------------------------------------------------------------

    /// Create an item; eligible items are placed per `new.placement`.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown project, sprint, or predecessor; `Forbidden`
    /// for a sprint not shared with the project; `InvalidRequest` for a
    /// predecessor outside the new item's scope.
    pub fn create_item(&mut self, new: &NewItem) -> Result<Item, BacklogError> {
        self.write("create_item", |conn, config| lifecycle::create(conn, config, new))
    }

    /// Change type, sprint, or subject of an item.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown item or sprint; `Forbidden` for a sprint not
    /// shared with the item's project.
    pub fn update_item(&mut self, id: ItemId, changes: &ItemChanges) -> Result<Item, BacklogError> {
        self.write("update_item", |conn, config| {
            lifecycle::update(conn, config, id, changes)
        })
    }

    /// Move an item to another project. With `sprint` given the item is
    /// planned into it; otherwise its current sprint is kept when shared with
    /// `target` and cleared when not. The item lands at the bottom of its
    /// new scope.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown item, project, or sprint; `Forbidden` for an
    /// explicit sprint not shared with `target`.
    pub fn move_to_project(
        &mut self,
        id: ItemId,
        target: ProjectId,
        sprint: Option<SprintId>,
    ) -> Result<Item, BacklogError> {
        self.write("move_to_project", |conn, config| {
            lifecycle::move_to_project(conn, config, id, target, sprint)
        })
    }

    /// Delete an item, closing the gap it leaves.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown item.
    pub fn delete_item(&mut self, id: ItemId) -> Result<(), BacklogError> {
        self.write("delete_item", |conn, _| lifecycle::delete(conn, id))
    }

    /// Apply a drag-and-drop result within `project`.
    ///
    /// # Errors
    ///
    /// See [`ReorderRequest`] for the rejection rules.
    pub fn reorder(
        &mut self,
        project: ProjectId,
        request: &ReorderRequest,
    ) -> Result<ReorderOutcome, BacklogError> {
        self.write("reorder", |conn, config| {
            reorder::apply(conn, config, project, request)
        })
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Re-sequence every scope of `project` and clear stray positions.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown project.
    pub fn rebuild_positions(&mut self, project: ProjectId) -> Result<RebuildReport, BacklogError> {
        self.write("rebuild_positions", |conn, config| {
            maintenance::rebuild(conn, config, project)
        })
    }

    /// Report position problems of `project` without changing anything.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown project.
    pub fn check(&self, project: ProjectId) -> Result<Vec<PositionIssue>, BacklogError> {
        maintenance::check(&self.conn, &self.config, project)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// `NotFound` for an unknown item.
    pub fn item(&self, id: ItemId) -> Result<Item, BacklogError> {
        require_item(&self.conn, id)
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown project.
    pub fn project(&self, id: ProjectId) -> Result<Project, BacklogError> {
        require_project(&self.conn, id)
    }

    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub fn projects(&self) -> Result<Vec<Project>, BacklogError> {
        Ok(query::list_projects(&self.conn)?)
    }

    /// Sprints owned by or shared with `project`.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown project.
    pub fn sprints_for(&self, project: ProjectId) -> Result<Vec<Sprint>, BacklogError> {
        require_project(&self.conn, project)?;
        let tree = project_tree(&self.conn)?;
        Ok(query::list_sprints(&self.conn)?
            .into_iter()
            .filter(|sprint| sprint.is_shared_with(project, &tree))
            .collect())
    }

    /// Ordered members of one scope.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub fn list_scope(&self, scope: Scope) -> Result<Vec<Item>, BacklogError> {
        Ok(query::list_scope_items(&self.conn, scope)?)
    }

    /// The product backlog of `project` followed by every sprint visible to
    /// it, each in order.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown project.
    pub fn backlogs(&self, project: ProjectId) -> Result<Vec<ScopeListing>, BacklogError> {
        let mut listings = vec![ScopeListing {
            scope: Scope::product_backlog(project),
            sprint_name: None,
            items: self.list_scope(Scope::product_backlog(project))?,
        }];
        for sprint in self.sprints_for(project)? {
            let scope = Scope::sprint(project, sprint.id);
            listings.push(ScopeListing {
                scope,
                sprint_name: Some(sprint.name),
                items: self.list_scope(scope)?,
            });
        }
        Ok(listings)
    }
}

fn run_transaction<T>(
    conn: &mut Connection,
    config: &BacklogConfig,
    f: &mut impl FnMut(&Connection, &BacklogConfig) -> Result<T, BacklogError>,
) -> Result<T, BacklogError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = f(&tx, config)?;
    tx.commit()?;
    Ok(value)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub(crate) fn now_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

pub(crate) const fn not_found(kind: EntityKind, id: i64) -> BacklogError {
    BacklogError::NotFound { kind, id }
}

pub(crate) fn require_project(conn: &Connection, id: ProjectId) -> Result<Project, BacklogError> {
    query::get_project(conn, id)?.ok_or_else(|| not_found(EntityKind::Project, id.get()))
}

pub(crate) fn require_sprint(conn: &Connection, id: SprintId) -> Result<Sprint, BacklogError> {
    query::get_sprint(conn, id)?.ok_or_else(|| not_found(EntityKind::Sprint, id.get()))
}

pub(crate) fn require_item(conn: &Connection, id: ItemId) -> Result<Item, BacklogError> {
    query::get_item(conn, id)?.ok_or_else(|| not_found(EntityKind::Item, id.get()))
}

pub(crate) fn project_tree(conn: &Connection) -> Result<ProjectTree, BacklogError> {
    let projects = query::list_projects(conn)?;
    Ok(ProjectTree::from_projects(&projects))
}

/// The sprint, provided items of `project` may be planned into it.
pub(crate) fn require_reachable_sprint(
    conn: &Connection,
    sprint: SprintId,
    project: ProjectId,
) -> Result<Sprint, BacklogError> {
    let sprint = require_sprint(conn, sprint)?;
    if !sprint.is_shared_with(project, &project_tree(conn)?) {
        return Err(BacklogError::forbidden(format!(
            "sprint {} of project {} is not shared with project {project}",
            sprint.id, sprint.project_id
        )));
    }
    Ok(sprint)
}

fn land(
    conn: &Connection,
    list: &mut ScopeList,
    item: ItemId,
    placement: Placement,
) -> Result<PositionPlan, BacklogError> {
    match placement {
        Placement::Bottom => Ok(PositionPlan::default()),
        Placement::Top => Ok(list.move_within(item, 1)?),
        Placement::After(pred) => {
            require_item(conn, pred)?;
            if !list.contains(pred) {
                return Err(BacklogError::invalid(format!(
                    "item {pred} is not in {}",
                    list.scope()
                )));
            }
            Ok(list.place_after(item, Some(pred))?)
        }
    }
}

/// Move `item` from `before` to `after` and persist the result.
///
/// `write` runs between releasing and assigning positions; it persists the
/// attribute change (or the deletion) that caused the transition.
pub(crate) fn reposition(
    conn: &Connection,
    item: ItemId,
    before: Option<Scope>,
    after: Option<Scope>,
    placement: Placement,
    write: impl FnOnce(&Connection) -> Result<(), BacklogError>,
) -> Result<(), BacklogError> {
    let transition = ScopeTransition::between(before, after);
    let plan = match transition {
        ScopeTransition::Untracked | ScopeTransition::Unchanged(_) => PositionPlan::default(),
        ScopeTransition::Enter(scope) => {
            let mut list = positions::load_scope(conn, scope)?;
            let plan = list.append_bottom(item)?;
            plan.merge(land(conn, &mut list, item, placement)?)
        }
        ScopeTransition::Leave(scope) => positions::load_scope(conn, scope)?.remove(item)?,
        ScopeTransition::Transfer { from, to } => {
            let mut source = positions::load_scope(conn, from)?;
            let mut target = positions::load_scope(conn, to)?;
            let plan = position::transfer(&mut source, &mut target, item, None)?;
            plan.merge(land(conn, &mut target, item, placement)?)
        }
    };

    tracing::debug!(%item, ?transition, updates = plan.len(), "position plan");

    positions::release(conn, &plan)?;
    write(conn)?;
    positions::assign(conn, &plan)?;
    positions::verify(conn, &transition.touched())
}
