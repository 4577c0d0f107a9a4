//! SQLite schema for the item store.
//!
//! - `projects` and `sprints` hold the partition dimensions
//! - `items` carries the attributes that drive eligibility plus `position`
//! - `store_meta` tracks the schema version and the last position rebuild

/// Migration v1: core tables and lookup indexes.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS projects (
    project_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    parent_id INTEGER REFERENCES projects(project_id),
    backlogs_enabled INTEGER NOT NULL DEFAULT 1 CHECK (backlogs_enabled IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    CHECK (parent_id IS NULL OR parent_id <> project_id)
);

CREATE TABLE IF NOT EXISTS sprints (
    sprint_id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL REFERENCES projects(project_id),
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    sharing TEXT NOT NULL DEFAULT 'none'
        CHECK (sharing IN ('none', 'descendants', 'hierarchy', 'tree', 'system')),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS items (
    item_id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(project_id),
    type_id INTEGER NOT NULL CHECK (type_id > 0),
    sprint_id INTEGER REFERENCES sprints(sprint_id),
    subject TEXT NOT NULL DEFAULT '',
    position INTEGER CHECK (position IS NULL OR position >= 1),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    last_rebuild_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO store_meta (id, schema_version, last_rebuild_at_us)
VALUES (1, 0, 0);

CREATE INDEX IF NOT EXISTS idx_items_scope_position
    ON items(project_id, sprint_id, position);

CREATE INDEX IF NOT EXISTS idx_items_project_type
    ON items(project_id, type_id);

CREATE INDEX IF NOT EXISTS idx_sprints_project
    ON sprints(project_id);

CREATE INDEX IF NOT EXISTS idx_projects_parent
    ON projects(parent_id);
";

/// Migration v2: reject duplicate positions within a scope at the storage
/// layer. `IFNULL` folds the product backlog (`sprint_id IS NULL`) into one
/// key so it is covered too.
pub const MIGRATION_V2_SQL: &str = r"
CREATE UNIQUE INDEX IF NOT EXISTS idx_items_scope_position_unique
    ON items(project_id, IFNULL(sprint_id, 0), position)
    WHERE position IS NOT NULL;
";

/// Indexes expected by scope and project query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_items_scope_position",
    "idx_items_scope_position_unique",
    "idx_items_project_type",
    "idx_sprints_project",
    "idx_projects_parent",
];
