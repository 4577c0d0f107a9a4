//! backlog-core library.
//!
//! Keeps a gap-free `1..n` position for every story within its scope (one
//! project's product backlog, or one sprint as seen from one project) while
//! items are created, retyped, replanned, moved between projects, deleted,
//! or reordered by drag and drop.
//!
//! # Conventions
//!
//! - **Errors**: [`BacklogError`] for every engine operation; `anyhow::Result`
//!   for store/config plumbing.
//! - **Logging**: `tracing` macros (`info!` per committed operation, `debug!`
//!   per position plan, `warn!` on retries).

pub mod config;
pub mod db;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod model;
pub mod position;
pub mod reorder;
pub mod scope;

pub use config::{BacklogConfig, load_config};
pub use engine::{Backlog, PositionIssue, RebuildReport, ScopeListing};
pub use error::{BacklogError, EntityKind, ErrorCode};
pub use position::Position;
pub use reorder::{MoveTo, ReorderOutcome, ReorderRequest};
pub use scope::Scope;
