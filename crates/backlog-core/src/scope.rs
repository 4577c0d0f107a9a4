//! Scope resolver: the partition key of an eligible item.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::eligibility::{ProjectConfig, is_eligible};
use crate::model::{ItemAttrs, ProjectId, SprintId};

/// A partition of ordered items: one project's product backlog
/// (`sprint_id = None`) or one sprint as seen from one project.
///
/// Positions are only comparable between items of the same scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Scope {
    pub project_id: ProjectId,
    pub sprint_id: Option<SprintId>,
}

impl Scope {
    #[must_use]
    pub const fn new(project_id: ProjectId, sprint_id: Option<SprintId>) -> Self {
        Self {
            project_id,
            sprint_id,
        }
    }

    #[must_use]
    pub const fn product_backlog(project_id: ProjectId) -> Self {
        Self::new(project_id, None)
    }

    #[must_use]
    pub const fn sprint(project_id: ProjectId, sprint_id: SprintId) -> Self {
        Self::new(project_id, Some(sprint_id))
    }

    #[must_use]
    pub const fn is_product_backlog(&self) -> bool {
        self.sprint_id.is_none()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sprint_id {
            Some(sprint) => write!(f, "project {} / sprint {sprint}", self.project_id),
            None => write!(f, "project {} / product backlog", self.project_id),
        }
    }
}

/// Resolve the scope of an item snapshot, or `None` when it is ineligible.
#[must_use]
pub fn resolve_scope(attrs: &ItemAttrs, config: &ProjectConfig) -> Option<Scope> {
    is_eligible(attrs, config).then(|| Scope::new(attrs.project_id, attrs.sprint_id))
}

/// What a mutation does to an item's membership, from the scopes resolved
/// before and after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeTransition {
    /// Ineligible before and after; positions untouched.
    Untracked,
    /// Same scope before and after; the item keeps its slot.
    Unchanged(Scope),
    /// Became eligible; appended at the bottom.
    Enter(Scope),
    /// Lost eligibility; removed and the gap closed.
    Leave(Scope),
    /// Changed partition; removed from `from`, appended to `to`.
    Transfer { from: Scope, to: Scope },
}

impl ScopeTransition {
    #[must_use]
    pub fn between(before: Option<Scope>, after: Option<Scope>) -> Self {
        match (before, after) {
            (None, None) => Self::Untracked,
            (None, Some(to)) => Self::Enter(to),
            (Some(from), None) => Self::Leave(from),
            (Some(from), Some(to)) if from == to => Self::Unchanged(to),
            (Some(from), Some(to)) => Self::Transfer { from, to },
        }
    }

    /// Scopes whose sequence this transition rewrites.
    #[must_use]
    pub fn touched(&self) -> Vec<Scope> {
        match *self {
            Self::Untracked | Self::Unchanged(_) => Vec::new(),
            Self::Enter(scope) | Self::Leave(scope) => vec![scope],
            Self::Transfer { from, to } => vec![from, to],
        }
    }
}
