//! Projects, sprints, and the sprint sharing rules evaluated over the
//! project tree.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::{fmt, str::FromStr};

use super::ids::{ProjectId, SprintId};

/// A project; the first component of every scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub parent_id: Option<ProjectId>,
    /// Projects without the backlogs module never order their items.
    pub backlogs_enabled: bool,
}

/// How widely a sprint may be assigned outside its owning project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sharing {
    /// Owning project only.
    #[default]
    None,
    /// Owning project and its subprojects.
    Descendants,
    /// Owning project, its ancestors, and its subprojects.
    Hierarchy,
    /// Every project under the same root project.
    Tree,
    /// Every project.
    System,
}

impl Sharing {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Descendants => "descendants",
            Self::Hierarchy => "hierarchy",
            Self::Tree => "tree",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Sharing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`Sharing`] value from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid sharing mode '{0}': expected one of none, descendants, hierarchy, tree, system")]
pub struct ParseSharingError(pub String);

impl FromStr for Sharing {
    type Err = ParseSharingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "descendants" => Ok(Self::Descendants),
            "hierarchy" => Ok(Self::Hierarchy),
            "tree" => Ok(Self::Tree),
            "system" => Ok(Self::System),
            other => Err(ParseSharingError(other.to_string())),
        }
    }
}

/// A sprint. Items with `sprint_id = None` are in the product backlog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: SprintId,
    pub project_id: ProjectId,
    pub name: String,
    pub sharing: Sharing,
}

impl Sprint {
    /// Whether items of `project` may be planned into this sprint.
    #[must_use]
    pub fn is_shared_with(&self, project: ProjectId, tree: &ProjectTree) -> bool {
        if project == self.project_id {
            return true;
        }
        match self.sharing {
            Sharing::None => false,
            Sharing::Descendants => tree.is_ancestor(self.project_id, project),
            Sharing::Hierarchy => {
                tree.is_ancestor(self.project_id, project)
                    || tree.is_ancestor(project, self.project_id)
            }
            Sharing::Tree => tree.root_of(self.project_id) == tree.root_of(project),
            Sharing::System => true,
        }
    }
}

/// Parent links of all projects, used to evaluate sprint sharing.
#[derive(Debug, Clone, Default)]
pub struct ProjectTree {
    parents: HashMap<ProjectId, Option<ProjectId>>,
}

impl ProjectTree {
    #[must_use]
    pub fn from_projects<'a>(projects: impl IntoIterator<Item = &'a Project>) -> Self {
        Self {
            parents: projects
                .into_iter()
                .map(|project| (project.id, project.parent_id))
                .collect(),
        }
    }

    fn parent_of(&self, project: ProjectId) -> Option<ProjectId> {
        self.parents.get(&project).copied().flatten()
    }

    /// Walk parent links from `project` upwards (excluding `project`).
    ///
    /// Bounded by the number of known projects so a corrupt cyclic parent
    /// chain terminates.
    fn ancestors(&self, project: ProjectId) -> impl Iterator<Item = ProjectId> + '_ {
        let mut current = self.parent_of(project);
        let mut remaining = self.parents.len();
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            let next = current?;
            current = self.parent_of(next);
            Some(next)
        })
    }

    /// True when `ancestor` is a strict ancestor of `project`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: ProjectId, project: ProjectId) -> bool {
        self.ancestors(project).any(|candidate| candidate == ancestor)
    }

    /// Topmost ancestor of `project` (the project itself when it has no parent).
    #[must_use]
    pub fn root_of(&self, project: ProjectId) -> ProjectId {
        self.ancestors(project).last().unwrap_or(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: i64, parent: Option<i64>) -> Project {
        Project {
            id: ProjectId::new(id),
            name: format!("P{id}"),
            parent_id: parent.map(ProjectId::new),
            backlogs_enabled: true,
        }
    }

    fn sprint(owner: i64, sharing: Sharing) -> Sprint {
        Sprint {
            id: SprintId::new(1),
            project_id: ProjectId::new(owner),
            name: "Shared Sprint".into(),
            sharing,
        }
    }

    //   1
    //   ├── 2
    //   │   └── 4
    //   └── 3
    //   5 (separate root)
    fn tree() -> ProjectTree {
        let projects = [
            project(1, None),
            project(2, Some(1)),
            project(3, Some(1)),
            project(4, Some(2)),
            project(5, None),
        ];
        ProjectTree::from_projects(&projects)
    }

    #[test]
    fn unshared_sprint_only_visible_to_owner() {
        let tree = tree();
        let s = sprint(2, Sharing::None);
        assert!(s.is_shared_with(ProjectId::new(2), &tree));
        assert!(!s.is_shared_with(ProjectId::new(4), &tree));
    }

    #[test]
    fn descendants_sharing_reaches_subprojects_only() {
        let tree = tree();
        let s = sprint(2, Sharing::Descendants);
        assert!(s.is_shared_with(ProjectId::new(4), &tree));
        assert!(!s.is_shared_with(ProjectId::new(1), &tree));
        assert!(!s.is_shared_with(ProjectId::new(3), &tree));
    }

    #[test]
    fn hierarchy_sharing_reaches_ancestors_and_descendants() {
        let tree = tree();
        let s = sprint(2, Sharing::Hierarchy);
        assert!(s.is_shared_with(ProjectId::new(1), &tree));
        assert!(s.is_shared_with(ProjectId::new(4), &tree));
        assert!(!s.is_shared_with(ProjectId::new(3), &tree));
    }

    #[test]
    fn tree_sharing_stops_at_root_boundary() {
        let tree = tree();
        let s = sprint(4, Sharing::Tree);
        assert!(s.is_shared_with(ProjectId::new(3), &tree));
        assert!(!s.is_shared_with(ProjectId::new(5), &tree));
    }

    #[test]
    fn system_sharing_reaches_everyone() {
        let tree = tree();
        assert!(sprint(4, Sharing::System).is_shared_with(ProjectId::new(5), &tree));
    }

    #[test]
    fn cyclic_parent_chain_terminates() {
        let projects = [project(1, Some(2)), project(2, Some(1))];
        let tree = ProjectTree::from_projects(&projects);
        assert!(!tree.is_ancestor(ProjectId::new(3), ProjectId::new(1)));
        let _ = tree.root_of(ProjectId::new(1));
    }

    #[test]
    fn sharing_round_trips_through_text() {
        for sharing in [
            Sharing::None,
            Sharing::Descendants,
            Sharing::Hierarchy,
            Sharing::Tree,
            Sharing::System,
        ] {
            assert_eq!(sharing.as_str().parse::<Sharing>(), Ok(sharing));
        }
        assert!("everyone".parse::<Sharing>().is_err());
    }
}
