use serde::{Deserialize, Serialize};

use super::ids::{ItemId, ProjectId, SprintId, TypeId};
use crate::position::Position;
use crate::scope::Scope;

/// The attributes that decide whether and where an item is ordered.
///
/// Eligibility depends on `type_id` and the project's configuration; the
/// partition key is `(project_id, sprint_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAttrs {
    pub project_id: ProjectId,
    pub type_id: TypeId,
    pub sprint_id: Option<SprintId>,
}

/// A work item as persisted in the item store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub project_id: ProjectId,
    pub type_id: TypeId,
    pub sprint_id: Option<SprintId>,
    pub subject: String,
    pub position: Option<Position>,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

impl Item {
    #[must_use]
    pub const fn attrs(&self) -> ItemAttrs {
        ItemAttrs {
            project_id: self.project_id,
            type_id: self.type_id,
            sprint_id: self.sprint_id,
        }
    }

    /// The scope whose sequence currently holds this item's position.
    ///
    /// Only positioned items are members of a scope; for consistent data this
    /// is the same as resolving the scope from the item's attributes.
    #[must_use]
    pub fn tracked_scope(&self) -> Option<Scope> {
        self.position
            .map(|_| Scope::new(self.project_id, self.sprint_id))
    }
}

/// Input for creating a new item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub project_id: ProjectId,
    pub type_id: TypeId,
    pub sprint_id: Option<SprintId>,
    pub subject: String,
    pub placement: Placement,
}

/// Where a newly eligible item lands in its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// Appended after the current last item.
    #[default]
    Bottom,
    /// Inserted at position 1.
    Top,
    /// Inserted immediately after the given item of the same scope.
    After(ItemId),
}

/// Attribute changes for an existing item. `None` leaves a field unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemChanges {
    pub type_id: Option<TypeId>,
    /// `Some(None)` moves the item to the product backlog.
    pub sprint_id: Option<Option<SprintId>>,
    pub subject: Option<String>,
}

impl ItemChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.type_id.is_none() && self.sprint_id.is_none() && self.subject.is_none()
    }

    /// Apply the changes to `attrs`, returning the post-mutation snapshot.
    #[must_use]
    pub fn apply_to(&self, attrs: ItemAttrs) -> ItemAttrs {
        ItemAttrs {
            project_id: attrs.project_id,
            type_id: self.type_id.unwrap_or(attrs.type_id),
            sprint_id: self.sprint_id.unwrap_or(attrs.sprint_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(position: Option<Position>, sprint: Option<i64>) -> Item {
        Item {
            id: ItemId::new(1),
            project_id: ProjectId::new(3),
            type_id: TypeId::new(1),
            sprint_id: sprint.map(SprintId::new),
            subject: "Login form".into(),
            position,
            created_at_us: 0,
            updated_at_us: 0,
        }
    }

    #[test]
    fn tracked_scope_requires_position() {
        assert_eq!(item(None, Some(5)).tracked_scope(), None);
        assert_eq!(
            item(Some(2), Some(5)).tracked_scope(),
            Some(Scope::new(ProjectId::new(3), Some(SprintId::new(5))))
        );
    }

    #[test]
    fn changes_keep_unset_fields() {
        let attrs = item(Some(1), Some(5)).attrs();
        let changes = ItemChanges {
            type_id: Some(TypeId::new(2)),
            ..ItemChanges::default()
        };
        let after = changes.apply_to(attrs);
        assert_eq!(after.type_id, TypeId::new(2));
        assert_eq!(after.sprint_id, Some(SprintId::new(5)));
    }

    #[test]
    fn clearing_sprint_moves_to_product_backlog() {
        let attrs = item(Some(1), Some(5)).attrs();
        let changes = ItemChanges {
            sprint_id: Some(None),
            ..ItemChanges::default()
        };
        assert_eq!(changes.apply_to(attrs).sprint_id, None);
        assert!(!changes.is_empty());
    }
}
