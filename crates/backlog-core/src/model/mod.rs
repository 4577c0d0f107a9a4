//! Domain types shared by the classifier, resolver, maintainer, and store.

pub mod ids;
pub mod item;
pub mod project;

pub use ids::{ItemId, ParseIdError, ProjectId, SprintId, TypeId};
pub use item::{Item, ItemAttrs, ItemChanges, NewItem, Placement};
pub use project::{Project, ProjectTree, Sharing, Sprint};
