//! Eligibility classifier: does an item take part in position tracking?

use std::collections::BTreeSet;

use crate::model::{ItemAttrs, ProjectId, TypeId};

/// The configuration the classifier needs for one project.
///
/// Built by [`crate::config::BacklogConfig::for_project`] and passed in
/// explicitly; nothing here reads process-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub project_id: ProjectId,
    pub backlogs_enabled: bool,
    pub story_types: BTreeSet<TypeId>,
}

impl ProjectConfig {
    #[must_use]
    pub fn new(
        project_id: ProjectId,
        backlogs_enabled: bool,
        story_types: impl IntoIterator<Item = TypeId>,
    ) -> Self {
        Self {
            project_id,
            backlogs_enabled,
            story_types: story_types.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn is_story_type(&self, type_id: TypeId) -> bool {
        self.story_types.contains(&type_id)
    }
}

/// An item is eligible iff its project has backlogs enabled and its type is
/// one of the project's story types.
///
/// `config` must describe the item's own project; a config for any other
/// project classifies the item as ineligible.
#[must_use]
pub fn is_eligible(attrs: &ItemAttrs, config: &ProjectConfig) -> bool {
    if attrs.project_id != config.project_id {
        tracing::debug!(
            item_project = %attrs.project_id,
            config_project = %config.project_id,
            "project config does not match item project"
        );
        return false;
    }
    config.backlogs_enabled && config.is_story_type(attrs.type_id)
}
