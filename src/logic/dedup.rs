use std::collections::HashSet;

use crate::models::ExistingTaskRef;

/// Template ids that must not produce another task in this run: seeded
/// from a home's open tasks, grown as candidates accumulate across the
/// generation passes.
#[derive(Debug, Default)]
pub struct ExclusionSet {
    template_ids: HashSet<String>,
}

impl ExclusionSet {
    pub fn from_existing(existing: &[ExistingTaskRef]) -> Self {
        Self {
            template_ids: existing.iter().map(|t| t.template_id.clone()).collect(),
        }
    }

    pub fn contains(&self, template_id: &str) -> bool {
        self.template_ids.contains(template_id)
    }

    pub fn insert(&mut self, template_id: impl Into<String>) {
        self.template_ids.insert(template_id.into());
    }

    pub fn len(&self) -> usize {
        self.template_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.template_ids.is_empty()
    }
}
