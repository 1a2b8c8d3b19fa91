use super::HomeType;
use serde::{Deserialize, Serialize};

/// A reusable maintenance-task definition with applicability conditions
/// and scheduling metadata. Read-only input to the generation engine;
/// the catalog content itself is data (`data/templates.yaml` or the
/// task_templates table).
///
/// Each predicate is optional: `None` means "applies to any".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceRule {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Free-form category, e.g. "hvac", "exterior", "plumbing".
    pub category: String,
    #[serde(default)]
    pub home_types: Option<Vec<HomeType>>,
    #[serde(default)]
    pub equipment_types: Option<Vec<String>>,
    /// Months (1-12) in which this work is seasonal. `None` = non-seasonal.
    #[serde(default)]
    pub seasonal_months: Option<Vec<u32>>,
    #[serde(default)]
    pub climate_conditions: Option<Vec<String>>,
    pub recurrence_months: u32,
    #[serde(default)]
    pub estimated_minutes: Option<u32>,
    /// Ordinal 1 (trivial) to 5 (call a professional).
    pub difficulty: u8,
    /// Free text describing what happens if the task is skipped; scanned
    /// for severity keywords by the priority scorer.
    #[serde(default)]
    pub consequences: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Top-level shape of the bundled YAML catalog document.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateCatalog {
    pub templates: Vec<MaintenanceRule>,
}
