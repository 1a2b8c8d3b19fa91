use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A piece of installed equipment (furnace, water heater, sump pump, ...).
///
/// `equipment_type` is a free-form identifier matched against template
/// predicates, e.g. "hvac", "water_heater", "gutters".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentItem {
    pub id: Option<i64>,
    pub home_id: i64,
    pub equipment_type: String,
    pub name: String,
    /// Explicit service date overriding recurrence-based scheduling.
    pub next_service_due: Option<NaiveDate>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl EquipmentItem {
    pub fn new(home_id: i64, equipment_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            home_id,
            equipment_type: equipment_type.into(),
            name: name.into(),
            next_service_due: None,
            created_at: chrono::Utc::now(),
        }
    }
}
