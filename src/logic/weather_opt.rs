use chrono::NaiveDate;

use crate::models::MaintenanceTask;

/// Categories whose work happens outdoors and is worth shifting onto
/// good-weather days.
const WEATHER_SENSITIVE_CATEGORIES: &[&str] = &[
    "exterior",
    "lawn_garden",
    "roofing",
    "gutters",
    "windows_doors",
];

pub fn is_weather_dependent(category: &str) -> bool {
    WEATHER_SENSITIVE_CATEGORIES.contains(&category)
}

/// Reassign weather-dependent tasks onto the ranked best-day list,
/// round-robin so outdoor work spreads across the good days instead of
/// stacking on one date. Non-dependent tasks and an empty day list are
/// left untouched; this is a soft optimization, never a failure.
pub fn apply_best_days(tasks: &mut [MaintenanceTask], best_days: &[NaiveDate]) {
    if best_days.is_empty() {
        return;
    }

    let mut outdoor_count = 0usize;
    for task in tasks.iter_mut() {
        if task.weather_dependent {
            task.due_date = best_days[outdoor_count % best_days.len()];
            outdoor_count += 1;
        }
    }
}
