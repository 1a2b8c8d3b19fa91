use chrono::{Duration, NaiveDate};

use crate::models::MaintenanceTask;

/// Order candidates by urgency and truncate to the look-ahead horizon.
///
/// With `prioritize_overdue`, the primary key is days-until-due ascending
/// (overdue first) with priority as tie-break; otherwise priority alone.
/// The sort is stable, so equal keys keep their pass order. Tasks due
/// beyond `today + look_ahead_days` are dropped; overdue tasks are always
/// retained.
pub fn schedule(
    mut tasks: Vec<MaintenanceTask>,
    look_ahead_days: i64,
    prioritize_overdue: bool,
    today: NaiveDate,
) -> Vec<MaintenanceTask> {
    if prioritize_overdue {
        tasks.sort_by_key(|t| ((t.due_date - today).num_days(), t.priority));
    } else {
        tasks.sort_by_key(|t| t.priority);
    }

    let horizon = today + Duration::days(look_ahead_days);
    tasks.retain(|t| t.due_date <= horizon);
    tasks
}
