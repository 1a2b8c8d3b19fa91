use chrono::NaiveDate;

use crate::models::MaintenanceRule;

/// Severity keywords in a rule's consequence text that bump urgency.
/// Matched case-sensitively, as authored in the catalog.
const SEVERITY_KEYWORDS: &[&str] = &["damage", "expensive"];

/// Score a candidate task's priority from 1 (most urgent) to 5.
///
/// Base value comes from days until due; a severity keyword in the
/// consequence text decrements the score once, floored at 1.
pub fn score(rule: &MaintenanceRule, due_date: NaiveDate, today: NaiveDate) -> u8 {
    let days_until_due = (due_date - today).num_days();

    let mut priority: i64 = if days_until_due <= 7 {
        1
    } else if days_until_due <= 30 {
        2
    } else if days_until_due > 90 {
        4
    } else {
        3
    };

    if let Some(consequences) = &rule.consequences {
        if SEVERITY_KEYWORDS.iter().any(|kw| consequences.contains(kw)) {
            priority -= 1;
        }
    }

    priority.clamp(1, 5) as u8
}
