use chrono::{Datelike, Duration, Months, NaiveDate};

use crate::models::{EquipmentItem, HomeProfile, MaintenanceRule};

/// Jitter applied when a seasonal rule is already in its window, so a batch
/// of same-day generations doesn't stack every task on one date. Injectable
/// so tests can pin the offset.
pub trait Jitter {
    fn offset_days(&mut self, min: i64, max: i64) -> i64;
}

pub struct FastrandJitter(fastrand::Rng);

impl FastrandJitter {
    pub fn new() -> Self {
        Self(fastrand::Rng::new())
    }
}

impl Default for FastrandJitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Jitter for FastrandJitter {
    fn offset_days(&mut self, min: i64, max: i64) -> i64 {
        self.0.i64(min..=max)
    }
}

/// Fixed-offset jitter for deterministic scheduling in tests.
pub struct FixedJitter(pub i64);

impl Jitter for FixedJitter {
    fn offset_days(&mut self, _min: i64, _max: i64) -> i64 {
        self.0
    }
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(date)
}

/// Seasonal policy: in-window rules land within the next two weeks
/// (jittered); out-of-window rules land on day 1 of the nearest future
/// seasonal month, wrapping to next year when needed.
pub fn seasonal_due_date(
    rule: &MaintenanceRule,
    today: NaiveDate,
    jitter: &mut dyn Jitter,
) -> NaiveDate {
    let Some(months) = rule.seasonal_months.as_deref() else {
        return add_months(today, rule.recurrence_months);
    };

    if months.contains(&today.month()) {
        return today + Duration::days(jitter.offset_days(1, 14));
    }

    months
        .iter()
        .filter_map(|&m| {
            let year = if m > today.month() {
                today.year()
            } else {
                today.year() + 1
            };
            NaiveDate::from_ymd_opt(year, m, 1)
        })
        .min()
        .unwrap_or_else(|| add_months(today, rule.recurrence_months))
}

/// Equipment policy: an explicit next-service date wins; otherwise the
/// rule's recurrence interval from today.
pub fn equipment_due_date(
    rule: &MaintenanceRule,
    item: &EquipmentItem,
    today: NaiveDate,
) -> NaiveDate {
    match item.next_service_due {
        Some(due) => due,
        None => add_months(today, rule.recurrence_months),
    }
}

/// Recurrence scaling by home age: older homes get proportionally more
/// frequent maintenance.
fn age_multiplier(age_years: u32) -> f64 {
    if age_years <= 20 {
        1.0
    } else if age_years <= 50 {
        0.8
    } else {
        0.6
    }
}

/// Home-type policy: recurrence interval scaled by the home's age.
pub fn home_type_due_date(
    rule: &MaintenanceRule,
    home: &HomeProfile,
    today: NaiveDate,
) -> NaiveDate {
    let multiplier = age_multiplier(home.age_years(today));
    let months = (rule.recurrence_months as f64 * multiplier).ceil() as u32;
    add_months(today, months)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HomeType;

    fn rule(recurrence: u32, seasonal: Option<Vec<u32>>) -> MaintenanceRule {
        MaintenanceRule {
            id: "r1".into(),
            title: "Test".into(),
            description: String::new(),
            category: "exterior".into(),
            home_types: None,
            equipment_types: None,
            seasonal_months: seasonal,
            climate_conditions: None,
            recurrence_months: recurrence,
            estimated_minutes: None,
            difficulty: 2,
            consequences: None,
            active: true,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn seasonal_in_window_uses_jitter() {
        let r = rule(12, Some(vec![6, 7]));
        let due = seasonal_due_date(&r, date(2025, 6, 10), &mut FixedJitter(5));
        assert_eq!(due, date(2025, 6, 15));
    }

    #[test]
    fn seasonal_out_of_window_targets_nearest_future_month() {
        let r = rule(12, Some(vec![9, 11]));
        let due = seasonal_due_date(&r, date(2025, 6, 10), &mut FixedJitter(1));
        assert_eq!(due, date(2025, 9, 1));
    }

    #[test]
    fn seasonal_wraps_to_next_year_when_window_passed() {
        let r = rule(12, Some(vec![3, 4]));
        let due = seasonal_due_date(&r, date(2025, 6, 10), &mut FixedJitter(1));
        assert_eq!(due, date(2026, 3, 1));
    }

    #[test]
    fn seasonal_picks_nearest_of_mixed_months() {
        // March has passed, October has not: October wins over next March.
        let r = rule(12, Some(vec![3, 10]));
        let due = seasonal_due_date(&r, date(2025, 6, 10), &mut FixedJitter(1));
        assert_eq!(due, date(2025, 10, 1));
    }

    #[test]
    fn equipment_explicit_date_wins() {
        let r = rule(3, None);
        let mut item = EquipmentItem::new(1, "hvac", "Furnace");
        item.next_service_due = Some(date(2025, 8, 20));
        assert_eq!(
            equipment_due_date(&r, &item, date(2025, 6, 10)),
            date(2025, 8, 20)
        );
    }

    #[test]
    fn equipment_falls_back_to_recurrence() {
        let r = rule(3, None);
        let item = EquipmentItem::new(1, "hvac", "Furnace");
        assert_eq!(
            equipment_due_date(&r, &item, date(2025, 6, 10)),
            date(2025, 9, 10)
        );
    }

    #[test]
    fn recurrence_rolls_over_year_boundary() {
        let r = rule(3, None);
        let item = EquipmentItem::new(1, "hvac", "Furnace");
        assert_eq!(
            equipment_due_date(&r, &item, date(2025, 11, 15)),
            date(2026, 2, 15)
        );
    }

    #[test]
    fn home_age_shortens_interval() {
        let r = rule(12, None);
        let today = date(2025, 6, 10);

        let mut home = HomeProfile::new("Test".into(), HomeType::SingleFamily);
        home.year_built = Some(2020); // age 5, multiplier 1.0
        assert_eq!(home_type_due_date(&r, &home, today), date(2026, 6, 10));

        home.year_built = Some(1990); // age 35, multiplier 0.8 -> ceil(9.6) = 10
        assert_eq!(home_type_due_date(&r, &home, today), date(2026, 4, 10));

        home.year_built = Some(1950); // age 75, multiplier 0.6 -> ceil(7.2) = 8
        assert_eq!(home_type_due_date(&r, &home, today), date(2026, 2, 10));
    }

    #[test]
    fn unknown_year_built_uses_default_age() {
        let r = rule(12, None);
        let home = HomeProfile::new("Test".into(), HomeType::SingleFamily);
        // Default age 10 -> multiplier 1.0
        assert_eq!(
            home_type_due_date(&r, &home, date(2025, 6, 10)),
            date(2026, 6, 10)
        );
    }
}
