use crate::models::{HomeProfile, HomeType, MaintenanceRule};

/// Seasonal matching looks this many months past the current one, so
/// seasonal work surfaces before its window opens.
pub const SEASONAL_LOOKAHEAD_MONTHS: u32 = 2;

/// Wrap a 1-based month forward by `offset`, rolling over December.
pub fn wrap_month(month: u32, offset: u32) -> u32 {
    (month - 1 + offset) % 12 + 1
}

pub fn matches_home_type(rule: &MaintenanceRule, home_type: HomeType) -> bool {
    match &rule.home_types {
        Some(types) => types.contains(&home_type),
        None => true,
    }
}

pub fn matches_equipment(rule: &MaintenanceRule, equipment_types: &[String]) -> bool {
    match &rule.equipment_types {
        Some(types) => types.iter().any(|t| equipment_types.contains(t)),
        None => true,
    }
}

/// True when `month` falls inside the rule's seasonal window, including
/// the look-ahead months. Non-seasonal rules always match.
pub fn in_seasonal_window(rule: &MaintenanceRule, month: u32) -> bool {
    match &rule.seasonal_months {
        Some(months) => (0..=SEASONAL_LOOKAHEAD_MONTHS)
            .any(|offset| months.contains(&wrap_month(month, offset))),
        None => true,
    }
}

pub fn matches_climate(rule: &MaintenanceRule, climate: Option<&[String]>) -> bool {
    match (&rule.climate_conditions, climate) {
        (Some(conditions), Some(tags)) => conditions.iter().any(|c| tags.contains(c)),
        // Climate is an optional predicate: with no home tags to test
        // against, a climate-scoped rule still qualifies.
        _ => true,
    }
}

/// Select the catalog rules applicable to a home right now.
///
/// A rule qualifies only if every predicate it carries is satisfied;
/// unset predicates match anything. The result is ordered by
/// (category, title) so downstream truncation is deterministic. An empty
/// result is a valid outcome, not an error.
pub fn select_applicable(
    rules: Vec<MaintenanceRule>,
    home: &HomeProfile,
    equipment_types: &[String],
    month: u32,
) -> Vec<MaintenanceRule> {
    let climate = home.climate.as_deref();
    let mut selected: Vec<MaintenanceRule> = rules
        .into_iter()
        .filter(|rule| {
            rule.active
                && matches_home_type(rule, home.home_type)
                && matches_equipment(rule, equipment_types)
                && in_seasonal_window(rule, month)
                && matches_climate(rule, climate)
        })
        .collect();

    selected.sort_by(|a, b| (&a.category, &a.title).cmp(&(&b.category, &b.title)));
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, category: &str, title: &str) -> MaintenanceRule {
        MaintenanceRule {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            category: category.into(),
            home_types: None,
            equipment_types: None,
            seasonal_months: None,
            climate_conditions: None,
            recurrence_months: 12,
            estimated_minutes: None,
            difficulty: 2,
            consequences: None,
            active: true,
        }
    }

    fn home(home_type: HomeType) -> HomeProfile {
        HomeProfile::new("Test".into(), home_type)
    }

    #[test]
    fn wrap_month_rolls_over_year() {
        assert_eq!(wrap_month(11, 2), 1);
        assert_eq!(wrap_month(12, 1), 1);
        assert_eq!(wrap_month(12, 2), 2);
        assert_eq!(wrap_month(1, 2), 3);
        assert_eq!(wrap_month(6, 0), 6);
    }

    #[test]
    fn home_type_mismatch_excludes_rule() {
        let mut r = rule("r1", "exterior", "A");
        r.home_types = Some(vec![HomeType::SingleFamily]);
        let selected = select_applicable(vec![r], &home(HomeType::Condo), &[], 6);
        assert!(selected.is_empty());
    }

    #[test]
    fn unset_predicates_match_anything() {
        let selected = select_applicable(vec![rule("r1", "hvac", "A")], &home(HomeType::Condo), &[], 6);
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn equipment_predicate_requires_intersection() {
        let mut r = rule("r1", "hvac", "A");
        r.equipment_types = Some(vec!["hvac".into(), "heat_pump".into()]);
        let h = home(HomeType::SingleFamily);

        assert!(select_applicable(vec![r.clone()], &h, &["water_heater".into()], 6).is_empty());
        assert_eq!(
            select_applicable(vec![r], &h, &["hvac".into()], 6).len(),
            1
        );
    }

    #[test]
    fn seasonal_lookahead_includes_two_months_out() {
        let mut r = rule("gutters", "exterior", "Clean gutters");
        r.seasonal_months = Some(vec![11]);
        let h = home(HomeType::SingleFamily);

        // Two months ahead of November
        assert_eq!(select_applicable(vec![r.clone()], &h, &[], 9).len(), 1);
        // November itself
        assert_eq!(select_applicable(vec![r.clone()], &h, &[], 11).len(), 1);
        // Too early
        assert!(select_applicable(vec![r.clone()], &h, &[], 7).is_empty());
        // Window passed
        assert!(select_applicable(vec![r], &h, &[], 12).is_empty());
    }

    #[test]
    fn seasonal_lookahead_wraps_december() {
        let mut r = rule("r1", "exterior", "A");
        r.seasonal_months = Some(vec![1]);
        let h = home(HomeType::SingleFamily);
        // November looks ahead to January of next year
        assert_eq!(select_applicable(vec![r], &h, &[], 11).len(), 1);
    }

    #[test]
    fn climate_predicate_is_optional() {
        let mut r = rule("r1", "exterior", "A");
        r.climate_conditions = Some(vec!["coastal".into()]);
        let mut h = home(HomeType::SingleFamily);

        // No climate tags on the home: rule still qualifies
        assert_eq!(select_applicable(vec![r.clone()], &h, &[], 6).len(), 1);

        h.climate = Some(vec!["arid".into()]);
        assert!(select_applicable(vec![r.clone()], &h, &[], 6).is_empty());

        h.climate = Some(vec!["coastal".into()]);
        assert_eq!(select_applicable(vec![r], &h, &[], 6).len(), 1);
    }

    #[test]
    fn inactive_rules_are_dropped() {
        let mut r = rule("r1", "hvac", "A");
        r.active = false;
        assert!(select_applicable(vec![r], &home(HomeType::Condo), &[], 6).is_empty());
    }

    #[test]
    fn output_ordered_by_category_then_title() {
        let selected = select_applicable(
            vec![
                rule("r1", "plumbing", "Flush water heater"),
                rule("r2", "hvac", "Replace filter"),
                rule("r3", "hvac", "Clean condenser"),
            ],
            &home(HomeType::SingleFamily),
            &[],
            6,
        );
        let ids: Vec<&str> = selected.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r3", "r2", "r1"]);
    }
}
