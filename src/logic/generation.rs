use chrono::{Datelike, Local, NaiveDate};
use tracing::{debug, warn};

use crate::datasources::ForecastProvider;
use crate::error::Result;
use crate::logic::applicability::select_applicable;
use crate::logic::dedup::ExclusionSet;
use crate::logic::due_date::{self, FastrandJitter, Jitter};
use crate::logic::{priority, schedule, weather_opt};
use crate::models::{
    EquipmentItem, ExistingTaskRef, HomeProfile, MaintenanceRule, MaintenanceTask, TaskStatus,
};
use crate::store::MaintenanceStore;

#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub weather_optimization: bool,
    pub max_tasks_per_pass: usize,
    pub prioritize_overdue: bool,
    pub look_ahead_days: i64,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            weather_optimization: true,
            max_tasks_per_pass: 5,
            prioritize_overdue: true,
            look_ahead_days: 30,
        }
    }
}

/// Result of a generation run. Faults inside the engine surface here as
/// the `Failed` variant; the entry points never return an `Err` to their
/// caller.
#[derive(Debug)]
pub enum GenerationOutcome {
    Completed(Vec<MaintenanceTask>),
    Failed(String),
}

impl GenerationOutcome {
    pub fn success(&self) -> bool {
        matches!(self, GenerationOutcome::Completed(_))
    }

    pub fn tasks(&self) -> &[MaintenanceTask] {
        match self {
            GenerationOutcome::Completed(tasks) => tasks,
            GenerationOutcome::Failed(_) => &[],
        }
    }

    pub fn tasks_generated(&self) -> usize {
        self.tasks().len()
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            GenerationOutcome::Completed(_) => None,
            GenerationOutcome::Failed(message) => Some(message),
        }
    }
}

/// Orchestrates the generation passes over a home: seasonal, then
/// equipment-driven, then home-type-driven, in that fixed order. Later
/// passes consult the exclusion set built by earlier ones, so the passes
/// must not run concurrently.
pub struct TaskGenerationService<S, F> {
    store: S,
    forecast: Option<F>,
    jitter: Box<dyn Jitter + Send>,
    today_override: Option<NaiveDate>,
}

impl<S: MaintenanceStore, F: ForecastProvider> TaskGenerationService<S, F> {
    pub fn new(store: S, forecast: Option<F>) -> Self {
        Self {
            store,
            forecast,
            jitter: Box::new(FastrandJitter::new()),
            today_override: None,
        }
    }

    /// Replace the due-date jitter source, e.g. with a fixed offset in tests.
    pub fn with_jitter(mut self, jitter: Box<dyn Jitter + Send>) -> Self {
        self.jitter = jitter;
        self
    }

    /// Pin "today" instead of reading the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today_override = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today_override
            .unwrap_or_else(|| Local::now().date_naive())
    }

    /// Full generation: all three passes, weather optimization, windowing,
    /// and persistence.
    pub async fn generate_for_home(
        &mut self,
        home_id: i64,
        options: &GenerationOptions,
    ) -> GenerationOutcome {
        match self.run_full(home_id, options).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(home_id, error = %e, "Task generation failed");
                GenerationOutcome::Failed(e.to_string())
            }
        }
    }

    async fn run_full(
        &mut self,
        home_id: i64,
        options: &GenerationOptions,
    ) -> Result<GenerationOutcome> {
        let Some(home) = self.store.get_home(home_id).await? else {
            return Ok(GenerationOutcome::Failed("Home not found".into()));
        };

        let equipment = self.store.list_equipment(home_id).await?;
        let existing = self.store.list_open_tasks(home_id).await?;
        let today = self.today();

        let mut candidates = self
            .compute_candidates(&home, &equipment, &existing, options, today)
            .await?;
        debug!(
            home_id,
            candidates = candidates.len(),
            "Candidate tasks before optimization"
        );

        if options.weather_optimization {
            self.optimize_for_weather(&home, &mut candidates).await;
        }

        let scheduled = schedule::schedule(
            candidates,
            options.look_ahead_days,
            options.prioritize_overdue,
            today,
        );

        let persisted = self.persist(scheduled).await;
        Ok(GenerationOutcome::Completed(persisted))
    }

    /// Run the three generation passes and return the deduplicated
    /// candidate list, before weather optimization and windowing.
    pub async fn compute_candidates(
        &mut self,
        home: &HomeProfile,
        equipment: &[EquipmentItem],
        existing: &[ExistingTaskRef],
        options: &GenerationOptions,
        today: NaiveDate,
    ) -> Result<Vec<MaintenanceTask>> {
        let home_id = home.id.unwrap_or_default();
        let month = today.month();
        let climate = home.climate.as_deref();
        let equipment_types: Vec<String> =
            equipment.iter().map(|e| e.equipment_type.clone()).collect();

        let mut exclusions = ExclusionSet::from_existing(existing);
        let mut candidates: Vec<MaintenanceTask> = Vec::new();

        // Seasonal pass
        let rules = self.store.seasonal_templates(month, home.home_type).await?;
        let rules = select_applicable(rules, home, &equipment_types, month);
        let mut added = 0usize;
        for rule in rules {
            if added >= options.max_tasks_per_pass {
                break;
            }
            if exclusions.contains(&rule.id) {
                continue;
            }
            let due = due_date::seasonal_due_date(&rule, today, self.jitter.as_mut());
            exclusions.insert(rule.id.clone());
            candidates.push(build_task(home_id, &rule, due, None, today));
            added += 1;
        }

        // Equipment pass. Items iterate sequentially; additions fold into
        // the exclusion set immediately so a second item of the same type
        // cannot re-trigger a rule.
        let mut added = 0usize;
        'items: for item in equipment {
            let item_types = std::slice::from_ref(&item.equipment_type);
            let rules = self
                .store
                .templates_for_context(home.home_type, item_types, month, climate)
                .await?;
            let rules = select_applicable(rules, home, item_types, month);
            for rule in rules {
                if added >= options.max_tasks_per_pass {
                    break 'items;
                }
                // Only rules attached to equipment belong to this pass.
                if rule.equipment_types.is_none() || exclusions.contains(&rule.id) {
                    continue;
                }
                let due = due_date::equipment_due_date(&rule, item, today);
                exclusions.insert(rule.id.clone());
                candidates.push(build_task(home_id, &rule, due, item.id, today));
                added += 1;
            }
        }

        // Home-type pass: home-generic rules only.
        let rules = self
            .store
            .templates_for_context(home.home_type, &equipment_types, month, climate)
            .await?;
        let rules = select_applicable(rules, home, &equipment_types, month);
        let mut added = 0usize;
        for rule in rules {
            if added >= options.max_tasks_per_pass {
                break;
            }
            if rule.equipment_types.is_some() || exclusions.contains(&rule.id) {
                continue;
            }
            let due = due_date::home_type_due_date(&rule, home, today);
            exclusions.insert(rule.id.clone());
            candidates.push(build_task(home_id, &rule, due, None, today));
            added += 1;
        }

        Ok(candidates)
    }

    /// Soft optimization: shift weather-dependent tasks onto forecasted
    /// good days. Missing coordinates, a missing provider, or a lookup
    /// failure all leave the candidate dates untouched.
    async fn optimize_for_weather(&self, home: &HomeProfile, candidates: &mut [MaintenanceTask]) {
        let Some(provider) = &self.forecast else {
            return;
        };
        let Some((latitude, longitude)) = home.coordinates() else {
            debug!("Home has no coordinates, skipping weather optimization");
            return;
        };

        match provider.best_outdoor_days(latitude, longitude).await {
            Ok(best_days) if !best_days.is_empty() => {
                weather_opt::apply_best_days(candidates, &best_days);
            }
            Ok(_) => debug!("No good outdoor days in forecast"),
            Err(e) => warn!(error = %e, "Weather lookup failed, keeping computed dates"),
        }
    }

    async fn persist(&self, tasks: Vec<MaintenanceTask>) -> Vec<MaintenanceTask> {
        let mut persisted = Vec::with_capacity(tasks.len());
        for task in tasks {
            match self.store.create_task(&task).await {
                Ok(saved) => persisted.push(saved),
                Err(e) => {
                    warn!(template_id = %task.template_id, error = %e, "Failed to persist task")
                }
            }
        }
        persisted
    }

    /// Category-scoped generation: up to `max_tasks` active rules in the
    /// category, due dates via the home-type policy, persisted directly.
    /// No deduplication against existing tasks and no weather step.
    pub async fn generate_for_category(
        &mut self,
        home_id: i64,
        category: &str,
        max_tasks: usize,
    ) -> GenerationOutcome {
        match self.run_category(home_id, category, max_tasks).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(home_id, category, error = %e, "Category generation failed");
                GenerationOutcome::Failed(e.to_string())
            }
        }
    }

    async fn run_category(
        &mut self,
        home_id: i64,
        category: &str,
        max_tasks: usize,
    ) -> Result<GenerationOutcome> {
        let Some(home) = self.store.get_home(home_id).await? else {
            return Ok(GenerationOutcome::Failed("Home not found".into()));
        };

        let today = self.today();
        let rules = self
            .store
            .templates_by_category(category, home.home_type)
            .await?;

        let candidates: Vec<MaintenanceTask> = rules
            .into_iter()
            .take(max_tasks)
            .map(|rule| {
                let due = due_date::home_type_due_date(&rule, &home, today);
                build_task(home_id, &rule, due, None, today)
            })
            .collect();

        let persisted = self.persist(candidates).await;
        Ok(GenerationOutcome::Completed(persisted))
    }
}

fn build_task(
    home_id: i64,
    rule: &MaintenanceRule,
    due_date: NaiveDate,
    equipment_id: Option<i64>,
    today: NaiveDate,
) -> MaintenanceTask {
    MaintenanceTask {
        id: None,
        home_id,
        template_id: rule.id.clone(),
        title: rule.title.clone(),
        description: rule.description.clone(),
        category: rule.category.clone(),
        due_date,
        priority: priority::score(rule, due_date, today),
        difficulty: rule.difficulty,
        estimated_minutes: rule.estimated_minutes,
        equipment_id,
        weather_dependent: weather_opt::is_weather_dependent(&rule.category),
        status: TaskStatus::Pending,
        auto_generated: true,
        created_at: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasources::NoForecast;
    use crate::db::Database;
    use crate::logic::due_date::FixedJitter;
    use crate::models::HomeType;
    use crate::store::AnyStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rule(id: &str, category: &str, recurrence: u32) -> MaintenanceRule {
        MaintenanceRule {
            id: id.into(),
            title: id.replace('_', " "),
            description: "Do the thing.".into(),
            category: category.into(),
            home_types: None,
            equipment_types: None,
            seasonal_months: None,
            climate_conditions: None,
            recurrence_months: recurrence,
            estimated_minutes: Some(30),
            difficulty: 2,
            consequences: None,
            active: true,
        }
    }

    async fn store_with_rules(rules: Vec<MaintenanceRule>) -> AnyStore {
        let store = AnyStore::Local(Database::open_in_memory().unwrap());
        for rule in &rules {
            store.upsert_template(rule).await.unwrap();
        }
        store
    }

    async fn add_home(store: &AnyStore, home_type: HomeType) -> i64 {
        store
            .create_home(&HomeProfile::new("Test Home".into(), home_type))
            .await
            .unwrap()
    }

    fn service(store: AnyStore, today: NaiveDate) -> TaskGenerationService<AnyStore, NoForecast> {
        TaskGenerationService::new(store, None)
            .with_jitter(Box::new(FixedJitter(3)))
            .with_today(today)
    }

    #[tokio::test]
    async fn home_not_found_fails_without_tasks() {
        let store = store_with_rules(vec![]).await;
        let mut svc = service(store, date(2025, 6, 10));

        let outcome = svc
            .generate_for_home(999, &GenerationOptions::default())
            .await;

        assert!(!outcome.success());
        assert_eq!(outcome.tasks_generated(), 0);
        assert_eq!(outcome.error(), Some("Home not found"));
    }

    #[tokio::test]
    async fn hvac_three_month_recurrence_falls_outside_window() {
        let mut hvac = rule("hvac_filter", "hvac", 3);
        hvac.equipment_types = Some(vec!["hvac".into()]);

        let store = store_with_rules(vec![hvac]).await;
        let home_id = add_home(&store, HomeType::SingleFamily).await;
        store
            .create_equipment(&EquipmentItem::new(home_id, "hvac", "Furnace"))
            .await
            .unwrap();

        let today = date(2025, 6, 10);
        let mut svc = service(store, today);
        let options = GenerationOptions {
            weather_optimization: false,
            ..Default::default()
        };

        // One candidate exists before windowing...
        let home = svc.store.get_home(home_id).await.unwrap().unwrap();
        let equipment = svc.store.list_equipment(home_id).await.unwrap();
        let candidates = svc
            .compute_candidates(&home, &equipment, &[], &options, today)
            .await
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].due_date, date(2025, 9, 10));

        // ...but the 3-month due date exceeds the 30-day horizon.
        let outcome = svc.generate_for_home(home_id, &options).await;
        assert!(outcome.success());
        assert_eq!(outcome.tasks_generated(), 0);
    }

    #[tokio::test]
    async fn hvac_one_month_recurrence_persists_with_priority_two() {
        let mut hvac = rule("hvac_filter", "hvac", 1);
        hvac.equipment_types = Some(vec!["hvac".into()]);

        let store = store_with_rules(vec![hvac]).await;
        let home_id = add_home(&store, HomeType::SingleFamily).await;
        store
            .create_equipment(&EquipmentItem::new(home_id, "hvac", "Furnace"))
            .await
            .unwrap();

        let mut svc = service(store, date(2025, 6, 10));
        let options = GenerationOptions {
            weather_optimization: false,
            ..Default::default()
        };

        let outcome = svc.generate_for_home(home_id, &options).await;
        assert!(outcome.success());
        assert_eq!(outcome.tasks_generated(), 1);

        let task = &outcome.tasks()[0];
        assert_eq!(task.due_date, date(2025, 7, 10));
        assert_eq!(task.priority, 2);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.auto_generated);
        assert!(task.id.is_some());
    }

    #[tokio::test]
    async fn existing_open_task_suppresses_rule() {
        let store = store_with_rules(vec![rule("smoke_detectors", "safety", 1)]).await;
        let home_id = add_home(&store, HomeType::SingleFamily).await;

        let mut blocker = build_task(
            home_id,
            &rule("smoke_detectors", "safety", 1),
            date(2025, 7, 1),
            None,
            date(2025, 6, 10),
        );
        blocker.status = TaskStatus::Pending;
        store.create_task(&blocker).await.unwrap();

        let mut svc = service(store, date(2025, 6, 10));
        let options = GenerationOptions {
            weather_optimization: false,
            ..Default::default()
        };

        let outcome = svc.generate_for_home(home_id, &options).await;
        assert!(outcome.success());
        assert_eq!(outcome.tasks_generated(), 0);
    }

    #[tokio::test]
    async fn second_run_generates_nothing_new() {
        let store = store_with_rules(vec![
            rule("smoke_detectors", "safety", 1),
            rule("water_heater_flush", "plumbing", 1),
        ])
        .await;
        let home_id = add_home(&store, HomeType::SingleFamily).await;

        let mut svc = service(store, date(2025, 6, 10));
        let options = GenerationOptions {
            weather_optimization: false,
            ..Default::default()
        };

        let first = svc.generate_for_home(home_id, &options).await;
        assert_eq!(first.tasks_generated(), 2);

        let second = svc.generate_for_home(home_id, &options).await;
        assert!(second.success());
        assert_eq!(second.tasks_generated(), 0);
    }

    #[tokio::test]
    async fn seasonal_rule_is_not_duplicated_by_home_pass() {
        let mut gutters = rule("gutter_cleaning", "gutters", 12);
        gutters.seasonal_months = Some(vec![6]);

        let store = store_with_rules(vec![gutters]).await;
        let home_id = add_home(&store, HomeType::SingleFamily).await;

        let mut svc = service(store, date(2025, 6, 10));
        let options = GenerationOptions {
            weather_optimization: false,
            ..Default::default()
        };

        let outcome = svc.generate_for_home(home_id, &options).await;
        assert_eq!(outcome.tasks_generated(), 1);
        // Seasonal policy with pinned jitter, not the home-type policy.
        assert_eq!(outcome.tasks()[0].due_date, date(2025, 6, 13));
    }

    #[tokio::test]
    async fn per_pass_cap_limits_candidates() {
        let rules: Vec<MaintenanceRule> = (0..8)
            .map(|i| rule(&format!("safety_check_{i}"), "safety", 1))
            .collect();
        let store = store_with_rules(rules).await;
        let home_id = add_home(&store, HomeType::SingleFamily).await;

        let mut svc = service(store, date(2025, 6, 10));
        let options = GenerationOptions {
            weather_optimization: false,
            max_tasks_per_pass: 5,
            ..Default::default()
        };

        let outcome = svc.generate_for_home(home_id, &options).await;
        assert_eq!(outcome.tasks_generated(), 5);
    }

    #[tokio::test]
    async fn category_generation_skips_dedup_and_applicability() {
        let mut seasonal = rule("deck_staining", "exterior", 24);
        // Out-of-window seasonal predicate is ignored by the category path.
        seasonal.seasonal_months = Some(vec![1]);

        let store = store_with_rules(vec![seasonal, rule("siding_wash", "exterior", 12)]).await;
        let home_id = add_home(&store, HomeType::SingleFamily).await;

        let mut svc = service(store, date(2025, 6, 10));
        let outcome = svc.generate_for_category(home_id, "exterior", 5).await;

        assert!(outcome.success());
        assert_eq!(outcome.tasks_generated(), 2);
        for task in outcome.tasks() {
            assert_eq!(task.category, "exterior");
        }
    }

    #[tokio::test]
    async fn category_generation_respects_max_tasks() {
        let store = store_with_rules(vec![
            rule("a_check", "safety", 12),
            rule("b_check", "safety", 12),
            rule("c_check", "safety", 12),
        ])
        .await;
        let home_id = add_home(&store, HomeType::SingleFamily).await;

        let mut svc = service(store, date(2025, 6, 10));
        let outcome = svc.generate_for_category(home_id, "safety", 2).await;
        assert_eq!(outcome.tasks_generated(), 2);
    }

    #[tokio::test]
    async fn weather_optimizer_moves_outdoor_tasks() {
        struct StubForecast(NaiveDate);
        impl ForecastProvider for StubForecast {
            async fn best_outdoor_days(&self, _lat: f64, _lon: f64) -> Result<Vec<NaiveDate>> {
                Ok(vec![self.0])
            }
        }

        let store = store_with_rules(vec![rule("siding_wash", "exterior", 1)]).await;
        let home_id = {
            let mut home = HomeProfile::new("Coastal".into(), HomeType::SingleFamily);
            home.latitude = Some(39.85);
            home.longitude = Some(-75.78);
            store.create_home(&home).await.unwrap()
        };

        let today = date(2025, 6, 10);
        let best_day = date(2025, 6, 14);
        let mut svc = TaskGenerationService::new(store, Some(StubForecast(best_day)))
            .with_jitter(Box::new(FixedJitter(3)))
            .with_today(today);

        let outcome = svc
            .generate_for_home(home_id, &GenerationOptions::default())
            .await;
        assert_eq!(outcome.tasks_generated(), 1);
        assert_eq!(outcome.tasks()[0].due_date, best_day);
    }

    #[tokio::test]
    async fn weather_lookup_failure_degrades_softly() {
        struct DownForecast;
        impl ForecastProvider for DownForecast {
            async fn best_outdoor_days(&self, _lat: f64, _lon: f64) -> Result<Vec<NaiveDate>> {
                Err(crate::error::HomeKeepError::DataSourceUnavailable(
                    "forecast service down".into(),
                ))
            }
        }

        let store = store_with_rules(vec![rule("siding_wash", "exterior", 1)]).await;
        let home_id = {
            let mut home = HomeProfile::new("Coastal".into(), HomeType::SingleFamily);
            home.latitude = Some(39.85);
            home.longitude = Some(-75.78);
            store.create_home(&home).await.unwrap()
        };

        let mut svc = TaskGenerationService::new(store, Some(DownForecast))
            .with_jitter(Box::new(FixedJitter(3)))
            .with_today(date(2025, 6, 10));

        let outcome = svc
            .generate_for_home(home_id, &GenerationOptions::default())
            .await;

        // The run still succeeds and keeps the computed due date.
        assert!(outcome.success());
        assert_eq!(outcome.tasks_generated(), 1);
        assert_eq!(outcome.tasks()[0].due_date, date(2025, 7, 10));
    }

    #[tokio::test]
    async fn empty_forecast_keeps_computed_dates() {
        let store = store_with_rules(vec![rule("siding_wash", "exterior", 1)]).await;
        let home_id = {
            let mut home = HomeProfile::new("Coastal".into(), HomeType::SingleFamily);
            home.latitude = Some(39.85);
            home.longitude = Some(-75.78);
            store.create_home(&home).await.unwrap()
        };

        let mut svc = TaskGenerationService::new(store, Some(NoForecast))
            .with_jitter(Box::new(FixedJitter(3)))
            .with_today(date(2025, 6, 10));

        let outcome = svc
            .generate_for_home(home_id, &GenerationOptions::default())
            .await;

        assert!(outcome.success());
        assert_eq!(outcome.tasks_generated(), 1);
        assert_eq!(outcome.tasks()[0].due_date, date(2025, 7, 10));
    }
}
