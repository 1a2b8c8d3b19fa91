use crate::db::Database;
use crate::error::Result;
use crate::logic::applicability;
use crate::models::{
    EquipmentItem, ExistingTaskRef, HomeProfile, HomeType, MaintenanceRule, MaintenanceTask,
    TaskStatus,
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::warn;

fn to_json<T: serde::Serialize>(value: &Option<T>) -> Option<String> {
    value.as_ref().and_then(|v| serde_json::to_string(v).ok())
}

fn from_json<T: serde::de::DeserializeOwned>(raw: Option<String>, column: &str) -> Option<T> {
    raw.and_then(|s| match serde_json::from_str(&s) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(column, error = %e, "Unparseable JSON column in database, ignoring");
            None
        }
    })
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_date(raw: &str) -> NaiveDate {
    raw.parse()
        .unwrap_or_else(|_| Utc::now().date_naive())
}

// Home Queries

impl Database {
    pub fn create_home(&self, home: &HomeProfile) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO homes
                    (name, home_type, year_built, latitude, longitude, climate, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    home.name,
                    home.home_type.as_str(),
                    home.year_built,
                    home.latitude,
                    home.longitude,
                    to_json(&home.climate),
                    home.created_at.to_rfc3339(),
                    home.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_home(&self, home_id: i64) -> Result<Option<HomeProfile>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT * FROM homes WHERE id = ?1", [home_id], row_to_home)
                .optional()
                .map_err(Into::into)
        })
    }

    pub fn list_homes(&self) -> Result<Vec<HomeProfile>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM homes ORDER BY id")?;
            let homes = stmt
                .query_map([], row_to_home)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(homes)
        })
    }
}

fn row_to_home(row: &Row) -> rusqlite::Result<HomeProfile> {
    let home_type_str: String = row.get("home_type")?;
    let climate_str: Option<String> = row.get("climate")?;
    let created_at_str: String = row.get("created_at")?;
    let updated_at_str: String = row.get("updated_at")?;

    let home_type = HomeType::from_str(&home_type_str).unwrap_or_else(|| {
        warn!(
            home_type = %home_type_str,
            "Unknown home_type in database, defaulting to SingleFamily"
        );
        HomeType::SingleFamily
    });

    Ok(HomeProfile {
        id: Some(row.get("id")?),
        name: row.get("name")?,
        home_type,
        year_built: row.get("year_built")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        climate: from_json(climate_str, "climate"),
        created_at: parse_timestamp(&created_at_str),
        updated_at: parse_timestamp(&updated_at_str),
    })
}

// Equipment Queries

impl Database {
    pub fn create_equipment(&self, item: &EquipmentItem) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO equipment
                    (home_id, equipment_type, name, next_service_due, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    item.home_id,
                    item.equipment_type,
                    item.name,
                    item.next_service_due.map(|d| d.to_string()),
                    item.created_at.to_rfc3339(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn list_equipment(&self, home_id: i64) -> Result<Vec<EquipmentItem>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM equipment WHERE home_id = ?1 ORDER BY id")?;
            let items = stmt
                .query_map([home_id], row_to_equipment)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(items)
        })
    }
}

fn row_to_equipment(row: &Row) -> rusqlite::Result<EquipmentItem> {
    let next_due_str: Option<String> = row.get("next_service_due")?;
    let created_at_str: String = row.get("created_at")?;

    Ok(EquipmentItem {
        id: Some(row.get("id")?),
        home_id: row.get("home_id")?,
        equipment_type: row.get("equipment_type")?,
        name: row.get("name")?,
        next_service_due: next_due_str.as_deref().and_then(|s| s.parse().ok()),
        created_at: parse_timestamp(&created_at_str),
    })
}

// Task Queries

impl Database {
    pub fn create_task(&self, task: &MaintenanceTask) -> Result<MaintenanceTask> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO tasks
                    (home_id, template_id, title, description, category, due_date, priority,
                     difficulty, estimated_minutes, equipment_id, weather_dependent, status,
                     auto_generated, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#,
                params![
                    task.home_id,
                    task.template_id,
                    task.title,
                    task.description,
                    task.category,
                    task.due_date.to_string(),
                    task.priority,
                    task.difficulty,
                    task.estimated_minutes,
                    task.equipment_id,
                    task.weather_dependent,
                    task.status.as_str(),
                    task.auto_generated,
                    task.created_at.to_rfc3339(),
                ],
            )?;
            let mut saved = task.clone();
            saved.id = Some(conn.last_insert_rowid());
            Ok(saved)
        })
    }

    pub fn list_tasks(&self, home_id: i64) -> Result<Vec<MaintenanceTask>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM tasks WHERE home_id = ?1 ORDER BY due_date, id")?;
            let tasks = stmt
                .query_map([home_id], row_to_task)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(tasks)
        })
    }

    pub fn list_open_tasks(&self, home_id: i64) -> Result<Vec<ExistingTaskRef>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT template_id, due_date FROM tasks
                WHERE home_id = ?1
                  AND status IN ('pending', 'in_progress')
                  AND template_id IS NOT NULL
                "#,
            )?;
            let refs = stmt
                .query_map([home_id], |row| {
                    let due_date_str: String = row.get("due_date")?;
                    Ok(ExistingTaskRef {
                        template_id: row.get("template_id")?,
                        due_date: parse_date(&due_date_str),
                    })
                })?
                .filter_map(|r| r.ok())
                .collect();
            Ok(refs)
        })
    }

    pub fn set_task_status(&self, task_id: i64, status: TaskStatus) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE tasks SET status = ?1 WHERE id = ?2",
                params![status.as_str(), task_id],
            )?;
            Ok(())
        })
    }
}

fn row_to_task(row: &Row) -> rusqlite::Result<MaintenanceTask> {
    let due_date_str: String = row.get("due_date")?;
    let status_str: String = row.get("status")?;
    let created_at_str: String = row.get("created_at")?;

    let status = TaskStatus::from_str(&status_str).unwrap_or_else(|| {
        warn!(status = %status_str, "Unknown task status in database, defaulting to pending");
        TaskStatus::Pending
    });

    Ok(MaintenanceTask {
        id: Some(row.get("id")?),
        home_id: row.get("home_id")?,
        template_id: row.get::<_, Option<String>>("template_id")?.unwrap_or_default(),
        title: row.get("title")?,
        description: row.get("description")?,
        category: row.get("category")?,
        due_date: parse_date(&due_date_str),
        priority: row.get("priority")?,
        difficulty: row.get("difficulty")?,
        estimated_minutes: row.get("estimated_minutes")?,
        equipment_id: row.get("equipment_id")?,
        weather_dependent: row.get("weather_dependent")?,
        status,
        auto_generated: row.get("auto_generated")?,
        created_at: parse_timestamp(&created_at_str),
    })
}

// Template Catalog Queries

impl Database {
    pub fn upsert_template(&self, rule: &MaintenanceRule) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT OR REPLACE INTO task_templates
                    (id, title, description, category, home_types, equipment_types,
                     seasonal_months, climate_conditions, recurrence_months,
                     estimated_minutes, difficulty, consequences, active)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
                params![
                    rule.id,
                    rule.title,
                    rule.description,
                    rule.category,
                    to_json(&rule.home_types),
                    to_json(&rule.equipment_types),
                    to_json(&rule.seasonal_months),
                    to_json(&rule.climate_conditions),
                    rule.recurrence_months,
                    rule.estimated_minutes,
                    rule.difficulty,
                    rule.consequences,
                    rule.active,
                ],
            )?;
            Ok(())
        })
    }

    fn active_templates(&self) -> Result<Vec<MaintenanceRule>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM task_templates WHERE active = 1 ORDER BY category, title",
            )?;
            let rules = stmt
                .query_map([], row_to_template)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(rules)
        })
    }

    pub fn templates_for_context(
        &self,
        home_type: HomeType,
        equipment_types: &[String],
        month: u32,
        climate: Option<&[String]>,
    ) -> Result<Vec<MaintenanceRule>> {
        let rules = self.active_templates()?;
        Ok(rules
            .into_iter()
            .filter(|rule| {
                applicability::matches_home_type(rule, home_type)
                    && applicability::matches_equipment(rule, equipment_types)
                    && applicability::in_seasonal_window(rule, month)
                    && applicability::matches_climate(rule, climate)
            })
            .collect())
    }

    pub fn seasonal_templates(
        &self,
        month: u32,
        home_type: HomeType,
    ) -> Result<Vec<MaintenanceRule>> {
        let rules = self.active_templates()?;
        Ok(rules
            .into_iter()
            .filter(|rule| {
                rule.seasonal_months.is_some()
                    && applicability::in_seasonal_window(rule, month)
                    && applicability::matches_home_type(rule, home_type)
            })
            .collect())
    }

    pub fn templates_by_category(
        &self,
        category: &str,
        home_type: HomeType,
    ) -> Result<Vec<MaintenanceRule>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM task_templates WHERE active = 1 AND category = ?1 ORDER BY category, title",
            )?;
            let rules: Vec<MaintenanceRule> = stmt
                .query_map([category], row_to_template)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(rules
                .into_iter()
                .filter(|rule| applicability::matches_home_type(rule, home_type))
                .collect())
        })
    }
}

fn row_to_template(row: &Row) -> rusqlite::Result<MaintenanceRule> {
    Ok(MaintenanceRule {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        category: row.get("category")?,
        home_types: from_json(row.get("home_types")?, "home_types"),
        equipment_types: from_json(row.get("equipment_types")?, "equipment_types"),
        seasonal_months: from_json(row.get("seasonal_months")?, "seasonal_months"),
        climate_conditions: from_json(row.get("climate_conditions")?, "climate_conditions"),
        recurrence_months: row.get("recurrence_months")?,
        estimated_minutes: row.get("estimated_minutes")?,
        difficulty: row.get("difficulty")?,
        consequences: row.get("consequences")?,
        active: row.get("active")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(id: &str, category: &str) -> MaintenanceRule {
        MaintenanceRule {
            id: id.into(),
            title: id.replace('_', " "),
            description: "Do the thing.".into(),
            category: category.into(),
            home_types: None,
            equipment_types: None,
            seasonal_months: None,
            climate_conditions: None,
            recurrence_months: 6,
            estimated_minutes: Some(45),
            difficulty: 2,
            consequences: Some("water damage".into()),
            active: true,
        }
    }

    fn sample_task(home_id: i64, template_id: &str) -> MaintenanceTask {
        MaintenanceTask {
            id: None,
            home_id,
            template_id: template_id.into(),
            title: template_id.into(),
            description: String::new(),
            category: "plumbing".into(),
            due_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            priority: 2,
            difficulty: 2,
            estimated_minutes: None,
            equipment_id: None,
            weather_dependent: false,
            status: TaskStatus::Pending,
            auto_generated: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn home_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let mut home = HomeProfile::new("Maple St".into(), HomeType::Townhouse);
        home.year_built = Some(1995);
        home.climate = Some(vec!["humid".into()]);

        let id = db.create_home(&home).unwrap();
        let loaded = db.get_home(id).unwrap().unwrap();

        assert_eq!(loaded.name, "Maple St");
        assert_eq!(loaded.home_type, HomeType::Townhouse);
        assert_eq!(loaded.year_built, Some(1995));
        assert_eq!(loaded.climate, Some(vec!["humid".to_string()]));
    }

    #[test]
    fn missing_home_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_home(42).unwrap().is_none());
    }

    #[test]
    fn equipment_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let home_id = db
            .create_home(&HomeProfile::new("Test".into(), HomeType::SingleFamily))
            .unwrap();

        let mut item = EquipmentItem::new(home_id, "water_heater", "Basement heater");
        item.next_service_due = NaiveDate::from_ymd_opt(2025, 9, 1);
        db.create_equipment(&item).unwrap();

        let items = db.list_equipment(home_id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].equipment_type, "water_heater");
        assert_eq!(
            items[0].next_service_due,
            NaiveDate::from_ymd_opt(2025, 9, 1)
        );
    }

    #[test]
    fn create_task_assigns_id() {
        let db = Database::open_in_memory().unwrap();
        let home_id = db
            .create_home(&HomeProfile::new("Test".into(), HomeType::SingleFamily))
            .unwrap();

        let saved = db.create_task(&sample_task(home_id, "water_heater_flush")).unwrap();
        assert!(saved.id.is_some());

        let tasks = db.list_tasks(home_id).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].template_id, "water_heater_flush");
        assert_eq!(tasks[0].status, TaskStatus::Pending);
    }

    #[test]
    fn open_tasks_exclude_terminal_statuses() {
        let db = Database::open_in_memory().unwrap();
        let home_id = db
            .create_home(&HomeProfile::new("Test".into(), HomeType::SingleFamily))
            .unwrap();

        let open = db.create_task(&sample_task(home_id, "open_rule")).unwrap();
        let done = db.create_task(&sample_task(home_id, "done_rule")).unwrap();
        db.set_task_status(done.id.unwrap(), TaskStatus::Completed)
            .unwrap();
        let _ = open;

        let refs = db.list_open_tasks(home_id).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].template_id, "open_rule");
    }

    #[test]
    fn template_upsert_replaces() {
        let db = Database::open_in_memory().unwrap();
        let mut rule = template("hvac_filter", "hvac");
        db.upsert_template(&rule).unwrap();

        rule.recurrence_months = 12;
        db.upsert_template(&rule).unwrap();

        let rules = db
            .templates_by_category("hvac", HomeType::SingleFamily)
            .unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].recurrence_months, 12);
    }

    #[test]
    fn context_query_applies_predicates() {
        let db = Database::open_in_memory().unwrap();

        let mut hvac = template("hvac_filter", "hvac");
        hvac.equipment_types = Some(vec!["hvac".into()]);
        db.upsert_template(&hvac).unwrap();

        let mut condo_only = template("hallway_check", "interior");
        condo_only.home_types = Some(vec![HomeType::Condo]);
        db.upsert_template(&condo_only).unwrap();

        let rules = db
            .templates_for_context(HomeType::SingleFamily, &["hvac".into()], 6, None)
            .unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, "hvac_filter");
    }

    #[test]
    fn seasonal_query_requires_seasonal_predicate() {
        let db = Database::open_in_memory().unwrap();

        let mut gutters = template("gutter_cleaning", "gutters");
        gutters.seasonal_months = Some(vec![11]);
        db.upsert_template(&gutters).unwrap();
        db.upsert_template(&template("hvac_filter", "hvac")).unwrap();

        let in_window = db.seasonal_templates(10, HomeType::SingleFamily).unwrap();
        assert_eq!(in_window.len(), 1);
        assert_eq!(in_window[0].id, "gutter_cleaning");

        let out_of_window = db.seasonal_templates(5, HomeType::SingleFamily).unwrap();
        assert!(out_of_window.is_empty());
    }

    #[test]
    fn inactive_templates_are_invisible() {
        let db = Database::open_in_memory().unwrap();
        let mut rule = template("old_rule", "hvac");
        rule.active = false;
        db.upsert_template(&rule).unwrap();

        assert!(db
            .templates_for_context(HomeType::SingleFamily, &[], 6, None)
            .unwrap()
            .is_empty());
        assert!(db
            .templates_by_category("hvac", HomeType::SingleFamily)
            .unwrap()
            .is_empty());
    }
}
