use crate::config::PostgresConfig;
use crate::error::{HomeKeepError, Result};
use crate::logic::applicability;
use crate::models::{
    EquipmentItem, ExistingTaskRef, HomeProfile, HomeType, MaintenanceRule, MaintenanceTask,
    TaskStatus,
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::warn;

/// Shared-household backend over PostgreSQL. Same query surface as the
/// local SQLite store, same predicate semantics.
pub struct PostgresStore {
    pool: PgPool,
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS homes (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        home_type TEXT NOT NULL,
        year_built INTEGER,
        latitude DOUBLE PRECISION,
        longitude DOUBLE PRECISION,
        climate TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS equipment (
        id BIGSERIAL PRIMARY KEY,
        home_id BIGINT NOT NULL REFERENCES homes(id) ON DELETE CASCADE,
        equipment_type TEXT NOT NULL,
        name TEXT NOT NULL,
        next_service_due DATE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS task_templates (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        category TEXT NOT NULL,
        home_types TEXT,
        equipment_types TEXT,
        seasonal_months TEXT,
        climate_conditions TEXT,
        recurrence_months INTEGER NOT NULL,
        estimated_minutes INTEGER,
        difficulty SMALLINT NOT NULL,
        consequences TEXT,
        active BOOLEAN NOT NULL DEFAULT TRUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id BIGSERIAL PRIMARY KEY,
        home_id BIGINT NOT NULL REFERENCES homes(id) ON DELETE CASCADE,
        template_id TEXT,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        category TEXT NOT NULL,
        due_date DATE NOT NULL,
        priority SMALLINT NOT NULL,
        difficulty SMALLINT NOT NULL,
        estimated_minutes INTEGER,
        equipment_id BIGINT REFERENCES equipment(id) ON DELETE SET NULL,
        weather_dependent BOOLEAN NOT NULL DEFAULT FALSE,
        status TEXT NOT NULL DEFAULT 'pending',
        auto_generated BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_equipment_home_id ON equipment(home_id)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_home_id ON tasks(home_id)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status)",
    "CREATE INDEX IF NOT EXISTS idx_task_templates_category ON task_templates(category)",
];

impl PostgresStore {
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(&config.connection_string())
            .await
            .map_err(|e| {
                HomeKeepError::DataSourceUnavailable(format!("PostgreSQL backend: {}", e))
            })?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn test_connection(&self) -> Result<bool> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(true)
    }

    async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn create_home(&self, home: &HomeProfile) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO homes
                (name, home_type, year_built, latitude, longitude, climate, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&home.name)
        .bind(home.home_type.as_str())
        .bind(home.year_built)
        .bind(home.latitude)
        .bind(home.longitude)
        .bind(to_json(&home.climate))
        .bind(home.created_at)
        .bind(home.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("id")?)
    }

    pub async fn get_home(&self, home_id: i64) -> Result<Option<HomeProfile>> {
        let row = sqlx::query("SELECT * FROM homes WHERE id = $1")
            .bind(home_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row_to_home(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_homes(&self) -> Result<Vec<HomeProfile>> {
        let rows = sqlx::query("SELECT * FROM homes ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().filter_map(|row| row_to_home(row).ok()).collect())
    }

    pub async fn create_equipment(&self, item: &EquipmentItem) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO equipment
                (home_id, equipment_type, name, next_service_due, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(item.home_id)
        .bind(&item.equipment_type)
        .bind(&item.name)
        .bind(item.next_service_due)
        .bind(item.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("id")?)
    }

    pub async fn list_equipment(&self, home_id: i64) -> Result<Vec<EquipmentItem>> {
        let rows = sqlx::query("SELECT * FROM equipment WHERE home_id = $1 ORDER BY id")
            .bind(home_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| row_to_equipment(row).ok())
            .collect())
    }

    pub async fn create_task(&self, task: &MaintenanceTask) -> Result<MaintenanceTask> {
        let row = sqlx::query(
            r#"
            INSERT INTO tasks
                (home_id, template_id, title, description, category, due_date, priority,
                 difficulty, estimated_minutes, equipment_id, weather_dependent, status,
                 auto_generated, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id
            "#,
        )
        .bind(task.home_id)
        .bind(&task.template_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.category)
        .bind(task.due_date)
        .bind(task.priority as i16)
        .bind(task.difficulty as i16)
        .bind(task.estimated_minutes.map(|m| m as i32))
        .bind(task.equipment_id)
        .bind(task.weather_dependent)
        .bind(task.status.as_str())
        .bind(task.auto_generated)
        .bind(task.created_at)
        .fetch_one(&self.pool)
        .await?;

        let mut saved = task.clone();
        saved.id = Some(row.try_get("id")?);
        Ok(saved)
    }

    pub async fn list_tasks(&self, home_id: i64) -> Result<Vec<MaintenanceTask>> {
        let rows = sqlx::query("SELECT * FROM tasks WHERE home_id = $1 ORDER BY due_date, id")
            .bind(home_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().filter_map(|row| row_to_task(row).ok()).collect())
    }

    pub async fn list_open_tasks(&self, home_id: i64) -> Result<Vec<ExistingTaskRef>> {
        let rows = sqlx::query(
            r#"
            SELECT template_id, due_date FROM tasks
            WHERE home_id = $1
              AND status IN ('pending', 'in_progress')
              AND template_id IS NOT NULL
            "#,
        )
        .bind(home_id)
        .fetch_all(&self.pool)
        .await?;

        let mut refs = Vec::with_capacity(rows.len());
        for row in &rows {
            refs.push(ExistingTaskRef {
                template_id: row.try_get("template_id")?,
                due_date: row.try_get("due_date")?,
            });
        }
        Ok(refs)
    }

    pub async fn set_task_status(&self, task_id: i64, status: TaskStatus) -> Result<()> {
        sqlx::query("UPDATE tasks SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn upsert_template(&self, rule: &MaintenanceRule) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO task_templates
                (id, title, description, category, home_types, equipment_types,
                 seasonal_months, climate_conditions, recurrence_months,
                 estimated_minutes, difficulty, consequences, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                category = EXCLUDED.category,
                home_types = EXCLUDED.home_types,
                equipment_types = EXCLUDED.equipment_types,
                seasonal_months = EXCLUDED.seasonal_months,
                climate_conditions = EXCLUDED.climate_conditions,
                recurrence_months = EXCLUDED.recurrence_months,
                estimated_minutes = EXCLUDED.estimated_minutes,
                difficulty = EXCLUDED.difficulty,
                consequences = EXCLUDED.consequences,
                active = EXCLUDED.active
            "#,
        )
        .bind(&rule.id)
        .bind(&rule.title)
        .bind(&rule.description)
        .bind(&rule.category)
        .bind(to_json(&rule.home_types))
        .bind(to_json(&rule.equipment_types))
        .bind(to_json(&rule.seasonal_months))
        .bind(to_json(&rule.climate_conditions))
        .bind(rule.recurrence_months as i32)
        .bind(rule.estimated_minutes.map(|m| m as i32))
        .bind(rule.difficulty as i16)
        .bind(&rule.consequences)
        .bind(rule.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn active_templates(&self) -> Result<Vec<MaintenanceRule>> {
        let rows =
            sqlx::query("SELECT * FROM task_templates WHERE active ORDER BY category, title")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .iter()
            .filter_map(|row| row_to_template(row).ok())
            .collect())
    }

    pub async fn templates_for_context(
        &self,
        home_type: HomeType,
        equipment_types: &[String],
        month: u32,
        climate: Option<&[String]>,
    ) -> Result<Vec<MaintenanceRule>> {
        let rules = self.active_templates().await?;
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

    pub async fn seasonal_templates(
        &self,
        month: u32,
        home_type: HomeType,
    ) -> Result<Vec<MaintenanceRule>> {
        let rules = self.active_templates().await?;
        Ok(rules
            .into_iter()
            .filter(|rule| {
                rule.seasonal_months.is_some()
                    && applicability::in_seasonal_window(rule, month)
                    && applicability::matches_home_type(rule, home_type)
            })
            .collect())
    }

    pub async fn templates_by_category(
        &self,
        category: &str,
        home_type: HomeType,
    ) -> Result<Vec<MaintenanceRule>> {
        let rows = sqlx::query(
            "SELECT * FROM task_templates WHERE active AND category = $1 ORDER BY category, title",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .filter_map(|row| row_to_template(row).ok())
            .filter(|rule| applicability::matches_home_type(rule, home_type))
            .collect())
    }
}

fn to_json<T: serde::Serialize>(value: &Option<T>) -> Option<String> {
    value.as_ref().and_then(|v| serde_json::to_string(v).ok())
}

fn from_json<T: serde::de::DeserializeOwned>(raw: Option<String>, column: &str) -> Option<T> {
    raw.and_then(|s| match serde_json::from_str(&s) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(column, error = %e, "Unparseable JSON column in backend, ignoring");
            None
        }
    })
}

fn row_to_home(row: &PgRow) -> Result<HomeProfile> {
    let home_type_str: String = row.try_get("home_type")?;
    let home_type = HomeType::from_str(&home_type_str).unwrap_or_else(|| {
        warn!(
            home_type = %home_type_str,
            "Unknown home_type in backend, defaulting to SingleFamily"
        );
        HomeType::SingleFamily
    });

    Ok(HomeProfile {
        id: Some(row.try_get("id")?),
        name: row.try_get("name")?,
        home_type,
        year_built: row.try_get("year_built")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        climate: from_json(row.try_get("climate")?, "climate"),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn row_to_equipment(row: &PgRow) -> Result<EquipmentItem> {
    Ok(EquipmentItem {
        id: Some(row.try_get("id")?),
        home_id: row.try_get("home_id")?,
        equipment_type: row.try_get("equipment_type")?,
        name: row.try_get("name")?,
        next_service_due: row.try_get::<Option<NaiveDate>, _>("next_service_due")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn row_to_task(row: &PgRow) -> Result<MaintenanceTask> {
    let status_str: String = row.try_get("status")?;
    let status = TaskStatus::from_str(&status_str).unwrap_or_else(|| {
        warn!(status = %status_str, "Unknown task status in backend, defaulting to pending");
        TaskStatus::Pending
    });

    Ok(MaintenanceTask {
        id: Some(row.try_get("id")?),
        home_id: row.try_get("home_id")?,
        template_id: row
            .try_get::<Option<String>, _>("template_id")?
            .unwrap_or_default(),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        due_date: row.try_get("due_date")?,
        priority: row.try_get::<i16, _>("priority")? as u8,
        difficulty: row.try_get::<i16, _>("difficulty")? as u8,
        estimated_minutes: row
            .try_get::<Option<i32>, _>("estimated_minutes")?
            .map(|m| m as u32),
        equipment_id: row.try_get("equipment_id")?,
        weather_dependent: row.try_get("weather_dependent")?,
        status,
        auto_generated: row.try_get("auto_generated")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn row_to_template(row: &PgRow) -> Result<MaintenanceRule> {
    Ok(MaintenanceRule {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        home_types: from_json(row.try_get("home_types")?, "home_types"),
        equipment_types: from_json(row.try_get("equipment_types")?, "equipment_types"),
        seasonal_months: from_json(row.try_get("seasonal_months")?, "seasonal_months"),
        climate_conditions: from_json(row.try_get("climate_conditions")?, "climate_conditions"),
        recurrence_months: row.try_get::<i32, _>("recurrence_months")? as u32,
        estimated_minutes: row
            .try_get::<Option<i32>, _>("estimated_minutes")?
            .map(|m| m as u32),
        difficulty: row.try_get::<i16, _>("difficulty")? as u8,
        consequences: row.try_get("consequences")?,
        active: row.try_get("active")?,
    })
}
