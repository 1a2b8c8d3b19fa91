use std::path::PathBuf;

use crate::config::{Config, StorageMode};
use crate::datasources::postgres::PostgresStore;
use crate::db::Database;
use crate::error::{HomeKeepError, Result};
use crate::models::{
    EquipmentItem, ExistingTaskRef, HomeProfile, HomeType, MaintenanceRule, MaintenanceTask,
    TaskStatus,
};

/// Persistence capability consumed by the generation engine and the CLI.
///
/// The engine treats this as an external collaborator: homes, equipment,
/// open tasks and the template catalog are reads, `create_task` is the
/// single write. Catalog queries return rules ordered by (category, title).
#[allow(async_fn_in_trait)]
pub trait MaintenanceStore {
    async fn get_home(&self, home_id: i64) -> Result<Option<HomeProfile>>;
    async fn list_homes(&self) -> Result<Vec<HomeProfile>>;
    async fn create_home(&self, home: &HomeProfile) -> Result<i64>;

    async fn list_equipment(&self, home_id: i64) -> Result<Vec<EquipmentItem>>;
    async fn create_equipment(&self, item: &EquipmentItem) -> Result<i64>;

    /// Open (pending or in-progress) tasks for a home, reduced to the
    /// references the deduplicator needs.
    async fn list_open_tasks(&self, home_id: i64) -> Result<Vec<ExistingTaskRef>>;
    async fn list_tasks(&self, home_id: i64) -> Result<Vec<MaintenanceTask>>;
    async fn set_task_status(&self, task_id: i64, status: TaskStatus) -> Result<()>;

    /// Rules applicable to a home context: home type, installed equipment,
    /// current month, and optionally the home's climate tags.
    async fn templates_for_context(
        &self,
        home_type: HomeType,
        equipment_types: &[String],
        month: u32,
        climate: Option<&[String]>,
    ) -> Result<Vec<MaintenanceRule>>;

    /// Seasonal rules whose window covers the given month (with look-ahead).
    /// This query path does not consult climate conditions.
    async fn seasonal_templates(&self, month: u32, home_type: HomeType)
        -> Result<Vec<MaintenanceRule>>;

    /// Active rules in a category for a home type, regardless of other
    /// applicability predicates.
    async fn templates_by_category(
        &self,
        category: &str,
        home_type: HomeType,
    ) -> Result<Vec<MaintenanceRule>>;

    async fn upsert_template(&self, rule: &MaintenanceRule) -> Result<()>;

    /// Persist one candidate. A failure here is per-candidate: callers drop
    /// the candidate and continue the batch.
    async fn create_task(&self, task: &MaintenanceTask) -> Result<MaintenanceTask>;
}

/// Backing store selected by the config's explicit `storage.mode` field.
pub enum AnyStore {
    Local(Database),
    Postgres(PostgresStore),
}

pub async fn open_store(config: &Config, data_dir_override: Option<&PathBuf>) -> Result<AnyStore> {
    match config.storage.mode {
        StorageMode::Local => {
            let db = Database::open(data_dir_override)?;
            Ok(AnyStore::Local(db))
        }
        StorageMode::Postgres => {
            let pg = config.storage.postgres.as_ref().ok_or_else(|| {
                HomeKeepError::Config(
                    "storage.mode is 'postgres' but storage.postgres is not configured".into(),
                )
            })?;
            let store = PostgresStore::connect(pg).await?;
            Ok(AnyStore::Postgres(store))
        }
    }
}

impl MaintenanceStore for AnyStore {
    async fn get_home(&self, home_id: i64) -> Result<Option<HomeProfile>> {
        match self {
            AnyStore::Local(db) => db.get_home(home_id),
            AnyStore::Postgres(pg) => pg.get_home(home_id).await,
        }
    }

    async fn list_homes(&self) -> Result<Vec<HomeProfile>> {
        match self {
            AnyStore::Local(db) => db.list_homes(),
            AnyStore::Postgres(pg) => pg.list_homes().await,
        }
    }

    async fn create_home(&self, home: &HomeProfile) -> Result<i64> {
        match self {
            AnyStore::Local(db) => db.create_home(home),
            AnyStore::Postgres(pg) => pg.create_home(home).await,
        }
    }

    async fn list_equipment(&self, home_id: i64) -> Result<Vec<EquipmentItem>> {
        match self {
            AnyStore::Local(db) => db.list_equipment(home_id),
            AnyStore::Postgres(pg) => pg.list_equipment(home_id).await,
        }
    }

    async fn create_equipment(&self, item: &EquipmentItem) -> Result<i64> {
        match self {
            AnyStore::Local(db) => db.create_equipment(item),
            AnyStore::Postgres(pg) => pg.create_equipment(item).await,
        }
    }

    async fn list_open_tasks(&self, home_id: i64) -> Result<Vec<ExistingTaskRef>> {
        match self {
            AnyStore::Local(db) => db.list_open_tasks(home_id),
            AnyStore::Postgres(pg) => pg.list_open_tasks(home_id).await,
        }
    }

    async fn list_tasks(&self, home_id: i64) -> Result<Vec<MaintenanceTask>> {
        match self {
            AnyStore::Local(db) => db.list_tasks(home_id),
            AnyStore::Postgres(pg) => pg.list_tasks(home_id).await,
        }
    }

    async fn set_task_status(&self, task_id: i64, status: TaskStatus) -> Result<()> {
        match self {
            AnyStore::Local(db) => db.set_task_status(task_id, status),
            AnyStore::Postgres(pg) => pg.set_task_status(task_id, status).await,
        }
    }

    async fn templates_for_context(
        &self,
        home_type: HomeType,
        equipment_types: &[String],
        month: u32,
        climate: Option<&[String]>,
    ) -> Result<Vec<MaintenanceRule>> {
        match self {
            AnyStore::Local(db) => {
                db.templates_for_context(home_type, equipment_types, month, climate)
            }
            AnyStore::Postgres(pg) => {
                pg.templates_for_context(home_type, equipment_types, month, climate)
                    .await
            }
        }
    }

    async fn seasonal_templates(
        &self,
        month: u32,
        home_type: HomeType,
    ) -> Result<Vec<MaintenanceRule>> {
        match self {
            AnyStore::Local(db) => db.seasonal_templates(month, home_type),
            AnyStore::Postgres(pg) => pg.seasonal_templates(month, home_type).await,
        }
    }

    async fn templates_by_category(
        &self,
        category: &str,
        home_type: HomeType,
    ) -> Result<Vec<MaintenanceRule>> {
        match self {
            AnyStore::Local(db) => db.templates_by_category(category, home_type),
            AnyStore::Postgres(pg) => pg.templates_by_category(category, home_type).await,
        }
    }

    async fn upsert_template(&self, rule: &MaintenanceRule) -> Result<()> {
        match self {
            AnyStore::Local(db) => db.upsert_template(rule),
            AnyStore::Postgres(pg) => pg.upsert_template(rule).await,
        }
    }

    async fn create_task(&self, task: &MaintenanceTask) -> Result<MaintenanceTask> {
        match self {
            AnyStore::Local(db) => db.create_task(task),
            AnyStore::Postgres(pg) => pg.create_task(task).await,
        }
    }
}
