use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Skipped => "skipped",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" | "in progress" => Some(TaskStatus::InProgress),
            "completed" | "done" => Some(TaskStatus::Completed),
            "skipped" => Some(TaskStatus::Skipped),
            _ => None,
        }
    }

    /// Open statuses block regeneration of the same template for a home.
    pub fn is_open(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A maintenance task, either a freshly computed candidate or its
/// persisted form once the store has assigned it an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceTask {
    pub id: Option<i64>,
    pub home_id: i64,
    /// Originating template id.
    pub template_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub due_date: NaiveDate,
    /// 1 = most urgent, 5 = least.
    pub priority: u8,
    pub difficulty: u8,
    pub estimated_minutes: Option<u32>,
    pub equipment_id: Option<i64>,
    pub weather_dependent: bool,
    pub status: TaskStatus,
    pub auto_generated: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// The slice of an open task the deduplicator needs: which template
/// produced it and when it is due. Full task records are not required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingTaskRef {
    pub template_id: String,
    pub due_date: NaiveDate,
}
