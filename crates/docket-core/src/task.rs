use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One task record. `due_date` stays the raw `YYYY-MM-DD` string it was
/// created with; it is validated by the add form only, never on load or
/// rename.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,

    pub title: String,

    pub due_date: String,

    #[serde(default)]
    pub completed: bool,

    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(title: String, due_date: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            due_date,
            completed: false,
            created_at: now,
        }
    }
}
