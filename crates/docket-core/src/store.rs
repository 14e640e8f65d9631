use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::datastore::DataStore;
use crate::task::Task;

/// In-memory task collection, single source of truth for a session.
/// Loaded once at startup; every successful mutation persists the whole
/// collection before returning. Operations on an absent id are no-ops,
/// never errors.
#[derive(Debug)]
pub struct TaskStore {
    data: DataStore,
    tasks: Vec<Task>,
}

impl TaskStore {
    #[instrument(skip(data))]
    pub fn open(data: DataStore) -> Self {
        let tasks = data.load_tasks();
        info!(count = tasks.len(), "task store ready");
        Self { data, tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn data(&self) -> &DataStore {
        &self.data
    }

    /// Prepends a fresh record. A title that trims to empty is silently
    /// discarded; `due_date` is taken as given (the form validates it).
    #[instrument(skip(self, title, due_date, now))]
    pub fn add(
        &mut self,
        title: &str,
        due_date: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<&Task>> {
        let clean = title.trim();
        if clean.is_empty() {
            debug!("add skipped: blank title");
            return Ok(None);
        }

        let task = Task::new(clean.to_string(), due_date.to_string(), now);
        info!(id = %task.id, "task created");
        self.tasks.insert(0, task);
        self.data.save_tasks(&self.tasks)?;
        Ok(self.tasks.first())
    }

    #[instrument(skip(self), fields(id = %id))]
    pub fn remove(&mut self, id: Uuid) -> anyhow::Result<bool> {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        if self.tasks.len() == before {
            debug!("remove skipped: id not present");
            return Ok(false);
        }

        self.data.save_tasks(&self.tasks)?;
        info!("task removed");
        Ok(true)
    }

    #[instrument(skip(self), fields(id = %id))]
    pub fn toggle_complete(&mut self, id: Uuid) -> anyhow::Result<bool> {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            debug!("toggle skipped: id not present");
            return Ok(false);
        };

        task.completed = !task.completed;
        let completed = task.completed;
        self.data.save_tasks(&self.tasks)?;
        info!(completed, "task toggled");
        Ok(true)
    }

    /// Replaces the title if the new one trims to something non-empty;
    /// otherwise the old title is retained.
    #[instrument(skip(self, new_title), fields(id = %id))]
    pub fn rename(&mut self, id: Uuid, new_title: &str) -> anyhow::Result<bool> {
        let clean = new_title.trim();
        if clean.is_empty() {
            debug!("rename skipped: blank title");
            return Ok(false);
        }

        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            debug!("rename skipped: id not present");
            return Ok(false);
        };

        task.title = clean.to_string();
        self.data.save_tasks(&self.tasks)?;
        info!("task renamed");
        Ok(true)
    }
}
