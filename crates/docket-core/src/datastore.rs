use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::task::Task;
use crate::theme::Theme;

/// Whole-value persistence: the task collection is one JSON array in
/// `tasks.json`, the theme preference one word in `theme.data`. Every
/// save overwrites the entire entry.
#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
    pub theme_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join("tasks.json");
        let theme_path = data_dir.join("theme.data");

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            theme = %theme_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            tasks_path,
            theme_path,
        })
    }

    /// Absent, unreadable, or corrupt task data loads as an empty
    /// collection. This is the only recovery path.
    #[tracing::instrument(skip(self))]
    pub fn load_tasks(&self) -> Vec<Task> {
        let raw = match fs::read_to_string(&self.tasks_path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(file = %self.tasks_path.display(), "no task file yet");
                return Vec::new();
            }
            Err(err) => {
                warn!(
                    file = %self.tasks_path.display(),
                    error = %err,
                    "task file unreadable; starting empty"
                );
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Task>>(&raw) {
            Ok(tasks) => {
                debug!(count = tasks.len(), "loaded tasks");
                tasks
            }
            Err(err) => {
                warn!(
                    file = %self.tasks_path.display(),
                    error = %err,
                    "task file corrupt; starting empty"
                );
                Vec::new()
            }
        }
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn save_tasks(&self, tasks: &[Task]) -> anyhow::Result<()> {
        debug!(
            file = %self.tasks_path.display(),
            count = tasks.len(),
            "saving tasks"
        );
        let payload = serde_json::to_string(tasks)?;
        write_atomic(&self.tasks_path, &payload).context("failed to save tasks.json")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_theme(&self) -> Theme {
        let Ok(raw) = fs::read_to_string(&self.theme_path) else {
            return Theme::Light;
        };

        raw.parse().unwrap_or_else(|_| {
            warn!(value = %raw.trim(), "unknown stored theme; defaulting to light");
            Theme::Light
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn save_theme(&self, theme: Theme) -> anyhow::Result<()> {
        fs::write(&self.theme_path, theme.as_str())
            .with_context(|| format!("failed writing {}", self.theme_path.display()))
    }
}

fn write_atomic(path: &Path, payload: &str) -> anyhow::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(payload.as_bytes())?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::tempdir;

    use super::DataStore;
    use crate::task::Task;
    use crate::theme::Theme;

    #[test]
    fn round_trips_the_whole_collection() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path()).expect("open datastore");

        let now = Utc::now();
        let tasks = vec![
            Task::new("Write report".to_string(), "2026-08-12".to_string(), now),
            Task::new("Call back".to_string(), "2026-08-09".to_string(), now),
        ];

        store.save_tasks(&tasks).expect("save tasks");
        assert_eq!(store.load_tasks(), tasks);
    }

    #[test]
    fn corrupt_or_missing_data_loads_empty() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path()).expect("open datastore");

        assert!(store.load_tasks().is_empty());

        std::fs::write(&store.tasks_path, "{not json").expect("write garbage");
        assert!(store.load_tasks().is_empty());

        std::fs::write(&store.tasks_path, "{\"id\": 4}").expect("write non-array");
        assert!(store.load_tasks().is_empty());
    }

    #[test]
    fn theme_defaults_to_light_and_persists() {
        let temp = tempdir().expect("tempdir");
        let store = DataStore::open(temp.path()).expect("open datastore");

        assert_eq!(store.load_theme(), Theme::Light);

        store.save_theme(Theme::Dark).expect("save theme");
        assert_eq!(store.load_theme(), Theme::Dark);

        std::fs::write(&store.theme_path, "mauve").expect("write garbage theme");
        assert_eq!(store.load_theme(), Theme::Light);
    }
}
