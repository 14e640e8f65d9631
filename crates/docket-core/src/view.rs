use std::cmp::Reverse;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};

use crate::datetime;
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    fn admits(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Active => !task.completed,
            Self::Completed => task.completed,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(anyhow!("unknown status filter: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Created,
    Due,
}

impl SortMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Due => "due",
        }
    }
}

impl FromStr for SortMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" => Ok(Self::Created),
            "due" => Ok(Self::Due),
            other => Err(anyhow!("unknown sort mode: {other}")),
        }
    }
}

/// Session-only display settings, owned by the presentation layer and
/// never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub filter: StatusFilter,
    pub search: String,
    pub sort: SortMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub task: Task,
    pub overdue: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub rows: Vec<Row>,
    pub shown: usize,
    pub percent: u8,
}

/// Pure display pipeline: status filter, title search, sort, overdue
/// flags, completion percentage. The underlying collection order is
/// never touched.
#[must_use]
pub fn build(tasks: &[Task], state: &ViewState, now: DateTime<Utc>) -> ViewModel {
    let mut visible: Vec<&Task> = tasks
        .iter()
        .filter(|task| state.filter.admits(task))
        .collect();

    if !state.search.trim().is_empty() {
        let needle = state.search.to_lowercase();
        visible.retain(|task| task.title.to_lowercase().contains(&needle));
    }

    match state.sort {
        SortMode::Due => visible.sort_by_key(|task| datetime::due_sort_key(&task.due_date)),
        SortMode::Created => visible.sort_by_key(|task| Reverse(task.created_at)),
    }

    let rows: Vec<Row> = visible
        .into_iter()
        .map(|task| Row {
            overdue: !task.completed && datetime::is_overdue(&task.due_date, now),
            task: task.clone(),
        })
        .collect();

    ViewModel {
        shown: rows.len(),
        percent: completion_percent(tasks),
        rows,
    }
}

/// Percentage over the full, unfiltered collection; 0 when empty.
#[must_use]
pub fn completion_percent(tasks: &[Task]) -> u8 {
    if tasks.is_empty() {
        return 0;
    }

    let completed = tasks.iter().filter(|task| task.completed).count();
    ((completed as f64 / tasks.len() as f64) * 100.0).round() as u8
}
