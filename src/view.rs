//! Filtering, ordering and summaries over the task list.
//!
//! Everything here is a pure function of its inputs: callers pass the task
//! slice, the filter configuration and the reference instant explicitly.

use crate::due::DueStatus;
use crate::model::{Priority, Task, TaskError};
use chrono::{DateTime, TimeZone};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

pub const NO_UPCOMING: &str = "No upcoming tasks yet. Add one to get started!";

/// A filter slot that either admits everything or one exact value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Choice<T> {
    #[default]
    All,
    Only(T),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterConfig {
    pub category: Choice<String>,
    pub priority: Choice<Priority>,
    pub status: StatusFilter,
    pub search: String,
    pub focus: bool,
}

/// Case-insensitive substring matcher over title and description.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    needle: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextTask<'a> {
    pub task: &'a Task,
    pub status: DueStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
}

impl<T: PartialEq> Choice<T> {
    pub fn admits(&self, value: &T) -> bool {
        match self {
            Choice::All => true,
            Choice::Only(wanted) => wanted == value,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Choice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::All => f.write_str("All"),
            Choice::Only(value) => value.fmt(f),
        }
    }
}

impl<T: FromStr> FromStr for Choice<T> {
    type Err = T::Err;

    /// `All` selects everything. Other spellings of "all" only mean the
    /// sentinel when they are not a valid value themselves, so a category
    /// named `all` can still be picked.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed == "All" {
            return Ok(Choice::All);
        }
        match trimmed.parse() {
            Ok(value) => Ok(Choice::Only(value)),
            Err(_) if trimmed.eq_ignore_ascii_case("all") => Ok(Choice::All),
            Err(err) => Err(err),
        }
    }
}

impl StatusFilter {
    pub fn admits(self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Completed => task.completed,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Active => "Active",
            StatusFilter::Completed => "Completed",
        }
    }

    pub fn next(self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Active,
            StatusFilter::Active => StatusFilter::Completed,
            StatusFilter::Completed => StatusFilter::All,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StatusFilter {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        [
            StatusFilter::All,
            StatusFilter::Active,
            StatusFilter::Completed,
        ]
        .into_iter()
        .find(|st| st.label().eq_ignore_ascii_case(trimmed))
        .ok_or_else(|| TaskError::InvalidStatus(trimmed.to_string()))
    }
}

impl FilterConfig {
    /// True when no stage removes anything.
    pub fn is_identity(&self) -> bool {
        self.category == Choice::All
            && self.priority == Choice::All
            && self.status == StatusFilter::All
            && SearchQuery::new(&self.search).is_none()
            && !self.focus
    }

    pub fn admits<Tz: TimeZone>(
        &self,
        task: &Task,
        query: Option<&SearchQuery>,
        now: &DateTime<Tz>,
    ) -> bool {
        self.category.admits(&task.category)
            && self.priority.admits(&task.priority)
            && self.status.admits(task)
            && query.map_or(true, |q| q.matches(task))
            && (!self.focus || DueStatus::classify(task, now).is_urgent())
    }
}

impl SearchQuery {
    /// Returns `None` for blank input, which filters nothing.
    pub fn new(query: &str) -> Option<Self> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(SearchQuery {
            needle: trimmed.to_lowercase(),
        })
    }

    pub fn matches(&self, task: &Task) -> bool {
        task.title.to_lowercase().contains(&self.needle)
            || task.description.to_lowercase().contains(&self.needle)
    }
}

/// The ordered subset of `tasks` selected by `config`, evaluated at `now`.
pub fn view<'a, Tz: TimeZone>(
    tasks: &'a [Task],
    config: &FilterConfig,
    now: &DateTime<Tz>,
) -> Vec<&'a Task> {
    let query = SearchQuery::new(&config.search);
    let mut visible: Vec<&Task> = tasks
        .iter()
        .filter(|task| config.admits(task, query.as_ref(), now))
        .collect();
    visible.sort_by(|a, b| compare_tasks(a, b));
    visible
}

/// Deadline-first ordering. Dated tasks precede undated ones; dates compare
/// first, then priority rank, then creation time.
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    match (a.due_date, b.due_date) {
        (Some(due_a), Some(due_b)) => due_a
            .cmp(&due_b)
            .then_with(|| priority_then_age(a, b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => priority_then_age(a, b),
    }
}

fn priority_then_age(a: &Task, b: &Task) -> Ordering {
    a.priority
        .rank()
        .cmp(&b.priority.rank())
        .then_with(|| a.created_at.cmp(&b.created_at))
}

/// The first incomplete dated task by (due date, priority rank). Equal keys
/// keep list order.
pub fn next_task(tasks: &[Task]) -> Option<&Task> {
    tasks
        .iter()
        .filter(|t| !t.completed)
        .filter_map(|t| t.due_date.map(|due| (due, t)))
        .min_by(|(due_a, a), (due_b, b)| {
            due_a
                .cmp(due_b)
                .then_with(|| a.priority.rank().cmp(&b.priority.rank()))
        })
        .map(|(_, t)| t)
}

impl<'a> NextTask<'a> {
    pub fn from_tasks<Tz: TimeZone>(tasks: &'a [Task], now: &DateTime<Tz>) -> Option<Self> {
        next_task(tasks).map(|task| NextTask {
            task,
            status: DueStatus::classify(task, now),
        })
    }

    pub fn summary(&self) -> String {
        let due = self
            .task
            .due_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        format!(
            "{}: {} · {} · {} priority",
            self.status.label(),
            self.task.title,
            due,
            self.task.priority
        )
    }
}

/// Hero line: the next task, or an invitation to add one.
pub fn next_task_summary<Tz: TimeZone>(tasks: &[Task], now: &DateTime<Tz>) -> String {
    NextTask::from_tasks(tasks, now)
        .map(|next| next.summary())
        .unwrap_or_else(|| NO_UPCOMING.to_string())
}

impl Stats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.completed).count();
        Stats {
            total,
            completed,
            active: total - completed,
        }
    }

    pub fn completed_percent(&self) -> f64 {
        percent(self.completed, self.total)
    }

    pub fn active_percent(&self) -> f64 {
        percent(self.active, self.total)
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}
