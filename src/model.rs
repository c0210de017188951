use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub type TaskId = String;

pub const DEFAULT_CATEGORY: &str = "Personal";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "due_date")]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

/// Form payload for creating or editing a task. Completion state is not part
/// of it: edits never change whether a task is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("title is required")]
    TitleRequired,
    #[error("unknown priority: {0} (expected High, Medium or Low)")]
    InvalidPriority(String),
    #[error("invalid due date (use YYYY-MM-DD): {0}")]
    InvalidDueDate(String),
    #[error("unknown status: {0} (expected All, Active or Completed)")]
    InvalidStatus(String),
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Sort key: lower ranks are shown first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Priority::High => Priority::Medium,
            Priority::Medium => Priority::Low,
            Priority::Low => Priority::High,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Priority::High => Priority::Low,
            Priority::Medium => Priority::High,
            Priority::Low => Priority::Medium,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Priority::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| TaskError::InvalidPriority(trimmed.to_string()))
    }
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        TaskDraft {
            title: title.into(),
            description: String::new(),
            category: DEFAULT_CATEGORY.to_string(),
            priority: Priority::default(),
            due_date: None,
        }
    }

    pub fn from_task(task: &Task) -> Self {
        TaskDraft {
            title: task.title.clone(),
            description: task.description.clone(),
            category: task.category.clone(),
            priority: task.priority,
            due_date: task.due_date,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: Option<NaiveDate>) -> Self {
        self.due_date = due_date;
        self
    }

    fn validated_title(&self) -> Result<String, TaskError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(TaskError::TitleRequired);
        }
        Ok(title.to_string())
    }

    /// Blank categories fall back to the default one.
    fn validated_category(&self) -> String {
        match self.category.trim() {
            "" => DEFAULT_CATEGORY.to_string(),
            category => category.to_string(),
        }
    }
}

/// In-memory task collection. The single owner (a CLI command or the TUI)
/// mutates it and hands `tasks()` to the view engine and to storage.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    /// Highest numeric id handed out so far, including deleted tasks.
    last_issued: Option<i64>,
}

impl TaskStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        let last_issued = tasks.iter().filter_map(|t| t.id.parse().ok()).max();
        TaskStore { tasks, last_issued }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for task in &self.tasks {
            if !seen.contains(&task.category.as_str()) {
                seen.push(task.category.as_str());
            }
        }
        seen
    }

    pub fn create(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Result<&Task, TaskError> {
        let title = draft.validated_title()?;
        let task = Task {
            id: self.fresh_id(now),
            title,
            description: draft.description.trim().to_string(),
            category: draft.validated_category(),
            priority: draft.priority,
            completed: false,
            created_at: now,
            due_date: draft.due_date,
        };
        debug!(id = %task.id, title = %task.title, "created task");
        let idx = self.tasks.len();
        self.tasks.push(task);
        Ok(&self.tasks[idx])
    }

    /// Replaces every editable field. `id`, `created_at` and `completed` are
    /// kept. An unknown id is a no-op.
    pub fn update(&mut self, id: &str, draft: TaskDraft) -> Result<Option<&Task>, TaskError> {
        let title = draft.validated_title()?;
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "update skipped, task no longer exists");
            return Ok(None);
        };
        task.title = title;
        task.description = draft.description.trim().to_string();
        task.category = draft.validated_category();
        task.priority = draft.priority;
        task.due_date = draft.due_date;
        debug!(id, "updated task");
        Ok(Some(&*task))
    }

    pub fn toggle(&mut self, id: &str) -> Option<&Task> {
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        task.completed = !task.completed;
        debug!(id, completed = task.completed, "toggled task");
        Some(&*task)
    }

    /// Removes the task if `confirm` agrees. `confirm` is only asked when the
    /// task exists.
    pub fn delete<F>(&mut self, id: &str, confirm: F) -> Option<Task>
    where
        F: FnOnce(&Task) -> bool,
    {
        let idx = self.tasks.iter().position(|t| t.id == id)?;
        if !confirm(&self.tasks[idx]) {
            debug!(id, "delete declined");
            return None;
        }
        debug!(id, "deleted task");
        Some(self.tasks.remove(idx))
    }

    /// Removes every completed task if `confirm` agrees, returning how many
    /// were removed. With nothing completed `confirm` is never called.
    pub fn clear_completed<F>(&mut self, confirm: F) -> usize
    where
        F: FnOnce(usize) -> bool,
    {
        let completed = self.tasks.iter().filter(|t| t.completed).count();
        if completed == 0 || !confirm(completed) {
            return 0;
        }
        self.tasks.retain(|t| !t.completed);
        debug!(removed = completed, "cleared completed tasks");
        completed
    }

    /// Creation time in milliseconds, moved past every id issued before so
    /// that a deleted task's id is never handed out again.
    fn fresh_id(&mut self, now: DateTime<Utc>) -> TaskId {
        let mut stamp = now.timestamp_millis();
        if let Some(last) = self.last_issued {
            stamp = stamp.max(last + 1);
        }
        while self.get(&stamp.to_string()).is_some() {
            stamp += 1;
        }
        self.last_issued = Some(stamp);
        stamp.to_string()
    }
}

/// Due dates persist as `YYYY-MM-DD`. Full RFC 3339 timestamps are accepted
/// on read and cut down to their calendar date.
mod due_date {
    use chrono::{DateTime, NaiveDate};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => parse_stored(text)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid due date: {text}"))),
        }
    }

    fn parse_stored(text: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(text, FORMAT)
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
    }
}
