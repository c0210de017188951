use crate::model::Task;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const STORE_DIR: &str = ".triage";
const TASKS_FILE: &str = "tasks.yml";
const SETTINGS_FILE: &str = "settings.yml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskScope {
    Project,
    Global,
}

#[derive(Debug, Clone)]
pub struct TaskLocation {
    pub path: PathBuf,
    pub scope: TaskScope,
}

impl TaskScope {
    pub fn label(self) -> &'static str {
        match self {
            TaskScope::Project => "project",
            TaskScope::Global => "global",
        }
    }
}

impl TaskLocation {
    /// Settings live next to the task file.
    pub fn settings_path(&self) -> PathBuf {
        self.path.with_file_name(SETTINGS_FILE)
    }
}

pub fn init_project_store(dir: &Path) -> Result<TaskLocation> {
    let store_dir = dir.join(STORE_DIR);
    fs::create_dir_all(&store_dir)
        .with_context(|| format!("failed to create {:?}", store_dir))?;
    let location = TaskLocation {
        path: store_dir.join(TASKS_FILE),
        scope: TaskScope::Project,
    };
    if !location.path.exists() {
        save_tasks(&location, &[])?;
    }
    Ok(location)
}

pub fn locate_store(start: &Path) -> Result<TaskLocation> {
    if let Some(project_path) = find_project_store(start) {
        return Ok(TaskLocation {
            path: project_path,
            scope: TaskScope::Project,
        });
    }
    Ok(TaskLocation {
        path: global_store_path()?,
        scope: TaskScope::Global,
    })
}

/// Reads the whole task list. A missing file is an empty list; an unreadable
/// or malformed one is logged and also treated as empty.
pub fn load_tasks(location: &TaskLocation) -> Vec<Task> {
    let data = match fs::read_to_string(&location.path) {
        Ok(data) => data,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %location.path.display(), "no task file yet");
            return Vec::new();
        }
        Err(err) => {
            warn!(
                path = %location.path.display(),
                error = %err,
                "failed to read tasks, starting empty"
            );
            return Vec::new();
        }
    };
    if data.trim().is_empty() {
        return Vec::new();
    }
    match serde_yaml::from_str::<Vec<Task>>(&data) {
        Ok(tasks) => {
            debug!(path = %location.path.display(), count = tasks.len(), "loaded tasks");
            tasks
        }
        Err(err) => {
            warn!(
                path = %location.path.display(),
                error = %err,
                "failed to parse tasks, starting empty"
            );
            Vec::new()
        }
    }
}

pub fn save_tasks(location: &TaskLocation, tasks: &[Task]) -> Result<()> {
    if let Some(parent) = location.path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(tasks).context("serializing tasks")?;
    fs::write(&location.path, serialized)
        .with_context(|| format!("writing {:?}", location.path))?;
    debug!(path = %location.path.display(), count = tasks.len(), "saved tasks");
    Ok(())
}

fn find_project_store(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(STORE_DIR).join(TASKS_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_store_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "triage").context("locating data directory")?;
    Ok(dirs.data_dir().join(TASKS_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, TaskDraft, TaskStore};
    use chrono::{NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn location_in(dir: &TempDir) -> TaskLocation {
        TaskLocation {
            path: dir.path().join("nested").join(TASKS_FILE),
            scope: TaskScope::Global,
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        assert!(load_tasks(&location_in(&dir)).is_empty());
    }

    #[test]
    fn saved_tasks_load_back() {
        let dir = TempDir::new().unwrap();
        let location = location_in(&dir);
        let mut store = TaskStore::default();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let id = store
            .create(
                TaskDraft::new("Pay rent")
                    .with_category("Home")
                    .with_priority(Priority::High)
                    .with_due_date(NaiveDate::from_ymd_opt(2024, 2, 1)),
                now,
            )
            .unwrap()
            .id
            .clone();
        store.create(TaskDraft::new("Call mom"), now).unwrap();
        store.toggle(&id);

        save_tasks(&location, store.tasks()).unwrap();
        assert_eq!(load_tasks(&location), store.tasks().to_vec());
    }

    #[test]
    fn corrupt_file_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let location = location_in(&dir);
        fs::create_dir_all(location.path.parent().unwrap()).unwrap();
        fs::write(&location.path, "{ this is: [not, a task list").unwrap();
        assert!(load_tasks(&location).is_empty());

        fs::write(&location.path, "- id: 1\n  title: no other fields\n").unwrap();
        assert!(load_tasks(&location).is_empty());
    }

    #[test]
    fn init_creates_project_store_and_locate_finds_it_from_subdirs() {
        let dir = TempDir::new().unwrap();
        let location = init_project_store(dir.path()).unwrap();
        assert_eq!(location.scope, TaskScope::Project);
        assert!(location.path.exists());
        assert!(load_tasks(&location).is_empty());

        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        let found = locate_store(&nested).unwrap();
        assert_eq!(found.scope, TaskScope::Project);
        assert_eq!(found.path, location.path);
        assert_eq!(
            found.settings_path(),
            dir.path().join(STORE_DIR).join(SETTINGS_FILE)
        );
    }

    #[test]
    fn init_keeps_existing_tasks() {
        let dir = TempDir::new().unwrap();
        let location = init_project_store(dir.path()).unwrap();
        let mut store = TaskStore::default();
        store
            .create(TaskDraft::new("survives"), Utc::now())
            .unwrap();
        save_tasks(&location, store.tasks()).unwrap();

        init_project_store(dir.path()).unwrap();
        assert_eq!(load_tasks(&location).len(), 1);
    }
}
