use crate::config::{Settings, Theme};
use crate::due::DueStatus;
use crate::model::{Priority, Task, TaskDraft, TaskError, TaskStore};
use crate::storage::{init_project_store, load_tasks, locate_store, save_tasks, TaskLocation};
use crate::ui;
use crate::view::{self, FilterConfig, Stats};
use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use std::env;
use std::io::{self, BufRead, Write};
use tracing::warn;

const DUE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y.%m.%d"];

pub fn init() -> Result<()> {
    let cwd = env::current_dir()?;
    let location = init_project_store(&cwd)?;
    println!("Initialized task list at {}", location.path.display());
    Ok(())
}

pub fn list(config: FilterConfig) -> Result<()> {
    let (store, location) = load_current_store()?;
    let now = Local::now();
    println!(
        "Tasks ({}: {})",
        location.scope.label(),
        location.path.display()
    );
    let visible = view::view(store.tasks(), &config, &now);
    if store.is_empty() {
        println!("  (no tasks yet)");
    } else if visible.is_empty() {
        println!("  (no matching tasks)");
    } else if !config.is_identity() {
        println!("  showing {} of {}", visible.len(), store.len());
    }
    for task in visible {
        print_task(task, &now);
    }
    println!();
    println!("{}", format_stats(&Stats::from_tasks(store.tasks())));
    Ok(())
}

pub fn add(
    title: String,
    description: Option<String>,
    category: Option<String>,
    priority: Option<Priority>,
    due: Option<String>,
) -> Result<()> {
    let (mut store, location) = load_current_store()?;
    let settings = Settings::load(&location.settings_path());
    let draft = TaskDraft::new(title)
        .with_description(description.unwrap_or_default())
        .with_category(category.unwrap_or(settings.default_category))
        .with_priority(priority.unwrap_or(settings.default_priority))
        .with_due_date(parse_due(due.as_deref())?);
    let id = store.create(draft, Utc::now())?.id.clone();
    save_tasks(&location, store.tasks())?;
    println!("Added task {}", id);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn edit(
    task_id: String,
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    priority: Option<Priority>,
    due: Option<String>,
    clear_due: bool,
) -> Result<()> {
    let (mut store, location) = load_current_store()?;
    let due_date = parse_due(due.as_deref())?;
    let Some(existing) = store.get(&task_id) else {
        println!("Task {} not found", task_id);
        return Ok(());
    };
    let mut draft = TaskDraft::from_task(existing);
    if let Some(t) = title {
        draft.title = t;
    }
    if let Some(d) = description {
        draft.description = d;
    }
    if let Some(c) = category {
        draft.category = c;
    }
    if let Some(p) = priority {
        draft.priority = p;
    }
    if clear_due {
        draft.due_date = None;
    }
    if due_date.is_some() {
        draft.due_date = due_date;
    }
    store
        .update(&task_id, draft)
        .with_context(|| format!("editing task {}", task_id))?;
    save_tasks(&location, store.tasks())?;
    println!("Updated task {}", task_id);
    Ok(())
}

pub fn toggle(task_id: String) -> Result<()> {
    let (mut store, location) = load_current_store()?;
    let Some(task) = store.toggle(&task_id) else {
        println!("Task {} not found", task_id);
        return Ok(());
    };
    let state = if task.completed { "completed" } else { "active" };
    println!("Marked {} {}", task_id, state);
    save_tasks(&location, store.tasks())?;
    Ok(())
}

pub fn delete(task_id: String, yes: bool) -> Result<()> {
    let (mut store, location) = load_current_store()?;
    if store.get(&task_id).is_none() {
        println!("Task {} not found", task_id);
        return Ok(());
    }
    let removed = store.delete(&task_id, |task| {
        yes || confirm(&format!("Delete \"{}\"?", task.title))
    });
    match removed {
        Some(task) => {
            save_tasks(&location, store.tasks())?;
            println!("Deleted task {} ({})", task.id, task.title);
        }
        None => println!("Delete canceled"),
    }
    Ok(())
}

pub fn clear_completed(yes: bool) -> Result<()> {
    let (mut store, location) = load_current_store()?;
    if !store.tasks().iter().any(|t| t.completed) {
        println!("No completed tasks");
        return Ok(());
    }
    let removed = store.clear_completed(|count| {
        yes || confirm(&format!("Delete all {} completed task(s)?", count))
    });
    if removed == 0 {
        println!("Clear canceled");
        return Ok(());
    }
    save_tasks(&location, store.tasks())?;
    println!("Removed {} completed task(s)", removed);
    Ok(())
}

pub fn next() -> Result<()> {
    let (store, _) = load_current_store()?;
    println!("{}", view::next_task_summary(store.tasks(), &Local::now()));
    Ok(())
}

pub fn stats() -> Result<()> {
    let (store, _) = load_current_store()?;
    println!("{}", format_stats(&Stats::from_tasks(store.tasks())));
    Ok(())
}

pub fn theme(theme: Option<Theme>) -> Result<()> {
    let location = locate_store(&env::current_dir()?)?;
    let path = location.settings_path();
    let mut settings = Settings::load(&path);
    if let Some(theme) = theme {
        settings.theme = theme;
        settings.save(&path)?;
        println!("Theme set to {}", theme);
    } else {
        println!("{}", settings.theme);
    }
    Ok(())
}

pub fn tui() -> Result<()> {
    let (store, location) = load_current_store()?;
    let settings = Settings::load(&location.settings_path());
    ui::run(store, location, settings)
}

/// Parses a user-supplied due date. Blank input means no due date.
pub fn parse_due(input: Option<&str>) -> Result<Option<NaiveDate>, TaskError> {
    let raw = match input {
        Some(r) => r.trim(),
        None => return Ok(None),
    };
    if raw.is_empty() {
        return Ok(None);
    }
    DUE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(Some)
        .ok_or_else(|| TaskError::InvalidDueDate(raw.to_string()))
}

pub fn format_stats(stats: &Stats) -> String {
    format!(
        "{} total · {} completed ({:.0}%) · {} active ({:.0}%)",
        stats.total,
        stats.completed,
        stats.completed_percent(),
        stats.active,
        stats.active_percent()
    )
}

fn load_current_store() -> Result<(TaskStore, TaskLocation)> {
    let cwd = env::current_dir()?;
    let location = locate_store(&cwd)?;
    let store = TaskStore::new(load_tasks(&location));
    Ok((store, location))
}

fn confirm(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if let Err(err) = io::stdout().flush() {
        warn!(error = %err, "failed to flush prompt");
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes" | "Yes"),
        Err(err) => {
            warn!(error = %err, "failed to read confirmation");
            false
        }
    }
}

fn print_task(task: &Task, now: &DateTime<Local>) {
    let check = if task.completed { "[x]" } else { "[ ]" };
    let mut meta = vec![task.category.clone(), format!("{} priority", task.priority)];
    if let Some(due) = task.due_date {
        let badge = match DueStatus::classify(task, now) {
            DueStatus::Overdue => "Overdue",
            DueStatus::Today => "Due Today",
            _ => "Due",
        };
        meta.push(format!("{} {}", badge, due.format("%Y-%m-%d")));
    }
    println!("  {} {}: {}  ({})", check, task.id, task.title, meta.join(" · "));
    if !task.description.is_empty() {
        println!("      {}", task.description);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_due_accepts_both_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert_eq!(parse_due(Some("2024-03-09")), Ok(expected));
        assert_eq!(parse_due(Some(" 2024.03.09 ")), Ok(expected));
    }

    #[test]
    fn parse_due_blank_is_none() {
        assert_eq!(parse_due(None), Ok(None));
        assert_eq!(parse_due(Some("   ")), Ok(None));
    }

    #[test]
    fn parse_due_rejects_garbage() {
        assert_eq!(
            parse_due(Some("next tuesday")),
            Err(TaskError::InvalidDueDate("next tuesday".into()))
        );
        assert!(parse_due(Some("2024-02-30")).is_err());
    }

    #[test]
    fn stats_line_rounds_percentages() {
        let stats = Stats {
            total: 3,
            completed: 1,
            active: 2,
        };
        assert_eq!(
            format_stats(&stats),
            "3 total · 1 completed (33%) · 2 active (67%)"
        );
        assert_eq!(
            format_stats(&Stats::default()),
            "0 total · 0 completed (0%) · 0 active (0%)"
        );
    }
}
