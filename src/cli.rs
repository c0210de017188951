use crate::config::Theme;
use crate::model::Priority;
use crate::view::{Choice, StatusFilter};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "triage", version, about = "Deadline-first personal task manager")]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a task list in the current directory
    Init,
    /// List tasks, due-date first
    List {
        /// Only this category ("All" for every category)
        #[arg(long, default_value = "All")]
        category: Choice<String>,
        /// Only this priority (High, Medium, Low or All)
        #[arg(long, default_value = "All")]
        priority: Choice<Priority>,
        /// All, Active or Completed
        #[arg(long, default_value = "All")]
        status: StatusFilter,
        /// Case-insensitive text to find in title or description
        #[arg(long, short = 's', default_value = "")]
        search: String,
        /// Only tasks due today or overdue
        #[arg(long)]
        focus: bool,
    },
    /// Add a new task
    Add {
        /// Title of the task
        title: String,
        /// Optional description
        #[arg(long, short = 'd')]
        description: Option<String>,
        /// Category label (defaults to the configured category)
        #[arg(long, short = 'c')]
        category: Option<String>,
        /// High, Medium or Low (defaults to the configured priority)
        #[arg(long, short = 'p')]
        priority: Option<Priority>,
        /// Due date in YYYY-MM-DD format
        #[arg(long)]
        due: Option<String>,
    },
    /// Edit an existing task; completion is left untouched
    Edit {
        /// Task id to edit
        task_id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(long, short = 'd')]
        description: Option<String>,
        /// New category
        #[arg(long, short = 'c')]
        category: Option<String>,
        /// New priority
        #[arg(long, short = 'p')]
        priority: Option<Priority>,
        /// Set due date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        /// Clear due date
        #[arg(long)]
        clear_due: bool,
    },
    /// Mark a task done, or not done again
    Toggle {
        /// Task id to toggle
        task_id: String,
    },
    /// Delete a task
    Delete {
        /// Task id to delete
        task_id: String,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Delete every completed task
    ClearCompleted {
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Show the most pressing unfinished task
    Next,
    /// Show completed and active counts
    Stats,
    /// Show or set the colour theme
    Theme {
        /// light or dark
        theme: Option<Theme>,
    },
    /// Launch the interactive TUI
    Tui,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_tui() {
        let cli = Cli::parse_from(["triage"]);
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn parse_list_filters() {
        let cli = Cli::parse_from([
            "triage",
            "list",
            "--category",
            "Work",
            "--priority",
            "high",
            "--status",
            "active",
            "--search",
            "report",
            "--focus",
        ]);
        match cli.command {
            Some(Command::List {
                category,
                priority,
                status,
                search,
                focus,
            }) => {
                assert_eq!(category, Choice::Only("Work".to_string()));
                assert_eq!(priority, Choice::Only(Priority::High));
                assert_eq!(status, StatusFilter::Active);
                assert_eq!(search, "report");
                assert!(focus);
            }
            other => panic!("expected list command, got {other:?}"),
        }
    }

    #[test]
    fn list_defaults_to_identity_filter() {
        let cli = Cli::parse_from(["triage", "list"]);
        match cli.command {
            Some(Command::List {
                category,
                priority,
                status,
                search,
                focus,
            }) => {
                assert_eq!(category, Choice::All);
                assert_eq!(priority, Choice::All);
                assert_eq!(status, StatusFilter::All);
                assert!(search.is_empty());
                assert!(!focus);
            }
            other => panic!("expected list command, got {other:?}"),
        }
    }

    #[test]
    fn parse_add_command() {
        let cli = Cli::parse_from([
            "triage",
            "-v",
            "add",
            "Write report",
            "-p",
            "Low",
            "--due",
            "2024-01-10",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Some(Command::Add {
                title,
                priority,
                due,
                category,
                ..
            }) => {
                assert_eq!(title, "Write report");
                assert_eq!(priority, Some(Priority::Low));
                assert_eq!(due.as_deref(), Some("2024-01-10"));
                assert!(category.is_none());
            }
            other => panic!("expected add command, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_priority() {
        assert!(Cli::try_parse_from(["triage", "add", "x", "-p", "urgent"]).is_err());
    }

    #[test]
    fn due_and_clear_due_conflict() {
        assert!(Cli::try_parse_from([
            "triage",
            "edit",
            "1",
            "--due",
            "2024-01-01",
            "--clear-due"
        ])
        .is_err());
    }

    #[test]
    fn parse_theme_command() {
        let cli = Cli::parse_from(["triage", "theme", "dark"]);
        match cli.command {
            Some(Command::Theme { theme }) => assert_eq!(theme, Some(Theme::Dark)),
            other => panic!("expected theme command, got {other:?}"),
        }
    }
}
