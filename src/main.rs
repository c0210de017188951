mod cli;
mod commands;
mod config;
mod due;
mod model;
mod storage;
mod ui;
mod view;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use view::FilterConfig;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Tui);
    if !matches!(command, cli::Command::Tui) {
        install_tracing(args.verbose);
    }
    match command {
        cli::Command::Init => commands::init(),
        cli::Command::List {
            category,
            priority,
            status,
            search,
            focus,
        } => commands::list(FilterConfig {
            category,
            priority,
            status,
            search,
            focus,
        }),
        cli::Command::Add {
            title,
            description,
            category,
            priority,
            due,
        } => commands::add(title, description, category, priority, due),
        cli::Command::Edit {
            task_id,
            title,
            description,
            category,
            priority,
            due,
            clear_due,
        } => commands::edit(
            task_id,
            title,
            description,
            category,
            priority,
            due,
            clear_due,
        ),
        cli::Command::Toggle { task_id } => commands::toggle(task_id),
        cli::Command::Delete { task_id, yes } => commands::delete(task_id, yes),
        cli::Command::ClearCompleted { yes } => commands::clear_completed(yes),
        cli::Command::Next => commands::next(),
        cli::Command::Stats => commands::stats(),
        cli::Command::Theme { theme } => commands::theme(theme),
        cli::Command::Tui => commands::tui(),
    }
}

/// The TUI owns the terminal, so only line-oriented commands log. `RUST_LOG`
/// overrides the default level.
fn install_tracing(verbose: bool) {
    let default_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
