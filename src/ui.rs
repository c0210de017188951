use crate::commands::{format_stats, parse_due};
use crate::config::{Settings, Theme};
use crate::due::DueStatus;
use crate::model::{Priority, Task, TaskDraft, TaskError, TaskStore};
use crate::storage::{save_tasks, TaskLocation};
use crate::view::{self, Choice, FilterConfig, NextTask, Stats, NO_UPCOMING};
use anyhow::Result;
use chrono::{Local, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use rand::seq::SliceRandom;
use rand::Rng;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};
use tracing::warn;

const QUOTES: [&str; 5] = [
    "Small progress is still progress.",
    "Your future is built by what you do today.",
    "Done is better than perfect.",
    "Focus on the next right step.",
    "Big results start with small consistent actions.",
];

pub fn run(store: TaskStore, location: TaskLocation, settings: Settings) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let quote = pick_quote(&mut rand::thread_rng());
    let mut app = App::new(store, location, settings, quote);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    store: TaskStore,
    location: TaskLocation,
    settings: Settings,
    filter: FilterConfig,
    selected: usize,
    list_state: ListState,
    quote: &'static str,
    last_save: Instant,
    status: String,
    mode: Mode,
}

enum Mode {
    Normal,
    Creating(TaskForm),
    Editing { task_id: String, form: TaskForm },
    ConfirmDelete { task_id: String },
    ConfirmClear { count: usize },
    Searching { field: FieldValue, previous: String },
}

struct TaskForm {
    title: FieldValue,
    description: FieldValue,
    category: FieldValue,
    priority: Priority,
    due: FieldValue,
    field: FormField,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum FormField {
    Title,
    Description,
    Category,
    Priority,
    Due,
}

enum FormAction {
    Create,
    Edit(String),
}

#[derive(Clone, Debug)]
struct FieldValue {
    value: String,
    cursor: usize,
}

#[derive(Clone, Copy)]
struct Palette {
    text: Color,
    muted: Color,
    accent: Color,
    background: Color,
    selection: Color,
    overdue: Color,
    today: Color,
    due: Color,
    done: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Palette {
                text: Color::Black,
                muted: Color::DarkGray,
                accent: Color::Blue,
                background: Color::Rgb(250, 248, 244),
                selection: Color::Rgb(252, 214, 112),
                overdue: Color::Red,
                today: Color::Rgb(204, 120, 0),
                due: Color::Blue,
                done: Color::Green,
            },
            Theme::Dark => Palette {
                text: Color::White,
                muted: Color::Gray,
                accent: Color::Cyan,
                background: Color::Rgb(22, 24, 30),
                selection: Color::Rgb(60, 64, 82),
                overdue: Color::LightRed,
                today: Color::LightYellow,
                due: Color::LightCyan,
                done: Color::LightGreen,
            },
        }
    }

    fn priority(&self, priority: Priority) -> Color {
        match priority {
            Priority::High => self.overdue,
            Priority::Medium => self.today,
            Priority::Low => self.done,
        }
    }

    fn due_status(&self, status: DueStatus) -> Color {
        match status {
            DueStatus::Overdue => self.overdue,
            DueStatus::Today => self.today,
            DueStatus::Future => self.due,
            DueStatus::None => self.muted,
        }
    }
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if let Some((idx, _)) = self.value[..self.cursor].char_indices().next_back() {
            self.cursor = idx;
        }
    }

    fn move_right(&mut self) {
        if let Some(ch) = self.value[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
    }

    fn backspace(&mut self) {
        if let Some((idx, _)) = self.value[..self.cursor].char_indices().next_back() {
            self.value.drain(idx..self.cursor);
            self.cursor = idx;
        }
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert(self.cursor, '▌');
        text
    }

    fn edit(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.len(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert_char(c)
            }
            _ => {}
        }
    }
}

impl App {
    fn new(
        store: TaskStore,
        location: TaskLocation,
        settings: Settings,
        quote: &'static str,
    ) -> Self {
        let status = format!(
            "Loaded {} task(s) from {}",
            store.len(),
            location.path.display()
        );
        App {
            store,
            location,
            settings,
            filter: FilterConfig::default(),
            selected: 0,
            list_state: ListState::default(),
            quote,
            last_save: Instant::now(),
            status,
            mode: Mode::Normal,
        }
    }

    fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Creating(_) | Mode::Editing { .. } => self.handle_form_key(key),
            Mode::ConfirmDelete { .. } | Mode::ConfirmClear { .. } => {
                self.handle_confirm_key(key)
            }
            Mode::Searching { .. } => {
                self.handle_search_key(key);
                false
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected += 1;
                self.clamp_selection();
            }
            KeyCode::Char(' ') | KeyCode::Char('x') => self.toggle_selected(),
            KeyCode::Char('n') => {
                self.mode = Mode::Creating(TaskForm::new(&self.settings));
                self.status = "Adding task (Tab/Shift-Tab move, Enter save, Esc cancel)".into();
            }
            KeyCode::Char('e') => {
                let selected = self.current_task().map(|task| {
                    let form = TaskForm::from_task(task);
                    (task.id.clone(), task.title.clone(), form)
                });
                match selected {
                    Some((task_id, title, form)) => {
                        self.status = format!("Editing {}", title);
                        self.mode = Mode::Editing { task_id, form };
                    }
                    None => self.status = "No task selected to edit".into(),
                }
            }
            KeyCode::Char('d') => {
                let selected = self
                    .current_task()
                    .map(|task| (task.id.clone(), task.title.clone()));
                match selected {
                    Some((task_id, title)) => {
                        self.status =
                            format!("Delete \"{}\"? (y to confirm, n/Esc to cancel)", title);
                        self.mode = Mode::ConfirmDelete { task_id };
                    }
                    None => self.status = "No task selected to delete".into(),
                }
            }
            KeyCode::Char('C') => {
                let count = Stats::from_tasks(self.store.tasks()).completed;
                if count == 0 {
                    self.status = "No completed tasks to clear".into();
                } else {
                    self.status = format!("Delete all {} completed task(s)? (y/n)", count);
                    self.mode = Mode::ConfirmClear { count };
                }
            }
            KeyCode::Char('c') => {
                self.cycle_category();
                self.status = format!("Category: {}", self.filter.category);
            }
            KeyCode::Char('p') => {
                self.filter.priority = match self.filter.priority {
                    Choice::All => Choice::Only(Priority::High),
                    Choice::Only(Priority::Low) => Choice::All,
                    Choice::Only(p) => Choice::Only(p.next()),
                };
                self.status = format!("Priority: {}", self.filter.priority);
            }
            KeyCode::Char('s') => {
                self.filter.status = self.filter.status.next();
                self.status = format!("Status: {}", self.filter.status);
            }
            KeyCode::Char('f') => {
                self.filter.focus = !self.filter.focus;
                self.status = if self.filter.focus {
                    "Showing today / overdue".into()
                } else {
                    "Showing all due dates".into()
                };
            }
            KeyCode::Char('/') => {
                self.mode = Mode::Searching {
                    field: FieldValue::new(&self.filter.search),
                    previous: self.filter.search.clone(),
                };
                self.status = "Search (Enter keep, Esc restore)".into();
            }
            KeyCode::Char('r') => {
                self.filter = FilterConfig::default();
                self.status = "Filters reset".into();
            }
            KeyCode::Char('t') => self.toggle_theme(),
            _ => {}
        }
        self.clamp_selection();
        false
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> bool {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let close_form = match &mut mode {
            Mode::Creating(form) => self.process_form_key(FormAction::Create, form, key),
            Mode::Editing { task_id, form } => {
                let id = task_id.clone();
                self.process_form_key(FormAction::Edit(id), form, key)
            }
            _ => true,
        };
        if !close_form {
            self.mode = mode;
        }
        false
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                match std::mem::replace(&mut self.mode, Mode::Normal) {
                    Mode::ConfirmDelete { task_id } => {
                        match self.store.delete(&task_id, |_| true) {
                            Some(task) => {
                                self.persist(format!("Deleted \"{}\"", task.title))
                            }
                            None => self.status = "Task no longer exists".into(),
                        }
                    }
                    Mode::ConfirmClear { .. } => {
                        let removed = self.store.clear_completed(|_| true);
                        self.persist(format!("Removed {} completed task(s)", removed));
                    }
                    _ => {}
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.status = "Canceled".into();
                self.mode = Mode::Normal;
            }
            _ => {}
        }
        false
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        let Mode::Searching { field, previous } = &mut self.mode else {
            return;
        };
        match key.code {
            KeyCode::Enter => {
                self.status = if field.value.trim().is_empty() {
                    "Search cleared".into()
                } else {
                    format!("Searching for \"{}\"", field.value.trim())
                };
                self.mode = Mode::Normal;
            }
            KeyCode::Esc => {
                self.filter.search = std::mem::take(previous);
                self.status = "Search canceled".into();
                self.mode = Mode::Normal;
            }
            _ => {
                field.edit(key);
                self.filter.search = field.value.clone();
            }
        }
        self.selected = 0;
        self.clamp_selection();
    }

    fn process_form_key(
        &mut self,
        action: FormAction,
        form: &mut TaskForm,
        key: KeyEvent,
    ) -> bool {
        let mut close_form = false;
        match key.code {
            KeyCode::Esc => {
                close_form = true;
                self.status = "Canceled".into();
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.prev_field(),
            KeyCode::Enter => close_form = self.try_submit(action, form),
            _ if form.field == FormField::Priority => match key.code {
                KeyCode::Left => form.priority = form.priority.prev(),
                KeyCode::Right | KeyCode::Char(' ') => form.priority = form.priority.next(),
                _ => {}
            },
            _ => {
                if let Some(field) = form.active_text_mut() {
                    field.edit(key);
                }
            }
        }
        close_form
    }

    fn try_submit(&mut self, action: FormAction, form: &TaskForm) -> bool {
        let draft = match form.to_draft(&self.settings) {
            Ok(draft) => draft,
            Err(err) => {
                self.status = format!("Could not save: {}", err);
                return false;
            }
        };
        match action {
            FormAction::Create => match self.store.create(draft, Utc::now()) {
                Ok(task) => {
                    let id = task.id.clone();
                    let message = format!("Added \"{}\"", task.title);
                    self.persist(message);
                    self.select_task(&id);
                    true
                }
                Err(err) => {
                    self.status = format!("Could not create: {}", err);
                    false
                }
            },
            FormAction::Edit(task_id) => match self.store.update(&task_id, draft) {
                Ok(Some(task)) => {
                    let message = format!("Updated \"{}\"", task.title);
                    self.persist(message);
                    self.select_task(&task_id);
                    true
                }
                Ok(None) => {
                    self.status = "Task no longer exists".into();
                    true
                }
                Err(err) => {
                    self.status = format!("Could not edit: {}", err);
                    false
                }
            },
        }
    }

    fn toggle_selected(&mut self) {
        let Some(id) = self.current_task().map(|t| t.id.clone()) else {
            self.status = "No task selected".into();
            return;
        };
        if let Some(task) = self.store.toggle(&id) {
            let message = if task.completed {
                format!("Completed \"{}\"", task.title)
            } else {
                format!("Reopened \"{}\"", task.title)
            };
            self.persist(message);
        }
    }

    fn toggle_theme(&mut self) {
        self.settings.theme = self.settings.theme.toggle();
        self.status = match self.settings.save(&self.location.settings_path()) {
            Ok(()) => format!("Switched to {} theme", self.settings.theme),
            Err(err) => {
                warn!(error = %err, "failed to save settings");
                format!("Switched to {} theme (not saved: {:#})", self.settings.theme, err)
            }
        };
    }

    fn category_options(&self) -> Vec<String> {
        let mut options: Vec<String> = Vec::new();
        let configured = self.settings.categories.iter().map(String::as_str);
        for category in configured.chain(self.store.categories()) {
            if !options.iter().any(|c| c == category) {
                options.push(category.to_string());
            }
        }
        options
    }

    fn cycle_category(&mut self) {
        let options = self.category_options();
        self.filter.category = match &self.filter.category {
            Choice::All => options.first().cloned().map_or(Choice::All, Choice::Only),
            Choice::Only(current) => options
                .iter()
                .position(|c| c == current)
                .and_then(|idx| options.get(idx + 1))
                .cloned()
                .map_or(Choice::All, Choice::Only),
        };
    }

    fn visible(&self) -> Vec<&Task> {
        view::view(self.store.tasks(), &self.filter, &Local::now())
    }

    fn current_task(&self) -> Option<&Task> {
        self.visible().get(self.selected).copied()
    }

    fn select_task(&mut self, id: &str) {
        if let Some(idx) = self.visible().iter().position(|t| t.id == id) {
            self.selected = idx;
        }
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        let len = self.visible().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    /// Writes the store to disk. A failed write keeps the in-memory change
    /// and reports the error in the status line.
    fn persist(&mut self, message: impl Into<String>) {
        match save_tasks(&self.location, self.store.tasks()) {
            Ok(()) => {
                self.last_save = Instant::now();
                self.status = message.into();
            }
            Err(err) => {
                warn!(
                    path = %self.location.path.display(),
                    error = %err,
                    "failed to save tasks"
                );
                self.status = format!("Could not save: {:#}", err);
            }
        }
        self.clamp_selection();
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let palette = Palette::for_theme(self.settings.theme);
        let screen = f.size();
        f.render_widget(
            Block::default().style(
                Style::default()
                    .bg(palette.background)
                    .fg(palette.text),
            ),
            screen,
        );
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(2),
                Constraint::Min(5),
                Constraint::Length(4),
            ])
            .split(screen);

        self.draw_header(f, layout[0], &palette);
        self.draw_hero(f, layout[1], &palette);
        self.draw_stats(f, layout[2], &palette);
        self.draw_filters(f, layout[3], &palette);
        self.draw_tasks(f, layout[4], &palette);
        self.draw_footer(f, layout[5], &palette);

        match &self.mode {
            Mode::Creating(form) => self.draw_form(f, "Add New Task", form, &palette),
            Mode::Editing { form, .. } => self.draw_form(f, "Edit Task", form, &palette),
            Mode::ConfirmDelete { task_id } => {
                let title = self
                    .store
                    .get(task_id)
                    .map(|t| t.title.clone())
                    .unwrap_or_else(|| task_id.clone());
                let question = format!("Delete \"{}\"?", title);
                self.draw_confirm(f, "Confirm Delete", &question, &palette);
            }
            Mode::ConfirmClear { count } => self.draw_confirm(
                f,
                "Clear Completed",
                &format!("Delete all {} completed task(s)?", count),
                &palette,
            ),
            Mode::Normal | Mode::Searching { .. } => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let title = Line::from(vec![
            Span::styled(
                "triage ",
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(self.location.scope.label(), Style::default().fg(palette.done)),
            Span::raw("  •  "),
            Span::styled(
                format!("{}", self.location.path.display()),
                Style::default().fg(palette.muted),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("saved {}", format_elapsed(self.last_save)),
                Style::default().fg(palette.muted),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("{} theme", self.settings.theme),
                Style::default().fg(palette.accent),
            ),
        ]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(palette.muted));
        f.render_widget(
            Paragraph::new(title).alignment(Alignment::Center).block(block),
            area,
        );
    }

    fn draw_hero(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let quote = Line::from(Span::styled(
            format!("\"{}\"", self.quote),
            Style::default()
                .fg(palette.muted)
                .add_modifier(Modifier::ITALIC),
        ));
        let next = match NextTask::from_tasks(self.store.tasks(), &Local::now()) {
            Some(next) => Line::from(Span::styled(
                next.summary(),
                Style::default()
                    .fg(palette.due_status(next.status))
                    .add_modifier(Modifier::BOLD),
            )),
            None => Line::from(Span::styled(NO_UPCOMING, Style::default().fg(palette.muted))),
        };
        f.render_widget(
            Paragraph::new(vec![quote, next])
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            area,
        );
    }

    fn draw_stats(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let stats = Stats::from_tasks(self.store.tasks());
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        let gauges = [
            (
                format!("Completed {}", stats.completed),
                stats.completed_percent(),
                palette.done,
            ),
            (
                format!("Active {}", stats.active),
                stats.active_percent(),
                palette.accent,
            ),
        ];
        for (rect, (title, pct, color)) in halves.iter().zip(gauges) {
            let gauge = Gauge::default()
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(palette.muted))
                        .title(title),
                )
                .gauge_style(Style::default().fg(color).bg(palette.background))
                .ratio((pct / 100.0).clamp(0.0, 1.0))
                .label(format!("{:.0}%", pct));
            f.render_widget(gauge, *rect);
        }
    }

    fn draw_filters(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let label = Style::default().fg(palette.muted);
        let value = Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD);
        let search = match &self.mode {
            Mode::Searching { field, .. } => field.with_caret(),
            _ if self.filter.search.is_empty() => "any".to_string(),
            _ => self.filter.search.clone(),
        };
        let focus = if self.filter.focus {
            Span::styled(
                "today / overdue",
                Style::default()
                    .fg(palette.today)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled("off", value)
        };
        let line = Line::from(vec![
            Span::styled("Category ", label),
            Span::styled(self.filter.category.to_string(), value),
            Span::styled("   Priority ", label),
            Span::styled(self.filter.priority.to_string(), value),
            Span::styled("   Status ", label),
            Span::styled(self.filter.status.to_string(), value),
            Span::styled("   Search ", label),
            Span::styled(search, value),
            Span::styled("   Focus ", label),
            focus,
        ]);
        let hint = if self.filter.is_identity() {
            "showing everything"
        } else {
            "r to reset"
        };
        let title = Span::styled(hint, label);
        f.render_widget(
            Paragraph::new(line).block(
                Block::default()
                    .borders(Borders::BOTTOM)
                    .border_style(Style::default().fg(palette.muted))
                    .title(title)
                    .title_position(ratatui::widgets::block::Position::Bottom)
                    .title_alignment(Alignment::Right),
            ),
            area,
        );
    }

    fn draw_tasks(&mut self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let now = Local::now();
        let width = area.width.saturating_sub(6) as usize;
        let items: Vec<ListItem<'static>> = view::view(self.store.tasks(), &self.filter, &now)
            .into_iter()
            .map(|task| task_item(task, DueStatus::classify(task, &now), width, palette))
            .collect();
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.muted))
            .title(Span::styled(
                format!("Tasks ({} shown / {})", items.len(), self.store.len()),
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ));
        if items.is_empty() {
            let message = if self.store.is_empty() {
                "No tasks yet. Press n to add one."
            } else {
                "No tasks match these filters. Press r to reset."
            };
            let empty = Paragraph::new(message)
                .alignment(Alignment::Center)
                .style(Style::default().fg(palette.muted))
                .block(block);
            f.render_widget(empty, area);
            return;
        }
        self.list_state.select(Some(self.selected));
        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .bg(palette.selection)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");
        f.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);
        let help = Paragraph::new(self.help_line(palette))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(palette.muted)),
            );
        f.render_widget(help, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);
        f.render_widget(
            Paragraph::new(self.status.clone()).wrap(Wrap { trim: true }),
            bottom[0],
        );
        f.render_widget(
            Paragraph::new(format_stats(&Stats::from_tasks(self.store.tasks())))
                .alignment(Alignment::Right)
                .style(Style::default().fg(palette.muted)),
            bottom[1],
        );
    }

    fn help_line(&self, palette: &Palette) -> Line<'static> {
        let key = |k: &'static str, color: Color| Span::styled(k, Style::default().fg(color));
        let spans = match self.mode {
            Mode::Searching { .. } => vec![
                Span::raw("type to search  "),
                key("Enter", palette.accent),
                Span::raw(" keep  "),
                key("Esc", palette.overdue),
                Span::raw(" restore"),
            ],
            Mode::Creating(_) | Mode::Editing { .. } => vec![
                key("Tab/Shift-Tab", palette.accent),
                Span::raw(" field  "),
                key("←→", palette.accent),
                Span::raw(" priority  "),
                key("Enter", palette.done),
                Span::raw(" save  "),
                key("Esc", palette.overdue),
                Span::raw(" cancel"),
            ],
            Mode::ConfirmDelete { .. } | Mode::ConfirmClear { .. } => vec![
                key("y", palette.overdue),
                Span::raw(" confirm  "),
                key("n/Esc", palette.accent),
                Span::raw(" cancel"),
            ],
            Mode::Normal => vec![
                key("j/k", palette.accent),
                Span::raw(" move  "),
                key("space", palette.done),
                Span::raw(" done  "),
                key("n", palette.accent),
                Span::raw(" new  "),
                key("e", palette.today),
                Span::raw(" edit  "),
                key("d", palette.overdue),
                Span::raw(" delete  "),
                key("C", palette.overdue),
                Span::raw(" clear done  "),
                key("c/p/s", palette.accent),
                Span::raw(" filters  "),
                key("/", palette.accent),
                Span::raw(" search  "),
                key("f", palette.today),
                Span::raw(" focus  "),
                key("t", palette.accent),
                Span::raw(" theme  "),
                key("q", palette.overdue),
                Span::raw(" quit"),
            ],
        };
        Line::from(spans)
    }

    fn draw_form(
        &self,
        f: &mut ratatui::Frame<'_>,
        title: &str,
        form: &TaskForm,
        palette: &Palette,
    ) {
        let area = centered_rect(70, 60, f.size());
        let mut lines = vec![
            field_line("Title", &form.title, form.field == FormField::Title, palette),
            field_line(
                "Description",
                &form.description,
                form.field == FormField::Description,
                palette,
            ),
            field_line(
                "Category",
                &form.category,
                form.field == FormField::Category,
                palette,
            ),
            priority_line(form.priority, form.field == FormField::Priority, palette),
            field_line(
                "Due (YYYY-MM-DD)",
                &form.due,
                form.field == FormField::Due,
                palette,
            ),
            Line::from(""),
        ];
        lines.push(Line::from(Span::styled(
            "Enter to save • Esc to cancel • Tab/Shift-Tab to move",
            Style::default().fg(palette.muted),
        )));
        let dialog = Paragraph::new(lines)
            .style(Style::default().bg(palette.background).fg(palette.text))
            .block(
                Block::default()
                    .title(Span::styled(
                        title.to_string(),
                        Style::default()
                            .fg(palette.accent)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.accent)),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_confirm(
        &self,
        f: &mut ratatui::Frame<'_>,
        title: &str,
        question: &str,
        palette: &Palette,
    ) {
        let area = centered_rect(50, 30, f.size());
        let body = vec![
            Line::from(Span::styled(
                question.to_string(),
                Style::default()
                    .fg(palette.overdue)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body)
            .alignment(Alignment::Center)
            .style(Style::default().bg(palette.background).fg(palette.text))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(Span::styled(
                        title.to_string(),
                        Style::default()
                            .fg(palette.overdue)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.overdue)),
            );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

impl TaskForm {
    fn new(settings: &Settings) -> Self {
        TaskForm {
            title: FieldValue::new(""),
            description: FieldValue::new(""),
            category: FieldValue::new(&settings.default_category),
            priority: settings.default_priority,
            due: FieldValue::new(""),
            field: FormField::Title,
        }
    }

    fn from_task(task: &Task) -> Self {
        TaskForm {
            title: FieldValue::new(&task.title),
            description: FieldValue::new(&task.description),
            category: FieldValue::new(&task.category),
            priority: task.priority,
            due: FieldValue::new(
                &task
                    .due_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            ),
            field: FormField::Title,
        }
    }

    fn to_draft(&self, settings: &Settings) -> Result<TaskDraft, TaskError> {
        let category = match self.category.value.trim() {
            "" => settings.default_category.clone(),
            c => c.to_string(),
        };
        Ok(TaskDraft::new(self.title.value.clone())
            .with_description(self.description.value.clone())
            .with_category(category)
            .with_priority(self.priority)
            .with_due_date(parse_due(Some(&self.due.value))?))
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            FormField::Title => FormField::Description,
            FormField::Description => FormField::Category,
            FormField::Category => FormField::Priority,
            FormField::Priority => FormField::Due,
            FormField::Due => FormField::Title,
        };
    }

    fn prev_field(&mut self) {
        self.field = match self.field {
            FormField::Title => FormField::Due,
            FormField::Description => FormField::Title,
            FormField::Category => FormField::Description,
            FormField::Priority => FormField::Category,
            FormField::Due => FormField::Priority,
        };
    }

    fn active_text_mut(&mut self) -> Option<&mut FieldValue> {
        match self.field {
            FormField::Title => Some(&mut self.title),
            FormField::Description => Some(&mut self.description),
            FormField::Category => Some(&mut self.category),
            FormField::Priority => None,
            FormField::Due => Some(&mut self.due),
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn pick_quote<R: Rng>(rng: &mut R) -> &'static str {
    QUOTES.choose(rng).copied().unwrap_or(QUOTES[0])
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= 3 {
        return text.chars().take(max).collect();
    }
    let mut out: String = text.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

fn task_item(task: &Task, status: DueStatus, width: usize, palette: &Palette) -> ListItem<'static> {
    let mut title_style = Style::default().fg(palette.text).add_modifier(Modifier::BOLD);
    if task.completed {
        title_style = Style::default()
            .fg(palette.muted)
            .add_modifier(Modifier::CROSSED_OUT);
    }
    let check = if task.completed { "[x] " } else { "[ ] " };
    let mut spans = vec![
        Span::styled(check, Style::default().fg(palette.done)),
        Span::styled(
            truncate_text(&task.title, width.saturating_sub(40).max(12)),
            title_style,
        ),
        Span::raw("  "),
        Span::styled(task.category.clone(), Style::default().fg(palette.accent)),
        Span::raw(" · "),
        Span::styled(
            format!("{} priority", task.priority),
            Style::default().fg(palette.priority(task.priority)),
        ),
    ];
    if let Some(due) = task.due_date {
        let badge = match status {
            DueStatus::Overdue => "Overdue",
            DueStatus::Today => "Due Today",
            _ => "Due",
        };
        spans.push(Span::raw(" · "));
        spans.push(Span::styled(
            format!("{} · {}", badge, due.format("%Y-%m-%d")),
            Style::default().fg(palette.due_status(status)),
        ));
    }
    let mut lines = vec![Line::from(spans)];
    if !task.description.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("    {}", truncate_text(&task.description, width.saturating_sub(4))),
            Style::default().fg(palette.muted).add_modifier(Modifier::DIM),
        )));
    }
    ListItem::new(lines)
}

fn field_line(label: &str, field: &FieldValue, active: bool, palette: &Palette) -> Line<'static> {
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    Line::from(vec![
        Span::styled(
            format!("{}: ", label),
            Style::default().fg(palette.muted).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            text,
            Style::default().fg(if active { palette.accent } else { palette.text }),
        ),
    ])
}

fn priority_line(priority: Priority, active: bool, palette: &Palette) -> Line<'static> {
    let value = if active {
        format!("◀ {} ▶", priority)
    } else {
        priority.to_string()
    };
    Line::from(vec![
        Span::styled(
            "Priority: ",
            Style::default().fg(palette.muted).add_modifier(Modifier::BOLD),
        ),
        Span::styled(value, Style::default().fg(palette.priority(priority))),
    ])
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{load_tasks, TaskScope};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use ratatui::backend::TestBackend;
    use std::fs;
    use tempfile::TempDir;

    fn app_in(dir: &TempDir) -> App {
        let location = TaskLocation {
            path: dir.path().join("tasks.yml"),
            scope: TaskScope::Project,
        };
        App::new(TaskStore::default(), location, Settings::default(), QUOTES[0])
    }

    fn press(app: &mut App, code: KeyCode) {
        let quit = app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
        assert!(!quit);
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn add_task(app: &mut App, title: &str) {
        press(app, KeyCode::Char('n'));
        type_text(app, title);
        press(app, KeyCode::Enter);
    }

    fn rendered(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn form_creates_and_persists_a_task() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "Write report");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "quarterly");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "2099-01-10");
        press(&mut app, KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Normal));
        let saved = load_tasks(&app.location);
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].title, "Write report");
        assert_eq!(saved[0].description, "quarterly");
        assert_eq!(saved[0].category, "Personal");
        assert_eq!(saved[0].priority, Priority::High);
        assert_eq!(saved[0].due_date.map(|d| d.to_string()).as_deref(), Some("2099-01-10"));
    }

    #[test]
    fn blank_title_keeps_the_form_open() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "   ");
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Creating(_)));
        assert!(app.status.contains("title is required"));
        assert!(app.store.is_empty());
    }

    #[test]
    fn bad_due_date_keeps_the_form_open() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "t");
        for _ in 0..4 {
            press(&mut app, KeyCode::Tab);
        }
        type_text(&mut app, "soon");
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Creating(_)));
        assert!(app.status.contains("invalid due date"));
    }

    #[test]
    fn editing_keeps_completion() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        add_task(&mut app, "draft");
        press(&mut app, KeyCode::Char(' '));
        assert!(app.store.tasks()[0].completed);

        press(&mut app, KeyCode::Char('e'));
        type_text(&mut app, " v2");
        press(&mut app, KeyCode::Enter);

        let task = &app.store.tasks()[0];
        assert_eq!(task.title, "draft v2");
        assert!(task.completed);
        assert!(load_tasks(&app.location)[0].completed);
    }

    #[test]
    fn delete_asks_first() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        add_task(&mut app, "doomed");

        press(&mut app, KeyCode::Char('d'));
        assert!(matches!(app.mode, Mode::ConfirmDelete { .. }));
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.store.len(), 1);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.store.is_empty());
        assert!(load_tasks(&app.location).is_empty());
    }

    #[test]
    fn clear_completed_skips_the_prompt_when_nothing_is_done() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        add_task(&mut app, "open");
        press(&mut app, KeyCode::Char('C'));
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.store.len(), 1);

        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Char('C'));
        assert!(matches!(app.mode, Mode::ConfirmClear { count: 1 }));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.store.is_empty());
    }

    #[test]
    fn search_filters_live_and_escape_restores() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        add_task(&mut app, "Write report");
        add_task(&mut app, "Groceries");

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "REPORT");
        assert_eq!(app.visible().len(), 1);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.visible().len(), 2);
        assert!(app.filter.search.is_empty());

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "groc");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.filter.search, "groc");
        assert_eq!(app.current_task().map(|t| t.title.as_str()), Some("Groceries"));
    }

    #[test]
    fn filter_keys_cycle_through_choices() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        add_task(&mut app, "a");

        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.filter.category, Choice::Only("Personal".to_string()));
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.filter.category, Choice::Only("Work".to_string()));
        assert!(app.visible().is_empty());
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.filter.category, Choice::All);

        for expected in [
            Choice::Only(Priority::High),
            Choice::Only(Priority::Medium),
            Choice::Only(Priority::Low),
            Choice::All,
        ] {
            press(&mut app, KeyCode::Char('p'));
            assert_eq!(app.filter.priority, expected);
        }

        press(&mut app, KeyCode::Char('f'));
        assert!(app.filter.focus);
        assert!(app.visible().is_empty());
        let screen = rendered(&mut app);
        assert!(screen.contains("No tasks match these filters"));
        assert!(screen.contains("r to reset"));
        press(&mut app, KeyCode::Char('r'));
        assert!(app.filter.is_identity());
    }

    #[test]
    fn theme_toggle_is_saved() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        press(&mut app, KeyCode::Char('t'));
        assert_eq!(app.settings.theme, Theme::Dark);
        let saved = Settings::load(&app.location.settings_path());
        assert_eq!(saved.theme, Theme::Dark);
    }

    #[test]
    fn quit_key_ends_the_loop() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        let quit = app.handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(quit);
    }

    #[test]
    fn failed_save_keeps_the_tui_running() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let location = TaskLocation {
            path: blocker.join("tasks.yml"),
            scope: TaskScope::Project,
        };
        let mut app = App::new(
            TaskStore::default(),
            location,
            Settings::default(),
            QUOTES[0],
        );

        add_task(&mut app, "a");
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.store.len(), 1);
        assert!(app.status.starts_with("Could not save"), "{}", app.status);

        press(&mut app, KeyCode::Char('x'));
        assert!(app.store.tasks()[0].completed);
        assert!(app.status.starts_with("Could not save"));

        press(&mut app, KeyCode::Char('t'));
        assert_eq!(app.settings.theme, Theme::Dark);
        assert!(app.status.contains("not saved"));
    }

    #[test]
    fn renders_hero_stats_and_tasks() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        let screen = rendered(&mut app);
        assert!(screen.contains(NO_UPCOMING));
        assert!(screen.contains(QUOTES[0]));
        assert!(screen.contains("No tasks yet"));
        assert!(screen.contains("showing everything"));

        add_task(&mut app, "Ship it");
        press(&mut app, KeyCode::Char('x'));
        let screen = rendered(&mut app);
        assert!(screen.contains("[x] Ship it"));
        assert!(screen.contains("Completed 1"));
        assert!(screen.contains("100%"));
    }

    #[test]
    fn quotes_come_from_the_list() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            assert!(QUOTES.contains(&pick_quote(&mut rng)));
        }
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a longer title", 8), "a lon...");
        assert_eq!(truncate_text("abc", 2), "ab");
    }

    #[test]
    fn field_edits_respect_char_boundaries() {
        let mut field = FieldValue::new("héllo");
        field.move_left();
        field.move_left();
        field.move_left();
        field.move_left();
        field.backspace();
        assert_eq!(field.value, "éllo");
        field.insert_char('w');
        assert_eq!(field.value, "wéllo");
        field.move_right();
        assert_eq!(field.with_caret(), "wé▌llo");
    }
}
