use crate::calendar::days_in_month;
use crate::commands::parse_date_arg;
use crate::config::Config;
use crate::index::CategoryStatus;
use crate::model::{MutationError, NewTask, Priority, Swatch, Task, TaskId};
use crate::navigation::MonthStep;
use crate::render::{Cell, DayAggregate, TaskStyle};
use crate::session::Session;
use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::collections::BTreeSet;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

pub fn run(config: Config, credentials: Option<(String, String)>) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(config, credentials);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    config: Config,
    session: Option<Session>,
    last_save: Option<Instant>,
    status: String,
    mode: Mode,
    focus: Focus,
    sidebar_idx: usize,
    expanded: BTreeSet<String>,
    day_idx: usize,
}

enum Mode {
    Login(LoginForm),
    Normal,
    Adding(TaskForm),
    PickDate(FieldValue),
    ConfirmDelete { id: TaskId, title: String },
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Focus {
    Sidebar,
    Calendar,
    Day,
}

/// Flattened sidebar line. Headings are not selectable.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SidebarRow {
    Heading(CategoryStatus),
    Category {
        name: String,
        done: usize,
        total: usize,
    },
    Task {
        id: TaskId,
        title: String,
        completed: bool,
        priority: Priority,
    },
}

struct LoginForm {
    name: FieldValue,
    passphrase: FieldValue,
    on_passphrase: bool,
}

struct TaskForm {
    title: FieldValue,
    category: FieldValue,
    due: FieldValue,
    priority: Priority,
    description: FieldValue,
    field: FormField,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum FormField {
    Title,
    Category,
    Due,
    Priority,
    Description,
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        self.cursor = prev_boundary(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        self.cursor = next_boundary(self.cursor, &self.value);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_boundary(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    /// Applies an editing key; anything else is ignored.
    fn edit(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
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

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }

    fn masked(&self, active: bool) -> String {
        let mut text = "•".repeat(self.value.chars().count());
        if active {
            let caret_at = self.value[..self.cursor].chars().count();
            let byte = text
                .char_indices()
                .nth(caret_at)
                .map(|(i, _)| i)
                .unwrap_or(text.len());
            text.insert_str(byte, "▌");
        }
        text
    }
}

impl App {
    fn new(config: Config, credentials: Option<(String, String)>) -> Self {
        let mut app = App {
            config,
            session: None,
            last_save: None,
            status: "Log in with a name and passphrase".into(),
            mode: Mode::Login(LoginForm::new()),
            focus: Focus::Calendar,
            sidebar_idx: 0,
            expanded: BTreeSet::new(),
            day_idx: 0,
        };
        if let Some((name, passphrase)) = credentials {
            app.login(&name, &passphrase);
        }
        app
    }

    fn login(&mut self, name: &str, passphrase: &str) -> bool {
        match Session::login(name, passphrase, self.config.clone()) {
            Ok(session) => {
                self.status = format!(
                    "Logged in as {} ({} tasks)",
                    name.trim(),
                    session.service.tasks().len()
                );
                self.session = Some(session);
                self.mode = Mode::Normal;
                self.ensure_bounds();
                true
            }
            Err(err) => {
                self.status = format!("Login failed: {:#}", err);
                false
            }
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
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

    /// Returns true when the app should exit. Handlers put back the mode
    /// they want to stay in; anything else falls back to `Normal`.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let quit = match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Login(form) => self.handle_login_key(form, key),
            Mode::Normal => self.handle_normal_key(key),
            Mode::Adding(form) => {
                self.handle_form_key(form, key);
                false
            }
            Mode::PickDate(field) => {
                self.handle_pick_key(field, key);
                false
            }
            Mode::ConfirmDelete { id, title } => {
                self.handle_confirm_key(id, title, key);
                false
            }
        };
        self.ensure_bounds();
        quit
    }

    fn handle_login_key(&mut self, mut form: LoginForm, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => return true,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                form.on_passphrase = !form.on_passphrase;
            }
            KeyCode::Enter if !form.on_passphrase => form.on_passphrase = true,
            KeyCode::Enter => {
                let name = form.name.value.clone();
                let passphrase = form.passphrase.value.clone();
                if self.login(&name, &passphrase) {
                    return false;
                }
            }
            _ => {
                form.active_mut().edit(&key);
            }
        }
        self.mode = Mode::Login(form);
        false
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::Char('[') | KeyCode::PageUp => self.advance_month(MonthStep::Previous),
            KeyCode::Char(']') | KeyCode::PageDown => self.advance_month(MonthStep::Next),
            KeyCode::Char('n') => {
                let due = self.selected_date().unwrap_or_else(|| Local::now().date_naive());
                self.mode = Mode::Adding(TaskForm::new(due, self.config.default_priority));
                self.status = "New task (Tab moves, Enter saves, Esc cancels)".into();
            }
            KeyCode::Char('g') => {
                let current = self.selected_date().unwrap_or_else(|| Local::now().date_naive());
                self.mode = Mode::PickDate(FieldValue::new(&current.format("%Y-%m-%d").to_string()));
                self.status = "Go to date (YYYY-MM-DD, Enter to select)".into();
            }
            KeyCode::Char('t') => {
                if let Some(session) = self.session.as_mut() {
                    session.nav.jump_to_date(Local::now().date_naive());
                    session.nav.show_selected_month();
                }
                self.day_idx = 0;
            }
            KeyCode::Char('v') => {
                if let Some(session) = self.session.as_mut() {
                    session.nav.show_selected_month();
                }
            }
            _ => match self.focus {
                Focus::Sidebar => self.handle_sidebar_key(key),
                Focus::Calendar => self.handle_calendar_key(key),
                Focus::Day => self.handle_day_key(key),
            },
        }
        false
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) {
        let rows = self.sidebar_rows();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.sidebar_idx = step_selectable(&rows, self.sidebar_idx, -1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.sidebar_idx = step_selectable(&rows, self.sidebar_idx, 1);
            }
            KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('x') => {
                match rows.get(self.sidebar_idx) {
                    Some(SidebarRow::Category { name, .. }) => {
                        if !self.expanded.remove(name) {
                            self.expanded.insert(name.clone());
                        }
                    }
                    Some(SidebarRow::Task { id, .. }) => self.toggle_task(*id),
                    _ => {}
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(SidebarRow::Task { id, title, .. }) = rows.get(self.sidebar_idx) {
                    self.confirm_delete(*id, title.clone());
                }
            }
            _ => {}
        }
    }

    fn handle_calendar_key(&mut self, key: KeyEvent) {
        let shift = match key.code {
            KeyCode::Left | KeyCode::Char('h') => -1,
            KeyCode::Right | KeyCode::Char('l') => 1,
            KeyCode::Up | KeyCode::Char('k') => -7,
            KeyCode::Down | KeyCode::Char('j') => 7,
            KeyCode::Enter => {
                self.focus = Focus::Day;
                return;
            }
            KeyCode::Home | KeyCode::End => {
                if let Some(session) = self.session.as_mut() {
                    let (year, month) = (session.nav.display_year(), session.nav.display_month());
                    let day = if key.code == KeyCode::Home {
                        1
                    } else {
                        days_in_month(year, month).unwrap_or(28)
                    };
                    session.nav.select_day_in_view(day);
                }
                self.day_idx = 0;
                return;
            }
            _ => return,
        };
        if let Some(session) = self.session.as_mut() {
            session.nav.shift_selected(shift);
            let selected = session.nav.selected();
            if selected.year() != session.nav.display_year()
                || selected.month() != session.nav.display_month()
            {
                session.nav.show_selected_month();
            }
        }
        self.day_idx = 0;
    }

    fn handle_day_key(&mut self, key: KeyEvent) {
        let tasks: Vec<(TaskId, String)> = self
            .day_tasks()
            .iter()
            .map(|t| (t.id, t.title.clone()))
            .collect();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.day_idx = self.day_idx.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.day_idx += 1,
            KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('x') => {
                if let Some((id, _)) = tasks.get(self.day_idx) {
                    self.toggle_task(*id);
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some((id, title)) = tasks.get(self.day_idx) {
                    self.confirm_delete(*id, title.clone());
                }
            }
            _ => {}
        }
    }

    fn handle_form_key(&mut self, mut form: TaskForm, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.status = "Canceled".into();
                return;
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.prev_field(),
            KeyCode::Enter => match form.to_new_task() {
                Ok(new) => {
                    if self.add_task(new) {
                        return;
                    }
                }
                Err(msg) => self.status = msg,
            },
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')
                if form.field == FormField::Priority =>
            {
                form.priority = if key.code == KeyCode::Left {
                    form.priority.next().next()
                } else {
                    form.priority.next()
                };
            }
            _ => {
                if let Some(field) = form.active_text_mut() {
                    field.edit(&key);
                }
            }
        }
        self.mode = Mode::Adding(form);
    }

    fn handle_pick_key(&mut self, mut field: FieldValue, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.status = "Canceled".into(),
            KeyCode::Enter => match parse_date_arg(&field.value) {
                Ok(date) => {
                    if let Some(session) = self.session.as_mut() {
                        session.nav.jump_to_date(date);
                    }
                    self.day_idx = 0;
                    self.focus = Focus::Day;
                    self.status = format!(
                        "Showing {} (press v to move the calendar there)",
                        date.format("%Y-%m-%d")
                    );
                }
                Err(err) => {
                    self.status = err.to_string();
                    self.mode = Mode::PickDate(field);
                }
            },
            _ => {
                field.edit(&key);
                self.mode = Mode::PickDate(field);
            }
        }
    }

    fn handle_confirm_key(&mut self, id: TaskId, title: String, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => self.delete_task(id, &title),
            KeyCode::Char('n') | KeyCode::Esc => self.status = "Delete canceled".into(),
            _ => self.mode = Mode::ConfirmDelete { id, title },
        }
    }

    fn confirm_delete(&mut self, id: TaskId, title: String) {
        self.status = format!("Delete {:?}? (y to confirm, n/Esc to cancel)", title);
        self.mode = Mode::ConfirmDelete { id, title };
    }

    fn advance_month(&mut self, step: MonthStep) {
        if let Some(session) = self.session.as_mut() {
            session.nav.advance_month(step);
        }
    }

    fn add_task(&mut self, new: NewTask) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let title = new.title.trim().to_string();
        let result = session.service.add(new);
        match result {
            Ok(_) => {
                self.saved(format!("Added {:?}", title));
                true
            }
            Err(MutationError::EmptyTitle) => {
                self.status = "Task title is required".into();
                false
            }
            Err(err) => {
                self.status = err.to_string();
                true
            }
        }
    }

    fn toggle_task(&mut self, id: TaskId) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.service.toggle(id) {
            Ok(Some(true)) => self.saved("Marked complete".to_string()),
            Ok(Some(false)) => self.saved("Marked incomplete".to_string()),
            Ok(None) => {}
            Err(err) => self.status = err.to_string(),
        }
    }

    fn delete_task(&mut self, id: TaskId, title: &str) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.service.delete(id) {
            Ok(Some(_)) => self.saved(format!("Deleted {:?}", title)),
            Ok(None) => {}
            Err(err) => self.status = err.to_string(),
        }
    }

    fn saved(&mut self, message: String) {
        self.last_save = Some(Instant::now());
        self.status = message;
    }

    fn selected_date(&self) -> Option<NaiveDate> {
        self.session.as_ref().map(|s| s.nav.selected())
    }

    fn day_tasks(&self) -> Vec<&Task> {
        match &self.session {
            Some(session) => session.service.day_detail(session.nav.selected()),
            None => Vec::new(),
        }
    }

    fn sidebar_rows(&self) -> Vec<SidebarRow> {
        let Some(session) = &self.session else {
            return Vec::new();
        };
        let sidebar = session.service.index().sidebar();
        let mut rows = Vec::new();
        for (status, groups) in [
            (CategoryStatus::Active, sidebar.active),
            (CategoryStatus::Inactive, sidebar.inactive),
        ] {
            rows.push(SidebarRow::Heading(status));
            for (name, tasks) in groups {
                rows.push(SidebarRow::Category {
                    name: name.to_string(),
                    done: tasks.iter().filter(|t| t.completed).count(),
                    total: tasks.len(),
                });
                if self.expanded.contains(name) {
                    rows.extend(tasks.iter().map(|t| SidebarRow::Task {
                        id: t.id,
                        title: t.title.clone(),
                        completed: t.completed,
                        priority: t.priority,
                    }));
                }
            }
        }
        rows
    }

    fn ensure_bounds(&mut self) {
        let rows = self.sidebar_rows();
        if rows.get(self.sidebar_idx).map_or(true, |r| matches!(r, SidebarRow::Heading(_))) {
            let back = step_selectable(&rows, self.sidebar_idx.min(rows.len()), -1);
            self.sidebar_idx = if rows.get(back).map_or(false, |r| !matches!(r, SidebarRow::Heading(_))) {
                back
            } else {
                step_selectable(&rows, 0, 1)
            };
        }
        let day_len = self.day_tasks().len();
        self.day_idx = self.day_idx.min(day_len.saturating_sub(1));
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        if self.session.is_some() {
            let body = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Percentage(24),
                    Constraint::Percentage(52),
                    Constraint::Percentage(24),
                ])
                .split(layout[1]);
            self.draw_sidebar(f, body[0]);
            self.draw_calendar(f, body[1]);
            self.draw_day(f, body[2]);
        }
        self.draw_footer(f, layout[2]);

        match &self.mode {
            Mode::Login(form) => self.draw_login(f, form),
            Mode::Adding(form) => self.draw_form(f, form),
            Mode::PickDate(field) => self.draw_pick(f, field),
            Mode::ConfirmDelete { title, .. } => self.draw_confirm(f, title),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let mut spans = vec![Span::styled(
            "duecal ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )];
        if let Some(session) = &self.session {
            spans.extend([
                Span::styled(session.key.clone(), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw("  •  "),
                Span::styled(
                    format!("{}", session.service.store().path().display()),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw("  •  "),
                Span::styled(
                    match self.last_save {
                        Some(at) => format!("saved {}", format_elapsed(at)),
                        None => "no changes".to_string(),
                    },
                    Style::default().fg(Color::Gray),
                ),
            ]);
        }
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_sidebar(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let focused = self.focus == Focus::Sidebar;
        let rows = self.sidebar_rows();
        let width = area.width.saturating_sub(8) as usize;
        let items: Vec<ListItem> = if rows.iter().all(|r| matches!(r, SidebarRow::Heading(_))) {
            vec![ListItem::new("No tasks added yet.")]
        } else {
            rows.iter().map(|row| self.sidebar_item(row, width)).collect()
        };
        let mut state = ListState::default();
        if focused && !rows.is_empty() {
            state.select(Some(self.sidebar_idx));
        }
        let list = List::new(items)
            .block(pane_block("Categories", focused))
            .highlight_style(
                Style::default()
                    .bg(Color::LightCyan)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            );
        f.render_stateful_widget(list, area, &mut state);
    }

    fn sidebar_item(&self, row: &SidebarRow, width: usize) -> ListItem<'static> {
        match row {
            SidebarRow::Heading(status) => ListItem::new(Line::from(Span::styled(
                match status {
                    CategoryStatus::Active => "Active",
                    CategoryStatus::Inactive => "Inactive",
                },
                Style::default()
                    .fg(Color::Rgb(0xb1, 0x5e, 0x6c))
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            ))),
            SidebarRow::Category { name, done, total } => {
                let arrow = if self.expanded.contains(name) { "▾" } else { "▸" };
                let label = if name.is_empty() { "(uncategorized)" } else { name };
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{} ", arrow)),
                    Span::styled(
                        truncate_text(label, width.saturating_sub(6)),
                        Style::default().fg(Color::White),
                    ),
                    Span::styled(format!(" {}/{}", done, total), Style::default().fg(Color::DarkGray)),
                ]))
            }
            SidebarRow::Task {
                title,
                completed,
                priority,
                ..
            } => ListItem::new(Line::from(vec![
                Span::raw(if *completed { "   [x] " } else { "   [ ] " }),
                Span::styled(
                    truncate_text(title, width.saturating_sub(7)),
                    task_style(*completed, priority.swatch()),
                ),
            ])),
        }
    }

    fn draw_calendar(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let Some(session) = &self.session else {
            return;
        };
        let focused = self.focus == Focus::Calendar;
        let title = NaiveDate::from_ymd_opt(session.nav.display_year(), session.nav.display_month(), 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_default();
        let block = pane_block(&format!("◂ {} ▸", title), focused);
        let inner = block.inner(area);
        f.render_widget(block, area);

        let view = match session.month_view() {
            Ok(view) => view,
            Err(err) => {
                f.render_widget(Paragraph::new(err.to_string()), inner);
                return;
            }
        };
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                std::iter::once(Constraint::Length(1))
                    .chain(view.weeks.iter().map(|_| Constraint::Ratio(1, view.weeks.len() as u32)))
                    .collect::<Vec<_>>(),
            )
            .split(inner);

        let columns = [Constraint::Ratio(1, 7); 7];
        let header_cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(columns)
            .split(rows[0]);
        for (label, cell_area) in session.config.week_start.weekday_labels().iter().zip(header_cells.iter()) {
            f.render_widget(
                Paragraph::new(*label)
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(Color::Gray)),
                *cell_area,
            );
        }

        let today = Local::now().date_naive();
        let selected = session.nav.selected();
        for (week, row_area) in view.weeks.iter().zip(rows.iter().skip(1)) {
            let cell_areas = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(columns)
                .split(*row_area);
            for (cell, cell_area) in week.iter().zip(cell_areas.iter()) {
                self.draw_cell(f, *cell_area, cell, cell.date == selected, cell.date == today);
            }
        }
    }

    fn draw_cell(&self, f: &mut ratatui::Frame<'_>, area: Rect, cell: &Cell, selected: bool, today: bool) {
        let width = area.width.saturating_sub(2) as usize;
        let border = if selected {
            Style::default().fg(if self.focus == Focus::Calendar {
                Color::Cyan
            } else {
                Color::Blue
            })
        } else {
            Style::default().fg(Color::Rgb(40, 44, 52))
        };
        let mut day_style = if cell.in_month {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM)
        };
        if today {
            day_style = day_style.fg(Color::LightYellow).add_modifier(Modifier::BOLD);
        }
        if cell.aggregate() == DayAggregate::AllDone {
            day_style = day_style.add_modifier(Modifier::DIM);
        }
        let mut lines = vec![Line::from(Span::styled(format!("{:>2}", cell.day_number), day_style))];
        let room = area.height.saturating_sub(3) as usize;
        for (i, summary) in cell.tasks.iter().enumerate() {
            if i + 1 == room && cell.tasks.len() > room {
                lines.push(Line::from(Span::styled(
                    format!("+{} more", cell.tasks.len() - i),
                    Style::default().fg(Color::Gray),
                )));
                break;
            }
            lines.push(Line::from(Span::styled(
                truncate_text(&summary.title, width),
                task_style(summary.completed, summary.style.swatch()),
            )));
        }
        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border),
        );
        f.render_widget(paragraph, area);
    }

    fn draw_day(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let Some(session) = &self.session else {
            return;
        };
        let focused = self.focus == Focus::Day;
        let date = session.nav.selected();
        let tasks = self.day_tasks();
        let width = area.width.saturating_sub(8) as usize;
        let items: Vec<ListItem> = if tasks.is_empty() {
            vec![ListItem::new("No tasks for this day.")]
        } else {
            tasks.iter().map(|t| day_item(t, width)).collect()
        };
        let mut state = ListState::default();
        if focused && !tasks.is_empty() {
            state.select(Some(self.day_idx));
        }
        let mut title = date.format("%a %Y-%m-%d").to_string();
        if date.year() != session.nav.display_year() || date.month() != session.nav.display_month() {
            title.push_str(" (other month)");
        }
        let list = List::new(items).block(pane_block(&title, focused)).highlight_style(
            Style::default()
                .bg(Color::LightCyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);
        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);
        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, rows[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let key = |k: &'static str, color: Color| Span::styled(k, Style::default().fg(color));
        if self.session.is_none() {
            return Line::from(vec![
                key("Tab", Color::LightCyan),
                Span::raw(" switch field  "),
                key("Enter", Color::LightGreen),
                Span::raw(" log in  "),
                key("Esc", Color::LightRed),
                Span::raw(" quit"),
            ]);
        }
        let mut spans = vec![
            key("Tab", Color::LightCyan),
            Span::raw(" focus  "),
            key("[ ]", Color::LightCyan),
            Span::raw(" month  "),
            key("g", Color::LightYellow),
            Span::raw(" go to date  "),
            key("t", Color::LightYellow),
            Span::raw(" today  "),
            key("n", Color::LightMagenta),
            Span::raw(" new  "),
        ];
        match self.focus {
            Focus::Calendar => spans.extend([
                key("←↑↓→", Color::LightCyan),
                Span::raw(" day  "),
                key("Home/End", Color::LightCyan),
                Span::raw(" first/last  "),
                key("Enter", Color::LightGreen),
                Span::raw(" tasks  "),
            ]),
            Focus::Sidebar | Focus::Day => spans.extend([
                key("Space", Color::LightGreen),
                Span::raw(" toggle/expand  "),
                key("d", Color::LightRed),
                Span::raw(" delete  "),
            ]),
        }
        spans.extend([key("q", Color::LightRed), Span::raw(" quit")]);
        Line::from(spans)
    }

    fn draw_login(&self, f: &mut ratatui::Frame<'_>, form: &LoginForm) {
        let area = centered_rect(50, 30, f.size());
        let mut lines = Vec::new();
        lines.push(field_line("Name", &form.name.value_for(!form.on_passphrase), !form.on_passphrase));
        lines.push(field_line("Passphrase", &form.passphrase.masked(form.on_passphrase), form.on_passphrase));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "The passphrase only selects your task file; it is not a password.",
            Style::default().fg(Color::Gray),
        )));
        let dialog = Paragraph::new(lines)
            .block(dialog_block("Log in", Color::Cyan))
            .wrap(Wrap { trim: true });
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_form(&self, f: &mut ratatui::Frame<'_>, form: &TaskForm) {
        let area = centered_rect(60, 50, f.size());
        let fields = [
            ("Title", FormField::Title, &form.title),
            ("Category", FormField::Category, &form.category),
            ("Due (YYYY-MM-DD)", FormField::Due, &form.due),
        ];
        let mut lines: Vec<Line> = fields
            .iter()
            .map(|(label, field, value)| {
                let active = form.field == *field;
                field_line(label, &value.value_for(active), active)
            })
            .collect();
        let priority_active = form.field == FormField::Priority;
        lines.push(Line::from(vec![
            Span::styled(
                "Priority: ",
                Style::default()
                    .fg(Color::Gray)
                    .add_modifier(Modifier::BOLD | Modifier::DIM),
            ),
            Span::styled(
                if priority_active {
                    format!("◂ {} ▸", form.priority)
                } else {
                    form.priority.to_string()
                },
                Style::default().fg(swatch_color(form.priority.swatch())),
            ),
        ]));
        let active = form.field == FormField::Description;
        lines.push(field_line("Description", &form.description.value_for(active), active));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Enter to save • Esc to cancel • Tab/Shift-Tab to move • ←/→ change priority",
            Style::default().fg(Color::Gray),
        )));
        let dialog = Paragraph::new(lines)
            .block(dialog_block("New Task", Color::Cyan))
            .wrap(Wrap { trim: true });
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_pick(&self, f: &mut ratatui::Frame<'_>, field: &FieldValue) {
        let area = centered_rect(40, 20, f.size());
        let dialog = Paragraph::new(vec![field_line("Date", &field.with_caret(), true)])
            .block(dialog_block("Go to date", Color::Yellow));
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, title: &str) {
        let area = centered_rect(50, 30, f.size());
        let body = vec![
            Line::from(Span::styled(
                format!("Delete \"{}\"?", title),
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body)
            .alignment(Alignment::Center)
            .block(dialog_block("Confirm delete", Color::LightRed));
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

impl Focus {
    fn next(&self) -> Self {
        match self {
            Focus::Sidebar => Focus::Calendar,
            Focus::Calendar => Focus::Day,
            Focus::Day => Focus::Sidebar,
        }
    }

    fn prev(&self) -> Self {
        match self {
            Focus::Sidebar => Focus::Day,
            Focus::Calendar => Focus::Sidebar,
            Focus::Day => Focus::Calendar,
        }
    }
}

impl LoginForm {
    fn new() -> Self {
        LoginForm {
            name: FieldValue::new(""),
            passphrase: FieldValue::new(""),
            on_passphrase: false,
        }
    }

    fn active_mut(&mut self) -> &mut FieldValue {
        if self.on_passphrase {
            &mut self.passphrase
        } else {
            &mut self.name
        }
    }
}

impl TaskForm {
    fn new(due: NaiveDate, priority: Priority) -> Self {
        TaskForm {
            title: FieldValue::new(""),
            category: FieldValue::new(""),
            due: FieldValue::new(&due.format("%Y-%m-%d").to_string()),
            priority,
            description: FieldValue::new(""),
            field: FormField::Title,
        }
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            FormField::Title => FormField::Category,
            FormField::Category => FormField::Due,
            FormField::Due => FormField::Priority,
            FormField::Priority => FormField::Description,
            FormField::Description => FormField::Title,
        };
    }

    fn prev_field(&mut self) {
        self.field = match self.field {
            FormField::Title => FormField::Description,
            FormField::Category => FormField::Title,
            FormField::Due => FormField::Category,
            FormField::Priority => FormField::Due,
            FormField::Description => FormField::Priority,
        };
    }

    fn active_text_mut(&mut self) -> Option<&mut FieldValue> {
        match self.field {
            FormField::Title => Some(&mut self.title),
            FormField::Category => Some(&mut self.category),
            FormField::Due => Some(&mut self.due),
            FormField::Priority => None,
            FormField::Description => Some(&mut self.description),
        }
    }

    /// Title emptiness is left to the service; only the date is checked here.
    fn to_new_task(&self) -> std::result::Result<NewTask, String> {
        let due = if self.due.value.trim().is_empty() {
            None
        } else {
            Some(parse_date_arg(&self.due.value).map_err(|err| err.to_string())?)
        };
        let mut new = NewTask::new(self.title.value.clone(), self.category.value.clone(), due)
            .with_priority(self.priority);
        if !self.description.value.trim().is_empty() {
            new = new.with_description(self.description.value.clone());
        }
        Ok(new)
    }
}

impl FieldValue {
    fn value_for(&self, active: bool) -> String {
        if active {
            self.with_caret()
        } else {
            self.value.clone()
        }
    }
}

/// Index of the next non-heading row from `from` in direction `dir`, or
/// `from` itself when there is none.
fn step_selectable(rows: &[SidebarRow], from: usize, dir: isize) -> usize {
    let mut idx = from as isize;
    loop {
        idx += dir;
        if idx < 0 || idx as usize >= rows.len() {
            return from;
        }
        if !matches!(rows[idx as usize], SidebarRow::Heading(_)) {
            return idx as usize;
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
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
        .split(popup_layout[1])[1]
}

fn pane_block(title: &str, focused: bool) -> Block<'static> {
    let color = if focused { Color::Cyan } else { Color::DarkGray };
    Block::default()
        .title(Span::styled(
            title.to_string(),
            Style::default()
                .fg(if focused { Color::Cyan } else { Color::Gray })
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

fn dialog_block(title: &str, color: Color) -> Block<'static> {
    Block::default()
        .title(Span::styled(
            title.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

fn swatch_color(swatch: Swatch) -> Color {
    Color::Rgb(swatch.r, swatch.g, swatch.b)
}

fn task_style(completed: bool, swatch: Swatch) -> Style {
    let style = Style::default().fg(swatch_color(swatch));
    if completed {
        style.add_modifier(Modifier::CROSSED_OUT | Modifier::DIM)
    } else {
        style
    }
}

fn day_item(task: &Task, width: usize) -> ListItem<'static> {
    let mut lines = vec![Line::from(vec![
        Span::raw(if task.completed { "[x] " } else { "[ ] " }),
        Span::styled(
            truncate_text(&task.title, width.saturating_sub(4)),
            task_style(task.completed, TaskStyle::for_task(task).swatch()),
        ),
    ])];
    let category = if task.category.is_empty() {
        "(uncategorized)"
    } else {
        task.category.as_str()
    };
    lines.push(Line::from(Span::styled(
        format!("    {} • {}", category, task.priority),
        Style::default().fg(Color::DarkGray),
    )));
    if let Some(description) = &task.description {
        lines.push(Line::from(Span::styled(
            format!("    {}", truncate_text(description, width.saturating_sub(4))),
            Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
        )));
    }
    ListItem::new(lines)
}

fn field_line(label: &str, text: &str, active: bool) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{}: ", label),
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::BOLD | Modifier::DIM),
        ),
        Span::styled(
            text.to_string(),
            Style::default().fg(if active { Color::Cyan } else { Color::White }),
        ),
    ])
}

fn prev_boundary(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_boundary(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
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
