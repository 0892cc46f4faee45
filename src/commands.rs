use crate::cli::GlobalArgs;
use crate::config::{self, Config, Overrides};
use crate::model::{MutationError, NewTask, Priority, Task};
use crate::navigation::NavigationState;
use crate::render::{DayAggregate, MonthView};
use crate::session::Session;
use crate::storage::{format_due, DUE_FORMAT};
use crate::ui;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{Datelike, Local, NaiveDate};

pub fn add(
    global: &GlobalArgs,
    title: String,
    category: String,
    due: Option<String>,
    priority: Option<String>,
    description: Option<String>,
) -> Result<()> {
    let mut session = open_session(global)?;
    let due = match due {
        Some(raw) => parse_date_arg(&raw)?,
        None => Local::now().date_naive(),
    };
    let priority = match priority {
        Some(raw) => Priority::from_label(&raw)
            .ok_or_else(|| anyhow!("unknown priority {:?} (use one of: {})", raw, priority_choices()))?,
        None => session.config.default_priority,
    };
    let mut new = NewTask::new(title, category, Some(due)).with_priority(priority);
    if let Some(d) = description {
        new = new.with_description(d);
    }
    match session.service.add(new) {
        Ok(id) => {
            println!("Added task {} due {}", id, due.format("%Y-%m-%d"));
            Ok(())
        }
        Err(MutationError::EmptyTitle) => bail!("task title must not be empty"),
        Err(err) => Err(err.into()),
    }
}

pub fn list(global: &GlobalArgs) -> Result<()> {
    let session = open_session(global)?;
    let index = session.service.index();
    let sidebar = index.sidebar();
    if sidebar.active.is_empty() && sidebar.inactive.is_empty() {
        println!("No tasks added yet.");
        return Ok(());
    }
    for (heading, groups) in [("Active", &sidebar.active), ("Inactive", &sidebar.inactive)] {
        println!("{}", heading);
        if groups.is_empty() {
            println!("  (none)");
        }
        for (category, tasks) in groups {
            println!("  {}", display_category(category));
            for task in tasks {
                print_task(task, "    ");
            }
        }
        println!();
    }
    let unscheduled = index.unscheduled();
    if !unscheduled.is_empty() {
        println!("Unscheduled ({} not shown on the calendar)", unscheduled.len());
        for task in unscheduled {
            print_task(task, "  ");
        }
    }
    Ok(())
}

pub fn calendar(global: &GlobalArgs, year: Option<i32>, month: Option<u32>) -> Result<()> {
    let mut session = open_session(global)?;
    let start = month_start(Local::now().date_naive(), year, month)?;
    session.nav = NavigationState::starting_at(start);
    let view = session.month_view()?;
    print_month(&session, &view, start);
    Ok(())
}

/// Missing parts of the requested month default to today's.
fn month_start(today: NaiveDate, year: Option<i32>, month: Option<u32>) -> Result<NaiveDate> {
    if year.is_none() && month.is_none() {
        return Ok(today);
    }
    NaiveDate::from_ymd_opt(year.unwrap_or(today.year()), month.unwrap_or(today.month()), 1)
        .ok_or_else(|| anyhow!("invalid year/month"))
}

pub fn day(global: &GlobalArgs, date: Option<String>) -> Result<()> {
    let session = open_session(global)?;
    let date = match date {
        Some(raw) => parse_date_arg(&raw)?,
        None => Local::now().date_naive(),
    };
    let tasks = session.service.day_detail(date);
    println!("{}", date.format("%A %Y-%m-%d"));
    if tasks.is_empty() {
        println!("  No tasks for this day.");
    }
    for task in tasks {
        print_task(task, "  ");
    }
    Ok(())
}

pub fn toggle(global: &GlobalArgs, id: u64) -> Result<()> {
    let mut session = open_session(global)?;
    match session.service.toggle(id)? {
        Some(done) => println!("{} {}", completion_word(done), describe(&session, id)),
        None => println!("No task {}", id),
    }
    Ok(())
}

pub fn complete(global: &GlobalArgs, id: u64, reopen: bool) -> Result<()> {
    let mut session = open_session(global)?;
    if session.service.set_completed(id, !reopen)? {
        println!("{} {}", completion_word(!reopen), describe(&session, id));
    } else {
        println!("No task {}", id);
    }
    Ok(())
}

fn completion_word(done: bool) -> &'static str {
    if done {
        "Completed"
    } else {
        "Reopened"
    }
}

fn describe(session: &Session, id: u64) -> String {
    match session.service.store().get(id) {
        Some(task) => format!("task {} ({})", id, task.title),
        None => format!("task {}", id),
    }
}

pub fn delete(global: &GlobalArgs, id: u64) -> Result<()> {
    let mut session = open_session(global)?;
    match session.service.delete(id)? {
        Some(task) => println!("Deleted task {} ({})", id, task.title),
        None => println!("No task {}", id),
    }
    Ok(())
}

pub fn tui(global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let credentials = global
        .name
        .clone()
        .map(|name| (name, global.passphrase.clone().unwrap_or_default()));
    ui::run(config, credentials)
}

fn load_config(global: &GlobalArgs) -> Result<Config> {
    config::load(&Overrides {
        config_path: global.config.clone(),
        week_start: global.week_start,
        data_dir: global.data_dir.clone(),
    })
}

fn open_session(global: &GlobalArgs) -> Result<Session> {
    let config = load_config(global)?;
    let name = global
        .name
        .as_deref()
        .context("a user name is required (--name or DUECAL_NAME)")?;
    Session::login(name, global.passphrase.as_deref().unwrap_or_default(), config)
}

pub fn parse_date_arg(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, DUE_FORMAT))
        .map_err(|_| anyhow!("invalid date (use YYYY-MM-DD): {}", trimmed))
}

fn priority_choices() -> String {
    Priority::ALL
        .iter()
        .map(|p| format!("{:?}", p.label()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn display_category(category: &str) -> &str {
    if category.is_empty() {
        "(uncategorized)"
    } else {
        category
    }
}

fn print_task(task: &Task, indent: &str) {
    let mark = if task.completed { "x" } else { " " };
    let due = task
        .due
        .as_ref()
        .map(format_due)
        .unwrap_or_else(|| "unscheduled".to_string());
    println!(
        "{}[{}] {}: {}  due {}  ({})",
        indent, mark, task.id, task.title, due, task.priority
    );
    if let Some(description) = &task.description {
        println!("{}    {}", indent, description);
    }
}

fn print_month(session: &Session, view: &MonthView, month_start: NaiveDate) {
    println!("{}", month_start.format("%B %Y"));
    let labels = session.config.week_start.weekday_labels();
    println!(
        "{}",
        labels
            .iter()
            .map(|l| format!("{:^5}", l))
            .collect::<String>()
    );
    for week in &view.weeks {
        let row: String = week
            .iter()
            .map(|cell| {
                if !cell.in_month {
                    return "  .  ".to_string();
                }
                let marker = match cell.aggregate() {
                    DayAggregate::Empty => ' ',
                    DayAggregate::Open => '*',
                    DayAggregate::AllDone => '+',
                };
                format!(" {:>2}{} ", cell.day_number, marker)
            })
            .collect();
        println!("{}", row);
    }
    println!();

    let today = Local::now().date_naive();
    if let Some(cell) = view.cell(today).filter(|c| c.in_month) {
        let open = cell.tasks.iter().filter(|t| !t.completed).count();
        println!("Today: {} task(s), {} open", cell.tasks.len(), open);
        println!();
    }

    let index = session.service.index();
    for cell in view.weeks.iter().flatten().filter(|c| !c.tasks.is_empty()) {
        let (done, total) = index.completion(cell.date);
        println!("{} ({}/{} done)", cell.date.format("%a %d"), done, total);
        for summary in &cell.tasks {
            let mark = if summary.completed { "x" } else { " " };
            println!(
                "  [{}] {}: {}  {} {}",
                mark,
                summary.id,
                summary.title,
                summary.priority,
                summary.style.swatch().hex()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_args_accept_both_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        assert_eq!(parse_date_arg("2025-11-01").unwrap(), expected);
        assert_eq!(parse_date_arg(" 11-01-2025 ").unwrap(), expected);
        assert!(parse_date_arg("next tuesday").is_err());
    }

    #[test]
    fn calendar_month_defaults_to_today() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let first = |y, m| NaiveDate::from_ymd_opt(y, m, 1).unwrap();
        assert_eq!(month_start(today, None, None).unwrap(), today);
        assert_eq!(month_start(today, Some(2030), None).unwrap(), first(2030, 10));
        assert_eq!(month_start(today, None, Some(3)).unwrap(), first(2026, 3));
        assert_eq!(month_start(today, Some(1999), Some(12)).unwrap(), first(1999, 12));
    }
}
