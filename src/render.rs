use crate::calendar::{self, CalendarError, Week, WeekStart};
use crate::index::TaskIndex;
use crate::model::{Priority, Swatch, Task, TaskId, COMPLETED_SWATCH};
use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStyle {
    Priority(Priority),
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    pub id: TaskId,
    pub title: String,
    pub priority: Priority,
    pub completed: bool,
    pub style: TaskStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayAggregate {
    Empty,
    Open,
    AllDone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub date: NaiveDate,
    pub in_month: bool,
    pub day_number: u32,
    pub tasks: Vec<TaskSummary>,
}

#[derive(Debug, Clone)]
pub struct MonthView {
    pub weeks: Vec<[Cell; 7]>,
}

impl TaskStyle {
    pub fn for_task(task: &Task) -> Self {
        if task.completed {
            TaskStyle::Completed
        } else {
            TaskStyle::Priority(task.priority)
        }
    }

    pub fn swatch(&self) -> Swatch {
        match self {
            TaskStyle::Priority(p) => p.swatch(),
            TaskStyle::Completed => COMPLETED_SWATCH,
        }
    }
}

impl From<&Task> for TaskSummary {
    fn from(task: &Task) -> Self {
        TaskSummary {
            id: task.id,
            title: task.title.clone(),
            priority: task.priority,
            completed: task.completed,
            style: TaskStyle::for_task(task),
        }
    }
}

impl Cell {
    pub fn aggregate(&self) -> DayAggregate {
        if self.tasks.is_empty() {
            DayAggregate::Empty
        } else if self.tasks.iter().all(|t| t.completed) {
            DayAggregate::AllDone
        } else {
            DayAggregate::Open
        }
    }
}

impl MonthView {
    pub fn cell(&self, date: NaiveDate) -> Option<&Cell> {
        self.weeks.iter().flatten().find(|c| c.date == date)
    }
}

/// Out-of-month padding days never carry tasks, even when some are due then.
pub fn render(weeks: &[Week], index: &TaskIndex<'_>) -> MonthView {
    let weeks = weeks
        .iter()
        .map(|week| {
            week.map(|day| Cell {
                date: day.date,
                in_month: day.in_month,
                day_number: day.date.day(),
                tasks: if day.in_month {
                    index.by_date(day.date).into_iter().map(TaskSummary::from).collect()
                } else {
                    Vec::new()
                },
            })
        })
        .collect();
    MonthView { weeks }
}

pub fn render_month(
    year: i32,
    month: u32,
    week_start: WeekStart,
    tasks: &[Task],
) -> Result<MonthView, CalendarError> {
    let weeks = calendar::grid(year, month, week_start)?;
    Ok(render(&weeks, &TaskIndex::new(tasks)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewTask;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Vec<Task> {
        vec![
            Task::from_new(1, NewTask::new("Pay rent", "Bills", Some(date(2025, 11, 1))).with_priority(Priority::Long)),
            Task::from_new(2, NewTask::new("Call bank", "Bills", Some(date(2025, 11, 1))).with_priority(Priority::Short)),
            Task::from_new(3, NewTask::new("Halloween", "Fun", Some(date(2025, 10, 31)))),
            Task::from_new(4, NewTask::new("Someday", "Fun", None)),
        ]
    }

    #[test]
    fn tasks_land_on_their_day_in_order() {
        let view = render_month(2025, 11, WeekStart::Monday, &sample()).unwrap();
        let cell = view.cell(date(2025, 11, 1)).unwrap();
        assert!(cell.in_month);
        assert_eq!(cell.day_number, 1);
        let titles: Vec<_> = cell.tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Pay rent", "Call bank"]);
        assert_eq!(cell.tasks[0].style, TaskStyle::Priority(Priority::Long));
        assert_eq!(cell.aggregate(), DayAggregate::Open);
    }

    #[test]
    fn overflow_days_carry_no_tasks() {
        let view = render_month(2025, 11, WeekStart::Monday, &sample()).unwrap();
        let halloween = view.cell(date(2025, 10, 31)).unwrap();
        assert!(!halloween.in_month);
        assert!(halloween.tasks.is_empty());
        assert_eq!(halloween.aggregate(), DayAggregate::Empty);

        let october = render_month(2025, 10, WeekStart::Monday, &sample()).unwrap();
        assert_eq!(october.cell(date(2025, 10, 31)).unwrap().tasks.len(), 1);
    }

    #[test]
    fn completed_style_overrides_priority() {
        let mut tasks = sample();
        tasks[0].completed = true;
        let view = render_month(2025, 11, WeekStart::Sunday, &tasks).unwrap();
        let cell = view.cell(date(2025, 11, 1)).unwrap();
        assert_eq!(cell.tasks[0].style, TaskStyle::Completed);
        assert_eq!(cell.tasks[0].style.swatch(), COMPLETED_SWATCH);
        assert_eq!(cell.tasks[1].style.swatch(), Priority::Short.swatch());

        tasks[1].completed = true;
        let view = render_month(2025, 11, WeekStart::Sunday, &tasks).unwrap();
        assert_eq!(view.cell(date(2025, 11, 1)).unwrap().aggregate(), DayAggregate::AllDone);
    }
}
