//! Derived groupings over the current task list.
//!
//! Nothing here is cached: every query walks the slice, which is cheap at the
//! sizes a personal task list reaches.

use crate::model::Task;
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryStatus {
    Active,
    Inactive,
}

/// Sidebar groups: categories with open work, and categories that are fully done.
#[derive(Debug, Default)]
pub struct Sidebar<'a> {
    pub active: Vec<(&'a str, Vec<&'a Task>)>,
    pub inactive: Vec<(&'a str, Vec<&'a Task>)>,
}

#[derive(Debug, Clone, Copy)]
pub struct TaskIndex<'a> {
    tasks: &'a [Task],
}

impl<'a> TaskIndex<'a> {
    pub fn new(tasks: &'a [Task]) -> Self {
        TaskIndex { tasks }
    }

    pub fn by_category(&self) -> BTreeMap<&'a str, Vec<&'a Task>> {
        let mut buckets: BTreeMap<&'a str, Vec<&'a Task>> = BTreeMap::new();
        for task in self.tasks {
            buckets.entry(task.category.as_str()).or_default().push(task);
        }
        buckets
    }

    pub fn category_status(&self, category: &str) -> CategoryStatus {
        let mut members = self.tasks.iter().filter(|t| t.category == category).peekable();
        if members.peek().is_none() {
            return CategoryStatus::Active;
        }
        if members.all(|t| t.completed) {
            CategoryStatus::Inactive
        } else {
            CategoryStatus::Active
        }
    }

    pub fn sidebar(&self) -> Sidebar<'a> {
        let mut sidebar = Sidebar::default();
        for (category, tasks) in self.by_category() {
            match self.category_status(category) {
                CategoryStatus::Active => sidebar.active.push((category, tasks)),
                CategoryStatus::Inactive => sidebar.inactive.push((category, tasks)),
            }
        }
        sidebar
    }

    pub fn by_date(&self, date: NaiveDate) -> Vec<&'a Task> {
        self.tasks.iter().filter(|t| t.due == Some(date)).collect()
    }

    pub fn unscheduled(&self) -> Vec<&'a Task> {
        self.tasks.iter().filter(|t| t.due.is_none()).collect()
    }

    /// `(completed, total)` for tasks due on `date`.
    pub fn completion(&self, date: NaiveDate) -> (usize, usize) {
        self.by_date(date)
            .iter()
            .fold((0, 0), |(done, total), t| (done + t.completed as usize, total + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewTask, Priority};

    fn task(id: u64, title: &str, category: &str, due: Option<NaiveDate>, completed: bool) -> Task {
        let mut t = Task::from_new(id, NewTask::new(title, category, due).with_priority(Priority::Short));
        t.completed = completed;
        t
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
    }

    #[test]
    fn categories_sorted_and_never_empty() {
        let tasks = vec![
            task(1, "b1", "beta", None, false),
            task(2, "a1", "Alpha", None, false),
            task(3, "a2", "alpha", None, false),
            task(4, "b2", "beta", None, true),
        ];
        let index = TaskIndex::new(&tasks);
        let groups = index.by_category();
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec!["Alpha", "alpha", "beta"]);
        let beta: Vec<_> = groups["beta"].iter().map(|t| t.title.as_str()).collect();
        assert_eq!(beta, vec!["b1", "b2"]);
        assert!(groups.values().all(|g| !g.is_empty()));
    }

    #[test]
    fn status_flips_when_open_task_added() {
        let mut tasks = vec![
            task(1, "rent", "Bills", None, true),
            task(2, "power", "Bills", None, true),
        ];
        assert_eq!(TaskIndex::new(&tasks).category_status("Bills"), CategoryStatus::Inactive);

        tasks.push(task(3, "water", "Bills", None, false));
        assert_eq!(TaskIndex::new(&tasks).category_status("Bills"), CategoryStatus::Active);
        assert_eq!(TaskIndex::new(&tasks).category_status("Nope"), CategoryStatus::Active);
    }

    #[test]
    fn sidebar_splits_by_status() {
        let tasks = vec![
            task(1, "rent", "Bills", None, true),
            task(2, "run", "Health", None, false),
        ];
        let sidebar = TaskIndex::new(&tasks).sidebar();
        assert_eq!(sidebar.active.len(), 1);
        assert_eq!(sidebar.active[0].0, "Health");
        assert_eq!(sidebar.inactive[0].0, "Bills");
    }

    #[test]
    fn date_lookup_skips_unscheduled() {
        let tasks = vec![
            task(1, "first", "", Some(day(1)), false),
            task(2, "floating", "", None, false),
            task(3, "second", "", Some(day(1)), true),
            task(4, "other", "", Some(day(2)), false),
        ];
        let index = TaskIndex::new(&tasks);
        let titles: Vec<_> = index.by_date(day(1)).iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second"]);
        assert_eq!(index.unscheduled().len(), 1);
        assert_eq!(index.completion(day(1)), (1, 2));
        assert_eq!(index.completion(day(3)), (0, 0));
    }
}
