use crate::model::{NewTask, Priority, Task, TaskId};
use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// On-disk due date format.
pub const DUE_FORMAT: &str = "%m-%d-%Y";

/// Header line, written even when there are no tasks.
const COLUMNS: [&str; 6] = ["Task", "Category", "Due Date", "Priority", "Completed", "Description"];

/// One CSV row. Column names match existing task files, so
/// older files (no `Description` column, pandas-style `True`/`False`) load.
#[derive(Debug, Serialize, Deserialize)]
struct Row {
    #[serde(rename = "Task", default)]
    task: String,
    #[serde(rename = "Category", default)]
    category: String,
    #[serde(rename = "Due Date", default)]
    due_date: String,
    #[serde(rename = "Priority", default)]
    priority: String,
    #[serde(rename = "Completed", default)]
    completed: String,
    #[serde(rename = "Description", default)]
    description: String,
}

/// The authoritative task list for one user key. Every mutation is written
/// through to disk before it returns.
#[derive(Debug)]
pub struct TaskStore {
    path: PathBuf,
    tasks: Vec<Task>,
    next_id: TaskId,
}

impl TaskStore {
    pub fn open(dir: &Path, key: &str) -> Result<Self> {
        TaskStore::at_path(data_file(dir, key))
    }

    pub fn at_path(path: PathBuf) -> Result<Self> {
        let tasks = load_tasks(&path)?;
        let next_id = tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        log::debug!("opened store {:?} with {} tasks", path, tasks.len());
        Ok(TaskStore {
            path,
            tasks,
            next_id,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn save(&self) -> Result<()> {
        save_tasks(&self.path, &self.tasks)
    }

    /// Appends the task and persists. On a failed save the task stays in
    /// memory; the id is lost to the caller but never reused.
    pub fn add(&mut self, new: NewTask) -> Result<TaskId> {
        let id = self.next_id;
        self.next_id += 1;
        self.tasks.push(Task::from_new(id, new));
        self.save()?;
        Ok(id)
    }

    /// Returns whether a task with `id` exists. Unknown ids leave the file alone.
    pub fn set_completed(&mut self, id: TaskId, value: bool) -> Result<bool> {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.completed = value;
                self.save()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn toggle(&mut self, id: TaskId) -> Result<Option<bool>> {
        let current = match self.get(id) {
            Some(task) => task.completed,
            None => return Ok(None),
        };
        self.set_completed(id, !current)?;
        Ok(Some(!current))
    }

    pub fn remove(&mut self, id: TaskId) -> Result<Option<Task>> {
        let idx = match self.tasks.iter().position(|t| t.id == id) {
            Some(idx) => idx,
            None => return Ok(None),
        };
        let removed = self.tasks.remove(idx);
        self.save()?;
        Ok(Some(removed))
    }
}

pub fn data_file(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{}.csv", key))
}

/// Reads a task file. A missing file is an empty list; ids follow row order.
/// Bad cells are coerced and bad rows skipped, only IO errors fail the load.
pub fn load_tasks(path: &Path) -> Result<Vec<Task>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("reading {:?}", path))?;
    let headers = lossy_record(
        reader
            .byte_headers()
            .with_context(|| format!("reading header of {:?}", path))?,
    );

    let mut tasks = Vec::new();
    for (idx, record) in reader.byte_records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) if err.is_io_error() => {
                return Err(err).with_context(|| format!("reading {:?}", path));
            }
            Err(err) => {
                log::warn!("skipping row {} of {:?}: {}", idx + 1, path, err);
                continue;
            }
        };
        if std::str::from_utf8(record.as_slice()).is_err() {
            log::warn!("row {} of {:?} is not valid UTF-8, replacing bad bytes", idx + 1, path);
        }
        let row: Row = match lossy_record(&record).deserialize(Some(&headers)) {
            Ok(row) => row,
            Err(err) => {
                log::warn!("skipping row {} of {:?}: {}", idx + 1, path, err);
                continue;
            }
        };
        let title = row.task.trim();
        if title.is_empty() {
            log::warn!("skipping row {} of {:?}: empty task title", idx + 1, path);
            continue;
        }
        let description = row.description.trim();
        tasks.push(Task {
            id: tasks.len() as TaskId + 1,
            title: title.to_string(),
            category: row.category.trim().to_string(),
            due: parse_due_cell(&row.due_date),
            priority: Priority::parse_lenient(&row.priority),
            completed: parse_completed_cell(&row.completed),
            description: if description.is_empty() {
                None
            } else {
                Some(description.to_string())
            },
        });
    }
    log::debug!("loaded {} tasks from {:?}", tasks.len(), path);
    Ok(tasks)
}

fn lossy_record(record: &csv::ByteRecord) -> csv::StringRecord {
    record.iter().map(String::from_utf8_lossy).collect()
}

/// Full rewrite through a temp file in the same directory, renamed into place.
pub fn save_tasks(path: &Path, tasks: &[Task]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;

    let temp = NamedTempFile::new_in(dir).with_context(|| format!("creating temp file in {:?}", dir))?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(temp);
    writer
        .write_record(COLUMNS)
        .with_context(|| format!("writing header of {:?}", path))?;
    for task in tasks {
        writer
            .serialize(Row::from(task))
            .with_context(|| format!("serializing task {}", task.id))?;
    }
    let mut temp = writer
        .into_inner()
        .map_err(|err| anyhow!("flushing {:?}: {}", path, err.error()))?;
    temp.flush()?;
    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
    log::debug!("saved {} tasks to {:?}", tasks.len(), path);
    Ok(())
}

/// Blank cells are silently unscheduled; anything else unparsable is logged.
pub fn parse_due_cell(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = NaiveDate::parse_from_str(trimmed, DUE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date())
        });
    match parsed {
        Ok(date) => Some(date),
        Err(_) => {
            log::warn!("unparsable due date {:?}, treating task as unscheduled", trimmed);
            None
        }
    }
}

fn parse_completed_cell(raw: &str) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => true,
        "" | "false" | "0" | "no" => false,
        other => {
            log::warn!("unrecognized completed value {:?}, treating as false", other);
            false
        }
    }
}

pub fn format_due(date: &NaiveDate) -> String {
    date.format(DUE_FORMAT).to_string()
}

impl From<&Task> for Row {
    fn from(task: &Task) -> Self {
        Row {
            task: task.title.clone(),
            category: task.category.clone(),
            due_date: task.due.as_ref().map(format_due).unwrap_or_default(),
            priority: task.priority.label().to_string(),
            completed: if task.completed { "True" } else { "False" }.to_string(),
            description: task.description.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let store = TaskStore::open(dir.path(), "nobody").unwrap();
        assert!(store.tasks().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn save_then_load_keeps_tasks() {
        let dir = tempdir().unwrap();
        let mut store = TaskStore::open(dir.path(), "alice").unwrap();
        store
            .add(
                NewTask::new("Pay rent", "Bills", Some(date(2025, 11, 1)))
                    .with_priority(Priority::Long)
                    .with_description("landlord, by transfer"),
            )
            .unwrap();
        store
            .add(NewTask::new("Water plants", "", None).with_priority(Priority::Short))
            .unwrap();
        store.set_completed(2, true).unwrap();

        let reloaded = load_tasks(store.path()).unwrap();
        assert_eq!(reloaded, store.tasks());
    }

    #[test]
    fn writes_expected_columns() {
        let dir = tempdir().unwrap();
        let mut store = TaskStore::open(dir.path(), "bob").unwrap();
        store
            .add(NewTask::new("Pay rent", "Bills", Some(date(2025, 11, 1))).with_priority(Priority::Long))
            .unwrap();
        let text = fs::read_to_string(store.path()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Task,Category,Due Date,Priority,Completed,Description")
        );
        assert_eq!(lines.next(), Some("Pay rent,Bills,11-01-2025,> 45 Minutes,False,"));
    }

    #[test]
    fn lenient_load_of_old_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.csv");
        fs::write(
            &path,
            "Task,Category,Due Date,Priority,Completed\n\
             Call mom,Family,10-09-2025,High,True\n\
             Taxes,Bills,someday,Low,False\n\
             Gym,,2025-10-12 00:00:00,whenever,\n\
             ,Empty,10-10-2025,Low,False\n",
        )
        .unwrap();

        let tasks = load_tasks(&path).unwrap();
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].due, Some(date(2025, 10, 9)));
        assert_eq!(tasks[0].priority, Priority::Long);
        assert!(tasks[0].completed);
        assert_eq!(tasks[0].description, None);
        assert_eq!(tasks[1].due, None);
        assert_eq!(tasks[1].priority, Priority::Short);
        assert_eq!(tasks[2].due, Some(date(2025, 10, 12)));
        assert_eq!(tasks[2].priority, Priority::Medium);
        assert!(!tasks[2].completed);
        assert_eq!(
            tasks.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn bad_bytes_only_affect_their_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bytes.csv");
        let mut data = b"Task,Category,Due Date,Priority,Completed,Description\n\
                         Pay rent,Bills,11-01-2025,> 45 Minutes,False,\n\
                         Mystery,Misc,"
            .to_vec();
        data.extend_from_slice(&[0xff, 0xfe]);
        data.extend_from_slice(b",< 15 Minutes,False,\n");
        fs::write(&path, data).unwrap();

        let tasks = load_tasks(&path).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "Pay rent");
        assert_eq!(tasks[0].due, Some(date(2025, 11, 1)));
        assert_eq!(tasks[1].title, "Mystery");
        assert_eq!(tasks[1].due, None);
        assert_eq!(tasks[1].priority, Priority::Short);
    }

    #[test]
    fn emptied_store_keeps_header() {
        let dir = tempdir().unwrap();
        let mut store = TaskStore::open(dir.path(), "gina").unwrap();
        let id = store.add(NewTask::new("Only task", "", None)).unwrap();
        store.remove(id).unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        assert_eq!(text, "Task,Category,Due Date,Priority,Completed,Description\n");
        assert!(load_tasks(store.path()).unwrap().is_empty());
    }

    #[test]
    fn ids_survive_deletes() {
        let dir = tempdir().unwrap();
        let mut store = TaskStore::open(dir.path(), "carol").unwrap();
        let a = store.add(NewTask::new("a", "", None)).unwrap();
        let b = store.add(NewTask::new("b", "", None)).unwrap();
        let c = store.add(NewTask::new("c", "", None)).unwrap();

        let removed = store.remove(a).unwrap().unwrap();
        assert_eq!(removed.title, "a");
        assert_eq!(store.get(b).unwrap().title, "b");
        assert_eq!(store.get(c).unwrap().title, "c");

        let d = store.add(NewTask::new("d", "", None)).unwrap();
        assert!(d > c);
        assert!(store.get(a).is_none());
        assert_eq!(
            store.tasks().iter().map(|t| t.title.as_str()).collect::<Vec<_>>(),
            vec!["b", "c", "d"]
        );
    }

    #[test]
    fn unknown_ids_are_noops() {
        let dir = tempdir().unwrap();
        let mut store = TaskStore::open(dir.path(), "dave").unwrap();
        assert!(!store.set_completed(42, true).unwrap());
        assert_eq!(store.toggle(42).unwrap(), None);
        assert!(store.remove(42).unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn double_toggle_restores_file() {
        let dir = tempdir().unwrap();
        let mut store = TaskStore::open(dir.path(), "erin").unwrap();
        let id = store
            .add(NewTask::new("Laundry", "Home", Some(date(2025, 3, 4))))
            .unwrap();
        let before = fs::read(store.path()).unwrap();
        assert_eq!(store.toggle(id).unwrap(), Some(true));
        assert_ne!(fs::read(store.path()).unwrap(), before);
        assert_eq!(store.toggle(id).unwrap(), Some(false));
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn failed_save_keeps_memory() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        let mut store = TaskStore::at_path(blocker.join("frank.csv")).unwrap();
        assert!(store.add(NewTask::new("Stays in memory", "", None)).is_err());
        assert_eq!(store.tasks().len(), 1);
    }
}
