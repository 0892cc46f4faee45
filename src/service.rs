use crate::index::TaskIndex;
use crate::model::{MutationError, NewTask, Task, TaskId};
use crate::storage::TaskStore;
use chrono::NaiveDate;

/// The only way front ends change tasks. Each call applies the change in
/// memory and then writes the whole store before returning. A failed write
/// is reported as `SaveFailed` but the in-memory change is kept.
#[derive(Debug)]
pub struct TaskMutationService {
    store: TaskStore,
}

impl TaskMutationService {
    pub fn new(store: TaskStore) -> Self {
        TaskMutationService { store }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.tasks()
    }

    pub fn index(&self) -> TaskIndex<'_> {
        TaskIndex::new(self.store.tasks())
    }

    pub fn add(&mut self, mut new: NewTask) -> Result<TaskId, MutationError> {
        new.title = new.title.trim().to_string();
        if new.title.is_empty() {
            return Err(MutationError::EmptyTitle);
        }
        new.category = new.category.trim().to_string();
        new.description = new
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        let title = new.title.clone();
        let id = self.store.add(new).map_err(|err| {
            log::warn!("adding {:?} not persisted: {:#}", title, err);
            MutationError::SaveFailed(err)
        })?;
        log::info!("added task {} {:?}", id, title);
        Ok(id)
    }

    /// Returns the new completion value, or `None` when `id` is unknown.
    pub fn toggle(&mut self, id: TaskId) -> Result<Option<bool>, MutationError> {
        let toggled = self.store.toggle(id).map_err(|err| {
            log::warn!("toggling task {} not persisted: {:#}", id, err);
            MutationError::SaveFailed(err)
        })?;
        if let Some(value) = toggled {
            log::info!("task {} completed={}", id, value);
        }
        Ok(toggled)
    }

    pub fn set_completed(&mut self, id: TaskId, value: bool) -> Result<bool, MutationError> {
        self.store.set_completed(id, value).map_err(|err| {
            log::warn!("completing task {} not persisted: {:#}", id, err);
            MutationError::SaveFailed(err)
        })
    }

    pub fn delete(&mut self, id: TaskId) -> Result<Option<Task>, MutationError> {
        let removed = self.store.remove(id).map_err(|err| {
            log::warn!("deleting task {} not persisted: {:#}", id, err);
            MutationError::SaveFailed(err)
        })?;
        if let Some(task) = &removed {
            log::info!("deleted task {} {:?}", id, task.title);
        }
        Ok(removed)
    }

    pub fn day_detail(&self, date: NaiveDate) -> Vec<&Task> {
        self.index().by_date(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::WeekStart;
    use crate::model::Priority;
    use crate::render::{render_month, TaskStyle};
    use crate::storage::load_tasks;
    use std::fs;
    use tempfile::tempdir;

    fn rent_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 1).unwrap()
    }

    #[test]
    fn pay_rent_end_to_end() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempdir().unwrap();
        let mut service = TaskMutationService::new(TaskStore::open(dir.path(), "alice_pw").unwrap());

        let id = service
            .add(NewTask::new("Pay rent", "Bills", Some(rent_day())).with_priority(Priority::Long))
            .unwrap();
        let due = service.day_detail(rent_day());
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].title, "Pay rent");

        let view = render_month(2025, 11, WeekStart::Monday, service.tasks()).unwrap();
        let cell = view.cell(rent_day()).unwrap();
        assert_eq!(cell.tasks.len(), 1);
        assert_eq!(cell.tasks[0].style, TaskStyle::Priority(Priority::Long));

        assert_eq!(service.toggle(id).unwrap(), Some(true));
        let view = render_month(2025, 11, WeekStart::Monday, service.tasks()).unwrap();
        assert_eq!(view.cell(rent_day()).unwrap().tasks[0].style, TaskStyle::Completed);

        assert!(service.delete(id).unwrap().is_some());
        assert!(service.day_detail(rent_day()).is_empty());
        let on_disk = fs::read_to_string(service.store().path()).unwrap();
        assert!(!on_disk.contains("Pay rent"));
        assert!(load_tasks(service.store().path()).unwrap().is_empty());
    }

    #[test]
    fn empty_title_is_rejected_without_change() {
        let dir = tempdir().unwrap();
        let mut service = TaskMutationService::new(TaskStore::open(dir.path(), "bob").unwrap());
        let err = service.add(NewTask::new("   ", "Bills", None)).unwrap_err();
        assert!(matches!(err, MutationError::EmptyTitle));
        assert!(service.tasks().is_empty());
        assert!(!service.store().path().exists());
    }

    #[test]
    fn input_is_trimmed() {
        let dir = tempdir().unwrap();
        let mut service = TaskMutationService::new(TaskStore::open(dir.path(), "carol").unwrap());
        let id = service
            .add(NewTask::new("  Dentist ", " Health ", None).with_description("   "))
            .unwrap();
        let task = service.store().get(id).unwrap();
        assert_eq!(task.title, "Dentist");
        assert_eq!(task.category, "Health");
        assert_eq!(task.description, None);
    }

    #[test]
    fn stale_ids_are_silent() {
        let dir = tempdir().unwrap();
        let mut service = TaskMutationService::new(TaskStore::open(dir.path(), "dave").unwrap());
        let id = service.add(NewTask::new("Once", "", None)).unwrap();
        service.delete(id).unwrap();
        assert_eq!(service.toggle(id).unwrap(), None);
        assert!(service.delete(id).unwrap().is_none());
        assert!(!service.set_completed(id, true).unwrap());
    }

    #[test]
    fn save_failure_keeps_in_memory_view() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let store = TaskStore::at_path(blocker.join("erin.csv")).unwrap();
        let mut service = TaskMutationService::new(store);

        let err = service.add(NewTask::new("Unsaved", "", Some(rent_day()))).unwrap_err();
        assert!(matches!(err, MutationError::SaveFailed(_)));
        assert!(err.to_string().starts_with("save failed"));
        assert_eq!(service.day_detail(rent_day()).len(), 1);
    }
}
