// Task list state container: every mutation goes through here

use crate::error::TrackerError;
use crate::filter::{FilterMode, SortMode, ViewState};
use crate::models::{Task, TaskFields, TaskId, now_ms};
use crate::store::TaskStore;
use crate::view::{DisplayRow, compute_display_list};
use chrono::NaiveDate;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

/// Owns the backing task list, the current view selection and the store
///
/// Mutations are addressed by stable [`TaskId`]. Each one saves the full list
/// afterwards. If that save fails the in-memory change stays and the error is
/// returned.
pub struct Tracker<S: TaskStore> {
    tasks: Vec<Task>,
    store: S,
    view: ViewState,
}

impl<S: TaskStore> Tracker<S> {
    /// Load tasks from `store`
    ///
    /// Stored records without an id get one here, and the list is saved once so
    /// the ids stay the same on the next load.
    pub fn open(store: S) -> Result<Self> {
        let mut tasks = store.load().context("Failed to load tasks")?;
        let mut assigned = 0;
        for task in tasks.iter_mut().filter(|t| t.id.is_unassigned()) {
            task.id = TaskId::new();
            assigned += 1;
        }
        info!(count = tasks.len(), "Opened tracker");

        let mut tracker = Self {
            tasks,
            store,
            view: ViewState::default(),
        };
        if assigned > 0 {
            info!(assigned, "Assigned ids to stored tasks");
            // Failure is logged by persist; the ids are only regenerated next time
            let _ = tracker.persist();
        }
        Ok(tracker)
    }

    /// Backing list in insertion order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn position(&self, id: TaskId) -> Result<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TrackerError::TaskNotFound(id).into())
    }

    /// Stable id of the task at an original index taken from a display row
    pub fn id_at(&self, index: usize) -> Result<TaskId> {
        self.tasks.get(index).map(|t| t.id).ok_or_else(|| {
            TrackerError::IndexOutOfRange {
                index,
                len: self.tasks.len(),
            }
            .into()
        })
    }

    /// Resolve a user-supplied task reference
    ///
    /// Short all-digit input is a 1-based row number as rendered in listings;
    /// anything else is a full id or a unique id prefix.
    pub fn resolve(&self, reference: &str) -> Result<TaskId> {
        let reference = reference.trim();
        if reference.len() < 8 && !reference.is_empty() && reference.bytes().all(|b| b.is_ascii_digit()) {
            let row: usize = reference.parse().context("Invalid row number")?;
            return match row.checked_sub(1) {
                Some(index) => self.id_at(index),
                None => Err(TrackerError::IndexOutOfRange {
                    index: 0,
                    len: self.tasks.len(),
                }
                .into()),
            };
        }

        let prefix = reference.to_ascii_lowercase();
        let mut matches = self
            .tasks
            .iter()
            .filter(|t| !prefix.is_empty() && t.id.to_string().starts_with(&prefix));

        match (matches.next(), matches.next()) {
            (Some(task), None) => Ok(task.id),
            (Some(_), Some(_)) => Err(TrackerError::AmbiguousTask(reference.to_string()).into()),
            (None, _) => Err(TrackerError::UnknownReference(reference.to_string()).into()),
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Validate `fields` and append a new task
    pub fn add_task(&mut self, fields: &TaskFields) -> Result<&Task> {
        let task = Task::from_fields(fields, now_ms())?;
        info!(id = %task.id, assignment = %task.assignment, "Adding task");

        self.tasks.push(task);
        let index = self.tasks.len() - 1;
        self.persist()?;
        Ok(&self.tasks[index])
    }

    /// Flip the done flag, returning the new value
    pub fn toggle_done(&mut self, id: TaskId) -> Result<bool> {
        let index = self.position(id)?;
        let task = &mut self.tasks[index];
        task.done = !task.done;
        task.updated_at = now_ms();
        let done = task.done;
        info!(id = %id, done, "Toggled task");

        self.persist()?;
        Ok(done)
    }

    /// Remove a task permanently; later tasks shift down one position
    pub fn delete_task(&mut self, id: TaskId) -> Result<Task> {
        let index = self.position(id)?;
        let task = self.tasks.remove(index);
        info!(id = %id, index, "Deleted task");

        self.persist()?;
        Ok(task)
    }

    /// Fields for pre-filling an edit form
    ///
    /// The task stays in the list until [`Tracker::update_task`] commits the edit.
    pub fn start_edit(&self, id: TaskId) -> Result<TaskFields> {
        let index = self.position(id)?;
        Ok(TaskFields::from(&self.tasks[index]))
    }

    /// Replace a task's fields in place, keeping its id, position and done flag
    pub fn update_task(&mut self, id: TaskId, fields: &TaskFields) -> Result<&Task> {
        let index = self.position(id)?;
        self.tasks[index].apply_fields(fields, now_ms())?;
        info!(id = %id, index, "Updated task");

        self.persist()?;
        Ok(&self.tasks[index])
    }

    fn persist(&mut self) -> Result<()> {
        self.store.save(&self.tasks).inspect_err(|e| {
            warn!(error = ?e, count = self.tasks.len(), "Failed to save tasks, in-memory state kept");
        })?;
        debug!(count = self.tasks.len(), "Saved tasks");
        Ok(())
    }

    // ========================================================================
    // View state (never persisted)
    // ========================================================================

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn set_filter(&mut self, filter: FilterMode) {
        self.view.filter = filter;
    }

    pub fn set_sort(&mut self, sort: SortMode) {
        self.view.sort = sort;
    }

    /// Reset to `all` / `none`
    pub fn clear_filters(&mut self) {
        self.view.clear();
    }

    /// Recompute the displayed rows for the current view
    pub fn display(&self, reference: NaiveDate) -> Vec<DisplayRow<'_>> {
        compute_display_list(&self.tasks, self.view.filter, self.view.sort, reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{JsonlStore, MemoryStore};
    use eyre::eyre;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tracker_with(entries: &[(&str, &str)]) -> Tracker<MemoryStore> {
        let mut tracker = Tracker::open(MemoryStore::new()).unwrap();
        for (name, due) in entries {
            tracker.add_task(&TaskFields::new(*name, *due)).unwrap();
        }
        tracker
    }

    fn names(tracker: &Tracker<MemoryStore>) -> Vec<&str> {
        tracker.tasks().iter().map(|t| t.assignment.as_str()).collect()
    }

    /// Store whose saves always fail
    struct FailingStore;

    impl TaskStore for FailingStore {
        fn load(&self) -> Result<Vec<Task>> {
            Ok(Vec::new())
        }

        fn save(&mut self, _tasks: &[Task]) -> Result<()> {
            Err(eyre!("quota exceeded"))
        }
    }

    #[test]
    fn test_add_appends_and_saves() {
        let tracker = tracker_with(&[("A", "2024-01-10"), ("B", "2024-01-05")]);

        assert_eq!(names(&tracker), vec!["A", "B"]);
        assert_eq!(tracker.store().saves(), 2);
        assert_eq!(tracker.store().snapshot(), tracker.tasks());
        assert!(tracker.tasks().iter().all(|t| !t.done));
    }

    #[test]
    fn test_add_validation_error() {
        let mut tracker = tracker_with(&[("A", "2024-01-10")]);

        let err = tracker.add_task(&TaskFields::new("B", "")).unwrap_err();
        assert_eq!(
            err.downcast_ref::<TrackerError>(),
            Some(&TrackerError::Validation("Due date is required".to_string()))
        );

        assert_eq!(names(&tracker), vec!["A"]);
        assert_eq!(tracker.store().saves(), 1);
    }

    #[test]
    fn test_toggle_done_twice_restores() {
        let mut tracker = tracker_with(&[("A", "2024-01-10")]);
        let id = tracker.id_at(0).unwrap();

        assert!(tracker.toggle_done(id).unwrap());
        assert!(tracker.get(id).unwrap().done);
        assert!(!tracker.toggle_done(id).unwrap());
        assert!(!tracker.get(id).unwrap().done);
        assert_eq!(tracker.store().saves(), 3);
    }

    #[test]
    fn test_delete_removes_and_keeps_order() {
        let mut tracker = tracker_with(&[("A", "2024-01-10"), ("B", "2024-01-05"), ("C", "2024-01-07")]);
        let id = tracker.id_at(1).unwrap();

        let removed = tracker.delete_task(id).unwrap();
        assert_eq!(removed.assignment, "B");
        assert_eq!(names(&tracker), vec!["A", "C"]);

        let rows = tracker.display(date(2024, 1, 8));
        assert!(rows.iter().all(|r| r.task.id != id));
        assert_eq!(rows[1].index, 1);
        assert_eq!(tracker.store().snapshot().len(), 2);
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let mut tracker = tracker_with(&[("A", "2024-01-10")]);
        let id = tracker.id_at(0).unwrap();
        tracker.delete_task(id).unwrap();

        let err = tracker.toggle_done(id).unwrap_err();
        assert_eq!(err.downcast_ref::<TrackerError>(), Some(&TrackerError::TaskNotFound(id)));
        assert!(tracker.delete_task(id).is_err());
    }

    #[test]
    fn test_id_at_out_of_range() {
        let tracker = tracker_with(&[("A", "2024-01-10")]);
        let err = tracker.id_at(5).unwrap_err();
        assert_eq!(
            err.downcast_ref::<TrackerError>(),
            Some(&TrackerError::IndexOutOfRange { index: 5, len: 1 })
        );
    }

    #[test]
    fn test_start_edit_keeps_task() {
        let mut tracker = Tracker::open(MemoryStore::new()).unwrap();
        let id = tracker
            .add_task(&TaskFields::new("Lab", "2024-01-10").with_subject("CHEM").with_kind("Lab"))
            .unwrap()
            .id;

        let fields = tracker.start_edit(id).unwrap();
        assert_eq!(fields, TaskFields::new("Lab", "2024-01-10").with_subject("CHEM").with_kind("Lab"));
        assert_eq!(tracker.tasks().len(), 1);
        assert_eq!(tracker.store().saves(), 1);
    }

    #[test]
    fn test_update_in_place() {
        let mut tracker = tracker_with(&[("A", "2024-01-10"), ("B", "2024-01-05"), ("C", "2024-01-07")]);
        let id = tracker.id_at(1).unwrap();
        tracker.toggle_done(id).unwrap();

        let mut fields = tracker.start_edit(id).unwrap();
        fields.assignment = "B revised".to_string();
        fields.due_date = "2024-02-01".to_string();
        tracker.update_task(id, &fields).unwrap();

        assert_eq!(names(&tracker), vec!["A", "B revised", "C"]);
        let task = tracker.get(id).unwrap();
        assert_eq!(task.due_date, Some(date(2024, 2, 1)));
        assert!(task.done);
        assert_eq!(tracker.store().snapshot()[1].assignment, "B revised");
    }

    #[test]
    fn test_update_validation_leaves_task_untouched() {
        let mut tracker = tracker_with(&[("A", "2024-01-10")]);
        let id = tracker.id_at(0).unwrap();
        let before = tracker.get(id).unwrap().clone();

        assert!(tracker.update_task(id, &TaskFields::new("", "2024-01-11")).is_err());
        assert_eq!(tracker.get(id), Some(&before));
        assert_eq!(tracker.store().saves(), 1);
    }

    #[test]
    fn test_view_state_changes_do_not_persist() {
        let mut tracker = tracker_with(&[("A", "2024-01-10"), ("B", "2024-01-05"), ("C", "2024-01-08")]);
        let saves = tracker.store().saves();
        let today = date(2024, 1, 8);

        tracker.set_filter(FilterMode::Overdue);
        let rows = tracker.display(today);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].task.assignment, "B");

        tracker.set_filter(FilterMode::All);
        tracker.set_sort(SortMode::Desc);
        let order: Vec<&str> = tracker.display(today).iter().map(|r| r.task.assignment.as_str()).collect();
        assert_eq!(order, vec!["A", "C", "B"]);

        tracker.clear_filters();
        assert_eq!(tracker.view(), ViewState::default());
        let order: Vec<&str> = tracker.display(today).iter().map(|r| r.task.assignment.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);

        assert_eq!(tracker.store().saves(), saves);
    }

    #[test]
    fn test_display_index_routes_back_to_task() {
        let mut tracker = tracker_with(&[("A", "2024-01-10"), ("B", "2024-01-05")]);
        tracker.set_sort(SortMode::Asc);

        let target = {
            let rows = tracker.display(date(2024, 1, 8));
            assert_eq!(rows[0].task.assignment, "B");
            tracker.id_at(rows[0].index).unwrap()
        };
        tracker.toggle_done(target).unwrap();

        assert!(tracker.tasks()[1].done);
        assert!(!tracker.tasks()[0].done);
    }

    #[test]
    fn test_resolve_row_number_and_prefix() {
        let tracker = tracker_with(&[("A", "2024-01-10"), ("B", "2024-01-05")]);
        let second = tracker.tasks()[1].id;

        assert_eq!(tracker.resolve("2").unwrap(), second);
        assert_eq!(tracker.resolve(&second.to_string()).unwrap(), second);
        assert!(tracker.resolve("0").is_err());
        assert!(tracker.resolve("3").is_err());

        let err = tracker.resolve("zzzzzzzzz").unwrap_err();
        assert_eq!(
            err.downcast_ref::<TrackerError>(),
            Some(&TrackerError::UnknownReference("zzzzzzzzz".to_string()))
        );
        assert!(!matches!(err.downcast_ref::<TrackerError>(), Some(TrackerError::Validation(_))));
    }

    #[test]
    fn test_open_assigns_missing_ids_once() {
        let tasks: Vec<Task> = serde_json::from_str(
            r#"[
                {"assignment":"A","dueDate":"2024-01-10","done":false},
                {"assignment":"B","dueDate":"2024-01-05","completed":true},
                {"id":"01890000-0000-7000-8000-000000000003","assignment":"C","dueDate":"2024-01-07"}
            ]"#,
        )
        .unwrap();
        assert!(tasks[0].id.is_unassigned());

        let tracker = Tracker::open(MemoryStore::with_tasks(tasks)).unwrap();
        let ids: Vec<TaskId> = tracker.tasks().iter().map(|t| t.id).collect();
        assert!(ids.iter().all(|id| !id.is_unassigned()));
        assert_ne!(ids[0], ids[1]);
        assert_eq!(ids[2].to_string(), "01890000-0000-7000-8000-000000000003");
        assert_eq!(tracker.store().saves(), 1);
        assert_eq!(tracker.store().snapshot(), tracker.tasks());

        // Reopening the saved snapshot keeps the same ids and does not save again
        let reopened = Tracker::open(MemoryStore::with_tasks(tracker.store().snapshot().to_vec())).unwrap();
        let again: Vec<TaskId> = reopened.tasks().iter().map(|t| t.id).collect();
        assert_eq!(again, ids);
        assert_eq!(reopened.store().saves(), 0);
        assert_eq!(reopened.resolve(&ids[0].to_string()).unwrap(), ids[0]);
    }

    #[test]
    fn test_open_assigns_ids_even_if_save_fails() {
        struct LegacyReadOnly;

        impl TaskStore for LegacyReadOnly {
            fn load(&self) -> Result<Vec<Task>> {
                Ok(serde_json::from_str(r#"[{"assignment":"A","dueDate":"2024-01-10"}]"#)?)
            }

            fn save(&mut self, _tasks: &[Task]) -> Result<()> {
                Err(eyre!("read-only"))
            }
        }

        let tracker = Tracker::open(LegacyReadOnly).unwrap();
        assert!(!tracker.tasks()[0].id.is_unassigned());
    }

    #[test]
    fn test_resolve_ambiguous_prefix() {
        let tasks: Vec<Task> = serde_json::from_str(
            r#"[
                {"id":"01890000-0000-7000-8000-000000000001","assignment":"A","dueDate":"2024-01-10","type":"","done":false},
                {"id":"01890000-0000-7000-8000-000000000002","assignment":"B","dueDate":"2024-01-05","type":"","done":false}
            ]"#,
        )
        .unwrap();
        let tracker = Tracker::open(MemoryStore::with_tasks(tasks)).unwrap();

        let err = tracker.resolve("01890000").unwrap_err();
        assert!(matches!(err.downcast_ref::<TrackerError>(), Some(TrackerError::AmbiguousTask(_))));

        let id = tracker.resolve("01890000-0000-7000-8000-000000000002").unwrap();
        assert_eq!(tracker.get(id).unwrap().assignment, "B");
    }

    #[test]
    fn test_save_failure_keeps_memory_state() {
        let mut tracker = Tracker::open(FailingStore).unwrap();

        let err = tracker.add_task(&TaskFields::new("A", "2024-01-10")).unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(tracker.tasks().len(), 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        let id = {
            let mut tracker = Tracker::open(JsonlStore::open(temp.path()).unwrap()).unwrap();
            tracker.add_task(&TaskFields::new("A", "2024-01-10")).unwrap();
            let id = tracker.add_task(&TaskFields::new("B", "2024-01-05")).unwrap().id;
            tracker.toggle_done(id).unwrap();
            id
        };

        let tracker = Tracker::open(JsonlStore::open(temp.path()).unwrap()).unwrap();
        assert_eq!(tracker.tasks().len(), 2);
        assert!(tracker.get(id).unwrap().done);
        assert_eq!(tracker.tasks()[0].assignment, "A");
    }
}
