// Pure projection from the backing task list to displayed rows

use crate::filter::{FilterMode, SortMode};
use crate::models::{Status, Task};
use chrono::NaiveDate;
use std::cmp::Ordering;

/// One displayed task, paired with its position in the backing list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayRow<'a> {
    /// Original index in the untouched backing list
    pub index: usize,
    pub task: &'a Task,
}

/// Filter then sort `tasks` for display
///
/// The backing slice is never reordered. Sorting is stable, so tasks sharing a
/// due date keep their filtered relative order.
pub fn compute_display_list(
    tasks: &[Task],
    filter: FilterMode,
    sort: SortMode,
    reference: NaiveDate,
) -> Vec<DisplayRow<'_>> {
    let mut rows: Vec<DisplayRow<'_>> = tasks
        .iter()
        .enumerate()
        .map(|(index, task)| DisplayRow { index, task })
        .filter(|row| filter.matches(row.task.due_date, reference))
        .collect();

    if sort != SortMode::Unsorted {
        rows.sort_by(|a, b| sort.compare_due(a.task.due_date, b.task.due_date));
    }

    rows
}

/// Status label for a task relative to `reference`
pub fn derive_status(task: &Task, reference: NaiveDate) -> Status {
    if task.done {
        return Status::Done;
    }
    match task.due_date.map(|due| due.cmp(&reference)) {
        None => Status::NoDueDate,
        Some(Ordering::Less) => Status::Overdue,
        Some(Ordering::Equal) => Status::Today,
        Some(Ordering::Greater) => Status::Upcoming,
    }
}
