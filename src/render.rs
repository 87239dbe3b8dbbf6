// Text table rendering for displayed rows

use crate::models::Status;
use crate::view::{DisplayRow, derive_status};
use chrono::NaiveDate;
use colored::Colorize;

/// Human-readable due date, e.g. "Jan 5, 2024"; blank when unset
pub fn format_due_date(due_date: Option<NaiveDate>) -> String {
    due_date
        .map(|d| d.format("%b %-d, %Y").to_string())
        .unwrap_or_default()
}

/// One table row, ready to print
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    /// 1-based row number; the action handle for done/edit/delete
    pub number: usize,
    pub assignment: String,
    pub due: String,
    pub status: Status,
    pub subject: String,
    pub kind: String,
    pub short_id: String,
    pub done: bool,
}

pub fn render_rows(rows: &[DisplayRow<'_>], reference: NaiveDate) -> Vec<RenderedRow> {
    rows.iter()
        .map(|row| RenderedRow {
            number: row.index + 1,
            assignment: row.task.assignment.clone(),
            due: format_due_date(row.task.due_date),
            status: derive_status(row.task, reference),
            subject: row.task.subject.clone().unwrap_or_else(|| "-".to_string()),
            kind: row.task.kind.clone(),
            short_id: row.task.id.short(),
            done: row.task.done,
        })
        .collect()
}

const HEADERS: [&str; 7] = ["#", "Assignment", "Due", "Status", "Class", "Type", "ID"];
const STATUS_COLUMN: usize = 3;

/// Render an aligned table; `color` enables ANSI styling
pub fn render_table(rows: &[RenderedRow], color: bool) -> String {
    if rows.is_empty() {
        return "No tasks\n".to_string();
    }

    let cells: Vec<[String; 7]> = rows
        .iter()
        .map(|row| {
            [
                row.number.to_string(),
                row.assignment.clone(),
                row.due.clone(),
                row.status.label().to_string(),
                row.subject.clone(),
                row.kind.clone(),
                row.short_id.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();

    let header = join_padded(HEADERS.iter().map(|h| h.to_string()), &widths);
    if color {
        out.push_str(&header.bold().to_string());
    } else {
        out.push_str(&header);
    }
    out.push('\n');

    for (row, cells) in rows.iter().zip(cells) {
        let padded: Vec<String> = cells
            .into_iter()
            .zip(widths)
            .enumerate()
            .map(|(col, (cell, width))| {
                let cell = pad(&cell, width);
                if color && col == STATUS_COLUMN {
                    paint_status(row.status, &cell)
                } else {
                    cell
                }
            })
            .collect();

        let line = padded.join("  ").trim_end().to_string();
        if color && row.done {
            out.push_str(&line.dimmed().to_string());
        } else {
            out.push_str(&line);
        }
        out.push('\n');
    }

    out
}

fn pad(cell: &str, width: usize) -> String {
    let len = cell.chars().count();
    format!("{}{}", cell, " ".repeat(width.saturating_sub(len)))
}

fn join_padded(cells: impl Iterator<Item = String>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| pad(&cell, *width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn paint_status(status: Status, text: &str) -> String {
    match status {
        Status::Done => text.green(),
        Status::Overdue => text.red().bold(),
        Status::Today => text.yellow(),
        Status::Upcoming => text.cyan(),
        Status::NoDueDate => text.dimmed(),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterMode, SortMode};
    use crate::models::{Task, TaskFields};
    use crate::view::compute_display_list;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tasks() -> Vec<Task> {
        let mut undated = Task::from_fields(&TaskFields::new("Reading", "2024-01-01"), 0).unwrap();
        undated.due_date = None;
        let mut done = Task::from_fields(&TaskFields::new("Quiz", "2024-01-05").with_kind("Quiz"), 0).unwrap();
        done.done = true;

        vec![
            Task::from_fields(
                &TaskFields::new("Essay", "2024-01-10").with_subject("ENG 101").with_kind("Essay"),
                0,
            )
            .unwrap(),
            done,
            undated,
        ]
    }

    #[test]
    fn test_format_due_date() {
        assert_eq!(format_due_date(Some(date(2024, 1, 5))), "Jan 5, 2024");
        assert_eq!(format_due_date(None), "");
    }

    #[test]
    fn test_render_rows_columns() {
        let tasks = tasks();
        let rows = compute_display_list(&tasks, FilterMode::All, SortMode::Asc, date(2024, 1, 8));
        let rendered = render_rows(&rows, date(2024, 1, 8));

        assert_eq!(rendered.len(), 3);

        assert_eq!(rendered[0].number, 2);
        assert_eq!(rendered[0].assignment, "Quiz");
        assert_eq!(rendered[0].status, Status::Done);
        assert_eq!(rendered[0].subject, "-");
        assert!(rendered[0].done);

        assert_eq!(rendered[1].number, 1);
        assert_eq!(rendered[1].due, "Jan 10, 2024");
        assert_eq!(rendered[1].status, Status::Upcoming);
        assert_eq!(rendered[1].subject, "ENG 101");
        assert_eq!(rendered[1].kind, "Essay");
        assert_eq!(rendered[1].short_id, tasks[0].id.short());

        assert_eq!(rendered[2].number, 3);
        assert_eq!(rendered[2].due, "");
        assert_eq!(rendered[2].status, Status::NoDueDate);
    }

    #[test]
    fn test_render_table_plain() {
        let tasks = tasks();
        let rows = compute_display_list(&tasks, FilterMode::All, SortMode::Unsorted, date(2024, 1, 8));
        let table = render_table(&render_rows(&rows, date(2024, 1, 8)), false);

        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("#  Assignment"));
        assert!(lines[1].starts_with("1  Essay"));
        assert!(lines[1].contains("Upcoming"));
        assert!(lines[2].contains("Done"));
        assert!(lines[3].contains("No due date"));
        assert!(!table.contains('\u{1b}'));

        // Status column starts at the same offset on every line
        let offset = lines[0].find("Status").unwrap();
        assert_eq!(lines[1].find("Upcoming"), Some(offset));
        assert_eq!(lines[3].find("No due date"), Some(offset));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_table(&[], false), "No tasks\n");
    }
}
