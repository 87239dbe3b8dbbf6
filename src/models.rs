// Data models for the assignment tracker

use crate::error::TrackerError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Date format used for due dates on the wire and in form input
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Stable task identifier, assigned at creation
///
/// UUIDv7, so ids also sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Placeholder for stored records written without an id
    ///
    /// [`crate::Tracker::open`] replaces it with a fresh id and saves.
    pub const UNASSIGNED: TaskId = TaskId(Uuid::nil());

    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn is_unassigned(&self) -> bool {
        self.0.is_nil()
    }

    /// First 8 hex characters, as shown in listings
    pub fn short(&self) -> String {
        let mut s = self.0.simple().to_string();
        s.truncate(8);
        s
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// One assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawTask")]
pub struct Task {
    pub id: TaskId,
    pub assignment: String,
    #[serde(serialize_with = "due_date_serde::serialize")]
    pub due_date: Option<NaiveDate>,
    /// Class or course label
    #[serde(rename = "class", serialize_with = "optional_text::serialize")]
    pub subject: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub done: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Stored shape of a task, accepting both spellings of the done flag and class
///
/// A record may carry `done` and `completed` at once; either one being true
/// marks the task done. `class` wins over `className` when both are set.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTask {
    #[serde(default)]
    id: Option<TaskId>,
    assignment: String,
    #[serde(default, deserialize_with = "due_date_serde::deserialize")]
    due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_text::deserialize")]
    class: Option<String>,
    #[serde(default, deserialize_with = "optional_text::deserialize")]
    class_name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "optional_text::deserialize")]
    kind: Option<String>,
    #[serde(default)]
    done: Option<bool>,
    #[serde(default)]
    completed: Option<bool>,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    updated_at: i64,
}

impl From<RawTask> for Task {
    fn from(raw: RawTask) -> Self {
        Self {
            id: raw.id.unwrap_or(TaskId::UNASSIGNED),
            assignment: raw.assignment,
            due_date: raw.due_date,
            subject: raw.class.or(raw.class_name),
            kind: raw.kind.unwrap_or_default(),
            done: raw.done.unwrap_or(false) || raw.completed.unwrap_or(false),
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        }
    }
}

impl Task {
    /// Build a new, not-done task from validated form fields
    pub fn from_fields(fields: &TaskFields, now: i64) -> Result<Self, TrackerError> {
        let valid = fields.validate()?;
        Ok(Self {
            id: TaskId::new(),
            assignment: valid.assignment,
            due_date: Some(valid.due_date),
            subject: valid.subject,
            kind: valid.kind,
            done: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Overwrite the editable fields in place, keeping id, done flag and creation time
    pub fn apply_fields(&mut self, fields: &TaskFields, now: i64) -> Result<(), TrackerError> {
        let valid = fields.validate()?;
        self.assignment = valid.assignment;
        self.due_date = Some(valid.due_date);
        self.subject = valid.subject;
        self.kind = valid.kind;
        self.updated_at = now;
        Ok(())
    }
}

/// Raw form input for creating or editing a task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFields {
    pub assignment: String,
    /// Due date as typed, `YYYY-MM-DD`
    pub due_date: String,
    pub subject: String,
    pub kind: String,
}

struct ValidFields {
    assignment: String,
    due_date: NaiveDate,
    subject: Option<String>,
    kind: String,
}

impl TaskFields {
    pub fn new(assignment: impl Into<String>, due_date: impl Into<String>) -> Self {
        Self {
            assignment: assignment.into(),
            due_date: due_date.into(),
            ..Self::default()
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    fn validate(&self) -> Result<ValidFields, TrackerError> {
        let assignment = self.assignment.trim();
        if assignment.is_empty() {
            return Err(TrackerError::Validation("Assignment is required".to_string()));
        }

        let due_date = self.due_date.trim();
        if due_date.is_empty() {
            return Err(TrackerError::Validation("Due date is required".to_string()));
        }

        let subject = self.subject.trim();
        Ok(ValidFields {
            assignment: assignment.to_string(),
            due_date: parse_due_date(due_date)?,
            subject: (!subject.is_empty()).then(|| subject.to_string()),
            kind: self.kind.trim().to_string(),
        })
    }
}

impl From<&Task> for TaskFields {
    fn from(task: &Task) -> Self {
        Self {
            assignment: task.assignment.clone(),
            due_date: task
                .due_date
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            subject: task.subject.clone().unwrap_or_default(),
            kind: task.kind.clone(),
        }
    }
}

/// Parse a due date, discarding any time-of-day component
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and `YYYY-MM-DDTHH:MM[:SS]`.
pub fn parse_due_date(text: &str) -> Result<NaiveDate, TrackerError> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, DATE_FORMAT) {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(dt.date());
        }
    }
    Err(TrackerError::Validation(format!(
        "Invalid due date: {} (expected YYYY-MM-DD)",
        text
    )))
}

/// Display status of a task relative to a reference date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Done,
    Overdue,
    Today,
    Upcoming,
    NoDueDate,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Done => "Done",
            Status::Overdue => "Overdue",
            Status::Today => "Today",
            Status::Upcoming => "Upcoming",
            Status::NoDueDate => "No due date",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Current timestamp in milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

// Unset due dates are stored as "" to match the persisted shape
mod due_date_serde {
    use super::{DATE_FORMAT, parse_due_date};
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => serializer.serialize_str(&d.format(DATE_FORMAT).to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => parse_due_date(text).map(Some).map_err(serde::de::Error::custom),
        }
    }
}

mod optional_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(text: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(text.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()))
    }
}
