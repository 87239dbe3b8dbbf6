// Filter and sort modes for the task list view

use crate::error::TrackerError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Which date-relative subset of tasks to show
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    All,
    Overdue,
    Today,
    Upcoming,
}

impl FilterMode {
    pub const VARIANTS: [FilterMode; 4] = [
        FilterMode::All,
        FilterMode::Overdue,
        FilterMode::Today,
        FilterMode::Upcoming,
    ];

    /// Whether a due date passes this filter
    ///
    /// Undated tasks only pass `All`.
    pub fn matches(self, due_date: Option<NaiveDate>, reference: NaiveDate) -> bool {
        let Some(due) = due_date else {
            return self == FilterMode::All;
        };
        match self {
            FilterMode::All => true,
            FilterMode::Overdue => due < reference,
            FilterMode::Today => due == reference,
            FilterMode::Upcoming => due > reference,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterMode::All => "all",
            FilterMode::Overdue => "overdue",
            FilterMode::Today => "today",
            FilterMode::Upcoming => "upcoming",
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterMode {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::VARIANTS
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TrackerError::InvalidMode {
                kind: "filter",
                value: s.to_string(),
            })
    }
}

/// Ordering applied to the filtered tasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Keep backing-list order (serialized as "none")
    #[default]
    #[serde(rename = "none")]
    Unsorted,
    Asc,
    Desc,
}

impl SortMode {
    pub const VARIANTS: [SortMode; 3] = [SortMode::Unsorted, SortMode::Asc, SortMode::Desc];

    /// Compare two due dates under this mode
    ///
    /// Undated tasks sink to the bottom in both directions.
    pub fn compare_due(self, a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => match self {
                SortMode::Unsorted => Ordering::Equal,
                SortMode::Asc => a.cmp(&b),
                SortMode::Desc => b.cmp(&a),
            },
            _ if self == SortMode::Unsorted => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::Unsorted => "none",
            SortMode::Asc => "asc",
            SortMode::Desc => "desc",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::VARIANTS
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TrackerError::InvalidMode {
                kind: "sort",
                value: s.to_string(),
            })
    }
}

/// Current filter and sort selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewState {
    pub filter: FilterMode,
    pub sort: SortMode,
}

impl ViewState {
    /// Reset to `all` / `none`
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
