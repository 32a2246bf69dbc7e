//! Core types for the todo forest.

use crate::error::{Result, TodoError};
use chrono::NaiveDate;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store-assigned todo identifier.
pub type TodoId = i64;

/// A todo. `depended_by_id` is the parent; `None` places it in the root group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub due_date: Option<NaiveDate>,
    #[serde(rename = "imgURL")]
    pub img_url: Option<String>,
    /// Duration in days.
    pub duration: u32,
    pub depended_by_id: Option<TodoId>,
    /// Zero-based position among the todos sharing `depended_by_id`.
    pub order: u32,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// A todo with its children for tree output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoTree {
    #[serde(flatten)]
    pub todo: Todo,
    pub children: Vec<TodoTree>,
}

/// Input for creating a todo. New todos always land at the end of the root group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub title: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default, rename = "imgURL")]
    pub img_url: Option<String>,
    #[serde(default)]
    pub duration: i64,
}

impl NewTodo {
    pub fn new(title: impl Into<String>, duration: i64) -> Self {
        Self {
            title: title.into(),
            due_date: None,
            img_url: None,
            duration,
        }
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_img_url(mut self, img_url: impl Into<String>) -> Self {
        self.img_url = Some(img_url.into());
        self
    }
}

/// Partial update of a todo. Outer `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct TodoUpdate {
    pub title: Option<String>,
    pub due_date: Option<Option<NaiveDate>>,
    pub img_url: Option<Option<String>>,
    pub duration: Option<i64>,
    /// New parent and position; runs the move algorithm when set.
    pub placement: Option<MovePayload>,
}

/// Mutation payload for a move, as exchanged with the API layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePayload {
    pub new_parent_id: Option<TodoId>,
    pub target_index: i64,
}

impl MovePayload {
    pub fn new(new_parent_id: Option<TodoId>, target_index: i64) -> Self {
        Self {
            new_parent_id,
            target_index,
        }
    }

    /// Target index as a list position. Negative indices are rejected.
    pub fn index(&self) -> Result<usize> {
        usize::try_from(self.target_index)
            .map_err(|_| TodoError::invalid("targetIndex", "must not be negative"))
    }
}

/// Where a dragged todo was dropped.
///
/// The string form matches the drop zone identifiers of the UI:
/// `<id>`, `after-<id>` and `beginningOf-<id|null>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    /// Dropped onto a todo: becomes its first child.
    Onto(TodoId),
    /// Dropped into the gap after a todo: becomes its next sibling.
    After(TodoId),
    /// Dropped at the head of a child list, or of the root list for `None`.
    BeginningOf(Option<TodoId>),
}

impl FromStr for DropTarget {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix("after-") {
            return Ok(DropTarget::After(parse_todo_id(rest)?));
        }
        if let Some(rest) = s.strip_prefix("beginningOf-") {
            return match rest {
                "null" => Ok(DropTarget::BeginningOf(None)),
                id => Ok(DropTarget::BeginningOf(Some(parse_todo_id(id)?))),
            };
        }
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(DropTarget::Onto(parse_todo_id(s)?));
        }
        Err(TodoError::invalid(
            "target",
            format!("'{}' is not a drop target (expected <id>, after-<id> or beginningOf-<id|null>)", s),
        ))
    }
}

impl fmt::Display for DropTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropTarget::Onto(id) => write!(f, "{}", id),
            DropTarget::After(id) => write!(f, "after-{}", id),
            DropTarget::BeginningOf(Some(id)) => write!(f, "beginningOf-{}", id),
            DropTarget::BeginningOf(None) => write!(f, "beginningOf-null"),
        }
    }
}

/// Parse a todo id from user input.
pub fn parse_todo_id(s: &str) -> Result<TodoId> {
    s.trim()
        .parse()
        .map_err(|_| TodoError::invalid("id", format!("'{}' is not a numeric id", s)))
}

/// Parse a due date in `YYYY-MM-DD` form.
pub fn parse_due_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    let shape_ok = Regex::new(r"^\d{4}-\d{2}-\d{2}$").is_ok_and(|re| re.is_match(s));
    if !shape_ok {
        return Err(TodoError::invalid("dueDate", format!("'{}' is not in YYYY-MM-DD form", s)));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| TodoError::invalid("dueDate", format!("'{}' is not a calendar date", s)))
}

/// Check a title is present once surrounding whitespace is ignored.
pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(TodoError::invalid("title", "title is required"));
    }
    Ok(())
}

/// Check a duration is a non-negative number of days that fits the store.
pub fn validate_duration(duration: i64) -> Result<u32> {
    if duration < 0 {
        return Err(TodoError::invalid("duration", "must not be negative"));
    }
    u32::try_from(duration).map_err(|_| TodoError::invalid("duration", "too large"))
}
