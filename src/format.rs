//! Output formatting utilities for markdown and JSON.

use crate::critical_path::CriticalPath;
use crate::forest::{Forest, OrderViolation};
use crate::types::{Todo, TodoTree};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    #[default]
    Markdown,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }
}

/// Format a single todo as markdown.
pub fn format_todo_markdown(todo: &Todo) -> String {
    let mut md = String::new();

    md.push_str(&format!("## Todo: {}\n", todo.title));
    md.push_str(&format!("- **id**: `{}`\n", todo.id));
    md.push_str(&format!("- **duration**: {}\n", days(u64::from(todo.duration))));

    if let Some(due) = todo.due_date {
        md.push_str(&format!("- **due**: {}\n", due));
    }

    match todo.depended_by_id {
        Some(parent) => md.push_str(&format!("- **parent**: `{}`\n", parent)),
        None => md.push_str("- **parent**: none (root)\n"),
    }
    md.push_str(&format!("- **order**: {}\n", todo.order));

    if let Some(ref img) = todo.img_url {
        md.push_str(&format!("- **image**: {}\n", img));
    }

    md
}

/// Format a flat list of todos as markdown.
pub fn format_todos_markdown(todos: &[Todo]) -> String {
    let mut md = format!("# Todos ({})\n\n", todos.len());
    for todo in todos {
        md.push_str(&format!(
            "- {} `{}` ({})\n",
            todo.title,
            todo.id,
            days(u64::from(todo.duration))
        ));
    }
    md
}

/// Format the forest as a nested list, marking the critical path.
///
/// Start dates count from `today`; due dates before it are flagged overdue.
pub fn format_tree_markdown(trees: &[TodoTree], critical: &CriticalPath, today: NaiveDate) -> String {
    fn push_node(
        md: &mut String,
        tree: &TodoTree,
        critical: &CriticalPath,
        today: NaiveDate,
        depth: usize,
    ) {
        let todo = &tree.todo;
        let marker = if critical.contains(todo.id) { "!!! " } else { "" };
        md.push_str(&format!(
            "{}- {}**{}** `{}` ({}",
            "  ".repeat(depth),
            marker,
            todo.title,
            todo.id,
            days(u64::from(todo.duration))
        ));
        if let Some(due) = todo.due_date {
            md.push_str(&format!(", due {}", due));
            if due < today {
                md.push_str(" **overdue**");
            }
        }
        let wait = critical.offset(todo.id).unwrap_or(0);
        if wait > 0 {
            match start_date(today, wait) {
                Some(start) => md.push_str(&format!(", starts {} after {}", start, days(wait))),
                None => md.push_str(&format!(", starts after {}", days(wait))),
            }
        }
        md.push_str(")\n");
        for child in &tree.children {
            push_node(md, child, critical, today, depth + 1);
        }
    }

    let mut md = String::from("# Todo tree\n\n");
    if trees.is_empty() {
        md.push_str("_No todos._\n");
        return md;
    }
    for tree in trees {
        push_node(&mut md, tree, critical, today, 0);
    }
    md.push_str(&format!(
        "\nCritical path: {} total\n",
        days(critical.total_duration)
    ));
    md
}

/// Format the critical path as a numbered chain.
pub fn format_critical_path_markdown(critical: &CriticalPath, forest: &Forest) -> String {
    let mut md = format!("# Critical path ({})\n\n", days(critical.total_duration));
    for (step, id) in critical.path.iter().enumerate() {
        let (title, duration) = forest
            .get(*id)
            .map(|t| (t.title.as_str(), u64::from(t.duration)))
            .unwrap_or(("?", 0));
        md.push_str(&format!("{}. {} `{}` ({})\n", step + 1, title, id, days(duration)));
    }
    md
}

/// Format an order check as markdown.
pub fn format_violations_markdown(violations: &[OrderViolation]) -> String {
    if violations.is_empty() {
        return "All sibling orders are contiguous.\n".to_string();
    }
    let mut md = format!("# Order violations ({})\n\n", violations.len());
    for violation in violations {
        md.push_str(&format!("- {}\n", violation));
    }
    md
}

/// Tree as JSON, each node annotated with its wait, start date and critical flag.
pub fn tree_json(trees: &[TodoTree], critical: &CriticalPath, today: NaiveDate) -> Value {
    fn node(tree: &TodoTree, critical: &CriticalPath, today: NaiveDate) -> Value {
        let mut value = serde_json::to_value(&tree.todo).unwrap_or(Value::Null);
        if let Value::Object(ref mut map) = value {
            let wait = critical.offset(tree.todo.id).unwrap_or(0);
            map.insert("durationBeforeStart".into(), json!(wait));
            map.insert("earliestStartDate".into(), json!(start_date(today, wait)));
            map.insert(
                "isPastDue".into(),
                json!(tree.todo.due_date.is_some_and(|due| due < today)),
            );
            map.insert("isCritical".into(), json!(critical.contains(tree.todo.id)));
            map.insert(
                "children".into(),
                Value::Array(
                    tree.children
                        .iter()
                        .map(|c| node(c, critical, today))
                        .collect(),
                ),
            );
        }
        value
    }

    json!({
        "todos": trees.iter().map(|t| node(t, critical, today)).collect::<Vec<_>>(),
        "criticalPath": critical.path,
        "totalDuration": critical.total_duration,
    })
}

fn start_date(today: NaiveDate, wait: u64) -> Option<NaiveDate> {
    today.checked_add_days(Days::new(wait))
}

fn days(n: u64) -> String {
    if n == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", n)
    }
}
