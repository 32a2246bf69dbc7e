//! Todo CRUD and order-maintaining mutations.
//!
//! Every mutation loads the forest inside its own `IMMEDIATE` transaction,
//! plans the row writes against that snapshot and applies them before
//! committing. A failing write drops the transaction, rolling back every
//! renumbering that came before it.

use super::{Database, now_ms};
use crate::critical_path::{self, CriticalPath};
use crate::error::{Result, TodoError};
use crate::forest::{Forest, OrderViolation};
use crate::order::{self, Step};
use crate::types::{
    DropTarget, MovePayload, NewTodo, Todo, TodoId, TodoTree, TodoUpdate, validate_duration,
    validate_title,
};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, Row, TransactionBehavior, params};
use tracing::{debug, info};

pub fn parse_todo_row(row: &Row) -> rusqlite::Result<Todo> {
    let due_date: Option<String> = row.get("due_date")?;
    let due_date = due_date
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
            })
        })
        .transpose()?;

    Ok(Todo {
        id: row.get("id")?,
        title: row.get("title")?,
        due_date,
        img_url: row.get("img_url")?,
        duration: row.get("duration")?,
        depended_by_id: row.get("depended_by_id")?,
        order: row.get("sibling_order")?,
        created_at: row.get("created_at")?,
    })
}

/// Internal helper to get a todo using an existing connection (avoids deadlock).
fn get_todo_internal(conn: &Connection, id: TodoId) -> Result<Option<Todo>> {
    let mut stmt = conn.prepare("SELECT * FROM todos WHERE id = ?1")?;

    match stmt.query_row(params![id], parse_todo_row) {
        Ok(todo) => Ok(Some(todo)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn require_todo_internal(conn: &Connection, id: TodoId) -> Result<Todo> {
    get_todo_internal(conn, id)?.ok_or(TodoError::NotFound(id))
}

fn load_forest_internal(conn: &Connection) -> Result<Forest> {
    let mut stmt = conn.prepare("SELECT * FROM todos")?;
    let todos = stmt
        .query_map([], parse_todo_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(Forest::from_todos(todos))
}

/// Apply planned steps in order. Stops at the first failing write.
fn apply_steps(conn: &Connection, steps: &[Step]) -> Result<()> {
    let mut write = conn.prepare_cached(
        "UPDATE todos SET depended_by_id = ?1, sibling_order = ?2 WHERE id = ?3",
    )?;
    let mut delete = conn.prepare_cached("DELETE FROM todos WHERE id = ?1")?;

    for step in steps {
        let (id, changed) = match *step {
            Step::Write { id, parent, order } => (id, write.execute(params![parent, order, id])?),
            Step::Delete { id } => (id, delete.execute(params![id])?),
        };
        if changed == 0 {
            return Err(TodoError::NotFound(id));
        }
    }

    Ok(())
}

fn move_internal(conn: &Connection, id: TodoId, payload: &MovePayload) -> Result<()> {
    let forest = load_forest_internal(conn)?;
    let steps = order::plan_move(&forest, id, payload)?;
    apply_steps(conn, &steps)
}

impl Database {
    /// Create a todo at the end of the root list.
    pub fn create_todo(&self, new: NewTodo) -> Result<Todo> {
        validate_title(&new.title)?;
        let duration = validate_duration(new.duration)?;
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let root_count: u32 = tx.query_row(
                "SELECT COUNT(*) FROM todos WHERE depended_by_id IS NULL",
                [],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT INTO todos (
                    title, due_date, img_url, duration, depended_by_id, sibling_order, created_at
                ) VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?6)",
                params![
                    &new.title,
                    new.due_date.map(|d| d.to_string()),
                    &new.img_url,
                    duration,
                    root_count,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();

            tx.commit()?;
            info!(id, order = root_count, "Created todo");

            Ok(Todo {
                id,
                title: new.title,
                due_date: new.due_date,
                img_url: new.img_url,
                duration,
                depended_by_id: None,
                order: root_count,
                created_at: now,
            })
        })
    }

    /// Get a todo by ID.
    pub fn get_todo(&self, id: TodoId) -> Result<Option<Todo>> {
        self.with_conn(|conn| get_todo_internal(conn, id))
    }

    /// All todos, newest first.
    pub fn list_todos(&self) -> Result<Vec<Todo>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM todos ORDER BY created_at DESC, id DESC")?;
            let todos = stmt
                .query_map([], parse_todo_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(todos)
        })
    }

    /// Direct children of `parent` in order; `None` lists the roots.
    pub fn get_children(&self, parent: Option<TodoId>) -> Result<Vec<Todo>> {
        self.with_conn(|conn| {
            if let Some(id) = parent {
                require_todo_internal(conn, id)?;
            }
            let mut stmt = conn.prepare(
                "SELECT * FROM todos WHERE depended_by_id IS ?1 ORDER BY sibling_order",
            )?;
            let todos = stmt
                .query_map(params![parent], parse_todo_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(todos)
        })
    }

    /// Snapshot of every todo for tree and path computations.
    pub fn load_forest(&self) -> Result<Forest> {
        self.with_conn(load_forest_internal)
    }

    /// The whole forest nested by parent.
    pub fn get_tree(&self) -> Result<Vec<TodoTree>> {
        Ok(self.load_forest()?.build_tree())
    }

    /// Earliest-start offsets and the critical path of the current forest.
    pub fn critical_path(&self) -> Result<CriticalPath> {
        critical_path::compute(&self.load_forest()?)
    }

    /// Sibling groups whose orders are not `0..n-1`.
    pub fn order_violations(&self) -> Result<Vec<OrderViolation>> {
        Ok(self.load_forest()?.order_violations())
    }

    /// Update a todo's fields and, when the update carries a placement, move it.
    pub fn update_todo(&self, id: TodoId, update: TodoUpdate) -> Result<Todo> {
        if let Some(ref title) = update.title {
            validate_title(title)?;
        }
        let duration = update.duration.map(validate_duration).transpose()?;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let todo = require_todo_internal(&tx, id)?;

            let title = update.title.unwrap_or(todo.title);
            let due_date = update.due_date.unwrap_or(todo.due_date);
            let img_url = update.img_url.unwrap_or(todo.img_url);
            let duration = duration.unwrap_or(todo.duration);

            tx.execute(
                "UPDATE todos SET title = ?1, due_date = ?2, img_url = ?3, duration = ?4
                 WHERE id = ?5",
                params![title, due_date.map(|d| d.to_string()), img_url, duration, id],
            )?;

            if let Some(ref payload) = update.placement {
                move_internal(&tx, id, payload)?;
            }

            let updated = require_todo_internal(&tx, id)?;
            tx.commit()?;
            info!(id, moved = update.placement.is_some(), "Updated todo");
            Ok(updated)
        })
    }

    /// Reparent and/or reorder a todo.
    pub fn move_todo(&self, id: TodoId, payload: MovePayload) -> Result<Todo> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            move_internal(&tx, id, &payload)?;
            let moved = require_todo_internal(&tx, id)?;
            tx.commit()?;
            info!(
                id,
                parent = ?moved.depended_by_id,
                order = moved.order,
                "Moved todo"
            );
            Ok(moved)
        })
    }

    /// Move a todo according to a drop target.
    ///
    /// Returns `None` when the drop leaves the todo where it was.
    pub fn drop_todo(&self, id: TodoId, target: DropTarget) -> Result<Option<Todo>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let forest = load_forest_internal(&tx)?;

            let Some(payload) = forest.resolve_drop(id, target)? else {
                debug!(id, %target, "Drop leaves todo in place");
                return Ok(None);
            };

            let steps = order::plan_move(&forest, id, &payload)?;
            apply_steps(&tx, &steps)?;
            let moved = require_todo_internal(&tx, id)?;
            tx.commit()?;
            info!(id, %target, ?payload, "Dropped todo");
            Ok(Some(moved))
        })
    }

    /// Delete a todo, promoting its children into its parent at its position.
    pub fn delete_todo(&self, id: TodoId) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let forest = load_forest_internal(&tx)?;
            let steps = order::plan_remove(&forest, id)?;
            apply_steps(&tx, &steps)?;
            tx.commit()?;
            info!(id, "Deleted todo");
            Ok(())
        })
    }

    /// Renumber any sibling group whose orders drifted. Returns the groups fixed.
    pub fn repair_orders(&self) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let forest = load_forest_internal(&tx)?;
            let broken = forest.order_violations().len();
            if broken == 0 {
                return Ok(0);
            }
            apply_steps(&tx, &order::plan_repair(&forest))?;
            tx.commit()?;
            info!(groups = broken, "Repaired sibling orders");
            Ok(broken)
        })
    }
}
