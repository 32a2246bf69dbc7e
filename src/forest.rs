//! Arena view over a snapshot of all todos.
//!
//! Todos live in a flat map keyed by id. Parent links are plain ids and child
//! lists are derived on demand by filtering on `depended_by_id`, so no node
//! owns another.

use crate::error::{Result, TodoError};
use crate::order::Step;
use crate::types::{DropTarget, MovePayload, Todo, TodoId, TodoTree};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use tracing::warn;

/// Child lists keyed by parent id (`None` is the root group), each sorted by order.
pub type ChildIndex = HashMap<Option<TodoId>, Vec<TodoId>>;

/// A sibling group whose orders are not exactly `0..n-1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderViolation {
    pub parent: Option<TodoId>,
    /// Orders as stored, ascending.
    pub orders: Vec<u32>,
}

impl fmt::Display for OrderViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parent {
            Some(id) => write!(f, "children of {}", id)?,
            None => write!(f, "root todos")?,
        }
        write!(f, " have orders {:?}, expected 0..{}", self.orders, self.orders.len())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Forest {
    todos: HashMap<TodoId, Todo>,
    /// Negative orders written by a partially applied plan.
    staged: HashMap<TodoId, i64>,
}

impl Forest {
    pub fn from_todos<I: IntoIterator<Item = Todo>>(todos: I) -> Self {
        Self {
            todos: todos.into_iter().map(|t| (t.id, t)).collect(),
            staged: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    pub fn get(&self, id: TodoId) -> Option<&Todo> {
        self.todos.get(&id)
    }

    /// Like `get`, but a missing id is a `NotFound` error.
    pub fn require(&self, id: TodoId) -> Result<&Todo> {
        self.todos.get(&id).ok_or(TodoError::NotFound(id))
    }

    pub fn todos(&self) -> impl Iterator<Item = &Todo> {
        self.todos.values()
    }

    /// Todos sharing `parent`, sorted by order (id breaks ties).
    pub fn siblings(&self, parent: Option<TodoId>) -> Vec<&Todo> {
        let mut siblings: Vec<&Todo> = self
            .todos
            .values()
            .filter(|t| t.depended_by_id == parent)
            .collect();
        siblings.sort_by_key(|t| (t.order, t.id));
        siblings
    }

    pub fn sibling_ids(&self, parent: Option<TodoId>) -> Vec<TodoId> {
        self.siblings(parent).into_iter().map(|t| t.id).collect()
    }

    /// Whether the listed todos sit at orders `0..n-1` in list order.
    pub fn is_contiguous(&self, ids: &[TodoId]) -> bool {
        ids.iter()
            .enumerate()
            .all(|(pos, id)| self.get(*id).is_some_and(|t| t.order as usize == pos))
    }

    /// Root todos in order. A todo whose parent id does not resolve is treated as a root.
    pub fn roots(&self) -> Vec<&Todo> {
        let mut roots: Vec<&Todo> = self
            .todos
            .values()
            .filter(|t| match t.depended_by_id {
                None => true,
                Some(parent) if !self.todos.contains_key(&parent) => {
                    warn!(id = t.id, parent, "Todo references a missing parent; treating it as a root");
                    true
                }
                Some(_) => false,
            })
            .collect();
        roots.sort_by_key(|t| (t.depended_by_id.is_some(), t.order, t.id));
        roots
    }

    /// Build every child list in one pass.
    pub fn child_index(&self) -> ChildIndex {
        let mut index: HashMap<Option<TodoId>, Vec<&Todo>> = HashMap::new();
        for todo in self.todos.values() {
            index.entry(todo.depended_by_id).or_default().push(todo);
        }
        index
            .into_iter()
            .map(|(parent, mut todos)| {
                todos.sort_by_key(|t| (t.order, t.id));
                (parent, todos.into_iter().map(|t| t.id).collect())
            })
            .collect()
    }

    /// All todos below `id`, not including `id` itself.
    pub fn descendants(&self, id: TodoId) -> HashSet<TodoId> {
        let children = self.child_index();
        let mut found = HashSet::new();
        let mut queue: VecDeque<TodoId> = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            for child in children.get(&Some(current)).into_iter().flatten() {
                if *child != id && found.insert(*child) {
                    queue.push_back(*child);
                }
            }
        }

        found
    }

    /// Reject a reparent that would make `id` its own ancestor.
    pub fn check_reparent(&self, id: TodoId, new_parent: Option<TodoId>) -> Result<()> {
        self.require(id)?;
        let Some(parent) = new_parent else {
            return Ok(());
        };
        self.require(parent)?;
        if parent == id || self.descendants(id).contains(&parent) {
            return Err(TodoError::Cycle { id, parent });
        }
        Ok(())
    }

    /// Nest the snapshot into trees, roots and children sorted by order.
    pub fn build_tree(&self) -> Vec<TodoTree> {
        fn nest(
            forest: &Forest,
            children: &ChildIndex,
            id: TodoId,
            seen: &mut HashSet<TodoId>,
        ) -> Option<TodoTree> {
            if !seen.insert(id) {
                return None;
            }
            let todo = forest.get(id)?.clone();
            let kids = children
                .get(&Some(id))
                .into_iter()
                .flatten()
                .filter_map(|child| nest(forest, children, *child, seen))
                .collect();
            Some(TodoTree {
                todo,
                children: kids,
            })
        }

        let children = self.child_index();
        let mut seen = HashSet::new();
        self.roots()
            .into_iter()
            .filter_map(|root| nest(self, &children, root.id, &mut seen))
            .collect()
    }

    /// Sibling groups whose orders are not exactly `0..n-1`.
    pub fn order_violations(&self) -> Vec<OrderViolation> {
        let mut groups: BTreeMap<Option<TodoId>, Vec<u32>> = BTreeMap::new();
        for todo in self.todos.values() {
            groups.entry(todo.depended_by_id).or_default().push(todo.order);
        }

        groups
            .into_iter()
            .filter_map(|(parent, mut orders)| {
                orders.sort_unstable();
                let contiguous = orders.iter().enumerate().all(|(i, o)| *o as usize == i);
                (!contiguous).then_some(OrderViolation { parent, orders })
            })
            .collect()
    }

    /// Translate a drag-and-drop gesture into a move payload.
    ///
    /// Returns `None` when the drop would leave `active` where it is.
    pub fn resolve_drop(&self, active: TodoId, target: DropTarget) -> Result<Option<MovePayload>> {
        let todo = self.require(active)?;

        let payload = match target {
            DropTarget::Onto(over) => {
                if over == active {
                    return Ok(None);
                }
                self.require(over)?;
                MovePayload::new(Some(over), 0)
            }
            DropTarget::After(after) => {
                if after == active {
                    return Ok(None);
                }
                let anchor = self.require(after)?;
                let mut index = i64::from(anchor.order) + 1;
                // Removing `active` first shifts every later sibling down by one.
                if anchor.depended_by_id == todo.depended_by_id && anchor.order > todo.order {
                    index -= 1;
                }
                MovePayload::new(anchor.depended_by_id, index)
            }
            DropTarget::BeginningOf(parent) => MovePayload::new(parent, 0),
        };

        self.check_reparent(active, payload.new_parent_id)?;

        let unchanged = payload.new_parent_id == todo.depended_by_id
            && payload.target_index == i64::from(todo.order);
        Ok((!unchanged).then_some(payload))
    }

    /// Apply one planned step to the snapshot, enforcing the same constraints
    /// as the store: unique `(parent, order)` slots and existing parents.
    pub fn apply_step(&mut self, step: &Step) -> Result<()> {
        match *step {
            Step::Write { id, parent, order } => {
                self.require(id)?;
                if let Some(parent) = parent
                    && !self.todos.contains_key(&parent)
                {
                    return Err(TodoError::TransactionFailure(format!(
                        "FOREIGN KEY constraint failed: parent {} of todo {}",
                        parent, id
                    )));
                }
                if let Some(holder) = self.slot_holder(parent, order, id) {
                    return Err(TodoError::TransactionFailure(format!(
                        "UNIQUE constraint failed: todo {} already holds order {} under {:?}",
                        holder, order, parent
                    )));
                }

                if let Some(todo) = self.todos.get_mut(&id) {
                    todo.depended_by_id = parent;
                    match u32::try_from(order) {
                        Ok(order) => {
                            todo.order = order;
                            self.staged.remove(&id);
                        }
                        Err(_) => {
                            self.staged.insert(id, order);
                        }
                    }
                }
                Ok(())
            }
            Step::Delete { id } => {
                self.require(id)?;
                if let Some(child) = self.todos.values().find(|t| t.depended_by_id == Some(id)) {
                    return Err(TodoError::TransactionFailure(format!(
                        "FOREIGN KEY constraint failed: todo {} still references {}",
                        child.id, id
                    )));
                }
                self.todos.remove(&id);
                self.staged.remove(&id);
                Ok(())
            }
        }
    }

    /// Whether every todo holds a final, non-negative order.
    pub fn is_settled(&self) -> bool {
        self.staged.is_empty()
    }

    fn slot(&self, todo: &Todo) -> i64 {
        self.staged
            .get(&todo.id)
            .copied()
            .unwrap_or(i64::from(todo.order))
    }

    fn slot_holder(&self, parent: Option<TodoId>, order: i64, except: TodoId) -> Option<TodoId> {
        self.todos
            .values()
            .find(|t| t.id != except && t.depended_by_id == parent && self.slot(t) == order)
            .map(|t| t.id)
    }
}
