//! Sibling order maintenance.
//!
//! Every planner reads a [`Forest`] snapshot and returns the row writes that
//! carry out one mutation. Applied in sequence, the steps never put two todos
//! of the same parent on the same order, so they can run against a store that
//! enforces that as a unique constraint. Negative orders are staging slots and
//! never outlive a plan.
//!
//! - insert: shift the tail up, highest position first, then place the node.
//! - remove: stage the merged list on distinct negative slots, delete, renumber.
//! - move: stage the node, close the gap it leaves, then insert.

use crate::error::Result;
use crate::forest::Forest;
use crate::types::{MovePayload, TodoId};
use serde::Serialize;
use tracing::{debug, warn};

/// Slot a moved todo waits in while its old and new lists are renumbered.
pub const STAGING_ORDER: i64 = -1;

/// One row write in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Write {
        id: TodoId,
        parent: Option<TodoId>,
        order: i64,
    },
    Delete {
        id: TodoId,
    },
}

/// Distinct staging slots for bulk renumbering; never equal to `STAGING_ORDER`.
fn staging_slot(position: usize) -> i64 {
    -2 - position as i64
}

fn write(id: TodoId, parent: Option<TodoId>, order: usize) -> Step {
    Step::Write {
        id,
        parent,
        order: order as i64,
    }
}

/// Insert `node` into `siblings` at `index` (clamped to the list length).
///
/// `siblings` is the parent's list in order, currently numbered `0..len-1`, and
/// must not hold `node`'s slot. Positions at or after `index` move up by one,
/// written from the highest position down so each write lands on a free slot.
pub fn plan_insert(
    siblings: &[TodoId],
    parent: Option<TodoId>,
    index: usize,
    node: TodoId,
) -> Vec<Step> {
    let siblings: Vec<TodoId> = siblings.iter().copied().filter(|id| *id != node).collect();
    let index = index.min(siblings.len());

    let mut steps: Vec<Step> = (index..siblings.len())
        .rev()
        .map(|pos| write(siblings[pos], parent, pos + 1))
        .collect();
    steps.push(write(node, parent, index));
    steps
}

/// Renumber a whole sibling list to `0..n-1` through staging slots.
///
/// Safe whatever the current orders are, as long as `ids` is the full group.
pub fn plan_renumber(ids: &[TodoId], parent: Option<TodoId>) -> Vec<Step> {
    let staged = ids.iter().enumerate().map(|(pos, id)| Step::Write {
        id: *id,
        parent,
        order: staging_slot(pos),
    });
    let settled = ids.iter().enumerate().map(|(pos, id)| write(*id, parent, pos));
    staged.chain(settled).collect()
}

/// Delete `id`, promoting its children into its parent at its former position.
pub fn plan_remove(forest: &Forest, id: TodoId) -> Result<Vec<Step>> {
    let todo = forest.require(id)?;
    let parent = todo.depended_by_id;

    let mut merged = forest.sibling_ids(parent);
    let at = merged.iter().position(|s| *s == id).unwrap_or(merged.len());
    merged.retain(|s| *s != id);
    let children = forest.sibling_ids(Some(id));
    let promoted = children.len();
    merged.splice(at..at, children);

    let mut steps: Vec<Step> = merged
        .iter()
        .enumerate()
        .map(|(pos, sibling)| Step::Write {
            id: *sibling,
            parent,
            order: staging_slot(pos),
        })
        .collect();
    steps.push(Step::Delete { id });
    steps.extend(merged.iter().enumerate().map(|(pos, sibling)| write(*sibling, parent, pos)));

    debug!(id, ?parent, at, promoted, steps = steps.len(), "Planned remove");
    Ok(steps)
}

/// Move `id` under `payload.new_parent_id` at `payload.target_index`.
///
/// The index counts positions in the target list with `id` already taken
/// out, so same-parent moves and cross-parent moves share one path. Moving a
/// todo to where it already is plans nothing.
pub fn plan_move(forest: &Forest, id: TodoId, payload: &MovePayload) -> Result<Vec<Step>> {
    let todo = forest.require(id)?;
    let index = payload.index()?;
    let old_parent = todo.depended_by_id;
    let new_parent = payload.new_parent_id;
    forest.check_reparent(id, new_parent)?;

    let old_list = forest.sibling_ids(old_parent);
    let old_pos = old_list.iter().position(|s| *s == id).unwrap_or(0);
    let old_contiguous = forest.is_contiguous(&old_list);
    let remaining: Vec<TodoId> = old_list.iter().copied().filter(|s| *s != id).collect();

    let target: Vec<TodoId> = if new_parent == old_parent {
        remaining.clone()
    } else {
        forest.sibling_ids(new_parent)
    };
    let index = index.min(target.len());

    if new_parent == old_parent && index == old_pos && old_contiguous {
        debug!(id, index, "Move leaves todo in place");
        return Ok(Vec::new());
    }

    let mut steps = vec![Step::Write {
        id,
        parent: new_parent,
        order: STAGING_ORDER,
    }];

    // Close the gap: later siblings step down, lowest first, into the slot just freed.
    if old_contiguous {
        steps.extend(
            remaining
                .iter()
                .enumerate()
                .skip(old_pos)
                .map(|(pos, sibling)| write(*sibling, old_parent, pos)),
        );
    } else {
        warn!(parent = ?old_parent, "Sibling orders were not contiguous; renumbering");
        steps.extend(plan_renumber(&remaining, old_parent));
    }

    if new_parent != old_parent && !forest.is_contiguous(&target) {
        warn!(parent = ?new_parent, "Sibling orders were not contiguous; renumbering");
        steps.extend(plan_renumber(&target, new_parent));
    }

    steps.extend(plan_insert(&target, new_parent, index, id));

    debug!(
        id,
        ?old_parent,
        ?new_parent,
        index,
        steps = steps.len(),
        "Planned move"
    );
    Ok(steps)
}

/// Renumber every sibling group whose orders drifted from `0..n-1`.
pub fn plan_repair(forest: &Forest) -> Vec<Step> {
    forest
        .order_violations()
        .iter()
        .flat_map(|violation| plan_renumber(&forest.sibling_ids(violation.parent), violation.parent))
        .collect()
}
