//! Critical path over the todo forest.
//!
//! A todo's earliest-start offset is the longest chain of durations among its
//! descendants: nothing below it has to wait, so it can only begin once its
//! longest child chain is done. The critical path is the root-to-leaf chain
//! with the largest total duration.

use crate::error::{Result, TodoError};
use crate::forest::Forest;
use crate::types::TodoId;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalPath {
    /// Days each todo waits on its descendants (0 for leaves).
    pub earliest_start: BTreeMap<TodoId, u64>,
    /// Ids from the winning root down to a leaf.
    pub path: Vec<TodoId>,
    /// Sum of durations along `path`.
    pub total_duration: u64,
}

impl CriticalPath {
    pub fn contains(&self, id: TodoId) -> bool {
        self.path.contains(&id)
    }

    pub fn offset(&self, id: TodoId) -> Option<u64> {
        self.earliest_start.get(&id).copied()
    }
}

/// Longest chain starting at a todo, and the child it continues through.
#[derive(Debug, Clone, Copy)]
struct Link {
    total: u64,
    next: Option<TodoId>,
}

enum Visit {
    Enter(TodoId),
    Exit(TodoId),
}

/// Compute earliest-start offsets and the critical path of a snapshot.
///
/// Ties go to the first child (and first root) in sibling order; any of the
/// tied chains is equally critical. A parent relation that loops fails with
/// `CycleDetected` instead of being walked.
pub fn compute(forest: &Forest) -> Result<CriticalPath> {
    let children = forest.child_index();
    let roots: Vec<TodoId> = forest.roots().iter().map(|t| t.id).collect();

    let mut links: HashMap<TodoId, Link> = HashMap::with_capacity(forest.len());
    let mut earliest_start = BTreeMap::new();
    let mut stack: Vec<Visit> = roots.iter().rev().map(|id| Visit::Enter(*id)).collect();

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(id) => {
                if links.contains_key(&id) {
                    return Err(TodoError::CycleDetected(id));
                }
                stack.push(Visit::Exit(id));
                for child in children.get(&Some(id)).into_iter().flatten().rev() {
                    stack.push(Visit::Enter(*child));
                }
            }
            Visit::Exit(id) => {
                let mut best: Option<(TodoId, u64)> = None;
                for child in children.get(&Some(id)).into_iter().flatten() {
                    let total = links.get(child).map_or(0, |l| l.total);
                    if best.is_none_or(|(_, b)| total > b) {
                        best = Some((*child, total));
                    }
                }
                let offset = best.map_or(0, |(_, total)| total);
                let duration = forest.get(id).map_or(0, |t| u64::from(t.duration));
                earliest_start.insert(id, offset);
                links.insert(
                    id,
                    Link {
                        total: duration + offset,
                        next: best.map(|(child, _)| child),
                    },
                );
            }
        }
    }

    // Every todo on a loop has an ancestor chain that never reaches a root.
    if links.len() != forest.len() {
        let stuck = forest
            .todos()
            .map(|t| t.id)
            .filter(|id| !links.contains_key(id))
            .min();
        if let Some(id) = stuck {
            return Err(TodoError::CycleDetected(id));
        }
    }

    let mut winner: Option<(TodoId, u64)> = None;
    for root in &roots {
        let total = links.get(root).map_or(0, |l| l.total);
        if winner.is_none_or(|(_, b)| total > b) {
            winner = Some((*root, total));
        }
    }

    let mut path = Vec::new();
    let mut cursor = winner.map(|(root, _)| root);
    while let Some(id) = cursor {
        path.push(id);
        cursor = links.get(&id).and_then(|l| l.next);
    }
    let total_duration = winner.map_or(0, |(_, total)| total);

    debug!(todos = forest.len(), ?path, total_duration, "Computed critical path");
    Ok(CriticalPath {
        earliest_start,
        path,
        total_duration,
    })
}
