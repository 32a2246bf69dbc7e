//! Move and drop subcommands for todo-forest CLI

use crate::error::TodoError;
use crate::types::{DropTarget, MovePayload, TodoId, parse_todo_id};
use clap::Args;

/// Arguments for the move subcommand
#[derive(Args, Debug)]
pub struct MoveArgs {
    #[arg(value_parser = parse_todo_id)]
    pub id: TodoId,

    /// New parent; omit to move into the root list
    #[arg(long, value_parser = parse_todo_id, conflicts_with = "payload")]
    pub parent: Option<TodoId>,

    /// Position in the target list, counted with the todo taken out
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub index: i64,

    /// Raw payload, e.g. '{"newParentId": 3, "targetIndex": 0}'
    #[arg(long, value_name = "JSON", conflicts_with = "index")]
    pub payload: Option<String>,
}

impl MoveArgs {
    /// The move payload described by the flags or the raw JSON.
    pub fn payload(&self) -> Result<MovePayload, TodoError> {
        match self.payload {
            Some(ref json) => Ok(serde_json::from_str(json)?),
            None => Ok(MovePayload::new(self.parent, self.index)),
        }
    }
}

/// Arguments for the drop subcommand
#[derive(Args, Debug)]
pub struct DropArgs {
    /// The dragged todo
    #[arg(value_parser = parse_todo_id)]
    pub id: TodoId,

    /// Drop zone: <id>, after-<id>, or beginningOf-<id|null>
    #[arg(value_parser = parse_drop_target)]
    pub target: DropTarget,
}

fn parse_drop_target(s: &str) -> Result<DropTarget, TodoError> {
    s.parse()
}
