//! CLI command definitions for todo-forest
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod placement;
pub mod todo;

use crate::format::OutputFormat;
use crate::types::{TodoId, parse_todo_id};
use clap::{Parser, Subcommand};
use placement::{DropArgs, MoveArgs};
use std::path::PathBuf;
use todo::{AddArgs, UpdateArgs};

/// Hierarchical to-do list with ordering and critical-path scheduling
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Output format: json or markdown (overrides config)
    #[arg(short, long, global = true, value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a todo at the end of the root list
    Add(AddArgs),

    /// List all todos, newest first
    List,

    /// Show the forest with earliest-start offsets and the critical path
    Tree,

    /// Show a single todo
    Show {
        #[arg(value_parser = parse_todo_id)]
        id: TodoId,
    },

    /// Edit a todo's title, duration, due date or image
    Update(UpdateArgs),

    /// Reparent and/or reorder a todo
    Move(MoveArgs),

    /// Move a todo the way a drag-and-drop gesture would
    Drop(DropArgs),

    /// Delete a todo; its children move up into its place
    Delete {
        #[arg(value_parser = parse_todo_id)]
        id: TodoId,
    },

    /// Show the critical path
    Path,

    /// Verify every sibling list is numbered 0..n-1
    Check {
        /// Renumber any list that is not
        #[arg(long)]
        repair: bool,
    },
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    OutputFormat::from_str(s).ok_or_else(|| format!("unknown format '{}' (json, markdown)", s))
}
