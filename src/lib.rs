//! todo-forest library
//!
//! A todo store where every todo may depend on one parent todo. Sibling lists
//! stay densely ordered through every insert, delete and move, and the
//! critical path through the forest gives each todo its earliest start.

pub mod cli;
pub mod config;
pub mod critical_path;
pub mod db;
pub mod error;
pub mod forest;
pub mod format;
pub mod logging;
pub mod order;
pub mod types;
