//! Add and update subcommands for todo-forest CLI

use crate::types::{NewTodo, TodoId, TodoUpdate, parse_due_date, parse_todo_id};
use chrono::NaiveDate;
use clap::Args;

/// Arguments for the add subcommand
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Title of the todo
    pub title: String,

    /// Duration in days
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub duration: i64,

    /// Due date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_due_date)]
    pub due: Option<NaiveDate>,

    /// Image URL to attach
    #[arg(long)]
    pub image: Option<String>,
}

impl AddArgs {
    pub fn into_new_todo(self) -> NewTodo {
        NewTodo {
            title: self.title,
            due_date: self.due,
            img_url: self.image,
            duration: self.duration,
        }
    }
}

/// Arguments for the update subcommand
#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[arg(value_parser = parse_todo_id)]
    pub id: TodoId,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New duration in days
    #[arg(long, allow_negative_numbers = true)]
    pub duration: Option<i64>,

    /// New due date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_due_date, conflicts_with = "clear_due")]
    pub due: Option<NaiveDate>,

    /// Remove the due date
    #[arg(long)]
    pub clear_due: bool,

    /// New image URL
    #[arg(long, conflicts_with = "clear_image")]
    pub image: Option<String>,

    /// Remove the image
    #[arg(long)]
    pub clear_image: bool,
}

impl UpdateArgs {
    pub fn to_update(&self) -> TodoUpdate {
        TodoUpdate {
            title: self.title.clone(),
            due_date: if self.clear_due { Some(None) } else { self.due.map(Some) },
            img_url: if self.clear_image {
                Some(None)
            } else {
                self.image.clone().map(Some)
            },
            duration: self.duration,
            placement: None,
        }
    }
}
