//! todo-forest
//!
//! Command line front end for the hierarchical todo store.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use todo_forest::cli::{Cli, Command};
use todo_forest::config::Config;
use todo_forest::db::Database;
use todo_forest::error::TodoError;
use todo_forest::format::{self, OutputFormat};
use todo_forest::logging::{self, LogTarget};
use tracing::debug;

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut config = Config::resolve(cli.config.as_deref())?;
    if let Some(db_path) = cli.database {
        config.store.db_path = db_path;
    }
    if let Some(output) = cli.format {
        config.display.format = output;
    }

    config.ensure_db_dir()?;
    debug!(path = %config.store.db_path.display(), "Opening database");
    let db = Database::open(&config.store.db_path)?;
    let output = config.display.format;

    match execute(&db, cli.command, output) {
        Ok(text) => {
            print!("{}", text);
            Ok(())
        }
        Err(err) if output == OutputFormat::Json => {
            println!("{}", to_json(&json!({ "error": err.to_body() })));
            std::process::exit(1);
        }
        Err(err) => Err(err.into()),
    }
}

/// Run one command and render its result.
fn execute(db: &Database, command: Command, output: OutputFormat) -> Result<String, TodoError> {
    let json = output == OutputFormat::Json;

    let text = match command {
        Command::Add(args) => {
            let todo = db.create_todo(args.into_new_todo())?;
            if json { to_json(&todo) } else { format::format_todo_markdown(&todo) }
        }
        Command::List => {
            let todos = db.list_todos()?;
            if json { to_json(&todos) } else { format::format_todos_markdown(&todos) }
        }
        Command::Tree => {
            let forest = db.load_forest()?;
            let critical = todo_forest::critical_path::compute(&forest)?;
            let trees = forest.build_tree();
            let today = Local::now().date_naive();
            if json {
                to_json(&format::tree_json(&trees, &critical, today))
            } else {
                format::format_tree_markdown(&trees, &critical, today)
            }
        }
        Command::Show { id } => {
            let todo = db.get_todo(id)?.ok_or(TodoError::NotFound(id))?;
            if json { to_json(&todo) } else { format::format_todo_markdown(&todo) }
        }
        Command::Update(args) => {
            let todo = db.update_todo(args.id, args.to_update())?;
            if json { to_json(&todo) } else { format::format_todo_markdown(&todo) }
        }
        Command::Move(args) => {
            let todo = db.move_todo(args.id, args.payload()?)?;
            if json { to_json(&todo) } else { format::format_todo_markdown(&todo) }
        }
        Command::Drop(args) => match db.drop_todo(args.id, args.target)? {
            Some(todo) if json => to_json(&todo),
            Some(todo) => format::format_todo_markdown(&todo),
            None if json => to_json(&json!({ "moved": false, "id": args.id })),
            None => format!("Todo `{}` stays where it is.\n", args.id),
        },
        Command::Delete { id } => {
            db.delete_todo(id)?;
            if json {
                to_json(&json!({ "success": true, "id": id }))
            } else {
                format!("Deleted todo `{}`.\n", id)
            }
        }
        Command::Path => {
            let forest = db.load_forest()?;
            let critical = todo_forest::critical_path::compute(&forest)?;
            if json {
                to_json(&critical)
            } else {
                format::format_critical_path_markdown(&critical, &forest)
            }
        }
        Command::Check { repair } => {
            let repaired = if repair { db.repair_orders()? } else { 0 };
            let violations = db.order_violations()?;
            if json {
                to_json(&json!({ "repaired": repaired, "violations": violations }))
            } else {
                let mut md = String::new();
                if repair {
                    md.push_str(&format!("Repaired {} sibling group(s).\n", repaired));
                }
                md.push_str(&format::format_violations_markdown(&violations));
                md
            }
        }
    };

    Ok(text)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    let mut text = serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string());
    text.push('\n');
    text
}
