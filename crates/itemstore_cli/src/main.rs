//! CLI smoke entry point.
//!
//! # Responsibility
//! - Exercise `itemstore_core` end to end against a real store file.
//! - Keep output deterministic for quick local sanity checks.

use clap::{Parser, Subcommand};
use itemstore_core::{init_logging, Item, ItemId, ItemStore, NewItem, StoreConfig};
use std::path::PathBuf;
use std::process::ExitCode;

const DB_PATH_ENV: &str = "ITEMSTORE_DB_PATH";
const DEFAULT_DB_FILE_NAME: &str = "itemstore.sqlite3";

/// Inspect and edit an item store file.
#[derive(Parser)]
#[command(name = "itemstore", version, about, long_about = None)]
struct Cli {
    /// Store file; defaults to $ITEMSTORE_DB_PATH, then the temp dir.
    #[arg(global = true, long)]
    db: Option<PathBuf>,

    /// Absolute directory for rolling log files.
    #[arg(global = true, long)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print core linkage info
    Ping,
    /// Print all items
    List {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Insert one item; omit --id to let the store assign one
    Add {
        name: String,
        #[arg(long)]
        id: Option<ItemId>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete the item with this id
    Remove { id: ItemId },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        if let Err(err) = init_logging(itemstore_core::default_log_level().as_str(), log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Command::Ping = cli.command {
        println!("itemstore_core ping={}", itemstore_core::ping());
        println!("itemstore_core version={}", itemstore_core::core_version());
        return Ok(());
    }

    let store = ItemStore::open(StoreConfig::file(resolve_db_path(cli.db)))?;

    match cli.command {
        Command::Ping => {}
        Command::List { json } => {
            let snapshot = store
                .fetch_all()?
                .recv()
                .ok_or("store closed before first snapshot")??;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot.items)?);
            } else {
                for item in &snapshot.items {
                    print_item(item);
                }
            }
        }
        Command::Add {
            name,
            id,
            description,
        } => {
            let id = match id {
                Some(id) => {
                    let mut item = Item::new(id, name)?;
                    item.description = description;
                    store.insert(&item)?;
                    id
                }
                None => store.insert_new(&NewItem { name, description })?,
            };
            println!("added id={id}");
        }
        Command::Remove { id } => {
            let item = Item::new(id, String::new())?;
            store.delete(&item)?;
            println!("removed id={id}");
        }
    }

    Ok(())
}

fn print_item(item: &Item) {
    match item.description.as_deref() {
        Some(description) => println!("{}\t{}\t{}", item.id, item.name, description),
        None => println!("{}\t{}", item.id, item.name),
    }
}

fn resolve_db_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    if let Ok(raw) = std::env::var(DB_PATH_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn subcommands_are_one_shot_operations() {
        let cli = Cli::command();
        let names: Vec<&str> = cli
            .get_subcommands()
            .map(|sub| sub.get_name())
            .filter(|name| *name != "help")
            .collect();
        assert_eq!(names, vec!["ping", "list", "add", "remove"]);
    }

    #[test]
    fn watch_is_not_accepted() {
        assert!(Cli::try_parse_from(["itemstore", "watch"]).is_err());
    }

    #[test]
    fn add_parses_optional_id_and_description() {
        let cli = Cli::try_parse_from([
            "itemstore",
            "--db",
            "/tmp/x.sqlite3",
            "add",
            "Cat",
            "--id",
            "7",
            "--description",
            "grey",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.sqlite3")));
        match cli.command {
            Command::Add {
                name,
                id,
                description,
            } => {
                assert_eq!(name, "Cat");
                assert_eq!(id, Some(7));
                assert_eq!(description.as_deref(), Some("grey"));
            }
            _ => panic!("expected add"),
        }
    }
}
