//! Restores CHANGELOG.md from a backup.
//!
//! Usage:
//!   maicraft-restore list
//!   maicraft-restore latest
//!   maicraft-restore CHANGELOG.md.2025-01-31T10-00-00.bak

mod common;

use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use maicraft_link::release::{BackupStore, LATEST};
use maicraft_link::{Error, Result};

/// Lists changelog backups or restores one of them.
#[derive(Parser, Debug)]
#[command(name = "maicraft-restore", version, about, long_about = None)]
struct Cli {
    /// `list`, `latest`, `help` or a backup file name
    command: Option<String>,

    /// Project root containing CHANGELOG.md
    #[arg(long)]
    root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();
    common::init_logging(cli.debug);

    if let Err(e) = run(cli) {
        eprintln!("{} {e}", "✗".red().bold());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let store = BackupStore::new(&common::project_root(cli.root));

    match cli.command.as_deref() {
        None | Some("help") => {
            Cli::command().print_help()?;
            Ok(())
        }
        Some("list") => list(&store),
        Some(name) => restore(&store, name),
    }
}

fn list(store: &BackupStore) -> Result<()> {
    let backups = store.list()?;
    if backups.is_empty() {
        println!("{}", "No backups found".yellow());
        return Ok(());
    }

    println!("{}", format!("Backups in {}:", store.dir().display()).cyan().bold());
    for (i, backup) in backups.iter().enumerate() {
        if backup.is_latest() {
            println!("{:>3}. {} {}", i + 1, backup.name, "(latest)".green());
        } else {
            println!("{:>3}. {} ({})", i + 1, backup.name, backup.timestamp.dimmed());
        }
    }
    Ok(())
}

fn restore(store: &BackupStore, name: &str) -> Result<()> {
    if name == LATEST {
        println!("{}", "Restoring CHANGELOG.md from the latest backup...".yellow());
    } else {
        println!("{}", format!("Restoring CHANGELOG.md from {name}").yellow());
        println!("{}", "This overwrites the current CHANGELOG.md".yellow());
    }

    let restored = store.restore(name).map_err(|e| match e {
        Error::Backup { .. } => {
            eprintln!("Run \"maicraft-restore list\" to see available backups");
            e
        }
        other => other,
    })?;

    if let Some(emergency) = &restored.emergency {
        println!("Previous changelog saved to {}", emergency.display());
    }
    println!(
        "{} from {}",
        "✓ Restored".green().bold(),
        restored.source.display()
    );
    Ok(())
}
