//! Version bump, changelog and tag tool.
//!
//! Usage:
//!   maicraft-version patch -m "fix login" -t fix
//!   maicraft-version minor -m "add map" -t feat -m "docs" -t docs
//!   maicraft-version major --skip-git
//!   maicraft-version info

mod common;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use maicraft_link::Result;
use maicraft_link::release::{
    BumpKind, ChangelogOutcome, CommitType, GitOutcome, Release, ReleaseOptions, ReleaseReport,
    version_info,
};

// ============================================================================
// Arguments
// ============================================================================

/// Bumps the project version, updates the changelog and tags the release.
#[derive(Parser, Debug)]
#[command(name = "maicraft-version", version, about, long_about = None)]
struct Cli {
    /// Project root containing package.json
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bug fix release (x.y.Z)
    Patch(BumpArgs),
    /// Feature release (x.Y.0)
    Minor(BumpArgs),
    /// Breaking release (X.0.0)
    Major(BumpArgs),
    /// Show the current version
    Info,
}

#[derive(Args, Debug)]
struct BumpArgs {
    /// Change message; repeat for several. Prompts when omitted
    #[arg(short, long = "message")]
    message: Vec<String>,

    /// Commit type for the message at the same position
    #[arg(short = 't', long = "type")]
    commit_type: Vec<String>,

    /// Leave CHANGELOG.md untouched
    #[arg(long)]
    skip_changelog: bool,

    /// Do not commit or tag
    #[arg(long)]
    skip_git: bool,
}

impl BumpArgs {
    fn into_options(self, kind: BumpKind) -> ReleaseOptions {
        let mut options = ReleaseOptions::new(kind);
        options.messages = self.message;
        options.commit_types = self.commit_type;
        options.skip_changelog = self.skip_changelog;
        options.skip_git = self.skip_git;
        options
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    common::init_logging(cli.debug);

    if let Err(e) = run(cli) {
        eprintln!("{} {e}", "✗".red().bold());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let root = common::project_root(cli.root);

    let (kind, args) = match cli.command {
        Command::Patch(args) => (BumpKind::Patch, args),
        Command::Minor(args) => (BumpKind::Minor, args),
        Command::Major(args) => (BumpKind::Major, args),
        Command::Info => return show_info(&root),
    };

    if args.message.is_empty() {
        print_prompt_help();
    }

    let report = Release::new(root, args.into_options(kind)).run()?;
    print_report(&report);
    Ok(())
}

// ============================================================================
// Output
// ============================================================================

fn print_prompt_help() {
    let types: Vec<&str> = CommitType::ALL.iter().map(|t| t.as_str()).collect();
    println!("\n{}", "Add changes".cyan().bold());
    println!("Types: {}", types.join(", "));
    println!("Format: <type> <message>, e.g. fix login button");
    println!("Type \"done\" to finish or \"cancel\" to abort");
}

fn show_info(root: &std::path::Path) -> Result<()> {
    let info = version_info(root)?;
    println!("{}", "Current version".cyan().bold());
    println!("Version:        v{}", info.version);
    println!("Project:        {}", info.name);
    println!("Build date:     {}", info.build_date);
    println!("Last updated:   {}", info.last_updated);
    println!("Total versions: {}", info.total_versions);
    Ok(())
}

fn print_report(report: &ReleaseReport) {
    println!(
        "{} v{} -> v{}",
        "✓ Version bumped".green().bold(),
        report.previous,
        report.version
    );
    if let Some(summary) = &report.entry.summary {
        println!("  {summary}");
    }

    match &report.changelog {
        ChangelogOutcome::Skipped => println!("{}", "- Changelog skipped".dimmed()),
        ChangelogOutcome::Missing => println!("{}", "! CHANGELOG.md not found".yellow()),
        ChangelogOutcome::AlreadyPresent => {
            println!("{}", "! Changelog already has this version".yellow());
        }
        ChangelogOutcome::NoHeading => {
            println!("{}", "! No version heading found in CHANGELOG.md".yellow());
        }
        ChangelogOutcome::Updated { backup } => {
            println!("{} (backup: {})", "✓ Changelog updated".green(), backup.display());
        }
        ChangelogOutcome::Failed(reason) => {
            println!("{} {reason}", "✗ Changelog update failed:".red());
        }
    }

    match &report.git {
        GitOutcome::Skipped => println!("{}", "- Git skipped".dimmed()),
        GitOutcome::Tagged(tag) => println!("{} {tag}", "✓ Tagged".green()),
        GitOutcome::Failed(reason) => {
            println!("{} {reason}", "! Git failed, commit manually:".yellow());
        }
    }

    println!("\n{}", format!("Release v{} ready", report.version).green().bold());
}
