use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};

#[derive(Debug, Parser)]
#[command(
    name = "cardvault",
    version,
    about = "Character-card catalog upkeep: decode embedded metadata, sync companion tags, ingest new cards"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one ingestion pass over the companion card directories
    Ingest,
    /// Decode the metadata embedded in a single card file
    Decode { file: PathBuf },
    /// Manage the companion application's tags
    Tag {
        #[command(subcommand)]
        action: TagCommand,
    },
    /// Download a card from the distribution site
    Fetch { card_id: String, target: PathBuf },
    /// Show resolved paths, configuration, and catalog health
    Status,
}

#[derive(Debug, Subcommand)]
enum TagCommand {
    /// Create a tag (no-op when the name already exists)
    Add { name: String },
    /// Delete a tag and strip it from every card
    Remove { name: String },
    /// Attach a tag to a card, creating the tag on first use
    Assign { name: String, card: String },
    /// Detach a tag from a card
    Unassign { name: String, card: String },
    /// List tags with their card counts
    List,
}

fn print_report(report: &CommandReport) {
    for detail in &report.details {
        println!("{detail}");
    }
    for issue in &report.issues {
        eprintln!("issue: {issue}");
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let report = match cli.command {
        Command::Ingest => commands::ingest::run()?,
        Command::Decode { file } => commands::decode::run(&file)?,
        Command::Tag { action } => match action {
            TagCommand::Add { name } => commands::tag::run_add(&name)?,
            TagCommand::Remove { name } => commands::tag::run_remove(&name)?,
            TagCommand::Assign { name, card } => commands::tag::run_assign(&name, &card)?,
            TagCommand::Unassign { name, card } => commands::tag::run_unassign(&name, &card)?,
            TagCommand::List => commands::tag::run_list()?,
        },
        Command::Fetch { card_id, target } => commands::fetch::run(&card_id, &target)?,
        Command::Status => commands::status::run()?,
    };

    print_report(&report);
    if !report.ok {
        anyhow::bail!("{} completed with issues", report.command);
    }
    Ok(())
}
