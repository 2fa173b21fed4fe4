// Admin command-line surface over the submission ledger.
//
// The chat gateway handles the interactive flow; this binary covers the
// operator side: bootstrapping configuration and inspecting, exporting,
// or wiping the store.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::{config, DropWardenConfig};
use crate::export;
use crate::store::{JsonFileStore, SubmissionFilter, SubmissionStore};
use crate::submission::SubmissionStatus;

#[derive(Parser)]
#[command(name = "drop-warden")]
#[command(about = "Moderated drop-submission tracking for team events")]
#[command(
    long_about = "Drop Warden keeps a durable ledger of drop submissions reviewed by event staff. \
                  The chat bot feeds the ledger; this binary inspects, exports, and resets it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter drop-warden.toml with the default roster
    Init {
        /// Overwrite an existing configuration file
        #[arg(long, help = "Overwrite drop-warden.toml if it already exists")]
        force: bool,
    },
    /// Show ledger totals by status and team
    Status,
    /// Dump all records as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Print in message-sized chunks separated by markers
        #[arg(long, help = "Chunk output at the configured maximum message size")]
        chunked: bool,
    },
    /// List records matching the given criteria
    Query {
        /// Team slug or display name
        #[arg(long)]
        team: Option<String>,
        /// Category name
        #[arg(long)]
        category: Option<String>,
        /// pending, confirmed, or rejected
        #[arg(long)]
        status: Option<String>,
    },
    /// Wipe every record and restart the id counter at 1
    Reset {
        /// Confirm the wipe; without this flag nothing is deleted
        #[arg(long, help = "Required confirmation flag; resets are irreversible")]
        yes: bool,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { force } => init_command(force),
        Commands::Status => status_command().await,
        Commands::Export { output, chunked } => export_command(output, chunked).await,
        Commands::Query {
            team,
            category,
            status,
        } => query_command(team, category, status).await,
        Commands::Reset { yes } => reset_command(yes).await,
    }
}

fn init_command(force: bool) -> Result<()> {
    let path = Path::new("drop-warden.toml");
    if path.exists() && !force {
        return Err(anyhow!(
            "drop-warden.toml already exists; pass --force to overwrite"
        ));
    }
    DropWardenConfig::default().save_to_file(path)?;
    println!("Wrote drop-warden.toml with the default roster and categories");
    println!("Edit the teams, staff role, channels, and owners before starting the bot");
    Ok(())
}

async fn open_store() -> Result<JsonFileStore> {
    let config = config()?;
    Ok(JsonFileStore::open(&config.store.state_dir).await?)
}

async fn status_command() -> Result<()> {
    let config = config()?;
    let store = open_store().await?;
    let all = store.query(SubmissionFilter::default()).await?;

    let count = |status: SubmissionStatus| all.iter().filter(|s| s.status == status).count();
    println!("{} submissions tracked", all.len());
    println!(
        "  pending: {}  confirmed: {}  rejected: {}",
        count(SubmissionStatus::Pending),
        count(SubmissionStatus::Confirmed),
        count(SubmissionStatus::Rejected),
    );

    for team in &config.teams {
        let team_total = all.iter().filter(|s| s.team_id == team.id).count();
        if team_total > 0 {
            println!("  {}: {}", team.display_name, team_total);
        }
    }
    Ok(())
}

async fn export_command(output: Option<PathBuf>, chunked: bool) -> Result<()> {
    let config = config()?;
    let store = open_store().await?;
    let records = store.query(SubmissionFilter::default()).await?;
    let rendered = export::render_dump(&records)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &rendered)?;
            println!("Exported {} records to {}", records.len(), path.display());
        }
        None if chunked => {
            let chunks = export::chunk_message(&rendered, config.export.max_message_len);
            for (index, chunk) in chunks.iter().enumerate() {
                println!("--- chunk {}/{} ---", index + 1, chunks.len());
                print!("{chunk}");
                if !chunk.ends_with('\n') {
                    println!();
                }
            }
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

async fn query_command(
    team: Option<String>,
    category: Option<String>,
    status: Option<String>,
) -> Result<()> {
    let config = config()?;
    let registry = config.registry();
    let store = open_store().await?;

    let team_id = match team {
        Some(name) => Some(
            registry
                .find_team(&name)
                .ok_or_else(|| anyhow!("unknown team: {name}"))?
                .id
                .clone(),
        ),
        None => None,
    };
    let category = match category {
        Some(name) => Some(
            registry
                .category(&name)
                .ok_or_else(|| anyhow!("unknown category: {name}"))?,
        ),
        None => None,
    };
    let status = match status {
        Some(raw) => Some(raw.parse::<SubmissionStatus>().map_err(|e| anyhow!("{e}"))?),
        None => None,
    };

    let matches = store
        .query(SubmissionFilter {
            team_id,
            category,
            status,
        })
        .await?;

    if matches.is_empty() {
        println!("No matching submissions");
        return Ok(());
    }

    for submission in matches {
        let category_label = submission
            .category
            .as_ref()
            .map(|c| c.0.as_str())
            .unwrap_or("-");
        let decider = submission
            .decided_by
            .as_ref()
            .map(|d| d.0.as_str())
            .unwrap_or("-");
        println!(
            "{}  {:9}  {:22}  {:24}  by {}  {}",
            submission.id.to_string(),
            submission.status.to_string(),
            submission.team_id.to_string(),
            category_label,
            submission.submitter_id,
            decider,
        );
    }
    Ok(())
}

async fn reset_command(yes: bool) -> Result<()> {
    if !yes {
        println!("This wipes every record and restarts the counter at 1.");
        println!("Re-run with --yes to confirm.");
        return Ok(());
    }
    let store = open_store().await?;
    store.reset_all().await?;
    println!("Ledger wiped; the next submission will be DROP-001");
    Ok(())
}
