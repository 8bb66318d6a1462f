//! scrollback: page through a recorded room history.
//!
//! Loads a history dump into an in-memory fetcher and runs page requests
//! through the same cache a live client would use. Handy for checking how
//! anchor/offset requests land and when backward fetches happen (run with
//! `RUST_LOG=scrollback_client=debug`).
//!
//! ```bash
//! scrollback --history lobby.json page --size 20
//! scrollback --history lobby.json page --anchor '$abc' --offset -10 --size 10
//! scrollback --history lobby.json --config window.ron summary
//! ```

mod history;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use scrollback_client::{MemoryFetcher, RoomRegistry, WindowConfig};
use scrollback_types::{Event, EventId};

use crate::history::RoomHistory;

/// Page through a recorded room history with the scrollback cache.
#[derive(Parser, Debug)]
#[command(name = "scrollback")]
struct Args {
    /// Room history dump (JSON)
    #[arg(long)]
    history: PathBuf,

    /// Window configuration (RON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one page of events
    Page {
        /// Event id to page from; the most recent event when omitted
        #[arg(long)]
        anchor: Option<String>,

        /// Positive moves toward older events, negative toward newer
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i64,

        /// Events per page
        #[arg(long, default_value_t = 20)]
        size: usize,
    },
    /// Print the room summary
    Summary,
    /// Print the older and newer pagination cursors
    Tokens,
}

fn print_event(event: &Event) {
    let body = event.content_str("body").unwrap_or_default();
    println!(
        "{}\t{}\t{}\t{}",
        event.event_id, event.event_type, event.sender, body
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => WindowConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => WindowConfig::default(),
    };

    let fetcher = Arc::new(MemoryFetcher::new());
    let room_id = RoomHistory::load(&args.history)?.into_fetcher(&fetcher);
    let (registry, _catch_up) = RoomRegistry::new(fetcher.clone(), config);
    let window = registry.room(&room_id).await?;

    match args.command {
        Command::Page { anchor, offset, size } => {
            let anchor = anchor.map(EventId::new).unwrap_or_else(EventId::latest);
            let events = window.page(&anchor, offset, size).await?;
            for event in &events {
                print_event(event);
            }
            tracing::info!(
                returned = events.len(),
                cached = window.len().await,
                older_fetches = fetcher.stats().older_calls,
                "page served"
            );
        }
        Command::Summary => {
            let summary = window.summarize().await;
            println!("room:     {}", summary.room_id);
            println!("name:     {}", summary.name);
            println!("topic:    {}", summary.topic);
            println!(
                "avatar:   {}",
                summary.avatar.map(|a| a.to_string()).unwrap_or_default()
            );
            println!(
                "members:  {} joined, {} member events, {} servers",
                summary.num_members, summary.num_member_events, summary.num_servers
            );
        }
        Command::Tokens => {
            let (older, newer) = window.tokens().await;
            println!("older: {older}");
            println!("newer: {newer}");
        }
    }

    Ok(())
}
