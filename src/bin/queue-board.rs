//! Queue Board CLI Tool
//!
//! Offline view of a queue export: ranks the entries in a JSON file the
//! same way the service does and prints what a display would show.
//!
//! Usage:
//!   cargo run --bin queue-board -- --file queue.json board triage
//!   cargo run --bin queue-board -- --file queue.json next pharmacy --count 5
//!   cargo run --bin queue-board -- --file queue.json serving laboratory
//!   cargo run --bin queue-board -- --file queue.json stats radiology
//!   cargo run --bin queue-board -- --file queue.json --json patient PAT-001

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use patient_queue::queue::{board_for_tag, QueueRanker, DEFAULT_NEXT_COUNT};
use patient_queue::types::{QueueBoard, QueueEntry};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "queue-board")]
#[command(about = "Print queue boards from a JSON export of queue entries")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON array of queue entries
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the full board for a service point
    Board {
        /// Service point tag (triage, consultation, pharmacy, laboratory, radiology, billing, cashier);
        /// unknown tags print an empty result
        service_point: String,
        /// Upcoming tickets to show
        #[arg(short, long, default_value_t = DEFAULT_NEXT_COUNT)]
        count: usize,
    },
    /// Show the next tickets to be called
    Next {
        service_point: String,
        #[arg(short, long, default_value_t = DEFAULT_NEXT_COUNT)]
        count: usize,
    },
    /// Show tickets currently being served
    Serving { service_point: String },
    /// Show waiting count and average quoted wait
    Stats { service_point: String },
    /// Show where a patient currently is
    Patient { patient_id: String },
}

fn load_entries(path: &Path) -> Result<Vec<QueueEntry>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Waiting count and average quoted wait, labelled with the tag as given
fn stats_line(board: &QueueBoard) -> String {
    format!(
        "{}: {} waiting, average wait {} min",
        board.service_point, board.total_waiting, board.average_wait_time
    )
}

fn stats_json(board: &QueueBoard) -> serde_json::Value {
    serde_json::json!({
        "servicePoint": board.service_point,
        "totalWaiting": board.total_waiting,
        "averageWaitTime": board.average_wait_time,
    })
}

fn print_board(board: &QueueBoard) {
    println!("📋 {}", board.service_point.to_uppercase());
    if board.currently_serving.is_empty() {
        println!("  Now serving: -");
    } else {
        println!("  Now serving: {}", board.currently_serving.join(", "));
    }
    if board.next_in_queue.is_empty() {
        println!("  Next:        -");
    } else {
        println!("  Next:        {}", board.next_in_queue.join(", "));
    }
    println!("  Waiting:     {}", board.total_waiting);
    println!("  Avg wait:    {} min", board.average_wait_time);
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let entries = load_entries(&cli.file)?;

    match cli.command {
        Commands::Board {
            service_point,
            count,
        } => {
            let board = board_for_tag(&entries, &service_point, count);
            if cli.json {
                print_json(&board)?;
            } else {
                print_board(&board);
            }
        }
        Commands::Next {
            service_point,
            count,
        } => {
            let next = board_for_tag(&entries, &service_point, count).next_in_queue;
            if cli.json {
                print_json(&next)?;
            } else {
                for (position, ticket) in next.iter().enumerate() {
                    println!("{}. {}", position + 1, ticket);
                }
            }
        }
        Commands::Serving { service_point } => {
            let serving = board_for_tag(&entries, &service_point, 0).currently_serving;
            if cli.json {
                print_json(&serving)?;
            } else {
                for ticket in &serving {
                    println!("{}", ticket);
                }
            }
        }
        Commands::Stats { service_point } => {
            let board = board_for_tag(&entries, &service_point, 0);
            if cli.json {
                print_json(&stats_json(&board))?;
            } else {
                println!("{}", stats_line(&board));
            }
        }
        Commands::Patient { patient_id } => match QueueRanker::new(&entries)
            .patient_queue_status(&patient_id)
        {
            Some(status) if cli.json => print_json(&status)?,
            Some(status) => {
                let entry = &status.entry;
                println!(
                    "{} at {}: {} ({})",
                    entry.ticket_number, entry.service_point, entry.status, entry.priority
                );
                if let Some(position) = status.position {
                    println!("  Position: {}", position);
                }
                if status.entry_count > 1 {
                    println!("  Entries on record: {}", status.entry_count);
                }
            }
            None => {
                eprintln!("No queue entry for patient {}", patient_id);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
