//! Medals Client - terminal front end for a shared medal board.
//!
//! Loads the board over REST, follows the realtime hub and reads line
//! commands from stdin. Every store change reprints the board.

use medals_client::cli::{Command, USAGE};
use medals_client::{Config, HttpPersistence, HubTransport, MedalBoard};
use medals_engine::BoardView;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medals_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(api = %config.api_url, hub = %config.hub_url, "Starting Medals Client");

    let persistence = Arc::new(HttpPersistence::new(
        &config.api_url,
        config.request_timeout,
    )?);
    let (board, mut alerts) = MedalBoard::new(config.counter_kinds.clone(), persistence);
    let board = Arc::new(board);

    if let Err(e) = board.load().await {
        tracing::error!(error = %e, "Initial load failed");
    }

    let transport = HubTransport::new(config.hub_url.clone());
    if let Err(e) = board.connect(&transport).await {
        tracing::error!(error = %e, "Connection failed");
    }

    // Reprint on every change
    let mut changes = board.subscribe();
    let render_board = board.clone();
    tokio::spawn(async move {
        print_board(&render_board.view());
        while changes.changed().await.is_ok() {
            changes.borrow_and_update();
            print_board(&render_board.view());
        }
    });

    tokio::spawn(async move {
        while let Some(alert) = alerts.recv().await {
            eprintln!("!! {} (id {})", alert.message, alert.entity_id);
        }
    });

    println!("{USAGE}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        let result = match command {
            Command::Quit => break,
            Command::Help => {
                println!("{USAGE}");
                Ok(())
            }
            Command::Show => {
                print_board(&board.view());
                Ok(())
            }
            Command::Increment(id, counter) => board.on_increment(id, &counter),
            Command::Decrement(id, counter) => board.on_decrement(id, &counter),
            Command::Reset(id) => board.on_reset(id),
            Command::Add(name) => {
                let board = board.clone();
                tokio::spawn(async move {
                    let outcome = board.on_add(&name).await;
                    tracing::debug!(?outcome, "Add finished");
                });
                Ok(())
            }
            Command::Delete(id) => {
                let board = board.clone();
                tokio::spawn(async move {
                    let outcome = board.on_delete(id).await;
                    tracing::debug!(entity_id = id, ?outcome, "Delete finished");
                });
                Ok(())
            }
            Command::Save(id) => {
                let board = board.clone();
                tokio::spawn(async move {
                    let outcome = board.on_save(id).await;
                    tracing::debug!(entity_id = id, ?outcome, "Save finished");
                });
                Ok(())
            }
        };

        if let Err(e) = result {
            eprintln!("{e}");
        }
    }

    let pending = board.in_flight();
    if !pending.is_empty() {
        tracing::warn!(count = pending.len(), "Exiting with commits in flight");
    }
    Ok(())
}

fn print_board(view: &BoardView) {
    println!();
    println!("Total medals: {}", view.total);
    for entity in &view.entities {
        let counters: Vec<String> = entity
            .counters
            .iter()
            .map(|c| {
                if c.value.is_dirty() {
                    format!("{} {} (saved {})", c.name, c.value.displayed, c.value.saved)
                } else {
                    format!("{} {}", c.name, c.value.displayed)
                }
            })
            .collect();
        let marker = if entity.is_dirty() { "*" } else { " " };
        println!(
            "{marker} [{:>4}] {:<20} {}",
            entity.id,
            entity.name,
            counters.join("  ")
        );
    }
}
