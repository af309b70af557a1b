//! Headless Display Client
//!
//! Mirrors server state into a local cache and renders the current line to
//! stdout. Navigation is driven from stdin:
//!
//! ```text
//!   n          next line            N          next shabad/bani
//!   p          previous line        P          previous shabad/bani
//!   c          clear line           /<letters>  first-letter search
//!   q          quit
//! ```

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gurbani_presenter::{
    client::SyncClient,
    config,
    constants::DEFAULT_PORT,
    content::Content,
    protocol::{SearchKind, SearchOptions, SearchQuery},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("ws://127.0.0.1:{DEFAULT_PORT}/api"));

    println!("Connecting to {url}");

    let client = SyncClient::connect(url, Some(config::client_settings_path())).await?;
    let cache = client.cache();

    // Render the current line whenever it (or the content) changes
    let content = cache.content.clone();
    let _ = cache.line_id.on_change(move |line_id: &Option<String>| {
        let Some(line_id) = line_id else {
            println!("--- (no line) ---");
            return;
        };

        let text = content.get().and_then(|content| {
            content
                .lines()
                .iter()
                .find(|line| &line.id == line_id)
                .map(|line| line.gurmukhi.clone())
        });

        match text {
            Some(text) => println!("> {text}"),
            None => println!("> [{line_id}]"),
        }
    });

    let _ = cache.content.on_change(|content: &Option<Content>| match content {
        Some(Content::Shabad(shabad)) => {
            println!("=== Shabad {} (order {}) ===", shabad.id, shabad.order_id);
        }
        Some(Content::Bani(bani)) => {
            println!("=== {} ===", bani.name_gurmukhi);
        }
        None => println!("=== (nothing open) ==="),
    });

    let _ = cache.status.on_change(|status| {
        if status.connected {
            println!("[connected]");
        } else {
            println!("[disconnected, retrying]");
        }
    });

    let _ = cache.search_results.on_change(|results| {
        println!("--- {} result(s) ---", results.len());
        for line in results.iter().take(10) {
            println!("  {}  {}", line.id, line.gurmukhi);
        }
    });

    // Command loop
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(input) = lines.next_line().await? {
        match input.trim() {
            "" => {}
            "n" => client.set_next_line(),
            "p" => client.set_previous_line(),
            "N" => client.open_next(),
            "P" => client.open_previous(),
            "c" => client.clear_line(),
            "q" => break,
            command => {
                if let Some(query) = command.strip_prefix('/') {
                    client.search(SearchQuery {
                        kind: SearchKind::FirstLetter,
                        query: query.to_string(),
                        options: SearchOptions::default(),
                    });
                } else {
                    println!("unknown command: {command}");
                }
            }
        }
    }

    Ok(())
}
