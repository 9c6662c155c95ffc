//! Attaches to a page and prints its network log and source tree.
//!
//! Start Chrome with `--remote-debugging-port=9222`, copy a page's
//! `webSocketDebuggerUrl` from `http://127.0.0.1:9222/json`, then:
//!
//! Usage:
//!   cargo run --example inspect_page -- ws://127.0.0.1:9222/devtools/page/<id>
//!   cargo run --example inspect_page -- <url> --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use anyhow::Context;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

use devtools_panel::{NodeKind, Panel, RequestFilter, ResourceType, SourceEntry};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let debug = args.iter().any(|a| a == "--debug");
    let endpoint = args
        .iter()
        .find(|a| a.starts_with("ws://") || a.starts_with("wss://"))
        .context("expected a ws:// endpoint argument")?;

    let filter = if debug {
        "devtools_panel=debug"
    } else {
        "devtools_panel=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let panel = Panel::builder()
        .endpoint(endpoint.as_str())
        .build()
        .await
        .context("attaching to page")?;

    println!("Collecting events for 3s...");
    sleep(Duration::from_secs(3)).await;

    // ========================================================================
    // Network
    // ========================================================================

    println!("\n=== Network ({} requests) ===", panel.network().len());
    for request in panel.network().list() {
        let status = request
            .status
            .map_or_else(|| "-".to_string(), |s| s.to_string());
        println!(
            "{:>4} {:<6} {:<10} {}",
            status,
            request.method,
            request.resource_type.as_str(),
            request.name()
        );
    }

    let scripts = panel
        .network()
        .list_filtered(RequestFilter::Type(ResourceType::Script));
    if let Some(first) = scripts.first() {
        match panel.network().get_body(&first.id).await {
            Ok(body) => println!("\nFirst script body: {} bytes", body.body.len()),
            Err(e) => println!("\nFirst script body unavailable: {e}"),
        }
    }

    // ========================================================================
    // Sources
    // ========================================================================

    println!("\n=== Sources ===");
    print_tree(&panel.sources().tree(), 0);

    panel.close();
    Ok(())
}

fn print_tree(entry: &SourceEntry, depth: usize) {
    if entry.kind != NodeKind::Root {
        let marker = if entry.kind.is_container() { "+" } else { "-" };
        println!("{}{marker} {}", "  ".repeat(depth), entry.name);
    }
    let depth = if entry.kind == NodeKind::Root { 0 } else { depth + 1 };
    for child in &entry.children {
        print_tree(child, depth);
    }
}
