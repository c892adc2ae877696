// Bookstore Inventory - Web Server
// REST API with Axum

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use bookstore_inventory::{api, init_tracing, BookStore, StoreConfig};

#[derive(Parser)]
#[command(name = "bookstore-server", version, about = "Bookstore inventory HTTP API")]
struct Args {
    /// Root directory holding data/, backups/ and exports/
    #[arg(long, env = "BOOKSTORE_ROOT", default_value = "meu_sistema_livraria")]
    root: PathBuf,

    /// Number of snapshots to keep
    #[arg(long, env = "BOOKSTORE_RETENTION", default_value_t = 5)]
    retention: usize,

    /// Listen address
    #[arg(long, env = "BOOKSTORE_ADDR", default_value = "0.0.0.0:3000")]
    addr: String,
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    println!("🌐 Bookstore Inventory - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = StoreConfig::with_root(args.root).retention(args.retention);
    let store = BookStore::open(config.clone()).context("Failed to open book store")?;
    println!("✓ Database opened: {:?}", config.db_path());
    println!("✓ Snapshots: {:?} (keeping {})", config.backup_dir(), config.retention);

    let app = api::router(store);

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", args.addr))?;

    println!("\n🚀 Server running on http://{}", args.addr);
    println!("   API: http://{}/api/books", args.addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
