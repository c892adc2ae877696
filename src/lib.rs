// Bookstore Inventory - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod error;
pub mod config;
pub mod validation;
pub mod db;
pub mod backup;
pub mod store;
pub mod csv_io;
pub mod report;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use error::{StoreError, StoreResult};
pub use config::StoreConfig;
pub use validation::{validate_price, validate_year};
pub use db::{Book, NewBook};
pub use backup::{BackupInfo, BackupManager};
pub use store::BookStore;
pub use csv_io::{detect_delimiter, export_csv, parse_import, ImportRow};
pub use report::{format_currency, render_html, render_pdf, ReportFormat};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the fmt subscriber used by both binaries (`RUST_LOG`, default `info`)
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
