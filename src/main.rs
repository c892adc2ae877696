use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use bookstore_inventory::{
    init_tracing, validate_price, validate_year, BookStore, NewBook, ReportFormat, StoreConfig,
    VERSION,
};

#[derive(Parser)]
#[command(
    name = "bookstore",
    version,
    about = "Bookstore inventory manager",
    long_about = "Manage the book inventory from the command line: list, search, \
                  add, CSV import/export, snapshots and reports. Every change \
                  takes a database snapshot first."
)]
struct Cli {
    /// Root directory holding data/, backups/ and exports/
    #[arg(long, env = "BOOKSTORE_ROOT", default_value = "meu_sistema_livraria")]
    root: PathBuf,

    /// Number of snapshots to keep
    #[arg(long, env = "BOOKSTORE_RETENTION", default_value_t = 5)]
    retention: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all books
    List,
    /// Search books by author substring
    Search { query: String },
    /// Add a book
    Add {
        title: String,
        author: String,
        /// Publication year
        #[arg(short, long)]
        year: Option<String>,
        /// Price
        #[arg(short, long)]
        price: Option<String>,
    },
    /// Import books from a CSV file (comma or semicolon)
    Import { file: PathBuf },
    /// Export books to CSV
    Export {
        /// Output file (default: exports/livros_exportados.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Take a manual snapshot
    Backup,
    /// List snapshots, newest first
    Backups,
    /// Write an HTML or PDF report into exports/
    Report {
        #[arg(short, long, value_enum, default_value = "html")]
        format: ReportFormat,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = StoreConfig::with_root(cli.root).retention(cli.retention);
    let store = BookStore::open(config).context("Failed to open book store")?;

    match cli.command {
        Commands::List => print_books(&store.list()?),
        Commands::Search { query } => print_books(&store.search_by_author(&query)?),
        Commands::Add {
            title,
            author,
            year,
            price,
        } => run_add(&store, title, author, year, price)?,
        Commands::Import { file } => {
            let data = fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let inserted = store.import_csv(&data)?;
            println!("✓ Imported {} books from {}", inserted, file.display());
        }
        Commands::Export { output } => {
            let path = match output {
                Some(path) => {
                    fs::write(&path, store.export_csv()?)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    path
                }
                None => store.export_csv_to_file()?,
            };
            println!("✓ Exported to {}", path.display());
        }
        Commands::Backup => {
            let path = store.backup()?;
            println!("✓ Snapshot created: {}", path.display());
        }
        Commands::Backups => {
            let backups = store.list_backups()?;
            if backups.is_empty() {
                println!("No snapshots yet.");
            }
            for b in backups {
                println!(
                    "{}  {:>10} bytes  {}  {}",
                    b.modified.format("%Y-%m-%d %H:%M:%S"),
                    b.size_bytes,
                    &b.sha256[..12],
                    b.filename
                );
            }
        }
        Commands::Report { format } => {
            let (path, _) = store.write_report(format)?;
            println!("✓ Report written: {}", path.display());
        }
    }

    Ok(())
}

fn run_add(
    store: &BookStore,
    title: String,
    author: String,
    year: Option<String>,
    price: Option<String>,
) -> Result<()> {
    let year = match year {
        Some(raw) => Some(validate_year(&raw).context("Invalid year.")?),
        None => None,
    };
    let price = match price {
        Some(raw) => Some(validate_price(&raw).context("Invalid price.")?),
        None => None,
    };

    let id = store.add(NewBook {
        title,
        author,
        year,
        price,
    })?;
    println!("✓ Book added with id {}", id);
    Ok(())
}

fn print_books(books: &[bookstore_inventory::Book]) {
    if books.is_empty() {
        println!("No books found.");
        return;
    }

    println!("📚 Bookstore inventory v{}", VERSION);
    println!("{:>5}  {:<40} {:<30} {:>5} {:>14}", "ID", "Title", "Author", "Year", "Price");
    for book in books {
        println!(
            "{:>5}  {:<40} {:<30} {:>5} {:>14}",
            book.id,
            book.title,
            book.author,
            book.year.map(|y| y.to_string()).unwrap_or_default(),
            book.price
                .map(bookstore_inventory::format_currency)
                .unwrap_or_default()
        );
    }
}
