// Bookstore Inventory - Book Store
// Validated CRUD, CSV import/export and reports; every mutation takes a snapshot first

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use rusqlite::TransactionBehavior;
use tracing::{info, warn};

use crate::backup::{BackupInfo, BackupManager};
use crate::config::StoreConfig;
use crate::csv_io::{self, CSV_EXPORT_FILE};
use crate::db::{self, Book, NewBook};
use crate::error::{StoreError, StoreResult};
use crate::report::{self, ReportFormat};
use crate::validation::{
    price_is_valid, year_in_range, MSG_INVALID_PRICE, MSG_INVALID_YEAR, MSG_TITLE_AUTHOR_REQUIRED,
};

/// Inventory of books backed by one SQLite file
#[derive(Debug, Clone)]
pub struct BookStore {
    config: StoreConfig,
    backups: BackupManager,
}

impl BookStore {
    /// Create the store and make sure directories and schema exist
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        db::open_connection(&config)?;
        let backups = BackupManager::new(config.clone());
        Ok(Self { config, backups })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// All books ordered by id
    pub fn list(&self) -> StoreResult<Vec<Book>> {
        let conn = db::open_connection(&self.config)?;
        db::get_all_books(&conn)
    }

    pub fn get(&self, id: i64) -> StoreResult<Book> {
        let conn = db::open_connection(&self.config)?;
        db::get_book(&conn, id)?.ok_or_else(|| StoreError::book_not_found(id))
    }

    /// Books whose author contains `query`, ordered by id
    pub fn search_by_author(&self, query: &str) -> StoreResult<Vec<Book>> {
        let conn = db::open_connection(&self.config)?;
        db::search_books_by_author(&conn, query.trim())
    }

    /// Validate, snapshot, insert. Returns the new id.
    pub fn add(&self, book: NewBook) -> StoreResult<i64> {
        let book = normalize_new_book(book)?;

        self.backups.snapshot("add")?;

        let conn = db::open_connection(&self.config)?;
        let id = db::insert_book(&conn, &book)?;

        info!(id, title = %book.title, "book added");
        Ok(id)
    }

    pub fn update_price(&self, id: i64, price: f64) -> StoreResult<()> {
        if !price_is_valid(price) {
            return Err(StoreError::Validation(MSG_INVALID_PRICE.into()));
        }

        let mut conn = db::open_connection(&self.config)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !db::book_exists(&tx, id)? {
            return Err(StoreError::book_not_found(id));
        }

        self.backups.snapshot("update_price")?;
        db::update_book_price(&tx, id, price)?;
        tx.commit()?;

        info!(id, price, "book price updated");
        Ok(())
    }

    pub fn delete(&self, id: i64) -> StoreResult<()> {
        let mut conn = db::open_connection(&self.config)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !db::book_exists(&tx, id)? {
            return Err(StoreError::book_not_found(id));
        }

        self.backups.snapshot("delete")?;
        db::delete_book(&tx, id)?;
        tx.commit()?;

        info!(id, "book deleted");
        Ok(())
    }

    /// Manual snapshot outside of any mutation
    pub fn backup(&self) -> StoreResult<PathBuf> {
        self.backups.snapshot("manual")
    }

    pub fn list_backups(&self) -> StoreResult<Vec<BackupInfo>> {
        self.backups.list_backups()
    }

    /// Current rows as CSV bytes
    pub fn export_csv(&self) -> StoreResult<Vec<u8>> {
        csv_io::export_csv(&self.list()?)
    }

    /// Write the CSV export to `exports/livros_exportados.csv`
    pub fn export_csv_to_file(&self) -> StoreResult<PathBuf> {
        let bytes = self.export_csv()?;
        self.config.ensure_directories()?;
        let path = self.config.export_dir().join(CSV_EXPORT_FILE);
        fs::write(&path, bytes)?;

        info!(path = %path.display(), "CSV export written");
        Ok(path)
    }

    /// Import CSV rows; one snapshot before the batch, none if nothing to insert
    ///
    /// Rows without a title or author are skipped. A row that fails to insert
    /// is logged and skipped without affecting the others.
    pub fn import_csv(&self, data: &[u8]) -> StoreResult<usize> {
        let rows: Vec<NewBook> = csv_io::parse_import(data)?
            .into_iter()
            .filter_map(|row| match normalize_new_book(row.book) {
                Ok(book) => Some(book),
                Err(e) => {
                    warn!(line = row.line, error = %e, "skipping CSV row");
                    None
                }
            })
            .collect();

        if rows.is_empty() {
            return Ok(0);
        }

        self.backups.snapshot("import")?;

        let conn = db::open_connection(&self.config)?;
        let mut inserted = 0;
        for book in &rows {
            match db::insert_book(&conn, book) {
                Ok(_) => inserted += 1,
                Err(e) => warn!(title = %book.title, error = %e, "failed to insert imported row"),
            }
        }

        info!(inserted, total = rows.len(), "CSV import finished");
        Ok(inserted)
    }

    /// Render a report of all books at `generated_at`
    pub fn render_report(
        &self,
        format: ReportFormat,
        generated_at: DateTime<Local>,
    ) -> StoreResult<Vec<u8>> {
        let books = self.list()?;
        match format {
            ReportFormat::Html => Ok(report::render_html(&books, generated_at).into_bytes()),
            ReportFormat::Pdf => report::render_pdf(&books, generated_at),
        }
    }

    /// Render a report and save it under `exports/`; returns path and bytes
    pub fn write_report(&self, format: ReportFormat) -> StoreResult<(PathBuf, Vec<u8>)> {
        let now = Local::now();
        let bytes = self.render_report(format, now)?;

        self.config.ensure_directories()?;
        let path = self.config.export_dir().join(report::report_file_name(format, now));
        fs::write(&path, &bytes)?;

        info!(path = %path.display(), "report written");
        Ok((path, bytes))
    }
}

/// Trim text fields and check the invariants a stored book must satisfy
fn normalize_new_book(book: NewBook) -> StoreResult<NewBook> {
    let title = book.title.trim().to_string();
    let author = book.author.trim().to_string();

    if title.is_empty() || author.is_empty() {
        return Err(StoreError::Validation(MSG_TITLE_AUTHOR_REQUIRED.into()));
    }
    if let Some(year) = book.year {
        if !year_in_range(year) {
            return Err(StoreError::Validation(MSG_INVALID_YEAR.into()));
        }
    }
    if let Some(price) = book.price {
        if !price_is_valid(price) {
            return Err(StoreError::Validation(MSG_INVALID_PRICE.into()));
        }
    }

    Ok(NewBook {
        title,
        author,
        year: book.year,
        price: book.price,
    })
}
