use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::StoreResult;

/// A book record as stored in the `livros` table
///
/// JSON field names follow the table columns so API clients and CSV files
/// share one vocabulary.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Book {
    pub id: i64,

    #[serde(rename = "titulo")]
    pub title: String,

    #[serde(rename = "autor")]
    pub author: String,

    #[serde(rename = "ano_publicacao")]
    pub year: Option<i32>,

    #[serde(rename = "preco")]
    pub price: Option<f64>,
}

/// Field values for a book that has not been inserted yet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
    pub price: Option<f64>,
}

impl NewBook {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        NewBook {
            title: title.into(),
            author: author.into(),
            year: None,
            price: None,
        }
    }

    /// Builder pattern: add publication year
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Builder pattern: add price
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }
}

const BOOK_COLUMNS: &str = "id, titulo, autor, ano_publicacao, preco";

/// Open a fresh connection to the configured database, creating directories
/// and schema as needed
pub fn open_connection(config: &StoreConfig) -> StoreResult<Connection> {
    config.ensure_directories()?;
    let conn = Connection::open(config.db_path())?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> StoreResult<()> {
    // Snapshots copy the main database file only, so stay on the rollback
    // journal instead of WAL.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS livros (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            titulo TEXT NOT NULL,
            autor TEXT NOT NULL,
            ano_publicacao INTEGER,
            preco REAL
        )",
        [],
    )?;

    Ok(())
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        year: row.get(3)?,
        price: row.get(4)?,
    })
}

pub fn get_all_books(conn: &Connection) -> StoreResult<Vec<Book>> {
    let mut stmt = conn.prepare(&format!("SELECT {BOOK_COLUMNS} FROM livros ORDER BY id"))?;

    let books = stmt
        .query_map([], book_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(books)
}

pub fn get_book(conn: &Connection, id: i64) -> StoreResult<Option<Book>> {
    let book = conn
        .query_row(
            &format!("SELECT {BOOK_COLUMNS} FROM livros WHERE id = ?1"),
            params![id],
            book_from_row,
        )
        .optional()?;

    Ok(book)
}

pub fn book_exists(conn: &Connection, id: i64) -> StoreResult<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM livros WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()?;

    Ok(found.is_some())
}

/// Substring match on author using LIKE; `%`, `_` and `\` in the query match
/// literally
pub fn search_books_by_author(conn: &Connection, query: &str) -> StoreResult<Vec<Book>> {
    let pattern = format!("%{}%", escape_like(query));
    debug!(pattern = %pattern, "searching books by author");

    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOK_COLUMNS} FROM livros WHERE autor LIKE ?1 ESCAPE '\\' ORDER BY id"
    ))?;

    let books = stmt
        .query_map(params![pattern], book_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(books)
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Insert a book and return its new id
pub fn insert_book(conn: &Connection, book: &NewBook) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO livros (titulo, autor, ano_publicacao, preco) VALUES (?1, ?2, ?3, ?4)",
        params![book.title, book.author, book.year, book.price],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Returns the number of rows changed (0 when the id does not exist)
pub fn update_book_price(conn: &Connection, id: i64, price: f64) -> StoreResult<usize> {
    let changed = conn.execute(
        "UPDATE livros SET preco = ?1 WHERE id = ?2",
        params![price, id],
    )?;
    Ok(changed)
}

/// Returns the number of rows deleted (0 when the id does not exist)
pub fn delete_book(conn: &Connection, id: i64) -> StoreResult<usize> {
    let deleted = conn.execute("DELETE FROM livros WHERE id = ?1", params![id])?;
    Ok(deleted)
}

pub fn verify_count(conn: &Connection) -> StoreResult<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM livros", [], |row| row.get(0))?;

    Ok(count)
}
