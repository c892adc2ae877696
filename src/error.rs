// Bookstore Inventory - Error Types
// One enum for validation, missing records and the I/O, database and CSV failures beneath them

use thiserror::Error;

/// The main error type for inventory operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Rejected input (empty title/author, bad year or price)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: &'static str, id: i64 },

    /// File I/O errors (backup copies, exports)
    #[error("I/O error: {0}")]
    Io(String),

    /// SQLite errors
    #[error("Database error: {0}")]
    Database(String),

    /// CSV read/write errors
    #[error("CSV error: {0}")]
    Csv(String),

    /// Report rendering errors
    #[error("Report error: {0}")]
    Report(String),
}

impl StoreError {
    /// Create a "not found" error for books
    pub fn book_not_found(id: i64) -> Self {
        Self::NotFound {
            entity_type: "Book",
            id,
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<csv::Error> for StoreError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

/// Result type alias for inventory operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = StoreError::book_not_found(42);
        assert_eq!(err.to_string(), "Book not found: 42");
        assert!(err.is_not_found());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_validation_error_display() {
        let err = StoreError::Validation("Ano inválido.".into());
        assert_eq!(err.to_string(), "Validation error: Ano inválido.");
        assert!(err.is_validation());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
