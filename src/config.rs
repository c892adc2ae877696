// Bookstore Inventory - Configuration
// Paths (<root>/data, <root>/backups, <root>/exports) and snapshot retention

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreResult;

pub const DEFAULT_ROOT_DIR: &str = "meu_sistema_livraria";
pub const DEFAULT_DB_FILE: &str = "livraria.db";
pub const DEFAULT_BACKUP_PREFIX: &str = "backup_livraria_";
pub const DEFAULT_RETENTION: usize = 5;

/// Paths and backup policy for one inventory
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory holding data/, backups/ and exports/
    pub root_dir: PathBuf,
    /// File name of the SQLite database inside data/
    pub db_file_name: String,
    /// Prefix for snapshot file names
    pub backup_prefix: String,
    /// Number of most-recent snapshots kept after pruning
    pub retention: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from(DEFAULT_ROOT_DIR),
            db_file_name: DEFAULT_DB_FILE.to_string(),
            backup_prefix: DEFAULT_BACKUP_PREFIX.to_string(),
            retention: DEFAULT_RETENTION,
        }
    }
}

impl StoreConfig {
    /// Default layout rooted at `root_dir`
    pub fn with_root(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Builder: override the retention count
    pub fn retention(mut self, retention: usize) -> Self {
        self.retention = retention;
        self
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root_dir.join("data")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.root_dir.join("backups")
    }

    pub fn export_dir(&self) -> PathBuf {
        self.root_dir.join("exports")
    }

    /// Full path of the SQLite database file
    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join(&self.db_file_name)
    }

    /// Create root, data, backup and export directories if missing
    pub fn ensure_directories(&self) -> StoreResult<()> {
        for dir in [
            self.root_dir.clone(),
            self.data_dir(),
            self.backup_dir(),
            self.export_dir(),
        ] {
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_layout() {
        let config = StoreConfig::default();
        assert_eq!(config.retention, 5);
        assert_eq!(
            config.db_path(),
            PathBuf::from("meu_sistema_livraria/data/livraria.db")
        );
        assert_eq!(config.backup_dir(), PathBuf::from("meu_sistema_livraria/backups"));
    }

    #[test]
    fn test_ensure_directories() {
        let temp = TempDir::new().unwrap();
        let config = StoreConfig::with_root(temp.path().join("shop")).retention(2);

        config.ensure_directories().unwrap();

        assert!(config.data_dir().is_dir());
        assert!(config.backup_dir().is_dir());
        assert!(config.export_dir().is_dir());
        assert_eq!(config.retention, 2);
    }
}
