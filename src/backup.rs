// Bookstore Inventory - Snapshots
// Copies the SQLite file to backups/<prefix><YYYY-MM-DD_HH-MM-SS>.db before each change, then prunes

use std::cmp::Reverse;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::db::open_connection;
use crate::error::StoreResult;

const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const SNAPSHOT_EXTENSION: &str = ".db";

/// Metadata about a snapshot file
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    /// Snapshot filename
    pub filename: String,
    /// Full path to the snapshot
    pub path: PathBuf,
    /// File modification time
    pub modified: DateTime<Local>,
    /// Size in bytes
    pub size_bytes: u64,
    /// Hex SHA-256 of the file contents
    pub sha256: String,
}

/// Creates and prunes database snapshots
#[derive(Debug, Clone)]
pub struct BackupManager {
    config: StoreConfig,
}

impl BackupManager {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.config.backup_dir()
    }

    /// Copy the database to a new timestamped snapshot, then prune
    ///
    /// Creates the database (with schema) first when it does not exist yet.
    /// Returns the path of the new snapshot. Copy failures propagate.
    pub fn snapshot(&self, reason: &str) -> StoreResult<PathBuf> {
        self.config.ensure_directories()?;

        let db_path = self.config.db_path();
        if !db_path.exists() {
            debug!(path = %db_path.display(), "database missing, initializing before snapshot");
            open_connection(&self.config)?;
        }

        let timestamp = Local::now().format(SNAPSHOT_TIMESTAMP_FORMAT).to_string();
        let snapshot_path = self.copy_to_new_snapshot(&db_path, &timestamp)?;

        info!(
            reason = reason,
            snapshot = %snapshot_path.display(),
            "database snapshot created"
        );

        self.prune();

        Ok(snapshot_path)
    }

    /// Copy `source` into a snapshot file that did not exist before
    fn copy_to_new_snapshot(&self, source: &Path, timestamp: &str) -> StoreResult<PathBuf> {
        let backup_dir = self.config.backup_dir();
        let mut counter = 0u32;

        loop {
            let filename = if counter == 0 {
                format!("{}{}{}", self.config.backup_prefix, timestamp, SNAPSHOT_EXTENSION)
            } else {
                format!(
                    "{}{}_{}{}",
                    self.config.backup_prefix, timestamp, counter, SNAPSHOT_EXTENSION
                )
            };
            let path = backup_dir.join(filename);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut dest) => {
                    let mut src = File::open(source)?;
                    io::copy(&mut src, &mut dest)?;
                    dest.sync_all()?;
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => counter += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Delete snapshots beyond the retention count, newest kept
    ///
    /// Best effort: listing or deletion failures are logged and skipped.
    /// Returns the paths that were actually deleted.
    pub fn prune(&self) -> Vec<PathBuf> {
        let snapshots = match self.sorted_snapshots() {
            Ok(snapshots) => snapshots,
            Err(e) => {
                warn!(error = %e, "could not list snapshots for pruning");
                return Vec::new();
            }
        };

        let mut deleted = Vec::new();
        for snapshot in snapshots.into_iter().skip(self.config.retention) {
            match fs::remove_file(&snapshot.path) {
                Ok(()) => {
                    debug!(snapshot = %snapshot.path.display(), "pruned old snapshot");
                    deleted.push(snapshot.path);
                }
                Err(e) => {
                    warn!(snapshot = %snapshot.path.display(), error = %e, "failed to prune snapshot");
                }
            }
        }

        deleted
    }

    /// List all snapshots, newest first
    pub fn list_backups(&self) -> StoreResult<Vec<BackupInfo>> {
        let mut backups = Vec::new();

        for snapshot in self.sorted_snapshots()? {
            let metadata = fs::metadata(&snapshot.path)?;
            backups.push(BackupInfo {
                sha256: file_sha256(&snapshot.path)?,
                size_bytes: metadata.len(),
                modified: DateTime::<Local>::from(snapshot.modified),
                filename: snapshot.filename,
                path: snapshot.path,
            });
        }

        Ok(backups)
    }

    /// Snapshot files matching the prefix, newest first
    ///
    /// Ordered by modification time, ties broken by the timestamp and
    /// counter encoded in the name.
    fn sorted_snapshots(&self) -> io::Result<Vec<SnapshotFile>> {
        let backup_dir = self.config.backup_dir();
        if !backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut snapshots = Vec::new();
        for entry in fs::read_dir(&backup_dir)? {
            let entry = entry?;
            let filename = entry.file_name().to_string_lossy().to_string();
            let Some(stem) = filename
                .strip_prefix(self.config.backup_prefix.as_str())
                .and_then(|rest| rest.strip_suffix(SNAPSHOT_EXTENSION))
            else {
                continue;
            };

            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            let name_key = snapshot_name_key(stem);
            snapshots.push(SnapshotFile {
                modified: metadata.modified()?,
                name_key,
                path: entry.path(),
                filename,
            });
        }

        snapshots.sort_by_key(|s| Reverse((s.modified, s.name_key.clone())));
        Ok(snapshots)
    }
}

struct SnapshotFile {
    filename: String,
    path: PathBuf,
    modified: SystemTime,
    name_key: (String, u32),
}

/// Split `2025-01-31_10-00-00_2` into its timestamp and counter
fn snapshot_name_key(stem: &str) -> (String, u32) {
    let timestamp_len = "YYYY-MM-DD_HH-MM-SS".len();
    if stem.len() > timestamp_len && stem.is_char_boundary(timestamp_len) {
        let (timestamp, suffix) = stem.split_at(timestamp_len);
        if let Some(counter) = suffix.strip_prefix('_').and_then(|n| n.parse().ok()) {
            return (timestamp.to_string(), counter);
        }
    }
    (stem.to_string(), 0)
}

fn file_sha256(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_manager(retention: usize) -> (BackupManager, StoreConfig, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::with_root(temp_dir.path().join("root")).retention(retention);
        let manager = BackupManager::new(config.clone());
        (manager, config, temp_dir)
    }

    fn snapshot_count(config: &StoreConfig) -> usize {
        fs::read_dir(config.backup_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with(&config.backup_prefix)
            })
            .count()
    }

    #[test]
    fn test_snapshot_without_database_initializes_it() {
        let (manager, config, _temp) = create_test_manager(5);
        assert!(!config.db_path().exists());

        let path = manager.snapshot("manual").unwrap();

        assert!(config.db_path().exists());
        assert!(path.exists());
        assert_eq!(fs::read(&path).unwrap(), fs::read(config.db_path()).unwrap());

        // The copy is a usable database with the books table
        let conn = rusqlite::Connection::open(&path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM livros", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_snapshot_name_format() {
        let (manager, _config, _temp) = create_test_manager(5);

        let path = manager.snapshot("manual").unwrap();
        let filename = path.file_name().unwrap().to_string_lossy().to_string();
        let stem = filename
            .strip_prefix("backup_livraria_")
            .and_then(|s| s.strip_suffix(".db"))
            .unwrap();

        let (timestamp, _) = snapshot_name_key(stem);
        assert!(
            chrono::NaiveDateTime::parse_from_str(&timestamp, SNAPSHOT_TIMESTAMP_FORMAT).is_ok(),
            "unexpected timestamp {:?}",
            timestamp
        );
    }

    #[test]
    fn test_same_second_snapshots_do_not_overwrite() {
        let (manager, config, _temp) = create_test_manager(10);

        let first = manager.snapshot("a").unwrap();
        let second = manager.snapshot("b").unwrap();
        let third = manager.snapshot("c").unwrap();

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_eq!(snapshot_count(&config), 3);
    }

    #[test]
    fn test_retention_keeps_newest() {
        let (manager, config, _temp) = create_test_manager(5);

        let mut created = Vec::new();
        for i in 0..6 {
            created.push(manager.snapshot(&format!("op{}", i)).unwrap());
        }

        assert_eq!(snapshot_count(&config), 5);
        assert!(!created[0].exists(), "oldest snapshot should be pruned");
        for path in &created[1..] {
            assert!(path.exists());
        }
    }

    #[test]
    fn test_prune_orders_by_modification_time() {
        let (manager, config, _temp) = create_test_manager(2);
        config.ensure_directories().unwrap();

        // Names sort opposite to modification times
        let base = SystemTime::now() - Duration::from_secs(3600);
        let names = [
            "backup_livraria_2030-01-01_00-00-00.db",
            "backup_livraria_2029-01-01_00-00-00.db",
            "backup_livraria_2028-01-01_00-00-00.db",
        ];
        for (i, name) in names.iter().enumerate() {
            let path = config.backup_dir().join(name);
            let file = File::create(&path).unwrap();
            file.set_modified(base + Duration::from_secs(60 * i as u64))
                .unwrap();
        }

        let deleted = manager.prune();

        assert_eq!(deleted.len(), 1);
        assert!(deleted[0].ends_with(names[0]));
        assert!(config.backup_dir().join(names[1]).exists());
        assert!(config.backup_dir().join(names[2]).exists());
    }

    #[test]
    fn test_prune_ignores_foreign_files() {
        let (manager, config, _temp) = create_test_manager(0);
        config.ensure_directories().unwrap();
        let foreign = config.backup_dir().join("notes.txt");
        fs::write(&foreign, "keep me").unwrap();

        manager.snapshot("manual").unwrap();

        assert!(foreign.exists());
        assert_eq!(snapshot_count(&config), 0);
    }

    #[test]
    fn test_prune_on_missing_directory() {
        let (manager, _config, _temp) = create_test_manager(5);
        assert!(manager.prune().is_empty());
        assert!(manager.list_backups().unwrap().is_empty());
    }

    #[test]
    fn test_list_backups() {
        let (manager, _config, _temp) = create_test_manager(5);

        let first = manager.snapshot("a").unwrap();
        let second = manager.snapshot("b").unwrap();

        let backups = manager.list_backups().unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(backups[0].path, second);
        assert_eq!(backups[1].path, first);
        assert_eq!(backups[0].sha256.len(), 64);
        assert_eq!(backups[0].sha256, backups[1].sha256);
        assert!(backups[0].size_bytes > 0);
    }

    #[test]
    fn test_snapshot_name_key() {
        assert_eq!(
            snapshot_name_key("2025-01-31_10-00-00"),
            ("2025-01-31_10-00-00".to_string(), 0)
        );
        assert_eq!(
            snapshot_name_key("2025-01-31_10-00-00_12"),
            ("2025-01-31_10-00-00".to_string(), 12)
        );
        assert_eq!(snapshot_name_key("odd"), ("odd".to_string(), 0));
    }
}
