pub mod accounts;
pub mod badges;
pub mod catalog;
pub mod leaderboard;
pub mod progress;
pub mod schema;
pub mod store;

use chrono::{DateTime, Utc};
use rand::Rng;
use rusqlite::types::Type;
use rusqlite::{Connection, Result, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// Re-export all public items from submodules
pub use accounts::*;
pub use badges::*;
pub use catalog::{seed_catalog, PERFECTIONIST_BADGE_ID, SCHOLAR_BADGE_ID};
pub use leaderboard::*;
pub use progress::*;
pub use schema::run_migrations;
pub use store::*;

pub type DbPool = Arc<Mutex<Connection>>;

/// Extension trait for logging errors before discarding them
pub trait LogOnError<T> {
    /// Log the error at warn level and return None
    fn log_warn(self, context: &str) -> Option<T>;
    /// Log the error at warn level and return the default
    fn log_warn_default(self, context: &str) -> T
    where
        T: Default;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
    fn log_warn(self, context: &str) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                None
            }
        }
    }

    fn log_warn_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                T::default()
            }
        }
    }
}

/// Error returned when database lock cannot be acquired
#[derive(Debug)]
pub struct DbLockError;

impl std::fmt::Display for DbLockError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Database unavailable")
  }
}

impl std::error::Error for DbLockError {}

/// Try to acquire the database lock, returning an error if poisoned
pub fn try_lock(pool: &DbPool) -> std::result::Result<MutexGuard<'_, Connection>, DbLockError> {
  pool.lock().map_err(|_: PoisonError<_>| {
    tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
    DbLockError
  })
}

/// Open the ledger database: create the directory, back up an existing file,
/// migrate, and seed the catalog.
pub fn init_db(path: &Path) -> Result<DbPool> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).ok();
  }

  // Create backup before migrations if database exists
  if path.exists() {
    let backup_path = path.with_extension("db.backup");
    if let Err(e) = std::fs::copy(path, &backup_path) {
      tracing::warn!("Could not create database backup: {}", e);
    }
  }

  let conn = Connection::open(path)?;
  run_migrations(&conn)?;
  seed_catalog(&conn)?;
  Ok(Arc::new(Mutex::new(conn)))
}

/// Close the shared connection at shutdown. Skipped while other handles are alive.
pub fn close_db(pool: DbPool) {
  match Arc::try_unwrap(pool) {
    Ok(mutex) => {
      let conn = mutex.into_inner().unwrap_or_else(PoisonError::into_inner);
      if let Err((_, e)) = conn.close() {
        tracing::warn!("Failed to close database: {}", e);
      } else {
        tracing::info!("Database closed");
      }
    }
    Err(_) => tracing::warn!("Database still in use at shutdown, leaving it to drop"),
  }
}

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// 20-character lowercase alphanumeric document id
pub fn new_document_id() -> String {
  let mut rng = rand::rng();
  (0..20)
    .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
    .collect()
}

// ==================== Row helpers ====================

fn conversion_error(idx: usize, err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> rusqlite::Error {
  rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

pub(crate) fn get_timestamp(row: &Row, idx: usize) -> Result<DateTime<Utc>> {
  let s: String = row.get(idx)?;
  DateTime::parse_from_rfc3339(&s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| conversion_error(idx, e))
}

pub(crate) fn get_opt_timestamp(row: &Row, idx: usize) -> Result<Option<DateTime<Utc>>> {
  let s: Option<String> = row.get(idx)?;
  s.map(|s| {
    DateTime::parse_from_rfc3339(&s)
      .map(|dt| dt.with_timezone(&Utc))
      .map_err(|e| conversion_error(idx, e))
  })
  .transpose()
}

pub(crate) fn get_json<T: DeserializeOwned>(row: &Row, idx: usize) -> Result<T> {
  let s: String = row.get(idx)?;
  serde_json::from_str(&s).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn get_opt_json<T: DeserializeOwned>(row: &Row, idx: usize) -> Result<Option<T>> {
  let s: Option<String> = row.get(idx)?;
  s.map(|s| serde_json::from_str(&s).map_err(|e| conversion_error(idx, e)))
    .transpose()
}

/// Parse a stored enum name with the type's `from_str`
pub(crate) fn get_enum<T>(row: &Row, idx: usize, parse: fn(&str) -> Option<T>) -> Result<T> {
  let s: String = row.get(idx)?;
  parse(&s).ok_or_else(|| conversion_error(idx, format!("unknown value: {}", s)))
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
  serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_document_id_shape() {
    let id = new_document_id();
    assert_eq!(id.len(), 20);
    assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    assert_ne!(id, new_document_id());
  }

  #[test]
  fn test_init_db_creates_dir_and_backup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("rewards.db");

    let pool = init_db(&path).unwrap();
    close_db(pool);
    assert!(path.exists());

    let pool = init_db(&path).unwrap();
    assert!(path.with_extension("db.backup").exists());
    let conn = try_lock(&pool).unwrap();
    let badges: i64 = conn.query_row("SELECT COUNT(*) FROM badges", [], |r| r.get(0)).unwrap();
    assert!(badges > 0);
  }

  #[test]
  fn test_log_warn_default() {
    let failed: std::result::Result<i64, String> = Err("boom".into());
    assert_eq!(failed.log_warn_default("test"), 0);
    let ok: std::result::Result<i64, String> = Ok(7);
    assert_eq!(ok.log_warn("test"), Some(7));
  }
}
