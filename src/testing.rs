//! Test utilities for database setup.
//!
//! Reuses the production initialization path (migrations plus catalog seed)
//! so tests never carry their own copy of the schema.

use rusqlite::Connection;
use std::path::Path;
use std::sync::MutexGuard;
use tempfile::TempDir;

use crate::config::RewardRates;
use crate::db::{self, DbPool};
use crate::state::AppState;

/// Test environment with a migrated, seeded rewards.db in a temporary directory.
///
/// The directory is removed when the environment is dropped.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    pub pool: DbPool,
    pub rates: RewardRates,
}

impl TestEnv {
    /// Create a test environment with default reward rates.
    pub fn new() -> rusqlite::Result<Self> {
        Self::with_rates(RewardRates::default())
    }

    pub fn with_rates(rates: RewardRates) -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        let pool = db::init_db(&temp.path().join("rewards.db"))?;
        Ok(Self { temp, pool, rates })
    }

    /// Lock the shared connection
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        db::try_lock(&self.pool).expect("test database lock")
    }

    /// Application state sharing this environment's database
    pub fn state(&self) -> AppState {
        AppState::new(self.pool.clone(), self.rates.clone())
    }

    /// Get the temporary directory path for creating test files.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }
}
