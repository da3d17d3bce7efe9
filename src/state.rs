//! Application state shared by all handlers.

use rusqlite::Connection;
use std::sync::Arc;

use crate::config::RewardRates;
use crate::db::{self, DbPool, LogOnError};
use crate::error::{LedgerError, LedgerResult};
use crate::services::feed::{FeedEvent, RewardsFeed};
use crate::services::{ledger, progress};

/// Application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    /// Process-wide database handle; the mutex serializes all writes
    pub db: DbPool,

    /// Live listeners per uid
    pub feed: Arc<RewardsFeed>,

    pub rates: Arc<RewardRates>,
}

impl AppState {
    pub fn new(db: DbPool, rates: RewardRates) -> Self {
        Self {
            db,
            feed: Arc::new(RewardsFeed::new()),
            rates: Arc::new(rates),
        }
    }

    /// Run `f` inside one database transaction.
    ///
    /// Commits when `f` succeeds; any error rolls the whole operation back and
    /// is logged with the uid and operation name before it propagates.
    pub fn transact<T>(
        &self,
        operation: &'static str,
        uid: &str,
        f: impl FnOnce(&Connection, &RewardRates) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let mut conn = db::try_lock(&self.db)?;
        let result = run_in_transaction(&mut conn, |tx| f(tx, &self.rates));
        if let Err(e) = &result {
            log_failure(operation, Some(uid), e);
        }
        result
    }

    /// Run a read-only query about one user
    pub fn read<T>(
        &self,
        operation: &'static str,
        uid: &str,
        f: impl FnOnce(&Connection) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        self.run_read(operation, Some(uid), f)
    }

    /// Run a read-only query that spans all users (catalog, leaderboard)
    pub fn read_shared<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&Connection) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        self.run_read(operation, None, f)
    }

    fn run_read<T>(
        &self,
        operation: &'static str,
        uid: Option<&str>,
        f: impl FnOnce(&Connection) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let conn = db::try_lock(&self.db)?;
        let result = f(&conn);
        if let Err(e) = &result {
            log_failure(operation, uid, e);
        }
        result
    }

    /// Publish fresh account and progress snapshots to live listeners of `uid`.
    ///
    /// Call after the write has committed.
    pub fn notify(&self, uid: &str) {
        if !self.feed.has_listeners(uid) {
            return;
        }
        let Some(conn) = db::try_lock(&self.db).log_warn("Feed snapshot skipped") else {
            return;
        };
        let account = ledger::get_account(&conn, uid).log_warn("Feed account snapshot");
        let progress = progress::get_progress(&conn, uid).ok();
        drop(conn);

        if let Some(account) = account {
            self.feed.publish(uid, FeedEvent::Rewards(account));
        }
        if let Some(progress) = progress {
            self.feed.publish(uid, FeedEvent::Progress(progress));
        }
    }
}

fn run_in_transaction<T>(
    conn: &mut Connection,
    f: impl FnOnce(&Connection) -> LedgerResult<T>,
) -> LedgerResult<T> {
    let tx = conn.transaction()?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

fn log_failure(operation: &str, uid: Option<&str>, e: &LedgerError) {
    match e {
        LedgerError::StoreUnavailable | LedgerError::Store(_) | LedgerError::Malformed(_) => {
            tracing::error!(uid, operation, "Ledger operation failed: {}", e)
        }
        _ => tracing::warn!(uid, operation, "Ledger operation rejected: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PointsSource;
    use crate::services::ledger::PointsMovement;
    use crate::testing::TestEnv;

    #[test]
    fn test_failed_operation_rolls_back() {
        let env = TestEnv::new().unwrap();
        let state = env.state();

        let result: LedgerResult<()> = state.transact("test", "u1", |conn, _| {
            ledger::initialize_account(conn, "u1")?;
            Err(LedgerError::invalid("amount", "forced failure"))
        });
        assert!(result.is_err());

        let exists = state
            .read("test", "u1", |conn| Ok(db::account_exists(conn, "u1")?))
            .unwrap();
        assert!(!exists);
    }

    #[test]
    fn test_committed_operation_is_visible() {
        let env = TestEnv::new().unwrap();
        let state = env.state();

        state
            .transact("award_points", "u1", |conn, _| {
                ledger::initialize_account(conn, "u1")?;
                ledger::award_points(
                    conn,
                    "u1",
                    &PointsMovement::new(25, PointsSource::AdminAdjustment, "seed"),
                )
            })
            .unwrap();

        let balance = state
            .read("get_balance", "u1", |conn| ledger::get_balance(conn, "u1"))
            .unwrap();
        assert_eq!(balance, 25);
    }

    #[test]
    fn test_shared_read_without_uid() {
        let env = TestEnv::new().unwrap();
        let state = env.state();

        let badges = state
            .read_shared("list_badges", crate::services::badges::list_active_badges)
            .unwrap();
        assert!(!badges.is_empty());

        let err = state
            .read_shared("get_account", |conn| ledger::get_account(conn, "ghost"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_notify_publishes_snapshots() {
        use tokio_stream::StreamExt;

        let env = TestEnv::new().unwrap();
        let state = env.state();
        state
            .transact("init", "u1", |conn, _| ledger::initialize_account(conn, "u1"))
            .unwrap();

        let mut sub = state.feed.subscribe("u1");
        state.notify("u1");

        match sub.next().await {
            Some(FeedEvent::Rewards(account)) => assert_eq!(account.uid, "u1"),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
