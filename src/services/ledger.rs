//! Points and XP ledger.
//!
//! Every function takes the connection of an open transaction and never
//! commits; the caller decides the atomic unit.

use chrono::Utc;
use rusqlite::Connection;
use serde_json::Value;

use crate::config::{MAX_POINTS_PER_MOVEMENT, MAX_XP_PER_AWARD, RewardRates};
use crate::db;
use crate::domain::{PointsSource, PointsTransaction, RewardsAccount, TransactionType};
use crate::error::{LedgerError, LedgerResult};
use crate::progression::{LevelState, XpAward, apply_xp_award};

/// One points movement as it will appear in the transaction log
#[derive(Debug, Clone)]
pub struct PointsMovement {
  pub amount: i64,
  pub source: PointsSource,
  pub description: String,
  pub source_id: Option<String>,
  pub metadata: Option<Value>,
}

impl PointsMovement {
  pub fn new(amount: i64, source: PointsSource, description: impl Into<String>) -> Self {
    Self {
      amount,
      source,
      description: description.into(),
      source_id: None,
      metadata: None,
    }
  }

  pub fn with_source_id(mut self, id: impl Into<String>) -> Self {
    self.source_id = Some(id.into());
    self
  }

  pub fn with_metadata(mut self, metadata: Value) -> Self {
    self.metadata = Some(metadata);
    self
  }
}

// ==================== Accounts ====================

/// Create a fresh account. Fails with `AlreadyExists` when one is present.
pub fn initialize_account(conn: &Connection, uid: &str) -> LedgerResult<RewardsAccount> {
  if db::account_exists(conn, uid)? {
    return Err(LedgerError::AlreadyExists(uid.to_string()));
  }
  let account = RewardsAccount::new(uid);
  db::insert_account(conn, &account)?;
  tracing::info!(uid, "Initialized rewards account");
  Ok(account)
}

/// Create the account on first use; no-op when it exists
pub fn ensure_account(conn: &Connection, uid: &str) -> LedgerResult<()> {
  if !db::account_exists(conn, uid)? {
    db::insert_account(conn, &RewardsAccount::new(uid))?;
    tracing::debug!(uid, "Created rewards account on first use");
  }
  Ok(())
}

pub fn get_account(conn: &Connection, uid: &str) -> LedgerResult<RewardsAccount> {
  db::get_account(conn, uid)?.ok_or_else(|| LedgerError::not_found("Rewards account", uid))
}

/// Spendable balance; 0 for unknown users
pub fn get_balance(conn: &Connection, uid: &str) -> LedgerResult<i64> {
  Ok(db::get_available_points(conn, uid)?.unwrap_or(0))
}

pub fn get_transactions(conn: &Connection, uid: &str, limit: i64) -> LedgerResult<Vec<PointsTransaction>> {
  Ok(db::get_transactions(conn, uid, limit)?)
}

// ==================== Points ====================

fn check_amount(amount: i64) -> LedgerResult<()> {
  if amount <= 0 {
    return Err(LedgerError::invalid("amount", "must be greater than 0"));
  }
  if amount > MAX_POINTS_PER_MOVEMENT {
    return Err(LedgerError::invalid(
      "amount",
      format!("must be at most {}", MAX_POINTS_PER_MOVEMENT),
    ));
  }
  Ok(())
}

/// Credit points and append an `earned` transaction
pub fn award_points(conn: &Connection, uid: &str, movement: &PointsMovement) -> LedgerResult<PointsTransaction> {
  check_amount(movement.amount)?;

  let now = Utc::now();
  if db::credit_points(conn, uid, movement.amount, now)? == 0 {
    return Err(LedgerError::not_found("Rewards account", uid));
  }
  let balance = db::get_available_points(conn, uid)?.unwrap_or(0);

  let tx = PointsTransaction {
    id: db::new_document_id(),
    uid: uid.to_string(),
    tx_type: TransactionType::Earned,
    amount: movement.amount,
    balance,
    source: movement.source,
    source_id: movement.source_id.clone(),
    description: movement.description.clone(),
    metadata: movement.metadata.clone(),
    timestamp: now,
  };
  db::insert_transaction(conn, &tx)?;

  tracing::debug!(uid, amount = movement.amount, source = movement.source.as_str(), "Awarded points");
  Ok(tx)
}

/// Debit points if the balance covers them. Returns false, writing nothing,
/// when it does not.
pub fn spend_points(conn: &Connection, uid: &str, movement: &PointsMovement) -> LedgerResult<bool> {
  check_amount(movement.amount)?;

  let now = Utc::now();
  if db::debit_points(conn, uid, movement.amount, now)? == 0 {
    if !db::account_exists(conn, uid)? {
      return Err(LedgerError::not_found("Rewards account", uid));
    }
    tracing::debug!(uid, amount = movement.amount, "Insufficient balance");
    return Ok(false);
  }
  let balance = db::get_available_points(conn, uid)?.unwrap_or(0);

  let tx = PointsTransaction {
    id: db::new_document_id(),
    uid: uid.to_string(),
    tx_type: TransactionType::Spent,
    amount: -movement.amount,
    balance,
    source: movement.source,
    source_id: movement.source_id.clone(),
    description: movement.description.clone(),
    metadata: movement.metadata.clone(),
    timestamp: now,
  };
  db::insert_transaction(conn, &tx)?;

  tracing::debug!(uid, amount = movement.amount, balance, "Spent points");
  Ok(true)
}

// ==================== XP ====================

/// Add XP on the configured curve. Each level gained pays the level-up bonus.
pub fn award_xp(conn: &Connection, rates: &RewardRates, uid: &str, xp: i64) -> LedgerResult<XpAward> {
  if xp < 0 {
    return Err(LedgerError::invalid("xp", "must not be negative"));
  }
  if xp > MAX_XP_PER_AWARD {
    return Err(LedgerError::invalid("xp", format!("must be at most {}", MAX_XP_PER_AWARD)));
  }

  let account = get_account(conn, uid)?;
  let before = LevelState {
    level: account.current_level,
    current_xp: account.current_xp,
    xp_to_next_level: account.xp_to_next_level,
    total_xp: account.total_xp_earned,
  };
  let award = apply_xp_award(before, xp, rates.level_curve);
  let after = award.state;
  db::update_level_state(conn, uid, after.level, after.current_xp, after.xp_to_next_level, after.total_xp)?;

  if award.leveled_up {
    tracing::info!(uid, level = after.level, "Level up");
    let bonus = rates
      .level_up_bonus_per_level
      .saturating_mul(award.levels_gained)
      .min(MAX_POINTS_PER_MOVEMENT);
    if bonus > 0 {
      let movement = PointsMovement::new(
        bonus,
        PointsSource::LevelUp,
        format!("Level up bonus: reached level {}", after.level),
      );
      award_points(conn, uid, &movement)?;
    }
  }

  Ok(award)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::TestEnv;

  #[test]
  fn test_initialize_twice_fails() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    initialize_account(&conn, "u1").unwrap();
    let err = initialize_account(&conn, "u1").unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyExists(_)));
  }

  #[test]
  fn test_award_points_updates_balances_and_logs() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    initialize_account(&conn, "u1").unwrap();

    let movement = PointsMovement::new(40, PointsSource::AdminAdjustment, "bonus").with_source_id("ref-1");
    let tx = award_points(&conn, "u1", &movement).unwrap();
    assert_eq!(tx.balance, 40);
    assert_eq!(tx.tx_type, TransactionType::Earned);

    let account = get_account(&conn, "u1").unwrap();
    assert_eq!(account.total_points, 40);
    assert_eq!(account.available_points, 40);
    assert_eq!(account.lifetime_points_earned, 40);
    assert_eq!(get_transactions(&conn, "u1", 10).unwrap()[0].source_id.as_deref(), Some("ref-1"));
  }

  #[test]
  fn test_award_rejects_non_positive() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    initialize_account(&conn, "u1").unwrap();
    let movement = PointsMovement::new(0, PointsSource::AdminAdjustment, "nothing");
    assert!(matches!(award_points(&conn, "u1", &movement), Err(LedgerError::Validation { .. })));
  }

  #[test]
  fn test_award_to_missing_account_is_not_found() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    let movement = PointsMovement::new(5, PointsSource::AdminAdjustment, "x");
    assert!(matches!(award_points(&conn, "ghost", &movement), Err(LedgerError::NotFound { .. })));
    assert_eq!(get_balance(&conn, "ghost").unwrap(), 0);
  }

  #[test]
  fn test_spend_insufficient_writes_nothing() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    initialize_account(&conn, "u1").unwrap();
    award_points(&conn, "u1", &PointsMovement::new(30, PointsSource::AdminAdjustment, "seed")).unwrap();

    let spend = PointsMovement::new(31, PointsSource::Redemption, "too much");
    assert!(!spend_points(&conn, "u1", &spend).unwrap());

    let account = get_account(&conn, "u1").unwrap();
    assert_eq!(account.available_points, 30);
    assert_eq!(account.total_spent, 0);
    assert_eq!(get_transactions(&conn, "u1", 10).unwrap().len(), 1);
  }

  #[test]
  fn test_spend_success_logs_negative_amount() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    initialize_account(&conn, "u1").unwrap();
    award_points(&conn, "u1", &PointsMovement::new(30, PointsSource::AdminAdjustment, "seed")).unwrap();

    assert!(spend_points(&conn, "u1", &PointsMovement::new(30, PointsSource::Redemption, "all")).unwrap());
    let account = get_account(&conn, "u1").unwrap();
    assert_eq!(account.available_points, 0);
    assert_eq!(account.total_spent, 30);
    assert_eq!(account.total_points, 30);

    let last = &get_transactions(&conn, "u1", 1).unwrap()[0];
    assert_eq!(last.amount, -30);
    assert_eq!(last.balance, 0);
    assert_eq!(last.tx_type, TransactionType::Spent);
  }

  #[test]
  fn test_spend_missing_account_is_not_found() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    let spend = PointsMovement::new(1, PointsSource::Redemption, "x");
    assert!(matches!(spend_points(&conn, "ghost", &spend), Err(LedgerError::NotFound { .. })));
  }

  #[test]
  fn test_award_xp_level_up_pays_bonus() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    initialize_account(&conn, "u1").unwrap();

    // 100 + 200 = 300 xp crosses two levels
    let award = award_xp(&conn, &env.rates, "u1", 300).unwrap();
    assert!(award.leveled_up);
    assert_eq!(award.levels_gained, 2);

    let account = get_account(&conn, "u1").unwrap();
    assert_eq!(account.current_level, 3);
    assert_eq!(account.current_xp, 0);
    assert_eq!(account.xp_to_next_level, 300);
    assert_eq!(account.total_xp_earned, 300);
    assert_eq!(account.available_points, 100);

    let tx = &get_transactions(&conn, "u1", 1).unwrap()[0];
    assert_eq!(tx.source, PointsSource::LevelUp);
  }

  #[test]
  fn test_award_xp_without_level_up_pays_nothing() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    initialize_account(&conn, "u1").unwrap();
    let award = award_xp(&conn, &env.rates, "u1", 99).unwrap();
    assert!(!award.leveled_up);
    assert_eq!(get_balance(&conn, "u1").unwrap(), 0);
  }

  #[test]
  fn test_award_xp_negative_rejected() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    initialize_account(&conn, "u1").unwrap();
    assert!(matches!(award_xp(&conn, &env.rates, "u1", -1), Err(LedgerError::Validation { .. })));
  }

  #[test]
  fn test_oversized_movements_rejected() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    initialize_account(&conn, "u1").unwrap();

    let huge = PointsMovement::new(i64::MAX, PointsSource::AdminAdjustment, "huge");
    assert!(matches!(award_points(&conn, "u1", &huge), Err(LedgerError::Validation { .. })));
    assert!(matches!(spend_points(&conn, "u1", &huge), Err(LedgerError::Validation { .. })));
    assert!(matches!(
      award_xp(&conn, &env.rates, "u1", MAX_XP_PER_AWARD + 1),
      Err(LedgerError::Validation { .. })
    ));

    let account = get_account(&conn, "u1").unwrap();
    assert_eq!(account.total_xp_earned, 0);
    assert_eq!(account.available_points, 0);

    // The largest allowed award still applies
    let award = award_xp(&conn, &env.rates, "u1", MAX_XP_PER_AWARD).unwrap();
    assert!(award.leveled_up);
    assert_eq!(get_account(&conn, "u1").unwrap().total_xp_earned, MAX_XP_PER_AWARD);
  }
}
