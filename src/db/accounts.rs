//! Rewards accounts and the append-only points transaction log

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use crate::domain::{PointsSource, PointsTransaction, RewardsAccount, TransactionType};

use super::{get_enum, get_opt_json, get_opt_timestamp, get_timestamp, to_json};

const ACCOUNT_COLUMNS: &str = r#"
  uid, total_points, available_points, lifetime_points_earned, current_level, current_xp,
  xp_to_next_level, total_xp_earned, total_badges, total_achievements, current_streak,
  longest_streak, total_redemptions, total_spent, last_earned_at, last_redeemed_at, updated_at
"#;

fn row_to_account(row: &Row) -> Result<RewardsAccount> {
  Ok(RewardsAccount {
    uid: row.get(0)?,
    total_points: row.get(1)?,
    available_points: row.get(2)?,
    lifetime_points_earned: row.get(3)?,
    current_level: row.get(4)?,
    current_xp: row.get(5)?,
    xp_to_next_level: row.get(6)?,
    total_xp_earned: row.get(7)?,
    total_badges: row.get(8)?,
    total_achievements: row.get(9)?,
    current_streak: row.get(10)?,
    longest_streak: row.get(11)?,
    total_redemptions: row.get(12)?,
    total_spent: row.get(13)?,
    last_earned_at: get_opt_timestamp(row, 14)?,
    last_redeemed_at: get_opt_timestamp(row, 15)?,
    updated_at: get_timestamp(row, 16)?,
  })
}

pub fn insert_account(conn: &Connection, account: &RewardsAccount) -> Result<()> {
  let now = account.updated_at.to_rfc3339();
  conn.execute(
    r#"
    INSERT INTO rewards_accounts (uid, total_points, available_points, lifetime_points_earned,
                                  current_level, current_xp, xp_to_next_level, total_xp_earned,
                                  total_badges, total_achievements, current_streak, longest_streak,
                                  total_redemptions, total_spent, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)
    "#,
    params![
      account.uid,
      account.total_points,
      account.available_points,
      account.lifetime_points_earned,
      account.current_level,
      account.current_xp,
      account.xp_to_next_level,
      account.total_xp_earned,
      account.total_badges,
      account.total_achievements,
      account.current_streak,
      account.longest_streak,
      account.total_redemptions,
      account.total_spent,
      now,
    ],
  )?;
  Ok(())
}

pub fn get_account(conn: &Connection, uid: &str) -> Result<Option<RewardsAccount>> {
  conn
    .query_row(
      &format!("SELECT {} FROM rewards_accounts WHERE uid = ?1", ACCOUNT_COLUMNS),
      params![uid],
      row_to_account,
    )
    .optional()
}

pub fn account_exists(conn: &Connection, uid: &str) -> Result<bool> {
  conn.query_row(
    "SELECT EXISTS(SELECT 1 FROM rewards_accounts WHERE uid = ?1)",
    params![uid],
    |row| row.get(0),
  )
}

pub fn get_available_points(conn: &Connection, uid: &str) -> Result<Option<i64>> {
  conn
    .query_row(
      "SELECT available_points FROM rewards_accounts WHERE uid = ?1",
      params![uid],
      |row| row.get(0),
    )
    .optional()
}

/// Add earned points to all three balances. Returns rows updated (0 = no account).
pub fn credit_points(conn: &Connection, uid: &str, amount: i64, at: DateTime<Utc>) -> Result<usize> {
  let now = at.to_rfc3339();
  conn.execute(
    r#"
    UPDATE rewards_accounts SET
      total_points = total_points + ?2,
      available_points = available_points + ?2,
      lifetime_points_earned = lifetime_points_earned + ?2,
      last_earned_at = ?3,
      updated_at = ?3
    WHERE uid = ?1
    "#,
    params![uid, amount, now],
  )
}

/// Conditionally debit the spendable balance. Returns 0 rows when the account
/// is missing or holds fewer than `amount` points.
pub fn debit_points(conn: &Connection, uid: &str, amount: i64, at: DateTime<Utc>) -> Result<usize> {
  conn.execute(
    r#"
    UPDATE rewards_accounts SET
      available_points = available_points - ?2,
      total_spent = total_spent + ?2,
      updated_at = ?3
    WHERE uid = ?1 AND available_points >= ?2
    "#,
    params![uid, amount, at.to_rfc3339()],
  )
}

pub fn update_level_state(
  conn: &Connection,
  uid: &str,
  level: i64,
  current_xp: i64,
  xp_to_next_level: i64,
  total_xp: i64,
) -> Result<usize> {
  conn.execute(
    r#"
    UPDATE rewards_accounts SET
      current_level = ?2, current_xp = ?3, xp_to_next_level = ?4, total_xp_earned = ?5,
      updated_at = ?6
    WHERE uid = ?1
    "#,
    params![uid, level, current_xp, xp_to_next_level, total_xp, Utc::now().to_rfc3339()],
  )
}

/// Counter columns that can be incremented by one
#[derive(Debug, Clone, Copy)]
pub enum AccountCounter {
  Badges,
  Achievements,
  Redemptions,
}

impl AccountCounter {
  fn column(&self) -> &'static str {
    match self {
      Self::Badges => "total_badges",
      Self::Achievements => "total_achievements",
      Self::Redemptions => "total_redemptions",
    }
  }
}

pub fn increment_counter(conn: &Connection, uid: &str, counter: AccountCounter) -> Result<usize> {
  let now = Utc::now().to_rfc3339();
  let extra = match counter {
    AccountCounter::Redemptions => ", last_redeemed_at = ?2",
    _ => "",
  };
  conn.execute(
    &format!(
      "UPDATE rewards_accounts SET {col} = {col} + 1, updated_at = ?2{extra} WHERE uid = ?1",
      col = counter.column(),
      extra = extra
    ),
    params![uid, now],
  )
}

pub fn get_account_streak(conn: &Connection, uid: &str) -> Result<Option<(Option<NaiveDate>, i64, i64)>> {
  conn
    .query_row(
      "SELECT last_activity_date, current_streak, longest_streak FROM rewards_accounts WHERE uid = ?1",
      params![uid],
      |row| {
        let last: Option<String> = row.get(0)?;
        let last = last.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok());
        Ok((last, row.get(1)?, row.get(2)?))
      },
    )
    .optional()
}

pub fn set_account_streak(conn: &Connection, uid: &str, day: NaiveDate, current: i64, longest: i64) -> Result<usize> {
  conn.execute(
    r#"
    UPDATE rewards_accounts SET
      last_activity_date = ?2, current_streak = ?3, longest_streak = ?4, updated_at = ?5
    WHERE uid = ?1
    "#,
    params![uid, day.format("%Y-%m-%d").to_string(), current, longest, Utc::now().to_rfc3339()],
  )
}

// ==================== Transactions ====================

pub fn insert_transaction(conn: &Connection, tx: &PointsTransaction) -> Result<()> {
  let metadata = tx.metadata.as_ref().map(to_json).transpose()?;
  conn.execute(
    r#"
    INSERT INTO points_transactions (id, uid, type, amount, balance, source, source_id,
                                     description, metadata, timestamp)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    "#,
    params![
      tx.id,
      tx.uid,
      tx.tx_type.as_str(),
      tx.amount,
      tx.balance,
      tx.source.as_str(),
      tx.source_id,
      tx.description,
      metadata,
      tx.timestamp.to_rfc3339(),
    ],
  )?;
  Ok(())
}

fn row_to_transaction(row: &Row) -> Result<PointsTransaction> {
  Ok(PointsTransaction {
    id: row.get(0)?,
    uid: row.get(1)?,
    tx_type: get_enum(row, 2, TransactionType::from_str)?,
    amount: row.get(3)?,
    balance: row.get(4)?,
    source: get_enum(row, 5, PointsSource::from_str)?,
    source_id: row.get(6)?,
    description: row.get(7)?,
    metadata: get_opt_json(row, 8)?,
    timestamp: get_timestamp(row, 9)?,
  })
}

/// Newest first; insertion order breaks timestamp ties
pub fn get_transactions(conn: &Connection, uid: &str, limit: i64) -> Result<Vec<PointsTransaction>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT id, uid, type, amount, balance, source, source_id, description, metadata, timestamp
    FROM points_transactions
    WHERE uid = ?1
    ORDER BY timestamp DESC, rowid DESC
    LIMIT ?2
    "#,
  )?;
  let txs = stmt
    .query_map(params![uid, limit], row_to_transaction)?
    .collect::<Result<Vec<_>>>()?;
  Ok(txs)
}

/// Sum of positive amounts credited to `uid` at or after `since`
pub fn sum_earned_since(conn: &Connection, uid: &str, since: DateTime<Utc>) -> Result<i64> {
  conn.query_row(
    r#"
    SELECT COALESCE(SUM(amount), 0) FROM points_transactions
    WHERE uid = ?1 AND amount > 0 AND type IN ('earned', 'bonus') AND timestamp >= ?2
    "#,
    params![uid, since.to_rfc3339()],
    |row| row.get(0),
  )
}
