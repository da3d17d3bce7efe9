use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::db;
use crate::domain::{LeaderboardEntry, LeaderboardPeriod, LeaderboardProfile};
use crate::error::{LedgerError, LedgerResult};
use crate::progression::{start_of_month, start_of_week};

use super::ledger;

/// Rebuild the leaderboard projection for `uid` from the account and progress.
/// Profile fields already stored are kept. Weekly and monthly points are
/// summed from the transaction log whenever an entry is read.
pub fn refresh_leaderboard_entry(conn: &Connection, uid: &str) -> LedgerResult<LeaderboardEntry> {
  let account = ledger::get_account(conn, uid)?;
  let now = Utc::now();

  let (lessons_completed, _) = db::get_progress_counters(conn, uid)?;

  let entry = LeaderboardEntry {
    uid: uid.to_string(),
    display_name: uid.to_string(),
    school: None,
    grade: None,
    rank: None,
    total_points: account.lifetime_points_earned,
    total_xp: account.total_xp_earned,
    weekly_points: 0,
    monthly_points: 0,
    streak_days: account.current_streak,
    lessons_completed,
    badges_earned: account.total_badges,
    updated_at: now,
  };
  db::upsert_entry(conn, &entry)?;

  get_entry_at(conn, uid, now)
}

/// Refresh the projection only when the account exists
pub fn refresh_if_ranked(conn: &Connection, uid: &str) -> LedgerResult<()> {
  if db::account_exists(conn, uid)? {
    refresh_leaderboard_entry(conn, uid)?;
  }
  Ok(())
}

/// Set the public profile shown on the leaderboard, refreshing the figures too
pub fn set_profile(conn: &Connection, uid: &str, profile: &LeaderboardProfile) -> LedgerResult<LeaderboardEntry> {
  refresh_leaderboard_entry(conn, uid)?;
  db::update_profile(conn, uid, profile)?;
  get_entry_at(conn, uid, Utc::now())
}

/// Entries for a period, highest points first, ranked by position
pub fn get_leaderboard(conn: &Connection, period: LeaderboardPeriod, limit: i64) -> LedgerResult<Vec<LeaderboardEntry>> {
  get_leaderboard_at(conn, period, limit, Utc::now())
}

/// `get_leaderboard` with the period windows anchored at `now`
pub fn get_leaderboard_at(
  conn: &Connection,
  period: LeaderboardPeriod,
  limit: i64,
  now: DateTime<Utc>,
) -> LedgerResult<Vec<LeaderboardEntry>> {
  Ok(db::get_ranked_entries(conn, period, start_of_week(now), start_of_month(now), limit)?)
}

fn get_entry_at(conn: &Connection, uid: &str, now: DateTime<Utc>) -> LedgerResult<LeaderboardEntry> {
  db::get_entry(conn, uid, start_of_week(now), start_of_month(now))?
    .ok_or_else(|| LedgerError::not_found("Leaderboard entry", uid))
}
