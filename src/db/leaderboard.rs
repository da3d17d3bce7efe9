use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use crate::domain::{LeaderboardEntry, LeaderboardPeriod, LeaderboardProfile};

use super::get_timestamp;

/// Stored projection plus the weekly and monthly windows, summed from the
/// transaction log at read time. `?1` is the week start, `?2` the month start.
const SELECT_ENTRIES: &str = r#"
  SELECT l.uid, l.display_name, l.school, l.grade, l.total_points, l.total_xp,
    (SELECT COALESCE(SUM(t.amount), 0) FROM points_transactions t
      WHERE t.uid = l.uid AND t.amount > 0 AND t.type IN ('earned', 'bonus') AND t.timestamp >= ?1) AS window_weekly,
    (SELECT COALESCE(SUM(t.amount), 0) FROM points_transactions t
      WHERE t.uid = l.uid AND t.amount > 0 AND t.type IN ('earned', 'bonus') AND t.timestamp >= ?2) AS window_monthly,
    l.streak_days, l.lessons_completed, l.badges_earned, l.updated_at
  FROM leaderboard l
"#;

fn row_to_entry(row: &Row) -> Result<LeaderboardEntry> {
  Ok(LeaderboardEntry {
    uid: row.get(0)?,
    display_name: row.get(1)?,
    school: row.get(2)?,
    grade: row.get(3)?,
    rank: None,
    total_points: row.get(4)?,
    total_xp: row.get(5)?,
    weekly_points: row.get(6)?,
    monthly_points: row.get(7)?,
    streak_days: row.get(8)?,
    lessons_completed: row.get(9)?,
    badges_earned: row.get(10)?,
    updated_at: get_timestamp(row, 11)?,
  })
}

/// Write the ranking figures of an entry. Profile fields of an existing row are
/// kept; a new row takes the entry's profile fields. The period windows are not
/// stored.
pub fn upsert_entry(conn: &Connection, e: &LeaderboardEntry) -> Result<()> {
  conn.execute(
    r#"
    INSERT INTO leaderboard (uid, display_name, school, grade, total_points, total_xp,
                             streak_days, lessons_completed, badges_earned, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT (uid) DO UPDATE SET
      total_points = excluded.total_points,
      total_xp = excluded.total_xp,
      streak_days = excluded.streak_days,
      lessons_completed = excluded.lessons_completed,
      badges_earned = excluded.badges_earned,
      updated_at = excluded.updated_at
    "#,
    params![
      e.uid,
      e.display_name,
      e.school,
      e.grade,
      e.total_points,
      e.total_xp,
      e.streak_days,
      e.lessons_completed,
      e.badges_earned,
      e.updated_at.to_rfc3339(),
    ],
  )?;
  Ok(())
}

/// Overwrite only the profile fields that are set
pub fn update_profile(conn: &Connection, uid: &str, profile: &LeaderboardProfile) -> Result<usize> {
  conn.execute(
    r#"
    UPDATE leaderboard SET
      display_name = COALESCE(?2, display_name),
      school = COALESCE(?3, school),
      grade = COALESCE(?4, grade)
    WHERE uid = ?1
    "#,
    params![uid, profile.display_name, profile.school, profile.grade],
  )
}

pub fn get_entry(
  conn: &Connection,
  uid: &str,
  week_start: DateTime<Utc>,
  month_start: DateTime<Utc>,
) -> Result<Option<LeaderboardEntry>> {
  conn
    .query_row(
      &format!("{} WHERE l.uid = ?3", SELECT_ENTRIES),
      params![week_start.to_rfc3339(), month_start.to_rfc3339(), uid],
      row_to_entry,
    )
    .optional()
}

/// Entries sorted by the period's points, descending. Ties keep insertion
/// order. Ranks are assigned by position.
pub fn get_ranked_entries(
  conn: &Connection,
  period: LeaderboardPeriod,
  week_start: DateTime<Utc>,
  month_start: DateTime<Utc>,
  limit: i64,
) -> Result<Vec<LeaderboardEntry>> {
  // Sort key comes from a closed enum, never from input
  let mut stmt = conn.prepare(&format!(
    "{} ORDER BY {} DESC, l.rowid ASC LIMIT ?3",
    SELECT_ENTRIES,
    period.sort_key()
  ))?;
  let mut entries = stmt
    .query_map(params![week_start.to_rfc3339(), month_start.to_rfc3339(), limit], row_to_entry)?
    .collect::<Result<Vec<_>>>()?;
  for (idx, entry) in entries.iter_mut().enumerate() {
    entry.rank = Some(idx as i64 + 1);
  }
  Ok(entries)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::{insert_transaction, new_document_id, run_migrations};
  use crate::domain::{PointsSource, PointsTransaction, TransactionType};
  use chrono::{Duration, TimeZone};

  fn entry(uid: &str, total: i64) -> LeaderboardEntry {
    LeaderboardEntry {
      uid: uid.into(),
      display_name: uid.to_uppercase(),
      school: None,
      grade: None,
      rank: None,
      total_points: total,
      total_xp: 0,
      weekly_points: 0,
      monthly_points: 0,
      streak_days: 0,
      lessons_completed: 0,
      badges_earned: 0,
      updated_at: Utc::now(),
    }
  }

  fn earned(conn: &Connection, uid: &str, amount: i64, at: DateTime<Utc>) {
    let tx = PointsTransaction {
      id: new_document_id(),
      uid: uid.into(),
      tx_type: TransactionType::Earned,
      amount,
      balance: amount,
      source: PointsSource::AdminAdjustment,
      source_id: None,
      description: "grant".into(),
      metadata: None,
      timestamp: at,
    };
    insert_transaction(conn, &tx).unwrap();
  }

  fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();
    conn
  }

  fn uids(entries: &[LeaderboardEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.uid.as_str()).collect()
  }

  #[test]
  fn test_ranked_by_period() {
    let conn = setup();
    let week_start = Utc.with_ymd_and_hms(2026, 10, 12, 0, 0, 0).unwrap();
    let month_start = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
    upsert_entry(&conn, &entry("a", 100)).unwrap();
    upsert_entry(&conn, &entry("b", 300)).unwrap();
    upsert_entry(&conn, &entry("c", 200)).unwrap();
    earned(&conn, "a", 5, week_start + Duration::hours(1));
    earned(&conn, "b", 1, week_start + Duration::hours(2));
    earned(&conn, "c", 9, week_start + Duration::hours(3));

    let all_time = get_ranked_entries(&conn, LeaderboardPeriod::AllTime, week_start, month_start, 10).unwrap();
    assert_eq!(uids(&all_time), vec!["b", "c", "a"]);
    assert_eq!(all_time[0].rank, Some(1));
    assert_eq!(all_time[2].rank, Some(3));

    let weekly = get_ranked_entries(&conn, LeaderboardPeriod::Weekly, week_start, month_start, 2).unwrap();
    assert_eq!(uids(&weekly), vec!["c", "a"]);
    assert_eq!(weekly[0].weekly_points, 9);
  }

  #[test]
  fn test_windows_drop_points_earned_before_them() {
    let conn = setup();
    let week_start = Utc.with_ymd_and_hms(2026, 10, 12, 0, 0, 0).unwrap();
    let month_start = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
    upsert_entry(&conn, &entry("old", 500)).unwrap();
    upsert_entry(&conn, &entry("new", 10)).unwrap();
    earned(&conn, "old", 500, Utc.with_ymd_and_hms(2020, 3, 1, 9, 0, 0).unwrap());
    earned(&conn, "old", 7, month_start + Duration::days(2));
    earned(&conn, "new", 10, week_start + Duration::minutes(5));

    let weekly = get_ranked_entries(&conn, LeaderboardPeriod::Weekly, week_start, month_start, 10).unwrap();
    assert_eq!(uids(&weekly), vec!["new", "old"]);
    assert_eq!(weekly[0].weekly_points, 10);
    assert_eq!(weekly[1].weekly_points, 0);

    let monthly = get_ranked_entries(&conn, LeaderboardPeriod::Monthly, week_start, month_start, 10).unwrap();
    assert_eq!(uids(&monthly), vec!["new", "old"]);
    assert_eq!(monthly[1].monthly_points, 7);

    let stored = get_entry(&conn, "old", week_start, month_start).unwrap().unwrap();
    assert_eq!(stored.total_points, 500);
    assert_eq!(stored.weekly_points, 0);
    assert_eq!(stored.monthly_points, 7);
  }

  #[test]
  fn test_ties_keep_insertion_order() {
    let conn = setup();
    let now = Utc::now();
    upsert_entry(&conn, &entry("first", 50)).unwrap();
    upsert_entry(&conn, &entry("second", 50)).unwrap();
    upsert_entry(&conn, &entry("third", 50)).unwrap();
    // re-upserting does not move an entry
    upsert_entry(&conn, &entry("first", 50)).unwrap();

    let ranked = get_ranked_entries(&conn, LeaderboardPeriod::AllTime, now, now, 10).unwrap();
    assert_eq!(uids(&ranked), vec!["first", "second", "third"]);
  }

  #[test]
  fn test_profile_survives_refresh() {
    let conn = setup();
    let now = Utc::now();
    upsert_entry(&conn, &entry("a", 10)).unwrap();
    let profile = LeaderboardProfile {
      display_name: Some("Thandi".into()),
      school: Some("Soweto High".into()),
      grade: None,
    };
    assert_eq!(update_profile(&conn, "a", &profile).unwrap(), 1);
    upsert_entry(&conn, &entry("a", 40)).unwrap();

    let stored = get_entry(&conn, "a", now, now).unwrap().unwrap();
    assert_eq!(stored.display_name, "Thandi");
    assert_eq!(stored.school.as_deref(), Some("Soweto High"));
    assert_eq!(stored.total_points, 40);
  }
}
