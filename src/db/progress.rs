//! User progress documents: the aggregate row, per-subject and per-skill
//! entries, and the raw activity log.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use std::collections::BTreeMap;

use crate::config::{DEFAULT_MONTHLY_GOAL_LESSONS, DEFAULT_WEEKLY_GOAL_MINUTES};
use crate::domain::{ActivityType, SkillLevel, SkillTier, SubjectProgress, UserActivity, UserProgress};

use super::{get_enum, get_json, get_opt_timestamp, get_timestamp, to_json};

/// Create a default progress row for `uid` if none exists. Returns true if created.
pub fn ensure_progress(conn: &Connection, uid: &str, at: DateTime<Utc>) -> Result<bool> {
  let now = at.to_rfc3339();
  let inserted = conn.execute(
    r#"
    INSERT OR IGNORE INTO user_progress (uid, weekly_goal_minutes, monthly_goal_lessons, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?4)
    "#,
    params![uid, DEFAULT_WEEKLY_GOAL_MINUTES, DEFAULT_MONTHLY_GOAL_LESSONS, now],
  )?;
  Ok(inserted > 0)
}

/// Add to the lesson/time/perfect-score totals and stamp the activity time
pub fn add_progress_totals(
  conn: &Connection,
  uid: &str,
  lessons: i64,
  minutes: f64,
  perfect_scores: i64,
  at: DateTime<Utc>,
) -> Result<usize> {
  let now = at.to_rfc3339();
  conn.execute(
    r#"
    UPDATE user_progress SET
      total_lessons_completed = total_lessons_completed + ?2,
      total_time_spent = total_time_spent + ?3,
      perfect_scores = perfect_scores + ?4,
      last_activity_at = ?5,
      updated_at = ?5
    WHERE uid = ?1
    "#,
    params![uid, lessons, minutes, perfect_scores, now],
  )
}

pub fn get_progress_last_activity(conn: &Connection, uid: &str) -> Result<Option<DateTime<Utc>>> {
  let row = conn
    .query_row(
      "SELECT last_activity_at FROM user_progress WHERE uid = ?1",
      params![uid],
      |row| get_opt_timestamp(row, 0),
    )
    .optional()?;
  Ok(row.flatten())
}

pub fn get_progress_streak(conn: &Connection, uid: &str) -> Result<(i64, i64)> {
  conn
    .query_row(
      "SELECT current_streak, longest_streak FROM user_progress WHERE uid = ?1",
      params![uid],
      |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
    .map(|s| s.unwrap_or((0, 0)))
}

/// (lessons completed, perfect scores); zeros when no progress row exists
pub fn get_progress_counters(conn: &Connection, uid: &str) -> Result<(i64, i64)> {
  conn
    .query_row(
      "SELECT total_lessons_completed, perfect_scores FROM user_progress WHERE uid = ?1",
      params![uid],
      |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
    .map(|c| c.unwrap_or((0, 0)))
}

pub fn set_progress_streak(conn: &Connection, uid: &str, current: i64, longest: i64) -> Result<usize> {
  conn.execute(
    "UPDATE user_progress SET current_streak = ?2, longest_streak = ?3 WHERE uid = ?1",
    params![uid, current, longest],
  )
}

/// Assemble the full progress document. Weekly minutes and monthly lessons are
/// summed from the activity log since the given period starts.
pub fn get_user_progress(
  conn: &Connection,
  uid: &str,
  week_start: DateTime<Utc>,
  month_start: DateTime<Utc>,
) -> Result<Option<UserProgress>> {
  let base = conn
    .query_row(
      r#"
      SELECT uid, total_lessons_completed, total_time_spent, current_streak, longest_streak,
             perfect_scores, weekly_goal_minutes, monthly_goal_lessons, last_activity_at, updated_at
      FROM user_progress WHERE uid = ?1
      "#,
      params![uid],
      |row| {
        Ok(UserProgress {
          uid: row.get(0)?,
          total_lessons_completed: row.get(1)?,
          total_time_spent: row.get(2)?,
          current_streak: row.get(3)?,
          longest_streak: row.get(4)?,
          perfect_scores: row.get(5)?,
          subject_progress: BTreeMap::new(),
          skill_levels: BTreeMap::new(),
          weekly_goal_minutes: row.get(6)?,
          weekly_progress_minutes: 0.0,
          monthly_goal_lessons: row.get(7)?,
          monthly_progress_lessons: 0,
          last_activity_at: get_opt_timestamp(row, 8)?,
          updated_at: get_timestamp(row, 9)?,
        })
      },
    )
    .optional()?;

  let Some(mut progress) = base else {
    return Ok(None);
  };

  progress.subject_progress = get_subjects(conn, uid)?
    .into_iter()
    .map(|s| (s.subject_id.clone(), s))
    .collect();
  progress.skill_levels = get_skills(conn, uid)?
    .into_iter()
    .map(|s| (s.skill_id.clone(), s))
    .collect();

  let (minutes, _) = activity_totals_since(conn, uid, week_start)?;
  let (_, lessons) = activity_totals_since(conn, uid, month_start)?;
  progress.weekly_progress_minutes = minutes;
  progress.monthly_progress_lessons = lessons;

  Ok(Some(progress))
}

// ==================== Subjects ====================

const SUBJECT_COLUMNS: &str = r#"
  subject_id, subject_name, level, xp, xp_to_next_level, lessons_completed, total_lessons,
  quizzes_passed, average_score, time_spent, topics_completed, last_activity_at
"#;

fn row_to_subject(row: &Row) -> Result<SubjectProgress> {
  Ok(SubjectProgress {
    subject_id: row.get(0)?,
    subject_name: row.get(1)?,
    level: row.get(2)?,
    xp: row.get(3)?,
    xp_to_next_level: row.get(4)?,
    lessons_completed: row.get(5)?,
    total_lessons: row.get(6)?,
    quizzes_passed: row.get(7)?,
    average_score: row.get(8)?,
    time_spent: row.get(9)?,
    topics_completed: get_json(row, 10)?,
    last_activity_at: get_timestamp(row, 11)?,
  })
}

pub fn get_subject(conn: &Connection, uid: &str, subject_id: &str) -> Result<Option<SubjectProgress>> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM subject_progress WHERE uid = ?1 AND subject_id = ?2",
        SUBJECT_COLUMNS
      ),
      params![uid, subject_id],
      row_to_subject,
    )
    .optional()
}

pub fn get_subjects(conn: &Connection, uid: &str) -> Result<Vec<SubjectProgress>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM subject_progress WHERE uid = ?1 ORDER BY subject_id",
    SUBJECT_COLUMNS
  ))?;
  let subjects = stmt
    .query_map(params![uid], row_to_subject)?
    .collect::<Result<Vec<_>>>()?;
  Ok(subjects)
}

pub fn upsert_subject(conn: &Connection, uid: &str, s: &SubjectProgress) -> Result<()> {
  conn.execute(
    r#"
    INSERT INTO subject_progress (uid, subject_id, subject_name, level, xp, xp_to_next_level,
                                  lessons_completed, total_lessons, quizzes_passed, average_score,
                                  time_spent, topics_completed, last_activity_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
    ON CONFLICT (uid, subject_id) DO UPDATE SET
      subject_name = excluded.subject_name,
      level = excluded.level,
      xp = excluded.xp,
      xp_to_next_level = excluded.xp_to_next_level,
      lessons_completed = excluded.lessons_completed,
      total_lessons = excluded.total_lessons,
      quizzes_passed = excluded.quizzes_passed,
      average_score = excluded.average_score,
      time_spent = excluded.time_spent,
      topics_completed = excluded.topics_completed,
      last_activity_at = excluded.last_activity_at
    "#,
    params![
      uid,
      s.subject_id,
      s.subject_name,
      s.level,
      s.xp,
      s.xp_to_next_level,
      s.lessons_completed,
      s.total_lessons,
      s.quizzes_passed,
      s.average_score,
      s.time_spent,
      to_json(&s.topics_completed)?,
      s.last_activity_at.to_rfc3339(),
    ],
  )?;
  Ok(())
}

// ==================== Skills ====================

fn row_to_skill(row: &Row) -> Result<SkillLevel> {
  Ok(SkillLevel {
    skill_id: row.get(0)?,
    skill_name: row.get(1)?,
    level: get_enum(row, 2, SkillTier::from_str)?,
    score: row.get(3)?,
    unlocked_at: get_timestamp(row, 4)?,
    last_updated_at: get_timestamp(row, 5)?,
  })
}

pub fn get_skill(conn: &Connection, uid: &str, skill_id: &str) -> Result<Option<SkillLevel>> {
  conn
    .query_row(
      r#"
      SELECT skill_id, skill_name, level, score, unlocked_at, last_updated_at
      FROM skill_levels WHERE uid = ?1 AND skill_id = ?2
      "#,
      params![uid, skill_id],
      row_to_skill,
    )
    .optional()
}

pub fn get_skills(conn: &Connection, uid: &str) -> Result<Vec<SkillLevel>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT skill_id, skill_name, level, score, unlocked_at, last_updated_at
    FROM skill_levels WHERE uid = ?1 ORDER BY skill_id
    "#,
  )?;
  let skills = stmt
    .query_map(params![uid], row_to_skill)?
    .collect::<Result<Vec<_>>>()?;
  Ok(skills)
}

pub fn upsert_skill(conn: &Connection, uid: &str, skill: &SkillLevel) -> Result<()> {
  conn.execute(
    r#"
    INSERT INTO skill_levels (uid, skill_id, skill_name, level, score, unlocked_at, last_updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT (uid, skill_id) DO UPDATE SET
      level = excluded.level,
      score = excluded.score,
      last_updated_at = excluded.last_updated_at
    "#,
    params![
      uid,
      skill.skill_id,
      skill.skill_name,
      skill.level.as_str(),
      skill.score,
      skill.unlocked_at.to_rfc3339(),
      skill.last_updated_at.to_rfc3339(),
    ],
  )?;
  Ok(())
}

// ==================== Activity log ====================

/// Append an activity with the minutes and lessons it contributes to goals
pub fn insert_activity(conn: &Connection, activity: &UserActivity, minutes: f64, lessons: i64) -> Result<()> {
  conn.execute(
    r#"
    INSERT INTO user_activities (id, uid, activity_type, activity_data, points, xp, minutes, lessons, timestamp)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    "#,
    params![
      activity.id,
      activity.uid,
      activity.activity_type.as_str(),
      to_json(&activity.activity_data)?,
      activity.points,
      activity.xp,
      minutes,
      lessons,
      activity.timestamp.to_rfc3339(),
    ],
  )?;
  Ok(())
}

/// Newest first
pub fn get_activities(conn: &Connection, uid: &str, limit: i64) -> Result<Vec<UserActivity>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT id, uid, activity_type, activity_data, points, xp, timestamp
    FROM user_activities WHERE uid = ?1
    ORDER BY timestamp DESC, rowid DESC
    LIMIT ?2
    "#,
  )?;
  let activities = stmt
    .query_map(params![uid, limit], |row| {
      Ok(UserActivity {
        id: row.get(0)?,
        uid: row.get(1)?,
        activity_type: get_enum(row, 2, ActivityType::from_str)?,
        activity_data: get_json(row, 3)?,
        points: row.get(4)?,
        xp: row.get(5)?,
        timestamp: get_timestamp(row, 6)?,
      })
    })?
    .collect::<Result<Vec<_>>>()?;
  Ok(activities)
}

/// (minutes, lessons) logged since `since`
pub fn activity_totals_since(conn: &Connection, uid: &str, since: DateTime<Utc>) -> Result<(f64, i64)> {
  conn.query_row(
    r#"
    SELECT COALESCE(SUM(minutes), 0.0), COALESCE(SUM(lessons), 0)
    FROM user_activities WHERE uid = ?1 AND timestamp >= ?2
    "#,
    params![uid, since.to_rfc3339()],
    |row| Ok((row.get(0)?, row.get(1)?)),
  )
}
