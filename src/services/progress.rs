//! User progress aggregation: subject and skill merges, goal totals, streaks
//! and the activity log.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde_json::json;

use crate::config::{DEFAULT_SUBJECT_TOTAL_LESSONS, RewardRates};
use crate::db;
use crate::domain::{
  ActivityType, LessonCompletion, ModuleCompletion, SkillLevel, SubjectProgress, UserActivity, UserProgress,
  humanize_id,
};
use crate::error::{LedgerError, LedgerResult};
use crate::progression::{Streak, advance_streak, compute_skill_level_update, start_of_month, start_of_week};

/// XP per subject level
const SUBJECT_LEVEL_XP: i64 = 100;

fn new_subject(subject_id: &str, now: DateTime<Utc>) -> SubjectProgress {
  SubjectProgress {
    subject_id: subject_id.to_string(),
    subject_name: humanize_id(subject_id),
    level: 1,
    xp: 0,
    xp_to_next_level: SUBJECT_LEVEL_XP,
    lessons_completed: 0,
    total_lessons: DEFAULT_SUBJECT_TOTAL_LESSONS,
    quizzes_passed: 0,
    average_score: 0.0,
    time_spent: 0.0,
    topics_completed: Vec::new(),
    last_activity_at: now,
  }
}

/// Fold completed lessons into a subject. The average is weighted by lesson count.
fn fold_lessons(subject: &mut SubjectProgress, lessons: i64, xp_gain: i64, score: Option<f64>, minutes: f64, now: DateTime<Utc>) {
  if let Some(score) = score {
    let prior = subject.lessons_completed;
    subject.average_score = if prior == 0 || prior + lessons == 0 {
      score
    } else {
      (subject.average_score * prior as f64 + score * lessons as f64) / (prior + lessons) as f64
    };
  }

  subject.xp += xp_gain;
  subject.level = subject.xp / SUBJECT_LEVEL_XP + 1;
  subject.xp_to_next_level = subject.level * SUBJECT_LEVEL_XP - subject.xp;
  subject.lessons_completed += lessons;
  subject.time_spent += minutes;
  subject.last_activity_at = now;
}

/// Advance the progress streak. Must run before the activity time is stamped.
fn touch_streak(conn: &Connection, uid: &str, now: DateTime<Utc>) -> LedgerResult<Streak> {
  let last = db::get_progress_last_activity(conn, uid)?.map(|t| t.date_naive());
  let (current, longest) = db::get_progress_streak(conn, uid)?;
  let streak = advance_streak(last, now.date_naive(), Streak { current, longest });
  db::set_progress_streak(conn, uid, streak.current, streak.longest)?;
  Ok(streak)
}

/// Merge a module completion into the learner's progress documents
pub fn record_module_completion(
  conn: &Connection,
  rates: &RewardRates,
  completion: &ModuleCompletion,
  now: DateTime<Utc>,
) -> LedgerResult<()> {
  let uid = completion.uid.as_str();
  db::ensure_progress(conn, uid, now)?;

  let mut seen = Vec::new();
  for skill_id in &completion.skills_gained {
    if seen.contains(skill_id) {
      continue;
    }
    seen.push(skill_id.clone());

    let existing = db::get_skill(conn, uid, skill_id)?;
    let current = existing.as_ref().map(|s| s.score).unwrap_or(0);
    let (score, tier) = compute_skill_level_update(current, completion.average_score);
    let skill = SkillLevel {
      skill_id: skill_id.clone(),
      skill_name: existing
        .as_ref()
        .map(|s| s.skill_name.clone())
        .unwrap_or_else(|| humanize_id(skill_id)),
      level: tier,
      score,
      unlocked_at: existing.map(|s| s.unlocked_at).unwrap_or(now),
      last_updated_at: now,
    };
    db::upsert_skill(conn, uid, &skill)?;
  }

  let mut subject =
    db::get_subject(conn, uid, &completion.subject_id)?.unwrap_or_else(|| new_subject(&completion.subject_id, now));
  fold_lessons(
    &mut subject,
    completion.lessons_completed,
    completion.lessons_completed.saturating_mul(rates.lesson_xp),
    Some(completion.average_score),
    completion.total_time_spent,
    now,
  );
  if !subject.topics_completed.contains(&completion.module_id) {
    subject.topics_completed.push(completion.module_id.clone());
  }
  db::upsert_subject(conn, uid, &subject)?;

  touch_streak(conn, uid, now)?;
  db::add_progress_totals(conn, uid, completion.lessons_completed, completion.total_time_spent, 0, now)?;

  let activity = UserActivity {
    id: db::new_document_id(),
    uid: uid.to_string(),
    activity_type: ActivityType::ModuleCompleted,
    activity_data: serde_json::to_value(completion)?,
    points: completion.lessons_completed.saturating_mul(rates.lesson_points),
    xp: completion.lessons_completed.saturating_mul(rates.lesson_xp),
    timestamp: now,
  };
  db::insert_activity(conn, &activity, completion.total_time_spent, completion.lessons_completed)?;

  tracing::debug!(uid, module_id = %completion.module_id, subject_id = %completion.subject_id, "Recorded module completion");
  Ok(())
}

/// Merge a single lesson into the learner's progress documents
pub fn record_lesson_completion(
  conn: &Connection,
  rates: &RewardRates,
  completion: &LessonCompletion,
  now: DateTime<Utc>,
) -> LedgerResult<()> {
  let uid = completion.uid.as_str();
  db::ensure_progress(conn, uid, now)?;

  let mut subject =
    db::get_subject(conn, uid, &completion.subject_id)?.unwrap_or_else(|| new_subject(&completion.subject_id, now));
  fold_lessons(&mut subject, 1, rates.lesson_xp, completion.score, completion.time_spent, now);
  if completion.score.is_some_and(|s| s >= rates.quiz_pass_score) {
    subject.quizzes_passed += 1;
  }
  db::upsert_subject(conn, uid, &subject)?;

  let perfect = completion.score.is_some_and(|s| s >= 100.0);
  touch_streak(conn, uid, now)?;
  db::add_progress_totals(conn, uid, 1, completion.time_spent, i64::from(perfect), now)?;

  let activity = UserActivity {
    id: db::new_document_id(),
    uid: uid.to_string(),
    activity_type: ActivityType::LessonCompleted,
    activity_data: json!({
      "lessonId": completion.lesson_id,
      "subjectId": completion.subject_id,
      "timeSpent": completion.time_spent,
      "score": completion.score,
    }),
    points: rates.lesson_points,
    xp: rates.lesson_xp,
    timestamp: now,
  };
  db::insert_activity(conn, &activity, completion.time_spent, 1)?;

  tracing::debug!(uid, lesson_id = %completion.lesson_id, "Recorded lesson completion");
  Ok(())
}

/// Full progress document with goal figures for the current week and month
pub fn get_progress(conn: &Connection, uid: &str) -> LedgerResult<UserProgress> {
  let now = Utc::now();
  db::get_user_progress(conn, uid, start_of_week(now), start_of_month(now))?
    .ok_or_else(|| LedgerError::not_found("User progress", uid))
}

pub fn get_activities(conn: &Connection, uid: &str, limit: i64) -> LedgerResult<Vec<UserActivity>> {
  Ok(db::get_activities(conn, uid, limit)?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::SkillTier;
  use crate::testing::TestEnv;
  use chrono::Duration;

  fn module(subject: &str, module_id: &str, lessons: i64, score: f64, minutes: f64, skills: &[&str]) -> ModuleCompletion {
    ModuleCompletion {
      uid: "u1".into(),
      module_id: module_id.into(),
      subject_id: subject.into(),
      lessons_completed: lessons,
      average_score: score,
      total_time_spent: minutes,
      skills_gained: skills.iter().map(|s| s.to_string()).collect(),
    }
  }

  #[test]
  fn test_first_module_creates_documents() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    let now = Utc::now();
    record_module_completion(&conn, &env.rates, &module("math", "m1", 5, 85.0, 120.0, &["linear_algebra"]), now)
      .unwrap();

    let progress = get_progress(&conn, "u1").unwrap();
    assert_eq!(progress.total_lessons_completed, 5);
    assert_eq!(progress.total_time_spent, 120.0);
    assert_eq!(progress.current_streak, 1);
    assert_eq!(progress.weekly_progress_minutes, 120.0);
    assert_eq!(progress.monthly_progress_lessons, 5);

    let math = &progress.subject_progress["math"];
    assert_eq!(math.subject_name, "Math");
    assert_eq!(math.xp, 100);
    assert_eq!(math.level, 2);
    assert_eq!(math.xp_to_next_level, 100);
    assert_eq!(math.average_score, 85.0);
    assert_eq!(math.topics_completed, vec!["m1".to_string()]);

    let skill = &progress.skill_levels["linear_algebra"];
    assert_eq!(skill.skill_name, "Linear Algebra");
    assert_eq!(skill.score, 8);
    assert_eq!(skill.level, SkillTier::Novice);

    let activities = get_activities(&conn, "u1", 10).unwrap();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0].activity_type, ActivityType::ModuleCompleted);
    assert_eq!(activities[0].activity_data["moduleId"], "m1");
  }

  #[test]
  fn test_average_is_weighted_by_lessons() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    let now = Utc::now();
    record_module_completion(&conn, &env.rates, &module("math", "m1", 3, 60.0, 10.0, &[]), now).unwrap();
    record_module_completion(&conn, &env.rates, &module("math", "m2", 1, 100.0, 10.0, &[]), now).unwrap();

    let math = db::get_subject(&conn, "u1", "math").unwrap().unwrap();
    assert_eq!(math.average_score, 70.0);
    assert_eq!(math.lessons_completed, 4);
    assert_eq!(math.topics_completed, vec!["m1".to_string(), "m2".to_string()]);
  }

  #[test]
  fn test_repeated_module_and_skills_are_deduplicated() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    let now = Utc::now();
    let event = module("math", "m1", 1, 95.0, 5.0, &["algebra", "algebra"]);
    record_module_completion(&conn, &env.rates, &event, now).unwrap();
    record_module_completion(&conn, &env.rates, &event, now).unwrap();

    let math = db::get_subject(&conn, "u1", "math").unwrap().unwrap();
    assert_eq!(math.topics_completed, vec!["m1".to_string()]);
    // floor(95 / 10) once per event
    assert_eq!(db::get_skill(&conn, "u1", "algebra").unwrap().unwrap().score, 18);
  }

  #[test]
  fn test_streak_extends_on_consecutive_days() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    let yesterday = Utc::now() - Duration::days(1);
    record_module_completion(&conn, &env.rates, &module("math", "m1", 1, 80.0, 5.0, &[]), yesterday).unwrap();
    record_module_completion(&conn, &env.rates, &module("math", "m2", 1, 80.0, 5.0, &[]), Utc::now()).unwrap();
    record_module_completion(&conn, &env.rates, &module("math", "m3", 1, 80.0, 5.0, &[]), Utc::now()).unwrap();

    assert_eq!(db::get_progress_streak(&conn, "u1").unwrap(), (2, 2));
  }

  #[test]
  fn test_lesson_completion_counts_quiz_and_perfect_score() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    let lesson = |score| LessonCompletion {
      uid: "u1".into(),
      lesson_id: "l1".into(),
      subject_id: "science".into(),
      time_spent: 15.0,
      score,
    };
    record_lesson_completion(&conn, &env.rates, &lesson(Some(100.0)), Utc::now()).unwrap();
    record_lesson_completion(&conn, &env.rates, &lesson(Some(50.0)), Utc::now()).unwrap();
    record_lesson_completion(&conn, &env.rates, &lesson(None), Utc::now()).unwrap();

    let progress = get_progress(&conn, "u1").unwrap();
    assert_eq!(progress.total_lessons_completed, 3);
    assert_eq!(progress.perfect_scores, 1);
    let science = &progress.subject_progress["science"];
    assert_eq!(science.quizzes_passed, 1);
    assert_eq!(science.average_score, 75.0);
    assert_eq!(science.xp, 60);
  }

  #[test]
  fn test_missing_progress_is_not_found() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    assert!(matches!(get_progress(&conn, "ghost"), Err(LedgerError::NotFound { .. })));
  }
}
