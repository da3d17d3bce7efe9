//! Completion events: the composite flow that records progress, pays the
//! reward, unlocks badges and achievements and refreshes the leaderboard.
//!
//! Callers run each function inside one transaction.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;

use crate::config::RewardRates;
use crate::db::{self, PERFECTIONIST_BADGE_ID, SCHOLAR_BADGE_ID};
use crate::domain::{LessonCompletion, ModuleCompletion, PointsSource};
use crate::error::LedgerResult;
use crate::progression::{
  RewardBreakdown, Streak, advance_streak, compute_lesson_completion_reward, compute_module_completion_reward,
};

use super::badges::{award_badge, evaluate_achievements};
use super::ledger::{self, PointsMovement};
use super::{leaderboard, progress};

/// Audit summary of what one completion event paid out
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRewards {
  pub points_awarded: i64,
  pub xp_awarded: i64,
  pub breakdown: RewardBreakdown,
  pub badges_earned: Vec<String>,
  pub achievements_unlocked: Vec<String>,
  pub level_up: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub new_level: Option<i64>,
}

/// Record a module completion and pay its rewards
pub fn complete_module(conn: &Connection, rates: &RewardRates, completion: &ModuleCompletion) -> LedgerResult<CompletionRewards> {
  let now = Utc::now();
  let uid = completion.uid.as_str();

  ledger::ensure_account(conn, uid)?;
  progress::record_module_completion(conn, rates, completion, now)?;

  let distinct_skills = completion.skills_gained.iter().collect::<HashSet<_>>().len() as i64;
  let breakdown = compute_module_completion_reward(
    rates,
    completion.lessons_completed,
    completion.average_score,
    completion.total_time_spent,
    distinct_skills,
  );
  let movement = PointsMovement::new(
    breakdown.points(),
    PointsSource::ModuleCompletion,
    format!("Completed module: {}", completion.module_id),
  )
  .with_source_id(&completion.module_id)
  .with_metadata(json!({
    "subjectId": completion.subject_id,
    "lessonsCompleted": completion.lessons_completed,
    "averageScore": completion.average_score,
    "breakdown": breakdown,
  }));

  let mut unlock_rules = Vec::new();
  if completion.average_score >= rates.perfectionist_score {
    unlock_rules.push(PERFECTIONIST_BADGE_ID);
  }

  pay_out(conn, rates, uid, breakdown, movement, &unlock_rules, now)
}

/// Record a single lesson and pay its rewards
pub fn complete_lesson(conn: &Connection, rates: &RewardRates, completion: &LessonCompletion) -> LedgerResult<CompletionRewards> {
  let now = Utc::now();
  let uid = completion.uid.as_str();

  ledger::ensure_account(conn, uid)?;
  progress::record_lesson_completion(conn, rates, completion, now)?;

  let breakdown = compute_lesson_completion_reward(rates, completion.score);
  let movement = PointsMovement::new(
    breakdown.points(),
    PointsSource::LessonCompletion,
    format!("Completed lesson: {}", completion.lesson_id),
  )
  .with_source_id(&completion.lesson_id)
  .with_metadata(json!({
    "subjectId": completion.subject_id,
    "score": completion.score,
    "breakdown": breakdown,
  }));

  pay_out(conn, rates, uid, breakdown, movement, &[], now)
}

/// Shared tail of both completion flows
fn pay_out(
  conn: &Connection,
  rates: &RewardRates,
  uid: &str,
  breakdown: RewardBreakdown,
  movement: PointsMovement,
  unlock_rules: &[&str],
  now: DateTime<Utc>,
) -> LedgerResult<CompletionRewards> {
  let badges_before: HashSet<String> = db::get_user_badges(conn, uid)?
    .into_iter()
    .map(|b| b.badge_id)
    .collect();
  let level_before = ledger::get_account(conn, uid)?.current_level;

  if movement.amount > 0 {
    ledger::award_points(conn, uid, &movement)?;
  }
  ledger::award_xp(conn, rates, uid, breakdown.xp())?;

  let account = ledger::get_account(conn, uid)?;
  if account.total_points >= rates.scholar_points_threshold {
    award_badge(conn, rates, uid, SCHOLAR_BADGE_ID)?;
  }
  for badge_id in unlock_rules {
    award_badge(conn, rates, uid, badge_id)?;
  }

  let achievements_unlocked = evaluate_achievements(conn, rates, uid)?;
  touch_account_streak(conn, uid, now)?;
  leaderboard::refresh_leaderboard_entry(conn, uid)?;

  let badges_earned = db::get_user_badges(conn, uid)?
    .into_iter()
    .map(|b| b.badge_id)
    .filter(|id| !badges_before.contains(id))
    .collect();
  let level_after = ledger::get_account(conn, uid)?.current_level;
  let level_up = level_after > level_before;

  tracing::info!(
    uid,
    points = breakdown.points(),
    xp = breakdown.xp(),
    level = level_after,
    "Completion rewards processed"
  );

  Ok(CompletionRewards {
    points_awarded: breakdown.points(),
    xp_awarded: breakdown.xp(),
    breakdown,
    badges_earned,
    achievements_unlocked,
    level_up,
    new_level: level_up.then_some(level_after),
  })
}

fn touch_account_streak(conn: &Connection, uid: &str, now: DateTime<Utc>) -> LedgerResult<()> {
  if let Some((last, current, longest)) = db::get_account_streak(conn, uid)? {
    let today = now.date_naive();
    let streak = advance_streak(last, today, Streak { current, longest });
    db::set_account_streak(conn, uid, today, streak.current, streak.longest)?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::TransactionType;
  use crate::testing::TestEnv;

  fn module(lessons: i64, score: f64, minutes: f64, skills: &[&str]) -> ModuleCompletion {
    ModuleCompletion {
      uid: "u1".into(),
      module_id: "m1".into(),
      subject_id: "math".into(),
      lessons_completed: lessons,
      average_score: score,
      total_time_spent: minutes,
      skills_gained: skills.iter().map(|s| s.to_string()).collect(),
    }
  }

  #[test]
  fn test_reference_module_completion() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();

    let rewards = complete_module(&conn, &env.rates, &module(5, 85.0, 120.0, &["algebra"])).unwrap();
    assert_eq!(rewards.points_awarded, 100);
    assert_eq!(rewards.xp_awarded, 150);
    assert!(rewards.level_up);
    assert_eq!(rewards.new_level, Some(2));
    assert!(rewards.badges_earned.is_empty());
    assert!(rewards.achievements_unlocked.is_empty());

    let account = ledger::get_account(&conn, "u1").unwrap();
    // 100 reward + 50 level-up bonus
    assert_eq!(account.available_points, 150);
    assert_eq!(account.current_xp, 50);
    assert_eq!(account.current_streak, 1);

    let txs = ledger::get_transactions(&conn, "u1", 10).unwrap();
    let module_tx = txs.iter().find(|t| t.source == PointsSource::ModuleCompletion).unwrap();
    assert_eq!(module_tx.tx_type, TransactionType::Earned);
    assert_eq!(module_tx.metadata.as_ref().unwrap()["breakdown"]["skillsBonusPoints"], 25);

    let now = chrono::Utc::now();
    let entry = db::get_entry(&conn, "u1", now, now).unwrap().unwrap();
    assert_eq!(entry.total_points, 150);
    assert_eq!(entry.lessons_completed, 5);
  }

  #[test]
  fn test_high_score_unlocks_perfectionist() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    let rewards = complete_module(&conn, &env.rates, &module(2, 97.0, 30.0, &[])).unwrap();
    assert_eq!(rewards.badges_earned, vec![PERFECTIONIST_BADGE_ID.to_string()]);

    let again = complete_module(&conn, &env.rates, &module(2, 97.0, 30.0, &[])).unwrap();
    assert!(again.badges_earned.is_empty());
    assert_eq!(ledger::get_account(&conn, "u1").unwrap().total_badges, 1);
  }

  #[test]
  fn test_scholar_badge_at_points_threshold() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    ledger::initialize_account(&conn, "u1").unwrap();
    ledger::award_points(&conn, "u1", &PointsMovement::new(990, PointsSource::AdminAdjustment, "seed")).unwrap();

    let rewards = complete_module(&conn, &env.rates, &module(1, 50.0, 0.0, &[])).unwrap();
    assert!(rewards.badges_earned.contains(&SCHOLAR_BADGE_ID.to_string()));
    assert!(rewards.achievements_unlocked.contains(&"point-collector".to_string()));
  }

  #[test]
  fn test_lesson_completion_perfect_bonus() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    let lesson = LessonCompletion {
      uid: "u1".into(),
      lesson_id: "l1".into(),
      subject_id: "science".into(),
      time_spent: 10.0,
      score: Some(100.0),
    };
    let rewards = complete_lesson(&conn, &env.rates, &lesson).unwrap();
    assert_eq!(rewards.points_awarded, 20);
    assert_eq!(rewards.xp_awarded, 40);
    assert!(!rewards.level_up);
    assert_eq!(rewards.new_level, None);
  }
}
