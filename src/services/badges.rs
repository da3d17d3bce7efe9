//! Badge awards and achievement evaluation

use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;
use std::collections::HashSet;

use crate::config::RewardRates;
use crate::db;
use crate::domain::{ActivityType, Badge, PointsSource, UserActivity, UserAchievement, UserBadge};
use crate::error::{LedgerError, LedgerResult};
use crate::progression::{LearnerStats, evaluate_achievement, prerequisites_met};

use super::ledger::{self, PointsMovement};

/// Grant a badge once. Returns false when the user already holds it.
///
/// A duplicate returns before the catalog is read. A new award snapshots the
/// badge display fields, bumps the badge counter and pays the badge rewards.
pub fn award_badge(conn: &Connection, rates: &RewardRates, uid: &str, badge_id: &str) -> LedgerResult<bool> {
  if db::user_has_badge(conn, uid, badge_id)? {
    return Ok(false);
  }

  let badge = db::get_badge(conn, badge_id)?.ok_or_else(|| LedgerError::not_found("Badge", badge_id))?;
  if !db::account_exists(conn, uid)? {
    return Err(LedgerError::not_found("Rewards account", uid));
  }

  let user_badge = UserBadge {
    id: db::new_document_id(),
    uid: uid.to_string(),
    badge_id: badge.id.clone(),
    badge_name: badge.name.clone(),
    badge_icon_url: badge.icon_url.clone(),
    badge_rarity: badge.rarity,
    earned_at: Utc::now(),
    progress: 100,
    is_completed: true,
    earned_for: None,
  };
  if !db::insert_user_badge(conn, &user_badge)? {
    return Ok(false);
  }
  db::increment_counter(conn, uid, db::AccountCounter::Badges)?;

  if badge.points_reward > 0 {
    let movement = PointsMovement::new(
      badge.points_reward,
      PointsSource::Badge,
      format!("Earned badge: {}", badge.name),
    )
    .with_source_id(&badge.id);
    ledger::award_points(conn, uid, &movement)?;
  }
  if badge.xp_reward > 0 {
    ledger::award_xp(conn, rates, uid, badge.xp_reward)?;
  }

  tracing::info!(uid, badge_id, "Badge awarded");
  Ok(true)
}

pub fn list_active_badges(conn: &Connection) -> LedgerResult<Vec<Badge>> {
  Ok(db::get_active_badges(conn)?)
}

pub fn get_user_badges(conn: &Connection, uid: &str) -> LedgerResult<Vec<UserBadge>> {
  Ok(db::get_user_badges(conn, uid)?)
}

// ==================== Achievements ====================

/// Current learner statistics from the account, progress and badge tables
pub fn learner_stats(conn: &Connection, uid: &str) -> LedgerResult<LearnerStats> {
  let account = ledger::get_account(conn, uid)?;
  let subjects = db::get_subjects(conn, uid)?;
  let (_, progress_longest) = db::get_progress_streak(conn, uid)?;
  let (lessons, perfect) = db::get_progress_counters(conn, uid)?;

  Ok(LearnerStats {
    lessons_completed: lessons,
    quizzes_passed: subjects.iter().map(|s| s.quizzes_passed).sum(),
    perfect_scores: perfect,
    longest_streak: account.longest_streak.max(progress_longest),
    lifetime_points: account.lifetime_points_earned,
    badges_held: db::count_user_badges(conn, uid)?,
  })
}

/// Re-evaluate every active achievement for `uid` and pay out the ones that
/// completed. Returns the ids completed by this call.
///
/// Rewards paid for one achievement can complete another (points, badges), so
/// evaluation repeats until a pass completes nothing.
pub fn evaluate_achievements(conn: &Connection, rates: &RewardRates, uid: &str) -> LedgerResult<Vec<String>> {
  let catalog = db::get_active_achievements(conn)?;
  let existing = db::get_user_achievements(conn, uid)?;
  let mut completed: HashSet<String> = existing
    .iter()
    .filter(|ua| ua.is_completed)
    .map(|ua| ua.achievement_id.clone())
    .collect();
  let mut started: HashSet<String> = existing.into_iter().map(|ua| ua.achievement_id).collect();
  let mut unlocked = Vec::new();

  loop {
    let stats = learner_stats(conn, uid)?;
    let mut progressed = false;

    for achievement in &catalog {
      if completed.contains(&achievement.id) || !prerequisites_met(achievement, &completed) {
        continue;
      }

      let eval = evaluate_achievement(achievement, &stats);
      if eval.overall_progress == 0 && !started.contains(&achievement.id) {
        continue;
      }

      let now = Utc::now();
      let previous = db::get_user_achievement(conn, uid, &achievement.id)?;
      let mut record = UserAchievement {
        id: db::new_document_id(),
        uid: uid.to_string(),
        achievement_id: achievement.id.clone(),
        achievement_title: achievement.title.clone(),
        achievement_icon_url: achievement.icon_url.clone(),
        achievement_difficulty: achievement.difficulty,
        progress: eval.progress,
        overall_progress: eval.overall_progress,
        is_completed: eval.is_completed,
        completed_at: None,
        earned_points: None,
        earned_xp: None,
        earned_badge_id: None,
        started_at: previous.map(|p| p.started_at).unwrap_or(now),
        last_updated_at: now,
      };
      if eval.is_completed {
        record.completed_at = Some(now);
        record.earned_points = Some(achievement.points_reward);
        record.earned_xp = Some(achievement.xp_reward);
        record.earned_badge_id = achievement.badge_reward.clone();
      }
      db::upsert_user_achievement(conn, &record)?;
      started.insert(achievement.id.clone());

      if !eval.is_completed {
        continue;
      }

      db::increment_counter(conn, uid, db::AccountCounter::Achievements)?;
      if achievement.points_reward > 0 {
        let movement = PointsMovement::new(
          achievement.points_reward,
          PointsSource::Achievement,
          format!("Achievement unlocked: {}", achievement.title),
        )
        .with_source_id(&achievement.id);
        ledger::award_points(conn, uid, &movement)?;
      }
      if achievement.xp_reward > 0 {
        ledger::award_xp(conn, rates, uid, achievement.xp_reward)?;
      }
      if let Some(badge_id) = &achievement.badge_reward {
        award_badge(conn, rates, uid, badge_id)?;
      }

      let activity = UserActivity {
        id: db::new_document_id(),
        uid: uid.to_string(),
        activity_type: ActivityType::AchievementEarned,
        activity_data: json!({ "achievementId": achievement.id, "title": achievement.title }),
        points: achievement.points_reward,
        xp: achievement.xp_reward,
        timestamp: now,
      };
      db::insert_activity(conn, &activity, 0.0, 0)?;

      tracing::info!(uid, achievement_id = %achievement.id, "Achievement unlocked");
      completed.insert(achievement.id.clone());
      unlocked.push(achievement.id.clone());
      progressed = true;
    }

    if !progressed {
      break;
    }
  }

  Ok(unlocked)
}

pub fn list_visible_achievements(conn: &Connection) -> LedgerResult<Vec<crate::domain::Achievement>> {
  Ok(db::get_visible_achievements(conn)?)
}

pub fn get_user_achievements(conn: &Connection, uid: &str) -> LedgerResult<Vec<UserAchievement>> {
  Ok(db::get_user_achievements(conn, uid)?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::services::ledger::{get_account, get_transactions, initialize_account};
  use crate::testing::TestEnv;

  #[test]
  fn test_award_badge_pays_rewards_once() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    initialize_account(&conn, "u1").unwrap();

    assert!(award_badge(&conn, &env.rates, "u1", "first-steps-badge").unwrap());
    assert!(!award_badge(&conn, &env.rates, "u1", "first-steps-badge").unwrap());

    let badges = get_user_badges(&conn, "u1").unwrap();
    assert_eq!(badges.len(), 1);
    assert_eq!(badges[0].badge_name, "First Steps");

    let account = get_account(&conn, "u1").unwrap();
    assert_eq!(account.total_badges, 1);
    // 50 badge points + 50 level-up bonus from the 100 xp reward
    assert_eq!(account.lifetime_points_earned, 100);
    assert_eq!(account.current_level, 2);

    let badge_txs = get_transactions(&conn, "u1", 50)
      .unwrap()
      .into_iter()
      .filter(|t| t.source == PointsSource::Badge)
      .count();
    assert_eq!(badge_txs, 1);
  }

  #[test]
  fn test_award_unknown_badge_is_not_found() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    initialize_account(&conn, "u1").unwrap();
    let err = award_badge(&conn, &env.rates, "u1", "no-such-badge").unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { kind: "Badge", .. }));
  }

  #[test]
  fn test_duplicate_award_skips_catalog() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    initialize_account(&conn, "u1").unwrap();
    award_badge(&conn, &env.rates, "u1", "scholar-badge").unwrap();

    conn.execute("DELETE FROM badges WHERE id = 'scholar-badge'", []).unwrap();
    assert!(!award_badge(&conn, &env.rates, "u1", "scholar-badge").unwrap());
  }

  #[test]
  fn test_point_collector_unlocks_with_rewards() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    initialize_account(&conn, "u1").unwrap();
    ledger::award_points(&conn, "u1", &PointsMovement::new(1000, PointsSource::AdminAdjustment, "grant")).unwrap();

    let unlocked = evaluate_achievements(&conn, &env.rates, "u1").unwrap();
    assert_eq!(unlocked, vec!["point-collector".to_string()]);

    let account = get_account(&conn, "u1").unwrap();
    assert_eq!(account.total_achievements, 1);

    let records = get_user_achievements(&conn, "u1").unwrap();
    let collector = records.iter().find(|r| r.achievement_id == "point-collector").unwrap();
    assert!(collector.is_completed);
    assert_eq!(collector.earned_points, Some(200));

    // a second pass pays nothing more
    assert!(evaluate_achievements(&conn, &env.rates, "u1").unwrap().is_empty());
    assert_eq!(get_account(&conn, "u1").unwrap().total_achievements, 1);
  }

  #[test]
  fn test_prerequisite_blocks_chained_achievement() {
    let env = TestEnv::new().unwrap();
    let conn = env.conn();
    initialize_account(&conn, "u1").unwrap();
    db::ensure_progress(&conn, "u1", Utc::now()).unwrap();
    conn
      .execute("UPDATE user_progress SET perfect_scores = 10 WHERE uid = 'u1'", [])
      .unwrap();

    let unlocked = evaluate_achievements(&conn, &env.rates, "u1").unwrap();
    assert!(!unlocked.contains(&"academic-excellence".to_string()));
    assert!(db::get_user_achievement(&conn, "u1", "academic-excellence").unwrap().is_none());
  }
}
