use serde::Serialize;

use crate::config::RewardRates;

/// Score bonus tiers as (minimum average score, bonus percent), highest first
pub const SCORE_BONUS_TIERS: [(f64, i64); 3] = [(90.0, 50), (80.0, 30), (70.0, 10)];

/// Percent bonus earned for an average score
pub fn score_bonus_percent(average_score: f64) -> i64 {
  SCORE_BONUS_TIERS
    .iter()
    .find(|(min, _)| average_score >= *min)
    .map(|(_, pct)| *pct)
    .unwrap_or(0)
}

/// Floor of `amount * percent / 100` for non-negative amounts
fn percent_of(amount: i64, percent: i64) -> i64 {
  amount.saturating_mul(percent) / 100
}

/// Per-component points and XP of a completion, kept for the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardBreakdown {
  pub base_points: i64,
  pub score_bonus_points: i64,
  pub time_bonus_points: i64,
  pub skills_bonus_points: i64,
  pub base_xp: i64,
  pub score_bonus_xp: i64,
  pub time_bonus_xp: i64,
  pub skills_bonus_xp: i64,
}

impl RewardBreakdown {
  pub fn points(&self) -> i64 {
    self
      .base_points
      .saturating_add(self.score_bonus_points)
      .saturating_add(self.time_bonus_points)
      .saturating_add(self.skills_bonus_points)
  }

  pub fn xp(&self) -> i64 {
    self
      .base_xp
      .saturating_add(self.score_bonus_xp)
      .saturating_add(self.time_bonus_xp)
      .saturating_add(self.skills_bonus_xp)
  }
}

/// Points and XP for finishing a module.
///
/// Every component is floored on its own before summing: base per lesson,
/// score tier bonus, a capped per-hour time bonus (half of it as XP), and a
/// flat bonus per skill gained.
pub fn compute_module_completion_reward(
  rates: &RewardRates,
  lessons_completed: i64,
  average_score: f64,
  total_time_spent_minutes: f64,
  skills_gained_count: i64,
) -> RewardBreakdown {
  let base_points = lessons_completed.saturating_mul(rates.lesson_points);
  let base_xp = lessons_completed.saturating_mul(rates.lesson_xp);

  let pct = score_bonus_percent(average_score);

  // Capped in f64 so no duration can overflow the integer bonus
  let full_hours = (total_time_spent_minutes.max(0.0) / 60.0).floor();
  let time_bonus_points = (full_hours * rates.time_bonus_per_hour as f64).min(rates.time_bonus_cap as f64) as i64;

  RewardBreakdown {
    base_points,
    score_bonus_points: percent_of(base_points, pct),
    time_bonus_points,
    skills_bonus_points: skills_gained_count.saturating_mul(rates.skill_points),
    base_xp,
    score_bonus_xp: percent_of(base_xp, pct),
    time_bonus_xp: time_bonus_points / 2,
    skills_bonus_xp: skills_gained_count.saturating_mul(rates.skill_xp),
  }
}

/// Points and XP for a single lesson; a perfect score adds the quiz bonus
pub fn compute_lesson_completion_reward(rates: &RewardRates, score: Option<f64>) -> RewardBreakdown {
  let perfect = score.is_some_and(|s| s >= 100.0);
  RewardBreakdown {
    base_points: rates.lesson_points,
    base_xp: rates.lesson_xp,
    score_bonus_points: if perfect { rates.quiz_perfect_points } else { 0 },
    score_bonus_xp: if perfect { rates.quiz_perfect_xp } else { 0 },
    ..RewardBreakdown::default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn rates() -> RewardRates {
    RewardRates::default()
  }

  #[test]
  fn test_reference_module_reward() {
    // 5 lessons, 85 average, 120 minutes, one skill
    let reward = compute_module_completion_reward(&rates(), 5, 85.0, 120.0, 1);
    assert_eq!(reward.base_points, 50);
    assert_eq!(reward.score_bonus_points, 15);
    assert_eq!(reward.time_bonus_points, 10);
    assert_eq!(reward.skills_bonus_points, 25);
    assert_eq!(reward.points(), 100);

    assert_eq!(reward.base_xp, 100);
    assert_eq!(reward.score_bonus_xp, 30);
    assert_eq!(reward.time_bonus_xp, 5);
    assert_eq!(reward.skills_bonus_xp, 15);
    assert_eq!(reward.xp(), 150);
  }

  #[test]
  fn test_score_tier_boundaries() {
    assert_eq!(score_bonus_percent(100.0), 50);
    assert_eq!(score_bonus_percent(90.0), 50);
    assert_eq!(score_bonus_percent(89.99), 30);
    assert_eq!(score_bonus_percent(80.0), 30);
    assert_eq!(score_bonus_percent(70.0), 10);
    assert_eq!(score_bonus_percent(69.9), 0);
    assert_eq!(score_bonus_percent(0.0), 0);
  }

  #[test]
  fn test_bonus_is_floored() {
    // 3 lessons -> 30 points, 10% = 3; 60 xp, 10% = 6
    let reward = compute_module_completion_reward(&rates(), 3, 75.0, 0.0, 0);
    assert_eq!(reward.score_bonus_points, 3);
    // 1 lesson -> 10 points, 30% = 3; 20 xp, 30% = 6
    let reward = compute_module_completion_reward(&rates(), 1, 85.0, 0.0, 0);
    assert_eq!(reward.score_bonus_points, 3);
    assert_eq!(reward.score_bonus_xp, 6);
  }

  #[test]
  fn test_time_bonus_capped() {
    let reward = compute_module_completion_reward(&rates(), 0, 0.0, 60.0 * 20.0, 0);
    assert_eq!(reward.time_bonus_points, 50);
    assert_eq!(reward.time_bonus_xp, 25);
  }

  #[test]
  fn test_extreme_inputs_saturate() {
    let reward = compute_module_completion_reward(&rates(), 0, 0.0, 1e300, 0);
    assert_eq!(reward.time_bonus_points, 50);
    assert_eq!(reward.time_bonus_xp, 25);

    let reward = compute_module_completion_reward(&rates(), i64::MAX, 95.0, 0.0, i64::MAX);
    assert_eq!(reward.base_points, i64::MAX);
    assert_eq!(reward.points(), i64::MAX);
    assert_eq!(reward.xp(), i64::MAX);
  }

  #[test]
  fn test_partial_hour_earns_nothing() {
    let reward = compute_module_completion_reward(&rates(), 0, 0.0, 59.9, 0);
    assert_eq!(reward.time_bonus_points, 0);
  }

  #[test]
  fn test_odd_time_bonus_xp_floors() {
    // 3 hours -> 15 points, 7 xp
    let reward = compute_module_completion_reward(&rates(), 0, 0.0, 180.0, 0);
    assert_eq!(reward.time_bonus_points, 15);
    assert_eq!(reward.time_bonus_xp, 7);
  }

  #[test]
  fn test_monotonic_in_lessons_score_and_skills() {
    let r = rates();
    for score in [0.0, 65.0, 72.0, 85.0, 95.0] {
      let mut prev = compute_module_completion_reward(&r, 0, score, 90.0, 0);
      for lessons in 1..20 {
        let next = compute_module_completion_reward(&r, lessons, score, 90.0, 0);
        assert!(next.points() >= prev.points());
        assert!(next.xp() >= prev.xp());
        prev = next;
      }
    }

    let mut prev = compute_module_completion_reward(&r, 4, 0.0, 0.0, 0);
    for score in [10.0, 69.0, 70.0, 79.0, 80.0, 89.0, 90.0, 100.0] {
      let next = compute_module_completion_reward(&r, 4, score, 0.0, 0);
      assert!(next.points() >= prev.points());
      prev = next;
    }

    let mut prev = compute_module_completion_reward(&r, 2, 50.0, 0.0, 0);
    for skills in 1..6 {
      let next = compute_module_completion_reward(&r, 2, 50.0, 0.0, skills);
      assert!(next.points() > prev.points());
      prev = next;
    }
  }

  #[test]
  fn test_lesson_reward_perfect_bonus() {
    let plain = compute_lesson_completion_reward(&rates(), Some(85.0));
    assert_eq!((plain.points(), plain.xp()), (10, 20));

    let perfect = compute_lesson_completion_reward(&rates(), Some(100.0));
    assert_eq!((perfect.points(), perfect.xp()), (20, 40));

    let unscored = compute_lesson_completion_reward(&rates(), None);
    assert_eq!(unscored.points(), 10);
  }
}
