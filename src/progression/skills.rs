use crate::domain::SkillTier;

/// Scores never exceed this
pub const MAX_SKILL_SCORE: i64 = 100;

/// Tier for a skill score: >=80 expert, >=60 advanced, >=40 intermediate, >=20 beginner
pub fn skill_tier_for_score(score: i64) -> SkillTier {
  match score {
    s if s >= 80 => SkillTier::Expert,
    s if s >= 60 => SkillTier::Advanced,
    s if s >= 40 => SkillTier::Intermediate,
    s if s >= 20 => SkillTier::Beginner,
    _ => SkillTier::Novice,
  }
}

/// New score and tier after a module with `average_score` exercised the skill.
///
/// The score grows by a tenth of the module average (floored) and is capped at
/// 100; it never decreases.
pub fn compute_skill_level_update(current_score: i64, average_score: f64) -> (i64, SkillTier) {
  let gain = (average_score.max(0.0) / 10.0).floor() as i64;
  let new_score = (current_score + gain).min(MAX_SKILL_SCORE).max(current_score);
  (new_score, skill_tier_for_score(new_score))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_tier_boundaries_are_exact() {
    assert_eq!(skill_tier_for_score(100), SkillTier::Expert);
    assert_eq!(skill_tier_for_score(80), SkillTier::Expert);
    assert_eq!(skill_tier_for_score(79), SkillTier::Advanced);
    assert_eq!(skill_tier_for_score(60), SkillTier::Advanced);
    assert_eq!(skill_tier_for_score(59), SkillTier::Intermediate);
    assert_eq!(skill_tier_for_score(40), SkillTier::Intermediate);
    assert_eq!(skill_tier_for_score(39), SkillTier::Beginner);
    assert_eq!(skill_tier_for_score(20), SkillTier::Beginner);
    assert_eq!(skill_tier_for_score(19), SkillTier::Novice);
    assert_eq!(skill_tier_for_score(0), SkillTier::Novice);
  }

  #[test]
  fn test_update_adds_tenth_of_average() {
    assert_eq!(compute_skill_level_update(0, 85.0), (8, SkillTier::Novice));
    assert_eq!(compute_skill_level_update(15, 59.0), (20, SkillTier::Beginner));
  }

  #[test]
  fn test_update_caps_at_100() {
    assert_eq!(compute_skill_level_update(95, 100.0), (100, SkillTier::Expert));
    assert_eq!(compute_skill_level_update(100, 100.0), (100, SkillTier::Expert));
  }

  #[test]
  fn test_score_never_decreases_and_tier_agrees() {
    for current in (0..=100).step_by(7) {
      for avg in [0.0, 9.9, 10.0, 45.5, 70.0, 99.9, 100.0] {
        let (score, tier) = compute_skill_level_update(current, avg);
        assert!(score >= current);
        assert!(score <= MAX_SKILL_SCORE);
        assert_eq!(tier, skill_tier_for_score(score));
      }
    }
  }
}
