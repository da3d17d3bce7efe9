use std::collections::HashSet;

use crate::domain::{Achievement, AchievementProgress, RequirementKind};

/// Learner statistics achievement requirements are measured against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LearnerStats {
  pub lessons_completed: i64,
  pub quizzes_passed: i64,
  pub perfect_scores: i64,
  pub longest_streak: i64,
  pub lifetime_points: i64,
  pub badges_held: i64,
}

impl LearnerStats {
  /// Current value for a requirement kind; kinds this service does not track read 0
  pub fn value_for(&self, kind: RequirementKind) -> i64 {
    match kind {
      RequirementKind::CompleteLessons => self.lessons_completed,
      RequirementKind::PassQuizzes => self.quizzes_passed,
      RequirementKind::PerfectScores => self.perfect_scores,
      RequirementKind::MaintainStreak => self.longest_streak,
      RequirementKind::EarnPoints => self.lifetime_points,
      RequirementKind::UnlockBadges => self.badges_held,
      RequirementKind::ExploreCareers | RequirementKind::HelpOthers => 0,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AchievementEvaluation {
  pub progress: Vec<AchievementProgress>,
  /// Floored mean of per-requirement percentages, 0-100
  pub overall_progress: i64,
  pub is_completed: bool,
}

/// True when every prerequisite id appears in `completed`
pub fn prerequisites_met(achievement: &Achievement, completed: &HashSet<String>) -> bool {
  achievement.prerequisites.iter().all(|id| completed.contains(id))
}

pub fn evaluate_achievement(achievement: &Achievement, stats: &LearnerStats) -> AchievementEvaluation {
  let progress: Vec<AchievementProgress> = achievement
    .requirements
    .iter()
    .map(|req| {
      let target = req.target.max(0);
      let current = stats.value_for(req.kind).clamp(0, target);
      AchievementProgress {
        requirement_type: req.kind,
        target,
        current,
        is_completed: current >= target,
      }
    })
    .collect();

  if progress.is_empty() {
    return AchievementEvaluation {
      progress,
      overall_progress: 0,
      is_completed: false,
    };
  }

  let percent_sum: i64 = progress
    .iter()
    .map(|p| if p.target == 0 { 100 } else { p.current * 100 / p.target })
    .sum();
  let overall_progress = percent_sum / progress.len() as i64;
  let is_completed = progress.iter().all(|p| p.is_completed);

  AchievementEvaluation {
    progress,
    overall_progress,
    is_completed,
  }
}
