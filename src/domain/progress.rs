use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Skill tier, always derived from the skill score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillTier {
  Novice,
  Beginner,
  Intermediate,
  Advanced,
  Expert,
}

impl SkillTier {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Novice => "novice",
      Self::Beginner => "beginner",
      Self::Intermediate => "intermediate",
      Self::Advanced => "advanced",
      Self::Expert => "expert",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "novice" => Some(Self::Novice),
      "beginner" => Some(Self::Beginner),
      "intermediate" => Some(Self::Intermediate),
      "advanced" => Some(Self::Advanced),
      "expert" => Some(Self::Expert),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillLevel {
  pub skill_id: String,
  pub skill_name: String,
  pub level: SkillTier,
  /// 0-100
  pub score: i64,
  pub unlocked_at: DateTime<Utc>,
  pub last_updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProgress {
  pub subject_id: String,
  pub subject_name: String,
  pub level: i64,
  pub xp: i64,
  pub xp_to_next_level: i64,
  pub lessons_completed: i64,
  pub total_lessons: i64,
  pub quizzes_passed: i64,
  pub average_score: f64,
  /// Minutes
  pub time_spent: f64,
  pub topics_completed: Vec<String>,
  pub last_activity_at: DateTime<Utc>,
}

/// Per-user learning aggregate, kept separately from the points ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
  pub uid: String,
  pub total_lessons_completed: i64,
  /// Minutes
  pub total_time_spent: f64,
  pub current_streak: i64,
  pub longest_streak: i64,
  pub perfect_scores: i64,
  pub subject_progress: BTreeMap<String, SubjectProgress>,
  pub skill_levels: BTreeMap<String, SkillLevel>,
  pub weekly_goal_minutes: i64,
  pub weekly_progress_minutes: f64,
  pub monthly_goal_lessons: i64,
  pub monthly_progress_lessons: i64,
  pub last_activity_at: Option<DateTime<Utc>>,
  pub updated_at: DateTime<Utc>,
}

impl UserProgress {
  pub fn quizzes_passed(&self) -> i64 {
    self.subject_progress.values().map(|s| s.quizzes_passed).sum()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
  LessonCompleted,
  ModuleCompleted,
  QuizTaken,
  AchievementEarned,
  StreakMilestone,
}

impl ActivityType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::LessonCompleted => "lesson_completed",
      Self::ModuleCompleted => "module_completed",
      Self::QuizTaken => "quiz_taken",
      Self::AchievementEarned => "achievement_earned",
      Self::StreakMilestone => "streak_milestone",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "lesson_completed" => Some(Self::LessonCompleted),
      "module_completed" => Some(Self::ModuleCompleted),
      "quiz_taken" => Some(Self::QuizTaken),
      "achievement_earned" => Some(Self::AchievementEarned),
      "streak_milestone" => Some(Self::StreakMilestone),
      _ => None,
    }
  }
}

/// Raw learning event as logged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
  pub id: String,
  pub uid: String,
  pub activity_type: ActivityType,
  pub activity_data: serde_json::Value,
  pub points: i64,
  pub xp: i64,
  pub timestamp: DateTime<Utc>,
}

/// Validated module completion event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleCompletion {
  pub uid: String,
  pub module_id: String,
  pub subject_id: String,
  pub lessons_completed: i64,
  /// 0-100
  pub average_score: f64,
  /// Minutes
  pub total_time_spent: f64,
  pub skills_gained: Vec<String>,
}

/// Validated single lesson completion event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonCompletion {
  pub uid: String,
  pub lesson_id: String,
  pub subject_id: String,
  /// Minutes
  pub time_spent: f64,
  pub score: Option<f64>,
}

/// Turn an id like `linear_algebra` into `Linear Algebra`
pub fn humanize_id(id: &str) -> String {
  id.split(['_', '-', ' '])
    .filter(|w| !w.is_empty())
    .map(|word| {
      let mut chars = word.chars();
      match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
      }
    })
    .collect::<Vec<_>>()
    .join(" ")
}
