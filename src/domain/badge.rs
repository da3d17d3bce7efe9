use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
  Common,
  Uncommon,
  Rare,
  Epic,
  Legendary,
}

impl Rarity {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Common => "common",
      Self::Uncommon => "uncommon",
      Self::Rare => "rare",
      Self::Epic => "epic",
      Self::Legendary => "legendary",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "common" => Some(Self::Common),
      "uncommon" => Some(Self::Uncommon),
      "rare" => Some(Self::Rare),
      "epic" => Some(Self::Epic),
      "legendary" => Some(Self::Legendary),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCategory {
  Learning,
  Social,
  Achievement,
  Special,
  Career,
}

impl BadgeCategory {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Learning => "learning",
      Self::Social => "social",
      Self::Achievement => "achievement",
      Self::Special => "special",
      Self::Career => "career",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "learning" => Some(Self::Learning),
      "social" => Some(Self::Social),
      "achievement" => Some(Self::Achievement),
      "special" => Some(Self::Special),
      "career" => Some(Self::Career),
      _ => None,
    }
  }
}

/// Typed unlock condition stored with a badge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeRequirement {
  #[serde(rename = "type")]
  pub kind: String,
  pub value: i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition: Option<String>,
}

/// Admin-authored badge catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
  pub id: String,
  pub name: String,
  pub description: String,
  pub category: BadgeCategory,
  pub icon_url: String,
  pub color: String,
  pub rarity: Rarity,
  pub requirements: Vec<BadgeRequirement>,
  pub is_secret: bool,
  pub points_reward: i64,
  pub xp_reward: i64,
  pub is_active: bool,
  pub is_limited: bool,
}

/// One badge held by one user. Display fields are a snapshot taken at award time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBadge {
  pub id: String,
  pub uid: String,
  pub badge_id: String,
  pub badge_name: String,
  pub badge_icon_url: String,
  pub badge_rarity: Rarity,
  pub earned_at: DateTime<Utc>,
  pub progress: i64,
  pub is_completed: bool,
  pub earned_for: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
  Expert,
}

impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Easy => "easy",
      Self::Medium => "medium",
      Self::Hard => "hard",
      Self::Expert => "expert",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "easy" => Some(Self::Easy),
      "medium" => Some(Self::Medium),
      "hard" => Some(Self::Hard),
      "expert" => Some(Self::Expert),
      _ => None,
    }
  }
}

/// Learner statistic an achievement requirement is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
  CompleteLessons,
  PassQuizzes,
  PerfectScores,
  MaintainStreak,
  EarnPoints,
  UnlockBadges,
  ExploreCareers,
  HelpOthers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementRequirement {
  #[serde(rename = "type")]
  pub kind: RequirementKind,
  pub target: i64,
}

/// Multi-requirement unlockable with prerequisite chaining
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
  pub id: String,
  pub title: String,
  pub description: String,
  pub category: String,
  pub difficulty: Difficulty,
  pub points_reward: i64,
  pub xp_reward: i64,
  pub badge_reward: Option<String>,
  pub requirements: Vec<AchievementRequirement>,
  pub prerequisites: Vec<String>,
  pub icon_url: String,
  pub is_active: bool,
  pub is_hidden: bool,
}

/// Progress towards a single requirement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementProgress {
  pub requirement_type: RequirementKind,
  pub target: i64,
  pub current: i64,
  pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAchievement {
  pub id: String,
  pub uid: String,
  pub achievement_id: String,
  pub achievement_title: String,
  pub achievement_icon_url: String,
  pub achievement_difficulty: Difficulty,
  pub progress: Vec<AchievementProgress>,
  /// 0-100, derived from `progress`
  pub overall_progress: i64,
  pub is_completed: bool,
  pub completed_at: Option<DateTime<Utc>>,
  pub earned_points: Option<i64>,
  pub earned_xp: Option<i64>,
  pub earned_badge_id: Option<String>,
  pub started_at: DateTime<Utc>,
  pub last_updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_requirement_kind_json_names() {
    let req: AchievementRequirement =
      serde_json::from_str(r#"{"type":"complete_lessons","target":5}"#).unwrap();
    assert_eq!(req.kind, RequirementKind::CompleteLessons);
    assert_eq!(req.target, 5);
  }

  #[test]
  fn test_badge_requirement_condition_optional() {
    let req: BadgeRequirement = serde_json::from_str(r#"{"type":"lesson_count","value":1}"#).unwrap();
    assert_eq!(req.kind, "lesson_count");
    assert!(req.condition.is_none());
  }

  #[test]
  fn test_rarity_names() {
    assert_eq!(Rarity::from_str("epic"), Some(Rarity::Epic));
    assert_eq!(Rarity::Legendary.as_str(), "legendary");
  }
}
