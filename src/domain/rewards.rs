use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user rewards aggregate: balances, level state and counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardsAccount {
  pub uid: String,

  pub total_points: i64,
  /// Spendable balance; never negative
  pub available_points: i64,
  pub lifetime_points_earned: i64,

  pub current_level: i64,
  /// XP accumulated inside the current level
  pub current_xp: i64,
  pub xp_to_next_level: i64,
  pub total_xp_earned: i64,

  pub total_badges: i64,
  pub total_achievements: i64,

  pub current_streak: i64,
  pub longest_streak: i64,

  pub total_redemptions: i64,
  pub total_spent: i64,

  pub last_earned_at: Option<DateTime<Utc>>,
  pub last_redeemed_at: Option<DateTime<Utc>>,
  pub updated_at: DateTime<Utc>,
}

impl RewardsAccount {
  /// Fresh account at level 1 with all counters zeroed
  pub fn new(uid: impl Into<String>) -> Self {
    Self {
      uid: uid.into(),
      total_points: 0,
      available_points: 0,
      lifetime_points_earned: 0,
      current_level: 1,
      current_xp: 0,
      xp_to_next_level: 100,
      total_xp_earned: 0,
      total_badges: 0,
      total_achievements: 0,
      current_streak: 0,
      longest_streak: 0,
      total_redemptions: 0,
      total_spent: 0,
      last_earned_at: None,
      last_redeemed_at: None,
      updated_at: Utc::now(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
  Earned,
  Spent,
  Bonus,
  Penalty,
}

impl TransactionType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Earned => "earned",
      Self::Spent => "spent",
      Self::Bonus => "bonus",
      Self::Penalty => "penalty",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "earned" => Some(Self::Earned),
      "spent" => Some(Self::Spent),
      "bonus" => Some(Self::Bonus),
      "penalty" => Some(Self::Penalty),
      _ => None,
    }
  }
}

/// What caused a points movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsSource {
  LessonCompletion,
  QuizPassed,
  ModuleCompletion,
  Achievement,
  Badge,
  LevelUp,
  StreakBonus,
  DailyLogin,
  Referral,
  Purchase,
  Redemption,
  SkillMastery,
  AdminAdjustment,
}

impl PointsSource {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::LessonCompletion => "lesson_completion",
      Self::QuizPassed => "quiz_passed",
      Self::ModuleCompletion => "module_completion",
      Self::Achievement => "achievement",
      Self::Badge => "badge",
      Self::LevelUp => "level_up",
      Self::StreakBonus => "streak_bonus",
      Self::DailyLogin => "daily_login",
      Self::Referral => "referral",
      Self::Purchase => "purchase",
      Self::Redemption => "redemption",
      Self::SkillMastery => "skill_mastery",
      Self::AdminAdjustment => "admin_adjustment",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "lesson_completion" => Some(Self::LessonCompletion),
      "quiz_passed" => Some(Self::QuizPassed),
      "module_completion" => Some(Self::ModuleCompletion),
      "achievement" => Some(Self::Achievement),
      "badge" => Some(Self::Badge),
      "level_up" => Some(Self::LevelUp),
      "streak_bonus" => Some(Self::StreakBonus),
      "daily_login" => Some(Self::DailyLogin),
      "referral" => Some(Self::Referral),
      "purchase" => Some(Self::Purchase),
      "redemption" => Some(Self::Redemption),
      "skill_mastery" => Some(Self::SkillMastery),
      "admin_adjustment" => Some(Self::AdminAdjustment),
      _ => None,
    }
  }
}

/// Append-only audit record for one award or spend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsTransaction {
  pub id: String,
  pub uid: String,
  #[serde(rename = "type")]
  pub tx_type: TransactionType,
  /// Signed: negative for spends
  pub amount: i64,
  /// Available balance right after this transaction
  pub balance: i64,
  pub source: PointsSource,
  pub source_id: Option<String>,
  pub description: String,
  pub metadata: Option<serde_json::Value>,
  pub timestamp: DateTime<Utc>,
}
