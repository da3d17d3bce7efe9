use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardPeriod {
  Weekly,
  Monthly,
  #[default]
  AllTime,
}

impl LeaderboardPeriod {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Weekly => "weekly",
      Self::Monthly => "monthly",
      Self::AllTime => "all_time",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "weekly" => Some(Self::Weekly),
      "monthly" => Some(Self::Monthly),
      "all_time" => Some(Self::AllTime),
      _ => None,
    }
  }

  /// Result column the period ranks by
  pub fn sort_key(&self) -> &'static str {
    match self {
      Self::Weekly => "window_weekly",
      Self::Monthly => "window_monthly",
      Self::AllTime => "l.total_points",
    }
  }
}

/// Read projection of a rewards account. Rank is assigned at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
  pub uid: String,
  pub display_name: String,
  pub school: Option<String>,
  pub grade: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub rank: Option<i64>,
  pub total_points: i64,
  pub total_xp: i64,
  pub weekly_points: i64,
  pub monthly_points: i64,
  pub streak_days: i64,
  pub lessons_completed: i64,
  pub badges_earned: i64,
  pub updated_at: DateTime<Utc>,
}

/// Display fields a user may set on their entry
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardProfile {
  pub display_name: Option<String>,
  pub school: Option<String>,
  pub grade: Option<String>,
}
