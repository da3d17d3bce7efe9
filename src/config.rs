//! Application configuration.
//!
//! Values are resolved with priority: config.toml > environment (.env) > default.
//! Reward rate tables live here so the progression engine stays free of I/O.

use serde::Deserialize;
use std::path::PathBuf;

use crate::paths;

// ==================== Config File ====================

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct AppConfig {
  database: Option<DatabaseConfig>,
  server: Option<ServerConfig>,
  rewards: Option<RewardRates>,
}

#[derive(Debug, Deserialize)]
struct DatabaseConfig {
  path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerConfig {
  port: Option<u16>,
}

/// Fully resolved settings used by `main`
#[derive(Debug, Clone)]
pub struct Settings {
  pub database_path: PathBuf,
  pub port: u16,
  pub rates: RewardRates,
}

fn read_config_file() -> AppConfig {
  let Ok(contents) = std::fs::read_to_string(paths::CONFIG_FILE) else {
    return AppConfig::default();
  };
  match toml::from_str::<AppConfig>(&contents) {
    Ok(config) => config,
    Err(e) => {
      tracing::warn!("Ignoring malformed {}: {}", paths::CONFIG_FILE, e);
      AppConfig::default()
    }
  }
}

/// Load settings from config.toml, .env and defaults
pub fn load_settings() -> Settings {
  // Load .env file if present
  let _ = dotenvy::dotenv();

  let config = read_config_file();

  let database_path = config
    .database
    .and_then(|db| db.path)
    .map(|path| {
      tracing::info!("Using database from {}: {}", paths::CONFIG_FILE, path);
      PathBuf::from(path)
    })
    .or_else(|| {
      std::env::var("DATABASE_PATH").ok().map(|path| {
        tracing::info!("Using database from DATABASE_PATH env: {}", path);
        PathBuf::from(path)
      })
    })
    .unwrap_or_else(|| {
      let default = PathBuf::from(paths::db_path());
      tracing::info!("Using default database path: {}", default.display());
      default
    });

  let port = config
    .server
    .and_then(|s| s.port)
    .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
    .unwrap_or(SERVER_PORT);

  Settings {
    database_path,
    port,
    rates: config.rewards.unwrap_or_default(),
  }
}

// ==================== Server Configuration ====================

/// Server address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Default server port
pub const SERVER_PORT: u16 = 3000;

/// Get the full server bind address
pub fn server_bind_addr(port: u16) -> String {
  format!("{}:{}", SERVER_ADDR, port)
}

// ==================== Query Limits ====================

/// Default number of leaderboard rows
pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 100;

/// Upper bound for leaderboard requests
pub const MAX_LEADERBOARD_LIMIT: i64 = 500;

/// Default page size for transaction and activity history
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Upper bound for transaction and activity history
pub const MAX_HISTORY_LIMIT: i64 = 200;

/// Clamp a user-supplied limit into `1..=max`, falling back to `default`
pub fn clamp_limit(requested: Option<i64>, default: i64, max: i64) -> i64 {
  requested.unwrap_or(default).clamp(1, max)
}

// ==================== Input Bounds ====================

/// Most lessons a single completion event may report
pub const MAX_LESSONS_PER_EVENT: i64 = 1_000;

/// Most minutes a single completion event may report
pub const MAX_MINUTES_PER_EVENT: f64 = 100_000.0;

/// Most skills a single module completion may report
pub const MAX_SKILLS_PER_EVENT: usize = 100;

/// Largest single points award or spend
pub const MAX_POINTS_PER_MOVEMENT: i64 = 1_000_000;

/// Largest single XP award
pub const MAX_XP_PER_AWARD: i64 = 1_000_000;

// ==================== Progress Defaults ====================

/// Weekly study goal assigned to new progress documents
pub const DEFAULT_WEEKLY_GOAL_MINUTES: i64 = 300;

/// Monthly lesson goal assigned to new progress documents
pub const DEFAULT_MONTHLY_GOAL_LESSONS: i64 = 20;

/// Lesson count assumed for a subject until the catalog says otherwise
pub const DEFAULT_SUBJECT_TOTAL_LESSONS: i64 = 50;

// ==================== Reward Rates ====================

/// Which level curve the ledger applies when XP is awarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelCurve {
  /// Each level costs `100 * level` XP on top of the previous one
  #[default]
  Incremental,
  /// Level is looked up from the absolute total-XP threshold table
  Threshold,
}

/// Earning rates and badge thresholds, overridable via `[rewards]` in config.toml
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RewardRates {
  pub lesson_points: i64,
  pub lesson_xp: i64,
  /// Minimum lesson score that counts as a passed quiz
  pub quiz_pass_score: f64,
  pub quiz_perfect_points: i64,
  pub quiz_perfect_xp: i64,
  pub time_bonus_per_hour: i64,
  pub time_bonus_cap: i64,
  pub skill_points: i64,
  pub skill_xp: i64,
  pub level_up_bonus_per_level: i64,
  pub scholar_points_threshold: i64,
  pub perfectionist_score: f64,
  pub level_curve: LevelCurve,
}

impl Default for RewardRates {
  fn default() -> Self {
    Self {
      lesson_points: 10,
      lesson_xp: 20,
      quiz_pass_score: 70.0,
      quiz_perfect_points: 10,
      quiz_perfect_xp: 20,
      time_bonus_per_hour: 5,
      time_bonus_cap: 50,
      skill_points: 25,
      skill_xp: 15,
      level_up_bonus_per_level: 50,
      scholar_points_threshold: 1000,
      perfectionist_score: 95.0,
      level_curve: LevelCurve::Incremental,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_partial_rewards_table_keeps_defaults() {
    let config: AppConfig = toml::from_str(
      r#"
      [rewards]
      lesson_points = 12
      level_curve = "threshold"
      "#,
    )
    .unwrap();
    let rates = config.rewards.unwrap();
    assert_eq!(rates.lesson_points, 12);
    assert_eq!(rates.lesson_xp, 20);
    assert_eq!(rates.level_curve, LevelCurve::Threshold);
  }

  #[test]
  fn test_empty_config_is_valid() {
    let config: AppConfig = toml::from_str("").unwrap();
    assert!(config.database.is_none());
    assert!(config.rewards.is_none());
  }

  #[test]
  fn test_clamp_limit() {
    assert_eq!(clamp_limit(None, 50, 200), 50);
    assert_eq!(clamp_limit(Some(0), 50, 200), 1);
    assert_eq!(clamp_limit(Some(1000), 50, 200), 200);
    assert_eq!(clamp_limit(Some(7), 50, 200), 7);
  }
}
