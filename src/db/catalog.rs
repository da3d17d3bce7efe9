//! Default badge, achievement and store catalog, seeded on startup.
//!
//! Seeding is idempotent: entries are keyed by stable slug ids and existing
//! rows are never overwritten, so admin edits survive restarts.

use rusqlite::{Connection, Result};
use serde_json::json;

use crate::domain::{
  Achievement, AchievementRequirement, Badge, BadgeCategory, BadgeRequirement, Difficulty, ItemType,
  Rarity, RequirementKind, StoreCategory, StoreItem,
};

use super::badges::{insert_achievement, insert_badge};
use super::store::insert_store_item;

/// Awarded by module completion once total points reach the scholar threshold
pub const SCHOLAR_BADGE_ID: &str = "scholar-badge";
/// Awarded by module completion for a high average score
pub const PERFECTIONIST_BADGE_ID: &str = "perfectionist-badge";

pub fn seed_catalog(conn: &Connection) -> Result<()> {
  let mut added = 0;
  for badge in default_badges() {
    added += insert_badge(conn, &badge)? as usize;
  }
  for achievement in default_achievements() {
    added += insert_achievement(conn, &achievement)? as usize;
  }
  for item in default_store_items() {
    added += insert_store_item(conn, &item)? as usize;
  }
  if added > 0 {
    tracing::info!("Seeded {} catalog entries", added);
  }
  Ok(())
}

// Helper to create a badge with a single requirement
#[allow(clippy::too_many_arguments)]
fn badge(
  id: &str,
  name: &str,
  description: &str,
  category: BadgeCategory,
  color: &str,
  rarity: Rarity,
  requirement: (&str, i64),
  rewards: (i64, i64),
) -> Badge {
  let slug = id.trim_end_matches("-badge");
  Badge {
    id: id.to_string(),
    name: name.to_string(),
    description: description.to_string(),
    category,
    icon_url: format!("/badges/{}.png", slug),
    color: color.to_string(),
    rarity,
    requirements: vec![BadgeRequirement {
      kind: requirement.0.to_string(),
      value: requirement.1,
      condition: Some("greater_than".to_string()),
    }],
    is_secret: false,
    points_reward: rewards.0,
    xp_reward: rewards.1,
    is_active: true,
    is_limited: false,
  }
}

fn default_badges() -> Vec<Badge> {
  vec![
    badge("first-steps-badge", "First Steps", "Complete your first lesson", BadgeCategory::Learning, "#4CAF50", Rarity::Common, ("lesson_count", 1), (50, 100)),
    badge(SCHOLAR_BADGE_ID, "Scholar", "Complete 10 lessons", BadgeCategory::Learning, "#2196F3", Rarity::Uncommon, ("lesson_count", 10), (100, 200)),
    badge("quiz-master-badge", "Quiz Master", "Pass 5 quizzes with perfect scores", BadgeCategory::Achievement, "#FF9800", Rarity::Rare, ("perfect_quizzes", 5), (200, 400)),
    badge("streak-warrior-badge", "Streak Warrior", "Maintain a 7-day learning streak", BadgeCategory::Achievement, "#E91E63", Rarity::Rare, ("streak_days", 7), (150, 300)),
    badge("career-explorer-badge", "Career Explorer", "Explore 5 different career paths", BadgeCategory::Career, "#9C27B0", Rarity::Uncommon, ("career_exploration", 5), (100, 200)),
    // 600 minutes = 10 hours
    badge("time-master-badge", "Time Master", "Spend 10 hours learning", BadgeCategory::Learning, "#607D8B", Rarity::Epic, ("time_spent", 600), (300, 500)),
    badge(PERFECTIONIST_BADGE_ID, "Perfectionist", "Finish a module with an average score of 95 or more", BadgeCategory::Achievement, "#FFC107", Rarity::Epic, ("average_score", 95), (150, 300)),
  ]
}

fn achievement(
  id: &str,
  title: &str,
  description: &str,
  category: &str,
  difficulty: Difficulty,
  rewards: (i64, i64),
  requirements: &[(RequirementKind, i64)],
) -> Achievement {
  Achievement {
    id: id.to_string(),
    title: title.to_string(),
    description: description.to_string(),
    category: category.to_string(),
    difficulty,
    points_reward: rewards.0,
    xp_reward: rewards.1,
    badge_reward: None,
    requirements: requirements
      .iter()
      .map(|&(kind, target)| AchievementRequirement { kind, target })
      .collect(),
    prerequisites: Vec::new(),
    icon_url: format!("/achievements/{}.png", id),
    is_active: true,
    is_hidden: false,
  }
}

fn default_achievements() -> Vec<Achievement> {
  use RequirementKind::*;

  let mut academic_excellence = achievement(
    "academic-excellence",
    "Academic Excellence",
    "Achieve perfect scores on 10 quizzes",
    "academic",
    Difficulty::Hard,
    (500, 1000),
    &[(PerfectScores, 10)],
  );
  academic_excellence.badge_reward = Some("quiz-master-badge".to_string());
  academic_excellence.prerequisites = vec!["rising-star".to_string()];

  vec![
    achievement(
      "rising-star",
      "Rising Star",
      "Complete 5 lessons and pass 3 quizzes",
      "academic",
      Difficulty::Easy,
      (100, 200),
      &[(CompleteLessons, 5), (PassQuizzes, 3)],
    ),
    academic_excellence,
    achievement(
      "consistency-champion",
      "Consistency Champion",
      "Maintain a 30-day learning streak",
      "personal",
      Difficulty::Expert,
      (1000, 2000),
      &[(MaintainStreak, 30)],
    ),
    achievement(
      "point-collector",
      "Point Collector",
      "Earn 1000 points",
      "personal",
      Difficulty::Medium,
      (200, 400),
      &[(EarnPoints, 1000)],
    ),
    achievement(
      "dream-chaser",
      "Dream Chaser",
      "Explore your dream career and generate a professional image",
      "career",
      Difficulty::Medium,
      (300, 500),
      &[(ExploreCareers, 1)],
    ),
  ]
}

#[allow(clippy::too_many_arguments)]
fn store_item(
  id: &str,
  name: &str,
  description: &str,
  category: StoreCategory,
  points_cost: i64,
  cash_value: f64,
  item_type: ItemType,
  item_data: serde_json::Value,
) -> StoreItem {
  StoreItem {
    id: id.to_string(),
    name: name.to_string(),
    description: description.to_string(),
    category,
    points_cost,
    cash_value: Some(cash_value),
    is_available: true,
    stock_quantity: None,
    is_limited: false,
    minimum_level: None,
    required_badges: Vec::new(),
    image_url: format!("/store/{}.png", id),
    item_type,
    item_data,
    provider: None,
  }
}

fn default_store_items() -> Vec<StoreItem> {
  let networks = json!(["Vodacom", "MTN", "Cell C", "Telkom"]);

  let mut vodacom = store_item(
    "vodacom-1gb-data",
    "Vodacom 1GB Data Bundle",
    "1GB data bundle for Vodacom networks",
    StoreCategory::MobileData,
    500,
    50.0,
    ItemType::DataBundle,
    json!({ "dataAmount": "1GB", "validityPeriod": "30 days", "network": "Vodacom" }),
  );
  vodacom.provider = Some("vodacom".to_string());

  let mut mtn = store_item(
    "mtn-2gb-data",
    "MTN 2GB Data Bundle",
    "2GB data bundle for MTN networks",
    StoreCategory::MobileData,
    800,
    80.0,
    ItemType::DataBundle,
    json!({ "dataAmount": "2GB", "validityPeriod": "30 days", "network": "MTN" }),
  );
  mtn.provider = Some("mtn".to_string());

  let mut airtime_20 = store_item(
    "airtime-r20",
    "R20 Airtime (Any Network)",
    "R20 airtime voucher for any South African network",
    StoreCategory::Digital,
    400,
    20.0,
    ItemType::Airtime,
    json!({ "amount": 20, "currency": "ZAR", "networks": networks }),
  );
  airtime_20.provider = Some("other".to_string());

  let mut airtime_50 = store_item(
    "airtime-r50",
    "R50 Airtime (Any Network)",
    "R50 airtime voucher for any South African network",
    StoreCategory::Digital,
    1000,
    50.0,
    ItemType::Airtime,
    json!({ "amount": 50, "currency": "ZAR", "networks": networks }),
  );
  airtime_50.provider = Some("other".to_string());

  let mut takealot = store_item(
    "takealot-r100-voucher",
    "Takealot R100 Voucher",
    "R100 shopping voucher for Takealot.com",
    StoreCategory::Digital,
    2500,
    100.0,
    ItemType::Voucher,
    json!({ "retailer": "Takealot", "validityPeriod": "6 months", "termsUrl": "https://takealot.com/terms" }),
  );
  takealot.stock_quantity = Some(50);
  takealot.is_limited = true;
  takealot.minimum_level = Some(10);

  vec![
    vodacom,
    mtn,
    airtime_20,
    airtime_50,
    store_item(
      "premium-lesson-access-1m",
      "Premium Lesson Access (1 Month)",
      "Unlock premium lessons and advanced content for 1 month",
      StoreCategory::Educational,
      1500,
      100.0,
      ItemType::CourseAccess,
      json!({ "duration": "30 days", "accessLevel": "premium", "subjects": "all" }),
    ),
    store_item(
      "edufeed-tshirt",
      "EduFeed T-Shirt",
      "Stylish EduFeed branded t-shirt - show your learning pride!",
      StoreCategory::Physical,
      2500,
      250.0,
      ItemType::Merchandise,
      json!({
        "sizes": ["XS", "S", "M", "L", "XL", "XXL"],
        "colors": ["Blue", "Black", "White"],
        "material": "Cotton blend"
      }),
    ),
    takealot,
  ]
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::run_migrations;

  #[test]
  fn test_seed_is_idempotent() {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();
    seed_catalog(&conn).unwrap();
    seed_catalog(&conn).unwrap();

    let count = |table: &str| -> i64 {
      conn
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .unwrap()
    };
    assert_eq!(count("badges"), default_badges().len() as i64);
    assert_eq!(count("achievements"), default_achievements().len() as i64);
    assert_eq!(count("store_items"), default_store_items().len() as i64);
  }

  #[test]
  fn test_achievement_badge_rewards_exist() {
    let badge_ids: Vec<String> = default_badges().into_iter().map(|b| b.id).collect();
    for achievement in default_achievements() {
      if let Some(reward) = achievement.badge_reward {
        assert!(badge_ids.contains(&reward), "missing badge {}", reward);
      }
    }
  }
}
