//! Badge and achievement catalogs plus the per-user junction records

use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use crate::domain::{
  Achievement, BadgeCategory, Badge, Difficulty, Rarity, UserAchievement, UserBadge,
};

use super::{get_enum, get_json, get_opt_timestamp, get_timestamp, to_json};

// ==================== Badge catalog ====================

const BADGE_COLUMNS: &str = r#"
  id, name, description, category, icon_url, color, rarity, requirements, is_secret,
  points_reward, xp_reward, is_active, is_limited
"#;

fn row_to_badge(row: &Row) -> Result<Badge> {
  Ok(Badge {
    id: row.get(0)?,
    name: row.get(1)?,
    description: row.get(2)?,
    category: get_enum(row, 3, BadgeCategory::from_str)?,
    icon_url: row.get(4)?,
    color: row.get(5)?,
    rarity: get_enum(row, 6, Rarity::from_str)?,
    requirements: get_json(row, 7)?,
    is_secret: row.get(8)?,
    points_reward: row.get(9)?,
    xp_reward: row.get(10)?,
    is_active: row.get(11)?,
    is_limited: row.get(12)?,
  })
}

/// Insert a catalog badge unless one with the same id exists. Returns true if inserted.
pub fn insert_badge(conn: &Connection, badge: &Badge) -> Result<bool> {
  let inserted = conn.execute(
    r#"
    INSERT OR IGNORE INTO badges (id, name, description, category, icon_url, color, rarity,
                                  requirements, is_secret, points_reward, xp_reward, is_active,
                                  is_limited, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
    "#,
    params![
      badge.id,
      badge.name,
      badge.description,
      badge.category.as_str(),
      badge.icon_url,
      badge.color,
      badge.rarity.as_str(),
      to_json(&badge.requirements)?,
      badge.is_secret,
      badge.points_reward,
      badge.xp_reward,
      badge.is_active,
      badge.is_limited,
      chrono::Utc::now().to_rfc3339(),
    ],
  )?;
  Ok(inserted > 0)
}

pub fn get_badge(conn: &Connection, id: &str) -> Result<Option<Badge>> {
  conn
    .query_row(
      &format!("SELECT {} FROM badges WHERE id = ?1", BADGE_COLUMNS),
      params![id],
      row_to_badge,
    )
    .optional()
}

pub fn get_active_badges(conn: &Connection) -> Result<Vec<Badge>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM badges WHERE is_active = 1 ORDER BY category, name",
    BADGE_COLUMNS
  ))?;
  let badges = stmt.query_map([], row_to_badge)?.collect::<Result<Vec<_>>>()?;
  Ok(badges)
}

// ==================== User badges ====================

pub fn user_has_badge(conn: &Connection, uid: &str, badge_id: &str) -> Result<bool> {
  conn.query_row(
    "SELECT EXISTS(SELECT 1 FROM user_badges WHERE uid = ?1 AND badge_id = ?2)",
    params![uid, badge_id],
    |row| row.get(0),
  )
}

/// Returns false when the (uid, badge_id) pair is already present
pub fn insert_user_badge(conn: &Connection, badge: &UserBadge) -> Result<bool> {
  let inserted = conn.execute(
    r#"
    INSERT OR IGNORE INTO user_badges (id, uid, badge_id, badge_name, badge_icon_url, badge_rarity,
                                       earned_at, progress, is_completed, earned_for)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    "#,
    params![
      badge.id,
      badge.uid,
      badge.badge_id,
      badge.badge_name,
      badge.badge_icon_url,
      badge.badge_rarity.as_str(),
      badge.earned_at.to_rfc3339(),
      badge.progress,
      badge.is_completed,
      badge.earned_for,
    ],
  )?;
  Ok(inserted > 0)
}

fn row_to_user_badge(row: &Row) -> Result<UserBadge> {
  Ok(UserBadge {
    id: row.get(0)?,
    uid: row.get(1)?,
    badge_id: row.get(2)?,
    badge_name: row.get(3)?,
    badge_icon_url: row.get(4)?,
    badge_rarity: get_enum(row, 5, Rarity::from_str)?,
    earned_at: get_timestamp(row, 6)?,
    progress: row.get(7)?,
    is_completed: row.get(8)?,
    earned_for: row.get(9)?,
  })
}

/// Newest first
pub fn get_user_badges(conn: &Connection, uid: &str) -> Result<Vec<UserBadge>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT id, uid, badge_id, badge_name, badge_icon_url, badge_rarity, earned_at, progress,
           is_completed, earned_for
    FROM user_badges WHERE uid = ?1
    ORDER BY earned_at DESC, rowid DESC
    "#,
  )?;
  let badges = stmt
    .query_map(params![uid], row_to_user_badge)?
    .collect::<Result<Vec<_>>>()?;
  Ok(badges)
}

pub fn count_user_badges(conn: &Connection, uid: &str) -> Result<i64> {
  conn.query_row(
    "SELECT COUNT(*) FROM user_badges WHERE uid = ?1",
    params![uid],
    |row| row.get(0),
  )
}

// ==================== Achievement catalog ====================

const ACHIEVEMENT_COLUMNS: &str = r#"
  id, title, description, category, difficulty, points_reward, xp_reward, badge_reward,
  requirements, prerequisites, icon_url, is_active, is_hidden
"#;

fn row_to_achievement(row: &Row) -> Result<Achievement> {
  Ok(Achievement {
    id: row.get(0)?,
    title: row.get(1)?,
    description: row.get(2)?,
    category: row.get(3)?,
    difficulty: get_enum(row, 4, Difficulty::from_str)?,
    points_reward: row.get(5)?,
    xp_reward: row.get(6)?,
    badge_reward: row.get(7)?,
    requirements: get_json(row, 8)?,
    prerequisites: get_json(row, 9)?,
    icon_url: row.get(10)?,
    is_active: row.get(11)?,
    is_hidden: row.get(12)?,
  })
}

pub fn insert_achievement(conn: &Connection, achievement: &Achievement) -> Result<bool> {
  let inserted = conn.execute(
    r#"
    INSERT OR IGNORE INTO achievements (id, title, description, category, difficulty,
                                        points_reward, xp_reward, badge_reward, requirements,
                                        prerequisites, icon_url, is_active, is_hidden, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
    "#,
    params![
      achievement.id,
      achievement.title,
      achievement.description,
      achievement.category,
      achievement.difficulty.as_str(),
      achievement.points_reward,
      achievement.xp_reward,
      achievement.badge_reward,
      to_json(&achievement.requirements)?,
      to_json(&achievement.prerequisites)?,
      achievement.icon_url,
      achievement.is_active,
      achievement.is_hidden,
      chrono::Utc::now().to_rfc3339(),
    ],
  )?;
  Ok(inserted > 0)
}

pub fn get_active_achievements(conn: &Connection) -> Result<Vec<Achievement>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM achievements WHERE is_active = 1 ORDER BY rowid",
    ACHIEVEMENT_COLUMNS
  ))?;
  let achievements = stmt
    .query_map([], row_to_achievement)?
    .collect::<Result<Vec<_>>>()?;
  Ok(achievements)
}

/// Active achievements that are not hidden
pub fn get_visible_achievements(conn: &Connection) -> Result<Vec<Achievement>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM achievements WHERE is_active = 1 AND is_hidden = 0 ORDER BY rowid",
    ACHIEVEMENT_COLUMNS
  ))?;
  let achievements = stmt
    .query_map([], row_to_achievement)?
    .collect::<Result<Vec<_>>>()?;
  Ok(achievements)
}

// ==================== User achievements ====================

const USER_ACHIEVEMENT_COLUMNS: &str = r#"
  id, uid, achievement_id, achievement_title, achievement_icon_url, achievement_difficulty,
  progress, overall_progress, is_completed, completed_at, earned_points, earned_xp,
  earned_badge_id, started_at, last_updated_at
"#;

fn row_to_user_achievement(row: &Row) -> Result<UserAchievement> {
  Ok(UserAchievement {
    id: row.get(0)?,
    uid: row.get(1)?,
    achievement_id: row.get(2)?,
    achievement_title: row.get(3)?,
    achievement_icon_url: row.get(4)?,
    achievement_difficulty: get_enum(row, 5, Difficulty::from_str)?,
    progress: get_json(row, 6)?,
    overall_progress: row.get(7)?,
    is_completed: row.get(8)?,
    completed_at: get_opt_timestamp(row, 9)?,
    earned_points: row.get(10)?,
    earned_xp: row.get(11)?,
    earned_badge_id: row.get(12)?,
    started_at: get_timestamp(row, 13)?,
    last_updated_at: get_timestamp(row, 14)?,
  })
}

/// Insert or overwrite the user's record for one achievement
pub fn upsert_user_achievement(conn: &Connection, ua: &UserAchievement) -> Result<()> {
  conn.execute(
    r#"
    INSERT INTO user_achievements (id, uid, achievement_id, achievement_title, achievement_icon_url,
                                   achievement_difficulty, progress, overall_progress, is_completed,
                                   completed_at, earned_points, earned_xp, earned_badge_id,
                                   started_at, last_updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
    ON CONFLICT (uid, achievement_id) DO UPDATE SET
      progress = excluded.progress,
      overall_progress = excluded.overall_progress,
      is_completed = excluded.is_completed,
      completed_at = excluded.completed_at,
      earned_points = excluded.earned_points,
      earned_xp = excluded.earned_xp,
      earned_badge_id = excluded.earned_badge_id,
      last_updated_at = excluded.last_updated_at
    "#,
    params![
      ua.id,
      ua.uid,
      ua.achievement_id,
      ua.achievement_title,
      ua.achievement_icon_url,
      ua.achievement_difficulty.as_str(),
      to_json(&ua.progress)?,
      ua.overall_progress,
      ua.is_completed,
      ua.completed_at.map(|t| t.to_rfc3339()),
      ua.earned_points,
      ua.earned_xp,
      ua.earned_badge_id,
      ua.started_at.to_rfc3339(),
      ua.last_updated_at.to_rfc3339(),
    ],
  )?;
  Ok(())
}

pub fn get_user_achievements(conn: &Connection, uid: &str) -> Result<Vec<UserAchievement>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM user_achievements WHERE uid = ?1 ORDER BY last_updated_at DESC, rowid DESC",
    USER_ACHIEVEMENT_COLUMNS
  ))?;
  let achievements = stmt
    .query_map(params![uid], row_to_user_achievement)?
    .collect::<Result<Vec<_>>>()?;
  Ok(achievements)
}

pub fn get_user_achievement(conn: &Connection, uid: &str, achievement_id: &str) -> Result<Option<UserAchievement>> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM user_achievements WHERE uid = ?1 AND achievement_id = ?2",
        USER_ACHIEVEMENT_COLUMNS
      ),
      params![uid, achievement_id],
      row_to_user_achievement,
    )
    .optional()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::{new_document_id, run_migrations, seed_catalog};
  use chrono::Utc;

  fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();
    seed_catalog(&conn).unwrap();
    conn
  }

  fn user_badge(uid: &str, badge: &Badge) -> UserBadge {
    UserBadge {
      id: new_document_id(),
      uid: uid.into(),
      badge_id: badge.id.clone(),
      badge_name: badge.name.clone(),
      badge_icon_url: badge.icon_url.clone(),
      badge_rarity: badge.rarity,
      earned_at: Utc::now(),
      progress: 100,
      is_completed: true,
      earned_for: None,
    }
  }

  #[test]
  fn test_seeded_badge_readable() {
    let conn = setup();
    let badge = get_badge(&conn, "scholar-badge").unwrap().unwrap();
    assert_eq!(badge.name, "Scholar");
    assert!(get_badge(&conn, "nope").unwrap().is_none());
    assert!(!get_active_badges(&conn).unwrap().is_empty());
  }

  #[test]
  fn test_user_badge_unique_per_user() {
    let conn = setup();
    let badge = get_badge(&conn, "scholar-badge").unwrap().unwrap();
    assert!(insert_user_badge(&conn, &user_badge("u1", &badge)).unwrap());
    assert!(!insert_user_badge(&conn, &user_badge("u1", &badge)).unwrap());
    assert!(insert_user_badge(&conn, &user_badge("u2", &badge)).unwrap());

    assert!(user_has_badge(&conn, "u1", "scholar-badge").unwrap());
    assert_eq!(count_user_badges(&conn, "u1").unwrap(), 1);
    assert_eq!(get_user_badges(&conn, "u1").unwrap()[0].badge_rarity, badge.rarity);
  }

  #[test]
  fn test_user_achievement_upsert() {
    let conn = setup();
    let achievement = get_active_achievements(&conn).unwrap().remove(0);
    let now = Utc::now();
    let mut ua = UserAchievement {
      id: new_document_id(),
      uid: "u1".into(),
      achievement_id: achievement.id.clone(),
      achievement_title: achievement.title.clone(),
      achievement_icon_url: achievement.icon_url.clone(),
      achievement_difficulty: achievement.difficulty,
      progress: vec![],
      overall_progress: 40,
      is_completed: false,
      completed_at: None,
      earned_points: None,
      earned_xp: None,
      earned_badge_id: None,
      started_at: now,
      last_updated_at: now,
    };
    upsert_user_achievement(&conn, &ua).unwrap();

    ua.id = new_document_id();
    ua.overall_progress = 100;
    ua.is_completed = true;
    ua.completed_at = Some(now);
    upsert_user_achievement(&conn, &ua).unwrap();

    let stored = get_user_achievements(&conn, "u1").unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].is_completed);
    assert_eq!(stored[0].overall_progress, 100);
  }
}
