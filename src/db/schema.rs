use rusqlite::{Connection, Result};

pub fn run_migrations(conn: &Connection) -> Result<()> {
  // Create tables with COMPLETE schema for new databases
  // Migrations below handle upgrades for existing databases
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS rewards_accounts (
      uid TEXT PRIMARY KEY,
      total_points INTEGER NOT NULL DEFAULT 0,
      available_points INTEGER NOT NULL DEFAULT 0 CHECK (available_points >= 0),
      lifetime_points_earned INTEGER NOT NULL DEFAULT 0,
      current_level INTEGER NOT NULL DEFAULT 1,
      current_xp INTEGER NOT NULL DEFAULT 0,
      xp_to_next_level INTEGER NOT NULL DEFAULT 100,
      total_xp_earned INTEGER NOT NULL DEFAULT 0,
      total_badges INTEGER NOT NULL DEFAULT 0,
      total_achievements INTEGER NOT NULL DEFAULT 0,
      current_streak INTEGER NOT NULL DEFAULT 0,
      longest_streak INTEGER NOT NULL DEFAULT 0,
      last_activity_date TEXT,
      total_redemptions INTEGER NOT NULL DEFAULT 0,
      total_spent INTEGER NOT NULL DEFAULT 0,
      last_earned_at TEXT,
      last_redeemed_at TEXT,
      created_at TEXT NOT NULL,
      updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS points_transactions (
      id TEXT PRIMARY KEY,
      uid TEXT NOT NULL,
      type TEXT NOT NULL,
      amount INTEGER NOT NULL,
      balance INTEGER NOT NULL,
      source TEXT NOT NULL,
      source_id TEXT,
      description TEXT NOT NULL,
      metadata TEXT,
      timestamp TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS badges (
      id TEXT PRIMARY KEY,
      name TEXT NOT NULL,
      description TEXT NOT NULL,
      category TEXT NOT NULL,
      icon_url TEXT NOT NULL,
      color TEXT NOT NULL,
      rarity TEXT NOT NULL,
      requirements TEXT NOT NULL DEFAULT '[]',
      is_secret INTEGER NOT NULL DEFAULT 0,
      points_reward INTEGER NOT NULL DEFAULT 0,
      xp_reward INTEGER NOT NULL DEFAULT 0,
      is_active INTEGER NOT NULL DEFAULT 1,
      is_limited INTEGER NOT NULL DEFAULT 0,
      created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS user_badges (
      id TEXT PRIMARY KEY,
      uid TEXT NOT NULL,
      badge_id TEXT NOT NULL,
      badge_name TEXT NOT NULL,
      badge_icon_url TEXT NOT NULL,
      badge_rarity TEXT NOT NULL,
      earned_at TEXT NOT NULL,
      progress INTEGER NOT NULL DEFAULT 100,
      is_completed INTEGER NOT NULL DEFAULT 1,
      earned_for TEXT,
      UNIQUE (uid, badge_id)
    );

    CREATE TABLE IF NOT EXISTS achievements (
      id TEXT PRIMARY KEY,
      title TEXT NOT NULL,
      description TEXT NOT NULL,
      category TEXT NOT NULL,
      difficulty TEXT NOT NULL,
      points_reward INTEGER NOT NULL DEFAULT 0,
      xp_reward INTEGER NOT NULL DEFAULT 0,
      badge_reward TEXT,
      requirements TEXT NOT NULL DEFAULT '[]',
      prerequisites TEXT NOT NULL DEFAULT '[]',
      icon_url TEXT NOT NULL,
      is_active INTEGER NOT NULL DEFAULT 1,
      is_hidden INTEGER NOT NULL DEFAULT 0,
      created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS user_achievements (
      id TEXT PRIMARY KEY,
      uid TEXT NOT NULL,
      achievement_id TEXT NOT NULL,
      achievement_title TEXT NOT NULL,
      achievement_icon_url TEXT NOT NULL,
      achievement_difficulty TEXT NOT NULL,
      progress TEXT NOT NULL DEFAULT '[]',
      overall_progress INTEGER NOT NULL DEFAULT 0,
      is_completed INTEGER NOT NULL DEFAULT 0,
      completed_at TEXT,
      earned_points INTEGER,
      earned_xp INTEGER,
      earned_badge_id TEXT,
      started_at TEXT NOT NULL,
      last_updated_at TEXT NOT NULL,
      UNIQUE (uid, achievement_id)
    );

    CREATE TABLE IF NOT EXISTS store_items (
      id TEXT PRIMARY KEY,
      name TEXT NOT NULL,
      description TEXT NOT NULL,
      category TEXT NOT NULL,
      points_cost INTEGER NOT NULL,
      cash_value REAL,
      is_available INTEGER NOT NULL DEFAULT 1,
      stock_quantity INTEGER,
      is_limited INTEGER NOT NULL DEFAULT 0,
      minimum_level INTEGER,
      required_badges TEXT NOT NULL DEFAULT '[]',
      image_url TEXT NOT NULL,
      item_type TEXT NOT NULL,
      item_data TEXT NOT NULL DEFAULT '{}',
      provider TEXT,
      created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS redemptions (
      id TEXT PRIMARY KEY,
      uid TEXT NOT NULL,
      store_item_id TEXT NOT NULL,
      item_name TEXT NOT NULL,
      item_category TEXT NOT NULL,
      points_spent INTEGER NOT NULL,
      cash_value REAL,
      status TEXT NOT NULL,
      delivery_method TEXT NOT NULL,
      delivery_details TEXT,
      fulfillment_code TEXT,
      is_delivered INTEGER NOT NULL DEFAULT 0,
      delivered_at TEXT,
      error_message TEXT,
      retry_count INTEGER NOT NULL DEFAULT 0,
      redeemed_at TEXT NOT NULL,
      updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS user_progress (
      uid TEXT PRIMARY KEY,
      total_lessons_completed INTEGER NOT NULL DEFAULT 0,
      total_time_spent REAL NOT NULL DEFAULT 0,
      current_streak INTEGER NOT NULL DEFAULT 0,
      longest_streak INTEGER NOT NULL DEFAULT 0,
      perfect_scores INTEGER NOT NULL DEFAULT 0,
      weekly_goal_minutes INTEGER NOT NULL DEFAULT 300,
      monthly_goal_lessons INTEGER NOT NULL DEFAULT 20,
      last_activity_at TEXT,
      created_at TEXT NOT NULL,
      updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS subject_progress (
      uid TEXT NOT NULL,
      subject_id TEXT NOT NULL,
      subject_name TEXT NOT NULL,
      level INTEGER NOT NULL DEFAULT 1,
      xp INTEGER NOT NULL DEFAULT 0,
      xp_to_next_level INTEGER NOT NULL DEFAULT 100,
      lessons_completed INTEGER NOT NULL DEFAULT 0,
      total_lessons INTEGER NOT NULL DEFAULT 50,
      quizzes_passed INTEGER NOT NULL DEFAULT 0,
      average_score REAL NOT NULL DEFAULT 0,
      time_spent REAL NOT NULL DEFAULT 0,
      topics_completed TEXT NOT NULL DEFAULT '[]',
      last_activity_at TEXT NOT NULL,
      PRIMARY KEY (uid, subject_id)
    );

    CREATE TABLE IF NOT EXISTS skill_levels (
      uid TEXT NOT NULL,
      skill_id TEXT NOT NULL,
      skill_name TEXT NOT NULL,
      level TEXT NOT NULL,
      score INTEGER NOT NULL DEFAULT 0 CHECK (score BETWEEN 0 AND 100),
      unlocked_at TEXT NOT NULL,
      last_updated_at TEXT NOT NULL,
      PRIMARY KEY (uid, skill_id)
    );

    CREATE TABLE IF NOT EXISTS user_activities (
      id TEXT PRIMARY KEY,
      uid TEXT NOT NULL,
      activity_type TEXT NOT NULL,
      activity_data TEXT NOT NULL DEFAULT '{}',
      points INTEGER NOT NULL DEFAULT 0,
      xp INTEGER NOT NULL DEFAULT 0,
      minutes REAL NOT NULL DEFAULT 0,
      lessons INTEGER NOT NULL DEFAULT 0,
      timestamp TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS leaderboard (
      uid TEXT PRIMARY KEY,
      display_name TEXT NOT NULL,
      school TEXT,
      grade TEXT,
      total_points INTEGER NOT NULL DEFAULT 0,
      total_xp INTEGER NOT NULL DEFAULT 0,
      streak_days INTEGER NOT NULL DEFAULT 0,
      lessons_completed INTEGER NOT NULL DEFAULT 0,
      badges_earned INTEGER NOT NULL DEFAULT 0,
      updated_at TEXT NOT NULL
    );

    -- Indexes
    CREATE INDEX IF NOT EXISTS idx_points_transactions_uid ON points_transactions(uid, timestamp);
    CREATE INDEX IF NOT EXISTS idx_user_badges_uid ON user_badges(uid);
    CREATE INDEX IF NOT EXISTS idx_user_achievements_uid ON user_achievements(uid);
    CREATE INDEX IF NOT EXISTS idx_store_items_category ON store_items(category, points_cost);
    CREATE INDEX IF NOT EXISTS idx_redemptions_uid ON redemptions(uid, redeemed_at);
    CREATE INDEX IF NOT EXISTS idx_user_activities_uid ON user_activities(uid, timestamp);
    CREATE INDEX IF NOT EXISTS idx_leaderboard_total ON leaderboard(total_points);
    "#,
  )?;

  // ============================================================
  // MIGRATIONS FOR EXISTING DATABASES
  // These are no-ops for new databases (columns already exist)
  // ============================================================

  // Migration: streak tracking on the rewards account
  add_column_if_missing(conn, "rewards_accounts", "last_activity_date", "TEXT")?;

  // Migration: per-activity minutes/lessons used by the weekly and monthly goals
  let had_minutes = column_exists(conn, "user_activities", "minutes");
  add_column_if_missing(conn, "user_activities", "minutes", "REAL NOT NULL DEFAULT 0")?;
  add_column_if_missing(conn, "user_activities", "lessons", "INTEGER NOT NULL DEFAULT 0")?;

  // Backfill from the stored event payload only when the columns were just added
  if !had_minutes {
    conn.execute(
      r#"
      UPDATE user_activities SET
        minutes = COALESCE(json_extract(activity_data, '$.totalTimeSpent'), json_extract(activity_data, '$.timeSpent'), 0),
        lessons = CASE activity_type
          WHEN 'lesson_completed' THEN 1
          ELSE COALESCE(json_extract(activity_data, '$.lessonsCompleted'), 0)
        END
      "#,
      [],
    )?;
  }

  Ok(())
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
  conn
    .prepare(&format!("SELECT {} FROM {} LIMIT 1", column, table))
    .is_ok()
}

/// Add a column if it doesn't already exist
fn add_column_if_missing(conn: &Connection, table: &str, column: &str, column_def: &str) -> Result<()> {
  if !column_exists(conn, table, column) {
    conn.execute(
      &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_def),
      [],
    )?;
  }
  Ok(())
}
