//! Store catalog and redemption records

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use crate::domain::{
  DeliveryMethod, ItemType, RedemptionRecord, RedemptionStatus, StoreCategory, StoreItem,
};

use super::{get_enum, get_json, get_opt_json, get_opt_timestamp, get_timestamp, to_json};

// ==================== Store items ====================

const ITEM_COLUMNS: &str = r#"
  id, name, description, category, points_cost, cash_value, is_available, stock_quantity,
  is_limited, minimum_level, required_badges, image_url, item_type, item_data, provider
"#;

fn row_to_item(row: &Row) -> Result<StoreItem> {
  Ok(StoreItem {
    id: row.get(0)?,
    name: row.get(1)?,
    description: row.get(2)?,
    category: get_enum(row, 3, StoreCategory::from_str)?,
    points_cost: row.get(4)?,
    cash_value: row.get(5)?,
    is_available: row.get(6)?,
    stock_quantity: row.get(7)?,
    is_limited: row.get(8)?,
    minimum_level: row.get(9)?,
    required_badges: get_json(row, 10)?,
    image_url: row.get(11)?,
    item_type: get_enum(row, 12, ItemType::from_str)?,
    item_data: get_json(row, 13)?,
    provider: row.get(14)?,
  })
}

/// Insert unless an item with the same id exists. Returns true if inserted.
pub fn insert_store_item(conn: &Connection, item: &StoreItem) -> Result<bool> {
  let inserted = conn.execute(
    r#"
    INSERT OR IGNORE INTO store_items (id, name, description, category, points_cost, cash_value,
                                       is_available, stock_quantity, is_limited, minimum_level,
                                       required_badges, image_url, item_type, item_data, provider,
                                       created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
    "#,
    params![
      item.id,
      item.name,
      item.description,
      item.category.as_str(),
      item.points_cost,
      item.cash_value,
      item.is_available,
      item.stock_quantity,
      item.is_limited,
      item.minimum_level,
      to_json(&item.required_badges)?,
      item.image_url,
      item.item_type.as_str(),
      to_json(&item.item_data)?,
      item.provider,
      Utc::now().to_rfc3339(),
    ],
  )?;
  Ok(inserted > 0)
}

pub fn get_store_item(conn: &Connection, id: &str) -> Result<Option<StoreItem>> {
  conn
    .query_row(
      &format!("SELECT {} FROM store_items WHERE id = ?1", ITEM_COLUMNS),
      params![id],
      row_to_item,
    )
    .optional()
}

/// Available items, cheapest first, optionally restricted to one category
pub fn get_available_items(conn: &Connection, category: Option<StoreCategory>) -> Result<Vec<StoreItem>> {
  let mut stmt = conn.prepare(&format!(
    r#"
    SELECT {} FROM store_items
    WHERE is_available = 1 AND (?1 IS NULL OR category = ?1)
    ORDER BY points_cost ASC, name ASC
    "#,
    ITEM_COLUMNS
  ))?;
  let items = stmt
    .query_map(params![category.map(|c| c.as_str())], row_to_item)?
    .collect::<Result<Vec<_>>>()?;
  Ok(items)
}

/// Take one unit from limited stock. Returns 0 rows when none is left;
/// unlimited items (NULL stock) always succeed.
pub fn take_stock(conn: &Connection, item_id: &str) -> Result<usize> {
  conn.execute(
    r#"
    UPDATE store_items SET stock_quantity = stock_quantity - 1
    WHERE id = ?1 AND (stock_quantity IS NULL OR stock_quantity > 0)
    "#,
    params![item_id],
  )
}

#[cfg(test)]
pub fn set_item_availability(conn: &Connection, item_id: &str, available: bool) -> Result<usize> {
  conn.execute(
    "UPDATE store_items SET is_available = ?2 WHERE id = ?1",
    params![item_id, available],
  )
}

// ==================== Redemptions ====================

const REDEMPTION_COLUMNS: &str = r#"
  id, uid, store_item_id, item_name, item_category, points_spent, cash_value, status,
  delivery_method, delivery_details, fulfillment_code, is_delivered, delivered_at,
  error_message, retry_count, redeemed_at, updated_at
"#;

fn row_to_redemption(row: &Row) -> Result<RedemptionRecord> {
  Ok(RedemptionRecord {
    id: row.get(0)?,
    uid: row.get(1)?,
    store_item_id: row.get(2)?,
    item_name: row.get(3)?,
    item_category: get_enum(row, 4, StoreCategory::from_str)?,
    points_spent: row.get(5)?,
    cash_value: row.get(6)?,
    status: get_enum(row, 7, RedemptionStatus::from_str)?,
    delivery_method: get_enum(row, 8, DeliveryMethod::from_str)?,
    delivery_details: get_opt_json(row, 9)?,
    fulfillment_code: row.get(10)?,
    is_delivered: row.get(11)?,
    delivered_at: get_opt_timestamp(row, 12)?,
    error_message: row.get(13)?,
    retry_count: row.get(14)?,
    redeemed_at: get_timestamp(row, 15)?,
    updated_at: get_timestamp(row, 16)?,
  })
}

pub fn insert_redemption(conn: &Connection, r: &RedemptionRecord) -> Result<()> {
  let details = r.delivery_details.as_ref().map(to_json).transpose()?;
  conn.execute(
    r#"
    INSERT INTO redemptions (id, uid, store_item_id, item_name, item_category, points_spent,
                             cash_value, status, delivery_method, delivery_details,
                             fulfillment_code, is_delivered, delivered_at, error_message,
                             retry_count, redeemed_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
    "#,
    params![
      r.id,
      r.uid,
      r.store_item_id,
      r.item_name,
      r.item_category.as_str(),
      r.points_spent,
      r.cash_value,
      r.status.as_str(),
      r.delivery_method.as_str(),
      details,
      r.fulfillment_code,
      r.is_delivered,
      r.delivered_at.map(|t| t.to_rfc3339()),
      r.error_message,
      r.retry_count,
      r.redeemed_at.to_rfc3339(),
      r.updated_at.to_rfc3339(),
    ],
  )?;
  Ok(())
}

pub fn get_redemption(conn: &Connection, id: &str) -> Result<Option<RedemptionRecord>> {
  conn
    .query_row(
      &format!("SELECT {} FROM redemptions WHERE id = ?1", REDEMPTION_COLUMNS),
      params![id],
      row_to_redemption,
    )
    .optional()
}

/// Persist the mutable lifecycle fields of a redemption
pub fn update_redemption(conn: &Connection, r: &RedemptionRecord) -> Result<usize> {
  conn.execute(
    r#"
    UPDATE redemptions SET
      status = ?2, fulfillment_code = ?3, is_delivered = ?4, delivered_at = ?5,
      error_message = ?6, retry_count = ?7, updated_at = ?8
    WHERE id = ?1
    "#,
    params![
      r.id,
      r.status.as_str(),
      r.fulfillment_code,
      r.is_delivered,
      r.delivered_at.map(|t| t.to_rfc3339()),
      r.error_message,
      r.retry_count,
      r.updated_at.to_rfc3339(),
    ],
  )
}

/// Newest first
pub fn get_user_redemptions(conn: &Connection, uid: &str) -> Result<Vec<RedemptionRecord>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM redemptions WHERE uid = ?1 ORDER BY redeemed_at DESC, rowid DESC",
    REDEMPTION_COLUMNS
  ))?;
  let records = stmt
    .query_map(params![uid], row_to_redemption)?
    .collect::<Result<Vec<_>>>()?;
  Ok(records)
}

pub fn count_redemptions(conn: &Connection, uid: &str) -> Result<i64> {
  conn.query_row(
    "SELECT COUNT(*) FROM redemptions WHERE uid = ?1",
    params![uid],
    |row| row.get(0),
  )
}
