//! Store redemptions and their fulfillment lifecycle

use chrono::Utc;
use rusqlite::Connection;

use crate::db;
use crate::domain::{
  DeliveryDetails, DeliveryMethod, PointsSource, RedemptionRecord, RedemptionStatus, StoreCategory, StoreItem,
};
use crate::error::{LedgerError, LedgerResult};

use super::ledger::{self, PointsMovement};

pub fn list_available_items(conn: &Connection, category: Option<StoreCategory>) -> LedgerResult<Vec<StoreItem>> {
  Ok(db::get_available_items(conn, category)?)
}

/// Spend points on a store item and open a pending redemption.
///
/// Returns `Ok(None)` when the balance does not cover the cost; nothing is
/// written in that case. Gate failures (availability, stock, level, badges)
/// are `Ineligible`.
pub fn redeem_store_item(
  conn: &Connection,
  uid: &str,
  item_id: &str,
  delivery_details: Option<DeliveryDetails>,
) -> LedgerResult<Option<String>> {
  let item = db::get_store_item(conn, item_id)?.ok_or_else(|| LedgerError::not_found("Store item", item_id))?;
  let account = ledger::get_account(conn, uid)?;

  if !item.is_available {
    return Err(LedgerError::Ineligible(format!("{} is not available", item.name)));
  }
  if item.stock_quantity == Some(0) {
    return Err(LedgerError::Ineligible(format!("{} is out of stock", item.name)));
  }
  if let Some(min_level) = item.minimum_level
    && account.current_level < min_level
  {
    return Err(LedgerError::Ineligible(format!("{} requires level {}", item.name, min_level)));
  }
  for badge_id in &item.required_badges {
    if !db::user_has_badge(conn, uid, badge_id)? {
      return Err(LedgerError::Ineligible(format!("{} requires badge {}", item.name, badge_id)));
    }
  }

  let movement = PointsMovement::new(item.points_cost, PointsSource::Redemption, format!("Redeemed: {}", item.name))
    .with_source_id(&item.id);
  if !ledger::spend_points(conn, uid, &movement)? {
    return Ok(None);
  }

  if item.stock_quantity.is_some() && db::take_stock(conn, &item.id)? == 0 {
    return Err(LedgerError::Ineligible(format!("{} is out of stock", item.name)));
  }

  let now = Utc::now();
  let record = RedemptionRecord {
    id: db::new_document_id(),
    uid: uid.to_string(),
    store_item_id: item.id.clone(),
    item_name: item.name.clone(),
    item_category: item.category,
    points_spent: item.points_cost,
    cash_value: item.cash_value,
    status: RedemptionStatus::Pending,
    delivery_method: DeliveryMethod::for_category(item.category),
    delivery_details,
    fulfillment_code: None,
    is_delivered: false,
    delivered_at: None,
    error_message: None,
    retry_count: 0,
    redeemed_at: now,
    updated_at: now,
  };
  db::insert_redemption(conn, &record)?;
  db::increment_counter(conn, uid, db::AccountCounter::Redemptions)?;

  tracing::info!(uid, item_id, redemption_id = %record.id, "Store item redeemed");
  Ok(Some(record.id))
}

/// Move a redemption along its fulfillment lifecycle
pub fn update_redemption_status(
  conn: &Connection,
  redemption_id: &str,
  next: RedemptionStatus,
  fulfillment_code: Option<String>,
  error_message: Option<String>,
) -> LedgerResult<RedemptionRecord> {
  let mut record =
    db::get_redemption(conn, redemption_id)?.ok_or_else(|| LedgerError::not_found("Redemption", redemption_id))?;

  if !record.status.can_transition_to(next) {
    return Err(LedgerError::InvalidTransition {
      from: record.status.as_str(),
      to: next.as_str(),
    });
  }

  let now = Utc::now();
  if record.status == RedemptionStatus::Failed && next == RedemptionStatus::Processing {
    record.retry_count += 1;
  }
  match next {
    RedemptionStatus::Completed => {
      record.is_delivered = true;
      record.delivered_at = Some(now);
      if fulfillment_code.is_some() {
        record.fulfillment_code = fulfillment_code;
      }
    }
    RedemptionStatus::Failed => record.error_message = error_message,
    _ => {}
  }
  record.status = next;
  record.updated_at = now;
  db::update_redemption(conn, &record)?;

  tracing::info!(redemption_id, status = next.as_str(), "Redemption status updated");
  Ok(record)
}

pub fn get_redemption(conn: &Connection, redemption_id: &str) -> LedgerResult<RedemptionRecord> {
  db::get_redemption(conn, redemption_id)?.ok_or_else(|| LedgerError::not_found("Redemption", redemption_id))
}

pub fn get_user_redemptions(conn: &Connection, uid: &str) -> LedgerResult<Vec<RedemptionRecord>> {
  Ok(db::get_user_redemptions(conn, uid)?)
}
