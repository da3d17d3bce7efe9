//! Catalog listings, redemptions and fulfillment updates

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use crate::domain::{Achievement, Badge, DeliveryDetails, RedemptionRecord, RedemptionStatus, StoreCategory, StoreItem};
use crate::services::{badges, leaderboard, store};
use crate::state::AppState;
use crate::validation::validate_id;

use super::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct StoreQuery {
  pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
  pub uid: String,
  pub delivery_details: Option<DeliveryDetails>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemResponse {
  pub success: bool,
  pub redemption_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
  pub status: RedemptionStatus,
  pub fulfillment_code: Option<String>,
  pub error_message: Option<String>,
}

/// GET /badges
pub async fn list_badges(State(state): State<AppState>) -> ApiResult<Json<Vec<Badge>>> {
  Ok(Json(state.read_shared("list_badges", badges::list_active_badges)?))
}

/// GET /achievements
pub async fn list_achievements(State(state): State<AppState>) -> ApiResult<Json<Vec<Achievement>>> {
  Ok(Json(state.read_shared("list_achievements", badges::list_visible_achievements)?))
}

/// GET /store
pub async fn list_items(
  State(state): State<AppState>,
  query: Result<Query<StoreQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<StoreItem>>> {
  let Query(query) = query?;
  let category = match query.category.as_deref() {
    None | Some("") => None,
    Some(raw) => Some(
      StoreCategory::from_str(raw).ok_or_else(|| ApiError::BadRequest(format!("Unknown store category: {}", raw)))?,
    ),
  };
  let items = state.read_shared("list_store_items", |conn| store::list_available_items(conn, category))?;
  Ok(Json(items))
}

/// POST /store/{item_id}/redeem
pub async fn redeem(
  State(state): State<AppState>,
  Path(item_id): Path<String>,
  body: Result<Json<RedeemRequest>, JsonRejection>,
) -> ApiResult<Json<RedeemResponse>> {
  let item_id = validate_id("itemId", &item_id)?;
  let Json(body) = body?;
  let uid = validate_id("uid", &body.uid)?;

  let redemption_id = state.transact("redeem_store_item", &uid, |conn, _| {
    let id = store::redeem_store_item(conn, &uid, &item_id, body.delivery_details)?;
    if id.is_some() {
      leaderboard::refresh_if_ranked(conn, &uid)?;
    }
    Ok(id)
  })?;

  match redemption_id {
    Some(id) => {
      state.notify(&uid);
      Ok(Json(RedeemResponse {
        success: true,
        redemption_id: Some(id),
        message: None,
      }))
    }
    None => Ok(Json(RedeemResponse {
      success: false,
      redemption_id: None,
      message: Some("Insufficient points"),
    })),
  }
}

/// POST /redemptions/{id}/status
pub async fn update_status(
  State(state): State<AppState>,
  Path(redemption_id): Path<String>,
  body: Result<Json<StatusRequest>, JsonRejection>,
) -> ApiResult<Json<RedemptionRecord>> {
  let redemption_id = validate_id("redemptionId", &redemption_id)?;
  let Json(body) = body?;

  let record = state.transact("update_redemption_status", &redemption_id, |conn, _| {
    store::update_redemption_status(conn, &redemption_id, body.status, body.fulfillment_code, body.error_message)
  })?;
  state.notify(&record.uid);
  Ok(Json(record))
}
