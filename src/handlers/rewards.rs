//! Per-user rewards account endpoints

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  extract::{Path, Query, State},
  http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT, clamp_limit};
use crate::domain::{PointsSource, PointsTransaction, RedemptionRecord, RewardsAccount, UserAchievement, UserBadge};
use crate::services::ledger::{self, PointsMovement};
use crate::services::{badges, leaderboard, store};
use crate::state::AppState;
use crate::validation::validate_id;

use super::error::ApiResult;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
  pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsRequest {
  pub amount: i64,
  pub source: Option<PointsSource>,
  pub description: Option<String>,
  pub source_id: Option<String>,
  pub metadata: Option<Value>,
}

impl PointsRequest {
  fn into_movement(self, default_source: PointsSource) -> PointsMovement {
    let source = self.source.unwrap_or(default_source);
    let mut movement = PointsMovement::new(
      self.amount,
      source,
      self.description.unwrap_or_else(|| source.as_str().to_string()),
    );
    movement.source_id = self.source_id;
    movement.metadata = self.metadata;
    movement
  }
}

#[derive(Debug, Deserialize)]
pub struct XpRequest {
  pub xp: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XpResponse {
  pub leveled_up: bool,
  pub levels_gained: i64,
  pub level: i64,
  pub current_xp: i64,
  pub xp_to_next_level: i64,
  pub total_xp: i64,
}

/// POST /rewards/{uid}
pub async fn initialize_account(
  State(state): State<AppState>,
  Path(uid): Path<String>,
) -> ApiResult<(StatusCode, Json<RewardsAccount>)> {
  let uid = validate_id("uid", &uid)?;
  let account = state.transact("initialize_account", &uid, |conn, _| ledger::initialize_account(conn, &uid))?;
  state.notify(&uid);
  Ok((StatusCode::CREATED, Json(account)))
}

/// GET /rewards/{uid}
pub async fn get_account(State(state): State<AppState>, Path(uid): Path<String>) -> ApiResult<Json<RewardsAccount>> {
  let uid = validate_id("uid", &uid)?;
  let account = state.read("get_user_rewards", &uid, |conn| ledger::get_account(conn, &uid))?;
  Ok(Json(account))
}

/// GET /rewards/{uid}/balance
pub async fn get_balance(State(state): State<AppState>, Path(uid): Path<String>) -> ApiResult<Json<Value>> {
  let uid = validate_id("uid", &uid)?;
  let balance = state.read("get_points_balance", &uid, |conn| ledger::get_balance(conn, &uid))?;
  Ok(Json(json!({ "uid": uid, "availablePoints": balance })))
}

/// GET /rewards/{uid}/transactions
pub async fn get_transactions(
  State(state): State<AppState>,
  Path(uid): Path<String>,
  query: Result<Query<LimitQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<PointsTransaction>>> {
  let uid = validate_id("uid", &uid)?;
  let Query(query) = query?;
  let limit = clamp_limit(query.limit, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT);
  let txs = state.read("get_transactions", &uid, |conn| ledger::get_transactions(conn, &uid, limit))?;
  Ok(Json(txs))
}

/// POST /rewards/{uid}/points
pub async fn award_points(
  State(state): State<AppState>,
  Path(uid): Path<String>,
  body: Result<Json<PointsRequest>, JsonRejection>,
) -> ApiResult<Json<PointsTransaction>> {
  let uid = validate_id("uid", &uid)?;
  let Json(body) = body?;
  let movement = body.into_movement(PointsSource::AdminAdjustment);

  let tx = state.transact("award_points", &uid, |conn, _| {
    let tx = ledger::award_points(conn, &uid, &movement)?;
    leaderboard::refresh_if_ranked(conn, &uid)?;
    Ok(tx)
  })?;
  state.notify(&uid);
  Ok(Json(tx))
}

/// POST /rewards/{uid}/spend
pub async fn spend_points(
  State(state): State<AppState>,
  Path(uid): Path<String>,
  body: Result<Json<PointsRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
  let uid = validate_id("uid", &uid)?;
  let Json(body) = body?;
  let movement = body.into_movement(PointsSource::Purchase);

  let spent = state.transact("spend_points", &uid, |conn, _| {
    let spent = ledger::spend_points(conn, &uid, &movement)?;
    if spent {
      leaderboard::refresh_if_ranked(conn, &uid)?;
    }
    Ok(spent)
  })?;
  if spent {
    state.notify(&uid);
  }
  Ok(Json(json!({ "success": spent })))
}

/// POST /rewards/{uid}/xp
pub async fn award_xp(
  State(state): State<AppState>,
  Path(uid): Path<String>,
  body: Result<Json<XpRequest>, JsonRejection>,
) -> ApiResult<Json<XpResponse>> {
  let uid = validate_id("uid", &uid)?;
  let Json(body) = body?;

  let award = state.transact("award_xp", &uid, |conn, rates| {
    let award = ledger::award_xp(conn, rates, &uid, body.xp)?;
    leaderboard::refresh_if_ranked(conn, &uid)?;
    Ok(award)
  })?;
  state.notify(&uid);

  let s = award.state;
  Ok(Json(XpResponse {
    leveled_up: award.leveled_up,
    levels_gained: award.levels_gained,
    level: s.level,
    current_xp: s.current_xp,
    xp_to_next_level: s.xp_to_next_level,
    total_xp: s.total_xp,
  }))
}

/// GET /rewards/{uid}/badges
pub async fn get_user_badges(State(state): State<AppState>, Path(uid): Path<String>) -> ApiResult<Json<Vec<UserBadge>>> {
  let uid = validate_id("uid", &uid)?;
  let list = state.read("get_user_badges", &uid, |conn| badges::get_user_badges(conn, &uid))?;
  Ok(Json(list))
}

/// POST /rewards/{uid}/badges/{badge_id}
pub async fn award_badge(
  State(state): State<AppState>,
  Path((uid, badge_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
  let uid = validate_id("uid", &uid)?;
  let badge_id = validate_id("badgeId", &badge_id)?;

  let awarded = state.transact("award_badge", &uid, |conn, rates| {
    let awarded = badges::award_badge(conn, rates, &uid, &badge_id)?;
    if awarded {
      leaderboard::refresh_if_ranked(conn, &uid)?;
    }
    Ok(awarded)
  })?;
  if awarded {
    state.notify(&uid);
  }
  Ok(Json(json!({ "success": true, "awarded": awarded })))
}

/// GET /rewards/{uid}/achievements
pub async fn get_user_achievements(
  State(state): State<AppState>,
  Path(uid): Path<String>,
) -> ApiResult<Json<Vec<UserAchievement>>> {
  let uid = validate_id("uid", &uid)?;
  let list = state.read("get_user_achievements", &uid, |conn| badges::get_user_achievements(conn, &uid))?;
  Ok(Json(list))
}

/// GET /rewards/{uid}/redemptions
pub async fn get_user_redemptions(
  State(state): State<AppState>,
  Path(uid): Path<String>,
) -> ApiResult<Json<Vec<RedemptionRecord>>> {
  let uid = validate_id("uid", &uid)?;
  let list = state.read("get_user_redemptions", &uid, |conn| store::get_user_redemptions(conn, &uid))?;
  Ok(Json(list))
}
