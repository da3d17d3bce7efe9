use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::config::{DEFAULT_LEADERBOARD_LIMIT, MAX_LEADERBOARD_LIMIT, clamp_limit};
use crate::domain::{LeaderboardEntry, LeaderboardPeriod, LeaderboardProfile};
use crate::services::leaderboard;
use crate::state::AppState;
use crate::validation::validate_id;

use super::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
  pub period: Option<String>,
  pub limit: Option<i64>,
}

/// GET /leaderboard
pub async fn get_leaderboard(
  State(state): State<AppState>,
  query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
  let Query(query) = query?;
  let period = match query.period.as_deref() {
    None | Some("") => LeaderboardPeriod::default(),
    Some(raw) => LeaderboardPeriod::from_str(raw)
      .ok_or_else(|| ApiError::BadRequest("period must be one of weekly, monthly, all_time".to_string()))?,
  };
  let limit = clamp_limit(query.limit, DEFAULT_LEADERBOARD_LIMIT, MAX_LEADERBOARD_LIMIT);

  let entries = state.read_shared("get_leaderboard", |conn| leaderboard::get_leaderboard(conn, period, limit))?;
  Ok(Json(entries))
}

/// PUT /leaderboard/{uid}
pub async fn set_profile(
  State(state): State<AppState>,
  Path(uid): Path<String>,
  body: Result<Json<LeaderboardProfile>, JsonRejection>,
) -> ApiResult<Json<LeaderboardEntry>> {
  let uid = validate_id("uid", &uid)?;
  let Json(profile) = body?;

  let entry = state.transact("set_leaderboard_profile", &uid, |conn, _| {
    leaderboard::set_profile(conn, &uid, &profile)
  })?;
  Ok(Json(entry))
}
