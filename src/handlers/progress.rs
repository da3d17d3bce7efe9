use axum::{
  Json,
  extract::rejection::QueryRejection,
  extract::{Path, Query, State},
};

use crate::config::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT, clamp_limit};
use crate::domain::{UserActivity, UserProgress};
use crate::services::progress;
use crate::state::AppState;
use crate::validation::validate_id;

use super::error::ApiResult;
use super::rewards::LimitQuery;

/// GET /progress/{uid}
pub async fn get_progress(State(state): State<AppState>, Path(uid): Path<String>) -> ApiResult<Json<UserProgress>> {
  let uid = validate_id("uid", &uid)?;
  let doc = state.read("get_progress", &uid, |conn| progress::get_progress(conn, &uid))?;
  Ok(Json(doc))
}

/// GET /progress/{uid}/activities
pub async fn get_activities(
  State(state): State<AppState>,
  Path(uid): Path<String>,
  query: Result<Query<LimitQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<UserActivity>>> {
  let uid = validate_id("uid", &uid)?;
  let Query(query) = query?;
  let limit = clamp_limit(query.limit, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT);
  let activities = state.read("get_activities", &uid, |conn| progress::get_activities(conn, &uid, limit))?;
  Ok(Json(activities))
}
