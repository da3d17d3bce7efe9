//! Completion event endpoints

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::Serialize;
use serde_json::{Value, json};

use crate::services::completion::{self, CompletionRewards};
use crate::state::AppState;
use crate::validation::{
  LessonCompletionRequest, ModuleCompletionRequest, validate_lesson_completion, validate_module_completion,
};

use super::error::ApiResult;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
  pub success: bool,
  pub message: &'static str,
  pub rewards: CompletionRewards,
  pub skill_coins: i64,
  pub xp: i64,
  pub badges: Vec<String>,
  pub level_up: bool,
  pub new_level: Option<i64>,
}

impl CompletionResponse {
  fn new(message: &'static str, rewards: CompletionRewards) -> Self {
    Self {
      success: true,
      message,
      skill_coins: rewards.points_awarded,
      xp: rewards.xp_awarded,
      badges: rewards.badges_earned.clone(),
      level_up: rewards.level_up,
      new_level: rewards.new_level,
      rewards,
    }
  }
}

/// POST /module-completion
pub async fn module_completion(
  State(state): State<AppState>,
  body: Result<Json<ModuleCompletionRequest>, JsonRejection>,
) -> ApiResult<Json<CompletionResponse>> {
  let Json(body) = body?;
  let event = validate_module_completion(&body)?;

  let rewards = state.transact("process_module_completion", &event.uid, |conn, rates| {
    completion::complete_module(conn, rates, &event)
  })?;
  state.notify(&event.uid);

  Ok(Json(CompletionResponse::new("Module completion processed successfully", rewards)))
}

/// GET /module-completion
pub async fn module_completion_info() -> Json<Value> {
  Json(json!({
    "message": "Module completion endpoint",
    "methods": ["POST"],
    "description": "Records a completed module and awards points, XP, badges and achievements",
    "requiredFields": ["uid", "moduleId", "subjectId", "lessonsCompleted", "averageScore", "totalTimeSpent"],
    "optionalFields": ["skillsGained"],
  }))
}

/// POST /lesson-completion
pub async fn lesson_completion(
  State(state): State<AppState>,
  body: Result<Json<LessonCompletionRequest>, JsonRejection>,
) -> ApiResult<Json<CompletionResponse>> {
  let Json(body) = body?;
  let event = validate_lesson_completion(&body)?;

  let rewards = state.transact("process_lesson_completion", &event.uid, |conn, rates| {
    completion::complete_lesson(conn, rates, &event)
  })?;
  state.notify(&event.uid);

  Ok(Json(CompletionResponse::new("Lesson completion processed successfully", rewards)))
}
