pub mod completion;
pub mod error;
pub mod events;
pub mod leaderboard;
pub mod progress;
pub mod rewards;
pub mod store;

use axum::{
  Json, Router,
  routing::{get, post, put},
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router
pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/health", get(health))
    .route(
      "/module-completion",
      get(completion::module_completion_info).post(completion::module_completion),
    )
    .route("/lesson-completion", post(completion::lesson_completion))
    // Rewards accounts
    .route("/rewards/{uid}", get(rewards::get_account).post(rewards::initialize_account))
    .route("/rewards/{uid}/balance", get(rewards::get_balance))
    .route("/rewards/{uid}/transactions", get(rewards::get_transactions))
    .route("/rewards/{uid}/points", post(rewards::award_points))
    .route("/rewards/{uid}/spend", post(rewards::spend_points))
    .route("/rewards/{uid}/xp", post(rewards::award_xp))
    .route("/rewards/{uid}/events", get(events::rewards_events))
    .route("/rewards/{uid}/badges", get(rewards::get_user_badges))
    .route("/rewards/{uid}/badges/{badge_id}", post(rewards::award_badge))
    .route("/rewards/{uid}/achievements", get(rewards::get_user_achievements))
    .route("/rewards/{uid}/redemptions", get(rewards::get_user_redemptions))
    // Catalog and store
    .route("/badges", get(store::list_badges))
    .route("/achievements", get(store::list_achievements))
    .route("/store", get(store::list_items))
    .route("/store/{item_id}/redeem", post(store::redeem))
    .route("/redemptions/{id}/status", post(store::update_status))
    // Leaderboard and progress
    .route("/leaderboard", get(leaderboard::get_leaderboard))
    .route("/leaderboard/{uid}", put(leaderboard::set_profile))
    .route("/progress/{uid}", get(progress::get_progress))
    .route("/progress/{uid}/activities", get(progress::get_activities))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn health() -> Json<Value> {
  Json(json!({ "status": "ok" }))
}
