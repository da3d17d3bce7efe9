//! Server-sent events for live account and progress updates

use axum::{
  extract::{Path, State},
  response::sse::{Event, KeepAlive, Sse},
};
use tokio_stream::{Stream, StreamExt};

use crate::services::feed::FeedEvent;
use crate::services::{ledger, progress};
use crate::state::AppState;
use crate::validation::validate_id;

use super::error::ApiResult;

fn to_sse(event: FeedEvent) -> Result<Event, axum::Error> {
  Event::default().event(event.name()).json_data(&event)
}

/// GET /rewards/{uid}/events
///
/// Sends the current snapshots first, then every committed change.
pub async fn rewards_events(
  State(state): State<AppState>,
  Path(uid): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
  let uid = validate_id("uid", &uid)?;

  // Attach before reading so no change between snapshot and stream is lost
  let subscription = state.feed.subscribe(&uid);
  let (account, progress_doc) = state.read("subscribe_rewards", &uid, |conn| {
    Ok((ledger::get_account(conn, &uid)?, progress::get_progress(conn, &uid).ok()))
  })?;

  let mut initial = vec![FeedEvent::Rewards(account)];
  initial.extend(progress_doc.map(FeedEvent::Progress));

  let stream = tokio_stream::iter(initial).chain(subscription).map(to_sse);
  Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
