//! Live per-user feed of account and progress snapshots.
//!
//! Each uid with at least one listener owns a broadcast channel. Dropping the
//! last [`Subscription`] removes the channel.

use serde::Serialize;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::broadcast;
use tokio_stream::Stream;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::domain::{RewardsAccount, UserProgress};

const CHANNEL_CAPACITY: usize = 32;

/// Full document snapshot pushed after a committed write
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum FeedEvent {
  Rewards(RewardsAccount),
  Progress(UserProgress),
}

impl FeedEvent {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Rewards(_) => "rewards",
      Self::Progress(_) => "progress",
    }
  }
}

#[derive(Default)]
pub struct RewardsFeed {
  channels: Mutex<HashMap<String, broadcast::Sender<FeedEvent>>>,
}

impl RewardsFeed {
  pub fn new() -> Self {
    Self::default()
  }

  fn channels(&self) -> MutexGuard<'_, HashMap<String, broadcast::Sender<FeedEvent>>> {
    self.channels.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Start listening to `uid`. The listener is released when the returned stream is dropped.
  pub fn subscribe(self: &Arc<Self>, uid: &str) -> Subscription {
    let receiver = self
      .channels()
      .entry(uid.to_string())
      .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
      .subscribe();
    tracing::debug!(uid, "Feed listener attached");

    Subscription {
      uid: uid.to_string(),
      feed: Arc::clone(self),
      inner: BroadcastStream::new(receiver),
    }
  }

  pub fn has_listeners(&self, uid: &str) -> bool {
    self
      .channels()
      .get(uid)
      .is_some_and(|tx| tx.receiver_count() > 0)
  }

  /// Push an event to every listener of `uid`. Returns how many received it.
  pub fn publish(&self, uid: &str, event: FeedEvent) -> usize {
    match self.channels().get(uid) {
      Some(tx) => tx.send(event).unwrap_or(0),
      None => 0,
    }
  }

  #[cfg(test)]
  pub fn channel_count(&self) -> usize {
    self.channels().len()
  }

  fn release(&self, uid: &str) {
    let mut channels = self.channels();
    // The departing receiver is still alive here
    if channels.get(uid).is_some_and(|tx| tx.receiver_count() <= 1) {
      channels.remove(uid);
    }
    tracing::debug!(uid, "Feed listener released");
  }
}

/// A stream of feed events for one uid
pub struct Subscription {
  uid: String,
  feed: Arc<RewardsFeed>,
  inner: BroadcastStream<FeedEvent>,
}

impl Stream for Subscription {
  type Item = FeedEvent;

  fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    loop {
      match Pin::new(&mut self.inner).poll_next(cx) {
        Poll::Ready(Some(Ok(event))) => return Poll::Ready(Some(event)),
        Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
          tracing::warn!(uid = %self.uid, skipped, "Feed listener lagged, skipping snapshots");
        }
        Poll::Ready(None) => return Poll::Ready(None),
        Poll::Pending => return Poll::Pending,
      }
    }
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.feed.release(&self.uid);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio_stream::StreamExt;

  #[tokio::test]
  async fn test_publish_reaches_subscriber() {
    let feed = Arc::new(RewardsFeed::new());
    let mut sub = feed.subscribe("u1");
    assert!(feed.has_listeners("u1"));

    let mut account = RewardsAccount::new("u1");
    account.available_points = 42;
    assert_eq!(feed.publish("u1", FeedEvent::Rewards(account)), 1);

    match sub.next().await {
      Some(FeedEvent::Rewards(a)) => assert_eq!(a.available_points, 42),
      other => panic!("unexpected event: {:?}", other),
    }
  }

  #[test]
  fn test_publish_without_listeners_is_dropped() {
    let feed = RewardsFeed::new();
    assert!(!feed.has_listeners("u1"));
    assert_eq!(feed.publish("u1", FeedEvent::Rewards(RewardsAccount::new("u1"))), 0);
  }

  #[test]
  fn test_last_drop_removes_channel() {
    let feed = Arc::new(RewardsFeed::new());
    let first = feed.subscribe("u1");
    let second = feed.subscribe("u1");
    assert_eq!(feed.channel_count(), 1);

    drop(first);
    assert!(feed.has_listeners("u1"));
    drop(second);
    assert!(!feed.has_listeners("u1"));
    assert_eq!(feed.channel_count(), 0);
  }

  #[test]
  fn test_event_serializes_tagged() {
    let json = serde_json::to_value(FeedEvent::Rewards(RewardsAccount::new("u1"))).unwrap();
    assert_eq!(json["type"], "rewards");
    assert_eq!(json["data"]["uid"], "u1");
  }
}
