//! Ledger services.
//!
//! Every function here takes the connection of an open transaction; the
//! caller (see [`crate::state::AppState::transact`]) owns commit and rollback.

pub mod badges;
pub mod completion;
pub mod feed;
pub mod leaderboard;
pub mod ledger;
pub mod progress;
pub mod store;
