//! Error types for ledger operations.

use thiserror::Error;

use crate::db::DbLockError;

#[derive(Error, Debug)]
pub enum LedgerError {
  #[error("{kind} not found: {id}")]
  NotFound { kind: &'static str, id: String },

  #[error("Rewards account already exists for {0}")]
  AlreadyExists(String),

  #[error("{field} {message}")]
  Validation { field: &'static str, message: String },

  #[error("Not eligible: {0}")]
  Ineligible(String),

  #[error("Cannot move redemption from {from} to {to}")]
  InvalidTransition { from: &'static str, to: &'static str },

  #[error("Database unavailable")]
  StoreUnavailable,

  #[error("Database error: {0}")]
  Store(#[from] rusqlite::Error),

  #[error("Malformed stored document: {0}")]
  Malformed(#[from] serde_json::Error),
}

impl LedgerError {
  pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
    Self::NotFound { kind, id: id.into() }
  }

  pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
    Self::Validation {
      field,
      message: message.into(),
    }
  }

  /// Stable machine-readable code used in API error bodies
  pub fn code(&self) -> &'static str {
    match self {
      Self::NotFound { .. } => "NOT_FOUND",
      Self::AlreadyExists(_) => "ALREADY_EXISTS",
      Self::Validation { .. } => "VALIDATION_ERROR",
      Self::Ineligible(_) => "NOT_ELIGIBLE",
      Self::InvalidTransition { .. } => "INVALID_TRANSITION",
      Self::StoreUnavailable | Self::Store(_) | Self::Malformed(_) => "STORE_UNAVAILABLE",
    }
  }
}

impl From<DbLockError> for LedgerError {
  fn from(_: DbLockError) -> Self {
    Self::StoreUnavailable
  }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
