//! API error responses

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::error::LedgerError;
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum ApiError {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error(transparent)]
  Ledger(#[from] LedgerError),

  #[error("{0}")]
  BadRequest(String),
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
  pub success: bool,
  pub error: String,
  pub code: &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<Value>,
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Ledger(e) => match e {
        LedgerError::Validation { .. } => StatusCode::BAD_REQUEST,
        LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
        LedgerError::AlreadyExists(_) | LedgerError::Ineligible(_) | LedgerError::InvalidTransition { .. } => {
          StatusCode::CONFLICT
        }
        LedgerError::StoreUnavailable | LedgerError::Store(_) | LedgerError::Malformed(_) => {
          StatusCode::INTERNAL_SERVER_ERROR
        }
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let (code, message, details) = match &self {
      ApiError::Validation(e) => ("VALIDATION_ERROR", e.message.clone(), Some(json!({ "field": e.field }))),
      ApiError::BadRequest(msg) => ("VALIDATION_ERROR", msg.clone(), None),
      ApiError::Ledger(e) => {
        let details = match e {
          LedgerError::Validation { field, .. } => Some(json!({ "field": field })),
          LedgerError::NotFound { kind, id } => Some(json!({ "kind": kind, "id": id })),
          _ => None,
        };
        // Storage internals stay in the log
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
          "Internal server error".to_string()
        } else {
          e.to_string()
        };
        (e.code(), message, details)
      }
    };

    let body = ErrorResponse {
      success: false,
      error: message,
      code,
      details,
    };

    (status, Json(body)).into_response()
  }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;
