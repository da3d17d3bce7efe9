//! Request validation for completion events.
//!
//! Bodies are deserialized loosely (every field an optional JSON value) so a
//! missing or mistyped field produces a field-specific message instead of a
//! generic deserialization failure.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::{MAX_LESSONS_PER_EVENT, MAX_MINUTES_PER_EVENT, MAX_SKILLS_PER_EVENT};
use crate::domain::{LessonCompletion, ModuleCompletion};

/// Rejected input, reported as 400 with the offending field
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ValidationError {
  pub field: &'static str,
  pub message: String,
}

impl ValidationError {
  fn new(field: &'static str, message: impl Into<String>) -> Self {
    Self {
      field,
      message: message.into(),
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleCompletionRequest {
  pub uid: Option<Value>,
  pub module_id: Option<Value>,
  pub subject_id: Option<Value>,
  pub lessons_completed: Option<Value>,
  pub average_score: Option<Value>,
  pub total_time_spent: Option<Value>,
  pub skills_gained: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonCompletionRequest {
  pub uid: Option<Value>,
  pub lesson_id: Option<Value>,
  pub subject_id: Option<Value>,
  pub time_spent: Option<Value>,
  pub score: Option<Value>,
}

// ==================== Field helpers ====================

fn non_empty_string(value: &Option<Value>) -> Option<String> {
  match value {
    Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
    _ => None,
  }
}

fn is_present(value: &Option<Value>) -> bool {
  !matches!(value, None | Some(Value::Null))
}

fn finite_number(value: &Option<Value>) -> Option<f64> {
  value.as_ref().and_then(Value::as_f64).filter(|n| n.is_finite())
}

fn too_large(field: &'static str, max: impl std::fmt::Display) -> ValidationError {
  ValidationError::new(field, format!("{} must be at most {}", field, max))
}

fn non_negative_whole(field: &'static str, value: &Option<Value>, max: i64) -> Result<i64, ValidationError> {
  let n = finite_number(value)
    .filter(|n| *n >= 0.0 && n.fract() == 0.0)
    .ok_or_else(|| ValidationError::new(field, format!("{} must be a non-negative number", field)))?;
  if n > max as f64 {
    return Err(too_large(field, max));
  }
  Ok(n as i64)
}

fn non_negative(field: &'static str, value: &Option<Value>, max: f64) -> Result<f64, ValidationError> {
  let n = finite_number(value)
    .filter(|n| *n >= 0.0)
    .ok_or_else(|| ValidationError::new(field, format!("{} must be a non-negative number", field)))?;
  if n > max {
    return Err(too_large(field, max));
  }
  Ok(n)
}

fn percentage(field: &'static str, value: &Option<Value>) -> Result<f64, ValidationError> {
  finite_number(value)
    .filter(|n| (0.0..=100.0).contains(n))
    .ok_or_else(|| ValidationError::new(field, format!("{} must be a number between 0 and 100", field)))
}

fn string_list(field: &'static str, value: &Option<Value>) -> Result<Vec<String>, ValidationError> {
  let invalid = || ValidationError::new(field, format!("{} must be an array of strings", field));
  match value {
    None | Some(Value::Null) => Ok(Vec::new()),
    Some(Value::Array(items)) => items
      .iter()
      .map(|item| match item {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(invalid()),
      })
      .collect(),
    Some(_) => Err(invalid()),
  }
}

// ==================== Events ====================

pub fn validate_module_completion(req: &ModuleCompletionRequest) -> Result<ModuleCompletion, ValidationError> {
  let uid = non_empty_string(&req.uid);
  let module_id = non_empty_string(&req.module_id);
  let subject_id = non_empty_string(&req.subject_id);

  let (Some(uid), Some(module_id), Some(subject_id)) = (uid, module_id, subject_id) else {
    return Err(missing_module_fields());
  };
  if !is_present(&req.lessons_completed) || !is_present(&req.average_score) || !is_present(&req.total_time_spent) {
    return Err(missing_module_fields());
  }

  Ok(ModuleCompletion {
    uid,
    module_id,
    subject_id,
    lessons_completed: non_negative_whole("lessonsCompleted", &req.lessons_completed, MAX_LESSONS_PER_EVENT)?,
    average_score: percentage("averageScore", &req.average_score)?,
    total_time_spent: non_negative("totalTimeSpent", &req.total_time_spent, MAX_MINUTES_PER_EVENT)?,
    skills_gained: skills_gained(&req.skills_gained)?,
  })
}

fn skills_gained(value: &Option<Value>) -> Result<Vec<String>, ValidationError> {
  let skills = string_list("skillsGained", value)?;
  if skills.len() > MAX_SKILLS_PER_EVENT {
    return Err(too_large("skillsGained", format!("{} entries", MAX_SKILLS_PER_EVENT)));
  }
  Ok(skills)
}

fn missing_module_fields() -> ValidationError {
  ValidationError::new(
    "body",
    "Missing required fields: uid, moduleId, subjectId, lessonsCompleted, averageScore, totalTimeSpent",
  )
}

pub fn validate_lesson_completion(req: &LessonCompletionRequest) -> Result<LessonCompletion, ValidationError> {
  let (Some(uid), Some(lesson_id), Some(subject_id)) = (
    non_empty_string(&req.uid),
    non_empty_string(&req.lesson_id),
    non_empty_string(&req.subject_id),
  ) else {
    return Err(ValidationError::new("body", "Missing required fields: uid, lessonId, subjectId"));
  };

  let time_spent = if is_present(&req.time_spent) {
    non_negative("timeSpent", &req.time_spent, MAX_MINUTES_PER_EVENT)?
  } else {
    0.0
  };
  let score = if is_present(&req.score) {
    Some(percentage("score", &req.score)?)
  } else {
    None
  };

  Ok(LessonCompletion {
    uid,
    lesson_id,
    subject_id,
    time_spent,
    score,
  })
}

/// Path and body identifiers: non-empty, no surrounding whitespace
pub fn validate_id(field: &'static str, value: &str) -> Result<String, ValidationError> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(ValidationError::new(field, format!("{} is required", field)));
  }
  Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn module_request(body: Value) -> ModuleCompletionRequest {
    serde_json::from_value(body).unwrap()
  }

  fn valid_body() -> Value {
    json!({
      "uid": "u1",
      "moduleId": "m1",
      "subjectId": "math",
      "lessonsCompleted": 5,
      "averageScore": 85,
      "totalTimeSpent": 120,
      "skillsGained": ["algebra"]
    })
  }

  #[test]
  fn test_valid_module_completion() {
    let completion = validate_module_completion(&module_request(valid_body())).unwrap();
    assert_eq!(completion.lessons_completed, 5);
    assert_eq!(completion.average_score, 85.0);
    assert_eq!(completion.skills_gained, vec!["algebra".to_string()]);
  }

  #[test]
  fn test_missing_field_lists_required_fields() {
    let mut body = valid_body();
    body.as_object_mut().unwrap().remove("subjectId");
    let err = validate_module_completion(&module_request(body)).unwrap_err();
    assert!(err.message.starts_with("Missing required fields"));

    let mut body = valid_body();
    body["averageScore"] = Value::Null;
    assert!(validate_module_completion(&module_request(body)).is_err());
  }

  #[test]
  fn test_out_of_range_score() {
    let mut body = valid_body();
    body["averageScore"] = json!(100.5);
    let err = validate_module_completion(&module_request(body)).unwrap_err();
    assert_eq!(err.field, "averageScore");
    assert_eq!(err.message, "averageScore must be a number between 0 and 100");
  }

  #[test]
  fn test_lessons_must_be_whole_and_non_negative() {
    for bad in [json!(-1), json!(2.5), json!("3")] {
      let mut body = valid_body();
      body["lessonsCompleted"] = bad;
      let err = validate_module_completion(&module_request(body)).unwrap_err();
      assert_eq!(err.field, "lessonsCompleted");
    }
  }

  #[test]
  fn test_zero_values_are_accepted() {
    let mut body = valid_body();
    body["lessonsCompleted"] = json!(0);
    body["averageScore"] = json!(0);
    body["totalTimeSpent"] = json!(0);
    body.as_object_mut().unwrap().remove("skillsGained");
    let completion = validate_module_completion(&module_request(body)).unwrap();
    assert_eq!(completion.lessons_completed, 0);
    assert!(completion.skills_gained.is_empty());
  }

  #[test]
  fn test_skills_must_be_strings() {
    let mut body = valid_body();
    body["skillsGained"] = json!(["algebra", 3]);
    let err = validate_module_completion(&module_request(body)).unwrap_err();
    assert_eq!(err.field, "skillsGained");
  }

  #[test]
  fn test_oversized_values_are_rejected() {
    let mut body = valid_body();
    body["totalTimeSpent"] = json!(1e300);
    let err = validate_module_completion(&module_request(body)).unwrap_err();
    assert_eq!(err.field, "totalTimeSpent");
    assert_eq!(err.message, "totalTimeSpent must be at most 100000");

    let mut body = valid_body();
    body["lessonsCompleted"] = json!(9_007_199_254_740_992_i64);
    let err = validate_module_completion(&module_request(body)).unwrap_err();
    assert_eq!(err.field, "lessonsCompleted");

    let mut body = valid_body();
    let many: Vec<String> = (0..=MAX_SKILLS_PER_EVENT).map(|i| format!("skill-{}", i)).collect();
    body["skillsGained"] = json!(many);
    assert_eq!(validate_module_completion(&module_request(body)).unwrap_err().field, "skillsGained");

    let mut body = valid_body();
    body["lessonsCompleted"] = json!(MAX_LESSONS_PER_EVENT);
    body["totalTimeSpent"] = json!(MAX_MINUTES_PER_EVENT);
    assert!(validate_module_completion(&module_request(body)).is_ok());
  }

  #[test]
  fn test_lesson_completion_defaults() {
    let req: LessonCompletionRequest =
      serde_json::from_value(json!({ "uid": "u1", "lessonId": "l1", "subjectId": "math" })).unwrap();
    let lesson = validate_lesson_completion(&req).unwrap();
    assert_eq!(lesson.time_spent, 0.0);
    assert_eq!(lesson.score, None);

    let req: LessonCompletionRequest =
      serde_json::from_value(json!({ "uid": "u1", "lessonId": "l1", "subjectId": "math", "score": 120 })).unwrap();
    assert_eq!(validate_lesson_completion(&req).unwrap_err().field, "score");
  }
}
