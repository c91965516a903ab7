//! # AppError
//!
//! Centralized error handling for the fleet service.
//! Every variant except `Internal` is an expected, caller-recoverable outcome.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::models::DroneState;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Position of the cargo item the error belongs to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { index: None, field, message: message.into() }
    }

    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "[{}].{}: {}", i, self.field, self.message),
            None => write!(f, "{}: {}", self.field, self.message),
        }
    }
}

/// Renders a list of field errors as `a: x; b: y`.
pub struct FieldErrors<'a>(pub &'a [FieldError]);

impl fmt::Display for FieldErrors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}

/// The primary error type for all md-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Drone)
    #[error("{0} not found with ID {1}")]
    NotFound(&'static str, i64),

    /// Field-level validation failure on plain input
    #[error("validation error: {}", FieldErrors(.0))]
    ValidationError(Vec<FieldError>),

    #[error("drone must be in LOADING state to load medications (current state: {0})")]
    InvalidState(DroneState),

    #[error("battery level {level}% is too low, minimum {minimum}% battery required for loading")]
    LowBattery { level: i32, minimum: i32 },

    #[error("invalid weight value '{0}': weight must be a non-negative integer")]
    InvalidWeight(String),

    /// Name or code format violations, all items reported together
    #[error("invalid format: {}", FieldErrors(.0))]
    InvalidFormat(Vec<FieldError>),

    /// Resource already exists (duplicate serial number or medication code)
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("total weight {total}g would exceed the drone weight limit of {limit}g")]
    WeightExceeded { total: i64, limit: i64 },

    /// Infrastructure failure (e.g., database unreachable)
    #[error("internal service error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable, machine-readable identifier for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(..) => "NOT_FOUND",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::LowBattery { .. } => "LOW_BATTERY",
            AppError::InvalidWeight(_) => "INVALID_WEIGHT",
            AppError::InvalidFormat(_) => "INVALID_FORMAT",
            AppError::Conflict(_) => "CONFLICT",
            AppError::WeightExceeded { .. } => "WEIGHT_EXCEEDED",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    /// Field errors carried by the error, empty for kinds without any.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            AppError::ValidationError(errors) | AppError::InvalidFormat(errors) => errors,
            _ => &[],
        }
    }
}

/// A specialized Result type for fleet logic.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_battery_message_names_threshold() {
        let msg = AppError::LowBattery { level: 20, minimum: 25 }.to_string();
        assert!(msg.contains("25"));
        assert!(msg.contains("battery"));
    }

    #[test]
    fn weight_exceeded_message_reports_total_and_limit() {
        let msg = AppError::WeightExceeded { total: 150, limit: 100 }.to_string();
        assert!(msg.contains("weight"));
        assert!(msg.contains("exceed"));
        assert!(msg.contains("150"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn invalid_state_mentions_loading_state() {
        let msg = AppError::InvalidState(DroneState::Delivering).to_string().to_lowercase();
        assert!(msg.contains("loading"));
        assert!(msg.contains("state"));
    }

    #[test]
    fn field_errors_render_with_index() {
        let err = AppError::InvalidFormat(vec![
            FieldError::new("name", "bad").at(0),
            FieldError::new("code", "worse").at(0),
        ]);
        assert_eq!(err.to_string(), "invalid format: [0].name: bad; [0].code: worse");
        assert_eq!(err.field_errors().len(), 2);
    }

    #[test]
    fn internal_keeps_source_message() {
        let err = AppError::from(anyhow::anyhow!("database is locked"));
        assert_eq!(err.kind(), "INTERNAL");
        assert!(err.to_string().contains("database is locked"));
    }
}
