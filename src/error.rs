//! Error types for appointment booking.

use crate::availability::Rejection;
use crate::booking::state::Step;

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Timezone error: {0}")]
    Timezone(#[from] TimezoneError),

    #[error("Stored slot error: {0}")]
    SlotParse(#[from] SlotParseError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised by the persistence collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Failures converting between client-local and canonical instants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimezoneError {
    #[error("Unknown time zone: {0}")]
    UnknownZone(String),

    #[error("Malformed instant: {0}")]
    MalformedInstant(String),

    #[error("Local time {0} does not exist in the requested zone")]
    NonexistentLocalTime(String),
}

/// A persisted slot string that does not match the canonical pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotParseError {
    #[error("Slot string does not match '<date> : HH:MM - HH:MM': {0}")]
    Pattern(String),

    #[error("Unparsable date in slot string: {0}")]
    Date(String),

    #[error("Unparsable time in slot string: {0}")]
    Time(String),

    #[error(transparent)]
    Timezone(#[from] TimezoneError),
}

/// A single field-level validation message.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    pub fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors surfaced by the booking workflow. None of them end the session;
/// the caller re-renders the current step with the error attached.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("Selection rejected: {0}")]
    SelectionRejected(Rejection),

    #[error("{entity} not found: {id}")]
    LookupNotFound { entity: &'static str, id: String },

    #[error("Timezone error: {0}")]
    Timezone(#[from] TimezoneError),

    #[error("Action {action} is not allowed at step {step}")]
    IllegalTransition { step: Step, action: &'static str },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl WorkflowError {
    pub fn field(field: &'static str, message: &'static str) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::LookupNotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Field-level errors, empty for non-validation failures.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Validation(errors) => errors,
            _ => &[],
        }
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
