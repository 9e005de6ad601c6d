// libs/negotiation-cell/src/error.rs
use thiserror::Error;

use crate::models::AppointmentStatus;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NegotiationError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Appointment not found")]
    NotFound,

    #[error("Role {role} may not issue {command} on a {status} appointment")]
    UnauthorizedTransition {
        role: String,
        command: String,
        status: AppointmentStatus,
    },

    #[error("Command {command} is not valid for status {status}")]
    InvalidTransition {
        status: AppointmentStatus,
        command: String,
    },

    #[error("Version conflict: expected {expected}, current version is {actual}")]
    ConcurrencyConflict { expected: i64, actual: i64 },

    #[error("Confirmed appointment time has already passed")]
    ConfirmedAppointmentElapsed,

    #[error("Storage error: {0}")]
    Storage(String),
}
