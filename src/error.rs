//! Domain errors for the scheduling core.

use chrono::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

use crate::models::AppointmentStatus;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Professional {professional_id} already has appointment {conflicting_id} overlapping {start}")]
    Conflict {
        professional_id: Uuid,
        start: NaiveDateTime,
        conflicting_id: Uuid,
    },

    #[error("Appointment is {status}: {reason}")]
    InvalidState {
        status: AppointmentStatus,
        reason: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SchedulingError {
    pub fn invalid(message: impl Into<String>) -> Self {
        SchedulingError::InvalidInput(message.into())
    }
}
