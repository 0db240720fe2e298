//! Persistence collaborators for the scheduling core.
//!
//! `AppointmentStore` and `Directory` are the seams the scheduler talks to;
//! `SqliteStore` backs the running service; `MemoryStore` is a test double.

#[cfg(test)]
pub mod memory;
pub mod sqlite;

#[cfg(test)]
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use chrono::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus, InsuranceProvider, Patient, Professional};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: Uuid },

    #[error("Invalid stored value for {field}: {value}")]
    Corrupt { field: &'static str, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Appointment records: create, read-by-id, read-many, update-by-id.
pub trait AppointmentStore: Send + Sync {
    fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError>;

    fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;

    /// Matching appointments ordered by start time.
    fn find_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError>;

    /// Fails with `StoreError::NotFound` if no row has `appointment.id`.
    fn update_appointment(&self, appointment: &Appointment) -> Result<(), StoreError>;
}

/// Read-only directory records referenced by appointments.
pub trait Directory: Send + Sync {
    fn get_professional(&self, id: Uuid) -> Result<Option<Professional>, StoreError>;

    fn list_professionals(&self, include_inactive: bool) -> Result<Vec<Professional>, StoreError>;

    fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, StoreError>;

    fn get_insurance_provider(&self, id: Uuid) -> Result<Option<InsuranceProvider>, StoreError>;

    fn list_insurance_providers(&self) -> Result<Vec<InsuranceProvider>, StoreError>;
}

/// Filter for `find_appointments`. Unset fields match everything; the time
/// range is half-open on the appointment start: `from <= start < to`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub professional_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    pub statuses: Option<Vec<AppointmentStatus>>,
}

impl AppointmentFilter {
    pub fn for_professional(professional_id: Uuid) -> Self {
        AppointmentFilter {
            professional_id: Some(professional_id),
            ..Default::default()
        }
    }

    pub fn starting_between(mut self, from: NaiveDateTime, to: NaiveDateTime) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn with_statuses(mut self, statuses: Vec<AppointmentStatus>) -> Self {
        self.statuses = Some(statuses);
        self
    }
}
