//! Shared types for the HTTP layer: request context and wire shapes.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::clock::Clock;
use crate::models::{Appointment, InsuranceProvider, Professional, TimeSlot};
use crate::scheduler::AppointmentScheduler;
use crate::session::SessionProvider;
use crate::store::Directory;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct ApiContext {
    pub scheduler: Arc<AppointmentScheduler>,
    pub directory: Arc<dyn Directory>,
    pub sessions: Arc<dyn SessionProvider>,
    pub clock: Arc<dyn Clock>,
}

impl ApiContext {
    pub fn new(
        scheduler: Arc<AppointmentScheduler>,
        directory: Arc<dyn Directory>,
        sessions: Arc<dyn SessionProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            scheduler,
            directory,
            sessions,
            clock,
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }
}

// ═══════════════════════════════════════════════════════════
// Requests
// ═══════════════════════════════════════════════════════════

// Every field is optional so that missing input becomes a JSON 400 from
// the handler instead of an extractor rejection.

#[derive(Debug, Default, Deserialize)]
pub struct AvailabilityQuery {
    #[serde(rename = "profesionalId")]
    pub professional_id: Option<String>,
    pub fecha: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "profesionalId")]
    pub professional_id: Option<String>,
    #[serde(rename = "pacienteId")]
    pub patient_id: Option<String>,
    pub fecha: Option<String>,
    pub estado: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateBody {
    #[serde(rename = "profesionalId")]
    pub professional_id: Option<String>,
    #[serde(rename = "pacienteId")]
    pub patient_id: Option<String>,
    pub fecha: Option<String>,
    pub duracion: Option<i64>,
    pub motivo: Option<String>,
    pub observaciones: Option<String>,
    #[serde(rename = "obraSocialId")]
    pub insurance_provider_id: Option<String>,
    #[serde(rename = "numeroAfiliado")]
    pub affiliate_number: Option<String>,
    pub autorizacion: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RescheduleBody {
    pub fecha: Option<String>,
    #[serde(rename = "profesionalId")]
    pub professional_id: Option<String>,
    pub motivo: Option<String>,
    pub observaciones: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusBody {
    pub estado: Option<String>,
    /// Explicit confirmation for leaving a closed status.
    pub forzar: Option<bool>,
}

// ═══════════════════════════════════════════════════════════
// Responses
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct SlotView {
    pub fecha: NaiveDateTime,
    pub hora: String,
    pub disponible: bool,
    #[serde(rename = "profesionalId")]
    pub professional_id: Uuid,
}

impl SlotView {
    pub fn new(slot: &TimeSlot, professional_id: Uuid) -> Self {
        SlotView {
            fecha: slot.start,
            hora: slot.start.format("%H:%M").to_string(),
            disponible: slot.available,
            professional_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub horarios: Vec<SlotView>,
}

#[derive(Debug, Serialize)]
pub struct AppointmentsResponse {
    pub turnos: Vec<Appointment>,
}

#[derive(Debug, Serialize)]
pub struct ProfessionalsResponse {
    pub profesionales: Vec<Professional>,
}

#[derive(Debug, Serialize)]
pub struct InsuranceProvidersResponse {
    #[serde(rename = "obrasSociales")]
    pub insurance_providers: Vec<InsuranceProvider>,
}

// ═══════════════════════════════════════════════════════════
// Input helpers
// ═══════════════════════════════════════════════════════════

/// Require a non-blank field.
pub fn required<'a>(field: &str, value: &'a Option<String>) -> Result<&'a str, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::BadRequest(format!("{field} is required"))),
    }
}

pub fn parse_id(field: &str, value: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value.trim())
        .map_err(|_| ApiError::BadRequest(format!("{field} is not a valid id: '{value}'")))
}

/// Parse an optional id field; blank counts as absent.
pub fn optional_id(field: &str, value: &Option<String>) -> Result<Option<Uuid>, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => parse_id(field, v).map(Some),
        _ => Ok(None),
    }
}
