/// Data models for the clinic scheduling service.
///
/// This module defines the core data structures used throughout the service:
/// - AppointmentStatus: lifecycle state of an appointment
/// - Appointment: a booked time interval on a professional's agenda
/// - Professional, Patient, InsuranceProvider: directory records
/// - TimeSlot: a computed free/busy entry of the daily grid
/// - Role, Actor: the authenticated caller of a request

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::SchedulingError;

/// Upper bound for a single appointment, in minutes.
pub const MAX_DURATION_MINUTES: i64 = 480;

/// Accepted calendar years.
pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

/// Timestamp layouts accepted from clients, tried in order.
const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];

/// Lifecycle states of an appointment.
///
/// `Completed`, `Cancelled` and `NoShow` are terminal. Cancellation is how an
/// appointment is removed from the agenda; rows are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentStatus {
    #[serde(rename = "PROGRAMADO")]
    Scheduled,
    #[serde(rename = "CONFIRMADO")]
    Confirmed,
    #[serde(rename = "EN_SALA_ESPERA")]
    InWaitingRoom,
    #[serde(rename = "COMPLETADO")]
    Completed,
    #[serde(rename = "CANCELADO")]
    Cancelled,
    #[serde(rename = "AUSENTE")]
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 6] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::InWaitingRoom,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
    ];

    /// Convert a wire name to a status value.
    pub fn from_string(value: &str) -> Result<Self, SchedulingError> {
        let wanted = value.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.name() == wanted)
            .ok_or_else(|| {
                SchedulingError::invalid(format!(
                    "Invalid status: '{}'. Must be one of: PROGRAMADO, CONFIRMADO, \
                     EN_SALA_ESPERA, COMPLETADO, CANCELADO, AUSENTE",
                    value
                ))
            })
    }

    pub fn name(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "PROGRAMADO",
            AppointmentStatus::Confirmed => "CONFIRMADO",
            AppointmentStatus::InWaitingRoom => "EN_SALA_ESPERA",
            AppointmentStatus::Completed => "COMPLETADO",
            AppointmentStatus::Cancelled => "CANCELADO",
            AppointmentStatus::NoShow => "AUSENTE",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    /// Whether an appointment in this state still occupies its interval.
    pub fn blocks_agenda(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::NoShow)
    }

    /// Statuses reachable from this one without an explicit override.
    pub fn valid_transitions(&self) -> &'static [AppointmentStatus] {
        use AppointmentStatus::*;
        match self {
            Scheduled => &[Confirmed, Cancelled, NoShow],
            Confirmed => &[InWaitingRoom, Cancelled, NoShow],
            InWaitingRoom => &[Completed, Cancelled, NoShow],
            Completed | Cancelled | NoShow => &[],
        }
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        self.valid_transitions().contains(&next)
    }

    /// Statuses that occupy the agenda, for store filters.
    pub fn blocking() -> Vec<AppointmentStatus> {
        Self::ALL.into_iter().filter(|s| s.blocks_agenda()).collect()
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A booked interval on a professional's agenda.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    #[serde(rename = "profesionalId")]
    pub professional_id: Uuid,
    #[serde(rename = "pacienteId")]
    pub patient_id: Option<Uuid>,
    #[serde(rename = "fecha")]
    pub start: NaiveDateTime,
    #[serde(rename = "duracion")]
    pub duration_minutes: i64,
    #[serde(rename = "estado")]
    pub status: AppointmentStatus,
    #[serde(rename = "motivo")]
    pub reason: Option<String>,
    #[serde(rename = "observaciones")]
    pub notes: Option<String>,
    #[serde(rename = "obraSocialId")]
    pub insurance_provider_id: Option<Uuid>,
    #[serde(rename = "numeroAfiliado")]
    pub affiliate_number: Option<String>,
    #[serde(rename = "autorizacion")]
    pub authorization_code: Option<String>,
    #[serde(rename = "creadoEn")]
    pub created_at: NaiveDateTime,
    #[serde(rename = "actualizadoEn")]
    pub updated_at: NaiveDateTime,
}

impl Appointment {
    /// Create a new scheduled appointment with validation.
    pub fn new(
        professional_id: Uuid,
        start: NaiveDateTime,
        duration_minutes: i64,
        now: NaiveDateTime,
    ) -> Result<Self, SchedulingError> {
        validate_duration(duration_minutes)?;
        let now = truncate_to_seconds(now);

        Ok(Appointment {
            id: Uuid::new_v4(),
            professional_id,
            patient_id: None,
            start: truncate_to_seconds(start),
            duration_minutes,
            status: AppointmentStatus::Scheduled,
            reason: None,
            notes: None,
            insurance_provider_id: None,
            affiliate_number: None,
            authorization_code: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn end(&self) -> NaiveDateTime {
        self.start + Duration::minutes(self.duration_minutes)
    }

    /// Check if an instant falls within `[start, end)`.
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at < self.end()
    }

    /// Check if `[start, start + duration)` overlaps this appointment.
    pub fn overlaps(&self, start: NaiveDateTime, duration_minutes: i64) -> bool {
        let end = start + Duration::minutes(duration_minutes);
        self.start < end && start < self.end()
    }
}

/// A health professional whose agenda holds appointments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Professional {
    pub id: Uuid,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "especialidad")]
    pub specialty: Option<String>,
    #[serde(rename = "activo")]
    pub active: bool,
}

impl Professional {
    pub fn new(name: &str, specialty: Option<&str>) -> Result<Self, SchedulingError> {
        if name.trim().is_empty() {
            return Err(SchedulingError::invalid("Professional name cannot be empty"));
        }
        Ok(Professional {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            specialty: specialty.map(str::to_string),
            active: true,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patient {
    pub id: Uuid,
    pub full_name: String,
    pub document_number: Option<String>,
    pub insurance_provider_id: Option<Uuid>,
    pub affiliate_number: Option<String>,
}

impl Patient {
    pub fn new(full_name: &str) -> Result<Self, SchedulingError> {
        if full_name.trim().is_empty() {
            return Err(SchedulingError::invalid("Patient name cannot be empty"));
        }
        Ok(Patient {
            id: Uuid::new_v4(),
            full_name: full_name.trim().to_string(),
            document_number: None,
            insurance_provider_id: None,
            affiliate_number: None,
        })
    }
}

/// Health-insurance payer ("obra social").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsuranceProvider {
    pub id: Uuid,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "codigo")]
    pub code: Option<String>,
    #[serde(rename = "activo")]
    pub active: bool,
}

impl InsuranceProvider {
    pub fn new(name: &str, code: Option<&str>) -> Result<Self, SchedulingError> {
        if name.trim().is_empty() {
            return Err(SchedulingError::invalid("Insurance provider name cannot be empty"));
        }
        Ok(InsuranceProvider {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            code: code.map(str::to_string),
            active: true,
        })
    }
}

/// One entry of the computed daily grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: NaiveDateTime,
    pub available: bool,
}

/// Staff roles recognised by the access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    FrontDesk,
    Professional,
    Manager,
}

impl Role {
    pub fn from_string(value: &str) -> Result<Self, SchedulingError> {
        match value.trim().to_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "MESA_ENTRADA" => Ok(Role::FrontDesk),
            "PROFESIONAL" => Ok(Role::Professional),
            "GERENTE" => Ok(Role::Manager),
            _ => Err(SchedulingError::invalid(format!(
                "Invalid role: '{}'. Must be one of: ADMIN, MESA_ENTRADA, PROFESIONAL, GERENTE",
                value
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::FrontDesk => "MESA_ENTRADA",
            Role::Professional => "PROFESIONAL",
            Role::Manager => "GERENTE",
        }
    }
}

/// The authenticated caller, resolved once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub display_name: String,
    pub role: Role,
    /// Set when the user is a professional with an agenda of their own.
    pub professional_id: Option<Uuid>,
}

pub fn validate_duration(duration_minutes: i64) -> Result<(), SchedulingError> {
    if duration_minutes <= 0 || duration_minutes > MAX_DURATION_MINUTES {
        return Err(SchedulingError::invalid(format!(
            "Duration must be between 1 and {} minutes",
            MAX_DURATION_MINUTES
        )));
    }
    Ok(())
}

/// Parse a client-supplied wall-clock timestamp.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, SchedulingError> {
    let value = value.trim();
    let parsed = TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| {
            SchedulingError::invalid(format!(
                "Invalid timestamp: '{}'. Expected YYYY-MM-DDTHH:MM[:SS]",
                value
            ))
        })?;
    check_year(parsed.year(), value)?;
    Ok(parsed)
}

/// Parse a client-supplied calendar day (`YYYY-MM-DD`).
pub fn parse_date(value: &str) -> Result<NaiveDate, SchedulingError> {
    let parsed = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        SchedulingError::invalid(format!("Invalid date: '{}'. Expected YYYY-MM-DD", value))
    })?;
    check_year(parsed.year(), value)?;
    Ok(parsed)
}

/// Stored timestamps are compared as text, which only orders four-digit years.
fn check_year(year: i32, value: &str) -> Result<(), SchedulingError> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(SchedulingError::invalid(format!(
            "Year out of range in '{}': must be between {} and {}",
            value.trim(),
            MIN_YEAR,
            MAX_YEAR
        )));
    }
    Ok(())
}

pub fn truncate_to_seconds(at: NaiveDateTime) -> NaiveDateTime {
    at.with_nanosecond(0).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn status_round_trips_through_wire_name() {
        for status in AppointmentStatus::ALL {
            assert_eq!(AppointmentStatus::from_string(status.name()).unwrap(), status);
        }
        assert_eq!(
            AppointmentStatus::from_string(" en_sala_espera ").unwrap(),
            AppointmentStatus::InWaitingRoom
        );
        assert!(AppointmentStatus::from_string("BORRADO").is_err());
    }

    #[test]
    fn status_serializes_with_wire_name() {
        let json = serde_json::to_string(&AppointmentStatus::NoShow).unwrap();
        assert_eq!(json, "\"AUSENTE\"");
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        for status in AppointmentStatus::ALL {
            assert_eq!(status.is_terminal(), status.valid_transitions().is_empty());
        }
    }

    #[test]
    fn happy_path_is_linear() {
        use AppointmentStatus::*;
        assert!(Scheduled.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(InWaitingRoom));
        assert!(InWaitingRoom.can_transition_to(Completed));
        assert!(!Scheduled.can_transition_to(Completed));
        assert!(!Confirmed.can_transition_to(Scheduled));
    }

    #[test]
    fn cancel_and_no_show_reachable_from_any_open_state() {
        use AppointmentStatus::*;
        for status in [Scheduled, Confirmed, InWaitingRoom] {
            assert!(status.can_transition_to(Cancelled));
            assert!(status.can_transition_to(NoShow));
        }
    }

    #[test]
    fn cancelled_and_no_show_free_the_agenda() {
        assert!(!AppointmentStatus::Cancelled.blocks_agenda());
        assert!(!AppointmentStatus::NoShow.blocks_agenda());
        assert!(AppointmentStatus::Completed.blocks_agenda());
        assert_eq!(AppointmentStatus::blocking().len(), 4);
    }

    #[test]
    fn contains_is_half_open() {
        let appt = Appointment::new(Uuid::new_v4(), at("2024-06-01T10:00"), 30, at("2024-05-01T08:00")).unwrap();
        assert!(appt.contains(at("2024-06-01T10:00")));
        assert!(appt.contains(at("2024-06-01T10:29")));
        assert!(!appt.contains(at("2024-06-01T10:30")));
        assert!(!appt.contains(at("2024-06-01T09:59")));
    }

    #[test]
    fn overlap_detects_longer_earlier_appointment() {
        let appt = Appointment::new(Uuid::new_v4(), at("2024-06-01T09:00"), 90, at("2024-05-01T08:00")).unwrap();
        assert!(appt.overlaps(at("2024-06-01T10:00"), 30));
        assert!(!appt.overlaps(at("2024-06-01T10:30"), 30));
        assert!(!appt.overlaps(at("2024-06-01T08:30"), 30));
    }

    #[test]
    fn new_appointment_rejects_bad_duration() {
        let start = at("2024-06-01T10:00");
        let now = at("2024-05-01T08:00");
        assert!(Appointment::new(Uuid::new_v4(), start, 0, now).is_err());
        assert!(Appointment::new(Uuid::new_v4(), start, MAX_DURATION_MINUTES + 1, now).is_err());
        let appt = Appointment::new(Uuid::new_v4(), start, 45, now).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Scheduled);
        assert_eq!(appt.end(), at("2024-06-01T10:45"));
    }

    #[test]
    fn timestamp_accepts_client_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-06-01T10:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-06-01T10:30").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-06-01 10:30").unwrap(), expected);
        assert!(parse_timestamp("01/06/2024 10:30").is_err());
    }

    #[test]
    fn date_requires_iso_day() {
        assert!(parse_date("2024-06-01").is_ok());
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn years_outside_four_digits_are_rejected() {
        assert!(parse_timestamp("+262142-12-31T23:50").is_err());
        assert!(parse_timestamp("+10000-01-01T10:00").is_err());
        assert!(parse_timestamp("0000-06-01T10:00").is_err());
        assert!(parse_date("+262142-12-31").is_err());
        assert!(parse_date("-0001-06-01").is_err());
        assert!(parse_date("9999-12-31").is_ok());
        assert!(matches!(
            parse_timestamp("+262142-12-31T23:50"),
            Err(SchedulingError::InvalidInput(_))
        ));
    }

    #[test]
    fn appointment_serializes_spanish_fields() {
        let appt = Appointment::new(Uuid::new_v4(), at("2024-06-01T10:00"), 30, at("2024-05-01T08:00")).unwrap();
        let json = serde_json::to_value(&appt).unwrap();
        assert_eq!(json["fecha"], "2024-06-01T10:00:00");
        assert_eq!(json["duracion"], 30);
        assert_eq!(json["estado"], "PROGRAMADO");
        assert!(json["pacienteId"].is_null());
    }

    #[test]
    fn role_parses_glossary_names() {
        assert_eq!(Role::from_string("mesa_entrada").unwrap(), Role::FrontDesk);
        assert_eq!(Role::from_string("GERENTE").unwrap(), Role::Manager);
        assert!(Role::from_string("PACIENTE").is_err());
    }
}
