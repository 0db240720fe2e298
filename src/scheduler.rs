/// Appointment scheduling over a professional's agenda.
///
/// This module provides the AppointmentScheduler struct which answers
/// availability queries, books and reschedules appointments without
/// double-booking, and moves appointments through their status lifecycle.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::calendar::{self, WorkingHours};
use crate::error::SchedulingError;
use crate::models::{
    truncate_to_seconds, validate_duration, Appointment, AppointmentStatus, Professional, TimeSlot,
    MAX_DURATION_MINUTES,
};
use crate::store::{AppointmentFilter, AppointmentStore, Directory};

/// A request to put a new appointment on an agenda.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub professional_id: Uuid,
    pub start: NaiveDateTime,
    /// Falls back to the scheduler's default duration.
    pub duration_minutes: Option<i64>,
    pub patient_id: Option<Uuid>,
    pub insurance_provider_id: Option<Uuid>,
    pub affiliate_number: Option<String>,
    pub authorization_code: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl BookingRequest {
    pub fn new(professional_id: Uuid, start: NaiveDateTime) -> Self {
        BookingRequest {
            professional_id,
            start,
            duration_minutes: None,
            patient_id: None,
            insurance_provider_id: None,
            affiliate_number: None,
            authorization_code: None,
            reason: None,
            notes: None,
        }
    }
}

/// A request to move an existing appointment.
#[derive(Debug, Clone)]
pub struct RescheduleRequest {
    pub start: NaiveDateTime,
    pub professional_id: Uuid,
    /// Replaces the stored reason only when set.
    pub reason: Option<String>,
    /// Replaces the stored notes only when set.
    pub notes: Option<String>,
}

pub struct AppointmentScheduler {
    appointments: Arc<dyn AppointmentStore>,
    directory: Arc<dyn Directory>,
    hours: WorkingHours,
    default_duration: i64,
}

impl AppointmentScheduler {
    /// Initialize the scheduler.
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        directory: Arc<dyn Directory>,
        hours: WorkingHours,
        default_duration: i64,
    ) -> Result<Self, SchedulingError> {
        validate_duration(default_duration)?;
        Ok(AppointmentScheduler {
            appointments,
            directory,
            hours,
            default_duration,
        })
    }

    /// Free/busy grid of a professional's working day.
    pub fn availability(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Vec<TimeSlot>, SchedulingError> {
        self.professional(professional_id)?;

        let (from, to) = self.hours.lookup_range(date);
        let bookings = self.bookings_between(professional_id, from, to)?;
        debug!(%professional_id, %date, bookings = bookings.len(), "Computing availability");

        Ok(self.hours.availability(date, &bookings, now))
    }

    /// Find an agenda-blocking appointment overlapping `[start, start + duration)`.
    pub fn find_conflict(
        &self,
        professional_id: Uuid,
        start: NaiveDateTime,
        duration_minutes: i64,
        exclude: Option<Uuid>,
    ) -> Result<Option<Appointment>, SchedulingError> {
        let out_of_range = || SchedulingError::invalid(format!("Time out of range: {start}"));
        let from = start
            .checked_sub_signed(Duration::minutes(MAX_DURATION_MINUTES))
            .ok_or_else(out_of_range)?;
        let to = start
            .checked_add_signed(Duration::minutes(duration_minutes))
            .ok_or_else(out_of_range)?;
        let bookings = self.bookings_between(professional_id, from, to)?;

        Ok(calendar::find_overlap(&bookings, start, duration_minutes, exclude).cloned())
    }

    /// Book a new appointment.
    ///
    /// When a patient is given and the request carries no insurance data,
    /// the patient's insurance provider and affiliate number are copied.
    pub fn book(
        &self,
        request: BookingRequest,
        now: NaiveDateTime,
    ) -> Result<Appointment, SchedulingError> {
        let professional = self.active_professional(request.professional_id)?;
        if request.start <= now {
            return Err(SchedulingError::invalid("Appointment must start in the future"));
        }

        let duration = request.duration_minutes.unwrap_or(self.default_duration);
        let mut appointment = Appointment::new(professional.id, request.start, duration, now)?;

        let carries_insurance =
            request.insurance_provider_id.is_some() || request.affiliate_number.is_some();

        if let Some(patient_id) = request.patient_id {
            let patient = self
                .directory
                .get_patient(patient_id)?
                .ok_or(SchedulingError::NotFound {
                    entity: "patient",
                    id: patient_id,
                })?;
            appointment.patient_id = Some(patient.id);
            if !carries_insurance {
                appointment.insurance_provider_id = patient.insurance_provider_id;
                appointment.affiliate_number = patient.affiliate_number;
            }
        }

        if let Some(provider_id) = request.insurance_provider_id {
            self.directory
                .get_insurance_provider(provider_id)?
                .ok_or(SchedulingError::NotFound {
                    entity: "insurance provider",
                    id: provider_id,
                })?;
        }
        if carries_insurance {
            appointment.insurance_provider_id = request.insurance_provider_id;
            appointment.affiliate_number = request.affiliate_number;
        }
        appointment.authorization_code = request.authorization_code;
        appointment.reason = request.reason;
        appointment.notes = request.notes;

        self.ensure_free(professional.id, appointment.start, duration, None)?;
        self.appointments.insert_appointment(&appointment)?;

        info!(
            appointment_id = %appointment.id,
            professional_id = %professional.id,
            start = %appointment.start,
            "Appointment booked"
        );
        Ok(appointment)
    }

    /// Move an appointment to a new time and/or professional.
    ///
    /// Patient, insurance, affiliate number, authorization and duration are
    /// kept. The status goes back to `Scheduled`.
    pub fn reschedule(
        &self,
        appointment_id: Uuid,
        request: RescheduleRequest,
        now: NaiveDateTime,
    ) -> Result<Appointment, SchedulingError> {
        let mut appointment = self.get(appointment_id)?;

        if appointment.status.is_terminal() {
            warn!(%appointment_id, status = %appointment.status, "Reschedule of closed appointment rejected");
            return Err(SchedulingError::InvalidState {
                status: appointment.status,
                reason: "closed appointments cannot be rescheduled".to_string(),
            });
        }

        let professional = self.active_professional(request.professional_id)?;
        if request.start <= now {
            return Err(SchedulingError::invalid("New time must be in the future"));
        }
        let start = truncate_to_seconds(request.start);

        self.ensure_free(
            professional.id,
            start,
            appointment.duration_minutes,
            Some(appointment.id),
        )?;

        let previous_start = appointment.start;
        appointment.professional_id = professional.id;
        appointment.start = start;
        appointment.status = AppointmentStatus::Scheduled;
        if let Some(reason) = request.reason {
            appointment.reason = Some(reason);
        }
        if let Some(notes) = request.notes {
            appointment.notes = Some(notes);
        }
        appointment.updated_at = truncate_to_seconds(now);

        self.appointments.update_appointment(&appointment)?;

        info!(
            %appointment_id,
            professional_id = %professional.id,
            from = %previous_start,
            to = %start,
            "Appointment rescheduled"
        );
        Ok(appointment)
    }

    /// Apply a status transition.
    ///
    /// Setting the current status again is a no-op. Leaving a terminal
    /// status requires `force`; reopening into an agenda-blocking status
    /// re-checks the interval for conflicts.
    pub fn change_status(
        &self,
        appointment_id: Uuid,
        next: AppointmentStatus,
        force: bool,
        now: NaiveDateTime,
    ) -> Result<Appointment, SchedulingError> {
        let mut appointment = self.get(appointment_id)?;
        let current = appointment.status;

        if current == next {
            return Ok(appointment);
        }

        if current.is_terminal() {
            if !force {
                warn!(%appointment_id, %current, %next, "Overwrite of closed appointment needs confirmation");
                return Err(SchedulingError::InvalidState {
                    status: current,
                    reason: "appointment is closed; confirm explicitly to change it".to_string(),
                });
            }
            if next.blocks_agenda() && !current.blocks_agenda() {
                self.ensure_free(
                    appointment.professional_id,
                    appointment.start,
                    appointment.duration_minutes,
                    Some(appointment.id),
                )?;
            }
        } else if !current.can_transition_to(next) {
            warn!(%appointment_id, %current, %next, "Invalid status transition");
            return Err(SchedulingError::InvalidState {
                status: current,
                reason: format!("cannot move to {next}"),
            });
        }

        appointment.status = next;
        appointment.updated_at = truncate_to_seconds(now);
        self.appointments.update_appointment(&appointment)?;

        info!(%appointment_id, from = %current, to = %next, forced = force, "Appointment status changed");
        Ok(appointment)
    }

    /// Get an appointment by its ID.
    pub fn get(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        self.appointments
            .get_appointment(appointment_id)?
            .ok_or(SchedulingError::NotFound {
                entity: "appointment",
                id: appointment_id,
            })
    }

    pub fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, SchedulingError> {
        Ok(self.appointments.find_appointments(filter)?)
    }

    fn professional(&self, professional_id: Uuid) -> Result<Professional, SchedulingError> {
        self.directory
            .get_professional(professional_id)?
            .ok_or(SchedulingError::NotFound {
                entity: "professional",
                id: professional_id,
            })
    }

    fn active_professional(&self, professional_id: Uuid) -> Result<Professional, SchedulingError> {
        let professional = self.professional(professional_id)?;
        if !professional.active {
            return Err(SchedulingError::invalid(format!(
                "Professional {} is not taking appointments",
                professional.name
            )));
        }
        Ok(professional)
    }

    fn bookings_between(
        &self,
        professional_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let filter = AppointmentFilter::for_professional(professional_id)
            .starting_between(from, to)
            .with_statuses(AppointmentStatus::blocking());
        Ok(self.appointments.find_appointments(&filter)?)
    }

    fn ensure_free(
        &self,
        professional_id: Uuid,
        start: NaiveDateTime,
        duration_minutes: i64,
        exclude: Option<Uuid>,
    ) -> Result<(), SchedulingError> {
        match self.find_conflict(professional_id, start, duration_minutes, exclude)? {
            Some(conflict) => {
                warn!(
                    %professional_id,
                    %start,
                    conflicting_id = %conflict.id,
                    "Double booking rejected"
                );
                Err(SchedulingError::Conflict {
                    professional_id,
                    start,
                    conflicting_id: conflict.id,
                })
            }
            None => Ok(()),
        }
    }
}
