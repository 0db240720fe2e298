//! Appointment endpoints.
//!
//! - `GET /api/turnos/disponibilidad`: daily free/busy grid
//! - `GET /api/turnos`: filtered list
//! - `POST /api/turnos`: book
//! - `GET /api/turnos/:id`: detail
//! - `PUT /api/turnos/:id/reprogramar`: reschedule
//! - `PATCH /api/turnos/:id/estado`: status change

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{Duration, NaiveTime};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{
    optional_id, parse_id, required, ApiContext, AppointmentsResponse, AvailabilityQuery,
    AvailabilityResponse, CreateBody, ListQuery, RescheduleBody, SlotView, StatusBody,
};
use crate::models::{parse_date, parse_timestamp, Actor, Appointment, AppointmentStatus, Role};
use crate::policy::{self, Action, Resource};
use crate::scheduler::{BookingRequest, RescheduleRequest};
use crate::store::AppointmentFilter;

fn agenda(professional_id: Uuid) -> Resource {
    Resource::Agenda { professional_id }
}

fn authorize(actor: &Actor, action: Action, resource: Resource) -> Result<(), ApiError> {
    ApiError::from_decision(policy::authorize(actor, action, &resource))
}

fn bad_json(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}

fn bad_query(rejection: QueryRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}

/// `GET /api/turnos/disponibilidad?profesionalId=&fecha=`
pub async fn availability(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let Query(query) = query.map_err(bad_query)?;
    let professional_id = parse_id(
        "profesionalId",
        required("profesionalId", &query.professional_id)?,
    )?;
    let date = parse_date(required("fecha", &query.fecha)?)?;

    authorize(&actor, Action::ViewAgenda, agenda(professional_id))?;

    let slots = ctx.scheduler.availability(professional_id, date, ctx.now())?;
    let horarios = slots
        .iter()
        .map(|slot| SlotView::new(slot, professional_id))
        .collect();

    Ok(Json(AvailabilityResponse { horarios }))
}

/// `GET /api/turnos?profesionalId=&pacienteId=&fecha=&estado=`
///
/// A professional without an explicit filter sees their own agenda.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<AppointmentsResponse>, ApiError> {
    let Query(query) = query.map_err(bad_query)?;

    let mut filter = AppointmentFilter {
        professional_id: optional_id("profesionalId", &query.professional_id)?,
        patient_id: optional_id("pacienteId", &query.patient_id)?,
        ..Default::default()
    };
    if filter.professional_id.is_none() && actor.role == Role::Professional {
        filter.professional_id = actor.professional_id;
    }

    if let Some(fecha) = query.fecha.as_deref().filter(|v| !v.trim().is_empty()) {
        let day = parse_date(fecha)?.and_time(NaiveTime::MIN);
        let next_day = day
            .checked_add_signed(Duration::days(1))
            .ok_or_else(|| ApiError::BadRequest(format!("fecha out of range: '{fecha}'")))?;
        filter = filter.starting_between(day, next_day);
    }
    if let Some(estado) = query.estado.as_deref().filter(|v| !v.trim().is_empty()) {
        filter = filter.with_statuses(vec![AppointmentStatus::from_string(estado)?]);
    }

    let resource = filter.professional_id.map_or(Resource::Clinic, agenda);
    authorize(&actor, Action::ViewAgenda, resource)?;

    let turnos = ctx.scheduler.list(&filter)?;
    tracing::debug!(count = turnos.len(), "Listed appointments");

    Ok(Json(AppointmentsResponse { turnos }))
}

/// `POST /api/turnos`: book a new appointment.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    body: Result<Json<CreateBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let Json(body) = body.map_err(bad_json)?;

    let professional_id = parse_id(
        "profesionalId",
        required("profesionalId", &body.professional_id)?,
    )?;
    let start = parse_timestamp(required("fecha", &body.fecha)?)?;

    authorize(&actor, Action::Book, agenda(professional_id))?;

    let mut request = BookingRequest::new(professional_id, start);
    request.duration_minutes = body.duracion;
    request.patient_id = optional_id("pacienteId", &body.patient_id)?;
    request.insurance_provider_id = optional_id("obraSocialId", &body.insurance_provider_id)?;
    request.affiliate_number = body.affiliate_number;
    request.authorization_code = body.autorizacion;
    request.reason = body.motivo;
    request.notes = body.observaciones;

    let appointment = ctx.scheduler.book(request, ctx.now())?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

/// `GET /api/turnos/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Appointment>, ApiError> {
    let appointment_id = parse_id("id", &appointment_id)?;
    let appointment = ctx.scheduler.get(appointment_id)?;

    authorize(&actor, Action::ViewAgenda, agenda(appointment.professional_id))?;

    Ok(Json(appointment))
}

/// `PUT /api/turnos/:id/reprogramar`: move to a new time and/or professional.
///
/// The caller needs rights on both the current and the target agenda.
pub async fn reschedule(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<String>,
    body: Result<Json<RescheduleBody>, JsonRejection>,
) -> Result<Json<Appointment>, ApiError> {
    let Json(body) = body.map_err(bad_json)?;
    let appointment_id = parse_id("id", &appointment_id)?;
    let start = parse_timestamp(required("fecha", &body.fecha)?)?;
    let professional_id = parse_id(
        "profesionalId",
        required("profesionalId", &body.professional_id)?,
    )?;

    let current = ctx.scheduler.get(appointment_id)?;
    authorize(&actor, Action::Reschedule, agenda(current.professional_id))?;
    authorize(&actor, Action::Reschedule, agenda(professional_id))?;

    let request = RescheduleRequest {
        start,
        professional_id,
        reason: body.motivo,
        notes: body.observaciones,
    };
    let appointment = ctx.scheduler.reschedule(appointment_id, request, ctx.now())?;

    Ok(Json(appointment))
}

/// `PATCH /api/turnos/:id/estado`: apply a status transition.
pub async fn change_status(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
    Path(appointment_id): Path<String>,
    body: Result<Json<StatusBody>, JsonRejection>,
) -> Result<Json<Appointment>, ApiError> {
    let Json(body) = body.map_err(bad_json)?;
    let appointment_id = parse_id("id", &appointment_id)?;
    let next = AppointmentStatus::from_string(required("estado", &body.estado)?)?;
    let force = body.forzar.unwrap_or(false);

    let current = ctx.scheduler.get(appointment_id)?;
    let resource = agenda(current.professional_id);
    authorize(&actor, Action::ChangeStatus, resource)?;
    if force && current.status.is_terminal() && current.status != next {
        authorize(&actor, Action::OverrideStatus, resource)?;
    }

    let appointment = ctx
        .scheduler
        .change_status(appointment_id, next, force, ctx.now())?;

    Ok(Json(appointment))
}
