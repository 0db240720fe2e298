//! Read-only directory endpoints.

use axum::extract::State;
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, InsuranceProvidersResponse, ProfessionalsResponse};
use crate::models::Actor;
use crate::policy::{self, Action, Resource};

/// `GET /api/profesionales`: active professionals.
pub async fn professionals(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ProfessionalsResponse>, ApiError> {
    ApiError::from_decision(policy::authorize(&actor, Action::ViewDirectory, &Resource::Clinic))?;
    let profesionales = ctx.directory.list_professionals(false)?;
    Ok(Json(ProfessionalsResponse { profesionales }))
}

/// `GET /api/obras-sociales`
pub async fn insurance_providers(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<InsuranceProvidersResponse>, ApiError> {
    ApiError::from_decision(policy::authorize(&actor, Action::ViewDirectory, &Resource::Clinic))?;
    let insurance_providers = ctx.directory.list_insurance_providers()?;
    Ok(Json(InsuranceProvidersResponse { insurance_providers }))
}
