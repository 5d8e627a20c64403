use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::common::{actor_stage, ApiJson, MessageResponse},
    models::{
        actor::{Actor, Stage},
        booking_request::BookingRequest,
        fuel::{AddFuelRequest, FuelRecord},
        request_status::{Phase, RequestStatus},
        satisfaction_survey::{CreateSatisfactionSurvey, SatisfactionSurvey},
    },
    repositories::{
        begin_transaction, booking_request as booking_repo, commit_transaction,
        trip_records as trip_repo,
    },
    state::AppState,
    types::RequestUid,
};

/// Fuel can be logged while the vehicle is out or being checked back in.
fn accepts_fuel(status: RequestStatus) -> bool {
    status.has_reached(Phase::Trip) && !status.is_terminal()
}

/// Surveys open once the vehicle has come back.
fn accepts_survey(status: RequestStatus) -> bool {
    status.has_reached(Phase::Return)
}

fn cannot_update(request: &BookingRequest, what: &str) -> AppError {
    AppError::CannotUpdate(format!(
        "cannot {} for a request in status {}",
        what, request.status
    ))
}

pub async fn add_fuel(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((stage, uid)): Path<(String, RequestUid)>,
    ApiJson(payload): ApiJson<AddFuelRequest>,
) -> Result<(StatusCode, Json<MessageResponse<FuelRecord>>), AppError> {
    let stage = actor_stage(&stage, &actor)?;
    if !matches!(stage, Stage::BookingUser | Stage::Driver) {
        return Err(AppError::Forbidden(
            "Fuel is recorded by the vehicle user or the driver".to_string(),
        ));
    }
    payload.validate()?;

    let mut tx = begin_transaction::<AppError>(&state.pool).await?;
    let request = booking_repo::lock_visible(tx.as_mut(), uid, &actor, stage)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking request not found".to_string()))?;
    if !accepts_fuel(request.status) {
        return Err(cannot_update(&request, "add fuel"));
    }

    let record = FuelRecord::new(uid, &payload, actor.emp_id(), Utc::now());
    trip_repo::insert_fuel_record(tx.as_mut(), &record).await?;
    commit_transaction::<AppError>(tx).await?;

    tracing::info!(
        request_uid = %uid,
        liters = record.liters,
        emp_id = %actor.emp_id(),
        "Fuel refill recorded"
    );
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Created successfully", record)),
    ))
}

pub async fn satisfaction_survey(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((stage, uid)): Path<(String, RequestUid)>,
    ApiJson(payload): ApiJson<CreateSatisfactionSurvey>,
) -> Result<(StatusCode, Json<MessageResponse<SatisfactionSurvey>>), AppError> {
    let stage = actor_stage(&stage, &actor)?;
    if stage != Stage::BookingUser {
        return Err(AppError::Forbidden(
            "Surveys are submitted by the vehicle user".to_string(),
        ));
    }
    payload.validate()?;

    let request = booking_repo::find_visible(&state.pool, uid, &actor, stage)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking request not found".to_string()))?;
    if !accepts_survey(request.status) {
        return Err(cannot_update(&request, "submit a survey"));
    }

    let survey = SatisfactionSurvey::new(uid, &payload, actor.emp_id(), Utc::now());
    if !trip_repo::insert_survey(&state.pool, &survey).await? {
        return Err(AppError::Conflict(
            "Satisfaction survey already submitted".to_string(),
        ));
    }

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Created successfully", survey)),
    ))
}
