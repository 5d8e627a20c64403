//! `PUT /api/{stage}/update-*` endpoints. Each one maps its payload onto a
//! [`TransitionCommand`] and hands it to the transition engine.

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::common::{parse_stage, ApiJson, MessageResponse},
    models::{actor::Actor, booking_request::BookingRequest},
    services::{
        hooks::{KeyHandoverDetails, PickupDetails, ReturnDetails, TransitionDetails},
        transition_engine::TransitionCommand,
        transition_table::Action,
    },
    state::AppState,
    types::{DriverId, RequestUid, VehicleId},
    validation::rules,
};

type TransitionResponse = Result<Json<MessageResponse<BookingRequest>>, AppError>;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TransitionPayload {
    pub trn_request_uid: RequestUid,
    #[validate(length(max = 1000))]
    pub remark: Option<String>,
}

/// Body of actions that must say why: reject and cancel.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReasonPayload {
    pub trn_request_uid: RequestUid,
    #[validate(length(max = 1000), custom(function = "rules::validate_not_blank"))]
    pub reason: String,
    #[validate(length(max = 1000))]
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct KeyHandoverPayload {
    pub trn_request_uid: RequestUid,
    pub mas_vehicle_uid: Option<VehicleId>,
    pub mas_driver_uid: Option<DriverId>,
    pub appointment_start: DateTime<Utc>,
    pub appointment_end: DateTime<Utc>,
    #[validate(length(max = 255), custom(function = "rules::validate_not_blank"))]
    pub appointment_location: String,
    #[validate(length(max = 1000))]
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VehiclePickupPayload {
    pub trn_request_uid: RequestUid,
    #[validate(range(min = 0))]
    pub mile_start: i64,
    #[validate(custom(function = "rules::validate_fuel_level"))]
    pub fuel_start: i32,
    pub pickup_datetime: Option<DateTime<Utc>>,
    #[validate(length(max = 1000))]
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VehicleReturnPayload {
    pub trn_request_uid: RequestUid,
    #[validate(range(min = 0))]
    pub mile_end: i64,
    #[validate(custom(function = "rules::validate_fuel_level"))]
    pub fuel_end: i32,
    #[validate(length(max = 255), custom(function = "rules::validate_not_blank"))]
    pub parking_place: String,
    pub returned_datetime: Option<DateTime<Utc>>,
    #[validate(length(max = 1000))]
    pub remark: Option<String>,
}

fn command(stage: &str, action: Action, uid: RequestUid) -> Result<TransitionCommand, AppError> {
    Ok(TransitionCommand::new(uid, parse_stage(stage)?, action))
}

async fn run(state: &AppState, actor: &Actor, command: TransitionCommand) -> TransitionResponse {
    let outcome = state.engine.apply(actor, command).await?;
    Ok(Json(MessageResponse::new(
        "Updated successfully",
        outcome.request,
    )))
}

async fn run_plain(
    state: &AppState,
    actor: &Actor,
    stage: &str,
    action: Action,
    payload: TransitionPayload,
) -> TransitionResponse {
    payload.validate()?;
    let command = command(stage, action, payload.trn_request_uid)?.with_remark(payload.remark);
    run(state, actor, command).await
}

async fn run_with_reason(
    state: &AppState,
    actor: &Actor,
    stage: &str,
    action: Action,
    payload: ReasonPayload,
) -> TransitionResponse {
    payload.validate()?;
    let command = command(stage, action, payload.trn_request_uid)?
        .with_reason(Some(payload.reason))
        .with_remark(payload.remark);
    run(state, actor, command).await
}

pub async fn update_confirmed(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage): Path<String>,
    ApiJson(payload): ApiJson<TransitionPayload>,
) -> TransitionResponse {
    run_plain(&state, &actor, &stage, Action::Confirm, payload).await
}

pub async fn update_verified(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage): Path<String>,
    ApiJson(payload): ApiJson<TransitionPayload>,
) -> TransitionResponse {
    run_plain(&state, &actor, &stage, Action::Verify, payload).await
}

pub async fn update_approved(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage): Path<String>,
    ApiJson(payload): ApiJson<TransitionPayload>,
) -> TransitionResponse {
    run_plain(&state, &actor, &stage, Action::Approve, payload).await
}

pub async fn update_rejected(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage): Path<String>,
    ApiJson(payload): ApiJson<ReasonPayload>,
) -> TransitionResponse {
    run_with_reason(&state, &actor, &stage, Action::Reject, payload).await
}

pub async fn update_resubmitted(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage): Path<String>,
    ApiJson(payload): ApiJson<TransitionPayload>,
) -> TransitionResponse {
    run_plain(&state, &actor, &stage, Action::Resubmit, payload).await
}

pub async fn update_key_handover(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage): Path<String>,
    ApiJson(payload): ApiJson<KeyHandoverPayload>,
) -> TransitionResponse {
    payload.validate()?;
    let details = TransitionDetails::KeyHandover(KeyHandoverDetails {
        mas_vehicle_uid: payload.mas_vehicle_uid,
        mas_driver_uid: payload.mas_driver_uid,
        appointment_start: payload.appointment_start,
        appointment_end: payload.appointment_end,
        appointment_location: payload.appointment_location,
    });
    let command = command(&stage, Action::HandOverKey, payload.trn_request_uid)?
        .with_remark(payload.remark)
        .with_details(details);
    run(&state, &actor, command).await
}

pub async fn update_key_received(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage): Path<String>,
    ApiJson(payload): ApiJson<TransitionPayload>,
) -> TransitionResponse {
    run_plain(&state, &actor, &stage, Action::ReceiveKey, payload).await
}

pub async fn update_vehicle_pickup(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage): Path<String>,
    ApiJson(payload): ApiJson<VehiclePickupPayload>,
) -> TransitionResponse {
    payload.validate()?;
    let details = TransitionDetails::VehiclePickup(PickupDetails {
        mile_start: payload.mile_start,
        fuel_start: payload.fuel_start,
        pickup_datetime: payload.pickup_datetime,
    });
    let command = command(&stage, Action::PickUpVehicle, payload.trn_request_uid)?
        .with_remark(payload.remark)
        .with_details(details);
    run(&state, &actor, command).await
}

pub async fn update_vehicle_returned(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage): Path<String>,
    ApiJson(payload): ApiJson<VehicleReturnPayload>,
) -> TransitionResponse {
    payload.validate()?;
    let details = TransitionDetails::VehicleReturn(ReturnDetails {
        mile_end: payload.mile_end,
        fuel_end: payload.fuel_end,
        parking_place: payload.parking_place,
        returned_datetime: payload.returned_datetime,
    });
    let command = command(&stage, Action::ReturnVehicle, payload.trn_request_uid)?
        .with_remark(payload.remark)
        .with_details(details);
    run(&state, &actor, command).await
}

pub async fn update_return_accepted(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage): Path<String>,
    ApiJson(payload): ApiJson<TransitionPayload>,
) -> TransitionResponse {
    run_plain(&state, &actor, &stage, Action::AcceptReturn, payload).await
}

pub async fn update_canceled(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage): Path<String>,
    ApiJson(payload): ApiJson<ReasonPayload>,
) -> TransitionResponse {
    run_with_reason(&state, &actor, &stage, Action::Cancel, payload).await
}
