use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Datelike, Utc};
use serde::Serialize;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::common::{actor_stage, parse_optional_date, ApiJson, MessageResponse},
    models::{
        action_log::ActionLogEntry,
        actor::{Actor, ActorRole, Stage},
        booking_request::{
            BookingListItem, BookingRequest, BookingSearchQuery, CreateBookingRequest,
            Participants,
        },
        employee::Employee,
        key_handover::KeyHandover,
        progress::ProgressStep,
        request_status::{Phase, RequestStatus},
        vehicle::{Driver, Vehicle},
        PageParams, Pagination,
    },
    repositories::{
        begin_transaction,
        booking_request::{self as booking_repo, SearchFilters, SortColumn},
        commit_transaction, key_handover as key_repo, vehicle as vehicle_repo,
        EmployeeDirectory,
    },
    services::{
        action_log, progress,
        status_catalog::StatusSummary,
        transition_table::{available_actions, Action},
    },
    state::AppState,
    types::RequestUid,
    utils::time::{end_of_day_utc, start_of_day_utc, today_local},
};

#[derive(Debug, Serialize)]
pub struct BookingSearchResponse {
    pub pagination: Pagination,
    pub requests: Vec<BookingListItem>,
    pub summary: Vec<StatusSummary>,
}

#[derive(Debug, Serialize)]
pub struct BookingDetailResponse {
    #[serde(flatten)]
    pub request: BookingRequest,
    pub ref_request_status_name: Option<String>,
    /// Status code with the overdue suffix applied.
    pub display_status_code: String,
    pub progress_request_status: Vec<ProgressStep>,
    pub available_actions: Vec<Action>,
    pub can_choose_vehicle: bool,
    pub can_choose_driver: bool,
    pub key_handover: Option<KeyHandover>,
    pub vehicle: Option<Vehicle>,
    pub driver: Option<Driver>,
}

fn parse_status_filter(
    raw: Option<&str>,
    visible: &[RequestStatus],
) -> Result<Vec<RequestStatus>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(visible.to_vec());
    };
    let mut statuses = Vec::new();
    for code in raw.split(',').map(str::trim).filter(|code| !code.is_empty()) {
        let status = RequestStatus::from_code(code)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown status code `{}`", code)))?;
        if visible.contains(&status) && !statuses.contains(&status) {
            statuses.push(status);
        }
    }
    Ok(statuses)
}

fn parse_sort(q: &BookingSearchQuery) -> Result<(SortColumn, bool), AppError> {
    let sort = match q.order_by.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => SortColumn::parse(raw)
            .ok_or_else(|| AppError::BadRequest(format!("Unsupported order_by `{}`", raw)))?,
        None => SortColumn::default(),
    };
    let descending = match q.order_dir.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(dir) if dir.eq_ignore_ascii_case("desc") => true,
        Some(dir) if dir.eq_ignore_ascii_case("asc") => false,
        Some(dir) => {
            return Err(AppError::BadRequest(format!(
                "order_dir must be asc or desc, got `{}`",
                dir
            )))
        }
    };
    Ok((sort, descending))
}

pub async fn search_requests(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage): Path<String>,
    Query(q): Query<BookingSearchQuery>,
) -> Result<Json<BookingSearchResponse>, AppError> {
    let stage = actor_stage(&stage, &actor)?;
    let tz = state.config.time_zone;
    let visible = state.catalog.visible_codes(stage);

    let (sort, descending) = parse_sort(&q)?;
    let filters = SearchFilters {
        search: q.search.clone(),
        statuses: parse_status_filter(q.ref_request_status_code.as_deref(), &visible)?,
        reserve_from: parse_optional_date(q.startdate.as_deref())?
            .map(|date| start_of_day_utc(date, &tz)),
        reserve_to: parse_optional_date(q.enddate.as_deref())?
            .map(|date| end_of_day_utc(date, &tz)),
        sort,
        descending,
    };
    let page = PageParams::new(q.page, q.limit);

    let (rows, total) = booking_repo::search(&state.pool, &actor, stage, &filters, page).await?;

    // Summary counts cover every status the stage shows, not just the filter.
    let summary_filters = SearchFilters {
        statuses: visible,
        ..filters
    };
    let counts =
        booking_repo::count_by_status(&state.pool, &actor, stage, &summary_filters).await?;

    let now = Utc::now();
    let requests = rows
        .into_iter()
        .map(|row| {
            let status = row.ref_request_status_code;
            let label = state
                .catalog
                .label(stage, status)
                .map(str::to_string)
                .unwrap_or_else(|| status.code().to_string());
            BookingListItem::from_row(row, label, now)
        })
        .collect();

    Ok(Json(BookingSearchResponse {
        pagination: Pagination::new(total, page),
        requests,
        summary: state.catalog.summarize(stage, &counts),
    }))
}

async fn load_visible(
    state: &AppState,
    actor: &Actor,
    stage: Stage,
    uid: RequestUid,
) -> Result<BookingRequest, AppError> {
    booking_repo::find_visible(&state.pool, uid, actor, stage)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking request not found".to_string()))
}

pub async fn get_request(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((stage, uid)): Path<(String, RequestUid)>,
) -> Result<Json<BookingDetailResponse>, AppError> {
    let stage = actor_stage(&stage, &actor)?;
    let request = load_visible(&state, &actor, stage, uid).await?;

    let key_handover = key_repo::find_by_request(&state.pool, uid).await?;
    let vehicle = match request.mas_vehicle_uid {
        Some(id) => vehicle_repo::find_vehicle(&state.pool, id).await?,
        None => None,
    };
    let driver = match request.mas_driver_uid {
        Some(id) => vehicle_repo::find_driver(&state.pool, id).await?,
        None => None,
    };

    let mut steps = progress::render_request(&request);
    progress::attach_timestamps(&mut steps, &request, key_handover.as_ref());

    let actions = actor
        .role_in(stage, request.mas_carpool_uid)
        .map(|role| available_actions(request.status, role))
        .unwrap_or_default();

    let open_for_allocation =
        !request.status.is_terminal() && !request.status.has_reached(Phase::KeyHandover);

    Ok(Json(BookingDetailResponse {
        ref_request_status_name: state
            .catalog
            .label(stage, request.status)
            .map(str::to_string),
        display_status_code: request.status.display_code(
            request.reserve_start_datetime,
            request.reserve_end_datetime,
            Utc::now(),
        ),
        progress_request_status: steps,
        available_actions: actions,
        can_choose_vehicle: open_for_allocation && request.mas_vehicle_uid.is_none(),
        can_choose_driver: open_for_allocation && request.mas_driver_uid.is_none(),
        key_handover,
        vehicle,
        driver,
        request,
    }))
}

pub async fn list_action_logs(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((stage, uid)): Path<(String, RequestUid)>,
) -> Result<Json<Vec<ActionLogEntry>>, AppError> {
    let stage = actor_stage(&stage, &actor)?;
    load_visible(&state, &actor, stage, uid).await?;
    let history = state.action_logs.history(uid).await?;
    Ok(Json(history))
}

async fn lookup_employee(
    directory: &dyn EmployeeDirectory,
    emp_id: &str,
    field: &str,
) -> Result<Employee, AppError> {
    directory
        .find_employee(emp_id.trim())
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("{}: unknown employee `{}`", field, emp_id)))
}

/// Snapshots every participant named by the payload.
pub async fn resolve_participants(
    directory: &dyn EmployeeDirectory,
    creator: &Employee,
    payload: &CreateBookingRequest,
) -> Result<Participants, AppError> {
    let vehicle_user = match payload
        .vehicle_user_emp_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty() && *id != creator.emp_id)
    {
        Some(emp_id) => lookup_employee(directory, emp_id, "vehicle_user_emp_id").await?,
        None => creator.clone(),
    };
    let confirmer = lookup_employee(
        directory,
        &payload.confirmed_request_emp_id,
        "confirmed_request_emp_id",
    )
    .await?;
    let approver = match payload
        .approved_request_emp_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
    {
        Some(emp_id) => Some(lookup_employee(directory, emp_id, "approved_request_emp_id").await?),
        None => None,
    };

    Ok(Participants {
        vehicle_user,
        confirmer,
        approver,
    })
}

pub async fn create_request(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(stage): Path<String>,
    ApiJson(payload): ApiJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<MessageResponse<BookingRequest>>), AppError> {
    let stage = actor_stage(&stage, &actor)?;
    if stage != Stage::BookingUser {
        return Err(AppError::Forbidden(
            "Requests are created from the booking-user stage".to_string(),
        ));
    }
    payload.validate()?;

    let participants =
        resolve_participants(state.directory.as_ref(), &actor.employee, &payload).await?;

    let now = Utc::now();
    let year = today_local(&state.config.time_zone).year();
    let mut tx = begin_transaction::<AppError>(&state.pool).await?;

    if let Some(id) = payload.mas_vehicle_uid {
        if vehicle_repo::find_vehicle(tx.as_mut(), id).await?.is_none() {
            return Err(AppError::BadRequest("mas_vehicle_uid: unknown vehicle".to_string()));
        }
    }
    if let Some(id) = payload.mas_driver_uid {
        if vehicle_repo::find_driver(tx.as_mut(), id).await?.is_none() {
            return Err(AppError::BadRequest("mas_driver_uid: unknown driver".to_string()));
        }
    }

    let request_no = booking_repo::next_request_no(tx.as_mut(), year).await?;
    let request = BookingRequest::new(request_no, &payload, &actor.employee, &participants, now);
    booking_repo::insert(tx.as_mut(), &request).await?;

    action_log::append(
        tx.as_mut(),
        ActionLogEntry::new(
            request.trn_request_uid,
            request.status,
            "create",
            None,
            &actor,
            ActorRole::VehicleUser,
            request.remark.clone(),
            now,
        ),
    )
    .await?;
    commit_transaction::<AppError>(tx).await?;

    tracing::info!(
        request_uid = %request.trn_request_uid,
        request_no = %request.request_no,
        emp_id = %actor.emp_id(),
        "Booking request created"
    );

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Created successfully", request)),
    ))
}
