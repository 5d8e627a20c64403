//! Vehicle booking request rows and the payloads that create them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use validator::{Validate, ValidationError};

use crate::models::employee::Employee;
use crate::models::request_status::RequestStatus;
use crate::types::{CarpoolId, DriverId, RequestUid, VehicleId};
use crate::validation::rules;

/// Employee snapshot written into a request by one of its participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorStamp {
    pub emp_id: String,
    pub emp_name: String,
    pub dept_sap: String,
    pub dept_short: String,
    pub dept_full: String,
    pub position: String,
    pub desk_phone: Option<String>,
    pub mobile_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ActorStamp {
    pub fn from_employee(employee: &Employee) -> Self {
        Self {
            emp_id: employee.emp_id.clone(),
            emp_name: employee.full_name.clone(),
            dept_sap: employee.dept_sap.clone(),
            dept_short: employee.dept_short.clone(),
            dept_full: employee.dept_full.clone(),
            position: employee.position.clone(),
            desk_phone: employee.desk_phone.clone(),
            mobile_phone: employee.mobile_phone.clone(),
            datetime: None,
            reason: None,
        }
    }

    pub fn at(mut self, datetime: DateTime<Utc>) -> Self {
        self.datetime = Some(datetime);
        self
    }
}

/// Column prefixes of the snapshot groups on `vms_trn_request`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampColumns {
    VehicleUser,
    Created,
    Confirmed,
    Verified,
    Approved,
    Rejected,
    Canceled,
    SendedBack,
}

impl StampColumns {
    pub fn prefix(&self) -> &'static str {
        match self {
            StampColumns::VehicleUser => "vehicle_user",
            StampColumns::Created => "created_request",
            StampColumns::Confirmed => "confirmed_request",
            StampColumns::Verified => "verified_request",
            StampColumns::Approved => "approved_request",
            StampColumns::Rejected => "rejected_request",
            StampColumns::Canceled => "canceled_request",
            StampColumns::SendedBack => "sended_back_request",
        }
    }

    pub fn has_datetime(&self) -> bool {
        !matches!(self, StampColumns::VehicleUser)
    }

    pub fn has_reason(&self) -> bool {
        matches!(
            self,
            StampColumns::Rejected | StampColumns::Canceled | StampColumns::SendedBack
        )
    }

    /// The employee columns of the group, without datetime or reason.
    pub fn employee_columns(&self) -> [String; 8] {
        let prefix = self.prefix();
        [
            format!("{prefix}_emp_id"),
            format!("{prefix}_emp_name"),
            format!("{prefix}_dept_sap"),
            format!("{prefix}_dept_short"),
            format!("{prefix}_dept_full"),
            format!("{prefix}_position"),
            format!("{prefix}_desk_phone"),
            format!("{prefix}_mobile_phone"),
        ]
    }

    /// Reads the group from a row. `None` when the emp id column is NULL.
    fn read(&self, row: &PgRow) -> Result<Option<ActorStamp>, sqlx::Error> {
        let [
            emp_id,
            emp_name,
            dept_sap,
            dept_short,
            dept_full,
            position,
            desk_phone,
            mobile_phone,
        ] = self.employee_columns();
        let Some(emp_id) = row.try_get::<Option<String>, _>(emp_id.as_str())? else {
            return Ok(None);
        };
        let prefix = self.prefix();
        let datetime = if self.has_datetime() {
            row.try_get(format!("{prefix}_datetime").as_str())?
        } else {
            None
        };
        let reason = if self.has_reason() {
            row.try_get(format!("{prefix}_reason").as_str())?
        } else {
            None
        };
        Ok(Some(ActorStamp {
            emp_id,
            emp_name: row
                .try_get::<Option<String>, _>(emp_name.as_str())?
                .unwrap_or_default(),
            dept_sap: row
                .try_get::<Option<String>, _>(dept_sap.as_str())?
                .unwrap_or_default(),
            dept_short: row
                .try_get::<Option<String>, _>(dept_short.as_str())?
                .unwrap_or_default(),
            dept_full: row
                .try_get::<Option<String>, _>(dept_full.as_str())?
                .unwrap_or_default(),
            position: row
                .try_get::<Option<String>, _>(position.as_str())?
                .unwrap_or_default(),
            desk_phone: row.try_get(desk_phone.as_str())?,
            mobile_phone: row.try_get(mobile_phone.as_str())?,
            datetime,
            reason,
        }))
    }

    fn read_required(&self, row: &PgRow) -> Result<ActorStamp, sqlx::Error> {
        self.read(row)?.ok_or_else(|| sqlx::Error::ColumnDecode {
            index: format!("{}_emp_id", self.prefix()),
            source: "required snapshot is NULL".into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingRequest {
    pub trn_request_uid: RequestUid,
    pub request_no: String,
    #[serde(rename = "ref_request_status_code")]
    pub status: RequestStatus,
    pub work_place: String,
    pub objective: String,
    pub remark: Option<String>,
    pub reserve_start_datetime: DateTime<Utc>,
    pub reserve_end_datetime: DateTime<Utc>,
    pub number_of_passengers: i32,

    pub vehicle_user: ActorStamp,
    pub created_request: ActorStamp,
    pub confirmed_request: ActorStamp,
    pub verified_request: Option<ActorStamp>,
    pub approved_request: Option<ActorStamp>,
    pub rejected_request: Option<ActorStamp>,
    pub canceled_request: Option<ActorStamp>,
    pub canceled_request_role: Option<String>,
    pub sended_back_request: Option<ActorStamp>,

    pub mas_vehicle_uid: Option<VehicleId>,
    pub mas_driver_uid: Option<DriverId>,
    pub mas_carpool_uid: Option<CarpoolId>,
    pub mas_vehicle_department_dept_sap: Option<String>,

    pub pickup_datetime: Option<DateTime<Utc>>,
    pub mile_start: Option<i64>,
    pub fuel_start: Option<i32>,
    pub returned_datetime: Option<DateTime<Utc>>,
    pub mile_end: Option<i64>,
    pub fuel_end: Option<i32>,
    pub parking_place: Option<String>,

    #[serde(skip)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

impl<'r> FromRow<'r, PgRow> for BookingRequest {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let code: String = row.try_get("ref_request_status_code")?;
        let status =
            RequestStatus::try_from(code).map_err(|err| sqlx::Error::ColumnDecode {
                index: "ref_request_status_code".to_string(),
                source: Box::new(err),
            })?;

        Ok(Self {
            trn_request_uid: row.try_get("trn_request_uid")?,
            request_no: row.try_get("request_no")?,
            status,
            work_place: row.try_get("work_place")?,
            objective: row.try_get("objective")?,
            remark: row.try_get("remark")?,
            reserve_start_datetime: row.try_get("reserve_start_datetime")?,
            reserve_end_datetime: row.try_get("reserve_end_datetime")?,
            number_of_passengers: row.try_get("number_of_passengers")?,
            vehicle_user: StampColumns::VehicleUser.read_required(row)?,
            created_request: StampColumns::Created.read_required(row)?,
            confirmed_request: StampColumns::Confirmed.read_required(row)?,
            verified_request: StampColumns::Verified.read(row)?,
            approved_request: StampColumns::Approved.read(row)?,
            rejected_request: StampColumns::Rejected.read(row)?,
            canceled_request: StampColumns::Canceled.read(row)?,
            canceled_request_role: row.try_get("canceled_request_role")?,
            sended_back_request: StampColumns::SendedBack.read(row)?,
            mas_vehicle_uid: row.try_get("mas_vehicle_uid")?,
            mas_driver_uid: row.try_get("mas_driver_uid")?,
            mas_carpool_uid: row.try_get("mas_carpool_uid")?,
            mas_vehicle_department_dept_sap: row.try_get("mas_vehicle_department_dept_sap")?,
            pickup_datetime: row.try_get("pickup_datetime")?,
            mile_start: row.try_get("mile_start")?,
            fuel_start: row.try_get("fuel_start")?,
            returned_datetime: row.try_get("returned_datetime")?,
            mile_end: row.try_get("mile_end")?,
            fuel_end: row.try_get("fuel_end")?,
            parking_place: row.try_get("parking_place")?,
            is_deleted: row.try_get("is_deleted")?,
            created_at: row.try_get("created_at")?,
            created_by: row.try_get("created_by")?,
            updated_at: row.try_get("updated_at")?,
            updated_by: row.try_get("updated_by")?,
        })
    }
}

/// Participants resolved from the directory when a request is created.
#[derive(Debug, Clone)]
pub struct Participants {
    pub vehicle_user: Employee,
    pub confirmer: Employee,
    pub approver: Option<Employee>,
}

impl BookingRequest {
    pub fn new(
        request_no: String,
        payload: &CreateBookingRequest,
        creator: &Employee,
        participants: &Participants,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            trn_request_uid: RequestUid::new(),
            request_no,
            status: RequestStatus::WaitingConfirmation,
            work_place: payload.work_place.trim().to_string(),
            objective: payload.objective.trim().to_string(),
            remark: payload.remark.clone(),
            reserve_start_datetime: payload.reserve_start_datetime,
            reserve_end_datetime: payload.reserve_end_datetime,
            number_of_passengers: payload.number_of_passengers,
            vehicle_user: ActorStamp::from_employee(&participants.vehicle_user),
            created_request: ActorStamp::from_employee(creator).at(now),
            confirmed_request: ActorStamp::from_employee(&participants.confirmer),
            verified_request: None,
            approved_request: participants.approver.as_ref().map(ActorStamp::from_employee),
            rejected_request: None,
            canceled_request: None,
            canceled_request_role: None,
            sended_back_request: None,
            mas_vehicle_uid: payload.mas_vehicle_uid,
            mas_driver_uid: payload.mas_driver_uid,
            mas_carpool_uid: payload.mas_carpool_uid,
            mas_vehicle_department_dept_sap: payload.mas_vehicle_department_dept_sap.clone(),
            pickup_datetime: None,
            mile_start: None,
            fuel_start: None,
            returned_datetime: None,
            mile_end: None,
            fuel_end: None,
            parking_place: None,
            is_deleted: false,
            created_at: now,
            created_by: creator.emp_id.clone(),
            updated_at: now,
            updated_by: creator.emp_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_reservation_window"))]
pub struct CreateBookingRequest {
    #[validate(
        length(min = 1, max = 255),
        custom(function = "rules::validate_not_blank")
    )]
    pub work_place: String,
    #[validate(
        length(min = 1, max = 1000),
        custom(function = "rules::validate_not_blank")
    )]
    pub objective: String,
    #[validate(length(max = 1000))]
    pub remark: Option<String>,
    pub reserve_start_datetime: DateTime<Utc>,
    pub reserve_end_datetime: DateTime<Utc>,
    #[validate(range(min = 1, max = 100))]
    #[serde(default = "default_passengers")]
    pub number_of_passengers: i32,
    /// Employee who will use the vehicle; defaults to the caller.
    pub vehicle_user_emp_id: Option<String>,
    #[validate(custom(function = "rules::validate_emp_id"))]
    pub confirmed_request_emp_id: String,
    pub approved_request_emp_id: Option<String>,
    pub mas_vehicle_uid: Option<VehicleId>,
    pub mas_driver_uid: Option<DriverId>,
    pub mas_carpool_uid: Option<CarpoolId>,
    pub mas_vehicle_department_dept_sap: Option<String>,
}

fn default_passengers() -> i32 {
    1
}

fn validate_reservation_window(payload: &CreateBookingRequest) -> Result<(), ValidationError> {
    if payload.reserve_end_datetime <= payload.reserve_start_datetime {
        let mut err = ValidationError::new("reserve_end_before_start");
        err.message = Some("reserve_end_datetime must be after reserve_start_datetime".into());
        return Err(err);
    }
    let has_department = payload
        .mas_vehicle_department_dept_sap
        .as_deref()
        .is_some_and(|dept| !dept.trim().is_empty());
    if !has_department && payload.mas_carpool_uid.is_none() {
        let mut err = ValidationError::new("vehicle_owner_required");
        err.message =
            Some("mas_vehicle_department_dept_sap or mas_carpool_uid is required".into());
        return Err(err);
    }
    let has_approver = payload
        .approved_request_emp_id
        .as_deref()
        .is_some_and(|emp_id| !emp_id.trim().is_empty());
    if !has_approver && payload.mas_carpool_uid.is_none() {
        let mut err = ValidationError::new("approver_required");
        err.message =
            Some("approved_request_emp_id is required unless a carpool is booked".into());
        return Err(err);
    }
    Ok(())
}

/// Row shape used by the list endpoint.
#[derive(Debug, Clone, FromRow)]
pub struct BookingListRow {
    pub trn_request_uid: RequestUid,
    pub request_no: String,
    #[sqlx(try_from = "String")]
    pub ref_request_status_code: RequestStatus,
    pub vehicle_user_emp_id: String,
    pub vehicle_user_emp_name: String,
    pub vehicle_user_dept_short: String,
    pub work_place: String,
    pub reserve_start_datetime: DateTime<Utc>,
    pub reserve_end_datetime: DateTime<Utc>,
    pub vehicle_license_plate: Option<String>,
    pub canceled_request_role: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingListItem {
    pub trn_request_uid: RequestUid,
    pub request_no: String,
    pub ref_request_status_code: String,
    pub ref_request_status_name: String,
    pub vehicle_user_emp_id: String,
    pub vehicle_user_emp_name: String,
    pub vehicle_user_dept_short: String,
    pub work_place: String,
    pub reserve_start_datetime: DateTime<Utc>,
    pub reserve_end_datetime: DateTime<Utc>,
    pub vehicle_license_plate: Option<String>,
    pub canceled_request_role: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BookingListItem {
    pub fn from_row(row: BookingListRow, status_name: String, now: DateTime<Utc>) -> Self {
        Self {
            ref_request_status_code: row.ref_request_status_code.display_code(
                row.reserve_start_datetime,
                row.reserve_end_datetime,
                now,
            ),
            ref_request_status_name: status_name,
            trn_request_uid: row.trn_request_uid,
            request_no: row.request_no,
            vehicle_user_emp_id: row.vehicle_user_emp_id,
            vehicle_user_emp_name: row.vehicle_user_emp_name,
            vehicle_user_dept_short: row.vehicle_user_dept_short,
            work_place: row.work_place,
            reserve_start_datetime: row.reserve_start_datetime,
            reserve_end_datetime: row.reserve_end_datetime,
            vehicle_license_plate: row.vehicle_license_plate,
            canceled_request_role: row.canceled_request_role,
            created_at: row.created_at,
        }
    }
}

/// Query string accepted by the search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingSearchQuery {
    pub search: Option<String>,
    /// Comma separated status codes.
    pub ref_request_status_code: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339; bounds the reserve window.
    pub startdate: Option<String>,
    pub enddate: Option<String>,
    pub order_by: Option<String>,
    pub order_dir: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
