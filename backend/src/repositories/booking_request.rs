//! Booking request persistence and role-scoped lookups.

use chrono::{DateTime, Utc};
use sqlx::query_builder::Separated;
use sqlx::{PgConnection, PgExecutor, Postgres, QueryBuilder};

use crate::models::actor::{Actor, ActorRole, Stage};
use crate::models::booking_request::{
    ActorStamp, BookingListRow, BookingRequest, StampColumns,
};
use crate::models::employee::Employee;
use crate::models::request_status::RequestStatus;
use crate::models::PageParams;
use crate::repositories::common::{like_pattern, push_clause};
use crate::types::{raw_uuids, DriverId, RequestUid, VehicleId};

const SELECT_REQUEST: &str = "SELECT r.* FROM vms_trn_request r";
const LIST_COLUMNS: &str = "r.trn_request_uid, r.request_no, r.ref_request_status_code, \
     r.vehicle_user_emp_id, r.vehicle_user_emp_name, r.vehicle_user_dept_short, r.work_place, \
     r.reserve_start_datetime, r.reserve_end_datetime, v.vehicle_license_plate, \
     r.canceled_request_role, r.created_at";
const LIST_FROM: &str =
    " FROM vms_trn_request r LEFT JOIN mas_vehicles v ON v.mas_vehicle_uid = r.mas_vehicle_uid";

/// Appends the condition restricting rows to what `actor` may see in `stage`.
pub fn push_visibility(builder: &mut QueryBuilder<'_, Postgres>, actor: &Actor, stage: Stage) {
    let emp_id = actor.emp_id().to_string();
    builder.push("(");
    match stage {
        Stage::BookingUser => {
            builder
                .push("r.created_request_emp_id = ")
                .push_bind(emp_id.clone())
                .push(" OR r.vehicle_user_emp_id = ")
                .push_bind(emp_id);
        }
        Stage::BookingConfirmer => {
            builder.push("r.confirmed_request_emp_id = ").push_bind(emp_id);
        }
        Stage::BookingAdmin => {
            builder
                .push("r.mas_vehicle_department_dept_sap = ANY(")
                .push_bind(actor.scope.admin_dept_saps.clone())
                .push(") OR r.mas_carpool_uid = ANY(")
                .push_bind(raw_uuids(&actor.scope.admin_carpools))
                .push(")");
        }
        Stage::BookingFinal => {
            builder
                .push("r.approved_request_emp_id = ")
                .push_bind(emp_id)
                .push(" OR r.mas_carpool_uid = ANY(")
                .push_bind(raw_uuids(&actor.scope.approver_carpools))
                .push(")");
        }
        Stage::Driver => {
            builder
                .push("r.mas_driver_uid = ANY(")
                .push_bind(raw_uuids(&actor.scope.driver_uids))
                .push(")");
        }
    }
    builder.push(")");
}

fn visible_query(
    uid: RequestUid,
    actor: &Actor,
    stage: Stage,
    lock: bool,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(SELECT_REQUEST);
    builder
        .push(" WHERE r.is_deleted = FALSE AND r.trn_request_uid = ")
        .push_bind(uid)
        .push(" AND ");
    push_visibility(&mut builder, actor, stage);
    if lock {
        builder.push(" FOR UPDATE");
    }
    builder
}

pub async fn find_visible<'e, E>(
    executor: E,
    uid: RequestUid,
    actor: &Actor,
    stage: Stage,
) -> Result<Option<BookingRequest>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    visible_query(uid, actor, stage, false)
        .build_query_as::<BookingRequest>()
        .fetch_optional(executor)
        .await
}

/// Same as [`find_visible`] but takes a row lock held until the transaction ends.
pub async fn lock_visible(
    conn: &mut PgConnection,
    uid: RequestUid,
    actor: &Actor,
    stage: Stage,
) -> Result<Option<BookingRequest>, sqlx::Error> {
    visible_query(uid, actor, stage, true)
        .build_query_as::<BookingRequest>()
        .fetch_optional(conn)
        .await
}

pub async fn find_by_uid<'e, E>(executor: E, uid: RequestUid) -> Result<BookingRequest, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, BookingRequest>(
        "SELECT r.* FROM vms_trn_request r WHERE r.trn_request_uid = $1",
    )
    .bind(uid)
    .fetch_one(executor)
    .await
}

/// Draws the next request number for the given local year, e.g. `VA2025000042`.
pub async fn next_request_no(conn: &mut PgConnection, year: i32) -> Result<String, sqlx::Error> {
    let seq: i64 = sqlx::query_scalar("SELECT nextval('vms_trn_request_no_seq')")
        .fetch_one(conn)
        .await?;
    Ok(format!("VA{}{:06}", year, seq))
}

fn push_stamp_columns(builder: &mut QueryBuilder<'_, Postgres>, group: StampColumns) {
    for column in group.employee_columns() {
        builder.push(", ").push(column);
    }
    if group.has_datetime() {
        builder.push(format_args!(", {}_datetime", group.prefix()));
    }
}

fn push_stamp_values(
    values: &mut Separated<'_, '_, Postgres, &'static str>,
    group: StampColumns,
    stamp: Option<&ActorStamp>,
) {
    values
        .push_bind(stamp.map(|s| s.emp_id.clone()))
        .push_bind(stamp.map(|s| s.emp_name.clone()))
        .push_bind(stamp.map(|s| s.dept_sap.clone()))
        .push_bind(stamp.map(|s| s.dept_short.clone()))
        .push_bind(stamp.map(|s| s.dept_full.clone()))
        .push_bind(stamp.map(|s| s.position.clone()))
        .push_bind(stamp.and_then(|s| s.desk_phone.clone()))
        .push_bind(stamp.and_then(|s| s.mobile_phone.clone()));
    if group.has_datetime() {
        values.push_bind(stamp.and_then(|s| s.datetime));
    }
}

/// Inserts a freshly created request with its creation-time snapshots.
pub async fn insert(conn: &mut PgConnection, request: &BookingRequest) -> Result<(), sqlx::Error> {
    let groups = [
        (StampColumns::VehicleUser, Some(&request.vehicle_user)),
        (StampColumns::Created, Some(&request.created_request)),
        (StampColumns::Confirmed, Some(&request.confirmed_request)),
        (StampColumns::Approved, request.approved_request.as_ref()),
    ];

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO vms_trn_request (trn_request_uid, request_no, ref_request_status_code, \
         work_place, objective, remark, reserve_start_datetime, reserve_end_datetime, \
         number_of_passengers, mas_vehicle_uid, mas_driver_uid, mas_carpool_uid, \
         mas_vehicle_department_dept_sap, is_deleted, created_at, created_by, updated_at, updated_by",
    );
    for (group, _) in &groups {
        push_stamp_columns(&mut builder, *group);
    }
    builder.push(") VALUES (");

    let mut values = builder.separated(", ");
    values
        .push_bind(request.trn_request_uid)
        .push_bind(request.request_no.clone())
        .push_bind(request.status.code())
        .push_bind(request.work_place.clone())
        .push_bind(request.objective.clone())
        .push_bind(request.remark.clone())
        .push_bind(request.reserve_start_datetime)
        .push_bind(request.reserve_end_datetime)
        .push_bind(request.number_of_passengers)
        .push_bind(request.mas_vehicle_uid)
        .push_bind(request.mas_driver_uid)
        .push_bind(request.mas_carpool_uid)
        .push_bind(request.mas_vehicle_department_dept_sap.clone())
        .push_bind(request.is_deleted)
        .push_bind(request.created_at)
        .push_bind(request.created_by.clone())
        .push_bind(request.updated_at)
        .push_bind(request.updated_by.clone());
    for (group, stamp) in groups {
        push_stamp_values(&mut values, group, stamp);
    }
    values.push_unseparated(")");

    builder.build().execute(conn).await.map(|_| ())
}

/// Column writes performed by one status transition.
#[derive(Debug, Clone)]
pub struct StatusChange<'a> {
    pub uid: RequestUid,
    pub to: RequestStatus,
    pub stamp: Option<(StampColumns, &'a Employee)>,
    pub reason: Option<&'a str>,
    pub canceled_role: Option<ActorRole>,
    pub at: DateTime<Utc>,
    pub by: &'a str,
}

pub async fn apply_status_change(
    conn: &mut PgConnection,
    change: &StatusChange<'_>,
) -> Result<u64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "UPDATE vms_trn_request SET ref_request_status_code = ",
    );
    builder.push_bind(change.to.code());

    if let Some((group, employee)) = change.stamp {
        let [
            emp_id,
            emp_name,
            dept_sap,
            dept_short,
            dept_full,
            position,
            desk_phone,
            mobile_phone,
        ] = group.employee_columns();
        builder
            .push(format_args!(", {emp_id} = "))
            .push_bind(employee.emp_id.clone())
            .push(format_args!(", {emp_name} = "))
            .push_bind(employee.full_name.clone())
            .push(format_args!(", {dept_sap} = "))
            .push_bind(employee.dept_sap.clone())
            .push(format_args!(", {dept_short} = "))
            .push_bind(employee.dept_short.clone())
            .push(format_args!(", {dept_full} = "))
            .push_bind(employee.dept_full.clone())
            .push(format_args!(", {position} = "))
            .push_bind(employee.position.clone())
            .push(format_args!(", {desk_phone} = "))
            .push_bind(employee.desk_phone.clone())
            .push(format_args!(", {mobile_phone} = "))
            .push_bind(employee.mobile_phone.clone());
        if group.has_datetime() {
            builder
                .push(format_args!(", {}_datetime = ", group.prefix()))
                .push_bind(change.at);
        }
        if group.has_reason() {
            builder
                .push(format_args!(", {}_reason = ", group.prefix()))
                .push_bind(change.reason.map(str::to_string));
        }
    }

    if let Some(role) = change.canceled_role {
        builder
            .push(", canceled_request_role = ")
            .push_bind(role.as_str());
    }

    builder
        .push(", updated_at = ")
        .push_bind(change.at)
        .push(", updated_by = ")
        .push_bind(change.by.to_string())
        .push(" WHERE trn_request_uid = ")
        .push_bind(change.uid);

    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn assign_vehicle(
    conn: &mut PgConnection,
    uid: RequestUid,
    vehicle: VehicleId,
    driver: Option<DriverId>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE vms_trn_request \
         SET mas_vehicle_uid = $1, mas_driver_uid = COALESCE($2, mas_driver_uid) \
         WHERE trn_request_uid = $3",
    )
    .bind(vehicle)
    .bind(driver)
    .bind(uid)
    .execute(conn)
    .await
    .map(|_| ())
}

pub async fn record_pickup(
    conn: &mut PgConnection,
    uid: RequestUid,
    at: DateTime<Utc>,
    mile_start: i64,
    fuel_start: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE vms_trn_request SET pickup_datetime = $1, mile_start = $2, fuel_start = $3 \
         WHERE trn_request_uid = $4",
    )
    .bind(at)
    .bind(mile_start)
    .bind(fuel_start)
    .bind(uid)
    .execute(conn)
    .await
    .map(|_| ())
}

pub async fn record_return(
    conn: &mut PgConnection,
    uid: RequestUid,
    at: DateTime<Utc>,
    mile_end: i64,
    fuel_end: i32,
    parking_place: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE vms_trn_request \
         SET returned_datetime = $1, mile_end = $2, fuel_end = $3, parking_place = $4 \
         WHERE trn_request_uid = $5",
    )
    .bind(at)
    .bind(mile_end)
    .bind(fuel_end)
    .bind(parking_place)
    .bind(uid)
    .execute(conn)
    .await
    .map(|_| ())
}

/// Sort column accepted by the list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    RequestNo,
    #[default]
    StartDatetime,
    Status,
}

impl SortColumn {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "request_no" => Some(SortColumn::RequestNo),
            "start_datetime" => Some(SortColumn::StartDatetime),
            "ref_request_status_code" => Some(SortColumn::Status),
            _ => None,
        }
    }

    fn push_to(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        match self {
            SortColumn::RequestNo => {
                builder.push("r.request_no");
            }
            SortColumn::StartDatetime => {
                builder.push("r.reserve_start_datetime");
            }
            SortColumn::Status => push_status_rank(builder),
        }
    }
}

/// Orders status codes by their place in the lifecycle, not as text.
fn push_status_rank(builder: &mut QueryBuilder<'_, Postgres>) {
    builder.push("CASE r.ref_request_status_code");
    for (rank, status) in RequestStatus::ALL.iter().enumerate() {
        builder.push(format!(" WHEN '{}' THEN {}", status.code(), rank));
    }
    builder.push(" END");
}

/// Filters for the role-scoped request list.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub search: Option<String>,
    /// Status codes to include; empty matches nothing.
    pub statuses: Vec<RequestStatus>,
    pub reserve_from: Option<DateTime<Utc>>,
    pub reserve_to: Option<DateTime<Utc>>,
    pub sort: SortColumn,
    pub descending: bool,
}

fn push_search_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    actor: &Actor,
    stage: Stage,
    filters: &SearchFilters,
) {
    let mut has_clause = false;
    push_clause(builder, &mut has_clause);
    builder.push("r.is_deleted = FALSE");

    push_clause(builder, &mut has_clause);
    push_visibility(builder, actor, stage);

    let codes: Vec<String> = filters.statuses.iter().map(|s| s.code().to_string()).collect();
    push_clause(builder, &mut has_clause);
    builder
        .push("r.ref_request_status_code = ANY(")
        .push_bind(codes)
        .push(")");

    if let Some(term) = filters.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = like_pattern(term);
        push_clause(builder, &mut has_clause);
        builder
            .push("(r.request_no ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR r.vehicle_user_emp_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR r.work_place ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR v.vehicle_license_plate ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(from) = filters.reserve_from {
        push_clause(builder, &mut has_clause);
        builder.push("r.reserve_end_datetime >= ").push_bind(from);
    }
    if let Some(to) = filters.reserve_to {
        push_clause(builder, &mut has_clause);
        builder.push("r.reserve_start_datetime < ").push_bind(to);
    }
}

/// Returns one page of visible requests and the total match count.
pub async fn search<'e, E>(
    executor: E,
    actor: &Actor,
    stage: Stage,
    filters: &SearchFilters,
    page: PageParams,
) -> Result<(Vec<BookingListRow>, i64), sqlx::Error>
where
    E: PgExecutor<'e> + Copy,
{
    let mut count_builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
    count_builder.push(LIST_FROM);
    push_search_filters(&mut count_builder, actor, stage, filters);
    let total: i64 = count_builder
        .build_query_scalar()
        .fetch_one(executor)
        .await?;

    let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
    builder.push(LIST_COLUMNS).push(LIST_FROM);
    push_search_filters(&mut builder, actor, stage, filters);
    builder.push(" ORDER BY ");
    filters.sort.push_to(&mut builder);
    builder
        .push(if filters.descending { " DESC" } else { " ASC" })
        .push(", r.request_no DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let rows = builder
        .build_query_as::<BookingListRow>()
        .fetch_all(executor)
        .await?;

    Ok((rows, total))
}

/// Counts visible requests per status code under the same filters.
pub async fn count_by_status<'e, E>(
    executor: E,
    actor: &Actor,
    stage: Stage,
    filters: &SearchFilters,
) -> Result<Vec<(RequestStatus, i64)>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT r.ref_request_status_code, COUNT(*)");
    builder.push(LIST_FROM);
    push_search_filters(&mut builder, actor, stage, filters);
    builder.push(" GROUP BY r.ref_request_status_code");

    let rows: Vec<(String, i64)> = builder.build_query_as().fetch_all(executor).await?;
    Ok(rows
        .into_iter()
        .filter_map(|(code, count)| RequestStatus::from_code(&code).map(|s| (s, count)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::actor::ActorScope;
    use crate::types::CarpoolId;

    fn actor() -> Actor {
        Actor {
            employee: Employee {
                emp_id: "E100".into(),
                full_name: "Somchai".into(),
                dept_sap: "D1".into(),
                dept_short: "D1".into(),
                dept_full: "Department One".into(),
                position: "Officer".into(),
                desk_phone: None,
                mobile_phone: None,
            },
            roles: vec![ActorRole::VehicleUser, ActorRole::AdminCarpool],
            scope: ActorScope {
                admin_carpools: vec![CarpoolId::new()],
                ..ActorScope::default()
            },
        }
    }

    #[test]
    fn visibility_scope_per_stage() {
        let actor = actor();
        let cases = [
            (
                Stage::BookingUser,
                "(r.created_request_emp_id = $1 OR r.vehicle_user_emp_id = $2)",
            ),
            (Stage::BookingConfirmer, "(r.confirmed_request_emp_id = $1)"),
            (
                Stage::BookingAdmin,
                "(r.mas_vehicle_department_dept_sap = ANY($1) OR r.mas_carpool_uid = ANY($2))",
            ),
            (
                Stage::BookingFinal,
                "(r.approved_request_emp_id = $1 OR r.mas_carpool_uid = ANY($2))",
            ),
            (Stage::Driver, "(r.mas_driver_uid = ANY($1))"),
        ];
        for (stage, expected) in cases {
            let mut builder = QueryBuilder::<Postgres>::new("");
            push_visibility(&mut builder, &actor, stage);
            assert_eq!(builder.sql(), expected, "stage {stage}");
        }
    }

    #[test]
    fn locked_lookup_appends_for_update() {
        let actor = actor();
        let sql = visible_query(RequestUid::new(), &actor, Stage::BookingUser, true)
            .sql()
            .to_string();
        assert!(sql.starts_with("SELECT r.* FROM vms_trn_request r WHERE r.is_deleted = FALSE"));
        assert!(sql.ends_with(" FOR UPDATE"));
    }

    #[test]
    fn search_filters_only_add_requested_clauses() {
        let actor = actor();
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1");
        push_search_filters(
            &mut builder,
            &actor,
            Stage::BookingConfirmer,
            &SearchFilters::default(),
        );
        assert_eq!(
            builder.sql(),
            "SELECT 1 WHERE r.is_deleted = FALSE AND (r.confirmed_request_emp_id = $1) \
             AND r.ref_request_status_code = ANY($2)"
        );

        let filters = SearchFilters {
            search: Some("VA2025".into()),
            reserve_from: Some(Utc::now()),
            ..SearchFilters::default()
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1");
        push_search_filters(&mut builder, &actor, Stage::BookingConfirmer, &filters);
        let sql = builder.sql();
        assert!(sql.contains("r.request_no ILIKE $3"));
        assert!(sql.contains("v.vehicle_license_plate ILIKE $6"));
        assert!(sql.ends_with("r.reserve_end_datetime >= $7"));
    }

    #[test]
    fn sort_column_parses_known_names() {
        assert_eq!(SortColumn::parse("request_no"), Some(SortColumn::RequestNo));
        assert_eq!(
            SortColumn::parse("ref_request_status_code"),
            Some(SortColumn::Status)
        );
        assert_eq!(SortColumn::parse("r.request_no; DROP TABLE"), None);
    }

    #[test]
    fn status_sort_uses_lifecycle_rank() {
        let mut builder = QueryBuilder::<Postgres>::new("");
        SortColumn::Status.push_to(&mut builder);
        let sql = builder.sql();
        assert!(
            sql.starts_with("CASE r.ref_request_status_code WHEN '10' THEN 0 WHEN '20' THEN 1 ")
        );
        assert!(sql.contains("WHEN '80' THEN 12"));
        assert!(sql.contains("WHEN '94' THEN 17"));
        assert!(sql.ends_with(" END"));
    }
}
