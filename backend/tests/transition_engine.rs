use chrono::{Duration, Utc};
use sqlx::PgPool;
use vms_backend::{
    error::WorkflowError,
    models::{
        actor::{ActorRole, ActorScope, Stage},
        progress::ProgressIcon,
        request_status::RequestStatus,
    },
    repositories::key_handover as key_repo,
    services::{
        hooks::{
            KeyHandoverDetails, PickupDetails, ReturnDetails, TransitionDetails, TransitionHooks,
        },
        progress::progress_view,
        transition_engine::{TransitionCommand, TransitionEngine},
        transition_table::Action,
    },
    types::DriverId,
};

mod support;
use support::{
    action_log_count, actor, request_status, seed_driver, seed_employee, seed_request,
    seed_vehicle, set_mile_start, Cast,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

fn engine(pool: &PgPool) -> TransitionEngine {
    TransitionEngine::new(pool.clone(), TransitionHooks::standard())
}

#[sqlx::test(migrations = "./migrations")]
async fn confirmer_moves_request_to_verification(pool: PgPool) {
    init_tracing();
    let cast = Cast::seed(&pool).await;
    let request = seed_request(&pool, &cast, RequestStatus::WaitingConfirmation, None).await;

    let outcome = engine(&pool)
        .apply(
            &cast.confirmer_actor(),
            TransitionCommand::new(
                request.trn_request_uid,
                Stage::BookingConfirmer,
                Action::Confirm,
            ),
        )
        .await
        .expect("confirm");

    assert_eq!(outcome.from, RequestStatus::WaitingConfirmation);
    assert_eq!(outcome.request.status, RequestStatus::WaitingVerification);
    assert_eq!(outcome.role, ActorRole::Level1Approval);
    assert_eq!(
        outcome.log.ref_request_status_code,
        RequestStatus::WaitingVerification
    );
    assert_eq!(outcome.log.action_by_emp_id, cast.confirmer.emp_id);
    assert!(outcome.request.confirmed_request.datetime.is_some());

    let steps = progress_view(outcome.request.status.code(), "");
    assert_eq!(steps.len(), 3);
    assert_eq!(steps[1].progress_icon, ProgressIcon::InProgress);
}

#[sqlx::test(migrations = "./migrations")]
async fn admin_sends_back_request_during_allocation(pool: PgPool) {
    init_tracing();
    let cast = Cast::seed(&pool).await;
    let request = seed_request(&pool, &cast, RequestStatus::WaitingAllocation, None).await;

    let outcome = engine(&pool)
        .apply(
            &cast.admin_actor(),
            TransitionCommand::new(request.trn_request_uid, Stage::BookingAdmin, Action::Reject)
                .with_reason(Some("no vehicle available that day".into())),
        )
        .await
        .expect("reject");

    assert_eq!(outcome.request.status, RequestStatus::SentBackInAllocation);
    assert_eq!(outcome.role, ActorRole::AdminDepartment);
    assert_eq!(
        outcome.log.reason.as_deref(),
        Some("no vehicle available that day")
    );
    let sent_back = outcome.request.sended_back_request.expect("sent back stamp");
    assert_eq!(sent_back.emp_id, cast.admin.emp_id);

    let steps = progress_view("41", "");
    let last = steps.last().expect("steps");
    assert_eq!(last.progress_icon, ProgressIcon::Failed);
    assert!(last.progress_name.contains("ตีกลับ"));
}

#[sqlx::test(migrations = "./migrations")]
async fn user_cancel_during_trip_records_role(pool: PgPool) {
    init_tracing();
    let cast = Cast::seed(&pool).await;
    let request = seed_request(&pool, &cast, RequestStatus::InUse, None).await;

    let outcome = engine(&pool)
        .apply(
            &cast.user_actor(),
            TransitionCommand::new(request.trn_request_uid, Stage::BookingUser, Action::Cancel)
                .with_reason(Some("meeting moved online".into())),
        )
        .await
        .expect("cancel");

    assert_eq!(outcome.request.status, RequestStatus::CanceledByVehicleUser);
    assert_eq!(
        outcome.request.canceled_request_role.as_deref(),
        Some("vehicle-user")
    );

    let steps = progress_view("90", "vehicle-user");
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].progress_icon, ProgressIcon::Failed);
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_decisions_commit_exactly_once(pool: PgPool) {
    init_tracing();
    let cast = Cast::seed(&pool).await;
    let request = seed_request(&pool, &cast, RequestStatus::WaitingFinalApproval, None).await;
    let engine = engine(&pool);
    let approver = cast.approver_actor();

    let uid = request.trn_request_uid;
    let approve = engine.apply(
        &approver,
        TransitionCommand::new(uid, Stage::BookingFinal, Action::Approve),
    );
    let reject = engine.apply(
        &approver,
        TransitionCommand::new(uid, Stage::BookingFinal, Action::Reject)
            .with_reason(Some("budget".into())),
    );
    let (approved, rejected) = tokio::join!(approve, reject);

    let results = [approved, rejected];
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(WorkflowError::CannotUpdate { .. })))
        .count();
    assert_eq!(succeeded, 1);
    assert_eq!(refused, 1);
    assert_eq!(action_log_count(&pool, &request).await, 1);

    let status = request_status(&pool, &request).await;
    assert!(
        status == "40" || status == "31",
        "unexpected status {}",
        status
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn full_trip_runs_hooks_and_logs_every_step(pool: PgPool) {
    init_tracing();
    let cast = Cast::seed(&pool).await;
    let vehicle = seed_vehicle(&pool, 1000).await;
    let driver = seed_driver(&pool, None).await;
    let request = seed_request(&pool, &cast, RequestStatus::WaitingAllocation, None).await;
    let uid = request.trn_request_uid;
    let engine = engine(&pool);
    let admin = cast.admin_actor();
    let user = cast.user_actor();
    let start = Utc::now() + Duration::hours(1);

    let handed_over = engine
        .apply(
            &admin,
            TransitionCommand::new(uid, Stage::BookingAdmin, Action::HandOverKey).with_details(
                TransitionDetails::KeyHandover(KeyHandoverDetails {
                    mas_vehicle_uid: Some(vehicle),
                    mas_driver_uid: Some(driver),
                    appointment_start: start,
                    appointment_end: start + Duration::hours(1),
                    appointment_location: "Building A lobby".into(),
                }),
            ),
        )
        .await
        .expect("hand over key");
    assert_eq!(handed_over.request.status, RequestStatus::WaitingKeyPickup);
    assert_eq!(handed_over.request.mas_vehicle_uid, Some(vehicle));
    assert_eq!(handed_over.request.mas_driver_uid, Some(driver));

    engine
        .apply(
            &user,
            TransitionCommand::new(uid, Stage::BookingUser, Action::ReceiveKey),
        )
        .await
        .expect("receive key");
    let handover = key_repo::find_by_request(&pool, uid)
        .await
        .expect("load handover")
        .expect("handover exists");
    assert_eq!(
        handover.receiver_emp_id.as_deref(),
        Some(cast.user.emp_id.as_str())
    );

    engine
        .apply(
            &user,
            TransitionCommand::new(uid, Stage::BookingUser, Action::PickUpVehicle).with_details(
                TransitionDetails::VehiclePickup(PickupDetails {
                    mile_start: 1000,
                    fuel_start: 80,
                    pickup_datetime: None,
                }),
            ),
        )
        .await
        .expect("pick up");

    let returned = engine
        .apply(
            &user,
            TransitionCommand::new(uid, Stage::BookingUser, Action::ReturnVehicle).with_details(
                TransitionDetails::VehicleReturn(ReturnDetails {
                    mile_end: 1180,
                    fuel_end: 40,
                    parking_place: "P2-14".into(),
                    returned_datetime: None,
                }),
            ),
        )
        .await
        .expect("return");
    assert_eq!(returned.request.mile_start, Some(1000));
    assert_eq!(returned.request.mile_end, Some(1180));

    let completed = engine
        .apply(
            &admin,
            TransitionCommand::new(uid, Stage::BookingAdmin, Action::AcceptReturn),
        )
        .await
        .expect("accept return");
    assert_eq!(completed.request.status, RequestStatus::Completed);

    let mileage: i64 =
        sqlx::query_scalar("SELECT current_mileage FROM mas_vehicles WHERE mas_vehicle_uid = $1")
            .bind(vehicle)
            .fetch_one(&pool)
            .await
            .expect("read mileage");
    assert_eq!(mileage, 1180);
    assert_eq!(action_log_count(&pool, &request).await, 5);
}

#[sqlx::test(migrations = "./migrations")]
async fn failing_hook_rolls_back_status_change(pool: PgPool) {
    init_tracing();
    let cast = Cast::seed(&pool).await;
    let vehicle = seed_vehicle(&pool, 0).await;
    let request = seed_request(&pool, &cast, RequestStatus::WaitingAllocation, None).await;
    let start = Utc::now() + Duration::hours(1);

    let err = engine(&pool)
        .apply(
            &cast.admin_actor(),
            TransitionCommand::new(
                request.trn_request_uid,
                Stage::BookingAdmin,
                Action::HandOverKey,
            )
            .with_details(TransitionDetails::KeyHandover(KeyHandoverDetails {
                mas_vehicle_uid: Some(vehicle),
                mas_driver_uid: Some(DriverId::new()),
                appointment_start: start,
                appointment_end: start + Duration::hours(1),
                appointment_location: "Gate 3".into(),
            })),
        )
        .await
        .expect_err("unknown driver must fail");

    assert!(matches!(err, WorkflowError::InvalidInput(_)));
    assert_eq!(request_status(&pool, &request).await, "40");
    assert_eq!(action_log_count(&pool, &request).await, 0);
    let handover = key_repo::find_by_request(&pool, request.trn_request_uid)
        .await
        .expect("load handover");
    assert!(handover.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn return_below_starting_mileage_is_rejected(pool: PgPool) {
    init_tracing();
    let cast = Cast::seed(&pool).await;
    let request = seed_request(&pool, &cast, RequestStatus::InUse, None).await;
    set_mile_start(&pool, &request, 1000).await;

    let err = engine(&pool)
        .apply(
            &cast.user_actor(),
            TransitionCommand::new(
                request.trn_request_uid,
                Stage::BookingUser,
                Action::ReturnVehicle,
            )
            .with_details(TransitionDetails::VehicleReturn(ReturnDetails {
                mile_end: 900,
                fuel_end: 50,
                parking_place: "P1".into(),
                returned_datetime: None,
            })),
        )
        .await
        .expect_err("mileage must not go backwards");

    assert!(matches!(err, WorkflowError::InvalidInput(_)));
    assert_eq!(request_status(&pool, &request).await, "60");
    assert_eq!(action_log_count(&pool, &request).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn request_outside_scope_is_not_found(pool: PgPool) {
    init_tracing();
    let cast = Cast::seed(&pool).await;
    let request = seed_request(&pool, &cast, RequestStatus::WaitingConfirmation, None).await;
    let stranger = seed_employee(&pool, "Other Head", "D-200").await;

    let err = engine(&pool)
        .apply(
            &actor(
                &stranger,
                &[ActorRole::Level1Approval],
                ActorScope::default(),
            ),
            TransitionCommand::new(
                request.trn_request_uid,
                Stage::BookingConfirmer,
                Action::Confirm,
            ),
        )
        .await
        .expect_err("stranger cannot see request");

    assert!(matches!(err, WorkflowError::NotFound));
    assert_eq!(request_status(&pool, &request).await, "10");
}

#[sqlx::test(migrations = "./migrations")]
async fn stage_without_matching_role_is_forbidden(pool: PgPool) {
    init_tracing();
    let cast = Cast::seed(&pool).await;
    let request = seed_request(&pool, &cast, RequestStatus::WaitingVerification, None).await;

    let err = engine(&pool)
        .apply(
            &cast.user_actor(),
            TransitionCommand::new(request.trn_request_uid, Stage::BookingAdmin, Action::Verify),
        )
        .await
        .expect_err("vehicle user is not an admin");

    assert!(matches!(err, WorkflowError::Forbidden));
}

#[sqlx::test(migrations = "./migrations")]
async fn terminal_requests_cannot_move(pool: PgPool) {
    init_tracing();
    let cast = Cast::seed(&pool).await;
    let request = seed_request(&pool, &cast, RequestStatus::Completed, None).await;

    let err = engine(&pool)
        .apply(
            &cast.user_actor(),
            TransitionCommand::new(request.trn_request_uid, Stage::BookingUser, Action::Cancel)
                .with_reason(Some("too late".into())),
        )
        .await
        .expect_err("completed is terminal");

    assert!(matches!(
        err,
        WorkflowError::CannotUpdate {
            status: RequestStatus::Completed,
            ..
        }
    ));
    assert_eq!(action_log_count(&pool, &request).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn reject_without_reason_is_invalid(pool: PgPool) {
    init_tracing();
    let cast = Cast::seed(&pool).await;
    let request = seed_request(&pool, &cast, RequestStatus::WaitingVerification, None).await;

    let err = engine(&pool)
        .apply(
            &cast.admin_actor(),
            TransitionCommand::new(request.trn_request_uid, Stage::BookingAdmin, Action::Reject)
                .with_reason(Some("   ".into())),
        )
        .await
        .expect_err("reason required");

    assert!(matches!(err, WorkflowError::InvalidInput(_)));
    assert_eq!(request_status(&pool, &request).await, "20");
}

#[sqlx::test(migrations = "./migrations")]
async fn failing_action_log_rolls_back_status_change(pool: PgPool) {
    init_tracing();
    let cast = Cast::seed(&pool).await;
    let request = seed_request(&pool, &cast, RequestStatus::WaitingConfirmation, None).await;

    sqlx::query(
        "CREATE FUNCTION refuse_action_log() RETURNS trigger AS $$ \
         BEGIN RAISE EXCEPTION 'action log unavailable'; END; $$ LANGUAGE plpgsql",
    )
    .execute(&pool)
    .await
    .expect("create function");
    sqlx::query(
        "CREATE TRIGGER refuse_action_log BEFORE INSERT ON vms_log_request_action \
         FOR EACH ROW EXECUTE FUNCTION refuse_action_log()",
    )
    .execute(&pool)
    .await
    .expect("create trigger");

    let result = engine(&pool)
        .apply(
            &cast.confirmer_actor(),
            TransitionCommand::new(
                request.trn_request_uid,
                Stage::BookingConfirmer,
                Action::Confirm,
            ),
        )
        .await;

    assert!(result.is_err());
    assert_eq!(request_status(&pool, &request).await, "10");
    assert_eq!(action_log_count(&pool, &request).await, 0);
}
