//! Progress-step view of a booking request.
//!
//! [`progress_view`] is a pure function of the status code and the
//! cancelling role. Timestamps are attached afterwards from the stored row
//! by [`attach_timestamps`], so the step layout stays independent of data.

use chrono::{DateTime, Utc};

use crate::models::actor::ActorRole;
use crate::models::booking_request::{ActorStamp, BookingRequest};
use crate::models::key_handover::KeyHandover;
use crate::models::progress::{ProgressIcon, ProgressStep, StepMilestone};
use crate::models::request_status::RequestStatus;

use ProgressIcon::{Completed as Done, Failed, InProgress as Active, NotStarted as Idle};
use StepMilestone as M;

const CONFIRM_WAITING: &str = "รอต้นสังกัดอนุมัติ";
const CONFIRM_DONE: &str = "ต้นสังกัดอนุมัติ";
const CONFIRM_CANCELED: &str = "ต้นสังกัดยกเลิกคำขอ";
const VERIFY_WAITING: &str = "รอผู้ดูแลยานพาหนะตรวจสอบ";
const VERIFY_DONE: &str = "ผู้ดูแลยานพาหนะตรวจสอบ";
const VERIFY_SENT_BACK: &str = "ตีกลับจากผู้ดูแลยานพาหนะ";
const VERIFY_CANCELED: &str = "ผู้ดูแลยานพาหนะยกเลิกคำขอ";
const APPROVE_WAITING: &str = "รออนุมัติใช้ยานพาหนะ";
const APPROVE_DONE: &str = "อนุมัติใช้ยานพาหนะ";
const APPROVE_SENT_BACK: &str = "ตีกลับจากผู้อนุมัติ";
const ALLOCATION_SENT_BACK: &str = "ตีกลับจากการจัดสรรยานพาหนะ";
const APPROVE_CANCELED: &str = "ผู้อนุมัติยกเลิกคำขอ";
const APPROVED: &str = "อนุมัติแล้ว";
const KEY_WAITING: &str = "รอรับกุญแจ";
const KEY_DONE: &str = "รับกุญแจ";
const PICKUP_WAITING: &str = "รอรับยานพาหนะ";
const PICKUP_DONE: &str = "รับยานพาหนะ";
const TRIP_ACTIVE: &str = "เดินทาง";
const RETURN_DONE: &str = "คืนยานพาหนะ";
const INSPECT_WAITING: &str = "รอตรวจสอบการคืนยานพาหนะ";
const INSPECT_DONE: &str = "ตรวจสอบการคืนยานพาหนะ";
const INSPECT_REJECTED: &str = "ตีกลับการคืนยานพาหนะ";
const USER_CANCELED: &str = "ยกเลิกคำขอ";
const DRIVER_CANCELED: &str = "พนักงานขับรถยกเลิกงาน";

fn step(icon: ProgressIcon, name: &str, milestone: StepMilestone) -> ProgressStep {
    ProgressStep::new(icon, name, milestone)
}

/// Progress steps for a raw status code and cancelling role tag.
///
/// Unknown codes yield an empty list. For cancelled statuses an unknown or
/// empty role falls back to the role the status itself implies.
pub fn progress_view(status_code: &str, canceled_role: &str) -> Vec<ProgressStep> {
    match RequestStatus::from_code(status_code) {
        Some(status) => render(status, canceled_role.parse().ok()),
        None => Vec::new(),
    }
}

pub fn render(status: RequestStatus, canceled_role: Option<ActorRole>) -> Vec<ProgressStep> {
    use RequestStatus as S;

    match status {
        S::WaitingConfirmation => vec![
            step(Active, CONFIRM_WAITING, M::Confirmation),
            step(Idle, VERIFY_WAITING, M::Verification),
            step(Idle, APPROVE_WAITING, M::FinalApproval),
        ],
        S::WaitingVerification => vec![
            step(Done, CONFIRM_DONE, M::Confirmation),
            step(Active, VERIFY_WAITING, M::Verification),
            step(Idle, APPROVE_WAITING, M::FinalApproval),
        ],
        S::SentBackByAdmin => vec![
            step(Done, CONFIRM_DONE, M::Confirmation),
            step(Failed, VERIFY_SENT_BACK, M::Verification),
            step(Idle, APPROVE_WAITING, M::FinalApproval),
        ],
        S::WaitingFinalApproval => vec![
            step(Done, CONFIRM_DONE, M::Confirmation),
            step(Done, VERIFY_DONE, M::Verification),
            step(Active, APPROVE_WAITING, M::FinalApproval),
        ],
        S::SentBackByApprover => vec![
            step(Done, CONFIRM_DONE, M::Confirmation),
            step(Done, VERIFY_DONE, M::Verification),
            step(Failed, APPROVE_SENT_BACK, M::FinalApproval),
        ],
        S::WaitingAllocation => vec![
            step(Done, CONFIRM_DONE, M::Confirmation),
            step(Done, VERIFY_DONE, M::Verification),
            step(Done, APPROVE_DONE, M::FinalApproval),
        ],
        S::SentBackInAllocation => vec![
            step(Done, CONFIRM_DONE, M::Confirmation),
            step(Done, VERIFY_DONE, M::Verification),
            step(Failed, ALLOCATION_SENT_BACK, M::FinalApproval),
        ],
        S::WaitingKeyPickup => trip_steps([Active, Idle, Idle, Idle], KEY_WAITING, PICKUP_WAITING),
        S::KeyReceived => trip_steps([Done, Active, Idle, Idle], KEY_DONE, PICKUP_WAITING),
        S::InUse => trip_steps([Done, Done, Active, Idle], KEY_DONE, PICKUP_DONE),
        S::Returned => trip_steps([Done, Done, Done, Active], KEY_DONE, PICKUP_DONE),
        S::ReturnRejected => trip_steps([Done, Done, Done, Failed], KEY_DONE, PICKUP_DONE),
        S::Completed => trip_steps([Done, Done, Done, Done], KEY_DONE, PICKUP_DONE),
        S::CanceledByVehicleUser
        | S::CanceledByConfirmer
        | S::CanceledByAdmin
        | S::CanceledByApprover
        | S::CanceledByDriver => {
            canceled_steps(canceled_role.unwrap_or_else(|| default_cancel_role(status)))
        }
    }
}

/// Approved step followed by the four trip milestones.
fn trip_steps(icons: [ProgressIcon; 4], key_name: &str, pickup_name: &str) -> Vec<ProgressStep> {
    let [key, pickup, trip, inspection] = icons;
    let trip_name = if trip == Done { RETURN_DONE } else { TRIP_ACTIVE };
    let inspection_name = match inspection {
        Done => INSPECT_DONE,
        Failed => INSPECT_REJECTED,
        _ => INSPECT_WAITING,
    };
    vec![
        step(Done, APPROVED, M::Approved),
        step(key, key_name, M::KeyPickup),
        step(pickup, pickup_name, M::VehiclePickup),
        step(trip, trip_name, M::VehicleReturn),
        step(inspection, inspection_name, M::ReturnInspection),
    ]
}

/// Progress steps for a stored request.
///
/// Unlike [`render`] this can see whether final approval already happened,
/// which changes how an administrator's cancellation is drawn.
pub fn render_request(request: &BookingRequest) -> Vec<ProgressStep> {
    let canceled_role = request
        .canceled_request_role
        .as_deref()
        .and_then(|role| role.parse::<ActorRole>().ok());
    let approved = request
        .approved_request
        .as_ref()
        .is_some_and(|stamp| stamp.datetime.is_some());

    if request.status == RequestStatus::CanceledByAdmin && approved {
        return vec![
            step(Done, CONFIRM_DONE, M::Confirmation),
            step(Done, VERIFY_DONE, M::Verification),
            step(Done, APPROVE_DONE, M::FinalApproval),
            step(Failed, VERIFY_CANCELED, M::Cancellation),
        ];
    }
    render(request.status, canceled_role)
}

fn canceled_steps(role: ActorRole) -> Vec<ProgressStep> {
    match role {
        ActorRole::VehicleUser => vec![step(Failed, USER_CANCELED, M::Cancellation)],
        ActorRole::Level1Approval => vec![
            step(Failed, CONFIRM_CANCELED, M::Cancellation),
            step(Idle, VERIFY_WAITING, M::Verification),
            step(Idle, APPROVE_WAITING, M::FinalApproval),
        ],
        ActorRole::AdminDepartment | ActorRole::AdminCarpool => vec![
            step(Done, CONFIRM_DONE, M::Confirmation),
            step(Failed, VERIFY_CANCELED, M::Cancellation),
            step(Idle, APPROVE_WAITING, M::FinalApproval),
        ],
        ActorRole::ApprovalDepartment | ActorRole::ApprovalCarpool => vec![
            step(Done, CONFIRM_DONE, M::Confirmation),
            step(Done, VERIFY_DONE, M::Verification),
            step(Failed, APPROVE_CANCELED, M::Cancellation),
        ],
        ActorRole::Driver => vec![
            step(Done, APPROVED, M::Approved),
            step(Failed, DRIVER_CANCELED, M::Cancellation),
        ],
    }
}

fn default_cancel_role(status: RequestStatus) -> ActorRole {
    match status {
        RequestStatus::CanceledByConfirmer => ActorRole::Level1Approval,
        RequestStatus::CanceledByAdmin => ActorRole::AdminDepartment,
        RequestStatus::CanceledByApprover => ActorRole::ApprovalDepartment,
        RequestStatus::CanceledByDriver => ActorRole::Driver,
        _ => ActorRole::VehicleUser,
    }
}

/// Fills `progress_datetime` on finished and failed steps from the stored row.
pub fn attach_timestamps(
    steps: &mut [ProgressStep],
    request: &BookingRequest,
    key_handover: Option<&KeyHandover>,
) {
    let stamped = |stamp: &Option<ActorStamp>| {
        stamp.as_ref().and_then(|s| s.datetime)
    };
    let sent_back = stamped(&request.sended_back_request);

    for step in steps.iter_mut() {
        let at: Option<DateTime<Utc>> = match (step.progress_icon, step.milestone) {
            (Idle | Active, _) => None,
            (_, M::Cancellation) => stamped(&request.canceled_request),
            (Done, M::Confirmation) => request.confirmed_request.datetime,
            (Done, M::Verification) => stamped(&request.verified_request),
            (Done, M::FinalApproval | M::Approved) => stamped(&request.approved_request),
            (Done, M::KeyPickup) => key_handover.and_then(|k| k.received_datetime),
            (Done, M::VehiclePickup) => request.pickup_datetime,
            (Done, M::VehicleReturn) => request.returned_datetime,
            (Done, M::ReturnInspection) => Some(request.updated_at),
            (Failed, M::ReturnInspection) => stamped(&request.rejected_request),
            (Failed, _) => sent_back,
        };
        step.progress_datetime = at;
    }
}
