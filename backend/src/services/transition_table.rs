//! Allowed status transitions per action and role.
//!
//! The table is plain data; the engine consults it after locking a row and
//! never reasons about codes on its own.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::actor::ActorRole;
use crate::models::booking_request::StampColumns;
use crate::models::request_status::RequestStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Confirm,
    Verify,
    Approve,
    Reject,
    Resubmit,
    HandOverKey,
    ReceiveKey,
    PickUpVehicle,
    ReturnVehicle,
    AcceptReturn,
    Cancel,
}

impl Action {
    pub const ALL: [Action; 11] = [
        Action::Confirm,
        Action::Verify,
        Action::Approve,
        Action::Reject,
        Action::Resubmit,
        Action::HandOverKey,
        Action::ReceiveKey,
        Action::PickUpVehicle,
        Action::ReturnVehicle,
        Action::AcceptReturn,
        Action::Cancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Confirm => "confirm",
            Action::Verify => "verify",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Resubmit => "resubmit",
            Action::HandOverKey => "hand_over_key",
            Action::ReceiveKey => "receive_key",
            Action::PickUpVehicle => "pick_up_vehicle",
            Action::ReturnVehicle => "return_vehicle",
            Action::AcceptReturn => "accept_return",
            Action::Cancel => "cancel",
        }
    }

    pub fn requires_reason(&self) -> bool {
        matches!(self, Action::Reject | Action::Cancel)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: RequestStatus,
    pub action: Action,
    pub to: RequestStatus,
    pub roles: &'static [ActorRole],
    /// Snapshot group stamped with the actor, if any.
    pub stamp: Option<StampColumns>,
}

const USER: &[ActorRole] = &[ActorRole::VehicleUser];
const CONFIRMER: &[ActorRole] = &[ActorRole::Level1Approval];
const ADMINS: &[ActorRole] = ActorRole::ADMINS;
const APPROVERS: &[ActorRole] = ActorRole::APPROVERS;
const TRIP_CREW: &[ActorRole] = &[ActorRole::VehicleUser, ActorRole::Driver];
const KEY_RECEIVERS: &[ActorRole] = &[
    ActorRole::VehicleUser,
    ActorRole::Driver,
    ActorRole::AdminDepartment,
    ActorRole::AdminCarpool,
];

const fn rule(
    from: RequestStatus,
    action: Action,
    to: RequestStatus,
    roles: &'static [ActorRole],
    stamp: Option<StampColumns>,
) -> Transition {
    Transition {
        from,
        action,
        to,
        roles,
        stamp,
    }
}

use RequestStatus as S;

#[rustfmt::skip]
const TRANSITIONS: &[Transition] = &[
    rule(S::WaitingConfirmation, Action::Confirm, S::WaitingVerification, CONFIRMER, Some(StampColumns::Confirmed)),
    rule(S::WaitingVerification, Action::Verify, S::WaitingFinalApproval, ADMINS, Some(StampColumns::Verified)),
    rule(S::WaitingVerification, Action::Reject, S::SentBackByAdmin, ADMINS, Some(StampColumns::SendedBack)),
    rule(S::SentBackByAdmin, Action::Resubmit, S::WaitingVerification, USER, None),
    rule(S::WaitingFinalApproval, Action::Approve, S::WaitingAllocation, APPROVERS, Some(StampColumns::Approved)),
    rule(S::WaitingFinalApproval, Action::Reject, S::SentBackByApprover, APPROVERS, Some(StampColumns::SendedBack)),
    rule(S::SentBackByApprover, Action::Resubmit, S::WaitingFinalApproval, USER, None),
    rule(S::WaitingAllocation, Action::HandOverKey, S::WaitingKeyPickup, ADMINS, None),
    rule(S::WaitingAllocation, Action::Reject, S::SentBackInAllocation, ADMINS, Some(StampColumns::SendedBack)),
    rule(S::SentBackInAllocation, Action::Resubmit, S::WaitingAllocation, USER, None),
    rule(S::WaitingKeyPickup, Action::ReceiveKey, S::KeyReceived, KEY_RECEIVERS, None),
    rule(S::KeyReceived, Action::PickUpVehicle, S::InUse, TRIP_CREW, None),
    rule(S::InUse, Action::ReturnVehicle, S::Returned, TRIP_CREW, None),
    rule(S::Returned, Action::AcceptReturn, S::Completed, ADMINS, None),
    rule(S::Returned, Action::Reject, S::ReturnRejected, ADMINS, Some(StampColumns::Rejected)),
    rule(S::ReturnRejected, Action::ReturnVehicle, S::Returned, TRIP_CREW, None),
];

struct CancelRule {
    roles: &'static [ActorRole],
    to: RequestStatus,
    from: &'static [RequestStatus],
}

const CANCEL_RULES: &[CancelRule] = &[
    CancelRule {
        roles: USER,
        to: S::CanceledByVehicleUser,
        from: &[
            S::WaitingConfirmation,
            S::WaitingVerification,
            S::SentBackByAdmin,
            S::WaitingFinalApproval,
            S::SentBackByApprover,
            S::WaitingAllocation,
            S::SentBackInAllocation,
            S::WaitingKeyPickup,
            S::KeyReceived,
            S::InUse,
            S::Returned,
            S::ReturnRejected,
        ],
    },
    CancelRule {
        roles: CONFIRMER,
        to: S::CanceledByConfirmer,
        from: &[S::WaitingConfirmation],
    },
    CancelRule {
        roles: ADMINS,
        to: S::CanceledByAdmin,
        from: &[
            S::WaitingVerification,
            S::SentBackByAdmin,
            S::WaitingFinalApproval,
            S::SentBackByApprover,
            S::WaitingAllocation,
            S::SentBackInAllocation,
            S::WaitingKeyPickup,
            S::KeyReceived,
            S::Returned,
            S::ReturnRejected,
        ],
    },
    CancelRule {
        roles: APPROVERS,
        to: S::CanceledByApprover,
        from: &[
            S::WaitingFinalApproval,
            S::SentBackByApprover,
            S::WaitingAllocation,
            S::SentBackInAllocation,
        ],
    },
    CancelRule {
        roles: &[ActorRole::Driver],
        to: S::CanceledByDriver,
        from: &[S::WaitingKeyPickup, S::KeyReceived],
    },
];

/// Looks up the transition `role` may take with `action` from `current`.
///
/// Returns `None` when the pair is not in the table, including every
/// attempt to leave a terminal status.
pub fn allowed_transition(
    current: RequestStatus,
    action: Action,
    role: ActorRole,
) -> Option<Transition> {
    if current.is_terminal() {
        return None;
    }

    if action == Action::Cancel {
        return CANCEL_RULES
            .iter()
            .find(|rule| rule.roles.contains(&role) && rule.from.contains(&current))
            .map(|rule| Transition {
                from: current,
                action,
                to: rule.to,
                roles: rule.roles,
                stamp: Some(StampColumns::Canceled),
            });
    }

    TRANSITIONS
        .iter()
        .find(|t| t.from == current && t.action == action && t.roles.contains(&role))
        .copied()
}

/// Actions `role` can currently take on a request in `current`.
pub fn available_actions(current: RequestStatus, role: ActorRole) -> Vec<Action> {
    Action::ALL
        .into_iter()
        .filter(|action| allowed_transition(current, *action, role).is_some())
        .collect()
}
