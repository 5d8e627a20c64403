//! Booking request status codes and their lifecycle ordering.
//!
//! Codes are stored as two-character strings (`"10"`, `"51"`, ...). The
//! enum is the only place that knows the numeric spelling; everything else
//! compares variants or asks for a [`Phase`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RequestStatus {
    /// 10: waiting for the line manager to confirm.
    WaitingConfirmation,
    /// 20: waiting for a vehicle administrator to verify.
    WaitingVerification,
    /// 21: sent back to the requester by an administrator.
    SentBackByAdmin,
    /// 30: waiting for final approval.
    WaitingFinalApproval,
    /// 31: sent back to the requester by the final approver.
    SentBackByApprover,
    /// 40: approved, waiting for vehicle and key allocation.
    WaitingAllocation,
    /// 41: sent back during allocation.
    SentBackInAllocation,
    /// 50: key handover scheduled.
    WaitingKeyPickup,
    /// 51: key received, vehicle not yet picked up.
    KeyReceived,
    /// 60: trip in progress.
    InUse,
    /// 70: vehicle returned, waiting for inspection.
    Returned,
    /// 71: return inspection rejected.
    ReturnRejected,
    /// 80: completed.
    Completed,
    CanceledByVehicleUser,
    CanceledByConfirmer,
    CanceledByAdmin,
    CanceledByApprover,
    CanceledByDriver,
}

/// Ordered milestones of the booking lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Confirmation,
    Verification,
    FinalApproval,
    Allocation,
    KeyHandover,
    KeyReceived,
    Trip,
    Return,
    Completion,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown request status code `{0}`")]
pub struct UnknownStatusCode(pub String);

impl RequestStatus {
    pub const ALL: [RequestStatus; 18] = [
        RequestStatus::WaitingConfirmation,
        RequestStatus::WaitingVerification,
        RequestStatus::SentBackByAdmin,
        RequestStatus::WaitingFinalApproval,
        RequestStatus::SentBackByApprover,
        RequestStatus::WaitingAllocation,
        RequestStatus::SentBackInAllocation,
        RequestStatus::WaitingKeyPickup,
        RequestStatus::KeyReceived,
        RequestStatus::InUse,
        RequestStatus::Returned,
        RequestStatus::ReturnRejected,
        RequestStatus::Completed,
        RequestStatus::CanceledByVehicleUser,
        RequestStatus::CanceledByConfirmer,
        RequestStatus::CanceledByAdmin,
        RequestStatus::CanceledByApprover,
        RequestStatus::CanceledByDriver,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            RequestStatus::WaitingConfirmation => "10",
            RequestStatus::WaitingVerification => "20",
            RequestStatus::SentBackByAdmin => "21",
            RequestStatus::WaitingFinalApproval => "30",
            RequestStatus::SentBackByApprover => "31",
            RequestStatus::WaitingAllocation => "40",
            RequestStatus::SentBackInAllocation => "41",
            RequestStatus::WaitingKeyPickup => "50",
            RequestStatus::KeyReceived => "51",
            RequestStatus::InUse => "60",
            RequestStatus::Returned => "70",
            RequestStatus::ReturnRejected => "71",
            RequestStatus::Completed => "80",
            RequestStatus::CanceledByVehicleUser => "90",
            RequestStatus::CanceledByConfirmer => "91",
            RequestStatus::CanceledByAdmin => "92",
            RequestStatus::CanceledByApprover => "93",
            RequestStatus::CanceledByDriver => "94",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.code() == code)
    }

    /// Lifecycle milestone of a live status. Cancelled statuses have none.
    pub fn phase(&self) -> Option<Phase> {
        let phase = match self {
            RequestStatus::WaitingConfirmation => Phase::Confirmation,
            RequestStatus::WaitingVerification | RequestStatus::SentBackByAdmin => {
                Phase::Verification
            }
            RequestStatus::WaitingFinalApproval | RequestStatus::SentBackByApprover => {
                Phase::FinalApproval
            }
            RequestStatus::WaitingAllocation | RequestStatus::SentBackInAllocation => {
                Phase::Allocation
            }
            RequestStatus::WaitingKeyPickup => Phase::KeyHandover,
            RequestStatus::KeyReceived => Phase::KeyReceived,
            RequestStatus::InUse => Phase::Trip,
            RequestStatus::Returned | RequestStatus::ReturnRejected => Phase::Return,
            RequestStatus::Completed => Phase::Completion,
            _ => return None,
        };
        Some(phase)
    }

    /// True when the request is live and has progressed at least to `phase`.
    pub fn has_reached(&self, phase: Phase) -> bool {
        self.phase().is_some_and(|current| current >= phase)
    }

    pub fn is_canceled(&self) -> bool {
        matches!(
            self,
            RequestStatus::CanceledByVehicleUser
                | RequestStatus::CanceledByConfirmer
                | RequestStatus::CanceledByAdmin
                | RequestStatus::CanceledByApprover
                | RequestStatus::CanceledByDriver
        )
    }

    pub fn is_sent_back(&self) -> bool {
        matches!(
            self,
            RequestStatus::SentBackByAdmin
                | RequestStatus::SentBackByApprover
                | RequestStatus::SentBackInAllocation
        )
    }

    pub fn is_terminal(&self) -> bool {
        *self == RequestStatus::Completed || self.is_canceled()
    }

    /// Display code with the overdue suffix applied.
    ///
    /// A scheduled key pickup (50/51) whose reservation has already started
    /// reads as `50e`/`51e`; an active trip past its reservation end reads
    /// as `60e`. The suffix is never persisted.
    pub fn display_code(
        &self,
        reserve_start: DateTime<Utc>,
        reserve_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> String {
        let overdue = match self {
            RequestStatus::WaitingKeyPickup | RequestStatus::KeyReceived => reserve_start < now,
            RequestStatus::InUse => reserve_end < now,
            _ => false,
        };
        if overdue {
            format!("{}e", self.code())
        } else {
            self.code().to_string()
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<String> for RequestStatus {
    type Error = UnknownStatusCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RequestStatus::from_code(&value).ok_or(UnknownStatusCode(value))
    }
}

impl From<RequestStatus> for String {
    fn from(status: RequestStatus) -> Self {
        status.code().to_string()
    }
}
