//! Authenticated caller, the roles they hold and the stages they act in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::employee::Employee;
use crate::types::{CarpoolId, DriverId};

/// Role tag recorded on every state change and cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActorRole {
    VehicleUser,
    Level1Approval,
    AdminDepartment,
    AdminCarpool,
    ApprovalDepartment,
    ApprovalCarpool,
    Driver,
}

impl ActorRole {
    pub const ADMINS: &'static [ActorRole] = &[ActorRole::AdminDepartment, ActorRole::AdminCarpool];
    pub const APPROVERS: &'static [ActorRole] =
        &[ActorRole::ApprovalDepartment, ActorRole::ApprovalCarpool];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::VehicleUser => "vehicle-user",
            ActorRole::Level1Approval => "level1-approval",
            ActorRole::AdminDepartment => "admin-department",
            ActorRole::AdminCarpool => "admin-carpool",
            ActorRole::ApprovalDepartment => "approval-department",
            ActorRole::ApprovalCarpool => "approval-carpool",
            ActorRole::Driver => "driver",
        }
    }

    pub fn is_admin(&self) -> bool {
        Self::ADMINS.contains(self)
    }

    pub fn is_approver(&self) -> bool {
        Self::APPROVERS.contains(self)
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vehicle-user" => Ok(ActorRole::VehicleUser),
            "level1-approval" => Ok(ActorRole::Level1Approval),
            "admin-department" => Ok(ActorRole::AdminDepartment),
            "admin-carpool" => Ok(ActorRole::AdminCarpool),
            "approval-department" => Ok(ActorRole::ApprovalDepartment),
            "approval-carpool" => Ok(ActorRole::ApprovalCarpool),
            "driver" => Ok(ActorRole::Driver),
            other => Err(format!("unknown role `{}`", other)),
        }
    }
}

/// Route prefix selecting which hat the caller is wearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    BookingUser,
    BookingConfirmer,
    BookingAdmin,
    BookingFinal,
    Driver,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::BookingUser,
        Stage::BookingConfirmer,
        Stage::BookingAdmin,
        Stage::BookingFinal,
        Stage::Driver,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::BookingUser => "booking-user",
            Stage::BookingConfirmer => "booking-confirmer",
            Stage::BookingAdmin => "booking-admin",
            Stage::BookingFinal => "booking-final",
            Stage::Driver => "driver",
        }
    }

    /// Roles that may act in this stage.
    pub fn roles(&self) -> &'static [ActorRole] {
        match self {
            Stage::BookingUser => &[ActorRole::VehicleUser],
            Stage::BookingConfirmer => &[ActorRole::Level1Approval],
            Stage::BookingAdmin => ActorRole::ADMINS,
            Stage::BookingFinal => ActorRole::APPROVERS,
            Stage::Driver => &[ActorRole::Driver],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown stage `{}`", s))
    }
}

/// Data-visibility scope loaded alongside the caller's roles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorScope {
    pub admin_dept_saps: Vec<String>,
    pub admin_carpools: Vec<CarpoolId>,
    pub approver_carpools: Vec<CarpoolId>,
    pub driver_uids: Vec<DriverId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub employee: Employee,
    pub roles: Vec<ActorRole>,
    pub scope: ActorScope,
}

impl Actor {
    pub fn emp_id(&self) -> &str {
        &self.employee.emp_id
    }

    pub fn has_role(&self, role: ActorRole) -> bool {
        self.roles.contains(&role)
    }

    pub fn can_act_in(&self, stage: Stage) -> bool {
        stage.roles().iter().any(|role| self.has_role(*role))
    }

    /// Concrete role tag the caller acts under for a request in `stage`.
    ///
    /// Administrators and approvers act as the carpool variant when the
    /// request's carpool is in their scope, otherwise as the department
    /// variant.
    pub fn role_in(&self, stage: Stage, carpool: Option<CarpoolId>) -> Option<ActorRole> {
        let (carpool_role, department_role, carpool_scope) = match stage {
            Stage::BookingUser => return self.single(ActorRole::VehicleUser),
            Stage::BookingConfirmer => return self.single(ActorRole::Level1Approval),
            Stage::Driver => return self.single(ActorRole::Driver),
            Stage::BookingAdmin => (
                ActorRole::AdminCarpool,
                ActorRole::AdminDepartment,
                &self.scope.admin_carpools,
            ),
            Stage::BookingFinal => (
                ActorRole::ApprovalCarpool,
                ActorRole::ApprovalDepartment,
                &self.scope.approver_carpools,
            ),
        };

        let in_carpool = carpool.is_some_and(|uid| carpool_scope.contains(&uid));
        if in_carpool && self.has_role(carpool_role) {
            Some(carpool_role)
        } else if self.has_role(department_role) {
            Some(department_role)
        } else if self.has_role(carpool_role) {
            Some(carpool_role)
        } else {
            None
        }
    }

    fn single(&self, role: ActorRole) -> Option<ActorRole> {
        self.has_role(role).then_some(role)
    }
}
