//! Side effects attached to individual transitions.
//!
//! Hooks run inside the transition's transaction, after the status update
//! and before the action log append. Any error rolls the whole transition
//! back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::WorkflowError;
use crate::models::actor::Actor;
use crate::models::booking_request::BookingRequest;
use crate::models::key_handover::KeyHandover;
use crate::repositories::{
    booking_request as booking_repo, key_handover as key_repo, vehicle as vehicle_repo,
};
use crate::services::transition_table::Action;
use crate::types::{DriverId, KeyHandoverId, VehicleId};

#[derive(Debug, Clone, PartialEq)]
pub struct KeyHandoverDetails {
    pub mas_vehicle_uid: Option<VehicleId>,
    pub mas_driver_uid: Option<DriverId>,
    pub appointment_start: DateTime<Utc>,
    pub appointment_end: DateTime<Utc>,
    pub appointment_location: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickupDetails {
    pub mile_start: i64,
    pub fuel_start: i32,
    pub pickup_datetime: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnDetails {
    pub mile_end: i64,
    pub fuel_end: i32,
    pub parking_place: String,
    pub returned_datetime: Option<DateTime<Utc>>,
}

/// Action-specific input carried alongside a transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TransitionDetails {
    #[default]
    None,
    KeyHandover(KeyHandoverDetails),
    VehiclePickup(PickupDetails),
    VehicleReturn(ReturnDetails),
}

/// Everything a hook may read about the transition being applied.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    /// The row as it was locked, before the status update.
    pub request: &'a BookingRequest,
    pub details: &'a TransitionDetails,
    pub actor: &'a Actor,
    pub at: DateTime<Utc>,
}

#[async_trait]
pub trait TransitionHook: Send + Sync {
    /// Checks the details before anything is written.
    fn validate(&self, _ctx: &HookContext<'_>) -> Result<(), WorkflowError> {
        Ok(())
    }

    async fn apply(&self, conn: &mut PgConnection, ctx: &HookContext<'_>)
        -> Result<(), WorkflowError>;
}

/// Hooks keyed by the action that triggers them.
#[derive(Clone, Default)]
pub struct TransitionHooks {
    hooks: HashMap<Action, Vec<Arc<dyn TransitionHook>>>,
}

impl TransitionHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the standard trip bookkeeping hooks.
    pub fn standard() -> Self {
        Self::new()
            .register(Action::HandOverKey, KeyHandoverHook)
            .register(Action::ReceiveKey, KeyReceivedHook)
            .register(Action::PickUpVehicle, VehiclePickupHook)
            .register(Action::ReturnVehicle, VehicleReturnHook)
    }

    pub fn register(mut self, action: Action, hook: impl TransitionHook + 'static) -> Self {
        self.hooks.entry(action).or_default().push(Arc::new(hook));
        self
    }

    pub fn for_action(&self, action: Action) -> &[Arc<dyn TransitionHook>] {
        self.hooks.get(&action).map(Vec::as_slice).unwrap_or_default()
    }
}

impl fmt::Debug for TransitionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<(&str, usize)> = self
            .hooks
            .iter()
            .map(|(action, hooks)| (action.as_str(), hooks.len()))
            .collect();
        counts.sort();
        f.debug_struct("TransitionHooks").field("hooks", &counts).finish()
    }
}

fn invalid(message: &str) -> WorkflowError {
    WorkflowError::InvalidInput(message.to_string())
}

/// Assigns the vehicle (and driver) and books the key handover appointment.
pub struct KeyHandoverHook;

impl KeyHandoverHook {
    fn details<'a>(ctx: &HookContext<'a>) -> Result<&'a KeyHandoverDetails, WorkflowError> {
        match ctx.details {
            TransitionDetails::KeyHandover(details) => Ok(details),
            _ => Err(invalid("key handover details are required")),
        }
    }
}

#[async_trait]
impl TransitionHook for KeyHandoverHook {
    fn validate(&self, ctx: &HookContext<'_>) -> Result<(), WorkflowError> {
        let details = Self::details(ctx)?;
        if details.mas_vehicle_uid.is_none() && ctx.request.mas_vehicle_uid.is_none() {
            return Err(invalid("a vehicle must be assigned before handing over the key"));
        }
        if details.appointment_end <= details.appointment_start {
            return Err(invalid("appointment_end must be after appointment_start"));
        }
        if details.appointment_location.trim().is_empty() {
            return Err(invalid("appointment_location is required"));
        }
        Ok(())
    }

    async fn apply(
        &self,
        conn: &mut PgConnection,
        ctx: &HookContext<'_>,
    ) -> Result<(), WorkflowError> {
        let details = Self::details(ctx)?;
        let uid = ctx.request.trn_request_uid;

        if let Some(driver) = details.mas_driver_uid {
            if vehicle_repo::find_driver(&mut *conn, driver).await?.is_none() {
                return Err(invalid("driver not found"));
            }
        }
        if let Some(vehicle) = details.mas_vehicle_uid {
            if vehicle_repo::find_vehicle(&mut *conn, vehicle).await?.is_none() {
                return Err(invalid("vehicle not found"));
            }
            booking_repo::assign_vehicle(conn, uid, vehicle, details.mas_driver_uid).await?;
        } else if let (Some(vehicle), Some(driver)) =
            (ctx.request.mas_vehicle_uid, details.mas_driver_uid)
        {
            booking_repo::assign_vehicle(conn, uid, vehicle, Some(driver)).await?;
        }

        let handover = KeyHandover {
            key_handover_uid: KeyHandoverId::new(),
            trn_request_uid: uid,
            appointment_start: details.appointment_start,
            appointment_end: details.appointment_end,
            appointment_location: details.appointment_location.trim().to_string(),
            receiver_emp_id: None,
            receiver_full_name: None,
            received_datetime: None,
            created_at: ctx.at,
            created_by: ctx.actor.emp_id().to_string(),
            updated_at: ctx.at,
            updated_by: ctx.actor.emp_id().to_string(),
        };
        let created = key_repo::insert_if_absent(conn, &handover).await?;
        if !created {
            tracing::debug!(request_uid = %uid, "Key handover already scheduled");
        }
        Ok(())
    }
}

/// Stamps who received the key and when.
pub struct KeyReceivedHook;

#[async_trait]
impl TransitionHook for KeyReceivedHook {
    async fn apply(
        &self,
        conn: &mut PgConnection,
        ctx: &HookContext<'_>,
    ) -> Result<(), WorkflowError> {
        let updated = key_repo::mark_received(
            conn,
            ctx.request.trn_request_uid,
            ctx.actor.emp_id(),
            &ctx.actor.employee.full_name,
            ctx.at,
        )
        .await?;
        if updated == 0 {
            return Err(invalid("no key handover is scheduled for this request"));
        }
        Ok(())
    }
}

/// Records pickup time, starting mileage and fuel level.
pub struct VehiclePickupHook;

impl VehiclePickupHook {
    fn details<'a>(ctx: &HookContext<'a>) -> Result<&'a PickupDetails, WorkflowError> {
        match ctx.details {
            TransitionDetails::VehiclePickup(details) => Ok(details),
            _ => Err(invalid("pickup mileage and fuel level are required")),
        }
    }
}

#[async_trait]
impl TransitionHook for VehiclePickupHook {
    fn validate(&self, ctx: &HookContext<'_>) -> Result<(), WorkflowError> {
        let details = Self::details(ctx)?;
        if details.mile_start < 0 {
            return Err(invalid("mile_start must not be negative"));
        }
        if !(0..=100).contains(&details.fuel_start) {
            return Err(invalid("fuel_start must be between 0 and 100"));
        }
        Ok(())
    }

    async fn apply(
        &self,
        conn: &mut PgConnection,
        ctx: &HookContext<'_>,
    ) -> Result<(), WorkflowError> {
        let details = Self::details(ctx)?;
        booking_repo::record_pickup(
            conn,
            ctx.request.trn_request_uid,
            details.pickup_datetime.unwrap_or(ctx.at),
            details.mile_start,
            details.fuel_start,
        )
        .await?;
        Ok(())
    }
}

/// Records the return and moves the vehicle's odometer and parking place.
pub struct VehicleReturnHook;

impl VehicleReturnHook {
    fn details<'a>(ctx: &HookContext<'a>) -> Result<&'a ReturnDetails, WorkflowError> {
        match ctx.details {
            TransitionDetails::VehicleReturn(details) => Ok(details),
            _ => Err(invalid("return mileage, fuel level and parking place are required")),
        }
    }
}

#[async_trait]
impl TransitionHook for VehicleReturnHook {
    fn validate(&self, ctx: &HookContext<'_>) -> Result<(), WorkflowError> {
        let details = Self::details(ctx)?;
        if let Some(mile_start) = ctx.request.mile_start {
            if details.mile_end < mile_start {
                return Err(invalid("mile_end must not be less than mile_start"));
            }
        }
        if !(0..=100).contains(&details.fuel_end) {
            return Err(invalid("fuel_end must be between 0 and 100"));
        }
        if details.parking_place.trim().is_empty() {
            return Err(invalid("parking_place is required"));
        }
        Ok(())
    }

    async fn apply(
        &self,
        conn: &mut PgConnection,
        ctx: &HookContext<'_>,
    ) -> Result<(), WorkflowError> {
        let details = Self::details(ctx)?;
        let parking_place = details.parking_place.trim();
        booking_repo::record_return(
            conn,
            ctx.request.trn_request_uid,
            details.returned_datetime.unwrap_or(ctx.at),
            details.mile_end,
            details.fuel_end,
            parking_place,
        )
        .await?;
        if let Some(vehicle) = ctx.request.mas_vehicle_uid {
            vehicle_repo::record_return(conn, vehicle, details.mile_end, parking_place, ctx.at)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::actor::ActorScope;
    use crate::models::booking_request::{CreateBookingRequest, Participants};
    use crate::models::employee::Employee;
    use chrono::Duration;

    fn employee() -> Employee {
        Employee {
            emp_id: "E100".into(),
            full_name: "Somchai".into(),
            dept_sap: "D1".into(),
            dept_short: "D1".into(),
            dept_full: "Department One".into(),
            position: "Officer".into(),
            desk_phone: None,
            mobile_phone: None,
        }
    }

    fn request() -> BookingRequest {
        let start = Utc::now() + Duration::days(1);
        let payload = CreateBookingRequest {
            work_place: "HQ".into(),
            objective: "Meeting".into(),
            remark: None,
            reserve_start_datetime: start,
            reserve_end_datetime: start + Duration::hours(2),
            number_of_passengers: 1,
            vehicle_user_emp_id: None,
            confirmed_request_emp_id: "E200".into(),
            approved_request_emp_id: None,
            mas_vehicle_uid: None,
            mas_driver_uid: None,
            mas_carpool_uid: None,
            mas_vehicle_department_dept_sap: None,
        };
        let participants = Participants {
            vehicle_user: employee(),
            confirmer: employee(),
            approver: None,
        };
        BookingRequest::new(
            "VA1".into(),
            &payload,
            &employee(),
            &participants,
            Utc::now(),
        )
    }

    fn actor() -> Actor {
        Actor {
            employee: employee(),
            roles: vec![],
            scope: ActorScope::default(),
        }
    }

    fn handover_details(vehicle: Option<VehicleId>) -> TransitionDetails {
        let start = Utc::now();
        TransitionDetails::KeyHandover(KeyHandoverDetails {
            mas_vehicle_uid: vehicle,
            mas_driver_uid: None,
            appointment_start: start,
            appointment_end: start + Duration::hours(1),
            appointment_location: "Building A".into(),
        })
    }

    #[test]
    fn standard_registry_keys_hooks_by_action() {
        let hooks = TransitionHooks::standard();
        assert_eq!(hooks.for_action(Action::HandOverKey).len(), 1);
        assert_eq!(hooks.for_action(Action::ReturnVehicle).len(), 1);
        assert!(hooks.for_action(Action::Approve).is_empty());
        assert!(hooks.for_action(Action::Cancel).is_empty());
    }

    #[test]
    fn key_handover_requires_a_vehicle() {
        let request = request();
        let actor = actor();
        let details = handover_details(None);
        let ctx = HookContext {
            request: &request,
            details: &details,
            actor: &actor,
            at: Utc::now(),
        };
        assert!(matches!(
            KeyHandoverHook.validate(&ctx),
            Err(WorkflowError::InvalidInput(_))
        ));

        let details = handover_details(Some(VehicleId::new()));
        let ctx = HookContext {
            details: &details,
            ..ctx
        };
        assert!(KeyHandoverHook.validate(&ctx).is_ok());
    }

    #[test]
    fn key_handover_without_details_is_invalid() {
        let request = request();
        let actor = actor();
        let ctx = HookContext {
            request: &request,
            details: &TransitionDetails::None,
            actor: &actor,
            at: Utc::now(),
        };
        assert!(KeyHandoverHook.validate(&ctx).is_err());
        assert!(VehiclePickupHook.validate(&ctx).is_err());
        assert!(VehicleReturnHook.validate(&ctx).is_err());
    }

    #[test]
    fn return_mileage_cannot_go_backwards() {
        let mut request = request();
        request.mile_start = Some(15_000);
        let actor = actor();
        let details = TransitionDetails::VehicleReturn(ReturnDetails {
            mile_end: 14_999,
            fuel_end: 50,
            parking_place: "P1".into(),
            returned_datetime: None,
        });
        let ctx = HookContext {
            request: &request,
            details: &details,
            actor: &actor,
            at: Utc::now(),
        };
        assert!(matches!(
            VehicleReturnHook.validate(&ctx),
            Err(WorkflowError::InvalidInput(msg)) if msg.contains("mile_end")
        ));
    }

    #[test]
    fn pickup_fuel_level_is_a_percentage() {
        let request = request();
        let actor = actor();
        let details = TransitionDetails::VehiclePickup(PickupDetails {
            mile_start: 100,
            fuel_start: 101,
            pickup_datetime: None,
        });
        let ctx = HookContext {
            request: &request,
            details: &details,
            actor: &actor,
            at: Utc::now(),
        };
        assert!(VehiclePickupHook.validate(&ctx).is_err());
    }
}
