use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::types::{CarpoolId, DriverId, VehicleId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Vehicle {
    pub mas_vehicle_uid: VehicleId,
    pub vehicle_license_plate: String,
    pub vehicle_dept_sap: Option<String>,
    pub mas_carpool_uid: Option<CarpoolId>,
    pub current_mileage: i64,
    pub parking_place: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Driver {
    pub mas_driver_uid: DriverId,
    pub driver_emp_id: Option<String>,
    pub driver_name: String,
    pub driver_mobile_phone: Option<String>,
}
