use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::types::{FuelRecordId, RequestUid};

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct FuelRecord {
    pub trn_add_fuel_uid: FuelRecordId,
    pub trn_request_uid: RequestUid,
    pub mileage: i64,
    pub liters: f64,
    pub amount: f64,
    pub refuel_datetime: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddFuelRequest {
    #[validate(range(min = 0))]
    pub mileage: i64,
    #[validate(range(exclusive_min = 0.0, max = 1000.0))]
    pub liters: f64,
    #[validate(range(min = 0.0))]
    pub amount: f64,
    pub refuel_datetime: DateTime<Utc>,
}

impl FuelRecord {
    pub fn new(
        trn_request_uid: RequestUid,
        payload: &AddFuelRequest,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            trn_add_fuel_uid: FuelRecordId::new(),
            trn_request_uid,
            mileage: payload.mileage,
            liters: payload.liters,
            amount: payload.amount,
            refuel_datetime: payload.refuel_datetime,
            created_at: now,
            created_by: created_by.to_string(),
        }
    }
}
