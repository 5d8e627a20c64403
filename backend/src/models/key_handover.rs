use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::types::{KeyHandoverId, RequestUid};

/// Key handover appointment created when a vehicle is allocated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct KeyHandover {
    pub key_handover_uid: KeyHandoverId,
    pub trn_request_uid: RequestUid,
    pub appointment_start: DateTime<Utc>,
    pub appointment_end: DateTime<Utc>,
    pub appointment_location: String,
    pub receiver_emp_id: Option<String>,
    pub receiver_full_name: Option<String>,
    pub received_datetime: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}
