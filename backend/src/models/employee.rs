use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Directory record for an employee. Copied verbatim into request rows and
/// action logs so later directory edits never rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Employee {
    pub emp_id: String,
    pub full_name: String,
    pub dept_sap: String,
    pub dept_short: String,
    pub dept_full: String,
    pub position: String,
    pub desk_phone: Option<String>,
    pub mobile_phone: Option<String>,
}
