use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::actor::{Actor, ActorRole};
use crate::models::request_status::RequestStatus;
use crate::types::{ActionLogId, RequestUid};

/// One immutable row of a request's action history.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct ActionLogEntry {
    pub log_request_action_uid: ActionLogId,
    pub trn_request_uid: RequestUid,
    #[sqlx(try_from = "String")]
    pub ref_request_status_code: RequestStatus,
    pub action_by_emp_id: String,
    pub action_by_full_name: String,
    pub action_by_role: String,
    pub action: String,
    pub reason: Option<String>,
    pub remark: Option<String>,
    pub log_request_action_datetime: DateTime<Utc>,
}

impl ActionLogEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trn_request_uid: RequestUid,
        status: RequestStatus,
        action: &str,
        reason: Option<String>,
        actor: &Actor,
        role: ActorRole,
        remark: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            log_request_action_uid: ActionLogId::new(),
            trn_request_uid,
            ref_request_status_code: status,
            action_by_emp_id: actor.emp_id().to_string(),
            action_by_full_name: actor.employee.full_name.clone(),
            action_by_role: role.as_str().to_string(),
            action: action.to_string(),
            reason,
            remark,
            log_request_action_datetime: at,
        }
    }
}
