use sqlx::{PgConnection, PgExecutor};

use crate::models::action_log::ActionLogEntry;
use crate::types::RequestUid;

pub async fn insert_action_log(
    conn: &mut PgConnection,
    entry: &ActionLogEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO vms_log_request_action \
         (log_request_action_uid, trn_request_uid, ref_request_status_code, action_by_emp_id, \
         action_by_full_name, action_by_role, action, reason, remark, log_request_action_datetime) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(entry.log_request_action_uid)
    .bind(entry.trn_request_uid)
    .bind(entry.ref_request_status_code.code())
    .bind(&entry.action_by_emp_id)
    .bind(&entry.action_by_full_name)
    .bind(&entry.action_by_role)
    .bind(&entry.action)
    .bind(&entry.reason)
    .bind(&entry.remark)
    .bind(entry.log_request_action_datetime)
    .execute(conn)
    .await
    .map(|_| ())
}

/// Action history of a request, oldest first. Entries written in the same
/// instant keep their insertion order.
pub async fn list_action_logs<'e, E>(
    executor: E,
    uid: RequestUid,
) -> Result<Vec<ActionLogEntry>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, ActionLogEntry>(
        "SELECT log_request_action_uid, trn_request_uid, ref_request_status_code, \
         action_by_emp_id, action_by_full_name, action_by_role, action, reason, remark, \
         log_request_action_datetime \
         FROM vms_log_request_action \
         WHERE trn_request_uid = $1 \
         ORDER BY log_request_action_datetime ASC, log_seq ASC",
    )
    .bind(uid)
    .fetch_all(executor)
    .await
}
