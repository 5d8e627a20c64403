use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor};

use crate::models::key_handover::KeyHandover;
use crate::types::RequestUid;

const COLUMNS: &str = "key_handover_uid, trn_request_uid, appointment_start, appointment_end, \
     appointment_location, receiver_emp_id, receiver_full_name, received_datetime, \
     created_at, created_by, updated_at, updated_by";

pub async fn find_by_request<'e, E>(
    executor: E,
    uid: RequestUid,
) -> Result<Option<KeyHandover>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let query = format!(
        "SELECT {} FROM vms_trn_key_handover WHERE trn_request_uid = $1",
        COLUMNS
    );
    sqlx::query_as::<_, KeyHandover>(&query)
        .bind(uid)
        .fetch_optional(executor)
        .await
}

/// Inserts the appointment unless the request already has one.
/// Returns whether a row was created.
pub async fn insert_if_absent(
    conn: &mut PgConnection,
    handover: &KeyHandover,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO vms_trn_key_handover \
         (key_handover_uid, trn_request_uid, appointment_start, appointment_end, \
         appointment_location, created_at, created_by, updated_at, updated_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (trn_request_uid) DO NOTHING",
    )
    .bind(handover.key_handover_uid)
    .bind(handover.trn_request_uid)
    .bind(handover.appointment_start)
    .bind(handover.appointment_end)
    .bind(&handover.appointment_location)
    .bind(handover.created_at)
    .bind(&handover.created_by)
    .bind(handover.updated_at)
    .bind(&handover.updated_by)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn mark_received(
    conn: &mut PgConnection,
    uid: RequestUid,
    receiver_emp_id: &str,
    receiver_full_name: &str,
    at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE vms_trn_key_handover \
         SET receiver_emp_id = $1, receiver_full_name = $2, received_datetime = $3, \
         updated_at = $3, updated_by = $1 \
         WHERE trn_request_uid = $4",
    )
    .bind(receiver_emp_id)
    .bind(receiver_full_name)
    .bind(at)
    .bind(uid)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
