//! Immutable audit trail of request actions.

use sqlx::{PgConnection, PgPool};

use crate::models::action_log::ActionLogEntry;
use crate::repositories::action_log as action_log_repo;
use crate::types::RequestUid;

/// Appends an entry on the caller's connection.
///
/// Call inside the transaction that changed the request so that a failed
/// append undoes the change with it.
pub async fn append(
    conn: &mut PgConnection,
    entry: ActionLogEntry,
) -> Result<ActionLogEntry, sqlx::Error> {
    action_log_repo::insert_action_log(conn, &entry).await?;
    tracing::debug!(
        request_uid = %entry.trn_request_uid,
        status = %entry.ref_request_status_code,
        action = %entry.action,
        role = %entry.action_by_role,
        "Appended request action log"
    );
    Ok(entry)
}

#[derive(Debug, Clone)]
pub struct ActionLogService {
    pool: PgPool,
}

impl ActionLogService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Oldest-first history of a request.
    pub async fn history(&self, uid: RequestUid) -> Result<Vec<ActionLogEntry>, sqlx::Error> {
        action_log_repo::list_action_logs(&self.pool, uid).await
    }
}
