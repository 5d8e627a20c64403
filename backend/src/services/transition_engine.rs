//! Applies status transitions to booking requests.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;

use crate::error::WorkflowError;
use crate::models::action_log::ActionLogEntry;
use crate::models::actor::{Actor, ActorRole, Stage};
use crate::models::booking_request::BookingRequest;
use crate::models::request_status::RequestStatus;
use crate::repositories::{
    begin_transaction, booking_request as booking_repo, commit_transaction, rollback_transaction,
};
use crate::repositories::booking_request::StatusChange;
use crate::services::action_log;
use crate::services::hooks::{HookContext, TransitionDetails, TransitionHooks};
use crate::services::transition_table::{allowed_transition, Action};
use crate::types::RequestUid;

/// One requested move of a booking request.
#[derive(Debug, Clone)]
pub struct TransitionCommand {
    pub request_uid: RequestUid,
    pub stage: Stage,
    pub action: Action,
    pub reason: Option<String>,
    pub remark: Option<String>,
    pub details: TransitionDetails,
}

impl TransitionCommand {
    pub fn new(request_uid: RequestUid, stage: Stage, action: Action) -> Self {
        Self {
            request_uid,
            stage,
            action,
            reason: None,
            remark: None,
            details: TransitionDetails::None,
        }
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    pub fn with_remark(mut self, remark: Option<String>) -> Self {
        self.remark = remark;
        self
    }

    pub fn with_details(mut self, details: TransitionDetails) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    /// The request as committed.
    pub request: BookingRequest,
    pub from: RequestStatus,
    pub role: ActorRole,
    pub log: ActionLogEntry,
}

#[derive(Debug, Clone)]
pub struct TransitionEngine {
    pool: PgPool,
    hooks: Arc<TransitionHooks>,
}

impl TransitionEngine {
    pub fn new(pool: PgPool, hooks: TransitionHooks) -> Self {
        Self {
            pool,
            hooks: Arc::new(hooks),
        }
    }

    /// Locks the request, checks the transition table and writes the new
    /// status, hook side effects and action log in a single transaction.
    ///
    /// Concurrent commands on the same request serialize on the row lock;
    /// the loser re-reads the committed status and is usually rejected with
    /// [`WorkflowError::CannotUpdate`].
    pub async fn apply(
        &self,
        actor: &Actor,
        command: TransitionCommand,
    ) -> Result<TransitionOutcome, WorkflowError> {
        if !actor.can_act_in(command.stage) {
            return Err(WorkflowError::Forbidden);
        }
        let reason = normalize(command.reason.as_deref());
        if command.action.requires_reason() && reason.is_none() {
            return Err(WorkflowError::InvalidInput(format!(
                "a reason is required to {}",
                command.action
            )));
        }

        let mut tx = begin_transaction::<WorkflowError>(&self.pool).await?;
        match self.apply_locked(&mut tx, actor, &command, reason).await {
            Ok(outcome) => {
                commit_transaction::<WorkflowError>(tx).await?;
                tracing::info!(
                    request_uid = %command.request_uid,
                    request_no = %outcome.request.request_no,
                    from = %outcome.from,
                    to = %outcome.request.status,
                    action = %command.action,
                    emp_id = %actor.emp_id(),
                    role = %outcome.role,
                    "Booking request transitioned"
                );
                Ok(outcome)
            }
            Err(err) => {
                if let Err(rollback_err) = rollback_transaction::<WorkflowError>(tx).await {
                    tracing::warn!(
                        request_uid = %command.request_uid,
                        error = %rollback_err,
                        "Failed to roll back transition"
                    );
                }
                Err(err)
            }
        }
    }

    async fn apply_locked(
        &self,
        conn: &mut PgConnection,
        actor: &Actor,
        command: &TransitionCommand,
        reason: Option<String>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let uid = command.request_uid;
        let current = booking_repo::lock_visible(&mut *conn, uid, actor, command.stage)
            .await?
            .ok_or(WorkflowError::NotFound)?;

        let role = actor
            .role_in(command.stage, current.mas_carpool_uid)
            .ok_or(WorkflowError::Forbidden)?;
        let Some(transition) = allowed_transition(current.status, command.action, role) else {
            tracing::debug!(
                request_uid = %uid,
                status = %current.status,
                action = %command.action,
                role = %role,
                "Transition not allowed"
            );
            return Err(WorkflowError::CannotUpdate {
                status: current.status,
                action: command.action.as_str(),
            });
        };

        let at = Utc::now();
        let hooks = self.hooks.for_action(command.action);
        let ctx = HookContext {
            request: &current,
            details: &command.details,
            actor,
            at,
        };
        for hook in hooks {
            hook.validate(&ctx)?;
        }

        let change = StatusChange {
            uid,
            to: transition.to,
            stamp: transition.stamp.map(|columns| (columns, &actor.employee)),
            reason: reason.as_deref(),
            canceled_role: (command.action == Action::Cancel).then_some(role),
            at,
            by: actor.emp_id(),
        };
        booking_repo::apply_status_change(&mut *conn, &change).await?;

        for hook in hooks {
            hook.apply(&mut *conn, &ctx).await?;
        }

        let log = action_log::append(
            &mut *conn,
            ActionLogEntry::new(
                uid,
                transition.to,
                command.action.as_str(),
                reason,
                actor,
                role,
                normalize(command.remark.as_deref()),
                at,
            ),
        )
        .await?;

        let request = booking_repo::find_by_uid(&mut *conn, uid).await?;
        Ok(TransitionOutcome {
            request,
            from: current.status,
            role,
            log,
        })
    }
}

fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
