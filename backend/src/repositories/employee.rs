//! Employee directory lookups and role-scope loading.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::actor::ActorScope;
use crate::models::employee::Employee;
use crate::types::{CarpoolId, DriverId};

/// Source of employee snapshots.
///
/// Designed to be mockable using mockall for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Active employee by id, `None` when unknown or deleted.
    async fn find_employee(&self, emp_id: &str) -> Result<Option<Employee>, AppError>;

    /// Data-visibility scope of an employee across every stage.
    async fn load_scope(&self, emp_id: &str) -> Result<ActorScope, AppError>;
}

#[derive(Debug, Clone)]
pub struct PgEmployeeDirectory {
    pool: PgPool,
}

impl PgEmployeeDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployeeDirectory for PgEmployeeDirectory {
    async fn find_employee(&self, emp_id: &str) -> Result<Option<Employee>, AppError> {
        let employee = sqlx::query_as::<_, Employee>(
            "SELECT emp_id, full_name, dept_sap, dept_short, dept_full, position, desk_phone, \
             mobile_phone \
             FROM mas_employees WHERE emp_id = $1 AND is_deleted = FALSE",
        )
        .bind(emp_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(employee)
    }

    async fn load_scope(&self, emp_id: &str) -> Result<ActorScope, AppError> {
        let admin_dept_saps: Vec<String> = sqlx::query_scalar(
            "SELECT dept_sap FROM mas_vehicle_department_admins WHERE emp_id = $1 ORDER BY dept_sap",
        )
        .bind(emp_id)
        .fetch_all(&self.pool)
        .await?;

        let admin_carpools: Vec<CarpoolId> = sqlx::query_scalar(
            "SELECT mas_carpool_uid FROM mas_carpool_admins WHERE emp_id = $1",
        )
        .bind(emp_id)
        .fetch_all(&self.pool)
        .await?;

        let approver_carpools: Vec<CarpoolId> = sqlx::query_scalar(
            "SELECT mas_carpool_uid FROM mas_carpool_approvers WHERE emp_id = $1",
        )
        .bind(emp_id)
        .fetch_all(&self.pool)
        .await?;

        let driver_uids: Vec<DriverId> = sqlx::query_scalar(
            "SELECT mas_driver_uid FROM mas_drivers WHERE driver_emp_id = $1 AND is_deleted = FALSE",
        )
        .bind(emp_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ActorScope {
            admin_dept_saps,
            admin_carpools,
            approver_carpools,
            driver_uids,
        })
    }
}
