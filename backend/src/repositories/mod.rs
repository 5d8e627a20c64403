pub mod action_log;
pub mod booking_request;
pub mod common;
pub mod employee;
pub mod key_handover;
pub mod transaction;
pub mod trip_records;
pub mod vehicle;

pub use employee::{EmployeeDirectory, PgEmployeeDirectory};
pub use transaction::*;

#[cfg(test)]
pub use employee::MockEmployeeDirectory;
