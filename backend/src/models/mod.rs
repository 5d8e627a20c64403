//! Data models shared across database access and API handlers.

use serde::{Deserialize, Serialize};

/// Page selection shared by list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageParams {
    pub page: i64,
    pub limit: i64,
}

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

impl PageParams {
    /// Clamps raw query values: page starts at 1, limit is 1..=100.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub total_pages: i64,
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(total: i64, params: PageParams) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + params.limit - 1) / params.limit
        };
        Self {
            total,
            total_pages,
            page: params.page,
            limit: params.limit,
        }
    }
}

pub mod action_log;
pub mod actor;
pub mod booking_request;
pub mod employee;
pub mod fuel;
pub mod key_handover;
pub mod progress;
pub mod request_status;
pub mod satisfaction_survey;
pub mod vehicle;
