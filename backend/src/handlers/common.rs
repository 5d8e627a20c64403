use axum::extract::FromRequest;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::AppError;
use crate::models::actor::{Actor, Stage};

/// JSON body extractor whose rejections render as [`AppError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `{message, result}` envelope returned by mutating endpoints.
#[derive(Debug, Serialize)]
pub struct MessageResponse<T> {
    pub message: String,
    pub result: T,
}

impl<T> MessageResponse<T> {
    pub fn new(message: impl Into<String>, result: T) -> Self {
        Self {
            message: message.into(),
            result,
        }
    }
}

/// Parses the `{stage}` path segment; unknown stages are not routes.
pub fn parse_stage(raw: &str) -> Result<Stage, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("Unknown stage `{}`", raw)))
}

/// Parses the stage and checks the caller holds one of its roles.
pub fn actor_stage(raw: &str, actor: &Actor) -> Result<Stage, AppError> {
    let stage = parse_stage(raw)?;
    if !actor.can_act_in(stage) {
        return Err(AppError::Forbidden(format!(
            "Not allowed to act as {}",
            stage
        )));
    }
    Ok(stage)
}

pub fn parse_date_value(value: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

pub fn parse_optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => parse_date_value(value).map(Some).ok_or_else(|| {
            AppError::BadRequest(
                "`startdate`/`enddate` must be a valid date (YYYY-MM-DD or RFC3339)".to_string(),
            )
        }),
        None => Ok(None),
    }
}
