use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::types::{RequestUid, SurveyId};

/// Post-trip rating left by the vehicle user. At most one per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct SatisfactionSurvey {
    pub trn_satisfaction_survey_uid: SurveyId,
    pub trn_request_uid: RequestUid,
    pub vehicle_score: i16,
    pub driver_score: Option<i16>,
    pub service_score: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSatisfactionSurvey {
    #[validate(range(min = 1, max = 5))]
    pub vehicle_score: i16,
    #[validate(range(min = 1, max = 5))]
    pub driver_score: Option<i16>,
    #[validate(range(min = 1, max = 5))]
    pub service_score: i16,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

impl SatisfactionSurvey {
    pub fn new(
        trn_request_uid: RequestUid,
        payload: &CreateSatisfactionSurvey,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            trn_satisfaction_survey_uid: SurveyId::new(),
            trn_request_uid,
            vehicle_score: payload.vehicle_score,
            driver_score: payload.driver_score,
            service_score: payload.service_score,
            comment: payload.comment.clone(),
            created_at: now,
            created_by: created_by.to_string(),
        }
    }
}
