use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Icon shown next to a progress step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressIcon {
    #[serde(rename = "0")]
    NotStarted,
    #[serde(rename = "1")]
    InProgress,
    #[serde(rename = "2")]
    Failed,
    #[serde(rename = "3")]
    Completed,
}

/// Lifecycle milestone a step stands for; used to attach timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMilestone {
    Confirmation,
    Verification,
    FinalApproval,
    Approved,
    KeyPickup,
    VehiclePickup,
    VehicleReturn,
    ReturnInspection,
    Cancellation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressStep {
    pub progress_icon: ProgressIcon,
    pub progress_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_datetime: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub milestone: StepMilestone,
}

impl ProgressStep {
    pub fn new(icon: ProgressIcon, name: &str, milestone: StepMilestone) -> Self {
        Self {
            progress_icon: icon,
            progress_name: name.to_string(),
            progress_datetime: None,
            milestone,
        }
    }
}
