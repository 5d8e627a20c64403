//! Per-stage status labels shown by list views.

use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::models::actor::Stage;
use crate::models::request_status::RequestStatus;

const EMBEDDED_CATALOG: &str = include_str!("../../config/status_catalog.json");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    pub code: RequestStatus,
    pub label: String,
}

/// One summary bucket: a label and how many visible requests carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub ref_request_status_code: String,
    pub ref_request_status_name: String,
    pub count: i64,
}

#[derive(Debug, Clone)]
pub struct StatusCatalog {
    stages: HashMap<Stage, Vec<CatalogEntry>>,
}

impl StatusCatalog {
    pub fn embedded() -> anyhow::Result<Self> {
        Self::from_json(EMBEDDED_CATALOG).context("embedded status catalog is invalid")
    }

    /// Loads the catalog from `path`, or the embedded copy when none is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read status catalog {}", path.display()))?;
                Self::from_json(&raw)
                    .with_context(|| format!("invalid status catalog {}", path.display()))
            }
            None => Self::embedded(),
        }
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let stages: HashMap<Stage, Vec<CatalogEntry>> = serde_json::from_str(raw)?;
        for stage in Stage::ALL {
            let entries = stages
                .get(&stage)
                .ok_or_else(|| anyhow!("stage {} is missing", stage))?;
            if entries.is_empty() {
                bail!("stage {} lists no statuses", stage);
            }
            for (index, entry) in entries.iter().enumerate() {
                if entries[..index].iter().any(|e| e.code == entry.code) {
                    bail!("stage {} lists status {} twice", stage, entry.code);
                }
            }
        }
        Ok(Self { stages })
    }

    fn entries(&self, stage: Stage) -> &[CatalogEntry] {
        self.stages.get(&stage).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn visible_codes(&self, stage: Stage) -> Vec<RequestStatus> {
        self.entries(stage).iter().map(|e| e.code).collect()
    }

    pub fn label(&self, stage: Stage, status: RequestStatus) -> Option<&str> {
        self.entries(stage)
            .iter()
            .find(|e| e.code == status)
            .map(|e| e.label.as_str())
    }

    /// Groups status counts by label in catalog order; labels with no
    /// requests still appear with a zero count.
    pub fn summarize(&self, stage: Stage, counts: &[(RequestStatus, i64)]) -> Vec<StatusSummary> {
        let mut summary: Vec<(Vec<&str>, &str, i64)> = Vec::new();
        for entry in self.entries(stage) {
            let count = counts
                .iter()
                .filter(|(status, _)| *status == entry.code)
                .map(|(_, count)| *count)
                .sum::<i64>();
            match summary.iter_mut().find(|(_, label, _)| *label == entry.label) {
                Some((codes, _, total)) => {
                    codes.push(entry.code.code());
                    *total += count;
                }
                None => summary.push((vec![entry.code.code()], entry.label.as_str(), count)),
            }
        }

        summary
            .into_iter()
            .map(|(codes, label, count)| StatusSummary {
                ref_request_status_code: codes.join(","),
                ref_request_status_name: label.to_string(),
                count,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_catalog_covers_every_stage() {
        let catalog = StatusCatalog::embedded().expect("embedded catalog");
        for stage in Stage::ALL {
            assert!(!catalog.visible_codes(stage).is_empty(), "stage {stage}");
        }
        assert_eq!(
            catalog.label(Stage::Driver, RequestStatus::CanceledByDriver),
            Some("ยกเลิกงาน")
        );
        assert_eq!(
            catalog.label(Stage::BookingConfirmer, RequestStatus::CanceledByAdmin),
            None
        );
    }

    #[test]
    fn catalog_rejects_unknown_codes_and_missing_stages() {
        let unknown = r#"{"booking-user": [{"code": "55", "label": "x"}]}"#;
        assert!(StatusCatalog::from_json(unknown).is_err());

        let missing = r#"{"booking-user": [{"code": "10", "label": "x"}]}"#;
        let err = StatusCatalog::from_json(missing).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn catalog_rejects_duplicate_codes() {
        let mut raw: serde_json::Value = serde_json::from_str(EMBEDDED_CATALOG).unwrap();
        raw["driver"]
            .as_array_mut()
            .unwrap()
            .push(serde_json::json!({"code": "50", "label": "again"}));
        let err = StatusCatalog::from_json(&raw.to_string()).unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn summarize_groups_by_label_and_keeps_zero_counts() {
        let catalog = StatusCatalog::embedded().unwrap();
        let counts = [
            (RequestStatus::WaitingConfirmation, 2),
            (RequestStatus::WaitingFinalApproval, 1),
            (RequestStatus::Completed, 4),
        ];
        let summary = catalog.summarize(Stage::BookingUser, &counts);

        let waiting = &summary[0];
        assert_eq!(waiting.ref_request_status_code, "10,20,30");
        assert_eq!(waiting.count, 3);

        let done = summary
            .iter()
            .find(|s| s.ref_request_status_code == "80")
            .unwrap();
        assert_eq!(done.count, 4);

        let sent_back = summary
            .iter()
            .find(|s| s.ref_request_status_code == "21,31,41")
            .unwrap();
        assert_eq!(sent_back.count, 0);
    }
}
