//! Seams to the collaborators the engine calls but does not implement.
//! Failures come back as `anyhow::Error`; the engine decides which of them
//! are recoverable.

use crate::model::{AttendanceMark, AttendanceStatus, RosterEntry};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub trait RosterProvider {
    fn fetch_roster(&self) -> anyhow::Result<Vec<RosterEntry>>;
}

pub trait MarksProvider {
    fn fetch_marks_for_date(&self, date: NaiveDate) -> anyhow::Result<Vec<AttendanceMark>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedMark {
    pub student_id: String,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<usize>,
    /// Student ids the sink did not recognise.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

pub trait SubmissionSink {
    fn submit_marks(
        &self,
        date: NaiveDate,
        marks: &[SubmittedMark],
    ) -> anyhow::Result<SubmissionReceipt>;
}
