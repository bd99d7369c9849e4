//! Daily attendance sheets.
//!
//! A sheet is the roster joined with whatever marks already exist for one
//! date. A student with no mark starts as `Present`; this is the only place
//! that default is applied.

use crate::error::{EngineError, EngineResult};
use crate::model::{AttendanceMark, AttendanceStatus, RosterEntry};
use crate::providers::{MarksProvider, RosterProvider, SubmissionReceipt, SubmissionSink, SubmittedMark};
use crate::store::AttendanceStore;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

pub const DEFAULT_STATUS: AttendanceStatus = AttendanceStatus::Present;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySheetRow {
    pub roster: RosterEntry,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySheet {
    pub rows: Vec<DailySheetRow>,
}

impl DailySheet {
    pub fn present_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.status == AttendanceStatus::Present)
            .count()
    }

    pub fn absent_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.status == AttendanceStatus::Absent)
            .count()
    }

    pub fn status_of(&self, student_id: &str) -> Option<AttendanceStatus> {
        self.rows
            .iter()
            .find(|r| r.roster.id == student_id)
            .map(|r| r.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarksSource {
    /// Existing marks were applied.
    Remote,
    /// The provider answered with no marks for the date.
    Empty,
    /// The provider failed; every student took the default.
    Unavailable,
}

/// Rows follow roster order. When `marks` holds more than one mark for a
/// student the last one wins.
pub fn build_sheet(roster: &[RosterEntry], marks: &[AttendanceMark]) -> DailySheet {
    let mut by_student: HashMap<&str, AttendanceStatus> = HashMap::new();
    for m in marks {
        by_student.insert(m.student_id.as_str(), m.status);
    }
    DailySheet {
        rows: roster
            .iter()
            .map(|entry| DailySheetRow {
                roster: entry.clone(),
                status: by_student
                    .get(entry.id.as_str())
                    .copied()
                    .unwrap_or(DEFAULT_STATUS),
            })
            .collect(),
    }
}

/// Like [`build_sheet`], but a failed marks fetch still yields a full sheet of
/// defaults.
pub fn build_sheet_from_fetch(
    roster: &[RosterEntry],
    marks: anyhow::Result<Vec<AttendanceMark>>,
) -> (DailySheet, MarksSource) {
    match marks {
        Ok(m) if m.is_empty() => (build_sheet(roster, &[]), MarksSource::Empty),
        Ok(m) => (build_sheet(roster, &m), MarksSource::Remote),
        Err(e) => {
            let message = format!("{e:#}");
            tracing::warn!(error = %message, "marks unavailable for date, defaulting sheet");
            (build_sheet(roster, &[]), MarksSource::Unavailable)
        }
    }
}

/// Flips one row and returns its new status.
pub fn toggle(sheet: &mut DailySheet, student_id: &str) -> EngineResult<AttendanceStatus> {
    let row = sheet
        .rows
        .iter_mut()
        .find(|r| r.roster.id == student_id)
        .ok_or_else(|| EngineError::NotFound(format!("student {student_id} is not on the sheet")))?;
    row.status = row.status.toggled();
    Ok(row.status)
}

pub fn to_submission(sheet: &DailySheet, date: NaiveDate) -> Vec<AttendanceMark> {
    sheet
        .rows
        .iter()
        .map(|r| AttendanceMark {
            student_id: r.roster.id.clone(),
            date,
            status: r.status,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedDay {
    pub date: NaiveDate,
    pub sheet: DailySheet,
    pub marks_source: MarksSource,
}

/// Fetches the roster and the date's marks and builds the sheet. A roster
/// failure is returned; a marks failure is absorbed.
pub fn open_day(
    roster: &dyn RosterProvider,
    marks: &dyn MarksProvider,
    date: NaiveDate,
) -> EngineResult<OpenedDay> {
    let entries = roster.fetch_roster().map_err(EngineError::unavailable)?;
    let (sheet, marks_source) = build_sheet_from_fetch(&entries, marks.fetch_marks_for_date(date));
    tracing::info!(
        %date,
        students = sheet.rows.len(),
        source = ?marks_source,
        "attendance sheet opened"
    );
    Ok(OpenedDay {
        date,
        sheet,
        marks_source,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub submitted: usize,
    pub recorded: usize,
    pub receipt: SubmissionReceipt,
    /// Set when the sink accepted the marks but the local store could not
    /// record them. The submission itself still stands.
    #[serde(skip)]
    pub local_error: Option<EngineError>,
}

/// Sends the sheet to the sink, then records the accepted marks locally as one
/// batch. Nothing is recorded when the sink fails. Once the sink has accepted
/// the marks the call succeeds; a local recording failure is reported in
/// `local_error` with `recorded == 0`.
pub fn submit_day(
    sink: &dyn SubmissionSink,
    store: &mut AttendanceStore,
    sheet: &DailySheet,
    date: NaiveDate,
) -> EngineResult<SubmitOutcome> {
    if sheet.rows.is_empty() {
        return Err(EngineError::Invalid(
            "no students to mark attendance for".into(),
        ));
    }
    let marks = to_submission(sheet, date);
    let payload: Vec<SubmittedMark> = marks
        .iter()
        .map(|m| SubmittedMark {
            student_id: m.student_id.clone(),
            status: m.status,
        })
        .collect();

    let receipt = sink
        .submit_marks(date, &payload)
        .map_err(EngineError::unavailable)?;

    let drafts: Vec<_> = sheet
        .rows
        .iter()
        .filter(|r| !receipt.skipped.contains(&r.roster.id))
        .map(|r| store.draft(&r.roster.id, &r.roster.name, r.status.into(), date))
        .collect();
    let (recorded, local_error) = match store.bulk_append(drafts) {
        Ok(n) => (n, None),
        Err(e) => {
            tracing::warn!(%date, error = %e, "attendance submitted but not recorded locally");
            (0, Some(e))
        }
    };

    tracing::info!(%date, submitted = payload.len(), recorded, "attendance submitted");
    Ok(SubmitOutcome {
        submitted: payload.len(),
        recorded,
        receipt,
        local_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(n: usize) -> Vec<RosterEntry> {
        (1..=n)
            .map(|i| RosterEntry {
                id: format!("S{i}"),
                name: format!("Student {i}"),
                roll_number: format!("{}", 100 + i),
            })
            .collect()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 6).expect("date")
    }

    #[test]
    fn empty_marks_default_everyone_present_in_roster_order() {
        let sheet = build_sheet(&roster(5), &[]);
        assert_eq!(sheet.rows.len(), 5);
        assert!(sheet.rows.iter().all(|r| r.status == AttendanceStatus::Present));
        let ids: Vec<&str> = sheet.rows.iter().map(|r| r.roster.id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S2", "S3", "S4", "S5"]);
    }

    #[test]
    fn existing_marks_apply_and_order_stays_roster_order() {
        let marks = vec![
            AttendanceMark { student_id: "S3".into(), date: day(), status: AttendanceStatus::Absent },
            AttendanceMark { student_id: "S1".into(), date: day(), status: AttendanceStatus::Absent },
            AttendanceMark { student_id: "S1".into(), date: day(), status: AttendanceStatus::Present },
            AttendanceMark { student_id: "ZZ".into(), date: day(), status: AttendanceStatus::Absent },
        ];
        let sheet = build_sheet(&roster(3), &marks);
        let statuses: Vec<AttendanceStatus> = sheet.rows.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![AttendanceStatus::Present, AttendanceStatus::Present, AttendanceStatus::Absent]
        );
        assert_eq!(sheet.present_count(), 2);
        assert_eq!(sheet.absent_count(), 1);
    }

    #[test]
    fn failed_fetch_still_builds_full_sheet() {
        let (sheet, source) = build_sheet_from_fetch(&roster(4), Err(anyhow::anyhow!("timeout")));
        assert_eq!(source, MarksSource::Unavailable);
        assert_eq!(sheet.rows.len(), 4);
        assert_eq!(sheet.present_count(), 4);

        let (_, source) = build_sheet_from_fetch(&roster(4), Ok(vec![]));
        assert_eq!(source, MarksSource::Empty);
    }

    #[test]
    fn toggle_twice_restores_and_unknown_reports_not_found() {
        let mut sheet = build_sheet(&roster(2), &[]);
        let original = sheet.clone();
        assert_eq!(toggle(&mut sheet, "S2").expect("toggle"), AttendanceStatus::Absent);
        assert_eq!(sheet.status_of("S1"), Some(AttendanceStatus::Present));
        assert_eq!(toggle(&mut sheet, "S2").expect("toggle"), AttendanceStatus::Present);
        assert_eq!(sheet, original);

        assert!(matches!(toggle(&mut sheet, "S9"), Err(EngineError::NotFound(_))));
        assert_eq!(sheet, original);
    }

    #[test]
    fn submission_keys_every_row_by_date() {
        let mut sheet = build_sheet(&roster(2), &[]);
        toggle(&mut sheet, "S1").expect("toggle");
        let marks = to_submission(&sheet, day());
        assert_eq!(
            marks,
            vec![
                AttendanceMark { student_id: "S1".into(), date: day(), status: AttendanceStatus::Absent },
                AttendanceMark { student_id: "S2".into(), date: day(), status: AttendanceStatus::Present },
            ]
        );
    }
}
