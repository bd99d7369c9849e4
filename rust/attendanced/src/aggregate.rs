//! Student-facing attendance statistics.
//!
//! Everything here is a pure function of its input slice. Results are rebuilt
//! from scratch on every call; nothing is cached between calls.

use crate::dates::{format_date_key, format_month_label, parse_date_text};
use crate::model::{AttendanceMark, AttendanceRecord, AttendanceStatus, RosterEntry};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

pub const UNKNOWN_MONTH: &str = "Unknown";

/// `round(present / total * 100)`, or 0 when `total` is 0. Half rounds up.
pub fn percentage(present: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((200 * present + total) / (2 * total)) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSummary {
    pub total: usize,
    pub present: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAttendance {
    pub month: String,
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub percentage: u32,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStatistics {
    pub overall: Summary,
    pub current_streak: usize,
    pub last_7_days: WindowSummary,
    pub last_30_days: WindowSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub student_id: String,
    pub student_name: String,
    pub roll_number: String,
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayReportRow {
    pub student_id: String,
    pub student_name: String,
    pub roll_number: String,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayReport {
    pub date: String,
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub percentage: u32,
    pub rows: Vec<DayReportRow>,
}

fn count<'a, I>(statuses: I) -> Summary
where
    I: IntoIterator<Item = &'a AttendanceStatus>,
{
    let mut s = Summary::default();
    for st in statuses {
        s.total += 1;
        match st {
            AttendanceStatus::Present => s.present += 1,
            AttendanceStatus::Absent => s.absent += 1,
        }
    }
    s.percentage = percentage(s.present, s.total);
    s
}

pub fn summarize(records: &[AttendanceRecord]) -> Summary {
    count(records.iter().map(|r| &r.status))
}

fn window(records: &[AttendanceRecord], n: usize) -> WindowSummary {
    let s = count(records.iter().take(n).map(|r| &r.status));
    WindowSummary {
        total: s.total,
        present: s.present,
        percentage: s.percentage,
    }
}

/// Most recent first. Equal days (and unreadable dates, which sort last) keep
/// their input order.
pub fn chronological(records: &[AttendanceRecord]) -> Vec<AttendanceRecord> {
    let mut keyed: Vec<_> = records
        .iter()
        .map(|r| (parse_date_text(&r.date), r))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| b.cmp_instant(a));
    keyed.into_iter().map(|(_, r)| r.clone()).collect()
}

pub fn recent(records: &[AttendanceRecord], n: usize) -> Vec<AttendanceRecord> {
    let mut sorted = chronological(records);
    sorted.truncate(n);
    sorted
}

/// Groups by calendar month in first-seen order of `records`, which callers
/// normally pass through [`chronological`] first.
pub fn monthly_groups(records: &[AttendanceRecord]) -> Vec<MonthlyAttendance> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<AttendanceRecord>> = HashMap::new();
    for r in records {
        let label = parse_date_text(&r.date)
            .day()
            .map(format_month_label)
            .unwrap_or_else(|| UNKNOWN_MONTH.to_string());
        if !groups.contains_key(&label) {
            order.push(label.clone());
        }
        groups.entry(label).or_default().push(r.clone());
    }

    order
        .into_iter()
        .filter_map(|month| {
            let records = groups.remove(&month)?;
            let s = summarize(&records);
            Some(MonthlyAttendance {
                month,
                total: s.total,
                present: s.present,
                absent: s.absent,
                percentage: s.percentage,
                records,
            })
        })
        .collect()
}

pub fn statistics(records: &[AttendanceRecord]) -> AttendanceStatistics {
    let sorted = chronological(records);
    let current_streak = sorted
        .iter()
        .take_while(|r| r.status == AttendanceStatus::Present)
        .count();
    AttendanceStatistics {
        overall: summarize(&sorted),
        current_streak,
        last_7_days: window(&sorted, 7),
        last_30_days: window(&sorted, 30),
    }
}

/// Records whose day lies in `[start, end]`, most recent first. Unreadable
/// dates never fall inside a range.
pub fn in_range(records: &[AttendanceRecord], start: NaiveDate, end: NaiveDate) -> Vec<AttendanceRecord> {
    let selected: Vec<AttendanceRecord> = records
        .iter()
        .filter(|r| {
            parse_date_text(&r.date)
                .day()
                .map(|d| d >= start && d <= end)
                .unwrap_or(false)
        })
        .cloned()
        .collect();
    chronological(&selected)
}

/// One row per roster entry, in roster order; students with no history get zeros.
pub fn class_summary(roster: &[RosterEntry], records: &[AttendanceRecord]) -> Vec<StudentSummary> {
    let mut by_student: HashMap<&str, Vec<&AttendanceStatus>> = HashMap::new();
    for r in records {
        by_student.entry(r.student_id.as_str()).or_default().push(&r.status);
    }
    roster
        .iter()
        .map(|s| {
            let summary = by_student
                .get(s.id.as_str())
                .map(|v| count(v.iter().copied()))
                .unwrap_or_default();
            StudentSummary {
                student_id: s.id.clone(),
                student_name: s.name.clone(),
                roll_number: s.roll_number.clone(),
                total: summary.total,
                present: summary.present,
                absent: summary.absent,
                percentage: summary.percentage,
            }
        })
        .collect()
}

/// Class report for one date. Rows follow roster order; marks for students
/// missing from the roster come last, labelled by id.
pub fn day_report(roster: &[RosterEntry], marks: &[AttendanceMark], date: NaiveDate) -> DayReport {
    let position: HashMap<&str, (usize, &RosterEntry)> = roster
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), (i, s)))
        .collect();

    let mut rows: Vec<(usize, DayReportRow)> = marks
        .iter()
        .filter(|m| m.date == date)
        .map(|m| match position.get(m.student_id.as_str()) {
            Some((i, s)) => (
                *i,
                DayReportRow {
                    student_id: s.id.clone(),
                    student_name: s.name.clone(),
                    roll_number: s.roll_number.clone(),
                    status: m.status,
                },
            ),
            None => (
                usize::MAX,
                DayReportRow {
                    student_id: m.student_id.clone(),
                    student_name: m.student_id.clone(),
                    roll_number: String::new(),
                    status: m.status,
                },
            ),
        })
        .collect();
    rows.sort_by_key(|(i, _)| *i);

    let rows: Vec<DayReportRow> = rows.into_iter().map(|(_, r)| r).collect();
    let s = count(rows.iter().map(|r| &r.status));
    DayReport {
        date: format_date_key(date),
        total: s.total,
        present: s.present,
        absent: s.absent,
        percentage: s.percentage,
        rows,
    }
}
