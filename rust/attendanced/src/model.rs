use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[serde(rename = "P")]
    Present,
    #[serde(rename = "A")]
    Absent,
}

impl AttendanceStatus {
    pub fn toggled(self) -> Self {
        match self {
            AttendanceStatus::Present => AttendanceStatus::Absent,
            AttendanceStatus::Absent => AttendanceStatus::Present,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "P",
            AttendanceStatus::Absent => "A",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "P" | "p" | "Present" => Some(AttendanceStatus::Present),
            "A" | "a" | "Absent" => Some(AttendanceStatus::Absent),
            _ => None,
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceStatus::Present => f.write_str("Present"),
            AttendanceStatus::Absent => f.write_str("Absent"),
        }
    }
}

/// A teacher's choice for one student, including "no decision made".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkChoice {
    #[serde(rename = "P")]
    Present,
    #[serde(rename = "A")]
    Absent,
    #[serde(rename = "none")]
    Unset,
}

impl MarkChoice {
    pub fn status(self) -> Option<AttendanceStatus> {
        match self {
            MarkChoice::Present => Some(AttendanceStatus::Present),
            MarkChoice::Absent => Some(AttendanceStatus::Absent),
            MarkChoice::Unset => None,
        }
    }
}

impl From<AttendanceStatus> for MarkChoice {
    fn from(s: AttendanceStatus) -> Self {
        match s {
            AttendanceStatus::Present => MarkChoice::Present,
            AttendanceStatus::Absent => MarkChoice::Absent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: String,
    pub name: String,
    pub roll_number: String,
}

/// One attendance decision for one student on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceMark {
    pub student_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

/// Persisted, denormalized form of a mark. `date` is kept as text because
/// history arrives in more than one date format; see `dates::parse_date_text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub student_id: String,
    pub student_name: String,
    pub status: AttendanceStatus,
    pub date: String,
    pub time: String,
}

/// A record candidate as submitted in bulk; `Unset` entries never reach history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDraft {
    pub student_id: String,
    pub student_name: String,
    pub status: MarkChoice,
    pub date: String,
    pub time: String,
}

impl RecordDraft {
    pub fn into_record(self) -> Option<AttendanceRecord> {
        let status = self.status.status()?;
        Some(AttendanceRecord {
            student_id: self.student_id,
            student_name: self.student_name,
            status,
            date: self.date,
            time: self.time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_json_shape_uses_short_status_codes() {
        let r = AttendanceRecord {
            student_id: "S1".into(),
            student_name: "Arjun Mehta".into(),
            status: AttendanceStatus::Absent,
            date: "January 06, 2024".into(),
            time: "09:15 AM".into(),
        };
        let v = serde_json::to_value(&r).expect("serialize");
        assert_eq!(v["studentId"], "S1");
        assert_eq!(v["studentName"], "Arjun Mehta");
        assert_eq!(v["status"], "A");
        assert_eq!(v["date"], "January 06, 2024");
        assert_eq!(v["time"], "09:15 AM");
    }

    #[test]
    fn unset_draft_is_dropped() {
        let d = RecordDraft {
            student_id: "S1".into(),
            student_name: "n".into(),
            status: MarkChoice::Unset,
            date: "2024-01-06".into(),
            time: "".into(),
        };
        assert!(d.into_record().is_none());
        let parsed: MarkChoice = serde_json::from_str("\"none\"").expect("parse none");
        assert_eq!(parsed, MarkChoice::Unset);
    }

    #[test]
    fn toggled_is_an_involution() {
        for s in [AttendanceStatus::Present, AttendanceStatus::Absent] {
            assert_eq!(s.toggled().toggled(), s);
            assert_ne!(s.toggled(), s);
        }
    }
}
