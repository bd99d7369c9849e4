//! SQLite rendition of the roster, marks and submission collaborators.

use crate::grading::{self, Grade, StudentMark};
use crate::model::{AttendanceMark, AttendanceStatus, RosterEntry};
use crate::providers::{MarksProvider, RosterProvider, SubmissionReceipt, SubmissionSink, SubmittedMark};
use anyhow::{anyhow, Context};
use chrono::{Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

const DEMO_STUDENTS: [(&str, &str, &str); 10] = [
    ("Arjun-101", "Arjun Mehta", "101"),
    ("Sana-102", "Sana Khan", "102"),
    ("Rahul-103", "Rahul Sharma", "103"),
    ("Priya-104", "Priya Verma", "104"),
    ("Amit-105", "Amit Singh", "105"),
    ("Sneha-106", "Sneha Patil", "106"),
    ("Rohan-107", "Rohan Das", "107"),
    ("Neha-108", "Neha Gupta", "108"),
    ("Vikram-109", "Vikram Rathore", "109"),
    ("Anjali-110", "Anjali Nair", "110"),
];

pub struct SqliteBackend<'a> {
    conn: &'a Connection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSummary {
    pub created: usize,
    pub existing: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksUploadSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseMarkRow {
    pub student_id: String,
    pub student_name: String,
    pub roll_number: String,
    pub marks_obtained: f64,
    pub max_marks: f64,
    pub percentage: u32,
    pub grade: Grade,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamMarks {
    pub exam_type: String,
    pub marks: Vec<CourseMarkRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentMarkRow {
    pub course_id: String,
    pub exam_type: String,
    pub marks_obtained: f64,
    pub max_marks: f64,
    pub percentage: u32,
    pub grade: Grade,
    pub updated_at: Option<String>,
}

impl<'a> SqliteBackend<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn list_students(&self) -> anyhow::Result<Vec<RosterEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, roll_number FROM students ORDER BY roll_number, id")?;
        let rows = stmt
            .query_map([], |r| {
                Ok(RosterEntry {
                    id: r.get(0)?,
                    name: r.get(1)?,
                    roll_number: r.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn student(&self, id: &str) -> anyhow::Result<Option<RosterEntry>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, roll_number FROM students WHERE id = ?",
                [id],
                |r| {
                    Ok(RosterEntry {
                        id: r.get(0)?,
                        name: r.get(1)?,
                        roll_number: r.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Get-or-create: returns false when the id already existed.
    pub fn create_student(&self, entry: &RosterEntry) -> anyhow::Result<bool> {
        let changed = self.conn.execute(
            "INSERT INTO students(id, name, roll_number, created_at)
             VALUES(?, ?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
            (
                &entry.id,
                &entry.name,
                &entry.roll_number,
                Local::now().to_rfc3339(),
            ),
        )?;
        Ok(changed > 0)
    }

    pub fn seed_demo_students(&self) -> anyhow::Result<SeedSummary> {
        let mut summary = SeedSummary {
            created: 0,
            existing: 0,
        };
        for (id, name, roll) in DEMO_STUDENTS {
            let created = self.create_student(&RosterEntry {
                id: id.to_string(),
                name: name.to_string(),
                roll_number: roll.to_string(),
            })?;
            if created {
                summary.created += 1;
            } else {
                summary.existing += 1;
            }
        }
        Ok(summary)
    }

    pub fn marks_for_date(&self, date: NaiveDate) -> anyhow::Result<Vec<AttendanceMark>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.student_id, a.status
             FROM attendance a
             JOIN students s ON s.id = a.student_id
             WHERE a.date = ?
             ORDER BY s.roll_number, s.id",
        )?;
        let rows = stmt
            .query_map([date.to_string()], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(student_id, code)| {
                let status = AttendanceStatus::from_code(&code)
                    .ok_or_else(|| anyhow!("unknown attendance status '{code}' for {student_id}"))?;
                Ok(AttendanceMark {
                    student_id,
                    date,
                    status,
                })
            })
            .collect()
    }

    /// Upserts one day's marks in a single transaction. Unknown students are
    /// skipped, not fatal.
    pub fn submit_attendance(
        &self,
        date: NaiveDate,
        marks: &[SubmittedMark],
    ) -> anyhow::Result<SubmissionReceipt> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("failed to begin attendance transaction")?;
        let day = date.to_string();
        let marked_at = Local::now().format("%H:%M:%S").to_string();
        let mut created = 0usize;
        let mut updated = 0usize;
        let mut skipped = Vec::new();

        for m in marks {
            let known = tx
                .query_row("SELECT 1 FROM students WHERE id = ?", [&m.student_id], |r| {
                    r.get::<_, i64>(0)
                })
                .optional()?
                .is_some();
            if !known {
                tracing::warn!(student_id = %m.student_id, "attendance for unknown student skipped");
                skipped.push(m.student_id.clone());
                continue;
            }

            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM attendance WHERE student_id = ? AND date = ?",
                    (&m.student_id, &day),
                    |r| r.get(0),
                )
                .optional()?;
            match existing {
                Some(id) => {
                    tx.execute(
                        "UPDATE attendance SET status = ?, marked_at = ? WHERE id = ?",
                        (m.status.code(), &marked_at, &id),
                    )
                    .context("failed to update attendance")?;
                    updated += 1;
                }
                None => {
                    tx.execute(
                        "INSERT INTO attendance(id, student_id, date, status, marked_at)
                         VALUES(?, ?, ?, ?, ?)",
                        (
                            Uuid::new_v4().to_string(),
                            &m.student_id,
                            &day,
                            m.status.code(),
                            &marked_at,
                        ),
                    )
                    .context("failed to insert attendance")?;
                    created += 1;
                }
            }
        }
        tx.commit().context("failed to commit attendance")?;

        Ok(SubmissionReceipt {
            created: Some(created),
            updated: Some(updated),
            skipped,
        })
    }

    /// Marks must already be validated (see `grading::student_mark`).
    pub fn upload_marks(
        &self,
        course_id: &str,
        exam_type: &str,
        marks: &[StudentMark],
    ) -> anyhow::Result<MarksUploadSummary> {
        let exam_type = normalize_exam_type(exam_type);
        let tx = self
            .conn
            .unchecked_transaction()
            .context("failed to begin marks transaction")?;
        let now = Local::now().to_rfc3339();
        let mut summary = MarksUploadSummary::default();

        for m in marks {
            let known = tx
                .query_row("SELECT 1 FROM students WHERE id = ?", [&m.student_id], |r| {
                    r.get::<_, i64>(0)
                })
                .optional()?
                .is_some();
            if !known {
                tracing::warn!(student_id = %m.student_id, "marks for unknown student skipped");
                summary.skipped.push(m.student_id.clone());
                continue;
            }
            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM marks WHERE student_id = ? AND course_id = ? AND exam_type = ?",
                    (&m.student_id, course_id, &exam_type),
                    |r| r.get(0),
                )
                .optional()?;
            match existing {
                Some(id) => {
                    tx.execute(
                        "UPDATE marks SET marks_obtained = ?, max_marks = ?, updated_at = ? WHERE id = ?",
                        (m.marks_obtained, m.max_marks, &now, &id),
                    )
                    .context("failed to update marks")?;
                    summary.updated += 1;
                }
                None => {
                    tx.execute(
                        "INSERT INTO marks(id, student_id, course_id, exam_type, marks_obtained, max_marks, updated_at)
                         VALUES(?, ?, ?, ?, ?, ?, ?)",
                        (
                            Uuid::new_v4().to_string(),
                            &m.student_id,
                            course_id,
                            &exam_type,
                            m.marks_obtained,
                            m.max_marks,
                            &now,
                        ),
                    )
                    .context("failed to insert marks")?;
                    summary.created += 1;
                }
            }
        }
        tx.commit().context("failed to commit marks")?;
        Ok(summary)
    }

    /// Marks for a course grouped by exam type, groups in first-seen order.
    pub fn course_marks(&self, course_id: &str) -> anyhow::Result<Vec<ExamMarks>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.exam_type, m.student_id, s.name, s.roll_number, m.marks_obtained, m.max_marks
             FROM marks m
             JOIN students s ON s.id = m.student_id
             WHERE m.course_id = ?
             ORDER BY m.exam_type, s.name",
        )?;
        let rows = stmt
            .query_map([course_id], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, f64>(4)?,
                    r.get::<_, f64>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut groups: Vec<ExamMarks> = Vec::new();
        for (exam_type, student_id, student_name, roll_number, obtained, max) in rows {
            let scored = grading::score(obtained, max)
                .map_err(|e| anyhow!("stored marks for {student_id} are unusable: {e}"))?;
            let row = CourseMarkRow {
                student_id,
                student_name,
                roll_number,
                marks_obtained: obtained,
                max_marks: max,
                percentage: scored.percentage,
                grade: scored.grade,
            };
            match groups.iter_mut().find(|g| g.exam_type == exam_type) {
                Some(g) => g.marks.push(row),
                None => groups.push(ExamMarks {
                    exam_type,
                    marks: vec![row],
                }),
            }
        }
        Ok(groups)
    }

    /// Every mark one student holds across courses, most recently updated first.
    pub fn student_marks(&self, student_id: &str) -> anyhow::Result<Vec<StudentMarkRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.course_id, m.exam_type, m.marks_obtained, m.max_marks, m.updated_at
             FROM marks m
             JOIN students s ON s.id = m.student_id
             WHERE m.student_id = ?
             ORDER BY m.updated_at DESC, m.course_id, m.exam_type",
        )?;
        let rows = stmt
            .query_map([student_id], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, f64>(2)?,
                    r.get::<_, f64>(3)?,
                    r.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(course_id, exam_type, obtained, max, updated_at)| {
                let scored = grading::score(obtained, max)
                    .map_err(|e| anyhow!("stored marks for {student_id} are unusable: {e}"))?;
                Ok(StudentMarkRow {
                    course_id,
                    exam_type,
                    marks_obtained: obtained,
                    max_marks: max,
                    percentage: scored.percentage,
                    grade: scored.grade,
                    updated_at,
                })
            })
            .collect()
    }
}

/// `" midterm exam "` becomes `"Midterm Exam"`.
fn normalize_exam_type(raw: &str) -> String {
    raw.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl RosterProvider for SqliteBackend<'_> {
    fn fetch_roster(&self) -> anyhow::Result<Vec<RosterEntry>> {
        self.list_students().context("failed to load roster")
    }
}

impl MarksProvider for SqliteBackend<'_> {
    fn fetch_marks_for_date(&self, date: NaiveDate) -> anyhow::Result<Vec<AttendanceMark>> {
        self.marks_for_date(date)
            .with_context(|| format!("failed to load marks for {date}"))
    }
}

impl SubmissionSink for SqliteBackend<'_> {
    fn submit_marks(
        &self,
        date: NaiveDate,
        marks: &[SubmittedMark],
    ) -> anyhow::Result<SubmissionReceipt> {
        self.submit_attendance(date, marks)
            .with_context(|| format!("failed to submit attendance for {date}"))
    }
}
