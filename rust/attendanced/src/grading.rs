use crate::error::{EngineError, EngineResult};
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grade {
    APlus,
    A,
    BPlus,
    B,
    CPlus,
    C,
    D,
    F,
}

impl Grade {
    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

/// Lower bounds, highest band first. Anything under the last bound is `F`.
const BANDS: [(u32, Grade); 7] = [
    (90, Grade::APlus),
    (85, Grade::A),
    (80, Grade::BPlus),
    (75, Grade::B),
    (70, Grade::CPlus),
    (60, Grade::C),
    (50, Grade::D),
];

pub fn grade(percentage: u32) -> Grade {
    BANDS
        .iter()
        .find(|(floor, _)| percentage >= *floor)
        .map(|(_, g)| *g)
        .unwrap_or(Grade::F)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub percentage: u32,
    pub grade: Grade,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentMark {
    pub student_id: String,
    pub marks_obtained: f64,
    pub max_marks: f64,
    pub percentage: u32,
    pub grade: Grade,
}

/// `round(obtained / max * 100)` graded on the rounded value. Marks above the
/// maximum are accepted (bonus work) and simply grade as `A+`.
pub fn score(marks_obtained: f64, max_marks: f64) -> EngineResult<Score> {
    if !max_marks.is_finite() || max_marks <= 0.0 {
        return Err(EngineError::Invalid(format!(
            "maxMarks must be greater than zero (got {max_marks})"
        )));
    }
    if !marks_obtained.is_finite() || marks_obtained < 0.0 {
        return Err(EngineError::Invalid(format!(
            "marksObtained must be a non-negative number (got {marks_obtained})"
        )));
    }
    let percentage = (marks_obtained / max_marks * 100.0).round() as u32;
    Ok(Score {
        percentage,
        grade: grade(percentage),
    })
}

pub fn student_mark(student_id: &str, marks_obtained: f64, max_marks: f64) -> EngineResult<StudentMark> {
    let s = score(marks_obtained, max_marks)?;
    Ok(StudentMark {
        student_id: student_id.to_string(),
        marks_obtained,
        max_marks,
        percentage: s.percentage,
        grade: s.grade,
    })
}

/// Rounded mean of obtained marks; 0 for an empty class.
pub fn average_marks(marks: &[f64]) -> i64 {
    if marks.is_empty() {
        return 0;
    }
    let total: f64 = marks.iter().sum();
    (total / marks.len() as f64).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_edges_are_inclusive_lower_bounds() {
        let cases = [
            (100, "A+"),
            (90, "A+"),
            (89, "A"),
            (85, "A"),
            (84, "B+"),
            (80, "B+"),
            (79, "B"),
            (75, "B"),
            (74, "C+"),
            (70, "C+"),
            (69, "C"),
            (60, "C"),
            (59, "D"),
            (50, "D"),
            (49, "F"),
            (0, "F"),
        ];
        for (pct, expected) in cases {
            assert_eq!(grade(pct).as_str(), expected, "percentage {pct}");
        }
    }

    #[test]
    fn score_rounds_then_grades() {
        let s = score(45.0, 50.0).expect("score");
        assert_eq!(s, Score { percentage: 90, grade: Grade::APlus });
        // 89.6 rounds to 90 before grading.
        let s = score(89.6, 100.0).expect("score");
        assert_eq!(s.percentage, 90);
        assert_eq!(s.grade, Grade::APlus);
        let s = score(0.0, 100.0).expect("score");
        assert_eq!(s, Score { percentage: 0, grade: Grade::F });
    }

    #[test]
    fn zero_max_marks_is_rejected() {
        assert!(matches!(score(10.0, 0.0), Err(EngineError::Invalid(_))));
        assert!(matches!(score(10.0, -5.0), Err(EngineError::Invalid(_))));
        assert!(matches!(score(-1.0, 100.0), Err(EngineError::Invalid(_))));
        assert!(matches!(score(f64::NAN, 100.0), Err(EngineError::Invalid(_))));
    }

    #[test]
    fn bonus_marks_grade_as_top_band() {
        let s = score(110.0, 100.0).expect("score");
        assert_eq!(s.percentage, 110);
        assert_eq!(s.grade, Grade::APlus);
    }

    #[test]
    fn student_mark_serializes_grade_as_text() {
        let m = student_mark("S1", 38.0, 50.0).expect("mark");
        let v = serde_json::to_value(&m).expect("json");
        assert_eq!(v["studentId"], "S1");
        assert_eq!(v["percentage"], 76);
        assert_eq!(v["grade"], "B");
    }

    #[test]
    fn average_marks_rounds_and_handles_empty() {
        assert_eq!(average_marks(&[]), 0);
        assert_eq!(average_marks(&[80.0, 85.0]), 83);
        assert_eq!(average_marks(&[70.0, 71.0, 71.0]), 71);
    }
}
