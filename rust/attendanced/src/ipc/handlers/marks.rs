use super::{get_number, get_required_str};
use crate::backend::SqliteBackend;
use crate::grading::{self, StudentMark};
use crate::ipc::error::{db_err, ok, no_workspace, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn marks_score(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let obtained = get_number(params, "marksObtained")?
        .ok_or_else(|| HandlerErr::new("bad_params", "missing marksObtained"))?;
    let max = get_number(params, "maxMarks")?.unwrap_or(state.config.default_max_marks);
    let s = grading::score(obtained, max)?;
    Ok(json!({
        "marksObtained": obtained,
        "maxMarks": max,
        "percentage": s.percentage,
        "grade": s.grade,
    }))
}

/// Every record is validated before anything is written.
fn parse_upload_records(
    params: &serde_json::Value,
    default_max: f64,
) -> Result<Vec<StudentMark>, HandlerErr> {
    let Some(items) = params.get("records").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::new("bad_params", "missing records"));
    };
    if items.is_empty() {
        return Err(HandlerErr::new("bad_params", "records must not be empty"));
    }
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let parsed = get_required_str(item, "studentId").and_then(|student_id| {
            let obtained = get_number(item, "marksObtained")?
                .ok_or_else(|| HandlerErr::new("bad_params", "missing marksObtained"))?;
            let max = get_number(item, "maxMarks")?.unwrap_or(default_max);
            grading::student_mark(&student_id, obtained, max).map_err(HandlerErr::from)
        });
        match parsed {
            Ok(m) => out.push(m),
            Err(mut e) => {
                e.details = Some(json!({ "index": i }));
                return Err(e);
            }
        }
    }
    Ok(out)
}

fn marks_upload(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = state.db.as_ref().ok_or_else(no_workspace)?;
    let course_id = get_required_str(params, "courseId")?;
    let exam_type = get_required_str(params, "examType")?;
    let records = parse_upload_records(params, state.config.default_max_marks)?;
    let summary = SqliteBackend::new(conn)
        .upload_marks(&course_id, &exam_type, &records)
        .map_err(|e| HandlerErr {
            code: "db_update_failed",
            message: format!("{e:#}"),
            details: Some(json!({ "table": "marks" })),
        })?;
    tracing::info!(
        course_id = %course_id,
        created = summary.created,
        updated = summary.updated,
        skipped = summary.skipped.len(),
        "marks uploaded"
    );
    Ok(json!(summary))
}

fn marks_course(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = state.db.as_ref().ok_or_else(no_workspace)?;
    let course_id = get_required_str(params, "courseId")?;
    let exams = SqliteBackend::new(conn).course_marks(&course_id).map_err(db_err)?;
    let obtained: Vec<f64> = exams
        .iter()
        .flat_map(|e| e.marks.iter().map(|m| m.marks_obtained))
        .collect();
    Ok(json!({
        "courseId": course_id,
        "exams": exams,
        "classAverage": grading::average_marks(&obtained),
    }))
}

fn marks_student(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = state.db.as_ref().ok_or_else(no_workspace)?;
    let student_id = get_required_str(params, "studentId")?;
    let backend = SqliteBackend::new(conn);
    let student = backend
        .student(&student_id)
        .map_err(db_err)?
        .ok_or_else(|| HandlerErr::new("not_found", format!("student {student_id} not found")))?;
    let marks = backend.student_marks(&student_id).map_err(db_err)?;
    Ok(json!({
        "student": student,
        "marks": marks,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "marks.score" => marks_score(state, &req.params),
        "marks.upload" => marks_upload(state, &req.params),
        "marks.course" => marks_course(state, &req.params),
        "marks.student" => marks_student(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
