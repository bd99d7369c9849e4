use super::get_required_str;
use crate::aggregate;
use crate::backend::SqliteBackend;
use crate::ipc::error::{db_err, ok, no_workspace, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn dashboard_student(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = state.db.as_ref().ok_or_else(no_workspace)?;
    let store = state.store.as_ref().ok_or_else(no_workspace)?;
    let student_id = get_required_str(params, "studentId")?;
    let profile = SqliteBackend::new(conn)
        .student(&student_id)
        .map_err(db_err)?
        .ok_or_else(|| HandlerErr::new("not_found", format!("student {student_id} not found")))?;

    let records = store.history_for(&student_id);
    let summary = aggregate::summarize(&records);
    let mut history = aggregate::chronological(&records);
    history.truncate(state.config.history_limit);
    let recent = aggregate::recent(&records, state.config.recent_limit);
    let monthly = aggregate::monthly_groups(&history);
    let statistics = aggregate::statistics(&records);

    Ok(json!({
        "profile": profile,
        "summary": summary,
        "percentage": summary.percentage,
        "history": history,
        "recent": recent,
        "monthly": monthly,
        "statistics": statistics,
    }))
}

fn dashboard_teacher_summary(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let conn = state.db.as_ref().ok_or_else(no_workspace)?;
    let store = state.store.as_ref().ok_or_else(no_workspace)?;
    let students = SqliteBackend::new(conn).list_students().map_err(db_err)?;
    let rows = aggregate::class_summary(&students, &store.all_records());
    Ok(json!({ "students": rows }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "dashboard.student" => dashboard_student(state, &req.params),
        "dashboard.teacherSummary" => dashboard_teacher_summary(state),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
