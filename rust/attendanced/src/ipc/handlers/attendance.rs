use super::{get_required_date, get_required_str};
use crate::aggregate;
use crate::backend::SqliteBackend;
use crate::ipc::error::{db_err, ok, no_workspace, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::roster;
use serde_json::json;

fn no_sheet() -> HandlerErr {
    HandlerErr::new("no_sheet", "open a day with attendance.openDay first")
}

fn attendance_open_day(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = state.db.as_ref().ok_or_else(no_workspace)?;
    let date = get_required_date(params, "date")?;
    let backend = SqliteBackend::new(conn);
    let opened = roster::open_day(&backend, &backend, date)?;
    let result = json!({
        "date": opened.date,
        "rows": opened.sheet.rows,
        "presentCount": opened.sheet.present_count(),
        "absentCount": opened.sheet.absent_count(),
        "marksSource": opened.marks_source,
    });
    state.open_sheet = Some(opened);
    Ok(result)
}

fn attendance_toggle(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let opened = state.open_sheet.as_mut().ok_or_else(no_sheet)?;
    let status = roster::toggle(&mut opened.sheet, &student_id)?;
    Ok(json!({
        "studentId": student_id,
        "status": status,
        "presentCount": opened.sheet.present_count(),
        "absentCount": opened.sheet.absent_count(),
    }))
}

fn attendance_submit_day(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let conn = state.db.as_ref().ok_or_else(no_workspace)?;
    let store = state.store.as_mut().ok_or_else(no_workspace)?;
    let opened = state.open_sheet.as_ref().ok_or_else(no_sheet)?;
    let backend = SqliteBackend::new(conn);
    let outcome = roster::submit_day(&backend, store, &opened.sheet, opened.date)?;
    let warnings: Vec<serde_json::Value> = outcome
        .local_error
        .iter()
        .map(|w| json!({ "code": w.code(), "message": w.to_string() }))
        .collect();
    Ok(json!({
        "date": opened.date,
        "submitted": outcome.submitted,
        "recorded": outcome.recorded,
        "created": outcome.receipt.created,
        "updated": outcome.receipt.updated,
        "skipped": outcome.receipt.skipped,
        "warnings": warnings,
    }))
}

fn attendance_by_date(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = state.db.as_ref().ok_or_else(no_workspace)?;
    let date = get_required_date(params, "date")?;
    let marks = SqliteBackend::new(conn).marks_for_date(date).map_err(db_err)?;
    Ok(json!({ "date": date, "marks": marks }))
}

fn attendance_history(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let store = state.store.as_ref().ok_or_else(no_workspace)?;
    let student_id = get_required_str(params, "studentId")?;
    Ok(json!({ "records": store.history_for(&student_id) }))
}

fn attendance_today(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let store = state.store.as_ref().ok_or_else(no_workspace)?;
    let student_id = get_required_str(params, "studentId")?;
    let record = store.today_for(&student_id)?;
    Ok(json!({ "record": record }))
}

fn attendance_date_range(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let store = state.store.as_ref().ok_or_else(no_workspace)?;
    let student_id = get_required_str(params, "studentId")?;
    let start = get_required_date(params, "start")?;
    let end = get_required_date(params, "end")?;
    if start > end {
        return Err(HandlerErr::new("bad_params", "start must not be after end"));
    }
    let records = aggregate::in_range(&store.history_for(&student_id), start, end);
    let summary = aggregate::summarize(&records);
    Ok(json!({
        "studentId": student_id,
        "start": start,
        "end": end,
        "summary": summary,
        "records": records,
    }))
}

fn attendance_day_report(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = state.db.as_ref().ok_or_else(no_workspace)?;
    let date = get_required_date(params, "date")?;
    let backend = SqliteBackend::new(conn);
    let students = backend.list_students().map_err(db_err)?;
    let marks = backend.marks_for_date(date).map_err(db_err)?;
    Ok(json!(aggregate::day_report(&students, &marks, date)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.openDay" => attendance_open_day(state, &req.params),
        "attendance.toggle" => attendance_toggle(state, &req.params),
        "attendance.submitDay" => attendance_submit_day(state),
        "attendance.byDate" => attendance_by_date(state, &req.params),
        "attendance.history" => attendance_history(state, &req.params),
        "attendance.today" => attendance_today(state, &req.params),
        "attendance.dateRange" => attendance_date_range(state, &req.params),
        "attendance.dayReport" => attendance_day_report(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
