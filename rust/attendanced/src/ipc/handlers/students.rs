use super::get_required_str;
use crate::backend::SqliteBackend;
use crate::ipc::error::{db_err, ok, no_workspace, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::RosterEntry;
use serde_json::json;

fn students_list(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let conn = state.db.as_ref().ok_or_else(no_workspace)?;
    let students = SqliteBackend::new(conn).list_students().map_err(db_err)?;
    Ok(json!({ "students": students }))
}

fn students_create(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let conn = state.db.as_ref().ok_or_else(no_workspace)?;
    let entry = RosterEntry {
        id: get_required_str(params, "id")?,
        name: get_required_str(params, "name")?,
        roll_number: get_required_str(params, "rollNumber")?,
    };
    let created = SqliteBackend::new(conn)
        .create_student(&entry)
        .map_err(|e| HandlerErr {
            code: "db_insert_failed",
            message: format!("{e:#}"),
            details: Some(json!({ "table": "students" })),
        })?;
    if created {
        tracing::info!(student_id = %entry.id, "student created");
    }
    Ok(json!({ "created": created, "student": entry }))
}

fn students_seed(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let conn = state.db.as_ref().ok_or_else(no_workspace)?;
    let summary = SqliteBackend::new(conn)
        .seed_demo_students()
        .map_err(|e| HandlerErr {
            code: "db_insert_failed",
            message: format!("{e:#}"),
            details: Some(json!({ "table": "students" })),
        })?;
    tracing::info!(created = summary.created, existing = summary.existing, "demo students seeded");
    Ok(json!(summary))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.list" => students_list(state),
        "students.create" => students_create(state, &req.params),
        "students.seed" => students_seed(state),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
