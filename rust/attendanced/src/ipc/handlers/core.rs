use crate::clock::SystemClock;
use crate::config;
use crate::db;
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::snapshot::FileSnapshot;
use crate::store::AttendanceStore;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn workspace_select(state: &mut AppState, path: PathBuf) -> Result<serde_json::Value, HandlerErr> {
    let cfg = config::load_config(&path).map_err(HandlerErr::from)?;
    let conn = db::open_db(&path, &cfg.database_file).map_err(|e| HandlerErr {
        code: "db_open_failed",
        message: format!("{e:#}"),
        details: Some(json!({ "file": cfg.database_file })),
    })?;

    let mut store = AttendanceStore::new(
        FileSnapshot::new(path.join(&cfg.snapshot_file)),
        SystemClock,
    );
    let report = store.load();
    store.subscribe(|records| {
        tracing::debug!(records = records.len(), "attendance records changed");
    });

    let warnings: Vec<serde_json::Value> = report
        .warning
        .iter()
        .map(|w| json!({ "code": w.code(), "message": w.to_string() }))
        .collect();

    tracing::info!(
        workspace = %path.to_string_lossy(),
        restored = report.restored,
        warnings = warnings.len(),
        "workspace opened"
    );

    state.workspace = Some(path.clone());
    state.db = Some(conn);
    state.store = Some(store);
    state.config = cfg;
    state.open_sheet = None;

    Ok(json!({
        "workspacePath": path.to_string_lossy(),
        "restored": report.restored,
        "warnings": warnings,
    }))
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    match workspace_select(state, path) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
