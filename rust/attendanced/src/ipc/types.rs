use std::path::PathBuf;

use crate::config::Config;
use crate::roster::OpenedDay;
use crate::store::AttendanceStore;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub store: Option<AttendanceStore>,
    pub config: Config,
    /// The sheet `attendance.openDay` built; toggles and submission act on it.
    pub open_sheet: Option<OpenedDay>,
}
