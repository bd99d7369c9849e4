//! Attendance reconciliation and aggregation engine, plus the JSON-line IPC
//! surface the `attendanced` sidecar exposes.

pub mod aggregate;
pub mod backend;
pub mod clock;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod grading;
pub mod ipc;
pub mod model;
pub mod providers;
pub mod roster;
pub mod snapshot;
pub mod store;

pub use error::{EngineError, EngineResult};
