use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE: &str = "attendanced.json";
pub const ENV_HISTORY_LIMIT: &str = "ATTENDANCED_HISTORY_LIMIT";
pub const ENV_RECENT_LIMIT: &str = "ATTENDANCED_RECENT_LIMIT";

/// Workspace settings. Layering: compiled defaults, then `attendanced.json`
/// in the workspace, then environment overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub snapshot_file: String,
    pub database_file: String,
    /// Maximum history entries returned by the student dashboard.
    pub history_limit: usize,
    pub recent_limit: usize,
    pub default_max_marks: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_file: "attendance_records.json".to_string(),
            database_file: "attendance.sqlite3".to_string(),
            history_limit: 50,
            recent_limit: 10,
            default_max_marks: 100.0,
        }
    }
}

pub fn load_config(workspace: &Path) -> EngineResult<Config> {
    let path = workspace.join(CONFIG_FILE);
    let mut cfg = if path.is_file() {
        let text = std::fs::read_to_string(&path).map_err(|e| {
            EngineError::Unavailable(format!("failed to read {}: {e}", path.to_string_lossy()))
        })?;
        serde_json::from_str::<Config>(&text).map_err(|e| {
            EngineError::Invalid(format!("{} is not valid: {e}", path.to_string_lossy()))
        })?
    } else {
        Config::default()
    };
    apply_env_overrides(&mut cfg, |k| std::env::var(k).ok())?;
    validate(&cfg)?;
    Ok(cfg)
}

fn apply_env_overrides<F>(cfg: &mut Config, lookup: F) -> EngineResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(ENV_HISTORY_LIMIT) {
        cfg.history_limit = parse_limit(ENV_HISTORY_LIMIT, &v)?;
    }
    if let Some(v) = lookup(ENV_RECENT_LIMIT) {
        cfg.recent_limit = parse_limit(ENV_RECENT_LIMIT, &v)?;
    }
    Ok(())
}

fn parse_limit(key: &str, raw: &str) -> EngineResult<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| EngineError::Invalid(format!("{key} must be a non-negative integer")))
}

fn validate(cfg: &Config) -> EngineResult<()> {
    if cfg.snapshot_file.trim().is_empty() || cfg.database_file.trim().is_empty() {
        return Err(EngineError::Invalid(
            "snapshotFile and databaseFile must not be empty".into(),
        ));
    }
    if !cfg.default_max_marks.is_finite() || cfg.default_max_marks <= 0.0 {
        return Err(EngineError::Invalid(
            "defaultMaxMarks must be greater than zero".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = temp_dir("attendanced-config-partial");
        std::fs::write(dir.join(CONFIG_FILE), r#"{"historyLimit": 20}"#).expect("write cfg");
        let cfg = load_config(&dir).expect("load");
        assert_eq!(cfg.history_limit, 20);
        assert_eq!(cfg.recent_limit, 10);
        assert_eq!(cfg.snapshot_file, "attendance_records.json");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn malformed_file_is_invalid() {
        let dir = temp_dir("attendanced-config-bad");
        std::fs::write(dir.join(CONFIG_FILE), "{historyLimit").expect("write cfg");
        assert!(matches!(load_config(&dir), Err(EngineError::Invalid(_))));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn env_overrides_win_over_file() {
        let mut cfg = Config {
            history_limit: 20,
            ..Config::default()
        };
        apply_env_overrides(&mut cfg, |k| match k {
            ENV_HISTORY_LIMIT => Some("5".to_string()),
            _ => None,
        })
        .expect("overrides");
        assert_eq!(cfg.history_limit, 5);
        assert_eq!(cfg.recent_limit, 10);

        let bad = apply_env_overrides(&mut cfg, |k| match k {
            ENV_RECENT_LIMIT => Some("lots".to_string()),
            _ => None,
        });
        assert!(matches!(bad, Err(EngineError::Invalid(_))));
    }

    #[test]
    fn zero_default_max_marks_is_rejected() {
        let cfg = Config {
            default_max_marks: 0.0,
            ..Config::default()
        };
        assert!(validate(&cfg).is_err());
    }
}
