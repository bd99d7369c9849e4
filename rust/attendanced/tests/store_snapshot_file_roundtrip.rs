use attendanced::clock::FixedClock;
use attendanced::model::{AttendanceStatus, MarkChoice, RecordDraft};
use attendanced::snapshot::FileSnapshot;
use attendanced::store::AttendanceStore;
use attendanced::EngineError;
use chrono::NaiveDateTime;
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

fn clock() -> FixedClock {
    FixedClock(
        NaiveDateTime::parse_from_str("2024-02-01 08:05:00", "%Y-%m-%d %H:%M:%S").expect("time"),
    )
}

fn draft(id: &str, date: &str, status: MarkChoice) -> RecordDraft {
    RecordDraft {
        student_id: id.to_string(),
        student_name: format!("Student {id}"),
        status,
        date: date.to_string(),
        time: "09:00 AM".to_string(),
    }
}

#[test]
fn records_survive_a_restart() {
    let workspace = temp_dir("attendanced-store-restart");
    let path = workspace.join("attendance_records.json");

    let mut store = AttendanceStore::new(FileSnapshot::new(&path), clock());
    assert_eq!(store.load().restored, 0);
    store
        .bulk_append(vec![
            draft("Arjun-101", "January 30, 2024", MarkChoice::Present),
            draft("Sana-102", "January 30, 2024", MarkChoice::Absent),
            draft("Rahul-103", "January 30, 2024", MarkChoice::Unset),
        ])
        .expect("bulk");
    store
        .record_mark("Arjun-101", "Arjun Mehta", AttendanceStatus::Present)
        .expect("record today");
    assert!(path.is_file());
    assert!(!path.with_extension("json.writing").exists());

    let mut reopened = AttendanceStore::new(FileSnapshot::new(&path), clock());
    let report = reopened.load();
    assert_eq!(report.restored, 3);
    assert!(report.warning.is_none());
    assert_eq!(reopened.records(), store.records());
    assert_eq!(
        reopened
            .today_for("Arjun-101")
            .expect("today")
            .map(|r| r.date),
        Some("February 01, 2024".to_string())
    );

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn corrupt_file_starts_empty_and_next_write_repairs_it() {
    let workspace = temp_dir("attendanced-store-corrupt");
    let path = workspace.join("attendance_records.json");
    std::fs::write(&path, b"[{\"studentId\": ").expect("write corrupt");

    let mut store = AttendanceStore::new(FileSnapshot::new(&path), clock());
    let report = store.load();
    assert_eq!(report.restored, 0);
    assert!(matches!(report.warning, Some(EngineError::Corrupt(_))));
    assert!(store.is_empty());

    store
        .record_mark("Sana-102", "Sana Khan", AttendanceStatus::Absent)
        .expect("write after corruption");

    let mut reopened = AttendanceStore::new(FileSnapshot::new(&path), clock());
    let report = reopened.load();
    assert_eq!(report.restored, 1);
    assert!(report.warning.is_none());

    let _ = std::fs::remove_dir_all(workspace);
}
