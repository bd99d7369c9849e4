use anyhow::Context;
use std::cell::RefCell;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

/// Durable home for the serialized record collection. The bytes are opaque here.
pub trait SnapshotStore {
    fn read_snapshot(&self) -> anyhow::Result<Option<Vec<u8>>>;
    fn write_snapshot(&self, bytes: &[u8]) -> anyhow::Result<()>;
}

/// JSON file in the workspace. Writes land in a sibling temp file first and are
/// renamed over the target, so readers never see a half-written snapshot.
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    path: PathBuf,
}

impl FileSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotStore for FileSnapshot {
    fn read_snapshot(&self) -> anyhow::Result<Option<Vec<u8>>> {
        if !self.path.is_file() {
            return Ok(None);
        }
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("failed to read snapshot {}", self.path.to_string_lossy()))?;
        Ok(Some(bytes))
    }

    fn write_snapshot(&self, bytes: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create directory {}", parent.to_string_lossy())
            })?;
        }
        let tmp = self.path.with_extension("json.writing");
        {
            let mut f = File::create(&tmp).with_context(|| {
                format!("failed to create temp snapshot {}", tmp.to_string_lossy())
            })?;
            f.write_all(bytes).context("failed to write snapshot")?;
            f.flush().context("failed to flush snapshot")?;
        }
        std::fs::rename(&tmp, &self.path).with_context(|| {
            format!(
                "failed to move snapshot into place at {}",
                self.path.to_string_lossy()
            )
        })?;
        Ok(())
    }
}

/// In-process snapshot. Clones share the same buffer, so a test can keep a
/// handle and inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshot {
    bytes: Rc<RefCell<Option<Vec<u8>>>>,
    fail_writes: Rc<RefCell<bool>>,
}

impl MemorySnapshot {
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let s = Self::default();
        *s.bytes.borrow_mut() = Some(bytes.into());
        s
    }

    pub fn contents(&self) -> Option<Vec<u8>> {
        self.bytes.borrow().clone()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.borrow_mut() = fail;
    }
}

impl SnapshotStore for MemorySnapshot {
    fn read_snapshot(&self) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.bytes.borrow().clone())
    }

    fn write_snapshot(&self, bytes: &[u8]) -> anyhow::Result<()> {
        if *self.fail_writes.borrow() {
            anyhow::bail!("snapshot writes disabled");
        }
        *self.bytes.borrow_mut() = Some(bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn file_snapshot_missing_reads_as_none() {
        let dir = temp_dir("attendanced-snap-missing");
        let snap = FileSnapshot::new(dir.join("records.json"));
        assert!(snap.read_snapshot().expect("read").is_none());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn file_snapshot_replaces_contents_without_leftover_temp() {
        let dir = temp_dir("attendanced-snap-write");
        let path = dir.join("records.json");
        let snap = FileSnapshot::new(&path);
        snap.write_snapshot(b"[1]").expect("first write");
        snap.write_snapshot(b"[1,2]").expect("second write");
        assert_eq!(snap.read_snapshot().expect("read"), Some(b"[1,2]".to_vec()));
        assert!(!path.with_extension("json.writing").exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn memory_snapshot_shares_buffer_across_clones() {
        let a = MemorySnapshot::default();
        let b = a.clone();
        a.write_snapshot(b"x").expect("write");
        assert_eq!(b.contents(), Some(b"x".to_vec()));
        b.set_fail_writes(true);
        assert!(a.write_snapshot(b"y").is_err());
        assert_eq!(a.contents(), Some(b"x".to_vec()));
    }
}
