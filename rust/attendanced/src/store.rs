//! The process-wide attendance record collection.
//!
//! Every mutation follows the same protocol: build the next collection on the
//! side, persist the whole of it, swap it in, then notify listeners once. If
//! the snapshot write fails nothing is swapped and nobody is notified.

use crate::aggregate::percentage;
use crate::clock::Clock;
use crate::dates::{format_date_key, parse_date_text, TIME_FORMAT};
use crate::error::{EngineError, EngineResult};
use crate::model::{AttendanceRecord, AttendanceStatus, MarkChoice, RecordDraft};
use crate::snapshot::SnapshotStore;
use chrono::NaiveDate;
use std::collections::HashSet;

pub type Listener = Box<dyn FnMut(&[AttendanceRecord])>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub restored: usize,
    /// Set when the snapshot existed but could not be used; the store is empty.
    pub warning: Option<EngineError>,
}

pub struct AttendanceStore {
    records: Vec<AttendanceRecord>,
    snapshot: Box<dyn SnapshotStore>,
    clock: Box<dyn Clock>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl AttendanceStore {
    pub fn new(snapshot: impl SnapshotStore + 'static, clock: impl Clock + 'static) -> Self {
        Self {
            records: Vec::new(),
            snapshot: Box::new(snapshot),
            clock: Box::new(clock),
            listeners: Vec::new(),
            next_subscription: 1,
        }
    }

    /// Restores the collection from the snapshot. Never fails: an unreadable or
    /// unparsable snapshot leaves the store empty and is reported as a warning.
    pub fn load(&mut self) -> LoadReport {
        let bytes = match self.snapshot.read_snapshot() {
            Ok(Some(b)) => b,
            Ok(None) => {
                self.records.clear();
                return LoadReport {
                    restored: 0,
                    warning: None,
                };
            }
            Err(e) => {
                let message = format!("{e:#}");
                tracing::warn!(error = %message, "attendance snapshot unreadable, starting empty");
                self.records.clear();
                return LoadReport {
                    restored: 0,
                    warning: Some(EngineError::Corrupt(message)),
                };
            }
        };

        match serde_json::from_slice::<Vec<AttendanceRecord>>(&bytes) {
            Ok(records) => {
                tracing::info!(count = records.len(), "attendance snapshot restored");
                self.records = records;
                LoadReport {
                    restored: self.records.len(),
                    warning: None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "attendance snapshot corrupt, starting empty");
                self.records.clear();
                LoadReport {
                    restored: 0,
                    warning: Some(EngineError::Corrupt(format!(
                        "attendance snapshot is not a record list: {e}"
                    ))),
                }
            }
        }
    }

    /// Listeners run synchronously, in registration order, after every
    /// successful mutation.
    pub fn subscribe(&mut self, listener: impl FnMut(&[AttendanceRecord]) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn append(&mut self, record: AttendanceRecord) -> EngineResult<()> {
        validate_record(&record)?;
        let mut next = self.records.clone();
        merge_record(&mut next, record);
        self.commit(next)
    }

    /// Applies every real mark in `drafts` as one batch: one snapshot write and
    /// one broadcast. `Unset` drafts are dropped. Returns how many records were
    /// added or replaced; drafts sharing a (student, day) count once.
    pub fn bulk_append<I>(&mut self, drafts: I) -> EngineResult<usize>
    where
        I: IntoIterator<Item = RecordDraft>,
    {
        let records: Vec<AttendanceRecord> =
            drafts.into_iter().filter_map(RecordDraft::into_record).collect();
        for r in &records {
            validate_record(r)?;
        }
        if records.is_empty() {
            return Ok(0);
        }

        let mut next = self.records.clone();
        let mut touched = HashSet::new();
        for r in records {
            touched.insert(merge_record(&mut next, r));
        }
        self.commit(next)?;
        Ok(touched.len())
    }

    /// Stamps a mark with the clock's current day and time and appends it.
    pub fn record_mark(
        &mut self,
        student_id: &str,
        student_name: &str,
        status: AttendanceStatus,
    ) -> EngineResult<AttendanceRecord> {
        let now = self.clock.now();
        let record = AttendanceRecord {
            student_id: student_id.to_string(),
            student_name: student_name.to_string(),
            status,
            date: format_date_key(now.date()),
            time: now.format(TIME_FORMAT).to_string(),
        };
        self.append(record.clone())?;
        Ok(record)
    }

    /// Draft for `day`, stamped with the clock's current time.
    pub fn draft(
        &self,
        student_id: &str,
        student_name: &str,
        status: MarkChoice,
        day: NaiveDate,
    ) -> RecordDraft {
        RecordDraft {
            student_id: student_id.to_string(),
            student_name: student_name.to_string(),
            status,
            date: format_date_key(day),
            time: self.clock.now().format(TIME_FORMAT).to_string(),
        }
    }

    /// Insertion order, not date order.
    pub fn history_for(&self, student_id: &str) -> Vec<AttendanceRecord> {
        self.records
            .iter()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect()
    }

    pub fn today_for(&self, student_id: &str) -> EngineResult<Option<AttendanceRecord>> {
        let today = self.clock.today();
        let mut found = self
            .records
            .iter()
            .filter(|r| r.student_id == student_id && parse_date_text(&r.date).day() == Some(today));
        let first = found.next().cloned();
        if found.next().is_some() {
            return Err(EngineError::Corrupt(format!(
                "more than one record for student {student_id} on {}",
                format_date_key(today)
            )));
        }
        Ok(first)
    }

    pub fn all_records(&self) -> Vec<AttendanceRecord> {
        self.records.clone()
    }

    pub fn records(&self) -> &[AttendanceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn percentage_for(&self, student_id: &str) -> u32 {
        let mut total = 0usize;
        let mut present = 0usize;
        for r in self.records.iter().filter(|r| r.student_id == student_id) {
            total += 1;
            if r.status == AttendanceStatus::Present {
                present += 1;
            }
        }
        percentage(present, total)
    }

    fn commit(&mut self, next: Vec<AttendanceRecord>) -> EngineResult<()> {
        let bytes = serde_json::to_vec(&next)
            .map_err(|e| EngineError::Unavailable(format!("failed to encode snapshot: {e}")))?;
        self.snapshot
            .write_snapshot(&bytes)
            .map_err(EngineError::unavailable)?;
        self.records = next;
        self.broadcast();
        Ok(())
    }

    fn broadcast(&mut self) {
        tracing::debug!(
            listeners = self.listeners.len(),
            records = self.records.len(),
            "broadcasting attendance update"
        );
        let records = &self.records;
        for (_, listener) in self.listeners.iter_mut() {
            listener(records);
        }
    }
}

fn validate_record(r: &AttendanceRecord) -> EngineResult<()> {
    if r.student_id.trim().is_empty() {
        return Err(EngineError::Invalid("record has empty studentId".into()));
    }
    if !parse_date_text(&r.date).is_valid() {
        return Err(EngineError::Invalid(format!(
            "record for {} has unreadable date '{}'",
            r.student_id, r.date
        )));
    }
    Ok(())
}

/// One record per (student, calendar day): a later write replaces the earlier
/// one in place. Returns the position written.
fn merge_record(records: &mut Vec<AttendanceRecord>, record: AttendanceRecord) -> usize {
    let day = parse_date_text(&record.date).day();
    let existing = records.iter().position(|r| {
        r.student_id == record.student_id && day.is_some() && parse_date_text(&r.date).day() == day
    });
    match existing {
        Some(i) => {
            records[i] = record;
            i
        }
        None => {
            records.push(record);
            records.len() - 1
        }
    }
}
