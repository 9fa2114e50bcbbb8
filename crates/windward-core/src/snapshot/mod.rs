//! Append-only lifecycle event log.
//!
//! One self-delimited JSON record per line, written in a single `write`
//! call with the file opened for append, so both processes may append
//! concurrently without corrupting each other. Readers tolerate an
//! in-progress append by skipping an unparseable trailing line; corrupt
//! interior lines are logged and skipped. Pruning only removes records
//! strictly older than the retention cutoff -- consumers must tolerate
//! gaps, never reordering.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::breaks::BreakKind;
use crate::error::CoreError;
use crate::storage::data_dir;

/// Lifecycle event kinds recorded in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SnapshotEventType {
    BreakStarted { kind: BreakKind },
    BreakEnded { actual_minutes: u32 },
    BreakFailed { actual_minutes: u32 },
    DailyReset,
    BlowAway,
}

/// One append-only log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEvent {
    pub companion_id: Uuid,
    /// Wind at the time of the event.
    pub wind_points: f64,
    pub event_type: SnapshotEventType,
    /// Local calendar day of the event.
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
}

/// Newline-delimited JSON log file.
pub struct SnapshotLog {
    path: PathBuf,
}

impl SnapshotLog {
    /// Open the log at `~/.config/windward/snapshots.jsonl`.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be determined.
    pub fn open_default() -> Result<Self, CoreError> {
        let dir = data_dir().map_err(|e| CoreError::Custom(e.to_string()))?;
        Ok(Self::at(dir.join("snapshots.jsonl")))
    }

    /// Open the log at an explicit path.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append one record: a complete line in a single write call, safe to
    /// interleave with an append from the other process.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or written; callers
    /// log and drop rather than retrying.
    pub fn append(&self, event: &SnapshotEvent) -> Result<(), CoreError> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Load every parseable record, in file order.
    ///
    /// A missing file is an empty history. An unparseable trailing line is
    /// treated as a not-yet-finished append and skipped silently; corrupt
    /// interior lines are logged and skipped.
    pub fn load_all(&self) -> Vec<SnapshotEvent> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "snapshot log unreadable");
                return Vec::new();
            }
        };

        let lines: Vec<&str> = content.lines().filter(|l| !l.is_empty()).collect();
        let mut events = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            match serde_json::from_str(line) {
                Ok(event) => events.push(event),
                Err(e) => {
                    if i + 1 < lines.len() {
                        tracing::warn!(line = i + 1, error = %e, "skipping corrupt snapshot record");
                    }
                    // Trailing line: concurrent append still in flight.
                }
            }
        }
        events
    }

    /// Records for one companion, in file order.
    pub fn load_for(&self, companion_id: Uuid) -> Vec<SnapshotEvent> {
        self.load_all()
            .into_iter()
            .filter(|e| e.companion_id == companion_id)
            .collect()
    }

    /// Remove records strictly older than `cutoff`, keeping everything
    /// inside the retention window. Returns the number of records removed.
    ///
    /// # Errors
    /// Returns an error if the rewritten log cannot be persisted.
    pub fn prune_older_than(&self, cutoff: NaiveDate) -> Result<usize, CoreError> {
        let all = self.load_all();
        let kept: Vec<&SnapshotEvent> = all.iter().filter(|e| e.date >= cutoff).collect();
        let removed = all.len() - kept.len();
        if removed == 0 {
            return Ok(0);
        }

        let mut content = String::new();
        for event in &kept {
            content.push_str(&serde_json::to_string(event)?);
            content.push('\n');
        }
        let tmp = self.path.with_extension("jsonl.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn event(companion_id: Uuid, date: &str, event_type: SnapshotEventType) -> SnapshotEvent {
        SnapshotEvent {
            companion_id,
            wind_points: 42.0,
            event_type,
            date: day(date),
            timestamp: at(&format!("{date}T12:00:00Z")),
        }
    }

    #[test]
    fn append_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let log = SnapshotLog::at(dir.path().join("snapshots.jsonl"));
        let id = Uuid::new_v4();

        log.append(&event(
            id,
            "2026-08-07",
            SnapshotEventType::BreakStarted {
                kind: BreakKind::Free,
            },
        ))
        .unwrap();
        log.append(&event(
            id,
            "2026-08-07",
            SnapshotEventType::BreakEnded { actual_minutes: 12 },
        ))
        .unwrap();

        let events = log.load_all();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1].event_type,
            SnapshotEventType::BreakEnded { actual_minutes: 12 }
        );
    }

    #[test]
    fn missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let log = SnapshotLog::at(dir.path().join("absent.jsonl"));
        assert!(log.load_all().is_empty());
    }

    #[test]
    fn unparseable_trailing_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.jsonl");
        let log = SnapshotLog::at(path.clone());
        let id = Uuid::new_v4();

        log.append(&event(id, "2026-08-07", SnapshotEventType::DailyReset))
            .unwrap();
        // Simulate an append still in flight from the other process.
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"companionId\":\"trunc").unwrap();

        let events = log.load_all();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn corrupt_interior_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.jsonl");
        let log = SnapshotLog::at(path.clone());
        let id = Uuid::new_v4();

        log.append(&event(id, "2026-08-06", SnapshotEventType::DailyReset))
            .unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(b"garbage line\n").unwrap();
        }
        log.append(&event(id, "2026-08-07", SnapshotEventType::BlowAway))
            .unwrap();

        let events = log.load_all();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type, SnapshotEventType::BlowAway);
    }

    #[test]
    fn load_for_filters_by_companion() {
        let dir = tempfile::tempdir().unwrap();
        let log = SnapshotLog::at(dir.path().join("snapshots.jsonl"));
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        log.append(&event(a, "2026-08-07", SnapshotEventType::DailyReset))
            .unwrap();
        log.append(&event(b, "2026-08-07", SnapshotEventType::BlowAway))
            .unwrap();

        assert_eq!(log.load_for(a).len(), 1);
        assert_eq!(log.load_for(b).len(), 1);
    }

    #[test]
    fn prune_removes_only_records_older_than_cutoff() {
        let dir = tempfile::tempdir().unwrap();
        let log = SnapshotLog::at(dir.path().join("snapshots.jsonl"));
        let id = Uuid::new_v4();

        log.append(&event(id, "2026-05-01", SnapshotEventType::DailyReset))
            .unwrap();
        log.append(&event(id, "2026-08-01", SnapshotEventType::DailyReset))
            .unwrap();
        log.append(&event(id, "2026-08-07", SnapshotEventType::BlowAway))
            .unwrap();

        let removed = log.prune_older_than(day("2026-08-01")).unwrap();
        assert_eq!(removed, 1);

        let events = log.load_all();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.date >= day("2026-08-01")));
    }

    #[test]
    fn record_shape_matches_wire_format() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(event(
            id,
            "2026-08-07",
            SnapshotEventType::BreakStarted {
                kind: BreakKind::Committed,
            },
        ))
        .unwrap();

        assert_eq!(json["companionId"], serde_json::json!(id.to_string()));
        assert_eq!(json["windPoints"], serde_json::json!(42.0));
        assert_eq!(json["date"], serde_json::json!("2026-08-07"));
        assert_eq!(
            json["eventType"]["breakStarted"]["kind"],
            serde_json::json!("committed")
        );
    }
}
