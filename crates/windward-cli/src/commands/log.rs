//! Snapshot log queries and retention pruning.

use std::collections::BTreeMap;

use chrono::Duration;
use clap::Subcommand;
use uuid::Uuid;
use windward_core::snapshot::SnapshotEventType;
use windward_core::storage::Config;
use windward_core::SnapshotLog;

use super::common;

#[derive(Subcommand)]
pub enum LogAction {
    /// Print snapshot records as JSON, oldest first
    List {
        /// Only records for this companion
        #[arg(long)]
        companion: Option<Uuid>,
    },
    /// Remove records older than the configured retention window
    Prune,
}

fn event_label(event_type: &SnapshotEventType) -> &'static str {
    match event_type {
        SnapshotEventType::BreakStarted { .. } => "breakStarted",
        SnapshotEventType::BreakEnded { .. } => "breakEnded",
        SnapshotEventType::BreakFailed { .. } => "breakFailed",
        SnapshotEventType::DailyReset => "dailyReset",
        SnapshotEventType::BlowAway => "blowAway",
    }
}

pub fn run(action: LogAction) -> Result<(), Box<dyn std::error::Error>> {
    let log = SnapshotLog::open_default()?;

    match action {
        LogAction::List { companion } => {
            let records = match companion {
                Some(id) => log.load_for(id),
                None => log.load_all(),
            };

            let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
            for record in &records {
                *counts.entry(event_label(&record.event_type)).or_default() += 1;
            }

            println!(
                "{}",
                serde_json::json!({
                    "records": records,
                    "counts": counts,
                })
            );
        }
        LogAction::Prune => {
            let config = Config::load_or_default();
            let cutoff = common::today() - Duration::days(i64::from(config.log.retention_days));
            let removed = log.prune_older_than(cutoff)?;
            println!("{}", serde_json::json!({ "removed": removed }));
        }
    }
    Ok(())
}
