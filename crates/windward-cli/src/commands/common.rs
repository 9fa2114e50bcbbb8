//! Shared helpers for CLI commands.

use chrono::{DateTime, Local, NaiveDate, Utc};
use windward_core::snapshot::{SnapshotEvent, SnapshotEventType};
use windward_core::{
    BlowReason, Event, EvolutionGate, EvolutionHistory, SnapshotLog, StateStore,
};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Calendar-day decisions use the user's local date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Print each event as a JSON document on stdout.
pub fn print_events(events: &[Event]) -> Result<(), Box<dyn std::error::Error>> {
    for event in events {
        println!("{}", serde_json::to_string_pretty(event)?);
    }
    Ok(())
}

/// Append a lifecycle record for the current companion, if one exists.
/// Append failures are logged and dropped, never fatal.
pub fn append_snapshot<S: StateStore + ?Sized>(
    store: &S,
    log: &SnapshotLog,
    wind_points: f64,
    event_type: SnapshotEventType,
    at: DateTime<Utc>,
) {
    let Some(history) = EvolutionHistory::load(store) else {
        return;
    };
    let record = SnapshotEvent {
        companion_id: history.companion_id,
        wind_points,
        event_type,
        date: today(),
        timestamp: at,
    };
    if let Err(e) = log.append(&record) {
        tracing::warn!(error = %e, "failed to append snapshot record");
    }
}

/// Blow the current companion away, record it, and return the resulting
/// events. A missing or already-blown companion yields no events.
pub fn blow_away_companion<S: StateStore + ?Sized>(
    store: &S,
    log: &SnapshotLog,
    max_phase: u8,
    reason: BlowReason,
    wind_points: f64,
    at: DateTime<Utc>,
) -> Vec<Event> {
    let Some(mut history) = EvolutionHistory::load(store) else {
        return Vec::new();
    };
    let gate = EvolutionGate::new(max_phase);
    if !gate.blow_away(&mut history, reason, at) {
        return Vec::new();
    }
    history.save(store);
    append_snapshot(store, log, wind_points, SnapshotEventType::BlowAway, at);
    vec![Event::CompanionBlownAway { reason, at }]
}
