//! Break session control from the interactive process.

use clap::Subcommand;
use windward_core::snapshot::SnapshotEventType;
use windward_core::storage::Config;
use windward_core::{
    BlowReason, BreakKind, BreakSessionManager, SharedStore, SnapshotLog, ShieldController,
    StoredBlocklist, UnlockDecision,
};

use super::common;

#[derive(Subcommand)]
pub enum BreakAction {
    /// Start a break session
    Start {
        /// Break kind: free, committed, or safety
        #[arg(long)]
        kind: String,
        /// Planned duration in minutes (committed only)
        #[arg(long)]
        minutes: Option<u32>,
        /// Run until the next local midnight (committed only)
        #[arg(long)]
        until_end_of_day: bool,
    },
    /// Unlock the active break (safe or penalized, decided now)
    Unlock,
    /// Apply catch-up decay after the app was suspended
    Resume,
    /// Print the active break session as JSON
    Status,
}

pub fn run(action: BreakAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let store = SharedStore::open()?;
    let log = SnapshotLog::open_default()?;
    let provider = StoredBlocklist::new(&store);
    let shield = ShieldController::new(&store, &provider, &config.shield);
    let manager = BreakSessionManager::new(&store, &shield, &config);

    match action {
        BreakAction::Start {
            kind,
            minutes,
            until_end_of_day,
        } => {
            let kind: BreakKind = kind
                .parse()
                .map_err(|()| "unknown break kind: expected free, committed, or safety".to_string())?;
            let now = common::now();
            let (session, events) = manager.start(kind, minutes, until_end_of_day, now)?;
            common::append_snapshot(
                &store,
                &log,
                windward_core::WindState::load(&store, config.limit.daily_seconds).wind_points,
                SnapshotEventType::BreakStarted { kind },
                now,
            );
            println!("{}", serde_json::to_string_pretty(&session)?);
            common::print_events(&events)?;
        }
        BreakAction::Unlock => {
            let now = common::now();
            let outcome = manager.unlock(now)?;
            let wind_points =
                windward_core::WindState::load(&store, config.limit.daily_seconds).wind_points;

            let record = match outcome.decision {
                UnlockDecision::Safe => SnapshotEventType::BreakEnded {
                    actual_minutes: outcome.actual_minutes,
                },
                UnlockDecision::Penalized => SnapshotEventType::BreakFailed {
                    actual_minutes: outcome.actual_minutes,
                },
            };
            common::append_snapshot(&store, &log, wind_points, record, now);

            let mut events = outcome.events;
            if outcome.blow_away_required {
                let reason = match outcome.kind {
                    BreakKind::Committed => BlowReason::CommittedBreakAbandoned,
                    _ => BlowReason::UnsafeUnlock,
                };
                events.extend(common::blow_away_companion(
                    &store,
                    &log,
                    config.companion.max_phase,
                    reason,
                    wind_points,
                    now,
                ));
            }

            println!(
                "{}",
                serde_json::json!({
                    "decision": outcome.decision,
                    "actualMinutes": outcome.actual_minutes,
                })
            );
            common::print_events(&events)?;
        }
        BreakAction::Resume => match manager.resume(common::now()) {
            Some(catch_up) => {
                println!(
                    "{}",
                    serde_json::json!({
                        "appliedReductionSeconds": catch_up.applied_reduction_seconds,
                        "windPoints": catch_up.state.wind_points,
                    })
                );
                common::print_events(&catch_up.events)?;
            }
            None => println!("{}", serde_json::json!({ "active": false })),
        },
        BreakAction::Status => match manager.active() {
            Some(session) => println!("{}", serde_json::to_string_pretty(&session)?),
            None => println!("{}", serde_json::json!({ "active": false })),
        },
    }
    Ok(())
}
