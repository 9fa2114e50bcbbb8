//! Background monitor entry points.
//!
//! The OS scheduler invokes these on monitoring interval starts and usage
//! threshold crossings, then tears the process down. Handlers must finish
//! fast and never fail the scheduler: store trouble and malformed events
//! degrade to logged no-ops.

use clap::Subcommand;
use windward_core::snapshot::SnapshotEventType;
use windward_core::storage::Config;
use windward_core::{
    BlowReason, IntervalStartOutcome, RestartReconciler, SharedStore, SnapshotLog,
    ShieldController, StoredBlocklist, ThresholdEventProcessor,
};

use super::common;

#[derive(Subcommand)]
pub enum MonitorAction {
    /// Handle a monitoring interval start (new day or monitor restart)
    IntervalStart,
    /// Handle one usage threshold event, e.g. "threshold_50"
    Event {
        /// Raw event identifier from the monitor
        id: String,
    },
}

pub fn run(action: MonitorAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let store = match SharedStore::open() {
        Ok(store) => store,
        Err(e) => {
            // No store, no state to update; dropping beats blocking the
            // scheduler.
            tracing::warn!(error = %e, "shared store unavailable; dropping monitor callback");
            return Ok(());
        }
    };
    let log = SnapshotLog::open_default()?;

    match action {
        MonitorAction::IntervalStart => {
            let reconciler = RestartReconciler::new(&store, config.limit.daily_seconds);
            let outcome = reconciler.on_interval_start(common::today());
            match outcome {
                IntervalStartOutcome::NewDay => {
                    let now = common::now();
                    common::append_snapshot(&store, &log, 0.0, SnapshotEventType::DailyReset, now);
                    let mut events = vec![windward_core::Event::DailyReset { at: now }];
                    // The daily gate reopened; announce availability.
                    if let Some(history) = windward_core::EvolutionHistory::load(&store) {
                        let gate = windward_core::EvolutionGate::new(config.companion.max_phase);
                        if gate.can_evolve(&history, common::today()) {
                            events.push(windward_core::Event::EvolutionAvailable {
                                next_phase: history.current_phase() + 1,
                                deep_link: "windward://companion".into(),
                                at: now,
                            });
                        }
                    }
                    println!("{}", serde_json::json!({ "outcome": "newDay" }));
                    common::print_events(&events)?;
                }
                IntervalStartOutcome::Restart { folded_seconds } => {
                    println!(
                        "{}",
                        serde_json::json!({
                            "outcome": "restart",
                            "foldedSeconds": folded_seconds,
                        })
                    );
                }
            }
        }
        MonitorAction::Event { id } => {
            let provider = StoredBlocklist::new(&store);
            let shield = ShieldController::new(&store, &provider, &config.shield);
            let processor = ThresholdEventProcessor::new(&store, &shield, &config);

            let now = common::now();
            let Some(processed) = processor.handle_event(&id, now) else {
                // Malformed identifier: logged by the processor, dropped here.
                return Ok(());
            };

            let mut events = processed.events;
            if processed.blow_away_required {
                events.extend(common::blow_away_companion(
                    &store,
                    &log,
                    config.companion.max_phase,
                    BlowReason::ShieldUnavailable,
                    processed.state.wind_points,
                    now,
                ));
            }
            common::print_events(&events)?;
        }
    }
    Ok(())
}
