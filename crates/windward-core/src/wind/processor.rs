//! Threshold-crossing event processing.
//!
//! The monitor process delivers events named by their threshold
//! (`"threshold_<percentage>"`), invokes this processor once per event,
//! and is torn down. The processor re-derives absolute seconds from the
//! percentage and the currently-configured limit rather than trusting a
//! pre-baked second count, so a mid-day limit change stays correct.
//!
//! Replaying the same event is a wind no-op: the observed counter is
//! overwritten, never accumulated. That property is the defense against
//! duplicate or out-of-order delivery from the external scheduler.

use chrono::{DateTime, Utc};

use crate::events::Event;
use crate::shield::{BlocklistProvider, SafetyActivation, ShieldController};
use crate::storage::{keys, Config, StateStore};
use crate::wind::state::WindState;

/// Result of processing one threshold event.
#[derive(Debug)]
pub struct ProcessedEvent {
    pub state: WindState,
    /// What the safety-activation path decided, when wind reached 100.
    pub safety: Option<SafetyActivation>,
    /// Wind hit 100 but the shield could not be raised (tokens missing);
    /// the caller must route this to the companion's blow-away.
    pub blow_away_required: bool,
    pub events: Vec<Event>,
}

/// Converts raw monitor events into wind updates and shield activations.
pub struct ThresholdEventProcessor<'a, S: StateStore + ?Sized, P: BlocklistProvider> {
    store: &'a S,
    shield: &'a ShieldController<'a, S, P>,
    config: &'a Config,
}

impl<'a, S: StateStore + ?Sized, P: BlocklistProvider> ThresholdEventProcessor<'a, S, P> {
    pub fn new(store: &'a S, shield: &'a ShieldController<'a, S, P>, config: &'a Config) -> Self {
        Self {
            store,
            shield,
            config,
        }
    }

    /// Parse a `"threshold_<percentage>"` identifier.
    fn parse_threshold_id(raw: &str) -> Option<u32> {
        raw.strip_prefix("threshold_")?.parse().ok()
    }

    /// Process one raw event identifier.
    ///
    /// Malformed identifiers are logged and dropped (`None`); nothing here
    /// may terminate the monitor process.
    pub fn handle_event(&self, raw_id: &str, now: DateTime<Utc>) -> Option<ProcessedEvent> {
        let Some(percentage) = Self::parse_threshold_id(raw_id) else {
            tracing::warn!(raw_id, "dropping malformed threshold event identifier");
            return None;
        };

        let limit = self.config.limit.daily_seconds;
        let mut state = WindState::load(self.store, limit);
        let current_seconds = u64::from(percentage) * u64::from(limit) / 100;

        // Usage while shielded must not count twice once unlocked: record
        // the raw counter, skip recalculation entirely.
        if self.store.get_bool_or(keys::SHIELD_IS_ACTIVE, false) {
            self.store.put_u64(keys::WIND_LAST_THRESHOLD, current_seconds);
            tracing::debug!(current_seconds, "shield active; threshold recorded without wind update");
            return Some(ProcessedEvent {
                state,
                safety: None,
                blow_away_required: false,
                events: Vec::new(),
            });
        }

        let wind_before = state.wind_points;
        state.last_threshold_seconds = current_seconds;
        state.recompute();
        state.save(self.store);

        let mut events = vec![Event::WindChanged {
            points: state.wind_points,
            display: state.display_points(),
            at: now,
        }];
        for &threshold in &self.config.wind.notify_thresholds {
            if wind_before < f64::from(threshold) && state.wind_points >= f64::from(threshold) {
                events.push(Event::WindThresholdCrossed {
                    threshold,
                    points: state.wind_points,
                    deep_link: format!("windward://wind/{threshold}"),
                    at: now,
                });
            }
        }

        let mut safety = None;
        let mut blow_away_required = false;
        if state.wind_points >= 100.0 {
            let outcome = self.shield.activate_safety(now);
            match outcome {
                SafetyActivation::Activated => {
                    events.push(Event::ShieldActivated {
                        safety: true,
                        break_kind: None,
                        deep_link: "windward://shield".into(),
                        at: now,
                    });
                }
                SafetyActivation::TokensUnavailable => {
                    blow_away_required = true;
                }
                _ => {}
            }
            safety = Some(outcome);
        }

        Some(ProcessedEvent {
            state,
            safety,
            blow_away_required,
            events,
        })
    }
}
