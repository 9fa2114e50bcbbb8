//! Monitoring-interval reconciliation.
//!
//! The external monitor resets its internal elapsed counter to zero on
//! every restart, which looks identical to a day rollover from inside an
//! interval-start notification. This module tells the two apart and folds
//! pre-restart progress into the baseline so no usage is lost and the
//! user-visible wind level does not jump at the restart boundary.

use chrono::NaiveDate;

use crate::storage::{keys, StateStore};
use crate::wind::state::WindState;

/// What an interval-start notification turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalStartOutcome {
    /// A genuine new calendar day; all wind state was zeroed.
    NewDay,
    /// The monitor restarted mid-day; progress was folded into the baseline.
    Restart { folded_seconds: u64 },
}

/// Reconciles monitor interval starts against the shared store.
pub struct RestartReconciler<'a, S: StateStore + ?Sized> {
    store: &'a S,
    limit_seconds: u32,
}

impl<'a, S: StateStore + ?Sized> RestartReconciler<'a, S> {
    pub fn new(store: &'a S, limit_seconds: u32) -> Self {
        Self {
            store,
            limit_seconds,
        }
    }

    /// Handle an interval-start notification from the monitor.
    ///
    /// Heuristic: both wind points and the last observed threshold at zero
    /// means nothing was in flight, so this is a new day. Any other state
    /// means the monitor restarted mid-day -- fold the stale counter into
    /// the baseline and zero only the counter, leaving wind and break
    /// reduction untouched.
    ///
    /// The `wind.lastReconciledDate` marker disambiguates the pathological
    /// case where a crash prevented day-rollover cleanup: a marker from an
    /// earlier date forces a new day even with leftover nonzero state.
    pub fn on_interval_start(&self, today: NaiveDate) -> IntervalStartOutcome {
        let points = self.store.get_f64_or(keys::WIND_POINTS, 0.0);
        let last_threshold = self.store.get_u64_or(keys::WIND_LAST_THRESHOLD, 0);

        let marker = self
            .store
            .get_string(keys::WIND_LAST_RECONCILED_DATE)
            .and_then(|s| s.parse::<NaiveDate>().ok());
        let stale_marker = marker.is_some_and(|d| d < today);

        if (points == 0.0 && last_threshold == 0) || stale_marker {
            if stale_marker {
                tracing::info!(?marker, %today, "leftover state from an earlier day; forcing rollover");
            }
            self.reset_for_new_day(today);
            return IntervalStartOutcome::NewDay;
        }

        let baseline = self.store.get_u64_or(keys::WIND_BASELINE, 0);
        self.store
            .put_u64(keys::WIND_BASELINE, baseline + last_threshold);
        self.store.put_u64(keys::WIND_LAST_THRESHOLD, 0);
        self.store
            .put(keys::WIND_LAST_RECONCILED_DATE, &today.to_string());

        tracing::debug!(folded_seconds = last_threshold, "monitor restart reconciled");
        IntervalStartOutcome::Restart {
            folded_seconds: last_threshold,
        }
    }

    /// Zero all wind state and reset shield/break state for a fresh day.
    fn reset_for_new_day(&self, today: NaiveDate) {
        WindState::zeroed(self.limit_seconds).save(self.store);

        self.store.put_bool(keys::SHIELD_IS_ACTIVE, false);
        self.store.clear(keys::SHIELD_ACTIVATED_AT);
        self.store.clear(keys::SHIELD_COOLDOWN_UNTIL);

        self.store.clear(keys::BREAK_ACTIVE_KIND);
        self.store.clear(keys::BREAK_STARTED_AT);
        self.store.clear(keys::BREAK_PLANNED_MINUTES);
        self.store.clear(keys::BREAK_UNTIL_END_OF_DAY);
        self.store.clear(keys::BREAK_DECAY_APPLIED_AT);
        self.store.clear(keys::BREAK_COMPLETION_NOTIFIED);

        self.store
            .put(keys::WIND_LAST_RECONCILED_DATE, &today.to_string());
    }
}
