//! Durable wind state shared by both processes.

use serde::{Deserialize, Serialize};

use crate::storage::{keys, StateStore};
use crate::wind::calculator::{calculate_wind, display_wind, effective_seconds};

/// The five durable wind fields.
///
/// `wind_points` is a derived cache of the other four fields -- after every
/// mutation [`WindState::recompute`] re-derives it, so the stored value is
/// never an independent source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindState {
    /// Usage seconds accumulated before the last monitor restart.
    pub cumulative_baseline_seconds: u64,
    /// Seconds reported by the monitor's counter since its interval start.
    pub last_threshold_seconds: u64,
    /// Usage seconds forgiven by break decay.
    pub break_reduction_seconds: u64,
    /// Daily limit in seconds. Authoritative value comes from config; the
    /// store carries a mirror for display consumers.
    pub limit_seconds: u32,
    /// Derived wind points, unclamped.
    pub wind_points: f64,
}

impl WindState {
    /// Zero state for a fresh day.
    pub fn zeroed(limit_seconds: u32) -> Self {
        Self {
            cumulative_baseline_seconds: 0,
            last_threshold_seconds: 0,
            break_reduction_seconds: 0,
            limit_seconds,
            wind_points: 0.0,
        }
    }

    /// Read every field from the store, degrading missing or unreadable
    /// fields to the zero state. The limit is the currently-configured one,
    /// not a stored copy, so a mid-day limit change takes effect on the
    /// next event.
    pub fn load<S: StateStore + ?Sized>(store: &S, limit_seconds: u32) -> Self {
        Self {
            cumulative_baseline_seconds: store.get_u64_or(keys::WIND_BASELINE, 0),
            last_threshold_seconds: store.get_u64_or(keys::WIND_LAST_THRESHOLD, 0),
            break_reduction_seconds: store.get_u64_or(keys::WIND_BREAK_REDUCTION, 0),
            limit_seconds,
            wind_points: store.get_f64_or(keys::WIND_POINTS, 0.0),
        }
    }

    /// Write back as independent single-key writes (last write wins per
    /// key; an interrupted sequence is reconciled by the next recompute).
    pub fn save<S: StateStore + ?Sized>(&self, store: &S) {
        store.put_u64(keys::WIND_BASELINE, self.cumulative_baseline_seconds);
        store.put_u64(keys::WIND_LAST_THRESHOLD, self.last_threshold_seconds);
        store.put_u64(keys::WIND_BREAK_REDUCTION, self.break_reduction_seconds);
        store.put_u64(keys::LIMIT_SECONDS, u64::from(self.limit_seconds));
        store.put_f64(keys::WIND_POINTS, self.wind_points);
    }

    /// Total usage seconds: carried-over baseline plus the monitor's
    /// current counter.
    pub fn cumulative_seconds(&self) -> u64 {
        self.cumulative_baseline_seconds + self.last_threshold_seconds
    }

    /// Re-derive the cached wind value from the other four fields.
    pub fn recompute(&mut self) {
        self.wind_points = calculate_wind(
            effective_seconds(self.cumulative_seconds(), self.break_reduction_seconds),
            self.limit_seconds,
        );
    }

    /// Clamped value for presentation.
    pub fn display_points(&self) -> f64 {
        display_wind(self.wind_points)
    }
}
