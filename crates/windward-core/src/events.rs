//! Outbound notification trigger events.
//!
//! The core decides *whether* a notification fires, never how it is
//! rendered. Each variant carries an opaque deep-link payload the UI layer
//! resolves. The CLI prints events as JSON; a notification collaborator
//! consumes them from there.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::breaks::BreakKind;
use crate::companion::BlowReason;

/// Every policy-relevant state change produces an Event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Wind moved as a result of a threshold event or break decay.
    WindChanged {
        points: f64,
        display: f64,
        at: DateTime<Utc>,
    },
    /// Wind rose through a configured notification threshold.
    WindThresholdCrossed {
        threshold: u8,
        points: f64,
        deep_link: String,
        at: DateTime<Utc>,
    },
    /// The blocking shield turned on.
    ShieldActivated {
        safety: bool,
        break_kind: Option<BreakKind>,
        deep_link: String,
        at: DateTime<Utc>,
    },
    /// The blocking shield turned off; cooldown window opened.
    ShieldDeactivated {
        cooldown_until: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    BreakStarted {
        kind: BreakKind,
        at: DateTime<Utc>,
    },
    BreakEnded {
        kind: BreakKind,
        actual_minutes: u32,
        at: DateTime<Utc>,
    },
    BreakFailed {
        kind: BreakKind,
        actual_minutes: u32,
        at: DateTime<Utc>,
    },
    /// A committed break reached its planned end without being abandoned.
    CommittedBreakCompleted {
        planned_minutes: u32,
        deep_link: String,
        at: DateTime<Utc>,
    },
    /// The companion may progress to its next phase.
    EvolutionAvailable {
        next_phase: u8,
        deep_link: String,
        at: DateTime<Utc>,
    },
    CompanionBlownAway {
        reason: BlowReason,
        at: DateTime<Utc>,
    },
    DailyReset {
        at: DateTime<Utc>,
    },
}
