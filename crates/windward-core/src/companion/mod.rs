//! Companion lifecycle: evolution gating and blow-away.
//!
//! The gate is a pure rule set over [`EvolutionHistory`]; it holds no
//! state of its own. Progression is limited to once per calendar day and
//! stops at the configured final phase. Blow-away is terminal and
//! idempotent -- once `blown_at` is set the history is immutable.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::storage::{keys, StateStore};

/// Identifier of the essence infused into a companion.
pub type EssenceId = String;

/// One phase progression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseEvent {
    pub phase: u8,
    pub at: DateTime<Utc>,
}

/// Why a companion blew away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlowReason {
    /// A committed break was unlocked before its planned end.
    CommittedBreakAbandoned,
    /// A safety break was unlocked while wind was still too high.
    UnsafeUnlock,
    /// Wind reached 100 with no shield possible (tokens unavailable).
    ShieldUnavailable,
}

/// Durable per-companion history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionHistory {
    pub companion_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub essence: Option<EssenceId>,
    pub events: Vec<PhaseEvent>,
    pub blown_at: Option<DateTime<Utc>>,
    pub last_progress_date: Option<NaiveDate>,
}

impl EvolutionHistory {
    pub fn new(now: DateTime<Utc>, essence: Option<EssenceId>) -> Self {
        Self {
            companion_id: Uuid::new_v4(),
            created_at: now,
            essence,
            events: Vec::new(),
            blown_at: None,
            last_progress_date: None,
        }
    }

    /// Highest phase reached so far; 0 before any progression.
    pub fn current_phase(&self) -> u8 {
        self.events.last().map(|e| e.phase).unwrap_or(0)
    }

    pub fn is_blown(&self) -> bool {
        self.blown_at.is_some()
    }

    pub fn has_progressed_on(&self, date: NaiveDate) -> bool {
        self.last_progress_date == Some(date)
    }

    /// Load from the shared store. Corrupt histories are logged and
    /// treated as absent.
    pub fn load<S: StateStore + ?Sized>(store: &S) -> Option<Self> {
        let raw = store.get_string(keys::COMPANION_HISTORY)?;
        match serde_json::from_str(&raw) {
            Ok(history) => Some(history),
            Err(e) => {
                tracing::warn!(error = %e, "corrupt companion history; ignoring");
                None
            }
        }
    }

    /// Persist to the shared store as a single JSON blob.
    pub fn save<S: StateStore + ?Sized>(&self, store: &S) {
        match serde_json::to_string(self) {
            Ok(json) => store.put(keys::COMPANION_HISTORY, &json),
            Err(e) => tracing::warn!(error = %e, "failed to serialize companion history"),
        }
    }
}

/// Pure progression rules.
pub struct EvolutionGate {
    pub max_phase: u8,
}

impl EvolutionGate {
    pub fn new(max_phase: u8) -> Self {
        Self { max_phase }
    }

    pub fn can_evolve(&self, history: &EvolutionHistory, today: NaiveDate) -> bool {
        history.essence.is_some()
            && !history.is_blown()
            && !history.has_progressed_on(today)
            && history.current_phase() < self.max_phase
    }

    /// Progress the companion one phase.
    ///
    /// # Errors
    /// Rejects progression without an essence, after blow-away, twice on
    /// the same calendar day, or past the final phase.
    pub fn progress(
        &self,
        history: &mut EvolutionHistory,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<PhaseEvent, ValidationError> {
        if history.is_blown() {
            return Err(ValidationError::CompanionBlown);
        }
        if history.essence.is_none() {
            return Err(ValidationError::MissingEssence);
        }
        if history.has_progressed_on(today) {
            return Err(ValidationError::AlreadyProgressedToday);
        }
        if history.current_phase() >= self.max_phase {
            return Err(ValidationError::AtFinalPhase);
        }

        let event = PhaseEvent {
            phase: history.current_phase() + 1,
            at: now,
        };
        history.events.push(event.clone());
        history.last_progress_date = Some(today);
        Ok(event)
    }

    /// Terminal, idempotent blow-away. Returns whether this call was the
    /// one that blew the companion away.
    pub fn blow_away(
        &self,
        history: &mut EvolutionHistory,
        reason: BlowReason,
        now: DateTime<Utc>,
    ) -> bool {
        if history.is_blown() {
            return false;
        }
        history.blown_at = Some(now);
        tracing::info!(?reason, companion_id = %history.companion_id, "companion blew away");
        true
    }
}
