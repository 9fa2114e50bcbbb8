//! # Windward Core Library
//!
//! This library provides the core business logic for Windward: a bounded
//! usage-intensity metric ("wind") derived from blocked-app usage, the
//! blocking policy ("shield") driven by it, and the lifecycle of a virtual
//! companion whose survival depends on usage discipline. All operations
//! are available via a standalone CLI binary; GUI layers are thin shells
//! over this crate.
//!
//! ## Architecture
//!
//! Two independently-scheduled OS processes run this logic: a long-lived
//! interactive process and a short-lived monitor process invoked per
//! usage-threshold crossing. They share no channel besides a durable
//! single-key store and an append-only log, so every multi-field update is
//! a sequence of independently-idempotent single-key writes that tolerates
//! partial application.
//!
//! ## Key Components
//!
//! - [`wind`]: wind math, restart reconciliation, threshold event processing
//! - [`ShieldController`]: blocking policy state machine
//! - [`BreakSessionManager`]: free/committed/safety break sessions
//! - [`EvolutionGate`]: companion progression and blow-away rules
//! - [`SnapshotLog`]: append-only lifecycle event log
//! - [`Config`] / [`StateStore`]: shared configuration and state

pub mod breaks;
pub mod companion;
pub mod error;
pub mod events;
pub mod shield;
pub mod snapshot;
pub mod storage;
pub mod wind;

pub use breaks::{BreakKind, BreakSession, BreakSessionManager, UnlockDecision, UnlockOutcome};
pub use companion::{BlowReason, EvolutionGate, EvolutionHistory, PhaseEvent};
pub use error::{ConfigError, CoreError, StoreError, ValidationError};
pub use events::Event;
pub use shield::{
    Blocklist, BlocklistProvider, SafetyActivation, ShieldController, ShieldState, ShieldStatus,
    StoredBlocklist,
};
pub use snapshot::{SnapshotEvent, SnapshotEventType, SnapshotLog};
pub use storage::{Config, MemoryStore, SharedStore, StateStore};
pub use wind::{
    calculate_wind, display_wind, IntervalStartOutcome, ProcessedEvent, RestartReconciler,
    ThresholdEventProcessor, WindState,
};
