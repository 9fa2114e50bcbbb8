//! Shield activation policy.
//!
//! The shield is the app-blocking state machine:
//!
//! ```text
//! Inactive -> ActiveSafety          (wind >= 100, not cooling down)
//! Inactive/ActiveX -> ActiveManual  (user starts a break)
//! ActiveX -> CooldownAfterUnlock -> Inactive
//! ```
//!
//! Cooldown expiry is a wall-clock deadline re-evaluated on every read --
//! never an in-process timer, which would not survive process death.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::breaks::BreakKind;
use crate::error::CoreError;
use crate::storage::{keys, ShieldConfig, StateStore};

/// Derived shield status at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShieldStatus {
    Inactive,
    ActiveManual,
    ActiveSafety,
    CooldownAfterUnlock,
}

/// Durable shield state.
///
/// `cooldown_until` is only set on an active -> inactive transition, and
/// while it lies in the future the safety shield must not re-trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShieldState {
    pub is_active: bool,
    pub activated_at: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub active_break_kind: Option<BreakKind>,
}

impl ShieldState {
    pub fn load<S: StateStore + ?Sized>(store: &S) -> Self {
        let parse_ts = |key| {
            store
                .get_string(key)
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|d| d.with_timezone(&Utc))
        };
        Self {
            is_active: store.get_bool_or(keys::SHIELD_IS_ACTIVE, false),
            activated_at: parse_ts(keys::SHIELD_ACTIVATED_AT),
            cooldown_until: parse_ts(keys::SHIELD_COOLDOWN_UNTIL),
            active_break_kind: store
                .get_string(keys::BREAK_ACTIVE_KIND)
                .and_then(|s| s.parse().ok()),
        }
    }

    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }

    pub fn status(&self, now: DateTime<Utc>) -> ShieldStatus {
        if self.is_active {
            if self.active_break_kind.is_some() {
                ShieldStatus::ActiveManual
            } else {
                ShieldStatus::ActiveSafety
            }
        } else if self.in_cooldown(now) {
            ShieldStatus::CooldownAfterUnlock
        } else {
            ShieldStatus::Inactive
        }
    }
}

/// Opaque block-list tokens supplied by the OS layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Blocklist {
    pub tokens: Vec<String>,
}

/// Source of the block-list tokens the shield needs to enforce anything.
pub trait BlocklistProvider {
    /// Load the current block list.
    ///
    /// # Errors
    /// Fails when the tokens cannot be loaded; the shield then degrades to
    /// no enforcement instead of crashing.
    fn load(&self) -> Result<Blocklist, CoreError>;
}

/// Block list persisted in the shared store by the UI layer.
pub struct StoredBlocklist<'a, S: StateStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: StateStore + ?Sized> StoredBlocklist<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

impl<S: StateStore + ?Sized> BlocklistProvider for StoredBlocklist<'_, S> {
    fn load(&self) -> Result<Blocklist, CoreError> {
        let raw = self
            .store
            .get_string(keys::SHIELD_BLOCKLIST)
            .ok_or_else(|| CoreError::Custom("block-list tokens not available".into()))?;
        let blocklist: Blocklist = serde_json::from_str(&raw)?;
        if blocklist.tokens.is_empty() {
            return Err(CoreError::Custom("block list is empty".into()));
        }
        Ok(blocklist)
    }
}

/// Why a safety activation request did or did not take effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyActivation {
    Activated,
    AlreadyActive,
    InCooldown,
    DisabledBySettings,
    TokensUnavailable,
}

/// Drives shield transitions against the shared store.
pub struct ShieldController<'a, S: StateStore + ?Sized, P: BlocklistProvider> {
    store: &'a S,
    provider: &'a P,
    config: &'a ShieldConfig,
}

impl<'a, S: StateStore + ?Sized, P: BlocklistProvider> ShieldController<'a, S, P> {
    pub fn new(store: &'a S, provider: &'a P, config: &'a ShieldConfig) -> Self {
        Self {
            store,
            provider,
            config,
        }
    }

    pub fn state(&self) -> ShieldState {
        ShieldState::load(self.store)
    }

    /// Safety auto-activation path, invoked when wind reaches 100.
    ///
    /// Gated on: not already active, not in the post-unlock cooldown
    /// window, safety shield enabled in settings, and block-list tokens
    /// loadable. A missing block list skips activation and is logged --
    /// blocking nothing beats crashing the monitor process.
    pub fn activate_safety(&self, now: DateTime<Utc>) -> SafetyActivation {
        let state = self.state();
        if state.is_active {
            return SafetyActivation::AlreadyActive;
        }
        if state.in_cooldown(now) {
            return SafetyActivation::InCooldown;
        }
        if !self.config.safety_enabled {
            return SafetyActivation::DisabledBySettings;
        }
        if let Err(e) = self.provider.load() {
            tracing::warn!(error = %e, "block list unavailable; skipping safety activation");
            return SafetyActivation::TokensUnavailable;
        }

        self.store.put_bool(keys::SHIELD_IS_ACTIVE, true);
        self.store
            .put(keys::SHIELD_ACTIVATED_AT, &now.to_rfc3339());
        SafetyActivation::Activated
    }

    /// Manual activation when the user starts a break.
    ///
    /// Always records the active state; a missing block list degrades to
    /// no enforcement rather than refusing the break.
    pub fn activate_manual(&self, kind: BreakKind, now: DateTime<Utc>) {
        if let Err(e) = self.provider.load() {
            tracing::warn!(error = %e, "block list unavailable; break runs without enforcement");
        }
        self.store.put_bool(keys::SHIELD_IS_ACTIVE, true);
        self.store
            .put(keys::SHIELD_ACTIVATED_AT, &now.to_rfc3339());
        self.store.put(keys::BREAK_ACTIVE_KIND, &kind.to_string());
    }

    /// Turn the shield off and open the cooldown window during which
    /// safety re-activation is suppressed.
    pub fn unlock(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let cooldown_until = now + Duration::seconds(i64::from(self.config.cooldown_seconds));
        self.store.put_bool(keys::SHIELD_IS_ACTIVE, false);
        self.store.clear(keys::SHIELD_ACTIVATED_AT);
        self.store
            .put(keys::SHIELD_COOLDOWN_UNTIL, &cooldown_until.to_rfc3339());
        self.store.clear(keys::BREAK_ACTIVE_KIND);
        cooldown_until
    }
}
