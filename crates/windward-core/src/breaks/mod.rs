//! Break sessions: free, committed, safety.
//!
//! A break turns the shield on and makes wind decay instead of rise. The
//! three kinds differ in how unlocking is judged:
//!
//! - **Free** -- unlockable at any time, never penalized.
//! - **Committed** -- a fixed duration (or until the next local midnight);
//!   unlocking early blows the companion away. Once the planned end has
//!   passed the session behaves like a free break.
//! - **Safety** -- only startable while the safety shield is active;
//!   unlocking is safe once wind has dropped under the configured
//!   threshold, otherwise it is penalized.
//!
//! Decay is linear in wall-clock time, so a suspended interactive process
//! catches up in one step on resume: elapsed minutes since the persisted
//! decay watermark are converted to forgiven usage seconds and folded into
//! the wind state through the calculator, preserving the derived-cache
//! invariant. The watermark makes repeated resumes idempotent.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ValidationError};
use crate::events::Event;
use crate::shield::{BlocklistProvider, ShieldController, ShieldStatus};
use crate::storage::{keys, Config, StateStore};
use crate::wind::WindState;

/// The three break kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    Free,
    Committed,
    Safety,
}

impl fmt::Display for BreakKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BreakKind::Free => "free",
            BreakKind::Committed => "committed",
            BreakKind::Safety => "safety",
        };
        f.write_str(s)
    }
}

impl FromStr for BreakKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(BreakKind::Free),
            "committed" => Ok(BreakKind::Committed),
            "safety" => Ok(BreakKind::Safety),
            _ => Err(()),
        }
    }
}

/// A running break session, persisted minimally for resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakSession {
    pub kind: BreakKind,
    pub started_at: DateTime<Utc>,
    /// Committed only: planned duration in minutes.
    pub planned_minutes: Option<u32>,
    /// Committed only: run until the next local midnight instead.
    pub until_end_of_day: bool,
}

impl BreakSession {
    /// When a committed session's obligation ends. `None` for free and
    /// safety sessions.
    pub fn planned_end(&self) -> Option<DateTime<Utc>> {
        if self.kind != BreakKind::Committed {
            return None;
        }
        if let Some(minutes) = self.planned_minutes {
            return Some(self.started_at + Duration::minutes(i64::from(minutes)));
        }
        if self.until_end_of_day {
            return Some(next_local_midnight(self.started_at));
        }
        None
    }

    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> u32 {
        ((now - self.started_at).num_seconds().max(0) / 60) as u32
    }
}

/// The next local midnight strictly after `after`.
fn next_local_midnight(after: DateTime<Utc>) -> DateTime<Utc> {
    let local = after.with_timezone(&Local);
    let fallback = after + Duration::days(1);
    let Some(naive) = local
        .date_naive()
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        return fallback;
    };
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(fallback)
}

/// The single atomic unlock decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnlockDecision {
    Safe,
    Penalized,
}

/// Result of unlocking a break.
#[derive(Debug)]
pub struct UnlockOutcome {
    pub kind: BreakKind,
    pub decision: UnlockDecision,
    pub actual_minutes: u32,
    /// Penalized unlocks must be routed to the companion's blow-away.
    pub blow_away_required: bool,
    pub events: Vec<Event>,
}

/// Result of a resume-time decay catch-up.
#[derive(Debug)]
pub struct CatchUp {
    /// Usage seconds forgiven by this catch-up step.
    pub applied_reduction_seconds: u64,
    pub state: WindState,
    pub events: Vec<Event>,
}

/// Manages the single active break session against the shared store.
pub struct BreakSessionManager<'a, S: StateStore + ?Sized, P: BlocklistProvider> {
    store: &'a S,
    shield: &'a ShieldController<'a, S, P>,
    config: &'a Config,
}

impl<'a, S: StateStore + ?Sized, P: BlocklistProvider> BreakSessionManager<'a, S, P> {
    pub fn new(store: &'a S, shield: &'a ShieldController<'a, S, P>, config: &'a Config) -> Self {
        Self {
            store,
            shield,
            config,
        }
    }

    /// The currently active session, if any.
    pub fn active(&self) -> Option<BreakSession> {
        let kind: BreakKind = self
            .store
            .get_string(keys::BREAK_ACTIVE_KIND)?
            .parse()
            .ok()?;
        let started_at = self
            .store
            .get_string(keys::BREAK_STARTED_AT)
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|d| d.with_timezone(&Utc))?;
        let planned_minutes = self
            .store
            .get_string(keys::BREAK_PLANNED_MINUTES)
            .and_then(|s| s.parse().ok());
        let until_end_of_day = self.store.get_bool_or(keys::BREAK_UNTIL_END_OF_DAY, false);
        Some(BreakSession {
            kind,
            started_at,
            planned_minutes,
            until_end_of_day,
        })
    }

    /// Start a break session.
    ///
    /// # Errors
    /// Rejects a second concurrent break, a committed break without a
    /// duration, and a safety break while the safety shield is not active.
    pub fn start(
        &self,
        kind: BreakKind,
        planned_minutes: Option<u32>,
        until_end_of_day: bool,
        now: DateTime<Utc>,
    ) -> Result<(BreakSession, Vec<Event>), CoreError> {
        if let Some(existing) = self.active() {
            return Err(ValidationError::BreakAlreadyActive {
                kind: existing.kind.to_string(),
            }
            .into());
        }
        match kind {
            BreakKind::Committed if planned_minutes.is_none() && !until_end_of_day => {
                return Err(ValidationError::MissingBreakDuration.into());
            }
            BreakKind::Safety if self.shield.state().status(now) != ShieldStatus::ActiveSafety => {
                return Err(ValidationError::SafetyShieldNotActive.into());
            }
            _ => {}
        }

        let session = BreakSession {
            kind,
            started_at: now,
            planned_minutes: if kind == BreakKind::Committed {
                planned_minutes
            } else {
                None
            },
            until_end_of_day: kind == BreakKind::Committed && until_end_of_day,
        };

        self.store.put(keys::BREAK_STARTED_AT, &now.to_rfc3339());
        if let Some(minutes) = session.planned_minutes {
            self.store
                .put_u64(keys::BREAK_PLANNED_MINUTES, u64::from(minutes));
        }
        self.store
            .put_bool(keys::BREAK_UNTIL_END_OF_DAY, session.until_end_of_day);
        self.store
            .put(keys::BREAK_DECAY_APPLIED_AT, &now.to_rfc3339());
        self.shield.activate_manual(kind, now);

        let events = vec![
            Event::BreakStarted { kind, at: now },
            Event::ShieldActivated {
                safety: false,
                break_kind: Some(kind),
                deep_link: "windward://break".into(),
                at: now,
            },
        ];
        Ok((session, events))
    }

    /// Apply break decay for wall-clock time elapsed since the persisted
    /// watermark, in one catch-up step. Returns `None` when no break is
    /// active. Safe to call repeatedly; time before the watermark is never
    /// re-applied.
    pub fn resume(&self, now: DateTime<Utc>) -> Option<CatchUp> {
        let session = self.active()?;
        let watermark = self
            .store
            .get_string(keys::BREAK_DECAY_APPLIED_AT)
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or(session.started_at);

        let elapsed_minutes = (now - watermark).num_seconds().max(0) as f64 / 60.0;
        let limit = self.config.limit.daily_seconds;
        let fall_points = elapsed_minutes * self.config.wind.fall_rate_per_minute;
        // One wind point equals limit/100 usage seconds.
        let delta_seconds = (fall_points * f64::from(limit) / 100.0).round() as u64;

        let mut state = WindState::load(self.store, limit);
        let mut events = Vec::new();
        if delta_seconds > 0 {
            state.break_reduction_seconds += delta_seconds;
            state.recompute();
            state.save(self.store);
            events.push(Event::WindChanged {
                points: state.wind_points,
                display: state.display_points(),
                at: now,
            });
        }
        self.store
            .put(keys::BREAK_DECAY_APPLIED_AT, &now.to_rfc3339());

        // Committed sessions announce their natural completion once; past
        // the planned end they are safely cancelable like a free break.
        if let Some(end) = session.planned_end() {
            let notified = self.store.get_bool_or(keys::BREAK_COMPLETION_NOTIFIED, false);
            if now >= end && !notified {
                self.store.put_bool(keys::BREAK_COMPLETION_NOTIFIED, true);
                events.push(Event::CommittedBreakCompleted {
                    planned_minutes: session
                        .planned_minutes
                        .unwrap_or_else(|| session.elapsed_minutes(end)),
                    deep_link: "windward://break/completed".into(),
                    at: now,
                });
            }
        }

        Some(CatchUp {
            applied_reduction_seconds: delta_seconds,
            state,
            events,
        })
    }

    /// Unlock the active break.
    ///
    /// A single atomic decision evaluated at the moment of the request:
    /// free breaks are always safe, committed breaks are penalized before
    /// their planned end, safety breaks are penalized while wind is still
    /// at or above the safe-unlock threshold. Penalized unlocks require
    /// the caller to blow the companion away.
    ///
    /// # Errors
    /// Fails when no break session is active.
    pub fn unlock(&self, now: DateTime<Utc>) -> Result<UnlockOutcome, CoreError> {
        let session = self.active().ok_or(ValidationError::NoActiveBreak)?;

        // Final catch-up so the decision sees fully-decayed wind.
        let mut events = self
            .resume(now)
            .map(|c| c.events)
            .unwrap_or_default();
        let state = WindState::load(self.store, self.config.limit.daily_seconds);

        let decision = match session.kind {
            BreakKind::Free => UnlockDecision::Safe,
            BreakKind::Committed => match session.planned_end() {
                Some(end) if now < end => UnlockDecision::Penalized,
                _ => UnlockDecision::Safe,
            },
            BreakKind::Safety => {
                if state.wind_points < self.config.shield.safe_unlock_threshold {
                    UnlockDecision::Safe
                } else {
                    UnlockDecision::Penalized
                }
            }
        };

        self.store.clear(keys::BREAK_STARTED_AT);
        self.store.clear(keys::BREAK_PLANNED_MINUTES);
        self.store.clear(keys::BREAK_UNTIL_END_OF_DAY);
        self.store.clear(keys::BREAK_DECAY_APPLIED_AT);
        self.store.clear(keys::BREAK_COMPLETION_NOTIFIED);
        let cooldown_until = self.shield.unlock(now);

        let actual_minutes = session.elapsed_minutes(now);
        match decision {
            UnlockDecision::Safe => events.push(Event::BreakEnded {
                kind: session.kind,
                actual_minutes,
                at: now,
            }),
            UnlockDecision::Penalized => events.push(Event::BreakFailed {
                kind: session.kind,
                actual_minutes,
                at: now,
            }),
        }
        events.push(Event::ShieldDeactivated {
            cooldown_until,
            at: now,
        });

        Ok(UnlockOutcome {
            kind: session.kind,
            decision,
            actual_minutes,
            blow_away_required: decision == UnlockDecision::Penalized,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::shield::Blocklist;
    use crate::storage::MemoryStore;

    struct FixedBlocklist;
    impl BlocklistProvider for FixedBlocklist {
        fn load(&self) -> Result<Blocklist, CoreError> {
            Ok(Blocklist {
                tokens: vec!["token-a".into()],
            })
        }
    }

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn set_wind(store: &MemoryStore, threshold_seconds: u64) {
        let mut state = WindState::zeroed(1800);
        state.last_threshold_seconds = threshold_seconds;
        state.recompute();
        state.save(store);
    }

    struct Fixture {
        store: MemoryStore,
        config: Config,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryStore::new(),
                config: Config::default(),
            }
        }
    }

    macro_rules! manager {
        ($fx:ident, $shield:ident, $mgr:ident) => {
            let $shield = ShieldController::new(&$fx.store, &FixedBlocklist, &$fx.config.shield);
            let $mgr = BreakSessionManager::new(&$fx.store, &$shield, &$fx.config);
        };
    }

    #[test]
    fn start_rejects_second_break() {
        let fx = Fixture::new();
        manager!(fx, shield, mgr);

        let now = at("2026-08-07T10:00:00Z");
        mgr.start(BreakKind::Free, None, false, now).unwrap();
        let err = mgr.start(BreakKind::Free, None, false, now).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::BreakAlreadyActive { .. })
        ));
    }

    #[test]
    fn committed_break_requires_duration() {
        let fx = Fixture::new();
        manager!(fx, shield, mgr);

        let err = mgr
            .start(BreakKind::Committed, None, false, at("2026-08-07T10:00:00Z"))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MissingBreakDuration)
        ));
    }

    #[test]
    fn safety_break_requires_active_safety_shield() {
        let fx = Fixture::new();
        manager!(fx, shield, mgr);

        let now = at("2026-08-07T10:00:00Z");
        let err = mgr.start(BreakKind::Safety, None, false, now).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::SafetyShieldNotActive)
        ));

        shield.activate_safety(now);
        assert!(mgr.start(BreakKind::Safety, None, false, now).is_ok());
    }

    #[test]
    fn free_break_decays_wind_in_one_catch_up_step() {
        let fx = Fixture::new();
        manager!(fx, shield, mgr);
        set_wind(&fx.store, 1800); // wind 100

        let start = at("2026-08-07T10:00:00Z");
        mgr.start(BreakKind::Free, None, false, start).unwrap();

        // 30 minutes at 2 points/min forgives 60 points = 1080 seconds.
        let catch_up = mgr.resume(at("2026-08-07T10:30:00Z")).unwrap();
        assert_eq!(catch_up.applied_reduction_seconds, 1080);
        assert_eq!(catch_up.state.wind_points, 40.0);
    }

    #[test]
    fn repeated_resume_is_idempotent() {
        let fx = Fixture::new();
        manager!(fx, shield, mgr);
        set_wind(&fx.store, 1800);

        mgr.start(BreakKind::Free, None, false, at("2026-08-07T10:00:00Z"))
            .unwrap();
        let now = at("2026-08-07T10:30:00Z");
        let first = mgr.resume(now).unwrap();
        let second = mgr.resume(now).unwrap();
        assert_eq!(second.applied_reduction_seconds, 0);
        assert_eq!(second.state.wind_points, first.state.wind_points);
    }

    #[test]
    fn free_unlock_is_always_safe() {
        let fx = Fixture::new();
        manager!(fx, shield, mgr);
        set_wind(&fx.store, 1800);

        mgr.start(BreakKind::Free, None, false, at("2026-08-07T10:00:00Z"))
            .unwrap();
        let outcome = mgr.unlock(at("2026-08-07T10:05:00Z")).unwrap();
        assert_eq!(outcome.decision, UnlockDecision::Safe);
        assert!(!outcome.blow_away_required);
        assert_eq!(outcome.actual_minutes, 5);
        assert!(mgr.active().is_none());
    }

    #[test]
    fn committed_early_unlock_is_penalized() {
        let fx = Fixture::new();
        manager!(fx, shield, mgr);

        mgr.start(
            BreakKind::Committed,
            Some(30),
            false,
            at("2026-08-07T10:00:00Z"),
        )
        .unwrap();
        let outcome = mgr.unlock(at("2026-08-07T10:10:00Z")).unwrap();
        assert_eq!(outcome.decision, UnlockDecision::Penalized);
        assert!(outcome.blow_away_required);
        assert!(outcome
            .events
            .iter()
            .any(|e| matches!(e, Event::BreakFailed { .. })));
    }

    #[test]
    fn committed_unlock_after_planned_end_is_safe() {
        let fx = Fixture::new();
        manager!(fx, shield, mgr);

        mgr.start(
            BreakKind::Committed,
            Some(30),
            false,
            at("2026-08-07T10:00:00Z"),
        )
        .unwrap();
        let outcome = mgr.unlock(at("2026-08-07T10:31:00Z")).unwrap();
        assert_eq!(outcome.decision, UnlockDecision::Safe);
        assert!(!outcome.blow_away_required);
    }

    #[test]
    fn committed_completion_announced_once() {
        let fx = Fixture::new();
        manager!(fx, shield, mgr);

        mgr.start(
            BreakKind::Committed,
            Some(10),
            false,
            at("2026-08-07T10:00:00Z"),
        )
        .unwrap();

        let first = mgr.resume(at("2026-08-07T10:12:00Z")).unwrap();
        assert!(first
            .events
            .iter()
            .any(|e| matches!(e, Event::CommittedBreakCompleted { .. })));

        let second = mgr.resume(at("2026-08-07T10:13:00Z")).unwrap();
        assert!(!second
            .events
            .iter()
            .any(|e| matches!(e, Event::CommittedBreakCompleted { .. })));
    }

    #[test]
    fn until_end_of_day_ends_within_a_day() {
        let session = BreakSession {
            kind: BreakKind::Committed,
            started_at: at("2026-08-07T10:00:00Z"),
            planned_minutes: None,
            until_end_of_day: true,
        };
        let end = session.planned_end().unwrap();
        assert!(end > session.started_at);
        assert!(end <= session.started_at + Duration::days(1));
    }

    #[test]
    fn safety_unlock_gated_on_threshold() {
        let fx = Fixture::new();
        manager!(fx, shield, mgr);
        set_wind(&fx.store, 1800); // wind 100

        let start = at("2026-08-07T10:00:00Z");
        shield.activate_safety(start);
        mgr.start(BreakKind::Safety, None, false, start).unwrap();

        // After 10 minutes wind is 100 - 20 = 80, still >= 60: penalized.
        let outcome = mgr.unlock(at("2026-08-07T10:10:00Z")).unwrap();
        assert_eq!(outcome.decision, UnlockDecision::Penalized);
        assert!(outcome.blow_away_required);
    }

    #[test]
    fn safety_unlock_safe_once_wind_decayed() {
        let fx = Fixture::new();
        manager!(fx, shield, mgr);
        set_wind(&fx.store, 1800);

        let start = at("2026-08-07T10:00:00Z");
        shield.activate_safety(start);
        mgr.start(BreakKind::Safety, None, false, start).unwrap();

        // After 25 minutes wind is 100 - 50 = 50 < 60: safe.
        let outcome = mgr.unlock(at("2026-08-07T10:25:00Z")).unwrap();
        assert_eq!(outcome.decision, UnlockDecision::Safe);
        assert!(!outcome.blow_away_required);
    }

    #[test]
    fn unlock_without_active_break_is_rejected() {
        let fx = Fixture::new();
        manager!(fx, shield, mgr);
        let err = mgr.unlock(at("2026-08-07T10:00:00Z")).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::NoActiveBreak)
        ));
    }
}
