//! Combined status snapshot for the interactive process.

use windward_core::storage::Config;
use windward_core::{
    BreakSessionManager, EvolutionGate, EvolutionHistory, SharedStore, ShieldController,
    ShieldState, StoredBlocklist, WindState,
};

use super::common;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let store = SharedStore::open()?;
    let provider = StoredBlocklist::new(&store);
    let shield = ShieldController::new(&store, &provider, &config.shield);
    let manager = BreakSessionManager::new(&store, &shield, &config);

    let now = common::now();
    let wind = WindState::load(&store, config.limit.daily_seconds);
    let shield_state = ShieldState::load(&store);
    let history = EvolutionHistory::load(&store);
    let gate = EvolutionGate::new(config.companion.max_phase);

    let status = serde_json::json!({
        "wind": {
            "points": wind.wind_points,
            "display": wind.display_points(),
            "cumulativeSeconds": wind.cumulative_seconds(),
            "breakReductionSeconds": wind.break_reduction_seconds,
            "limitSeconds": wind.limit_seconds,
        },
        "shield": {
            "status": shield_state.status(now),
            "isActive": shield_state.is_active,
            "cooldownUntil": shield_state.cooldown_until,
        },
        "break": manager.active(),
        "companion": history.as_ref().map(|h| serde_json::json!({
            "companionId": h.companion_id,
            "phase": h.current_phase(),
            "isBlown": h.is_blown(),
            "canEvolve": gate.can_evolve(h, common::today()),
        })),
    });
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
