//! Companion lifecycle commands.

use clap::Subcommand;
use windward_core::storage::Config;
use windward_core::{EvolutionGate, EvolutionHistory, SharedStore, ValidationError};

use super::common;

#[derive(Subcommand)]
pub enum CompanionAction {
    /// Print the companion's history and progression gate as JSON
    Status,
    /// Progress the companion one phase (at most once per day)
    Evolve,
    /// Print the phase progression events
    History,
    /// Adopt a fresh companion (replaces a blown one)
    Adopt {
        /// Essence to infuse into the new companion
        #[arg(long)]
        essence: Option<String>,
    },
}

pub fn run(action: CompanionAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let store = SharedStore::open()?;
    let gate = EvolutionGate::new(config.companion.max_phase);

    match action {
        CompanionAction::Status => {
            let Some(history) = EvolutionHistory::load(&store) else {
                println!("{}", serde_json::json!({ "adopted": false }));
                return Ok(());
            };
            println!(
                "{}",
                serde_json::json!({
                    "companionId": history.companion_id,
                    "createdAt": history.created_at,
                    "essence": history.essence,
                    "phase": history.current_phase(),
                    "isBlown": history.is_blown(),
                    "blownAt": history.blown_at,
                    "canEvolve": gate.can_evolve(&history, common::today()),
                })
            );
        }
        CompanionAction::Evolve => {
            let mut history =
                EvolutionHistory::load(&store).ok_or(ValidationError::NoCompanion)?;
            let event = gate.progress(&mut history, common::today(), common::now())?;
            history.save(&store);
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        CompanionAction::History => {
            let history = EvolutionHistory::load(&store).ok_or(ValidationError::NoCompanion)?;
            println!("{}", serde_json::to_string_pretty(&history.events)?);
        }
        CompanionAction::Adopt { essence } => {
            if let Some(existing) = EvolutionHistory::load(&store) {
                if !existing.is_blown() {
                    return Err(ValidationError::CompanionAlive.into());
                }
            }
            let history = EvolutionHistory::new(common::now(), essence);
            history.save(&store);
            println!(
                "{}",
                serde_json::json!({
                    "companionId": history.companion_id,
                    "essence": history.essence,
                })
            );
        }
    }
    Ok(())
}
