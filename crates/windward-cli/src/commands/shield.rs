//! Shield state inspection.

use clap::Subcommand;
use windward_core::{SharedStore, ShieldState};

use super::common;

#[derive(Subcommand)]
pub enum ShieldAction {
    /// Print the shield state as JSON
    Status,
}

pub fn run(action: ShieldAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = SharedStore::open()?;
    match action {
        ShieldAction::Status => {
            let state = ShieldState::load(&store);
            let status = state.status(common::now());
            println!(
                "{}",
                serde_json::json!({
                    "status": status,
                    "isActive": state.is_active,
                    "activatedAt": state.activated_at,
                    "cooldownUntil": state.cooldown_until,
                    "activeBreakKind": state.active_break_kind,
                })
            );
        }
    }
    Ok(())
}
