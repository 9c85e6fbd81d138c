use clap::Subcommand;
use questforge_core::ChestTier;

use super::{finish, open_engine, CliResult};

#[derive(Subcommand)]
pub enum ShopAction {
    /// Buy and open a chest: bronze (100), silver (300) or gold (750)
    Chest { tier: ChestTier },
}

pub fn run(action: ShopAction) -> CliResult {
    let mut engine = open_engine()?;

    match action {
        ShopAction::Chest { tier } => {
            let loot = engine.purchase_chest(tier)?;
            for effect in &loot.effects {
                println!("+1 {effect}");
            }
            if let Some(companion) = &loot.companion {
                println!("A companion joins you: {} ({})", companion.name, companion.id);
            }
            println!("Gold left: {}", engine.state().progression.gold);
        }
    }

    finish(engine)
}
