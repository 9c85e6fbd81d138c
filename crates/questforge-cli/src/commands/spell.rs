use clap::Subcommand;
use questforge_core::EffectId;
use serde_json::json;

use super::{finish, open_engine, CliResult};

#[derive(Subcommand)]
pub enum SpellAction {
    /// Show charges and what is currently active
    List,
    /// Cast a spell or enchantment (e.g. "xp_surge")
    Cast { effect: EffectId },
    /// Drop expired effects
    Sweep,
}

pub fn run(action: SpellAction) -> CliResult {
    let mut engine = open_engine()?;

    match action {
        SpellAction::List => {
            let now = engine.now();
            let state = engine.state();
            let catalogue: Vec<_> = EffectId::ALL
                .into_iter()
                .map(|id| {
                    let def = id.definition();
                    json!({
                        "id": id.key(),
                        "name": def.name,
                        "pool": def.pool,
                        "min_level": def.min_level,
                        "charges": state.inventory.charges(id),
                    })
                })
                .collect();
            let active: Vec<_> = state.effects.live(now).collect();
            let listing = json!({ "catalogue": catalogue, "active": active });
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        SpellAction::Cast { effect } => {
            engine.cast_effect(effect)?;
            println!("{effect} cast");
        }
        SpellAction::Sweep => {
            let expired = engine.sweep_expired();
            println!("{} expired", expired.len());
        }
    }

    finish(engine)
}
