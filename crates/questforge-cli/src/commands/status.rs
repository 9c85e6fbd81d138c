use serde_json::json;

use super::{finish, open_engine, CliResult};

pub fn run() -> CliResult {
    let engine = open_engine()?;
    let now = engine.now();
    let state = engine.state();
    let p = &state.progression;

    let status = json!({
        "level": p.level,
        "xp": p.xp,
        "xp_into_level": p.xp_into_level(),
        "xp_to_next_level": p.xp_to_next_level(),
        "gold": p.gold,
        "login_streak": p.login_streak,
        "chests_opened": p.chests_opened,
        "bosses_defeated": p.bosses_defeated,
        "focus_minutes": p.focus_minutes,
        "goals": state.goals.total_goals(),
        "active_effects": state.effects.live(now).map(|e| e.effect.key()).collect::<Vec<_>>(),
        "companion": state.companions.active().map(|c| &c.name),
    });
    println!("{}", serde_json::to_string_pretty(&status)?);

    finish(engine)
}
