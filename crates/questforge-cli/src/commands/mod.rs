pub mod companion;
pub mod config;
pub mod focus;
pub mod goal;
pub mod recur;
pub mod shop;
pub mod spell;
pub mod status;

use questforge_core::storage::Database;
use questforge_core::{Config, QuestEngine, SystemClock};

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Load config and state, then bring the calendar up to date.
pub fn open_engine() -> CliResult<QuestEngine> {
    let config = Config::load_or_default();
    let db = Database::open()?;
    let (mut engine, report) = QuestEngine::load(config, Box::new(SystemClock), Box::new(db))?;
    tracing::debug!(fresh = report.fresh, defaulted = ?report.defaulted, "state loaded");
    if let Some(key) = &report.backup_key {
        eprintln!("warning: unreadable saved state preserved under {key}");
    }
    engine.run_rollover();
    engine.materialize_today();
    Ok(engine)
}

/// Write the snapshot and print what happened, one JSON event per line.
pub fn finish(mut engine: QuestEngine) -> CliResult {
    engine.flush()?;
    for event in engine.drain_events() {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}
