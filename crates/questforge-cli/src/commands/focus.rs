//! Foreground focus session driven by a one-second tokio interval.

use std::time::Duration;

use clap::Subcommand;
use questforge_core::{FocusState, QuestEngine};

use super::{finish, open_engine, CliResult};

#[derive(Subcommand)]
pub enum FocusAction {
    /// Run a focus session in the foreground until it completes
    Run {
        /// Session length; defaults to focus.default_minutes
        #[arg(long)]
        minutes: Option<u32>,
    },
}

async fn drive(engine: &mut QuestEngine) -> CliResult<Option<u64>> {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    loop {
        interval.tick().await;
        if let Some(xp) = engine.tick_focus() {
            return Ok(Some(xp));
        }
        let Some(session) = engine.focus() else {
            return Ok(None);
        };
        if session.state() == FocusState::Running {
            let secs = session.remaining_ms() / 1000;
            eprint!("\r{:02}:{:02} remaining", secs / 60, secs % 60);
        }
        engine.tick()?;
    }
}

pub fn run(action: FocusAction) -> CliResult {
    let mut engine = open_engine()?;

    match action {
        FocusAction::Run { minutes } => {
            engine.start_focus(minutes)?;
            let runtime = tokio::runtime::Runtime::new()?;
            let earned = runtime.block_on(drive(&mut engine))?;
            eprintln!();
            if let Some(xp) = earned {
                println!("Focus complete: +{xp} XP");
            }
        }
    }

    finish(engine)
}
