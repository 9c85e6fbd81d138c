use clap::Subcommand;

use super::{finish, open_engine, CliResult};

#[derive(Subcommand)]
pub enum CompanionAction {
    /// List owned companions
    List,
    /// Make a companion the active one
    Activate { id: String },
    /// Clear the active companion
    Deactivate,
}

pub fn run(action: CompanionAction) -> CliResult {
    let mut engine = open_engine()?;

    match action {
        CompanionAction::List => {
            println!("{}", serde_json::to_string_pretty(&engine.state().companions)?);
        }
        CompanionAction::Activate { id } => engine.activate_companion(&id)?,
        CompanionAction::Deactivate => engine.deactivate_companion(),
    }

    finish(engine)
}
