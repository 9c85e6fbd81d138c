use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "questforge-cli", version, about = "Questforge CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Goal management
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Recurring task definitions
    Recur {
        #[command(subcommand)]
        action: commands::recur::RecurAction,
    },
    /// Spells and enchantments
    Spell {
        #[command(subcommand)]
        action: commands::spell::SpellAction,
    },
    /// Treasure chests
    Shop {
        #[command(subcommand)]
        action: commands::shop::ShopAction,
    },
    /// Companion management
    Companion {
        #[command(subcommand)]
        action: commands::companion::CompanionAction,
    },
    /// Focus sessions
    Focus {
        #[command(subcommand)]
        action: commands::focus::FocusAction,
    },
    /// Print level, gold and active effects as JSON
    Status,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("QUESTFORGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Goal { action } => commands::goal::run(action),
        Commands::Recur { action } => commands::recur::run(action),
        Commands::Spell { action } => commands::spell::run(action),
        Commands::Shop { action } => commands::shop::run(action),
        Commands::Companion { action } => commands::companion::run(action),
        Commands::Focus { action } => commands::focus::run(action),
        Commands::Status => commands::status::run(),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
