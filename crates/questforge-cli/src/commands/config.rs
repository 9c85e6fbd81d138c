use clap::{Subcommand, ValueEnum};
use questforge_core::Config;

use super::CliResult;

/// Top-level config tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Section {
    Rewards,
    Boss,
    Engine,
    Focus,
}

impl Section {
    fn name(self) -> &'static str {
        match self {
            Section::Rewards => "rewards",
            Section::Boss => "boss",
            Section::Engine => "engine",
            Section::Focus => "focus",
        }
    }

    fn summary(self) -> &'static str {
        match self {
            Section::Rewards => "base XP and gold per action",
            Section::Boss => "boss defeat payouts, base plus per player level",
            Section::Engine => "save debounce, expiry sweep, critical strikes, RNG seed",
            Section::Focus => "default focus session length",
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value (e.g. "rewards.task.xp", "boss.life_gold")
    Get { key: String },
    /// Change one value; amounts must be non-negative integers
    Set {
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Print the config as TOML, or only one section
    List { section: Option<Section> },
    /// Describe the config sections
    Sections,
    /// Restore defaults, for everything or one section
    Reset { section: Option<Section> },
}

/// Render `section` (or the whole config) as TOML.
fn render(config: &Config, section: Option<Section>) -> CliResult<String> {
    let Some(section) = section else {
        return Ok(toml::to_string_pretty(config)?);
    };
    let mut whole = match toml::Value::try_from(config)? {
        toml::Value::Table(table) => table,
        _ => return Err("config did not serialize to a table".into()),
    };
    let mut only = toml::map::Map::new();
    if let Some(table) = whole.remove(section.name()) {
        only.insert(section.name().to_string(), table);
    }
    Ok(toml::to_string_pretty(&only)?)
}

pub fn run(action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config
                .get(&key)
                .ok_or_else(|| format!("unknown key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            tracing::info!(%key, %value, "config updated");
            println!("ok");
        }
        ConfigAction::List { section } => {
            let config = Config::load()?;
            print!("{}", render(&config, section)?);
        }
        ConfigAction::Sections => {
            for section in Section::value_variants() {
                println!("{:<8} {}", section.name(), section.summary());
            }
        }
        ConfigAction::Reset { section: None } => {
            Config::default().save()?;
            println!("config reset to defaults");
        }
        ConfigAction::Reset {
            section: Some(section),
        } => {
            let mut config = Config::load()?;
            config.reset_section(section.name())?;
            config.save()?;
            println!("{} reset to defaults", section.name());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_match_the_config_tables() {
        let names: Vec<&str> = Section::value_variants().iter().map(|s| s.name()).collect();
        assert_eq!(names, Config::SECTIONS);
    }

    #[test]
    fn render_limits_output_to_one_section() {
        let config = Config::default();
        let boss = render(&config, Some(Section::Boss)).unwrap();
        assert!(boss.starts_with("[boss]"));
        assert!(boss.contains("life_xp"));
        assert!(!boss.contains("debounce_ms"));

        let parsed: toml::Value = toml::from_str(&boss).unwrap();
        assert_eq!(parsed.as_table().unwrap().len(), 1);

        let all = render(&config, None).unwrap();
        assert!(all.contains("[engine]"));
        assert!(all.contains("[focus]"));
    }
}
