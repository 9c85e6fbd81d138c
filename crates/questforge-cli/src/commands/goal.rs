//! Goal management commands for CLI.

use clap::Subcommand;
use questforge_core::{GoalLevel, NewGoal, Priority};

use super::{finish, open_engine, CliResult};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Create a goal
    Add {
        /// life, yearly, monthly, weekly, daily, side_quest or habit
        level: GoalLevel,
        /// Goal title
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// low, medium or high (yearly, monthly and weekly only)
        #[arg(long)]
        priority: Option<String>,
        /// Parent goal ID, one level up (repeatable)
        #[arg(long = "parent")]
        parents: Vec<String>,
        /// Checklist item text (repeatable)
        #[arg(long = "item")]
        items: Vec<String>,
    },
    /// List goals
    List {
        /// Only this level
        #[arg(long)]
        level: Option<GoalLevel>,
    },
    /// Print one goal as JSON
    Show { level: GoalLevel, id: String },
    /// Complete or reopen a goal
    Toggle { level: GoalLevel, id: String },
    /// Add a checklist item
    ChecklistAdd {
        level: GoalLevel,
        id: String,
        text: String,
    },
    /// Tick or untick a checklist item
    ChecklistToggle {
        level: GoalLevel,
        id: String,
        item_id: String,
    },
    /// Link a goal to a parent one level up
    Link {
        level: GoalLevel,
        id: String,
        parent_id: String,
    },
    /// Remove a parent link
    Unlink {
        level: GoalLevel,
        id: String,
        parent_id: String,
    },
    /// Move a goal to the archive
    Archive { level: GoalLevel, id: String },
    /// Flag a life or yearly goal as a boss
    Boss { level: GoalLevel, id: String },
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    match value.to_ascii_lowercase().as_str() {
        "low" => Ok(Priority::Low),
        "medium" => Ok(Priority::Medium),
        "high" => Ok(Priority::High),
        other => Err(format!("unknown priority '{other}'")),
    }
}

pub fn run(action: GoalAction) -> CliResult {
    let mut engine = open_engine()?;

    match action {
        GoalAction::Add {
            level,
            title,
            description,
            priority,
            parents,
            items,
        } => {
            let new = NewGoal {
                title,
                description,
                priority: priority.as_deref().map(parse_priority).transpose()?,
                parent_ids: parents,
                checklist: items,
            };
            let id = engine.add_goal(level, new)?;
            println!("Goal created: {id}");
        }
        GoalAction::List { level } => {
            let levels = match level {
                Some(level) => vec![level],
                None => GoalLevel::ALL.to_vec(),
            };
            for level in levels {
                for goal in engine.state().goals.collection(level) {
                    let mark = if goal.completed { "x" } else { " " };
                    let mut line = format!("{:<10} [{mark}] {}  {}", level.as_str(), goal.id, goal.title);
                    if level.has_progress() {
                        line.push_str(&format!("  {}%", goal.progress));
                    }
                    if let Some((hp, max)) = engine.boss_hp(level, &goal.id) {
                        line.push_str(&format!("  boss {hp}/{max}"));
                    }
                    println!("{line}");
                }
            }
        }
        GoalAction::Show { level, id } => {
            let goal = engine
                .goal(level, &id)
                .ok_or_else(|| format!("goal not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(goal)?);
        }
        GoalAction::Toggle { level, id } => {
            let completed = engine.toggle_completion(level, &id)?;
            println!("{}", if completed { "completed" } else { "reopened" });
        }
        GoalAction::ChecklistAdd { level, id, text } => {
            let item_id = engine.add_checklist_item(level, &id, &text)?;
            println!("Checklist item created: {item_id}");
        }
        GoalAction::ChecklistToggle { level, id, item_id } => {
            let checked = engine.toggle_checklist_item(level, &id, &item_id)?;
            println!("{}", if checked { "checked" } else { "unchecked" });
        }
        GoalAction::Link {
            level,
            id,
            parent_id,
        } => {
            if !engine.add_link(level, &id, &parent_id)? {
                println!("already linked");
            }
        }
        GoalAction::Unlink {
            level,
            id,
            parent_id,
        } => engine.remove_link(level, &id, &parent_id)?,
        GoalAction::Archive { level, id } => engine.archive_goal(level, &id)?,
        GoalAction::Boss { level, id } => {
            let hp = engine.activate_boss(level, &id)?;
            println!("Boss activated with {hp} HP");
        }
    }

    finish(engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!(parse_priority("High"), Ok(Priority::High));
        assert!(parse_priority("urgent").is_err());
    }
}
