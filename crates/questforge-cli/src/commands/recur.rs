use chrono::Weekday;
use clap::{Subcommand, ValueEnum};
use questforge_core::{MonthWeek, RecurrenceRule};

use super::{finish, open_engine, CliResult};

#[derive(Clone, Copy, ValueEnum)]
pub enum RuleKind {
    Weekly,
    Biweekly,
    MonthlyDate,
    MonthlyWeekday,
}

#[derive(Subcommand)]
pub enum RecurAction {
    /// Define a recurring daily task
    Add {
        title: String,
        #[arg(long, value_enum)]
        rule: RuleKind,
        /// Weekdays, comma separated (e.g. "mon,thu")
        #[arg(long, value_delimiter = ',')]
        days: Vec<Weekday>,
        /// Day of month, 1 to 28
        #[arg(long)]
        date: Option<u32>,
        /// Week of month: 1 to 4, or -1 for the last
        #[arg(long, allow_negative_numbers = true)]
        week: Option<i8>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List definitions
    List,
    /// Create today's tasks
    Materialize,
}

fn build_rule(
    kind: RuleKind,
    days: Vec<Weekday>,
    date: Option<u32>,
    week: Option<i8>,
) -> Result<RecurrenceRule, Box<dyn std::error::Error>> {
    let single_day = |days: &[Weekday]| match days {
        [day] => Ok(*day),
        _ => Err("exactly one --days value is required"),
    };
    let rule = match kind {
        RuleKind::Weekly => RecurrenceRule::Weekly { days },
        RuleKind::Biweekly => RecurrenceRule::Biweekly {
            day: single_day(days.as_slice())?,
            last_fired: None,
        },
        RuleKind::MonthlyDate => RecurrenceRule::MonthlyDate {
            day: date.ok_or("--date is required")?,
        },
        RuleKind::MonthlyWeekday => RecurrenceRule::MonthlyWeekday {
            week: MonthWeek::from_index(week.ok_or("--week is required")?)?,
            day: single_day(days.as_slice())?,
        },
    };
    Ok(rule)
}

pub fn run(action: RecurAction) -> CliResult {
    let mut engine = open_engine()?;

    match action {
        RecurAction::Add {
            title,
            rule,
            days,
            date,
            week,
            description,
        } => {
            let rule = build_rule(rule, days, date, week)?;
            let id = engine.add_recurring(&title, description, rule)?;
            println!("Recurring task created: {id}");
            let report = engine.materialize_today();
            if !report.created.is_empty() {
                println!("Created {} task(s) for today", report.created.len());
            }
        }
        RecurAction::List => {
            println!("{}", serde_json::to_string_pretty(&engine.state().recurring)?);
        }
        RecurAction::Materialize => {
            let report = engine.materialize_today();
            println!("Created {} task(s) for today", report.created.len());
        }
    }

    finish(engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monthly_weekday_needs_a_single_day() {
        let rule = build_rule(RuleKind::MonthlyWeekday, vec![Weekday::Tue], None, Some(-1)).unwrap();
        assert_eq!(
            rule,
            RecurrenceRule::MonthlyWeekday {
                week: MonthWeek::Last,
                day: Weekday::Tue,
            }
        );
        assert!(build_rule(RuleKind::Biweekly, vec![], None, None).is_err());
        assert!(build_rule(RuleKind::MonthlyDate, vec![], None, None).is_err());
    }
}
