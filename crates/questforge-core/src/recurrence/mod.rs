//! Recurring task definitions and the calendar rules that fire them.

mod rollover;
mod scheduler;

pub use rollover::{rollover, HabitOutcome, RolloverReport, StreakGuard};
pub use scheduler::{materialize, MaterializeReport};

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Minimum spacing between two biweekly fires.
pub const BIWEEKLY_MIN_GAP_DAYS: i64 = 13;

/// Which occurrence of a weekday within the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthWeek {
    First,
    Second,
    Third,
    Fourth,
    Last,
}

impl MonthWeek {
    pub fn from_index(index: i8) -> Result<Self, ValidationError> {
        match index {
            1 => Ok(MonthWeek::First),
            2 => Ok(MonthWeek::Second),
            3 => Ok(MonthWeek::Third),
            4 => Ok(MonthWeek::Fourth),
            -1 => Ok(MonthWeek::Last),
            other => Err(ValidationError::InvalidValue {
                field: "week".into(),
                message: format!("{other} is not one of 1..=4 or -1"),
            }),
        }
    }

    fn matches(self, date: NaiveDate) -> bool {
        let dom = date.day();
        match self {
            MonthWeek::First => (dom + 6) / 7 == 1,
            MonthWeek::Second => (dom + 6) / 7 == 2,
            MonthWeek::Third => (dom + 6) / 7 == 3,
            MonthWeek::Fourth => (dom + 6) / 7 == 4,
            MonthWeek::Last => (date + Duration::days(7)).month() != date.month(),
        }
    }
}

/// When a definition produces a daily task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecurrenceRule {
    Weekly {
        days: Vec<Weekday>,
    },
    Biweekly {
        day: Weekday,
        /// The rule's own last fire, independent of the definition stamp.
        #[serde(default)]
        last_fired: Option<NaiveDate>,
    },
    MonthlyDate {
        day: u32,
    },
    MonthlyWeekday {
        week: MonthWeek,
        day: Weekday,
    },
}

impl RecurrenceRule {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            RecurrenceRule::Weekly { days } if days.is_empty() => Err(ValidationError::Empty("days".into())),
            RecurrenceRule::MonthlyDate { day } if !(1..=28).contains(day) => {
                Err(ValidationError::InvalidValue {
                    field: "day".into(),
                    message: format!("{day} is outside 1..=28"),
                })
            }
            _ => Ok(()),
        }
    }

    /// Whether the rule fires on `date`.
    pub fn fires_on(&self, date: NaiveDate) -> bool {
        match self {
            RecurrenceRule::Weekly { days } => days.contains(&date.weekday()),
            RecurrenceRule::Biweekly { day, last_fired } => {
                date.weekday() == *day
                    && last_fired.map_or(true, |last| (date - last).num_days() >= BIWEEKLY_MIN_GAP_DAYS)
            }
            RecurrenceRule::MonthlyDate { day } => date.day() == *day,
            RecurrenceRule::MonthlyWeekday { week, day } => date.weekday() == *day && week.matches(date),
        }
    }

    /// Record that the rule fired on `date`.
    pub fn mark_fired(&mut self, date: NaiveDate) {
        if let RecurrenceRule::Biweekly { last_fired, .. } = self {
            *last_fired = Some(date);
        }
    }
}

/// A template that instantiates daily tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    pub rule: RecurrenceRule,
    #[serde(default)]
    pub last_generated: Option<NaiveDate>,
}

fn default_true() -> bool {
    true
}

impl RecurringTask {
    pub fn new(title: impl Into<String>, rule: RecurrenceRule) -> Result<Self, ValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ValidationError::Empty("title".into()));
        }
        rule.validate()?;
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            description: None,
            active: true,
            rule,
            last_generated: None,
        })
    }
}
