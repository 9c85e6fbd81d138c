//! Goal types: the five hierarchical quest levels and the flat leaves.
//!
//! ```text
//! Life <- Yearly <- Monthly <- Weekly <- Daily      (many-to-many parent links)
//! SideQuest, Habit                                   (no parents)
//! ```

mod graph;

pub use graph::{ArchiveReason, ArchivedGoal, GoalGraph, NewGoal};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::boss::BossRecord;

/// Level of a goal in the quest hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalLevel {
    Life,
    Yearly,
    Monthly,
    Weekly,
    Daily,
    SideQuest,
    Habit,
}

impl GoalLevel {
    pub const ALL: [GoalLevel; 7] = [
        GoalLevel::Life,
        GoalLevel::Yearly,
        GoalLevel::Monthly,
        GoalLevel::Weekly,
        GoalLevel::Daily,
        GoalLevel::SideQuest,
        GoalLevel::Habit,
    ];

    /// Levels that carry a derived progress value, in propagation order.
    pub const PROPAGATION_ORDER: [GoalLevel; 4] = [
        GoalLevel::Weekly,
        GoalLevel::Monthly,
        GoalLevel::Yearly,
        GoalLevel::Life,
    ];

    /// The level a goal of this level links up to.
    pub fn parent_level(self) -> Option<GoalLevel> {
        match self {
            GoalLevel::Yearly => Some(GoalLevel::Life),
            GoalLevel::Monthly => Some(GoalLevel::Yearly),
            GoalLevel::Weekly => Some(GoalLevel::Monthly),
            GoalLevel::Daily => Some(GoalLevel::Weekly),
            GoalLevel::Life | GoalLevel::SideQuest | GoalLevel::Habit => None,
        }
    }

    /// The level whose goals count towards this level's progress.
    pub fn child_level(self) -> Option<GoalLevel> {
        match self {
            GoalLevel::Life => Some(GoalLevel::Yearly),
            GoalLevel::Yearly => Some(GoalLevel::Monthly),
            GoalLevel::Monthly => Some(GoalLevel::Weekly),
            GoalLevel::Weekly => Some(GoalLevel::Daily),
            GoalLevel::Daily | GoalLevel::SideQuest | GoalLevel::Habit => None,
        }
    }

    pub fn has_progress(self) -> bool {
        self.child_level().is_some()
    }

    pub fn allows_priority(self) -> bool {
        matches!(
            self,
            GoalLevel::Yearly | GoalLevel::Monthly | GoalLevel::Weekly
        )
    }

    pub fn can_be_boss(self) -> bool {
        matches!(self, GoalLevel::Life | GoalLevel::Yearly)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GoalLevel::Life => "life",
            GoalLevel::Yearly => "yearly",
            GoalLevel::Monthly => "monthly",
            GoalLevel::Weekly => "weekly",
            GoalLevel::Daily => "daily",
            GoalLevel::SideQuest => "side_quest",
            GoalLevel::Habit => "habit",
        }
    }
}

impl fmt::Display for GoalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GoalLevel {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GoalLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| crate::error::ValidationError::InvalidValue {
                field: "level".into(),
                message: format!("unknown level '{s}'"),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    /// Set once ticking the item has paid out.
    #[serde(default)]
    pub rewarded: bool,
}

/// Streak bookkeeping for habits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HabitState {
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub best_streak: u32,
    #[serde(default)]
    pub completed_today: bool,
    #[serde(default)]
    pub last_completed_on: Option<NaiveDate>,
}

impl HabitState {
    pub fn complete(&mut self, today: NaiveDate) {
        if self.completed_today {
            return;
        }
        self.completed_today = true;
        self.streak += 1;
        self.best_streak = self.best_streak.max(self.streak);
        self.last_completed_on = Some(today);
    }

    /// Undo today's completion.
    pub fn uncomplete(&mut self, today: NaiveDate) {
        if !self.completed_today {
            return;
        }
        self.completed_today = false;
        self.streak = self.streak.saturating_sub(1);
        self.last_completed_on = if self.streak > 0 { today.pred_opt() } else { None };
    }

    /// A live streak whose last completion is older than yesterday.
    pub fn streak_broken(&self, today: NaiveDate) -> bool {
        self.streak > 0
            && self
                .last_completed_on
                .map_or(false, |last| crate::clock::days_between(last, today) > 1)
    }
}

/// Back-reference from a scheduler-created daily task to its definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringOrigin {
    pub definition_id: String,
    pub scheduled_for: NaiveDate,
}

/// A quest at any level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Percentage of linked children completed; only meaningful above Daily.
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub parent_ids: BTreeSet<String>,
    /// Pre-multi-parent snapshots stored a single parent here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boss: Option<BossRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub habit: Option<HabitState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<RecurringOrigin>,
    /// Set once the first completion has paid out. Habits clear it daily.
    #[serde(default)]
    pub rewarded: bool,
}

impl Goal {
    pub fn new(title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: None,
            created_at,
            completed: false,
            completed_at: None,
            progress: 0,
            priority: None,
            checklist: Vec::new(),
            parent_ids: BTreeSet::new(),
            parent_id: None,
            boss: None,
            habit: None,
            origin: None,
            rewarded: false,
        }
    }

    /// Whether `parent_id` is one of this goal's parents, legacy field included.
    pub fn has_parent(&self, parent_id: &str) -> bool {
        self.parent_ids.contains(parent_id) || self.parent_id.as_deref() == Some(parent_id)
    }

    pub fn open_checklist_items(&self) -> usize {
        self.checklist.iter().filter(|item| !item.completed).count()
    }

    /// Fold the legacy single parent into the parent set.
    ///
    /// Returns true if anything changed.
    pub fn normalize_parents(&mut self) -> bool {
        match self.parent_id.take() {
            Some(legacy) if !legacy.is_empty() => {
                self.parent_ids.insert(legacy);
                true
            }
            Some(_) => true,
            None => false,
        }
    }
}
