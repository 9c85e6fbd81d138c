//! The goal collections and their parent links.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{ChecklistItem, Goal, GoalLevel, HabitState, Priority};
use crate::error::{Refusal, ValidationError};

/// Why a goal left the active collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveReason {
    Manual,
    WeeklyRollover,
    BulkArchive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedGoal {
    pub level: GoalLevel,
    pub goal: Goal,
    pub archived_at: DateTime<Utc>,
    pub reason: ArchiveReason,
}

/// Input for creating a goal.
#[derive(Debug, Clone, Default)]
pub struct NewGoal {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub parent_ids: Vec<String>,
    pub checklist: Vec<String>,
}

impl NewGoal {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_ids.push(parent_id.into());
        self
    }

    pub fn with_checklist_item(mut self, text: impl Into<String>) -> Self {
        self.checklist.push(text.into());
        self
    }
}

/// All goals, one collection per level, plus the archive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalGraph {
    #[serde(default)]
    pub life: Vec<Goal>,
    #[serde(default)]
    pub yearly: Vec<Goal>,
    #[serde(default)]
    pub monthly: Vec<Goal>,
    #[serde(default)]
    pub weekly: Vec<Goal>,
    #[serde(default)]
    pub daily: Vec<Goal>,
    #[serde(default)]
    pub side_quests: Vec<Goal>,
    #[serde(default)]
    pub habits: Vec<Goal>,
    #[serde(default)]
    pub archive: Vec<ArchivedGoal>,
}

impl GoalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn collection(&self, level: GoalLevel) -> &Vec<Goal> {
        match level {
            GoalLevel::Life => &self.life,
            GoalLevel::Yearly => &self.yearly,
            GoalLevel::Monthly => &self.monthly,
            GoalLevel::Weekly => &self.weekly,
            GoalLevel::Daily => &self.daily,
            GoalLevel::SideQuest => &self.side_quests,
            GoalLevel::Habit => &self.habits,
        }
    }

    pub fn collection_mut(&mut self, level: GoalLevel) -> &mut Vec<Goal> {
        match level {
            GoalLevel::Life => &mut self.life,
            GoalLevel::Yearly => &mut self.yearly,
            GoalLevel::Monthly => &mut self.monthly,
            GoalLevel::Weekly => &mut self.weekly,
            GoalLevel::Daily => &mut self.daily,
            GoalLevel::SideQuest => &mut self.side_quests,
            GoalLevel::Habit => &mut self.habits,
        }
    }

    pub fn get(&self, level: GoalLevel, id: &str) -> Option<&Goal> {
        self.collection(level).iter().find(|g| g.id == id)
    }

    pub fn get_mut(&mut self, level: GoalLevel, id: &str) -> Option<&mut Goal> {
        self.collection_mut(level).iter_mut().find(|g| g.id == id)
    }

    pub(crate) fn require(&self, level: GoalLevel, id: &str) -> Result<&Goal, Refusal> {
        self.get(level, id).ok_or_else(|| Refusal::GoalNotFound {
            level,
            id: id.to_string(),
        })
    }

    pub(crate) fn require_mut(&mut self, level: GoalLevel, id: &str) -> Result<&mut Goal, Refusal> {
        self.get_mut(level, id).ok_or_else(|| Refusal::GoalNotFound {
            level,
            id: id.to_string(),
        })
    }

    /// Goals one level down that list `parent_id` among their parents.
    pub fn children_of<'a>(
        &'a self,
        level: GoalLevel,
        parent_id: &'a str,
    ) -> impl Iterator<Item = &'a Goal> + 'a {
        level
            .child_level()
            .map(|child| self.collection(child).as_slice())
            .unwrap_or(&[])
            .iter()
            .filter(move |g| g.has_parent(parent_id))
    }

    pub fn total_goals(&self) -> usize {
        GoalLevel::ALL
            .iter()
            .map(|level| self.collection(*level).len())
            .sum()
    }

    /// Whether a scheduler-created task for this definition and date exists.
    pub fn has_materialized(&self, definition_id: &str, title: &str, date: NaiveDate) -> bool {
        self.daily.iter().any(|g| {
            g.title == title
                && g.origin
                    .as_ref()
                    .map_or(false, |o| o.definition_id == definition_id && o.scheduled_for == date)
        })
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Create a goal and return its id.
    pub fn insert(
        &mut self,
        level: GoalLevel,
        new: NewGoal,
        now: DateTime<Utc>,
    ) -> Result<String, Refusal> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(ValidationError::Empty("title".into()).into());
        }
        if new.priority.is_some() && !level.allows_priority() {
            return Err(ValidationError::InvalidValue {
                field: "priority".into(),
                message: format!("{level} goals have no priority"),
            }
            .into());
        }
        if !new.parent_ids.is_empty() {
            let parent_level = level.parent_level().ok_or(Refusal::NotLinkable { level })?;
            for parent_id in &new.parent_ids {
                self.require(parent_level, parent_id)?;
            }
        }

        let mut goal = Goal::new(title, now);
        goal.description = new.description.filter(|d| !d.trim().is_empty());
        goal.priority = new.priority;
        goal.parent_ids = new.parent_ids.into_iter().collect();
        goal.checklist = new
            .checklist
            .into_iter()
            .map(|text| ChecklistItem {
                id: uuid::Uuid::new_v4().to_string(),
                text,
                completed: false,
                rewarded: false,
            })
            .collect();
        if level == GoalLevel::Habit {
            goal.habit = Some(HabitState::default());
        }

        let id = goal.id.clone();
        self.collection_mut(level).push(goal);
        Ok(id)
    }

    /// Add `parent_id` to the child's parent set.
    ///
    /// Returns false if the link already existed.
    pub fn link(
        &mut self,
        child_level: GoalLevel,
        child_id: &str,
        parent_id: &str,
    ) -> Result<bool, Refusal> {
        let parent_level = child_level
            .parent_level()
            .ok_or(Refusal::NotLinkable { level: child_level })?;
        self.require(parent_level, parent_id)?;
        let child = self.require_mut(child_level, child_id)?;
        if child.has_parent(parent_id) {
            return Ok(false);
        }
        child.parent_ids.insert(parent_id.to_string());
        Ok(true)
    }

    pub fn unlink(
        &mut self,
        child_level: GoalLevel,
        child_id: &str,
        parent_id: &str,
    ) -> Result<(), Refusal> {
        if child_level.parent_level().is_none() {
            return Err(Refusal::NotLinkable { level: child_level });
        }
        let child = self.require_mut(child_level, child_id)?;
        if !child.has_parent(parent_id) {
            return Err(Refusal::NotLinked {
                child_id: child_id.to_string(),
                parent_id: parent_id.to_string(),
            });
        }
        child.parent_ids.remove(parent_id);
        if child.parent_id.as_deref() == Some(parent_id) {
            child.parent_id = None;
        }
        Ok(())
    }

    pub fn add_checklist_item(
        &mut self,
        level: GoalLevel,
        id: &str,
        text: &str,
    ) -> Result<String, Refusal> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::Empty("checklist item".into()).into());
        }
        let goal = self.require_mut(level, id)?;
        let item = ChecklistItem {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.to_string(),
            completed: false,
            rewarded: false,
        };
        let item_id = item.id.clone();
        goal.checklist.push(item);
        Ok(item_id)
    }

    /// Flip a checklist item, returning its new state.
    pub fn toggle_checklist_item(
        &mut self,
        level: GoalLevel,
        id: &str,
        item_id: &str,
    ) -> Result<bool, Refusal> {
        let goal = self.require_mut(level, id)?;
        let item = goal
            .checklist
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| Refusal::ChecklistItemNotFound {
                item_id: item_id.to_string(),
            })?;
        item.completed = !item.completed;
        Ok(item.completed)
    }

    pub fn archive(
        &mut self,
        level: GoalLevel,
        id: &str,
        reason: ArchiveReason,
        now: DateTime<Utc>,
    ) -> Result<(), Refusal> {
        let collection = self.collection_mut(level);
        let index = collection
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| Refusal::GoalNotFound {
                level,
                id: id.to_string(),
            })?;
        let goal = collection.remove(index);
        self.archive.push(ArchivedGoal {
            level,
            goal,
            archived_at: now,
            reason,
        });
        Ok(())
    }

    /// Archive every goal at `level` matching `pred`; returns the archived ids.
    pub fn archive_where(
        &mut self,
        level: GoalLevel,
        reason: ArchiveReason,
        now: DateTime<Utc>,
        pred: impl Fn(&Goal) -> bool,
    ) -> Vec<String> {
        let (moved, kept): (Vec<Goal>, Vec<Goal>) =
            std::mem::take(self.collection_mut(level))
                .into_iter()
                .partition(|g| pred(g));
        *self.collection_mut(level) = kept;
        let ids = moved.iter().map(|g| g.id.clone()).collect();
        self.archive.extend(moved.into_iter().map(|goal| ArchivedGoal {
            level,
            goal,
            archived_at: now,
            reason,
        }));
        ids
    }

    /// Fold every legacy single-parent field into the parent sets.
    pub fn normalize_legacy_parents(&mut self) -> usize {
        let mut changed = 0;
        for level in GoalLevel::ALL {
            for goal in self.collection_mut(level) {
                if goal.normalize_parents() {
                    changed += 1;
                }
            }
        }
        changed
    }
}
