//! Day and week rollover.
//!
//! On the first call of a new calendar day habits are reset for the day and
//! broken streaks are either protected or zeroed. Protection precedence:
//!
//! 1. Time Freeze cancels the whole reset and is consumed.
//! 2. Streak Shield protects every streak and stays active.
//! 3. The active companion's streak protection covers habits up to its weekly
//!    quota, one use per habit.
//! 4. Anything left is reset to zero.
//!
//! On the first call of a new ISO week completed weekly goals are archived.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::iso_week_key;
use crate::companion::CompanionRoster;
use crate::effects::{EffectId, EffectPools};
use crate::goal::{ArchiveReason, GoalGraph};
use crate::progression::Progression;

/// What saved a streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakGuard {
    TimeFreeze,
    StreakShield,
    Companion,
}

/// The fate of one broken streak.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitOutcome {
    pub habit_id: String,
    pub streak: u32,
    /// `None` means the streak was reset.
    pub guard: Option<StreakGuard>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolloverReport {
    pub new_day: bool,
    pub new_week: bool,
    pub habits_cleared: usize,
    pub streaks: Vec<HabitOutcome>,
    pub archived_weekly: Vec<String>,
    pub consumed: Vec<EffectId>,
}

impl RolloverReport {
    pub fn streaks_reset(&self) -> usize {
        self.streaks.iter().filter(|o| o.guard.is_none()).count()
    }
}

pub fn rollover(
    graph: &mut GoalGraph,
    effects: &mut EffectPools,
    companions: &mut CompanionRoster,
    progression: &mut Progression,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> RolloverReport {
    let mut report = RolloverReport::default();
    let week_key = iso_week_key(today);

    if progression.last_rollover_day != Some(today) {
        report.new_day = true;
        roll_day(graph, effects, companions, today, &week_key, now, &mut report);
        progression.record_login(today);
        progression.last_rollover_day = Some(today);
    }

    if progression.last_rollover_week.as_deref() != Some(week_key.as_str()) {
        report.new_week = true;
        report.archived_weekly =
            graph.archive_where(crate::goal::GoalLevel::Weekly, ArchiveReason::WeeklyRollover, now, |g| {
                g.completed
            });
        progression.last_rollover_week = Some(week_key);
    }

    if report.new_day || report.new_week {
        tracing::info!(
            %today,
            new_week = report.new_week,
            streaks_reset = report.streaks_reset(),
            archived = report.archived_weekly.len(),
            "rollover"
        );
    }
    report
}

fn roll_day(
    graph: &mut GoalGraph,
    effects: &mut EffectPools,
    companions: &mut CompanionRoster,
    today: NaiveDate,
    week_key: &str,
    now: DateTime<Utc>,
    report: &mut RolloverReport,
) {
    let broken: Vec<usize> = graph
        .habits
        .iter()
        .enumerate()
        .filter(|(_, g)| g.habit.as_ref().map_or(false, |h| h.streak_broken(today)))
        .map(|(index, _)| index)
        .collect();

    let blanket = if broken.is_empty() {
        None
    } else if effects.consume(EffectId::TimeFreeze, now) {
        report.consumed.push(EffectId::TimeFreeze);
        Some(StreakGuard::TimeFreeze)
    } else if effects.is_active(EffectId::StreakShield, now) {
        Some(StreakGuard::StreakShield)
    } else {
        None
    };

    for index in broken {
        let goal = &mut graph.habits[index];
        let Some(habit) = goal.habit.as_mut() else {
            continue;
        };
        let guard = blanket.or_else(|| {
            let companion = companions.active_mut()?;
            companion
                .use_protection(week_key)
                .then_some(StreakGuard::Companion)
        });
        match guard {
            // Bridge the gap so tomorrow does not see the same break.
            Some(_) => habit.last_completed_on = today.pred_opt(),
            None => habit.streak = 0,
        }
        report.streaks.push(HabitOutcome {
            habit_id: goal.id.clone(),
            streak: habit.streak,
            guard,
        });
    }

    for goal in &mut graph.habits {
        if let Some(habit) = goal.habit.as_mut() {
            if habit.completed_today {
                report.habits_cleared += 1;
            }
            habit.completed_today = false;
        }
        goal.completed = false;
        goal.completed_at = None;
        goal.rewarded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::companion::{BonusType, Companion, CompanionKind, Rarity};
    use crate::effects::ActiveEffect;
    use crate::goal::{GoalLevel, NewGoal};
    use chrono::TimeZone;

    struct World {
        graph: GoalGraph,
        effects: EffectPools,
        companions: CompanionRoster,
        progression: Progression,
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn at(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, d, 7, 0, 0).unwrap()
    }

    /// Two habits with 5-day streaks last completed on the 13th.
    fn world() -> World {
        let mut graph = GoalGraph::new();
        for title in ["Meditate", "Journal"] {
            let id = graph.insert(GoalLevel::Habit, NewGoal::titled(title), at(1)).unwrap();
            let habit = graph.get_mut(GoalLevel::Habit, &id).unwrap().habit.as_mut().unwrap();
            habit.streak = 5;
            habit.best_streak = 5;
            habit.last_completed_on = Some(day(13));
        }
        let mut progression = Progression::default();
        progression.last_rollover_day = Some(day(13));
        progression.last_rollover_week = Some(iso_week_key(day(13)));
        World {
            graph,
            effects: EffectPools::default(),
            companions: CompanionRoster::default(),
            progression,
        }
    }

    fn roll(w: &mut World, d: u32) -> RolloverReport {
        rollover(
            &mut w.graph,
            &mut w.effects,
            &mut w.companions,
            &mut w.progression,
            day(d),
            at(d),
        )
    }

    fn streaks(w: &World) -> Vec<u32> {
        w.graph.habits.iter().map(|g| g.habit.as_ref().unwrap().streak).collect()
    }

    #[test]
    fn unprotected_skip_resets_streaks() {
        let mut w = world();
        let report = roll(&mut w, 15);
        assert!(report.new_day);
        assert_eq!(report.streaks_reset(), 2);
        assert_eq!(streaks(&w), vec![0, 0]);
    }

    #[test]
    fn consecutive_day_keeps_streaks() {
        let mut w = world();
        let report = roll(&mut w, 14);
        assert!(report.streaks.is_empty());
        assert_eq!(streaks(&w), vec![5, 5]);
    }

    #[test]
    fn time_freeze_wins_over_streak_shield() {
        let mut w = world();
        w.effects.push(ActiveEffect::cast(EffectId::TimeFreeze, at(14)));
        w.effects.push(ActiveEffect::cast(EffectId::StreakShield, at(14)));

        let report = roll(&mut w, 15);
        assert_eq!(streaks(&w), vec![5, 5]);
        assert_eq!(report.consumed, vec![EffectId::TimeFreeze]);
        assert!(report
            .streaks
            .iter()
            .all(|o| o.guard == Some(StreakGuard::TimeFreeze)));
        assert!(!w.effects.is_active(EffectId::TimeFreeze, at(15)));
        assert!(w.effects.is_active(EffectId::StreakShield, at(15)));
    }

    #[test]
    fn streak_shield_is_not_consumed() {
        let mut w = world();
        w.effects.push(ActiveEffect::cast(EffectId::StreakShield, at(14)));
        let report = roll(&mut w, 15);
        assert_eq!(streaks(&w), vec![5, 5]);
        assert!(report.consumed.is_empty());
        assert!(w.effects.is_active(EffectId::StreakShield, at(15)));
    }

    #[test]
    fn companion_protects_up_to_its_quota() {
        let mut w = world();
        let id = w.companions.add(Companion::new(
            "Rocky",
            CompanionKind::Golem,
            Rarity::Rare,
            BonusType::StreakProtection,
            1.0,
        ));
        w.companions.activate(&id).unwrap();

        let report = roll(&mut w, 15);
        assert_eq!(streaks(&w), vec![5, 0]);
        assert_eq!(report.streaks[0].guard, Some(StreakGuard::Companion));
        assert_eq!(report.streaks[1].guard, None);
        assert_eq!(w.companions.active().unwrap().weekly_uses, 1);
    }

    #[test]
    fn rollover_runs_once_per_day() {
        let mut w = world();
        w.graph.habits[0].habit.as_mut().unwrap().completed_today = true;
        w.graph.habits[0].completed = true;
        let first = roll(&mut w, 14);
        assert_eq!(first.habits_cleared, 1);
        assert!(!w.graph.habits[0].completed);

        let second = roll(&mut w, 14);
        assert!(!second.new_day);
        assert!(!second.new_week);
        assert_eq!(w.progression.login_streak, 1);
    }

    #[test]
    fn new_iso_week_archives_completed_weekly_goals() {
        let mut w = world();
        let done = w
            .graph
            .insert(GoalLevel::Weekly, NewGoal::titled("Ship release"), at(13))
            .unwrap();
        w.graph.insert(GoalLevel::Weekly, NewGoal::titled("Still open"), at(13)).unwrap();
        w.graph.get_mut(GoalLevel::Weekly, &done).unwrap().completed = true;

        // The 16th is still in the same ISO week as the 13th.
        assert!(!roll(&mut w, 16).new_week);
        let report = roll(&mut w, 19);
        assert!(report.new_week);
        assert_eq!(report.archived_weekly, vec![done]);
        assert_eq!(w.graph.weekly.len(), 1);
    }
}
