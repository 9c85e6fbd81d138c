//! Bottom-up progress propagation.
//!
//! Progress is recomputed for the whole graph after every completion-affecting
//! mutation. A goal's progress is the rounded share of its directly linked
//! children that are completed. Reaching 100% completes the goal, and because
//! levels are visited Weekly first, the completion is already visible when the
//! next level up is computed.
//!
//! Un-completing a child lowers progress but never clears a parent's
//! `completed` flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::goal::{GoalGraph, GoalLevel};

/// A goal that reached 100% during a recompute pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub level: GoalLevel,
    pub id: String,
}

/// What a recompute pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Goals whose progress value changed.
    pub progress_changed: usize,
    /// Goals newly completed by the pass, lowest level first.
    pub completed: Vec<Completion>,
}

impl PropagationReport {
    pub fn is_noop(&self) -> bool {
        self.progress_changed == 0 && self.completed.is_empty()
    }
}

/// `round(100 * completed / total)`, 0 with no children.
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (100.0 * completed as f64 / total as f64).round() as u8
}

/// Recompute progress and cascade completions across every level.
pub fn recompute_all(graph: &mut GoalGraph, now: DateTime<Utc>) -> PropagationReport {
    let mut report = PropagationReport::default();

    for level in GoalLevel::PROPAGATION_ORDER {
        let updates: Vec<(usize, u8)> = graph
            .collection(level)
            .iter()
            .enumerate()
            .map(|(index, goal)| {
                let (done, total) = graph
                    .children_of(level, &goal.id)
                    .fold((0, 0), |(done, total), child| {
                        (done + usize::from(child.completed), total + 1)
                    });
                (index, progress_percent(done, total))
            })
            .collect();

        let goals = graph.collection_mut(level);
        for (index, progress) in updates {
            let goal = &mut goals[index];
            if goal.progress != progress {
                goal.progress = progress;
                report.progress_changed += 1;
            }
            if progress == 100 && !goal.completed {
                goal.completed = true;
                goal.completed_at = Some(now);
                report.completed.push(Completion {
                    level,
                    id: goal.id.clone(),
                });
            }
        }
    }

    if !report.is_noop() {
        tracing::debug!(
            progress_changed = report.progress_changed,
            completed = report.completed.len(),
            "recomputed goal progress"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::NewGoal;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap()
    }

    fn weekly_with_tasks(count: usize) -> (GoalGraph, String, Vec<String>) {
        let mut graph = GoalGraph::new();
        let weekly = graph.insert(GoalLevel::Weekly, NewGoal::titled("week"), now()).unwrap();
        let tasks = (0..count)
            .map(|i| {
                graph
                    .insert(
                        GoalLevel::Daily,
                        NewGoal::titled(format!("task {i}")).with_parent(&weekly),
                        now(),
                    )
                    .unwrap()
            })
            .collect();
        (graph, weekly, tasks)
    }

    #[test]
    fn progress_is_rounded_share_of_children() {
        let (mut graph, weekly, tasks) = weekly_with_tasks(3);
        graph.get_mut(GoalLevel::Daily, &tasks[0]).unwrap().completed = true;
        recompute_all(&mut graph, now());
        assert_eq!(graph.get(GoalLevel::Weekly, &weekly).unwrap().progress, 33);

        graph.get_mut(GoalLevel::Daily, &tasks[1]).unwrap().completed = true;
        recompute_all(&mut graph, now());
        assert_eq!(graph.get(GoalLevel::Weekly, &weekly).unwrap().progress, 67);
    }

    #[test]
    fn childless_goal_stays_at_zero() {
        let (mut graph, weekly, _) = weekly_with_tasks(0);
        let report = recompute_all(&mut graph, now());
        assert!(report.is_noop());
        let goal = graph.get(GoalLevel::Weekly, &weekly).unwrap();
        assert_eq!(goal.progress, 0);
        assert!(!goal.completed);
    }

    #[test]
    fn completion_cascades_to_the_top_in_one_pass() {
        let mut graph = GoalGraph::new();
        let life = graph.insert(GoalLevel::Life, NewGoal::titled("life"), now()).unwrap();
        let yearly = graph
            .insert(GoalLevel::Yearly, NewGoal::titled("year").with_parent(&life), now())
            .unwrap();
        let monthly = graph
            .insert(GoalLevel::Monthly, NewGoal::titled("month").with_parent(&yearly), now())
            .unwrap();
        let weekly = graph
            .insert(GoalLevel::Weekly, NewGoal::titled("week").with_parent(&monthly), now())
            .unwrap();
        let task = graph
            .insert(GoalLevel::Daily, NewGoal::titled("task").with_parent(&weekly), now())
            .unwrap();
        graph.get_mut(GoalLevel::Daily, &task).unwrap().completed = true;

        let report = recompute_all(&mut graph, now());
        let levels: Vec<_> = report.completed.iter().map(|c| c.level).collect();
        assert_eq!(
            levels,
            vec![GoalLevel::Weekly, GoalLevel::Monthly, GoalLevel::Yearly, GoalLevel::Life]
        );
        assert!(graph.get(GoalLevel::Life, &life).unwrap().completed);
    }

    #[test]
    fn uncompleting_a_child_keeps_parent_completed() {
        let (mut graph, weekly, tasks) = weekly_with_tasks(2);
        for id in &tasks {
            graph.get_mut(GoalLevel::Daily, id).unwrap().completed = true;
        }
        recompute_all(&mut graph, now());
        graph.get_mut(GoalLevel::Daily, &tasks[0]).unwrap().completed = false;
        recompute_all(&mut graph, now());

        let goal = graph.get(GoalLevel::Weekly, &weekly).unwrap();
        assert_eq!(goal.progress, 50);
        assert!(goal.completed);
    }

    #[test]
    fn shared_child_advances_every_parent() {
        let (mut graph, first, tasks) = weekly_with_tasks(1);
        let second = graph.insert(GoalLevel::Weekly, NewGoal::titled("other"), now()).unwrap();
        graph.link(GoalLevel::Daily, &tasks[0], &second).unwrap();
        graph.get_mut(GoalLevel::Daily, &tasks[0]).unwrap().completed = true;

        let report = recompute_all(&mut graph, now());
        assert_eq!(report.completed.len(), 2);
        assert!(graph.get(GoalLevel::Weekly, &first).unwrap().completed);
        assert!(graph.get(GoalLevel::Weekly, &second).unwrap().completed);
    }

    proptest! {
        #[test]
        fn progress_matches_formula_and_is_idempotent(
            done in proptest::collection::vec(any::<bool>(), 0..40)
        ) {
            let (mut graph, weekly, tasks) = weekly_with_tasks(done.len());
            for (id, flag) in tasks.iter().zip(&done) {
                graph.get_mut(GoalLevel::Daily, id).unwrap().completed = *flag;
            }
            recompute_all(&mut graph, now());
            let first = graph.get(GoalLevel::Weekly, &weekly).unwrap().clone();

            let k = done.iter().filter(|d| **d).count();
            let expected = if done.is_empty() {
                0
            } else {
                (100.0 * k as f64 / done.len() as f64).round() as u8
            };
            prop_assert_eq!(first.progress, expected);

            let second_pass = recompute_all(&mut graph, now());
            prop_assert!(second_pass.is_noop());
            let second = graph.get(GoalLevel::Weekly, &weekly).unwrap();
            prop_assert_eq!(second.progress, first.progress);
            prop_assert_eq!(second.completed, first.completed);
        }
    }
}
