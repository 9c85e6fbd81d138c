use chrono::{DateTime, NaiveDate, Utc};

use super::RecurringTask;
use crate::goal::{Goal, GoalGraph, RecurringOrigin};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Ids of the daily tasks created, in definition order.
    pub created: Vec<String>,
    /// Definitions that matched today but already had their task.
    pub already_present: usize,
}

/// Create today's daily tasks for every active definition whose rule fires.
///
/// Safe to call repeatedly on the same day: a definition is skipped when its
/// `last_generated` stamp is today or a task with the same title, date and
/// origin already exists.
pub fn materialize(
    graph: &mut GoalGraph,
    definitions: &mut [RecurringTask],
    today: NaiveDate,
    now: DateTime<Utc>,
) -> MaterializeReport {
    let mut report = MaterializeReport::default();

    for definition in definitions.iter_mut().filter(|d| d.active) {
        if !definition.rule.fires_on(today) {
            continue;
        }
        if definition.last_generated == Some(today)
            || graph.has_materialized(&definition.id, &definition.title, today)
        {
            definition.last_generated = Some(today);
            report.already_present += 1;
            continue;
        }

        let mut task = Goal::new(definition.title.clone(), now);
        task.description = definition.description.clone();
        task.origin = Some(RecurringOrigin {
            definition_id: definition.id.clone(),
            scheduled_for: today,
        });
        report.created.push(task.id.clone());
        graph.daily.push(task);

        definition.last_generated = Some(today);
        definition.rule.mark_fired(today);
    }

    if !report.created.is_empty() {
        tracing::debug!(created = report.created.len(), %today, "materialized recurring tasks");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::RecurrenceRule;
    use chrono::{TimeZone, Weekday};

    fn friday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 6, 0, 0).unwrap()
    }

    fn weekly(days: Vec<Weekday>) -> RecurringTask {
        RecurringTask::new("Stretch", RecurrenceRule::Weekly { days }).unwrap()
    }

    #[test]
    fn twice_on_the_same_day_creates_one_task() {
        let mut graph = GoalGraph::new();
        let mut defs = vec![weekly(vec![Weekday::Fri])];

        let first = materialize(&mut graph, &mut defs, friday(), now());
        let second = materialize(&mut graph, &mut defs, friday(), now());
        assert_eq!(first.created.len(), 1);
        assert!(second.created.is_empty());
        assert_eq!(second.already_present, 1);
        assert_eq!(graph.daily.len(), 1);

        let origin = graph.daily[0].origin.as_ref().unwrap();
        assert_eq!(origin.definition_id, defs[0].id);
        assert_eq!(origin.scheduled_for, friday());
    }

    #[test]
    fn restart_without_stamp_still_finds_existing_task() {
        let mut graph = GoalGraph::new();
        let mut defs = vec![weekly(vec![Weekday::Fri])];
        materialize(&mut graph, &mut defs, friday(), now());

        // Simulate a crash between creating the task and persisting the stamp.
        defs[0].last_generated = None;
        let again = materialize(&mut graph, &mut defs, friday(), now());
        assert!(again.created.is_empty());
        assert_eq!(graph.daily.len(), 1);
        assert_eq!(defs[0].last_generated, Some(friday()));
    }

    #[test]
    fn inactive_and_non_matching_definitions_are_skipped() {
        let mut graph = GoalGraph::new();
        let mut inactive = weekly(vec![Weekday::Fri]);
        inactive.active = false;
        let mut defs = vec![inactive, weekly(vec![Weekday::Sat])];
        let report = materialize(&mut graph, &mut defs, friday(), now());
        assert!(report.created.is_empty());
        assert!(graph.daily.is_empty());
    }

    #[test]
    fn biweekly_rule_records_its_own_fire() {
        let mut graph = GoalGraph::new();
        let mut defs = vec![RecurringTask::new(
            "Payroll",
            RecurrenceRule::Biweekly {
                day: Weekday::Fri,
                last_fired: None,
            },
        )
        .unwrap()];
        materialize(&mut graph, &mut defs, friday(), now());
        assert_eq!(
            defs[0].rule,
            RecurrenceRule::Biweekly {
                day: Weekday::Fri,
                last_fired: Some(friday()),
            }
        );
        let next_friday = friday() + chrono::Duration::days(7);
        let report = materialize(&mut graph, &mut defs, next_friday, now());
        assert!(report.created.is_empty());
    }
}
