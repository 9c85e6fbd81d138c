//! Integration tests for the completion pipeline, effects and rollover.
//!
//! Every test drives a `QuestEngine` over an in-memory store with a manual
//! clock, the way the CLI drives it over SQLite.

use chrono::{DateTime, Duration, TimeZone, Utc};
use questforge_core::{
    BonusType, Companion, CompanionKind, Config, EffectId, Event, GameState, GoalLevel,
    ManualClock, MemoryStore, NewGoal, Progression, QuestEngine, Rarity,
};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 12, 9, 0, 0).unwrap()
}

fn engine(state: GameState) -> (QuestEngine, ManualClock) {
    let mut config = Config::default();
    config.engine.rng_seed = Some(1234);
    let clock = ManualClock::new(start());
    let engine = QuestEngine::new(
        state,
        config,
        Box::new(clock.clone()),
        Box::new(MemoryStore::new()),
    );
    (engine, clock)
}

#[test]
fn test_levelling_crosses_three_thresholds() {
    let mut progression = Progression::default();
    assert_eq!(progression.add_xp(2600), 3);
    assert_eq!(progression.level, 4);
    assert_eq!(progression.xp_into_level(), 200);
    assert_eq!(progression.xp_to_next_level(), 1200);
}

#[test]
fn test_time_freeze_beats_streak_shield() {
    let mut state = GameState::default();
    state.progression.level = 5;
    state.inventory.grant(EffectId::TimeFreeze, 1);
    state.inventory.grant(EffectId::StreakShield, 1);
    let (mut engine, clock) = engine(state);

    engine.run_rollover();
    let habit = engine
        .add_goal(GoalLevel::Habit, NewGoal::titled("Meditate"))
        .unwrap();
    engine.toggle_completion(GoalLevel::Habit, &habit).unwrap();

    // Skip the next day entirely, casting both protections on it.
    clock.advance(Duration::days(1));
    engine.run_rollover();
    engine.cast_effect(EffectId::TimeFreeze).unwrap();
    engine.cast_effect(EffectId::StreakShield).unwrap();

    clock.advance(Duration::hours(23));
    let report = engine.run_rollover();
    assert_eq!(report.consumed, vec![EffectId::TimeFreeze]);

    let streak = engine
        .goal(GoalLevel::Habit, &habit)
        .and_then(|g| g.habit.as_ref())
        .map(|h| h.streak);
    assert_eq!(streak, Some(1));

    let now = engine.now();
    assert!(!engine.state().effects.is_active(EffectId::TimeFreeze, now));
    assert!(engine.state().effects.is_active(EffectId::StreakShield, now));
}

#[test]
fn test_unprotected_skip_resets_streak() {
    let (mut engine, clock) = engine(GameState::default());
    engine.run_rollover();
    let habit = engine
        .add_goal(GoalLevel::Habit, NewGoal::titled("Stretch"))
        .unwrap();
    engine.toggle_completion(GoalLevel::Habit, &habit).unwrap();

    clock.advance(Duration::days(3));
    engine.run_rollover();
    let habit = engine.goal(GoalLevel::Habit, &habit).unwrap();
    let state = habit.habit.as_ref().unwrap();
    assert_eq!(state.streak, 0);
    assert_eq!(state.best_streak, 1);
    assert!(!habit.completed);
}

#[test]
fn test_quest_doubler_applies_to_the_next_reward_only() {
    let mut state = GameState::default();
    state.progression.level = 3;
    state.inventory.grant(EffectId::QuestDoubler, 1);
    let (mut engine, _) = engine(state);
    let first = engine
        .add_goal(GoalLevel::SideQuest, NewGoal::titled("Clean garage"))
        .unwrap();
    let second = engine
        .add_goal(GoalLevel::SideQuest, NewGoal::titled("Sort mail"))
        .unwrap();

    engine.cast_effect(EffectId::QuestDoubler).unwrap();
    engine.toggle_completion(GoalLevel::SideQuest, &first).unwrap();
    // XP doubled; the doubler is gone before Gold is computed.
    assert_eq!(engine.state().progression.xp, 80);
    assert_eq!(engine.state().progression.gold, 8);

    engine.toggle_completion(GoalLevel::SideQuest, &second).unwrap();
    assert_eq!(engine.state().progression.xp, 120);
}

#[test]
fn test_critical_strike_yields_one_of_two_values() {
    let mut state = GameState::default();
    state.progression.level = 5;
    state.inventory.grant(EffectId::CriticalStrike, 1);
    let (mut engine, _) = engine(state);

    let yearly = engine
        .add_goal(GoalLevel::Yearly, NewGoal::titled("Climb"))
        .unwrap();
    let mut dailies = Vec::new();
    for name in ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug"] {
        let m = engine
            .add_goal(GoalLevel::Monthly, NewGoal::titled(name).with_parent(&yearly))
            .unwrap();
        let w = engine
            .add_goal(GoalLevel::Weekly, NewGoal::titled(name).with_parent(&m))
            .unwrap();
        dailies.push(
            engine
                .add_goal(GoalLevel::Daily, NewGoal::titled(name).with_parent(&w))
                .unwrap(),
        );
    }
    engine.activate_boss(GoalLevel::Yearly, &yearly).unwrap();
    engine.cast_effect(EffectId::CriticalStrike).unwrap();
    engine.drain_events();

    for daily in dailies.iter().take(4) {
        engine.toggle_completion(GoalLevel::Daily, daily).unwrap();
    }
    let hits: Vec<u64> = engine
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            Event::BossDamaged { damage, critical, .. } => {
                assert_eq!(damage, if critical { 150 } else { 100 });
                Some(damage)
            }
            _ => None,
        })
        .collect();
    assert_eq!(hits.len(), 4);

    let (hp, max) = engine.boss_hp(GoalLevel::Yearly, &yearly).unwrap();
    assert_eq!(max, 800);
    assert_eq!(hp, 800 - hits.iter().sum::<u64>());
}

#[test]
fn test_new_week_archives_completed_weekly_goals() {
    let (mut engine, clock) = engine(GameState::default());
    engine.run_rollover();
    let weekly = engine
        .add_goal(GoalLevel::Weekly, NewGoal::titled("Review"))
        .unwrap();
    let daily = engine
        .add_goal(GoalLevel::Daily, NewGoal::titled("Notes").with_parent(&weekly))
        .unwrap();
    engine.toggle_completion(GoalLevel::Daily, &daily).unwrap();
    assert!(engine.goal(GoalLevel::Weekly, &weekly).unwrap().completed);

    // Monday the 12th to Monday the 19th.
    clock.advance(Duration::days(7));
    let report = engine.run_rollover();
    assert!(report.new_week);
    assert_eq!(report.archived_weekly, vec![weekly.clone()]);
    assert!(engine.goal(GoalLevel::Weekly, &weekly).is_none());
}

#[test]
fn test_login_streak_counts_consecutive_days() {
    let (mut engine, clock) = engine(GameState::default());
    engine.run_rollover();
    clock.advance(Duration::days(1));
    engine.run_rollover();
    assert_eq!(engine.state().progression.login_streak, 2);

    clock.advance(Duration::days(2));
    engine.run_rollover();
    assert_eq!(engine.state().progression.login_streak, 1);
}

#[test]
fn test_active_companion_boosts_matching_reward() {
    let (mut engine, _) = engine(GameState::default());
    let owl = engine.add_companion(Companion::new(
        "Hoot",
        CompanionKind::Owl,
        Rarity::Legendary,
        BonusType::Xp,
        0.5,
    ));
    let quest = engine
        .add_goal(GoalLevel::SideQuest, NewGoal::titled("Paint fence"))
        .unwrap();

    engine.activate_companion(&owl).unwrap();
    engine.toggle_completion(GoalLevel::SideQuest, &quest).unwrap();
    assert_eq!(engine.state().progression.xp, 60);
    assert_eq!(engine.state().progression.gold, 8);

    assert!(engine.activate_companion("missing").is_err());
    engine.deactivate_companion();
    assert!(engine.state().companions.active().is_none());
}
