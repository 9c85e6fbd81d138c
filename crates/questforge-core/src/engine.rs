//! The progression engine.
//!
//! [`QuestEngine`] owns the game state and is the only thing that mutates it.
//! Every exposed operation either runs to completion or returns a
//! [`Refusal`] without touching anything.
//!
//! ## Completion pipeline
//!
//! ```text
//! toggle ──> reward ──> damage boss parents ──> recompute progress
//!              ^                                      │
//!              └──────── cascaded completions ◄───────┘
//! ```
//!
//! Completions reported by a recompute pass are handled lowest level first,
//! so a child's boss damage lands before its parent's own completion is looked
//! at. A boss whose HP reaches zero is defeated by damage; a boss still
//! standing when all of its children are done is defeated by completion. The
//! defeat reward replaces the ordinary completion reward of that goal and is
//! paid exactly once.
//!
//! ## Persistence
//!
//! Mutations only mark the state dirty. [`QuestEngine::flush_if_due`] writes
//! the snapshot once the debounce window has passed and then hands the queued
//! events to the [`Notifier`].

use std::collections::{BTreeSet, VecDeque};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;

use crate::boss::{defeat_reward, BossRecord, DefeatCause};
use crate::clock::Clock;
use crate::companion::Companion;
use crate::effects::{ActiveEffect, EffectId, Lifetime};
use crate::error::{CoreError, Refusal, ValidationError};
use crate::events::{Event, NoopNotifier, Notifier};
use crate::focus::{FocusSession, FocusState};
use crate::goal::{ArchiveReason, Goal, GoalLevel, NewGoal};
use crate::progress::{recompute_all, Completion};
use crate::recurrence::{
    materialize, rollover, MaterializeReport, RecurrenceRule, RecurringTask, RolloverReport,
};
use crate::reward::{compute_boss_damage, compute_reward, ActionKind, RewardKind};
use crate::shop::{open_chest, ChestLoot, ChestTier};
use crate::state::GameState;
use crate::storage::{load_state, save_state, Config, Debouncer, LoadReport, StateStore};

/// Upper bound on the configured sweep interval.
const MAX_SWEEP_INTERVAL_SECS: u64 = 24 * 60 * 60;

fn sweep_interval(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs.min(MAX_SWEEP_INTERVAL_SECS)).unwrap_or(0))
}

pub struct QuestEngine {
    state: GameState,
    config: Config,
    clock: Box<dyn Clock>,
    rng: Mcg128Xsl64,
    store: Box<dyn StateStore>,
    notifier: Box<dyn Notifier>,
    debouncer: Debouncer,
    /// Everything emitted since the last `drain_events`.
    log: Vec<Event>,
    /// Everything emitted since the last successful flush.
    outbox: Vec<Event>,
    casting: bool,
    focus: Option<FocusSession>,
    last_sweep: Option<DateTime<Utc>>,
}

impl QuestEngine {
    pub fn new(
        state: GameState,
        config: Config,
        clock: Box<dyn Clock>,
        store: Box<dyn StateStore>,
    ) -> Self {
        let rng = match config.engine.rng_seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        let debouncer = Debouncer::from_millis(config.engine.debounce_ms);
        Self {
            state,
            config,
            clock,
            rng,
            store,
            notifier: Box::new(NoopNotifier),
            debouncer,
            log: Vec::new(),
            outbox: Vec::new(),
            casting: false,
            focus: None,
            last_sweep: None,
        }
    }

    /// Build an engine from whatever `store` holds.
    ///
    /// # Errors
    /// Returns an error only if the store itself cannot be read or the backup
    /// of an unreadable snapshot cannot be written.
    pub fn load(
        config: Config,
        clock: Box<dyn Clock>,
        mut store: Box<dyn StateStore>,
    ) -> Result<(Self, LoadReport), CoreError> {
        let now = clock.now();
        let (state, report) = load_state(&mut *store, now)?;
        let mut engine = Self::new(state, config, clock, store);
        if !report.is_clean() || report.legacy_parents_folded > 0 || report.level_repaired {
            engine.debouncer.mark_dirty(now);
        }
        Ok((engine, report))
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn goal(&self, level: GoalLevel, id: &str) -> Option<&Goal> {
        self.state.goals.get(level, id)
    }

    pub fn progress(&self, level: GoalLevel, id: &str) -> Option<u8> {
        self.goal(level, id).map(|g| g.progress)
    }

    /// `(current, max)` HP of a flagged goal.
    pub fn boss_hp(&self, level: GoalLevel, id: &str) -> Option<(u64, u64)> {
        let boss = self.goal(level, id)?.boss.as_ref()?;
        Some((boss.current_hp, boss.max_hp))
    }

    pub fn level(&self) -> u32 {
        self.state.progression.level
    }

    pub fn focus(&self) -> Option<&FocusSession> {
        self.focus.as_ref()
    }

    pub fn is_casting(&self) -> bool {
        self.casting
    }

    pub fn is_dirty(&self) -> bool {
        self.debouncer.is_dirty()
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.log)
    }

    // ── Goals ────────────────────────────────────────────────────────

    pub fn add_goal(&mut self, level: GoalLevel, new: NewGoal) -> Result<String, Refusal> {
        let now = self.clock.now();
        let parents: BTreeSet<String> = new.parent_ids.iter().cloned().collect();
        let id = self.state.goals.insert(level, new, now)?;
        self.emit(Event::GoalCreated {
            level,
            id: id.clone(),
            at: now,
        });
        if let Some(parent_level) = level.parent_level() {
            for parent_id in &parents {
                self.grow_boss(parent_level, parent_id);
            }
        }
        self.settle(Vec::new(), now);
        Ok(id)
    }

    /// Flip a goal's completion. Returns the new state.
    pub fn toggle_completion(&mut self, level: GoalLevel, id: &str) -> Result<bool, Refusal> {
        let now = self.clock.now();
        let today = self.clock.today();
        let goal = self.state.goals.require(level, id)?;

        if goal.completed {
            let goal = self.state.goals.require_mut(level, id)?;
            goal.completed = false;
            goal.completed_at = None;
            if let Some(habit) = goal.habit.as_mut() {
                habit.uncomplete(today);
            }
            self.emit(Event::GoalReopened {
                level,
                id: id.to_string(),
                at: now,
            });
            self.settle(Vec::new(), now);
            // A parent still at 100% is completed again by the recompute.
            return Ok(self.goal(level, id).is_some_and(|g| g.completed));
        }

        if level.has_progress() && goal.progress < 100 {
            return Err(Refusal::ProgressIncomplete {
                progress: goal.progress,
            });
        }
        let remaining = goal.open_checklist_items();
        if remaining > 0 {
            return Err(Refusal::ChecklistIncomplete { remaining });
        }

        let goal = self.state.goals.require_mut(level, id)?;
        goal.completed = true;
        goal.completed_at = Some(now);
        if let Some(habit) = goal.habit.as_mut() {
            habit.complete(today);
        }
        self.emit(Event::GoalCompleted {
            level,
            id: id.to_string(),
            cascaded: false,
            at: now,
        });
        self.settle(
            vec![Completion {
                level,
                id: id.to_string(),
            }],
            now,
        );
        Ok(true)
    }

    pub fn add_checklist_item(
        &mut self,
        level: GoalLevel,
        id: &str,
        text: &str,
    ) -> Result<String, Refusal> {
        let item_id = self.state.goals.add_checklist_item(level, id, text)?;
        self.touch();
        Ok(item_id)
    }

    /// Flip a checklist item. The first tick of each item pays out.
    pub fn toggle_checklist_item(
        &mut self,
        level: GoalLevel,
        id: &str,
        item_id: &str,
    ) -> Result<bool, Refusal> {
        let now = self.clock.now();
        let checked = self.state.goals.toggle_checklist_item(level, id, item_id)?;
        if checked {
            let first_time = self
                .state
                .goals
                .get_mut(level, id)
                .and_then(|g| g.checklist.iter_mut().find(|item| item.id == item_id))
                .is_some_and(|item| !std::mem::replace(&mut item.rewarded, true));
            if first_time {
                self.grant(ActionKind::ChecklistItem, 1, now);
            }
        }
        self.touch();
        Ok(checked)
    }

    /// Link a child to a parent one level up. Returns false if already linked.
    pub fn add_link(
        &mut self,
        child_level: GoalLevel,
        child_id: &str,
        parent_id: &str,
    ) -> Result<bool, Refusal> {
        let now = self.clock.now();
        let linked = self.state.goals.link(child_level, child_id, parent_id)?;
        if linked {
            if let Some(parent_level) = child_level.parent_level() {
                self.grow_boss(parent_level, parent_id);
            }
            self.settle(Vec::new(), now);
        }
        Ok(linked)
    }

    pub fn remove_link(
        &mut self,
        child_level: GoalLevel,
        child_id: &str,
        parent_id: &str,
    ) -> Result<(), Refusal> {
        let now = self.clock.now();
        self.state.goals.unlink(child_level, child_id, parent_id)?;
        self.settle(Vec::new(), now);
        Ok(())
    }

    pub fn archive_goal(&mut self, level: GoalLevel, id: &str) -> Result<(), Refusal> {
        let now = self.clock.now();
        self.state
            .goals
            .archive(level, id, ArchiveReason::Manual, now)?;
        self.emit(Event::GoalArchived {
            level,
            id: id.to_string(),
            reason: ArchiveReason::Manual,
            at: now,
        });
        self.settle(Vec::new(), now);
        Ok(())
    }

    /// Flag a Life or Yearly goal as a boss. Returns the starting pool.
    pub fn activate_boss(&mut self, level: GoalLevel, id: &str) -> Result<u64, Refusal> {
        if !level.can_be_boss() {
            return Err(Refusal::NotBossEligible { level });
        }
        let now = self.clock.now();
        let goal = self.state.goals.require(level, id)?;
        if let Some(boss) = &goal.boss {
            return Err(Refusal::BossState {
                id: id.to_string(),
                state: boss.status.as_str(),
            });
        }
        if goal.completed {
            return Err(Refusal::BossState {
                id: id.to_string(),
                state: "completed",
            });
        }

        let children = self.state.goals.children_of(level, id).count();
        if children == 0 {
            return Err(Refusal::NoChildren { id: id.to_string() });
        }
        let record = BossRecord::activate(children, now);
        let max_hp = record.max_hp;
        self.state.goals.require_mut(level, id)?.boss = Some(record);
        tracing::info!(%level, id, max_hp, "boss activated");
        self.emit(Event::BossActivated {
            level,
            id: id.to_string(),
            max_hp,
            at: now,
        });
        self.touch();
        Ok(max_hp)
    }

    // ── Effects ──────────────────────────────────────────────────────

    /// Spend a charge of `effect` and apply it.
    pub fn cast_effect(&mut self, effect: EffectId) -> Result<(), Refusal> {
        if self.casting {
            return Err(Refusal::CastInProgress);
        }
        let now = self.clock.now();
        let def = effect.definition();

        if self.state.progression.level < def.min_level {
            return Err(Refusal::LevelGated {
                effect,
                required: def.min_level,
            });
        }
        if self.state.inventory.charges(effect) == 0 {
            return Err(Refusal::NoCharges(effect));
        }
        if def.lifetime != Lifetime::Instant && self.state.effects.is_active(effect, now) {
            return Err(Refusal::AlreadyActive(effect));
        }
        let execute_target = match effect {
            EffectId::BulkArchive if !self.has_completed_goals() => {
                return Err(Refusal::NoTarget {
                    effect,
                    reason: "no completed goals".into(),
                });
            }
            EffectId::Execute => Some(self.execute_target().ok_or_else(|| Refusal::NoTarget {
                effect,
                reason: "no active boss at or below 25% HP".into(),
            })?),
            _ => None,
        };

        self.casting = true;
        self.state.inventory.spend(effect);
        self.emit(Event::EffectCast { effect, at: now });
        tracing::debug!(%effect, "effect cast");

        match (effect, execute_target) {
            (EffectId::BulkArchive, _) => self.bulk_archive(now),
            (EffectId::Execute, Some((level, id))) => {
                self.emit(Event::EffectConsumed { effect, at: now });
                let defeated = self
                    .state
                    .goals
                    .get_mut(level, &id)
                    .and_then(|g| g.boss.as_mut())
                    .is_some_and(|boss| boss.defeat(DefeatCause::Execute, now));
                let mut pending = Vec::new();
                if defeated && self.pay_boss_defeat(level, &id, DefeatCause::Execute, now) {
                    pending.push(Completion { level, id });
                }
                self.settle(pending, now);
            }
            _ => {
                self.state.effects.push(ActiveEffect::cast(effect, now));
                self.touch();
            }
        }
        self.casting = false;
        Ok(())
    }

    /// Drop expired timed effects.
    pub fn sweep_expired(&mut self) -> Vec<EffectId> {
        let now = self.clock.now();
        self.last_sweep = Some(now);
        let expired = self.state.effects.prune_expired(now);
        for effect in &expired {
            self.emit(Event::EffectExpired {
                effect: *effect,
                at: now,
            });
        }
        if !expired.is_empty() {
            tracing::debug!(count = expired.len(), "swept expired effects");
            self.touch();
        }
        expired
    }

    // ── Calendar ─────────────────────────────────────────────────────

    /// Create today's recurring tasks. Idempotent within a day.
    pub fn materialize_today(&mut self) -> MaterializeReport {
        let now = self.clock.now();
        let today = self.clock.today();
        let report = materialize(
            &mut self.state.goals,
            &mut self.state.recurring,
            today,
            now,
        );
        for goal_id in &report.created {
            let definition_id = self
                .state
                .goals
                .get(GoalLevel::Daily, goal_id)
                .and_then(|g| g.origin.as_ref())
                .map(|o| o.definition_id.clone())
                .unwrap_or_default();
            self.emit(Event::TaskMaterialized {
                definition_id,
                goal_id: goal_id.clone(),
                at: now,
            });
        }
        if !report.created.is_empty() || report.already_present > 0 {
            self.touch();
        }
        report
    }

    /// Run the day and week boundary work if a boundary was crossed.
    pub fn run_rollover(&mut self) -> RolloverReport {
        let now = self.clock.now();
        let today = self.clock.today();
        let report = rollover(
            &mut self.state.goals,
            &mut self.state.effects,
            &mut self.state.companions,
            &mut self.state.progression,
            today,
            now,
        );
        for outcome in &report.streaks {
            self.emit(match outcome.guard {
                Some(guard) => Event::StreakProtected {
                    habit_id: outcome.habit_id.clone(),
                    guard,
                    at: now,
                },
                None => Event::StreakReset {
                    habit_id: outcome.habit_id.clone(),
                    at: now,
                },
            });
        }
        for effect in &report.consumed {
            self.emit(Event::EffectConsumed {
                effect: *effect,
                at: now,
            });
        }
        for id in &report.archived_weekly {
            self.emit(Event::GoalArchived {
                level: GoalLevel::Weekly,
                id: id.clone(),
                reason: ArchiveReason::WeeklyRollover,
                at: now,
            });
        }
        if report.new_day || report.new_week {
            self.settle(Vec::new(), now);
        }
        report
    }

    pub fn add_recurring(
        &mut self,
        title: &str,
        description: Option<String>,
        rule: RecurrenceRule,
    ) -> Result<String, Refusal> {
        let mut task = RecurringTask::new(title, rule)?;
        task.description = description.filter(|d| !d.trim().is_empty());
        let id = task.id.clone();
        self.state.recurring.push(task);
        self.touch();
        Ok(id)
    }

    // ── Shop & companions ────────────────────────────────────────────

    pub fn purchase_chest(&mut self, tier: ChestTier) -> Result<ChestLoot, Refusal> {
        let now = self.clock.now();
        let cost = tier.cost();
        let available = self.state.progression.gold;
        if !self.state.progression.spend_gold(cost) {
            return Err(Refusal::InsufficientGold {
                needed: cost,
                available,
            });
        }

        let loot = open_chest(tier, &mut self.rng);
        for effect in &loot.effects {
            self.state.inventory.grant(*effect, 1);
        }
        let companion = loot
            .companion
            .clone()
            .map(|c| self.state.companions.add(c));
        self.state.progression.chests_opened += 1;
        self.emit(Event::ChestOpened {
            tier,
            loot: loot.effects.clone(),
            companion,
            at: now,
        });
        self.touch();
        Ok(loot)
    }

    pub fn add_companion(&mut self, companion: Companion) -> String {
        let id = self.state.companions.add(companion);
        self.touch();
        id
    }

    pub fn activate_companion(&mut self, id: &str) -> Result<(), Refusal> {
        self.state.companions.activate(id)?;
        self.touch();
        Ok(())
    }

    pub fn deactivate_companion(&mut self) {
        self.state.companions.deactivate();
        self.touch();
    }

    // ── Focus ────────────────────────────────────────────────────────

    /// Start a focus session; `None` uses the configured length.
    pub fn start_focus(&mut self, minutes: Option<u32>) -> Result<(), Refusal> {
        if self
            .focus
            .as_ref()
            .is_some_and(|s| matches!(s.state(), FocusState::Running | FocusState::Paused))
        {
            return Err(Refusal::FocusState("already in progress"));
        }
        let minutes = minutes.unwrap_or(self.config.focus.default_minutes);
        if minutes == 0 {
            return Err(ValidationError::InvalidValue {
                field: "minutes".into(),
                message: "must be at least 1".into(),
            }
            .into());
        }
        let mut session = FocusSession::new(minutes);
        session.start(self.clock.now())?;
        self.focus = Some(session);
        Ok(())
    }

    pub fn pause_focus(&mut self) -> Result<(), Refusal> {
        let now = self.clock.now();
        self.focus
            .as_mut()
            .ok_or(Refusal::FocusState("not started"))?
            .pause(now)
    }

    pub fn resume_focus(&mut self) -> Result<(), Refusal> {
        let now = self.clock.now();
        self.focus
            .as_mut()
            .ok_or(Refusal::FocusState("not started"))?
            .resume(now)
    }

    /// Discard the running session without reward.
    pub fn stop_focus(&mut self) -> Result<(), Refusal> {
        self.focus
            .take()
            .map(|_| ())
            .ok_or(Refusal::FocusState("not started"))
    }

    /// Advance the focus countdown. Returns the XP paid when it completes.
    pub fn tick_focus(&mut self) -> Option<u64> {
        let now = self.clock.now();
        let session = self.focus.as_mut()?;
        if !session.tick(now) {
            return None;
        }
        let minutes = session.minutes();
        self.focus = None;

        self.state.progression.focus_minutes += u64::from(minutes);
        let (xp, _) = self.grant(ActionKind::FocusMinute, u64::from(minutes), now);
        self.emit(Event::FocusCompleted { minutes, at: now });
        self.touch();
        Some(xp)
    }

    // ── Housekeeping & persistence ───────────────────────────────────

    /// Periodic driver: sweep, roll over, flush. Returns true if a write
    /// happened.
    pub fn tick(&mut self) -> Result<bool, CoreError> {
        let now = self.clock.now();
        let interval = sweep_interval(self.config.engine.sweep_interval_secs);
        if self.last_sweep.map_or(true, |last| now - last >= interval) {
            self.sweep_expired();
        }
        if self.state.progression.last_rollover_day != Some(self.clock.today()) {
            self.run_rollover();
            self.materialize_today();
        }
        self.flush_if_due()
    }

    /// Write the snapshot if the debounce window has passed.
    pub fn flush_if_due(&mut self) -> Result<bool, CoreError> {
        let now = self.clock.now();
        let store = &mut self.store;
        let state = &self.state;
        let wrote = self
            .debouncer
            .flush_if_due(now, || save_state(&mut **store, state))?;
        if wrote {
            self.notify();
        }
        Ok(wrote)
    }

    /// Write the snapshot now if anything changed.
    pub fn flush(&mut self) -> Result<bool, CoreError> {
        let now = self.clock.now();
        let store = &mut self.store;
        let state = &self.state;
        let wrote = self
            .debouncer
            .force_flush(now, || save_state(&mut **store, state))?;
        if wrote {
            self.notify();
        }
        Ok(wrote)
    }

    // ── Internals ────────────────────────────────────────────────────

    fn emit(&mut self, event: Event) {
        self.outbox.push(event.clone());
        self.log.push(event);
    }

    fn touch(&mut self) {
        let now = self.clock.now();
        self.debouncer.mark_dirty(now);
    }

    fn notify(&mut self) {
        if self.outbox.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.outbox);
        self.notifier.notify(&batch);
    }

    /// Drain completions and recompute until the graph is stable.
    fn settle(&mut self, initial: Vec<Completion>, now: DateTime<Utc>) {
        let mut pending: VecDeque<Completion> = initial.into();
        loop {
            while let Some(done) = pending.pop_front() {
                self.on_completed(&done, now, &mut pending);
            }
            let report = recompute_all(&mut self.state.goals, now);
            if report.completed.is_empty() {
                break;
            }
            for done in report.completed {
                self.emit(Event::GoalCompleted {
                    level: done.level,
                    id: done.id.clone(),
                    cascaded: true,
                    at: now,
                });
                let defeated = self
                    .state
                    .goals
                    .get_mut(done.level, &done.id)
                    .and_then(|g| g.boss.as_mut())
                    .is_some_and(|boss| boss.defeat(DefeatCause::AllChildrenComplete, now));
                if defeated {
                    self.pay_boss_defeat(done.level, &done.id, DefeatCause::AllChildrenComplete, now);
                }
                self.on_completed(&done, now, &mut pending);
            }
        }
        self.touch();
    }

    /// First-completion side effects: the reward and damage to boss parents.
    fn on_completed(
        &mut self,
        done: &Completion,
        now: DateTime<Utc>,
        pending: &mut VecDeque<Completion>,
    ) {
        let Some(goal) = self.state.goals.get_mut(done.level, &done.id) else {
            return;
        };
        if goal.rewarded {
            return;
        }
        goal.rewarded = true;
        let boss_defeated = goal.boss.as_ref().is_some_and(|b| !b.is_active());
        let parents: BTreeSet<String> = goal
            .parent_ids
            .iter()
            .chain(goal.parent_id.iter())
            .cloned()
            .collect();

        if !boss_defeated {
            self.grant(ActionKind::Goal(done.level), 1, now);
        }

        let Some(parent_level) = done.level.parent_level().filter(|l| l.can_be_boss()) else {
            return;
        };
        for parent_id in parents {
            self.strike_boss(parent_level, &parent_id, now, pending);
        }
    }

    fn strike_boss(
        &mut self,
        level: GoalLevel,
        id: &str,
        now: DateTime<Utc>,
        pending: &mut VecDeque<Completion>,
    ) {
        let active = self
            .state
            .goals
            .get(level, id)
            .and_then(|g| g.boss.as_ref())
            .is_some_and(BossRecord::is_active);
        if !active {
            return;
        }

        let roll = compute_boss_damage(
            &mut self.state.effects,
            &self.state.companions,
            now,
            self.config.engine.critical_strike_chance,
            &mut self.rng,
        );
        for effect in &roll.consumed {
            self.emit(Event::EffectConsumed {
                effect: *effect,
                at: now,
            });
        }
        let Some(boss) = self
            .state
            .goals
            .get_mut(level, id)
            .and_then(|g| g.boss.as_mut())
        else {
            return;
        };
        let hit = boss.hit(roll.amount, now);
        self.emit(Event::BossDamaged {
            id: id.to_string(),
            damage: hit.damage,
            critical: roll.critical,
            hp_after: hit.hp_after,
            at: now,
        });
        if hit.defeated && self.pay_boss_defeat(level, id, DefeatCause::Damage, now) {
            self.emit(Event::GoalCompleted {
                level,
                id: id.to_string(),
                cascaded: true,
                at: now,
            });
            pending.push_back(Completion {
                level,
                id: id.to_string(),
            });
        }
    }

    /// Pay out a boss whose record just turned defeated and complete its goal.
    ///
    /// Returns true if the goal was not already completed.
    fn pay_boss_defeat(
        &mut self,
        level: GoalLevel,
        id: &str,
        cause: DefeatCause,
        now: DateTime<Utc>,
    ) -> bool {
        let newly_completed = match self.state.goals.get_mut(level, id) {
            Some(goal) if !goal.completed => {
                goal.completed = true;
                goal.completed_at = Some(now);
                true
            }
            _ => false,
        };

        self.state.progression.bosses_defeated += 1;
        let (xp, gold) = defeat_reward(level, self.state.progression.level, &self.config.boss);
        tracing::info!(%level, id, ?cause, xp, gold, "boss defeated");
        self.emit(Event::BossDefeated {
            level,
            id: id.to_string(),
            cause,
            at: now,
        });
        self.credit(xp, gold, now);
        newly_completed
    }

    fn grow_boss(&mut self, level: GoalLevel, id: &str) {
        if let Some(boss) = self
            .state
            .goals
            .get_mut(level, id)
            .and_then(|g| g.boss.as_mut())
        {
            boss.grow_for_new_child();
        }
    }

    /// Pay `units` × the base of `action` through the modifier stack.
    fn grant(&mut self, action: ActionKind, units: u64, now: DateTime<Utc>) -> (u64, u64) {
        let xp_base = action.base(RewardKind::Xp, &self.config.rewards) * units;
        let gold_base = action.base(RewardKind::Gold, &self.config.rewards) * units;
        let xp = compute_reward(
            xp_base,
            RewardKind::Xp,
            &mut self.state.effects,
            &self.state.companions,
            now,
        );
        let gold = compute_reward(
            gold_base,
            RewardKind::Gold,
            &mut self.state.effects,
            &self.state.companions,
            now,
        );
        for effect in xp.consumed.iter().chain(&gold.consumed) {
            self.emit(Event::EffectConsumed {
                effect: *effect,
                at: now,
            });
        }
        self.credit(xp.amount, gold.amount, now);
        (xp.amount, gold.amount)
    }

    fn credit(&mut self, xp: u64, gold: u64, now: DateTime<Utc>) {
        if xp > 0 {
            let gained = self.state.progression.add_xp(xp);
            self.emit(Event::RewardGranted {
                kind: RewardKind::Xp,
                amount: xp,
                at: now,
            });
            if gained > 0 {
                self.emit(Event::LevelUp {
                    level: self.state.progression.level,
                    at: now,
                });
            }
        }
        if gold > 0 {
            self.state.progression.add_gold(gold);
            self.emit(Event::RewardGranted {
                kind: RewardKind::Gold,
                amount: gold,
                at: now,
            });
        }
    }

    fn has_completed_goals(&self) -> bool {
        GoalLevel::ALL
            .into_iter()
            .filter(|level| *level != GoalLevel::Habit)
            .any(|level| self.state.goals.collection(level).iter().any(|g| g.completed))
    }

    /// The weakest active boss Execute can land on.
    fn execute_target(&self) -> Option<(GoalLevel, String)> {
        [GoalLevel::Life, GoalLevel::Yearly]
            .into_iter()
            .flat_map(|level| {
                self.state
                    .goals
                    .collection(level)
                    .iter()
                    .map(move |goal| (level, goal))
            })
            .filter_map(|(level, goal)| {
                let boss = goal.boss.as_ref().filter(|b| b.can_be_executed())?;
                Some((boss.hp_percent(), level, goal.id.clone()))
            })
            .min_by_key(|(percent, _, _)| *percent)
            .map(|(_, level, id)| (level, id))
    }

    /// Archive every completed goal except habits, which reset daily.
    fn bulk_archive(&mut self, now: DateTime<Utc>) {
        for level in GoalLevel::ALL {
            if level == GoalLevel::Habit {
                continue;
            }
            let archived =
                self.state
                    .goals
                    .archive_where(level, ArchiveReason::BulkArchive, now, |g| g.completed);
            for id in archived {
                self.emit(Event::GoalArchived {
                    level,
                    id,
                    reason: ArchiveReason::BulkArchive,
                    at: now,
                });
            }
        }
        self.settle(Vec::new(), now);
    }
}
