use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::boss::DefeatCause;
use crate::effects::EffectId;
use crate::goal::{ArchiveReason, GoalLevel};
use crate::recurrence::StreakGuard;
use crate::reward::RewardKind;
use crate::shop::ChestTier;

/// Every state change in the engine produces an Event.
/// The renderer drains them after a flush; the CLI prints them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    GoalCreated {
        level: GoalLevel,
        id: String,
        at: DateTime<Utc>,
    },
    GoalCompleted {
        level: GoalLevel,
        id: String,
        /// True when propagation, not the user, completed it.
        cascaded: bool,
        at: DateTime<Utc>,
    },
    GoalReopened {
        level: GoalLevel,
        id: String,
        at: DateTime<Utc>,
    },
    GoalArchived {
        level: GoalLevel,
        id: String,
        reason: ArchiveReason,
        at: DateTime<Utc>,
    },
    RewardGranted {
        kind: RewardKind,
        amount: u64,
        at: DateTime<Utc>,
    },
    LevelUp {
        level: u32,
        at: DateTime<Utc>,
    },
    BossActivated {
        level: GoalLevel,
        id: String,
        max_hp: u64,
        at: DateTime<Utc>,
    },
    BossDamaged {
        id: String,
        damage: u64,
        critical: bool,
        hp_after: u64,
        at: DateTime<Utc>,
    },
    BossDefeated {
        level: GoalLevel,
        id: String,
        cause: DefeatCause,
        at: DateTime<Utc>,
    },
    EffectCast {
        effect: EffectId,
        at: DateTime<Utc>,
    },
    EffectConsumed {
        effect: EffectId,
        at: DateTime<Utc>,
    },
    EffectExpired {
        effect: EffectId,
        at: DateTime<Utc>,
    },
    TaskMaterialized {
        definition_id: String,
        goal_id: String,
        at: DateTime<Utc>,
    },
    StreakProtected {
        habit_id: String,
        guard: StreakGuard,
        at: DateTime<Utc>,
    },
    StreakReset {
        habit_id: String,
        at: DateTime<Utc>,
    },
    ChestOpened {
        tier: ChestTier,
        loot: Vec<EffectId>,
        companion: Option<String>,
        at: DateTime<Utc>,
    },
    FocusCompleted {
        minutes: u32,
        at: DateTime<Utc>,
    },
}

/// Receives a batch of events after each successful flush.
///
/// Delivery is fire-and-forget: the engine does not look at the outcome.
pub trait Notifier {
    fn notify(&mut self, events: &[Event]);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&mut self, _events: &[Event]) {}
}
