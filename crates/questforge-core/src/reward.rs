//! Reward and boss-damage composition.
//!
//! Rewards are a product of independent factors applied to a base amount:
//!
//! ```text
//! base × Π(spells for kind) × Π(enchantments for kind) × companion × doubler
//! ```
//!
//! and floored to an integer. Boss damage is a separate product over its own
//! set of modifiers. One-shot effects used by a computation are consumed by it.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::companion::{BonusType, CompanionRoster};
use crate::effects::{EffectId, EffectPools, EffectTarget, PoolKind};
use crate::goal::GoalLevel;
use crate::storage::RewardConfig;

/// Base damage of one completed child against its boss.
pub const BASE_BOSS_DAMAGE: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardKind {
    Xp,
    Gold,
}

impl fmt::Display for RewardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardKind::Xp => f.write_str("XP"),
            RewardKind::Gold => f.write_str("Gold"),
        }
    }
}

/// What earned a reward; selects the base amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Goal(GoalLevel),
    ChecklistItem,
    FocusMinute,
}

impl ActionKind {
    pub fn base(self, kind: RewardKind, config: &RewardConfig) -> u64 {
        let pair = match self {
            ActionKind::Goal(GoalLevel::Daily) => config.task,
            ActionKind::Goal(GoalLevel::SideQuest) => config.side_quest,
            ActionKind::Goal(GoalLevel::Habit) => config.habit,
            ActionKind::Goal(GoalLevel::Weekly) => config.weekly,
            ActionKind::Goal(GoalLevel::Monthly) => config.monthly,
            ActionKind::Goal(GoalLevel::Yearly) => config.yearly,
            ActionKind::Goal(GoalLevel::Life) => config.life,
            ActionKind::ChecklistItem => config.checklist_item,
            ActionKind::FocusMinute => config.focus_minute,
        };
        match kind {
            RewardKind::Xp => pair.xp,
            RewardKind::Gold => pair.gold,
        }
    }
}

/// Result of one reward computation.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardRoll {
    pub amount: u64,
    pub factor: f64,
    /// One-shot effects this computation used up.
    pub consumed: Vec<EffectId>,
}

/// Compose the reward for `base` of `kind`.
///
/// Consumes a live Quest Doubler regardless of `kind`.
pub fn compute_reward(
    base: u64,
    kind: RewardKind,
    effects: &mut EffectPools,
    companions: &CompanionRoster,
    now: DateTime<Utc>,
) -> RewardRoll {
    let mut factors = vec![
        effects.product(PoolKind::Spell, EffectTarget::Reward(kind), now),
        effects.product(PoolKind::Enchantment, EffectTarget::Reward(kind), now),
        companions.reward_factor(kind),
    ];

    let mut consumed = Vec::new();
    if effects.consume(EffectId::QuestDoubler, now) {
        factors.push(EffectId::QuestDoubler.definition().multiplier);
        consumed.push(EffectId::QuestDoubler);
    }

    let factor: f64 = factors.iter().product();
    RewardRoll {
        amount: floor_amount(base, factor),
        factor,
        consumed,
    }
}

/// Result of one boss-damage computation.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageRoll {
    pub amount: u64,
    pub critical: bool,
    pub consumed: Vec<EffectId>,
}

/// Compose the damage one completed child deals to its boss.
///
/// `crit_chance` is only rolled while Critical Strike is live.
pub fn compute_boss_damage<R: Rng>(
    effects: &mut EffectPools,
    companions: &CompanionRoster,
    now: DateTime<Utc>,
    crit_chance: f64,
    rng: &mut R,
) -> DamageRoll {
    let mut factor = companions
        .active()
        .filter(|c| c.bonus_type == BonusType::Attack)
        .map_or(1.0, |c| 1.0 + c.bonus_amount);
    factor *= effects.product(PoolKind::Enchantment, EffectTarget::BossDamage, now);

    let mut consumed = Vec::new();
    if effects.consume(EffectId::BerserkerRage, now) {
        factor *= EffectId::BerserkerRage.definition().multiplier;
        consumed.push(EffectId::BerserkerRage);
    }
    if effects.is_active(EffectId::BossSlayer, now) {
        factor *= EffectId::BossSlayer.definition().multiplier;
    }

    let mut critical = false;
    if effects.is_active(EffectId::CriticalStrike, now) && rng.gen_bool(crit_chance.clamp(0.0, 1.0)) {
        factor *= EffectId::CriticalStrike.definition().multiplier;
        critical = true;
    }

    DamageRoll {
        amount: floor_amount(BASE_BOSS_DAMAGE, factor),
        critical,
        consumed,
    }
}

fn floor_amount(base: u64, factor: f64) -> u64 {
    let value = (base as f64 * factor).floor();
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::companion::{Companion, CompanionKind, Rarity};
    use crate::effects::ActiveEffect;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand_pcg::Mcg128Xsl64;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap()
    }

    fn roster_with(bonus_type: BonusType, amount: f64) -> CompanionRoster {
        let mut roster = CompanionRoster::default();
        let id = roster.add(Companion::new("Hoot", CompanionKind::Owl, Rarity::Rare, bonus_type, amount));
        roster.activate(&id).unwrap();
        roster
    }

    #[test]
    fn plain_reward_is_stable() {
        let mut effects = EffectPools::default();
        let roster = CompanionRoster::default();
        let a = compute_reward(100, RewardKind::Xp, &mut effects, &roster, now());
        let b = compute_reward(100, RewardKind::Xp, &mut effects, &roster, now());
        assert_eq!(a.amount, 100);
        assert_eq!(a, b);
    }

    #[test]
    fn factors_multiply_then_floor() {
        let mut effects = EffectPools::default();
        effects.push(ActiveEffect::cast(EffectId::XpSurge, now()));
        effects.push(ActiveEffect::cast(EffectId::Wisdom, now()));
        let roster = roster_with(BonusType::Xp, 0.1);

        // 33 × 1.5 × 1.25 × 1.1 = 68.06
        let roll = compute_reward(33, RewardKind::Xp, &mut effects, &roster, now());
        assert_eq!(roll.amount, 68);

        // Gold sees none of the XP modifiers.
        let gold = compute_reward(33, RewardKind::Gold, &mut effects, &roster, now());
        assert_eq!(gold.amount, 33);
    }

    #[test]
    fn quest_doubler_is_spent_by_the_first_call_of_any_kind() {
        let mut effects = EffectPools::default();
        effects.push(ActiveEffect::cast(EffectId::QuestDoubler, now()));
        let roster = CompanionRoster::default();

        let gold = compute_reward(10, RewardKind::Gold, &mut effects, &roster, now());
        assert_eq!(gold.amount, 20);
        assert_eq!(gold.consumed, vec![EffectId::QuestDoubler]);

        let xp = compute_reward(10, RewardKind::Xp, &mut effects, &roster, now());
        assert_eq!(xp.amount, 10);
        assert!(xp.consumed.is_empty());
    }

    #[test]
    fn boss_damage_stacks_its_own_modifiers() {
        let mut effects = EffectPools::default();
        effects.push(ActiveEffect::cast(EffectId::BerserkerRage, now()));
        effects.push(ActiveEffect::cast(EffectId::BossSlayer, now()));
        effects.push(ActiveEffect::cast(EffectId::Sharpness, now()));
        let roster = roster_with(BonusType::Attack, 0.5);
        let mut rng = Mcg128Xsl64::seed_from_u64(7);

        // 100 × 1.5 × 1.5 × 2 × 1.25 = 562.5
        let roll = compute_boss_damage(&mut effects, &roster, now(), 0.5, &mut rng);
        assert_eq!(roll.amount, 562);
        assert_eq!(roll.consumed, vec![EffectId::BerserkerRage]);

        // Berserker Rage is gone, Boss Slayer stays.
        let second = compute_boss_damage(&mut effects, &roster, now(), 0.5, &mut rng);
        assert_eq!(second.amount, 281);
    }

    #[test]
    fn critical_strike_yields_one_of_two_values() {
        let mut effects = EffectPools::default();
        effects.push(ActiveEffect::cast(EffectId::CriticalStrike, now()));
        let roster = CompanionRoster::default();
        let mut rng = Mcg128Xsl64::seed_from_u64(42);

        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..200 {
            let roll = compute_boss_damage(&mut effects, &roster, now(), 0.5, &mut rng);
            assert_eq!(roll.critical, roll.amount == 150);
            seen.insert(roll.amount);
        }
        assert_eq!(seen.into_iter().collect::<Vec<_>>(), vec![100, 150]);
    }

    #[test]
    fn action_bases_come_from_config() {
        let config = RewardConfig::default();
        assert_eq!(ActionKind::Goal(GoalLevel::Daily).base(RewardKind::Xp, &config), config.task.xp);
        assert_eq!(ActionKind::FocusMinute.base(RewardKind::Gold, &config), config.focus_minute.gold);
    }
}
