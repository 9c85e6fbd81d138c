//! Spells and enchantments.
//!
//! Every castable effect is a variant of [`EffectId`]; its static definition
//! (pool, target, multiplier, lifetime, level gate) comes from
//! [`EffectId::definition`]. Cast instances live in [`EffectPools`] until they
//! expire or are consumed.

mod pool;

pub use pool::{ActiveEffect, EffectPools, Expiry, SpellInventory};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::reward::RewardKind;

/// Every effect the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectId {
    // Spells
    XpSurge,
    GoldRush,
    QuestDoubler,
    TimeFreeze,
    StreakShield,
    BulkArchive,
    BerserkerRage,
    BossSlayer,
    CriticalStrike,
    Execute,
    // Enchantments
    Wisdom,
    Fortune,
    Sharpness,
}

/// Which pool an effect instance is kept in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    Spell,
    Enchantment,
}

/// What an effect modifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectTarget {
    /// Multiplies XP or Gold rewards.
    Reward(RewardKind),
    /// Doubles the next reward of either kind.
    NextReward,
    /// Multiplies boss damage.
    BossDamage,
    /// Probabilistic boss damage multiplier.
    CriticalHit,
    /// Forces a boss defeat below the execute threshold.
    BossExecute,
    /// Protects habit streaks at rollover.
    Streaks,
    /// Archives completed goals on cast.
    Archive,
}

/// How long an effect lasts once cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    Instant,
    Timed(Duration),
    UntilConsumed,
}

#[derive(Debug, Clone, Copy)]
pub struct EffectDef {
    pub name: &'static str,
    pub pool: PoolKind,
    pub target: EffectTarget,
    pub multiplier: f64,
    pub lifetime: Lifetime,
    /// Minimum player level required to cast.
    pub min_level: u32,
}

impl EffectId {
    pub const ALL: [EffectId; 13] = [
        EffectId::XpSurge,
        EffectId::GoldRush,
        EffectId::QuestDoubler,
        EffectId::TimeFreeze,
        EffectId::StreakShield,
        EffectId::BulkArchive,
        EffectId::BerserkerRage,
        EffectId::BossSlayer,
        EffectId::CriticalStrike,
        EffectId::Execute,
        EffectId::Wisdom,
        EffectId::Fortune,
        EffectId::Sharpness,
    ];

    pub fn definition(self) -> EffectDef {
        use EffectTarget::*;
        use Lifetime::*;
        use PoolKind::*;

        let (name, pool, target, multiplier, lifetime, min_level) = match self {
            EffectId::XpSurge => ("XP Surge", Spell, Reward(RewardKind::Xp), 1.5, Timed(Duration::hours(1)), 1),
            EffectId::GoldRush => ("Gold Rush", Spell, Reward(RewardKind::Gold), 2.0, Timed(Duration::hours(1)), 2),
            EffectId::QuestDoubler => ("Quest Doubler", Spell, NextReward, 2.0, UntilConsumed, 3),
            EffectId::TimeFreeze => ("Time Freeze", Spell, Streaks, 1.0, UntilConsumed, 5),
            EffectId::StreakShield => ("Streak Shield", Spell, Streaks, 1.0, Timed(Duration::hours(24)), 4),
            EffectId::BulkArchive => ("Bulk Archive", Spell, Archive, 1.0, Instant, 1),
            EffectId::BerserkerRage => ("Berserker Rage", Spell, BossDamage, 2.0, UntilConsumed, 3),
            EffectId::BossSlayer => ("Boss Slayer", Spell, BossDamage, 1.25, Timed(Duration::hours(1)), 4),
            EffectId::CriticalStrike => ("Critical Strike", Spell, CriticalHit, 1.5, Timed(Duration::hours(1)), 5),
            EffectId::Execute => ("Execute", Spell, BossExecute, 1.0, UntilConsumed, 8),
            EffectId::Wisdom => ("Wisdom", Enchantment, Reward(RewardKind::Xp), 1.25, Timed(Duration::hours(24)), 1),
            EffectId::Fortune => ("Fortune", Enchantment, Reward(RewardKind::Gold), 1.25, Timed(Duration::hours(24)), 1),
            EffectId::Sharpness => ("Sharpness", Enchantment, BossDamage, 1.5, Timed(Duration::hours(24)), 3),
        };
        EffectDef {
            name,
            pool,
            target,
            multiplier,
            lifetime,
            min_level,
        }
    }

    /// Snake-case identifier used in storage and on the command line.
    pub fn key(self) -> &'static str {
        match self {
            EffectId::XpSurge => "xp_surge",
            EffectId::GoldRush => "gold_rush",
            EffectId::QuestDoubler => "quest_doubler",
            EffectId::TimeFreeze => "time_freeze",
            EffectId::StreakShield => "streak_shield",
            EffectId::BulkArchive => "bulk_archive",
            EffectId::BerserkerRage => "berserker_rage",
            EffectId::BossSlayer => "boss_slayer",
            EffectId::CriticalStrike => "critical_strike",
            EffectId::Execute => "execute",
            EffectId::Wisdom => "wisdom",
            EffectId::Fortune => "fortune",
            EffectId::Sharpness => "sharpness",
        }
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.definition().name)
    }
}

impl std::str::FromStr for EffectId {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        EffectId::ALL
            .into_iter()
            .find(|id| id.key() == wanted)
            .ok_or_else(|| crate::error::ValidationError::InvalidValue {
                field: "effect".into(),
                message: format!("unknown effect '{s}'"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_from_str() {
        for id in EffectId::ALL {
            assert_eq!(id.key().parse::<EffectId>().unwrap(), id);
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.key()));
        }
        assert_eq!("Quest-Doubler".parse::<EffectId>().unwrap(), EffectId::QuestDoubler);
    }

    #[test]
    fn enchantments_live_in_their_own_pool() {
        assert_eq!(EffectId::Wisdom.definition().pool, PoolKind::Enchantment);
        assert_eq!(EffectId::XpSurge.definition().pool, PoolKind::Spell);
        assert_eq!(EffectId::BulkArchive.definition().lifetime, Lifetime::Instant);
    }
}
