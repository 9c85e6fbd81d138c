//! Boss layer over Life and Yearly goals.
//!
//! ```text
//! dormant --activate--> active --HP 0 | all children done | execute--> defeated
//! ```
//!
//! The pool is `HP_PER_CHILD` per linked child, fixed at activation and grown
//! (never healed) when new children are linked while active.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::goal::GoalLevel;
use crate::storage::BossConfig;

pub const HP_PER_CHILD: u64 = 100;

/// Execute only lands at or below this share of the pool.
pub const EXECUTE_THRESHOLD: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BossStatus {
    Active,
    Defeated,
}

impl BossStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BossStatus::Active => "active",
            BossStatus::Defeated => "defeated",
        }
    }
}

/// How a boss fell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefeatCause {
    Damage,
    AllChildrenComplete,
    Execute,
}

/// Boss state carried by a flagged goal. An unflagged goal is dormant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossRecord {
    pub status: BossStatus,
    pub max_hp: u64,
    pub current_hp: u64,
    #[serde(default)]
    pub total_damage_dealt: u64,
    pub activated_at: DateTime<Utc>,
    #[serde(default)]
    pub defeated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub defeat_cause: Option<DefeatCause>,
}

/// Result of landing one hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitOutcome {
    pub damage: u64,
    pub hp_before: u64,
    pub hp_after: u64,
    pub defeated: bool,
}

impl BossRecord {
    pub fn activate(linked_children: usize, now: DateTime<Utc>) -> Self {
        let pool = HP_PER_CHILD * linked_children as u64;
        Self {
            status: BossStatus::Active,
            max_hp: pool,
            current_hp: pool,
            total_damage_dealt: 0,
            activated_at: now,
            defeated_at: None,
            defeat_cause: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == BossStatus::Active
    }

    /// A new child joined the fight: grow the pool and current HP alike.
    pub fn grow_for_new_child(&mut self) {
        if self.is_active() {
            self.max_hp += HP_PER_CHILD;
            self.current_hp += HP_PER_CHILD;
        }
    }

    /// Subtract `damage`, flooring HP at zero. A hit that empties HP defeats
    /// the boss.
    pub fn hit(&mut self, damage: u64, now: DateTime<Utc>) -> HitOutcome {
        let hp_before = self.current_hp;
        if !self.is_active() {
            return HitOutcome {
                damage: 0,
                hp_before,
                hp_after: hp_before,
                defeated: false,
            };
        }
        self.current_hp = self.current_hp.saturating_sub(damage);
        self.total_damage_dealt = self.total_damage_dealt.saturating_add(damage);
        let defeated = self.current_hp == 0;
        if defeated {
            self.defeat(DefeatCause::Damage, now);
        }
        HitOutcome {
            damage,
            hp_before,
            hp_after: self.current_hp,
            defeated,
        }
    }

    pub fn can_be_executed(&self) -> bool {
        self.is_active()
            && self.max_hp > 0
            && (self.current_hp as f64) <= self.max_hp as f64 * EXECUTE_THRESHOLD
    }

    /// Mark defeated. Returns false if it already was.
    pub fn defeat(&mut self, cause: DefeatCause, now: DateTime<Utc>) -> bool {
        if !self.is_active() {
            return false;
        }
        self.status = BossStatus::Defeated;
        self.defeated_at = Some(now);
        self.defeat_cause = Some(cause);
        true
    }

    pub fn hp_percent(&self) -> u8 {
        if self.max_hp == 0 {
            return 0;
        }
        (100.0 * self.current_hp as f64 / self.max_hp as f64).round() as u8
    }
}

/// XP and Gold paid for felling a boss at `level` when the player is at
/// `player_level`.
pub fn defeat_reward(level: GoalLevel, player_level: u32, config: &BossConfig) -> (u64, u64) {
    let player_level = u64::from(player_level);
    match level {
        GoalLevel::Life => (
            config.life_xp + config.life_xp_per_level * player_level,
            config.life_gold + config.life_gold_per_level * player_level,
        ),
        _ => (
            config.yearly_xp + config.yearly_xp_per_level * player_level,
            config.yearly_gold + config.yearly_gold_per_level * player_level,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap()
    }

    #[test]
    fn activation_sizes_the_pool_by_children() {
        let boss = BossRecord::activate(4, now());
        assert_eq!(boss.max_hp, 400);
        assert_eq!(boss.current_hp, 400);
        assert!(boss.is_active());
    }

    #[test]
    fn growth_does_not_heal_wounds() {
        let mut boss = BossRecord::activate(2, now());
        boss.hit(150, now());
        boss.grow_for_new_child();
        assert_eq!(boss.max_hp, 300);
        assert_eq!(boss.current_hp, 150);
    }

    #[test]
    fn emptying_hp_defeats_and_later_hits_are_ignored() {
        let mut boss = BossRecord::activate(1, now());
        let outcome = boss.hit(250, now());
        assert!(outcome.defeated);
        assert_eq!(boss.current_hp, 0);
        assert_eq!(boss.defeat_cause, Some(DefeatCause::Damage));
        assert!(!boss.defeat(DefeatCause::AllChildrenComplete, now()));

        let after = boss.hit(100, now());
        assert_eq!(after.damage, 0);
        assert_eq!(boss.total_damage_dealt, 250);
    }

    #[test]
    fn execute_threshold_is_a_quarter_of_the_pool() {
        let mut boss = BossRecord::activate(4, now());
        boss.hit(299, now());
        assert!(!boss.can_be_executed());
        boss.hit(1, now());
        assert!(boss.can_be_executed());
    }

    #[test]
    fn life_bosses_pay_more_than_yearly() {
        let config = BossConfig::default();
        let life = defeat_reward(GoalLevel::Life, 5, &config);
        let yearly = defeat_reward(GoalLevel::Yearly, 5, &config);
        assert!(life.0 > yearly.0);
        assert!(life.1 > yearly.1);
        assert!(defeat_reward(GoalLevel::Life, 6, &config).0 > life.0);
    }

    proptest! {
        #[test]
        fn hp_tracks_damage_sequence(
            children in 1usize..10,
            hits in proptest::collection::vec(0u64..400, 0..20)
        ) {
            let mut boss = BossRecord::activate(children, now());
            let pool = boss.max_hp;
            let mut dealt = 0u64;
            for damage in &hits {
                if !boss.is_active() {
                    break;
                }
                boss.hit(*damage, now());
                dealt += damage;
            }
            prop_assert_eq!(boss.current_hp, pool.saturating_sub(dealt));
            prop_assert_eq!(boss.total_damage_dealt, dealt);
        }
    }
}
