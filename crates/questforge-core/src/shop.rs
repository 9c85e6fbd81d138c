//! Treasure chests: Gold in, effect charges (and sometimes a companion) out.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::companion::{BonusType, Companion, CompanionKind, Rarity};
use crate::effects::EffectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChestTier {
    Bronze,
    Silver,
    Gold,
}

type LootTable = &'static [(EffectId, u32)];

const BRONZE_LOOT: LootTable = &[
    (EffectId::XpSurge, 30),
    (EffectId::GoldRush, 25),
    (EffectId::Wisdom, 20),
    (EffectId::Fortune, 20),
    (EffectId::StreakShield, 5),
];

const SILVER_LOOT: LootTable = &[
    (EffectId::XpSurge, 15),
    (EffectId::GoldRush, 15),
    (EffectId::QuestDoubler, 15),
    (EffectId::StreakShield, 15),
    (EffectId::BerserkerRage, 15),
    (EffectId::Sharpness, 15),
    (EffectId::TimeFreeze, 10),
];

const GOLD_LOOT: LootTable = &[
    (EffectId::QuestDoubler, 15),
    (EffectId::TimeFreeze, 15),
    (EffectId::BulkArchive, 10),
    (EffectId::BerserkerRage, 15),
    (EffectId::BossSlayer, 15),
    (EffectId::CriticalStrike, 15),
    (EffectId::Execute, 15),
];

impl ChestTier {
    pub const ALL: [ChestTier; 3] = [ChestTier::Bronze, ChestTier::Silver, ChestTier::Gold];

    pub fn cost(self) -> u64 {
        match self {
            ChestTier::Bronze => 100,
            ChestTier::Silver => 300,
            ChestTier::Gold => 750,
        }
    }

    /// Number of effect charges in one chest.
    pub fn draws(self) -> usize {
        match self {
            ChestTier::Bronze => 1,
            ChestTier::Silver => 2,
            ChestTier::Gold => 3,
        }
    }

    pub fn companion_chance(self) -> f64 {
        match self {
            ChestTier::Gold => 0.25,
            ChestTier::Bronze | ChestTier::Silver => 0.0,
        }
    }

    fn loot_table(self) -> LootTable {
        match self {
            ChestTier::Bronze => BRONZE_LOOT,
            ChestTier::Silver => SILVER_LOOT,
            ChestTier::Gold => GOLD_LOOT,
        }
    }
}

impl fmt::Display for ChestTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChestTier::Bronze => "bronze",
            ChestTier::Silver => "silver",
            ChestTier::Gold => "gold",
        })
    }
}

impl std::str::FromStr for ChestTier {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChestTier::ALL
            .into_iter()
            .find(|tier| tier.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| crate::error::ValidationError::InvalidValue {
                field: "tier".into(),
                message: format!("unknown chest tier '{s}'"),
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChestLoot {
    pub effects: Vec<EffectId>,
    pub companion: Option<Companion>,
}

fn pick_weighted<T: Copy, R: Rng>(table: &[(T, u32)], rng: &mut R) -> Option<T> {
    let total: u32 = table.iter().map(|(_, w)| w).sum();
    if total == 0 {
        return None;
    }
    let mut roll = rng.gen_range(0..total);
    for &(item, weight) in table {
        if roll < weight {
            return Some(item);
        }
        roll -= weight;
    }
    None
}

fn roll_companion<R: Rng>(rng: &mut R) -> Option<Companion> {
    const KINDS: [CompanionKind; 6] = [
        CompanionKind::Owl,
        CompanionKind::Fox,
        CompanionKind::Wolf,
        CompanionKind::Golem,
        CompanionKind::Dragon,
        CompanionKind::Phoenix,
    ];
    const BONUSES: [BonusType; 4] = [
        BonusType::Xp,
        BonusType::Gold,
        BonusType::Attack,
        BonusType::StreakProtection,
    ];
    let rarity = pick_weighted(
        &[
            (Rarity::Common, 50),
            (Rarity::Rare, 30),
            (Rarity::Epic, 15),
            (Rarity::Legendary, 5),
        ],
        rng,
    )?;
    let kind = KINDS[rng.gen_range(0..KINDS.len())];
    let bonus_type = BONUSES[rng.gen_range(0..BONUSES.len())];
    let amount = match (bonus_type, rarity) {
        (BonusType::StreakProtection, Rarity::Common) => 1.0,
        (BonusType::StreakProtection, Rarity::Rare) => 2.0,
        (BonusType::StreakProtection, Rarity::Epic) => 3.0,
        (BonusType::StreakProtection, Rarity::Legendary) => 5.0,
        (_, Rarity::Common) => 0.10,
        (_, Rarity::Rare) => 0.20,
        (_, Rarity::Epic) => 0.35,
        (_, Rarity::Legendary) => 0.50,
    };
    let name = format!("{rarity:?} {kind:?}");
    Some(Companion::new(name, kind, rarity, bonus_type, amount))
}

/// Roll the contents of one chest.
pub fn open_chest<R: Rng>(tier: ChestTier, rng: &mut R) -> ChestLoot {
    let effects = (0..tier.draws())
        .filter_map(|_| pick_weighted(tier.loot_table(), rng))
        .collect();
    let chance = tier.companion_chance();
    let companion = if chance > 0.0 && rng.gen_bool(chance) {
        roll_companion(rng)
    } else {
        None
    };
    ChestLoot { effects, companion }
}
