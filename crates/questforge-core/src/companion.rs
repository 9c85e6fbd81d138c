//! Companions: passive bonus sources, at most one active at a time.

use serde::{Deserialize, Serialize};

use crate::error::Refusal;
use crate::reward::RewardKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanionKind {
    Owl,
    Fox,
    Wolf,
    Golem,
    Dragon,
    Phoenix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusType {
    Xp,
    Gold,
    Attack,
    /// `bonus_amount` is the number of streaks protected per ISO week.
    StreakProtection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Companion {
    pub id: String,
    pub name: String,
    pub kind: CompanionKind,
    pub rarity: Rarity,
    pub bonus_type: BonusType,
    pub bonus_amount: f64,
    /// Streak protections spent in `usage_week`.
    #[serde(default)]
    pub weekly_uses: u32,
    #[serde(default)]
    pub usage_week: Option<String>,
}

impl Companion {
    pub fn new(
        name: impl Into<String>,
        kind: CompanionKind,
        rarity: Rarity,
        bonus_type: BonusType,
        bonus_amount: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            kind,
            rarity,
            bonus_type,
            bonus_amount,
            weekly_uses: 0,
            usage_week: None,
        }
    }

    pub fn weekly_quota(&self) -> u32 {
        match self.bonus_type {
            BonusType::StreakProtection => self.bonus_amount.max(0.0).floor() as u32,
            _ => 0,
        }
    }

    /// Protections left this week; the counter restarts when `week_key` changes.
    pub fn protections_left(&self, week_key: &str) -> u32 {
        if self.usage_week.as_deref() == Some(week_key) {
            self.weekly_quota().saturating_sub(self.weekly_uses)
        } else {
            self.weekly_quota()
        }
    }

    /// Spend one protection. Returns false when the quota is used up.
    pub fn use_protection(&mut self, week_key: &str) -> bool {
        if self.usage_week.as_deref() != Some(week_key) {
            self.usage_week = Some(week_key.to_string());
            self.weekly_uses = 0;
        }
        if self.weekly_uses < self.weekly_quota() {
            self.weekly_uses += 1;
            true
        } else {
            false
        }
    }
}

/// Owned companions and the active one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanionRoster {
    #[serde(default)]
    pub companions: Vec<Companion>,
    #[serde(default)]
    pub active_id: Option<String>,
}

impl CompanionRoster {
    pub fn add(&mut self, companion: Companion) -> String {
        let id = companion.id.clone();
        self.companions.push(companion);
        id
    }

    pub fn active(&self) -> Option<&Companion> {
        let id = self.active_id.as_deref()?;
        self.companions.iter().find(|c| c.id == id)
    }

    pub fn active_mut(&mut self) -> Option<&mut Companion> {
        let id = self.active_id.clone()?;
        self.companions.iter_mut().find(|c| c.id == id)
    }

    pub fn activate(&mut self, id: &str) -> Result<(), Refusal> {
        if !self.companions.iter().any(|c| c.id == id) {
            return Err(Refusal::CompanionNotFound(id.to_string()));
        }
        self.active_id = Some(id.to_string());
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.active_id = None;
    }

    /// `1 + bonus` when the active companion boosts `kind`, else 1.
    pub fn reward_factor(&self, kind: RewardKind) -> f64 {
        let wanted = match kind {
            RewardKind::Xp => BonusType::Xp,
            RewardKind::Gold => BonusType::Gold,
        };
        self.active()
            .filter(|c| c.bonus_type == wanted)
            .map_or(1.0, |c| 1.0 + c.bonus_amount)
    }
}
