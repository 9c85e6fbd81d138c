//! Active effect pools and the spell inventory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use super::{EffectId, EffectTarget, Lifetime, PoolKind};

/// When a cast effect stops applying.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "at", rename_all = "snake_case")]
pub enum Expiry {
    /// Applied on cast, never stored.
    Instant,
    /// Live until the given instant.
    Timed(DateTime<Utc>),
    /// Live until a reward or damage computation uses it up.
    UntilConsumed,
}

/// A cast effect instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub effect: EffectId,
    #[serde(default)]
    pub multiplier: Option<f64>,
    pub expiry: Expiry,
    pub cast_at: DateTime<Utc>,
}

impl ActiveEffect {
    pub fn cast(effect: EffectId, now: DateTime<Utc>) -> Self {
        let def = effect.definition();
        let expiry = match def.lifetime {
            Lifetime::Instant => Expiry::Instant,
            Lifetime::Timed(duration) => Expiry::Timed(now + duration),
            Lifetime::UntilConsumed => Expiry::UntilConsumed,
        };
        Self {
            effect,
            multiplier: Some(def.multiplier),
            expiry,
            cast_at: now,
        }
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Expiry::Timed(at) => at > now,
            Expiry::UntilConsumed => true,
            Expiry::Instant => false,
        }
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
            .unwrap_or_else(|| self.effect.definition().multiplier)
    }
}

/// Drop entries that no longer deserialize (e.g. an effect removed from the
/// catalogue) instead of failing the whole pool.
fn lenient_effects<'de, D>(deserializer: D) -> Result<Vec<ActiveEffect>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<serde_json::Value> = Vec::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<ActiveEffect>(value) {
            Ok(effect) => Some(effect),
            Err(err) => {
                tracing::warn!(error = %err, "dropping unreadable active effect");
                None
            }
        })
        .collect())
}

/// Spells and enchantments currently cast.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectPools {
    #[serde(default, deserialize_with = "lenient_effects")]
    pub spells: Vec<ActiveEffect>,
    #[serde(default, deserialize_with = "lenient_effects")]
    pub enchantments: Vec<ActiveEffect>,
}

impl EffectPools {
    pub fn pool(&self, kind: PoolKind) -> &Vec<ActiveEffect> {
        match kind {
            PoolKind::Spell => &self.spells,
            PoolKind::Enchantment => &self.enchantments,
        }
    }

    fn pool_mut(&mut self, kind: PoolKind) -> &mut Vec<ActiveEffect> {
        match kind {
            PoolKind::Spell => &mut self.spells,
            PoolKind::Enchantment => &mut self.enchantments,
        }
    }

    /// Store a cast instance in its pool. Instant effects are not stored.
    pub fn push(&mut self, effect: ActiveEffect) {
        if effect.expiry == Expiry::Instant {
            return;
        }
        self.pool_mut(effect.effect.definition().pool).push(effect);
    }

    pub fn live(&self, now: DateTime<Utc>) -> impl Iterator<Item = &ActiveEffect> {
        self.spells
            .iter()
            .chain(self.enchantments.iter())
            .filter(move |e| e.is_live(now))
    }

    pub fn is_active(&self, effect: EffectId, now: DateTime<Utc>) -> bool {
        self.live(now).any(|e| e.effect == effect)
    }

    /// Product of the multipliers of live effects in `kind` aimed at `target`.
    pub fn product(&self, kind: PoolKind, target: EffectTarget, now: DateTime<Utc>) -> f64 {
        self.pool(kind)
            .iter()
            .filter(|e| e.is_live(now) && e.effect.definition().target == target)
            .map(ActiveEffect::multiplier)
            .product()
    }

    /// Remove one live instance of `effect`. Returns false if none was live.
    pub fn consume(&mut self, effect: EffectId, now: DateTime<Utc>) -> bool {
        let pool = self.pool_mut(effect.definition().pool);
        match pool.iter().position(|e| e.effect == effect && e.is_live(now)) {
            Some(index) => {
                pool.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drop every timed effect whose expiry has passed.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) -> Vec<EffectId> {
        let mut expired = Vec::new();
        for pool in [&mut self.spells, &mut self.enchantments] {
            pool.retain(|e| {
                let keep = e.is_live(now);
                if !keep {
                    expired.push(e.effect);
                }
                keep
            });
        }
        expired
    }
}

fn lenient_charges<'de, D>(deserializer: D) -> Result<BTreeMap<EffectId, u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, u32> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, count)| match key.parse::<EffectId>() {
            Ok(id) => Some((id, count)),
            Err(_) => {
                tracing::warn!(effect = %key, "dropping charges for unknown effect");
                None
            }
        })
        .collect())
}

/// Castable charges per effect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpellInventory {
    #[serde(default, deserialize_with = "lenient_charges")]
    pub charges: BTreeMap<EffectId, u32>,
}

impl SpellInventory {
    pub fn charges(&self, effect: EffectId) -> u32 {
        self.charges.get(&effect).copied().unwrap_or(0)
    }

    pub fn grant(&mut self, effect: EffectId, count: u32) {
        *self.charges.entry(effect).or_insert(0) += count;
    }

    /// Spend one charge. Returns false when none are left.
    pub fn spend(&mut self, effect: EffectId) -> bool {
        match self.charges.get_mut(&effect) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }
}
