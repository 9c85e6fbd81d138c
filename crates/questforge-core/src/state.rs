//! The whole persisted game state.
//!
//! Everything the engine owns is in [`GameState`], and it is always written as
//! one snapshot.

use serde::{Deserialize, Serialize};

use crate::companion::CompanionRoster;
use crate::effects::{EffectPools, SpellInventory};
use crate::goal::GoalGraph;
use crate::progression::Progression;
use crate::recurrence::RecurringTask;

/// Snapshot format version written alongside the state.
pub const SNAPSHOT_VERSION: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub goals: GoalGraph,
    #[serde(default)]
    pub recurring: Vec<RecurringTask>,
    #[serde(default)]
    pub effects: EffectPools,
    #[serde(default)]
    pub inventory: SpellInventory,
    #[serde(default)]
    pub companions: CompanionRoster,
    #[serde(default)]
    pub progression: Progression,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            goals: GoalGraph::default(),
            recurring: Vec::new(),
            effects: EffectPools::default(),
            inventory: SpellInventory::default(),
            companions: CompanionRoster::default(),
            progression: Progression::default(),
        }
    }
}

impl GameState {
    /// Upgrade data written by older versions in place.
    ///
    /// Returns the number of goals whose legacy parent field was folded in.
    pub fn normalize(&mut self) -> usize {
        let folded = self.goals.normalize_legacy_parents();
        self.progression.repair_level();
        self.version = SNAPSHOT_VERSION;
        folded
    }
}
