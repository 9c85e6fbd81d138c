//! # Questforge Core Library
//!
//! This library provides the progression engine behind Questforge, which
//! turns personal goals into an RPG-style quest log: finishing real work pays
//! experience and gold, unlocks spells, and wears down bosses.
//!
//! ## Architecture
//!
//! - **Goal Graph**: five hierarchical levels (Life, Yearly, Monthly, Weekly,
//!   Daily) with many-to-many parent links, plus side quests and habits
//! - **Progress Propagation**: full-graph recomputation after every
//!   completion-affecting mutation
//! - **Recurrence**: calendar rules that create daily tasks, and the day/week
//!   rollover that resets habits and archives finished weekly goals
//! - **Rewards & Effects**: spells, enchantments and companions composed into
//!   XP, Gold and boss damage
//! - **Bosses**: Life and Yearly goals with a health pool that races the
//!   ordinary completion cascade
//! - **Storage**: a SQLite key-value snapshot and TOML configuration
//!
//! ## Key Components
//!
//! - [`QuestEngine`]: owns the state and exposes every operation
//! - [`Clock`]: wall-clock and calendar source
//! - [`Database`]: snapshot persistence
//! - [`Config`]: application configuration management

pub mod boss;
pub mod clock;
pub mod companion;
pub mod effects;
pub mod engine;
pub mod error;
pub mod events;
pub mod focus;
pub mod goal;
pub mod progress;
pub mod progression;
pub mod recurrence;
pub mod reward;
pub mod shop;
pub mod state;
pub mod storage;

pub use boss::{BossRecord, BossStatus, DefeatCause};
pub use clock::{Clock, ManualClock, SystemClock};
pub use companion::{BonusType, Companion, CompanionKind, CompanionRoster, Rarity};
pub use effects::{ActiveEffect, EffectId, EffectPools, Expiry, SpellInventory};
pub use engine::QuestEngine;
pub use error::{ConfigError, CoreError, DatabaseError, Refusal, ValidationError};
pub use events::{Event, NoopNotifier, Notifier};
pub use focus::{FocusSession, FocusState};
pub use goal::{Goal, GoalGraph, GoalLevel, NewGoal, Priority};
pub use progression::Progression;
pub use recurrence::{MonthWeek, RecurrenceRule, RecurringTask};
pub use reward::RewardKind;
pub use shop::{ChestLoot, ChestTier};
pub use state::GameState;
pub use storage::{Config, Database, MemoryStore, StateStore};
