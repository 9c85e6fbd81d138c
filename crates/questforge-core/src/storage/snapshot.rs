//! Whole-state snapshot read/write.
//!
//! Loading is lenient and loses as little as possible: goal collections and
//! recurring definitions are decoded record by record, progression counters
//! one at a time, and the remaining top-level fields on their own. Whenever
//! anything is discarded the raw text is kept under a timestamped backup key.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::database::StateStore;
use crate::error::CoreError;
use crate::goal::{GoalGraph, GoalLevel};
use crate::progression::Progression;
use crate::state::GameState;

pub const STATE_KEY: &str = "questforge.state";
pub const BACKUP_KEY_PREFIX: &str = "questforge.state.backup.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Nothing was stored yet.
    pub fresh: bool,
    /// Parts of the document that failed to decode: a top-level field, a
    /// single record (`goals.daily[3]`) or a single counter
    /// (`progression.gold`).
    pub defaulted: Vec<String>,
    pub backup_key: Option<String>,
    pub legacy_parents_folded: usize,
    /// The stored level disagreed with the stored XP and was recomputed.
    pub level_repaired: bool,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.defaulted.is_empty() && self.backup_key.is_none()
    }
}

fn field<T: DeserializeOwned + Default>(
    obj: &Map<String, Value>,
    name: &str,
    defaulted: &mut Vec<String>,
) -> T {
    let Some(value) = obj.get(name) else {
        return T::default();
    };
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(field = name, error = %err, "defaulting unreadable snapshot field");
            defaulted.push(name.to_string());
            T::default()
        }
    }
}

/// Decode a list one record at a time, dropping the records that fail.
fn records<T: DeserializeOwned>(
    value: Option<&Value>,
    name: &str,
    defaulted: &mut Vec<String>,
) -> Vec<T> {
    let items = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            tracing::warn!(field = name, "expected a list, defaulting");
            defaulted.push(name.to_string());
            return Vec::new();
        }
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item.clone()) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                tracing::warn!(field = name, index, error = %err, "dropping unreadable record");
                defaulted.push(format!("{name}[{index}]"));
                None
            }
        })
        .collect()
}

fn collection_key(level: GoalLevel) -> &'static str {
    match level {
        GoalLevel::Life => "life",
        GoalLevel::Yearly => "yearly",
        GoalLevel::Monthly => "monthly",
        GoalLevel::Weekly => "weekly",
        GoalLevel::Daily => "daily",
        GoalLevel::SideQuest => "side_quests",
        GoalLevel::Habit => "habits",
    }
}

fn decode_goals(value: Option<&Value>, defaulted: &mut Vec<String>) -> GoalGraph {
    let mut goals = GoalGraph::default();
    let map = match value {
        None | Some(Value::Null) => return goals,
        Some(Value::Object(map)) => map,
        Some(_) => {
            tracing::warn!("goals is not an object, defaulting");
            defaulted.push("goals".to_string());
            return goals;
        }
    };
    for level in GoalLevel::ALL {
        let key = collection_key(level);
        *goals.collection_mut(level) = records(map.get(key), &format!("goals.{key}"), defaulted);
    }
    goals.archive = records(map.get("archive"), "goals.archive", defaulted);
    goals
}

/// Keep every counter that decodes on its own; default the rest.
fn decode_progression(value: Option<&Value>, defaulted: &mut Vec<String>) -> Progression {
    let map = match value {
        None | Some(Value::Null) => return Progression::default(),
        Some(Value::Object(map)) => map,
        Some(_) => {
            tracing::warn!("progression is not an object, defaulting");
            defaulted.push("progression".to_string());
            return Progression::default();
        }
    };
    let mut readable = Map::new();
    for (key, value) in map {
        let single: Map<String, Value> = [(key.clone(), value.clone())].into_iter().collect();
        match serde_json::from_value::<Progression>(Value::Object(single)) {
            Ok(_) => {
                readable.insert(key.clone(), value.clone());
            }
            Err(err) => {
                tracing::warn!(counter = %key, error = %err, "defaulting unreadable counter");
                defaulted.push(format!("progression.{key}"));
            }
        }
    }
    serde_json::from_value(Value::Object(readable)).unwrap_or_default()
}

fn decode(obj: &Map<String, Value>, defaulted: &mut Vec<String>) -> GameState {
    let mut state = GameState {
        goals: decode_goals(obj.get("goals"), defaulted),
        recurring: records(obj.get("recurring"), "recurring", defaulted),
        effects: field(obj, "effects", defaulted),
        inventory: field(obj, "inventory", defaulted),
        companions: field(obj, "companions", defaulted),
        progression: decode_progression(obj.get("progression"), defaulted),
        ..GameState::default()
    };
    if let Some(version) = obj.get("version").and_then(Value::as_u64) {
        state.version = u32::try_from(version).unwrap_or(state.version);
    }
    state
}

/// Read the snapshot, defaulting whatever cannot be decoded.
///
/// Only store read failures and backup write failures are errors.
pub fn load_state(
    store: &mut dyn StateStore,
    now: DateTime<Utc>,
) -> Result<(GameState, LoadReport), CoreError> {
    let mut report = LoadReport::default();
    let Some(raw) = store.read(STATE_KEY)? else {
        report.fresh = true;
        return Ok((GameState::default(), report));
    };

    let mut state = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(obj)) => decode(&obj, &mut report.defaulted),
        Ok(_) | Err(_) => {
            tracing::warn!("stored state is not a JSON object, starting fresh");
            report.defaulted.push("state".to_string());
            GameState::default()
        }
    };

    if !report.defaulted.is_empty() {
        let key = format!("{BACKUP_KEY_PREFIX}{}", now.timestamp());
        store.write(&key, &raw)?;
        tracing::warn!(%key, "unreadable state preserved");
        report.backup_key = Some(key);
    }

    let stored_level = state.progression.level;
    report.legacy_parents_folded = state.normalize();
    report.level_repaired = state.progression.level != stored_level;
    Ok((state, report))
}

pub fn save_state(store: &mut dyn StateStore, state: &GameState) -> Result<(), CoreError> {
    let json = serde_json::to_string(state)?;
    store.write(STATE_KEY, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::NewGoal;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
    }

    #[test]
    fn empty_store_loads_fresh_state() {
        let mut store = MemoryStore::new();
        let (state, report) = load_state(&mut store, now()).unwrap();
        assert!(report.fresh);
        assert_eq!(state.progression.level, 1);
    }

    #[test]
    fn save_then_load_keeps_goals() {
        let mut store = MemoryStore::new();
        let mut state = GameState::default();
        state
            .goals
            .insert(GoalLevel::Life, NewGoal::titled("Write a novel"), now())
            .unwrap();
        state.progression.gold = 320;
        save_state(&mut store, &state).unwrap();

        let (loaded, report) = load_state(&mut store, now()).unwrap();
        assert!(report.is_clean());
        assert_eq!(loaded.goals.life[0].title, "Write a novel");
        assert_eq!(loaded.progression.gold, 320);
    }

    #[test]
    fn bad_field_is_defaulted_and_backed_up() {
        let raw = r#"{"progression": {"xp": 900, "level": 2, "gold": 40},
                      "companions": "not a roster"}"#;
        let mut store = MemoryStore::new().with_entry(STATE_KEY, raw);
        let (state, report) = load_state(&mut store, now()).unwrap();

        assert_eq!(state.progression.xp, 900);
        assert!(state.companions.companions.is_empty());
        assert_eq!(report.defaulted, vec!["companions"]);
        let key = report.backup_key.unwrap();
        assert_eq!(key, format!("{BACKUP_KEY_PREFIX}{}", now().timestamp()));
        assert_eq!(store.read(&key).unwrap().as_deref(), Some(raw));
    }

    #[test]
    fn one_bad_goal_only_loses_itself() {
        let raw = r#"{"goals": {
            "life": [{"id": "l1", "title": "Live abroad", "created_at": "2026-10-01T00:00:00Z"}],
            "daily": [
                {"id": "d1", "title": "Call landlord", "created_at": "2026-10-01T00:00:00Z"},
                {"id": "d2", "title": "Broken", "created_at": "2026-10-01T00:00:00Z", "progress": "bad"}
            ],
            "archive": "nope"
        }}"#;
        let mut store = MemoryStore::new().with_entry(STATE_KEY, raw);
        let (state, report) = load_state(&mut store, now()).unwrap();

        assert_eq!(state.goals.life.len(), 1);
        assert_eq!(state.goals.life[0].title, "Live abroad");
        assert_eq!(state.goals.daily.len(), 1);
        assert_eq!(state.goals.daily[0].id, "d1");
        assert_eq!(report.defaulted, vec!["goals.daily[1]", "goals.archive"]);
        assert!(report.backup_key.is_some());
    }

    #[test]
    fn bad_recurring_definition_is_dropped_alone() {
        let raw = r#"{"recurring": [
            {"id": "r1", "title": "Gym", "rule": {"type": "weekly", "days": ["Mon"]}},
            {"id": "r2", "title": "Broken", "rule": {"type": "fortnightly"}}
        ]}"#;
        let mut store = MemoryStore::new().with_entry(STATE_KEY, raw);
        let (state, report) = load_state(&mut store, now()).unwrap();
        assert_eq!(state.recurring.len(), 1);
        assert_eq!(state.recurring[0].id, "r1");
        assert_eq!(report.defaulted, vec!["recurring[1]"]);
    }

    #[test]
    fn bad_counter_keeps_the_other_counters() {
        let raw = r#"{"progression": {"xp": 900, "level": 2, "gold": "lots", "login_streak": 4}}"#;
        let mut store = MemoryStore::new().with_entry(STATE_KEY, raw);
        let (state, report) = load_state(&mut store, now()).unwrap();
        assert_eq!(state.progression.xp, 900);
        assert_eq!(state.progression.level, 2);
        assert_eq!(state.progression.gold, 0);
        assert_eq!(state.progression.login_streak, 4);
        assert_eq!(report.defaulted, vec!["progression.gold"]);
    }

    #[test]
    fn level_is_rebuilt_from_xp() {
        let raw = r#"{"progression": {"xp": 0, "level": 5}}"#;
        let mut store = MemoryStore::new().with_entry(STATE_KEY, raw);
        let (state, report) = load_state(&mut store, now()).unwrap();
        assert!(report.level_repaired);
        assert_eq!(state.progression.level, 1);
        assert_eq!(state.progression.xp_into_level(), 0);
        assert_eq!(state.progression.xp_to_next_level(), 500);
    }

    #[test]
    fn unparseable_text_starts_fresh() {
        let mut store = MemoryStore::new().with_entry(STATE_KEY, "{{{ definitely not json");
        let (state, report) = load_state(&mut store, now()).unwrap();
        assert_eq!(state.goals.total_goals(), 0);
        assert!(report.backup_key.is_some());
        assert!(!report.fresh);
    }

    #[test]
    fn legacy_single_parent_is_normalized_on_load() {
        let raw = r#"{"goals": {
            "monthly": [{"id": "m1", "title": "M", "created_at": "2026-10-01T00:00:00Z"}],
            "weekly": [{"id": "w1", "title": "W", "created_at": "2026-10-01T00:00:00Z",
                        "parent_id": "m1"}]
        }}"#;
        let mut store = MemoryStore::new().with_entry(STATE_KEY, raw);
        let (state, report) = load_state(&mut store, now()).unwrap();
        assert_eq!(report.legacy_parents_folded, 1);
        assert!(state.goals.weekly[0].parent_ids.contains("m1"));
        assert!(report.backup_key.is_none());
    }

    #[test]
    fn unknown_effects_are_dropped_without_backup() {
        let raw = r#"{"effects": {"spells": [
            {"effect": "xp_surge", "expiry": {"kind": "until_consumed"}, "cast_at": "2026-10-16T08:00:00Z"},
            {"effect": "meteor_swarm", "expiry": {"kind": "until_consumed"}, "cast_at": "2026-10-16T08:00:00Z"}
        ]}}"#;
        let mut store = MemoryStore::new().with_entry(STATE_KEY, raw);
        let (state, report) = load_state(&mut store, now()).unwrap();
        assert_eq!(state.effects.spells.len(), 1);
        assert!(report.is_clean());
    }
}
