//! Player-wide counters and levelling.
//!
//! Level `L` needs `500 + 300·(L−1)` XP, so the cumulative XP at which level
//! `L` starts is `Σ_{i=1}^{L−1} (500 + 300·(i−1))`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// XP needed to clear level `level`.
pub fn xp_for_level(level: u32) -> u64 {
    500 + 300 * u64::from(level.saturating_sub(1))
}

/// Total XP at which `level` begins. Saturates at `u64::MAX`.
pub fn cumulative_xp(level: u32) -> u64 {
    let n = u128::from(level.saturating_sub(1));
    // Σ_{i=0}^{n-1} (500 + 300 i) = 150n² + 350n
    u64::try_from(150 * n * n + 350 * n).unwrap_or(u64::MAX)
}

/// The level a player with `xp` total XP is at.
pub fn level_for_xp(xp: u64) -> u32 {
    // Invert 150n² + 350n = xp, then settle the float estimate exactly.
    let estimate = ((350.0f64 * 350.0 + 600.0 * xp as f64).sqrt() - 350.0) / 300.0;
    let mut level = u32::try_from(estimate.max(0.0) as u64)
        .unwrap_or(u32::MAX - 1)
        .saturating_add(1);
    while level > 1 && cumulative_xp(level) > xp {
        level -= 1;
    }
    while level < u32::MAX && cumulative_xp(level + 1) <= xp {
        level += 1;
    }
    level
}

/// The single aggregate of scalar counters every component reads and bumps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progression {
    #[serde(default)]
    pub xp: u64,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub gold: u64,
    #[serde(default)]
    pub chests_opened: u32,
    #[serde(default)]
    pub bosses_defeated: u32,
    #[serde(default)]
    pub login_streak: u32,
    #[serde(default)]
    pub last_login: Option<NaiveDate>,
    #[serde(default)]
    pub focus_minutes: u64,
    /// Last calendar day the daily rollover ran for.
    #[serde(default)]
    pub last_rollover_day: Option<NaiveDate>,
    /// Last ISO week key the weekly rollover ran for.
    #[serde(default)]
    pub last_rollover_week: Option<String>,
}

fn default_level() -> u32 {
    1
}

impl Default for Progression {
    fn default() -> Self {
        Self {
            xp: 0,
            level: 1,
            gold: 0,
            chests_opened: 0,
            bosses_defeated: 0,
            login_streak: 0,
            last_login: None,
            focus_minutes: 0,
            last_rollover_day: None,
            last_rollover_week: None,
        }
    }
}

impl Progression {
    /// Add XP and climb as many levels as it covers. Returns the levels gained.
    pub fn add_xp(&mut self, amount: u64) -> u32 {
        self.xp = self.xp.saturating_add(amount);
        let before = self.level;
        self.level = self.level.max(level_for_xp(self.xp));
        let gained = self.level - before;
        if gained > 0 {
            tracing::info!(level = self.level, xp = self.xp, "level up");
        }
        gained
    }

    pub fn add_gold(&mut self, amount: u64) {
        self.gold = self.gold.saturating_add(amount);
    }

    /// Spend gold if enough is available.
    pub fn spend_gold(&mut self, amount: u64) -> bool {
        if self.gold < amount {
            return false;
        }
        self.gold -= amount;
        true
    }

    /// XP earned inside the current level.
    pub fn xp_into_level(&self) -> u64 {
        self.xp.saturating_sub(cumulative_xp(self.level))
    }

    /// XP still needed to reach the next level.
    pub fn xp_to_next_level(&self) -> u64 {
        cumulative_xp(self.level.saturating_add(1)).saturating_sub(self.xp)
    }

    /// Bring `level` back in line with `xp`. Returns true if it changed.
    pub fn repair_level(&mut self) -> bool {
        let level = level_for_xp(self.xp);
        if level == self.level {
            return false;
        }
        tracing::warn!(stored = self.level, level, xp = self.xp, "stored level disagrees with xp");
        self.level = level;
        true
    }

    /// Record a login on `today`, extending or restarting the streak.
    pub fn record_login(&mut self, today: NaiveDate) {
        match self.last_login {
            Some(last) if last == today => return,
            Some(last) if today.pred_opt() == Some(last) => self.login_streak += 1,
            _ => self.login_streak = 1,
        }
        self.last_login = Some(today);
    }
}
