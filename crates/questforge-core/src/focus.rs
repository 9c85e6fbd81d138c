//! Focus session countdown.
//!
//! A wall-clock state machine: it holds no thread, the caller passes `now`
//! to every command and calls `tick()` periodically.
//!
//! ```text
//! Idle -> Running <-> Paused
//!            |
//!            v
//!        Completed
//! ```
//!
//! Stopping discards the session from any state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Refusal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusState {
    Idle,
    Running,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusSession {
    minutes: u32,
    state: FocusState,
    remaining_ms: u64,
    /// When elapsed time was last folded into `remaining_ms`.
    #[serde(default)]
    last_tick: Option<DateTime<Utc>>,
}

impl FocusSession {
    pub fn new(minutes: u32) -> Self {
        Self {
            minutes,
            state: FocusState::Idle,
            remaining_ms: u64::from(minutes) * 60_000,
            last_tick: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> FocusState {
        self.state
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn total_ms(&self) -> u64 {
        u64::from(self.minutes) * 60_000
    }

    /// 0.0 .. 1.0
    pub fn progress(&self) -> f64 {
        let total = self.total_ms();
        if total == 0 {
            return 1.0;
        }
        1.0 - (self.remaining_ms as f64 / total as f64)
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), Refusal> {
        match self.state {
            FocusState::Idle => {
                self.state = FocusState::Running;
                self.last_tick = Some(now);
                Ok(())
            }
            FocusState::Paused => self.resume(now),
            FocusState::Running => Err(Refusal::FocusState("already running")),
            FocusState::Completed => Err(Refusal::FocusState("already completed")),
        }
    }

    /// Freeze the countdown, keeping the remaining time.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), Refusal> {
        if self.state != FocusState::Running {
            return Err(Refusal::FocusState("not running"));
        }
        self.flush_elapsed(now);
        if self.state == FocusState::Running {
            self.state = FocusState::Paused;
            self.last_tick = None;
        }
        Ok(())
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), Refusal> {
        if self.state != FocusState::Paused {
            return Err(Refusal::FocusState("not paused"));
        }
        self.state = FocusState::Running;
        self.last_tick = Some(now);
        Ok(())
    }

    /// Advance the countdown. Returns true on the tick that completes it.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        if self.state != FocusState::Running {
            return false;
        }
        self.flush_elapsed(now);
        self.state == FocusState::Completed
    }

    fn flush_elapsed(&mut self, now: DateTime<Utc>) {
        let Some(last) = self.last_tick else {
            return;
        };
        let elapsed = u64::try_from((now - last).num_milliseconds()).unwrap_or(0);
        self.remaining_ms = self.remaining_ms.saturating_sub(elapsed);
        self.last_tick = Some(now);
        if self.remaining_ms == 0 {
            self.state = FocusState::Completed;
            self.last_tick = None;
        }
    }
}
