//! Wall-clock and calendar source.
//!
//! The engine never calls `Utc::now()` directly; it asks a [`Clock`]. Tests
//! drive time with [`ManualClock`].

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date used for day and week rollover.
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&Local).date_naive()
    }
}

/// The real clock. Calendar dates follow the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Calendar dates are taken in UTC.
///
/// Clones share the same instant so a test can keep a handle after giving one
/// to the engine.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn today(&self) -> NaiveDate {
        self.now.get().date_naive()
    }
}

/// ISO week key such as `2026-W42`.
pub fn iso_week_key(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

/// Whole days from `earlier` to `later` (negative if reversed).
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days()
}
