//! Write debouncing.
//!
//! A burst of mutations collapses into one snapshot write once the state has
//! been quiet for the configured window.

use chrono::{DateTime, Duration, Utc};

use crate::error::CoreError;

const MAX_WINDOW_MS: u64 = 60 * 60 * 1000;

#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    /// Set while there are unsaved changes.
    flush_at: Option<DateTime<Utc>>,
    failures: u32,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            flush_at: None,
            failures: 0,
        }
    }

    /// Windows longer than an hour are clamped to one hour.
    pub fn from_millis(ms: u64) -> Self {
        let ms = ms.min(MAX_WINDOW_MS);
        Self::new(Duration::milliseconds(i64::try_from(ms).unwrap_or(0)))
    }

    /// Record a mutation. Every mark pushes the deadline back.
    pub fn mark_dirty(&mut self, now: DateTime<Utc>) {
        self.flush_at = Some(self.deadline(now));
    }

    fn deadline(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_dirty(&self) -> bool {
        self.flush_at.is_some()
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.flush_at.is_some_and(|at| at <= now)
    }

    /// Consecutive failed writes since the last success.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Run `write` if the window has elapsed.
    ///
    /// Returns `Ok(true)` when a write happened. A failed write leaves the
    /// state dirty and schedules a retry one window later.
    pub fn flush_if_due<F>(&mut self, now: DateTime<Utc>, write: F) -> Result<bool, CoreError>
    where
        F: FnOnce() -> Result<(), CoreError>,
    {
        if !self.is_due(now) {
            return Ok(false);
        }
        self.run(now, write)
    }

    /// Write immediately if anything is dirty.
    pub fn force_flush<F>(&mut self, now: DateTime<Utc>, write: F) -> Result<bool, CoreError>
    where
        F: FnOnce() -> Result<(), CoreError>,
    {
        if !self.is_dirty() {
            return Ok(false);
        }
        self.run(now, write)
    }

    fn run<F>(&mut self, now: DateTime<Utc>, write: F) -> Result<bool, CoreError>
    where
        F: FnOnce() -> Result<(), CoreError>,
    {
        match write() {
            Ok(()) => {
                self.flush_at = None;
                self.failures = 0;
                Ok(true)
            }
            Err(err) => {
                self.failures += 1;
                self.flush_at = Some(self.deadline(now));
                tracing::warn!(error = %err, failures = self.failures, "state write failed, will retry");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatabaseError;
    use chrono::TimeZone;

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap() + Duration::milliseconds(ms)
    }

    #[test]
    fn burst_collapses_into_one_write() {
        let mut d = Debouncer::from_millis(500);
        let mut writes = 0;
        d.mark_dirty(t(0));
        d.mark_dirty(t(100));
        d.mark_dirty(t(300));
        assert!(!d.flush_if_due(t(700), || { writes += 1; Ok(()) }).unwrap());
        assert!(d.flush_if_due(t(800), || { writes += 1; Ok(()) }).unwrap());
        assert!(!d.flush_if_due(t(5000), || { writes += 1; Ok(()) }).unwrap());
        assert_eq!(writes, 1);
    }

    #[test]
    fn failed_write_stays_dirty_and_retries() {
        let mut d = Debouncer::from_millis(500);
        d.mark_dirty(t(0));
        let err = d.flush_if_due(t(500), || Err(DatabaseError::Locked.into()));
        assert!(err.is_err());
        assert!(d.is_dirty());
        assert_eq!(d.failures(), 1);
        assert!(!d.is_due(t(900)));
        assert!(d.flush_if_due(t(1000), || Ok(())).unwrap());
        assert!(!d.is_dirty());
        assert_eq!(d.failures(), 0);
    }

    #[test]
    fn force_flush_ignores_window_but_not_cleanliness() {
        let mut d = Debouncer::from_millis(500);
        assert!(!d.force_flush(t(0), || Ok(())).unwrap());
        d.mark_dirty(t(0));
        assert!(d.force_flush(t(1), || Ok(())).unwrap());
    }

    #[test]
    fn oversized_window_is_clamped() {
        let mut d = Debouncer::from_millis(u64::MAX);
        d.mark_dirty(t(0));
        assert!(!d.is_due(t(MAX_WINDOW_MS as i64 - 1)));
        assert!(d.is_due(t(MAX_WINDOW_MS as i64)));
    }

    #[test]
    fn deadline_saturates_at_the_end_of_time() {
        let mut d = Debouncer::new(Duration::days(1));
        d.mark_dirty(DateTime::<Utc>::MAX_UTC - Duration::hours(1));
        assert!(d.is_dirty());
        assert!(d.is_due(DateTime::<Utc>::MAX_UTC));
    }
}
