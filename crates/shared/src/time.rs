//! Clock abstraction and calendar arithmetic.
//!
//! Services never call `Utc::now()` directly; they receive a [`Clock`] so
//! schedule advancement and ledger resets can be pinned in tests.

use std::sync::RwLock;

use chrono::{DateTime, Datelike, Duration, Months, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually controlled clock for tests and simulations.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Move the clock to an absolute instant.
    pub fn set(&self, now: DateTime<Utc>) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard = now;
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// 00:00 UTC on the first day of the calendar month after `now`.
pub fn first_day_of_next_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.date_naive();
    let first_of_month = date.with_day(1).unwrap_or(date);
    first_of_month
        .checked_add_months(Months::new(1))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .unwrap_or(now + Duration::days(31))
}

/// Adds calendar months, clamping to the last day of the target month
/// (Jan 31 + 1 month = Feb 28, or Feb 29 in leap years).
pub fn add_months(at: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    at.checked_add_months(Months::new(months))
        .unwrap_or(at + Duration::days(30 * i64::from(months)))
}
