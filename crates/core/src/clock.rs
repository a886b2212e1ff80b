//! Source of "today" for date-relative rules.
//!
//! Validation and expiry reporting never read the system time directly; they ask a
//! [`Clock`], so tests can pin the current day.

use chrono::Local;

use crate::date::StockDate;

pub trait Clock: Send + Sync {
    /// The current calendar day.
    fn today(&self) -> StockDate;
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn today(&self) -> StockDate {
        (**self).today()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn today(&self) -> StockDate {
        (**self).today()
    }
}

/// Local wall-clock date.
#[derive(Debug, Default, Copy, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> StockDate {
        StockDate::from(Local::now().date_naive())
    }
}

/// A clock pinned to one day (tests, replays, reports "as of" a date).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FixedClock(pub StockDate);

impl Clock for FixedClock {
    fn today(&self) -> StockDate {
        self.0
    }
}
