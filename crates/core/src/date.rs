//! Calendar dates at day granularity, written `dd/mm/yyyy`.
//!
//! Validation is deliberately loose: each field is range-checked (day 1..=31,
//! month 1..=12, four-digit year) but the combination is not checked against a
//! real calendar, so `31/02/2025` is accepted. Ordering is by (year, month, day),
//! which keeps comparisons total and deterministic even for such dates.

use core::fmt;
use core::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DomainError;

/// A movement or expiry date.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StockDate {
    // Field order matters: derived `Ord` compares year, then month, then day.
    year: u16,
    month: u8,
    day: u8,
}

impl StockDate {
    /// Lower bound used for open-ended history queries.
    pub const EPOCH: StockDate = StockDate {
        year: 1900,
        month: 1,
        day: 1,
    };

    /// Build a date from its fields, applying the same range checks as [`StockDate::parse`].
    pub fn new(day: u8, month: u8, year: u16) -> Result<Self, DomainError> {
        if !(1..=31).contains(&day) {
            return Err(DomainError::invalid_date(format!("day {day} out of range")));
        }
        if !(1..=12).contains(&month) {
            return Err(DomainError::invalid_date(format!("month {month} out of range")));
        }
        if year > 9999 {
            return Err(DomainError::invalid_date(format!("year {year} is not four digits")));
        }
        Ok(Self { year, month, day })
    }

    /// Parse `dd/mm/yyyy`.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::invalid_date(format!("'{input}' is not dd/mm/yyyy"));

        if input.trim().is_empty() {
            return Err(invalid());
        }

        let mut parts = input.split('/');
        let (Some(day), Some(month), Some(year), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        if year.len() != 4 {
            return Err(invalid());
        }

        let day = parse_field::<u8>(day).ok_or_else(invalid)?;
        let month = parse_field::<u8>(month).ok_or_else(invalid)?;
        let year = parse_field::<u16>(year).ok_or_else(invalid)?;

        Self::new(day, month, year)
    }

    pub fn day(self) -> u8 {
        self.day
    }

    pub fn month(self) -> u8 {
        self.month
    }

    pub fn year(self) -> u16 {
        self.year
    }

    /// Convert to a real calendar date, if the fields form one.
    pub fn to_naive(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(i32::from(self.year), u32::from(self.month), u32::from(self.day))
    }
}

fn parse_field<T: FromStr>(field: &str) -> Option<T> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

impl From<NaiveDate> for StockDate {
    fn from(value: NaiveDate) -> Self {
        // chrono keeps month/day in range; years outside 0..=9999 are clamped.
        Self {
            year: value.year().clamp(0, 9999) as u16,
            month: value.month() as u8,
            day: value.day() as u8,
        }
    }
}

impl fmt::Display for StockDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}/{:04}", self.day, self.month, self.year)
    }
}

impl FromStr for StockDate {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for StockDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StockDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
