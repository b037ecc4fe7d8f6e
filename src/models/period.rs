// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar month used as the fetch and cache granularity.

use crate::error::AppError;
use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// A `(year, month)` pair, always a valid calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self, AppError> {
        if !(1..=12).contains(&month) {
            return Err(AppError::BadRequest(format!(
                "Invalid month {}: must be 1-12",
                month
            )));
        }
        if !(1..=9999).contains(&year) {
            return Err(AppError::BadRequest(format!("Invalid year {}", year)));
        }
        Ok(Self { year, month })
    }

    /// Parse path segments such as `("2025", "02")`.
    pub fn from_segments(year: &str, month: &str) -> Result<Self, AppError> {
        let year = year
            .parse::<i32>()
            .map_err(|_| AppError::BadRequest(format!("Invalid year '{}'", year)))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| AppError::BadRequest(format!("Invalid month '{}'", month)))?;
        Self::new(year, month)
    }

    /// The period a date falls in.
    pub fn of_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Cache key, `"YYYY-MM"`.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Month as a zero-padded path segment (`"02"`).
    pub fn month_segment(&self) -> String {
        format!("{:02}", self.month)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Date for a day-of-month within this period, if that day exists.
    pub fn day(&self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| AppError::BadRequest(format!("Invalid period '{}'", s)))?;
        Self::from_segments(year, month)
    }
}
