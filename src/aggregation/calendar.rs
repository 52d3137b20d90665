//! Month grids for the expense and memo calendars.
//!
//! A grid is a flat sequence read row by row in 7 columns. It starts with one blank per weekday
//! before the 1st (weeks start on Sunday) and has no trailing padding, so its length is always
//! `leading blanks + days in month`.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, TimeZone};
use serde::Serialize;
use tracing::warn;

use crate::storage::entities::{Memo, Transaction};

use super::temporal::TemporalNormalizer;

pub const WEEK_LENGTH: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GridCell<P> {
    Blank,
    Day {
        day: u32,
        is_today: bool,
        payload: Option<P>,
    },
}

impl<P> GridCell<P> {
    pub fn day(&self) -> Option<u32> {
        match self {
            GridCell::Blank => None,
            GridCell::Day { day, .. } => Some(*day),
        }
    }

    pub fn payload(&self) -> Option<&P> {
        match self {
            GridCell::Blank => None,
            GridCell::Day { payload, .. } => payload.as_ref(),
        }
    }
}

/// The picture shown on a memo calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeaturedMemo {
    pub image: String,
    pub text: String,
    pub time: String,
}

pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((next - first).num_days() as u32)
}

/// Weekday index of the 1st, 0 for Sunday.
pub fn leading_blanks(year: i32, month: u32) -> Option<u32> {
    NaiveDate::from_ymd_opt(year, month, 1).map(|first| first.weekday().num_days_from_sunday())
}

/// Lays `payloads` (keyed by day of month) onto the grid. Payloads for days the month doesn't
/// have are ignored. An invalid month produces an empty grid.
pub fn build_grid<P>(
    year: i32,
    month: u32,
    today: Option<NaiveDate>,
    mut payloads: HashMap<u32, P>,
) -> Vec<GridCell<P>> {
    let (Some(blanks), Some(days)) = (leading_blanks(year, month), days_in_month(year, month))
    else {
        warn!("Can't build a calendar for {year}-{month}");
        return vec![];
    };
    let today = today
        .filter(|v| v.year() == year && v.month() == month)
        .map(|v| v.day());

    let mut cells = Vec::with_capacity((blanks + days) as usize);
    cells.extend((0..blanks).map(|_| GridCell::Blank));
    cells.extend((1..=days).map(|day| GridCell::Day {
        day,
        is_today: today == Some(day),
        payload: payloads.remove(&day),
    }));
    cells
}

/// Expense calendar: each day carries the sum of that day's transactions.
pub fn expense_calendar<'a, Tz: TimeZone>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    year: i32,
    month: u32,
    today: Option<NaiveDate>,
    normalizer: &TemporalNormalizer<Tz>,
) -> Vec<GridCell<f64>> {
    let mut totals = HashMap::<u32, f64>::new();
    for transaction in transactions {
        let date = normalizer.local_date(normalizer.normalize(transaction));
        if date.year() == year && date.month() == month {
            *totals.entry(date.day()).or_default() += transaction.money;
        }
    }
    build_grid(year, month, today, totals)
}

/// Memo calendar: each day features the first memo with an image in newest first order.
pub fn memo_calendar<'a, Tz: TimeZone>(
    memos: impl IntoIterator<Item = &'a Memo>,
    year: i32,
    month: u32,
    today: Option<NaiveDate>,
    normalizer: &TemporalNormalizer<Tz>,
) -> Vec<GridCell<FeaturedMemo>> {
    let mut featured = HashMap::<u32, FeaturedMemo>::new();
    for memo in normalizer.sort_newest_first(memos) {
        let Some(image) = memo.image() else {
            continue;
        };
        let date = normalizer.local_date(normalizer.normalize(memo));
        if date.year() == year && date.month() == month {
            featured.entry(date.day()).or_insert_with(|| FeaturedMemo {
                image: image.to_string(),
                text: memo.text.clone(),
                time: memo.time.clone(),
            });
        }
    }
    build_grid(year, month, today, featured)
}
