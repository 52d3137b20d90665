use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::temporal::{Dated, TemporalNormalizer};

/// Inclusive range of whole days. A missing bound means no filtering at all, it is not an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// [DayRange] pinned to instants: start of the first day through the end of the last day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ResolvedRange {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

impl DayRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(Some(start), Some(end))
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_bounded(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// Returns `None` when a bound is missing. A day starts at its first valid local time and
    /// ends one nanosecond before the next day starts, so midnights skipped or repeated by DST
    /// transitions are handled.
    pub fn resolve<Tz: TimeZone>(&self, timezone: &Tz) -> Option<ResolvedRange> {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return None;
        };
        let bounds = first_instant(timezone, start).zip(
            end.succ_opt()
                .and_then(|next| first_instant(timezone, next))
                .map(|next| next - Duration::nanoseconds(1)),
        );
        match bounds {
            Some((start, end)) => Some(ResolvedRange { start, end }),
            None => {
                warn!("Couldn't resolve day range {self:?}, leaving records unfiltered");
                None
            }
        }
    }
}

/// Earliest instant whose local date is `date`. Midnight may fall into a DST gap, in which case
/// the day starts when the gap ends.
fn first_instant<Tz: TimeZone>(timezone: &Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    let mut local = date.and_time(NaiveTime::MIN);
    while local.date() == date {
        if let Some(instant) = timezone.from_local_datetime(&local).earliest() {
            return Some(instant.to_utc());
        }
        local += Duration::minutes(1);
    }
    None
}

/// Records whose normalized instant lies within `range`, in input order.
pub fn filter_by_range<'a, T: Dated, Tz: TimeZone>(
    records: impl IntoIterator<Item = &'a T>,
    range: &DayRange,
    normalizer: &TemporalNormalizer<Tz>,
) -> Vec<&'a T>
where
    T: 'a,
{
    let Some(bounds) = range.resolve(normalizer.timezone()) else {
        return records.into_iter().collect();
    };
    records
        .into_iter()
        .filter(|record| bounds.contains(normalizer.normalize(*record)))
        .collect()
}
