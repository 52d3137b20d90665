//! Resolution of a record's effective instant.
//!
//! Records come in two shapes: rows that stored a numeric creation instant and legacy rows that
//! only carry the human readable string shown in the lists. [Dated] exposes which one a record is
//! and [TemporalNormalizer] turns either into a single comparable instant. Nothing downstream
//! branches on the shape again.

use std::borrow::Cow;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use tracing::debug;

use crate::utils::clock::Clock;

/// Instant assigned to records whose legacy string can't be parsed. Sorts before everything.
pub const OLDEST: DateTime<Utc> = DateTime::<Utc>::MIN_UTC;

const MEMO_TIME_FORMAT: &str = "%Y年%m月%d日 %H:%M";
const FULL_DATE_FORMAT: &str = "%Y年%m月%d日";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dating<'a> {
    /// Creation instant stored with the record. Always authoritative.
    Instant(DateTime<Utc>),
    Legacy(LegacyDate<'a>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyDate<'a> {
    /// `<month>月<day>日 <hour>:<minute>`. The year was never stored.
    MemoTime(&'a str),
    /// `<year>年<month>月<day>日`
    FullDate(Cow<'a, str>),
}

/// Implemented by every record that can be placed on a timeline.
pub trait Dated {
    fn dating(&self) -> Dating<'_>;
}

impl<T: Dated + ?Sized> Dated for &T {
    fn dating(&self) -> Dating<'_> {
        (**self).dating()
    }
}

/// Turns [Dating] into instants. Legacy memo strings assume `current_year`, so a memo written in
/// December and read in January lands in the wrong year. That loss is accepted, not corrected.
#[derive(Debug, Clone)]
pub struct TemporalNormalizer<Tz: TimeZone> {
    timezone: Tz,
    current_year: i32,
}

impl TemporalNormalizer<Local> {
    pub fn local(clock: &(impl Clock + ?Sized)) -> Self {
        Self::new(clock, Local)
    }
}

impl<Tz: TimeZone> TemporalNormalizer<Tz> {
    pub fn new(clock: &(impl Clock + ?Sized), timezone: Tz) -> Self {
        let current_year = clock.time().with_timezone(&timezone).year();
        Self::with_year(timezone, current_year)
    }

    pub fn with_year(timezone: Tz, current_year: i32) -> Self {
        Self {
            timezone,
            current_year,
        }
    }

    pub fn timezone(&self) -> &Tz {
        &self.timezone
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    pub fn normalize(&self, record: &impl Dated) -> DateTime<Utc> {
        match record.dating() {
            Dating::Instant(instant) => instant,
            Dating::Legacy(legacy) => self.parse_legacy(&legacy).unwrap_or_else(|| {
                debug!("Unparseable legacy date {legacy:?}, treating as oldest");
                OLDEST
            }),
        }
    }

    /// Parses a legacy string in this normalizer's time zone. Local times that don't exist (DST
    /// gaps) resolve to `None` like any other malformed value.
    pub fn parse_legacy(&self, legacy: &LegacyDate<'_>) -> Option<DateTime<Utc>> {
        let naive = match legacy {
            LegacyDate::MemoTime(text) => parse_memo_time(text, self.current_year)?,
            LegacyDate::FullDate(text) => NaiveDate::parse_from_str(text.trim(), FULL_DATE_FORMAT)
                .ok()?
                .and_time(NaiveTime::MIN),
        };
        self.timezone
            .from_local_datetime(&naive)
            .earliest()
            .map(|v| v.to_utc())
    }

    /// Calendar date of an instant as seen in this normalizer's time zone.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone).date_naive()
    }

    /// Stable sort, newest first. Records with equal instants keep their input order.
    pub fn sort_newest_first<'a, T: Dated>(
        &self,
        records: impl IntoIterator<Item = &'a T>,
    ) -> Vec<&'a T>
    where
        T: 'a,
    {
        let mut keyed = records
            .into_iter()
            .map(|record| (self.normalize(record), record))
            .collect::<Vec<_>>();
        keyed.sort_by(|a, b| b.0.cmp(&a.0));
        keyed.into_iter().map(|(_, record)| record).collect()
    }
}

fn parse_memo_time(text: &str, year: i32) -> Option<NaiveDateTime> {
    let with_year = format!("{year}年{}", text.trim());
    NaiveDateTime::parse_from_str(&with_year, MEMO_TIME_FORMAT)
        .ok()
        .or_else(|| {
            // Some memos were saved with the date only.
            NaiveDate::parse_from_str(&with_year, FULL_DATE_FORMAT)
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

    use crate::{
        storage::entities::{Memo, Transaction},
        utils::{clock::MockClock, logging::TEST_LOGGING},
    };

    use super::{OLDEST, TemporalNormalizer};

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn normalizer_2024() -> TemporalNormalizer<FixedOffset> {
        TemporalNormalizer::with_year(offset(), 2024)
    }

    #[test]
    fn legacy_memo_uses_current_year() {
        *TEST_LOGGING;
        let memo = Memo::legacy("hello", "5月3日 10:00");
        let expected = offset().with_ymd_and_hms(2024, 5, 3, 10, 0, 0).unwrap();

        assert_eq!(normalizer_2024().normalize(&memo), expected.to_utc());
    }

    #[test]
    fn current_year_comes_from_clock() {
        let mut clock = MockClock::new();
        clock
            .expect_time()
            .return_const(Utc.with_ymd_and_hms(2023, 12, 31, 20, 0, 0).unwrap());

        // 20:00 UTC on new year's eve is already 2024 at +08:00
        let normalizer = TemporalNormalizer::new(&clock, offset());
        assert_eq!(normalizer.current_year(), 2024);
    }

    #[test]
    fn stored_instant_is_authoritative() {
        let instant = Utc.with_ymd_and_hms(2022, 1, 2, 3, 4, 5).unwrap();
        let mut memo = Memo::legacy("text", "5月3日 10:00");
        memo.timestamp = Some(instant);

        assert_eq!(normalizer_2024().normalize(&memo), instant);
    }

    #[test]
    fn legacy_transaction_resolves_to_midnight() {
        let transaction = Transaction::legacy(1, "奶茶", 15., "2023年11月9日");
        let expected = offset().with_ymd_and_hms(2023, 11, 9, 0, 0, 0).unwrap();

        assert_eq!(normalizer_2024().normalize(&transaction), expected.to_utc());
    }

    #[test]
    fn transaction_without_date_string_uses_components() {
        let mut transaction = Transaction::legacy(1, "午餐", 20., "");
        transaction.date_string = None;
        transaction.year = Some(2021);
        transaction.month = Some(2);
        transaction.day = Some(28);
        let expected = offset().with_ymd_and_hms(2021, 2, 28, 0, 0, 0).unwrap();

        assert_eq!(normalizer_2024().normalize(&transaction), expected.to_utc());
    }

    #[test]
    fn memo_without_time_part_is_midnight() {
        let memo = Memo::legacy("", "7月14日");
        let expected = offset().with_ymd_and_hms(2024, 7, 14, 0, 0, 0).unwrap();

        assert_eq!(normalizer_2024().normalize(&memo), expected.to_utc());
    }

    #[test]
    fn malformed_strings_sort_as_oldest() {
        *TEST_LOGGING;
        let normalizer = normalizer_2024();
        for time in ["", "yesterday", "13月40日 10:00", "2月30日 8:00"] {
            let memo = Memo::legacy("broken", time);
            assert_eq!(normalizer.normalize(&memo), OLDEST, "{time}");
        }
        let transaction = Transaction::legacy(3, "x", 1., "2024/05/01");
        assert_eq!(normalizer.normalize(&transaction), OLDEST);
    }

    #[test]
    fn sorting_is_newest_first_and_stable() {
        let normalizer = normalizer_2024();
        let same: DateTime<Utc> = offset().with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap().to_utc();
        let mut first = Memo::legacy("first", "");
        first.timestamp = Some(same);
        let mut second = Memo::legacy("second", "");
        second.timestamp = Some(same);
        let newer = Memo::legacy("newer", "4月1日 9:00");
        let broken = Memo::legacy("broken", "???");

        let memos = vec![broken, first, newer, second];
        let sorted = normalizer
            .sort_newest_first(&memos)
            .into_iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>();

        assert_eq!(sorted, vec!["newer", "first", "second", "broken"]);
    }

    #[test]
    fn local_date_follows_timezone() {
        let normalizer = normalizer_2024();
        let instant = Utc.with_ymd_and_hms(2024, 5, 1, 17, 0, 0).unwrap();
        assert_eq!(
            normalizer.local_date(instant),
            NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
        );
    }
}
