use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// This is the standard way of converting a date to a display string in daybook. Transactions
/// are grouped by this string, so it must stay stable across versions.
pub fn date_to_display(date: NaiveDate) -> String {
    ymd_to_display(date.year(), date.month(), date.day())
}

/// Same as [date_to_display] for rows that only kept their date components.
pub fn ymd_to_display(year: i32, month: u32, day: u32) -> String {
    format!("{year}年{month}月{day}日")
}

/// Display string of a memo. The year is omitted, which is why legacy memos need
/// [crate::aggregation::temporal::TemporalNormalizer] to guess it.
pub fn datetime_to_memo_time(moment: NaiveDateTime) -> String {
    format!(
        "{}月{}日 {}:{:02}",
        moment.month(),
        moment.day(),
        moment.hour(),
        moment.minute()
    )
}

pub fn month_label(year: i32, month: u32) -> String {
    format!("{year}年{month}月")
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::{date_to_display, datetime_to_memo_time, month_label};

    #[test]
    fn display_strings_are_not_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(date_to_display(date), "2024年5月1日");
        assert_eq!(month_label(2024, 5), "2024年5月");
    }

    #[test]
    fn memo_time_pads_minutes_only() {
        let moment = NaiveDate::from_ymd_opt(2024, 5, 3)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(9, 5, 0).unwrap());
        assert_eq!(datetime_to_memo_time(moment), "5月3日 9:05");
    }
}
