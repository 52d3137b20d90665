use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{CommandFactory, ValueEnum};

use crate::aggregation::range::DayRange;

use super::Args;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum DateStyle {
    #[default]
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct RangeArgs {
    #[arg(
        long = "start",
        short,
        help = "First day of the range, inclusive. Examples are \"yesterday\", \"last monday\", \"15/03/2025\""
    )]
    pub start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = "Last day of the range, inclusive. Examples are \"today\", \"3 days ago\", \"31/03/2025\""
    )]
    pub end_date: Option<String>,
}

impl RangeArgs {
    /// Missing bounds stay missing. An unbounded range means no filtering.
    pub fn to_day_range(&self, style: DateStyle, now: DateTime<Local>) -> Result<DayRange> {
        Ok(DayRange::new(
            parse_day(self.start_date.as_deref(), "start", style, now)?,
            parse_day(self.end_date.as_deref(), "end", style, now)?,
        ))
    }

    /// Same as [RangeArgs::to_day_range] but both bounds must be present.
    pub fn to_bounded_range(&self, style: DateStyle, now: DateTime<Local>) -> Result<DayRange> {
        let range = self.to_day_range(style, now)?;
        if !range.is_bounded() {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::MissingRequiredArgument,
                    "Both --start and --end are required",
                )
                .into());
        }
        Ok(range)
    }
}

fn parse_day(
    value: Option<&str>,
    name: &str,
    style: DateStyle,
    now: DateTime<Local>,
) -> Result<Option<NaiveDate>> {
    let Some(value) = value else {
        return Ok(None);
    };
    match parse_date_string(value, now, style.into()) {
        Ok(v) => Ok(Some(v.with_timezone(&Local).date_naive())),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate {name} date {e}"),
            )
            .into()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, NaiveDate, TimeZone};

    use super::{DateStyle, RangeArgs};

    fn args(start: Option<&str>, end: Option<&str>) -> RangeArgs {
        RangeArgs {
            start_date: start.map(str::to_string),
            end_date: end.map(str::to_string),
        }
    }

    #[test]
    fn parses_dialects() {
        let now = Local.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap();
        let range = args(Some("02/03/2025"), Some("yesterday"))
            .to_day_range(DateStyle::Uk, now)
            .unwrap();

        assert_eq!(range.start, NaiveDate::from_ymd_opt(2025, 3, 2));
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2025, 3, 19));

        let range = args(Some("02/03/2025"), None)
            .to_day_range(DateStyle::Us, now)
            .unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2025, 2, 3));
        assert_eq!(range.end, None);
    }

    #[test]
    fn rejects_garbage_and_missing_bounds() {
        let now = Local.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap();

        assert!(args(Some("not a date at all"), None)
            .to_day_range(DateStyle::Uk, now)
            .is_err());
        assert!(args(Some("today"), None)
            .to_bounded_range(DateStyle::Uk, now)
            .is_err());
        assert!(args(None, None).to_day_range(DateStyle::Uk, now).is_ok());
    }
}
