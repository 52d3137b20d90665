use std::{borrow::Cow, fmt};

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    aggregation::temporal::{Dated, Dating, LegacyDate},
    utils::time::{date_to_display, datetime_to_memo_time, ymd_to_display},
};

/// A single expense. The field names match the blobs written by earlier versions, which is why
/// several of them are optional: old rows may carry only `year/month/day` or only `dateString`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub item: String,
    pub money: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn new<Tz: TimeZone>(id: i64, item: &str, money: f64, moment: DateTime<Tz>) -> Self {
        let date = moment.date_naive();
        Self {
            id,
            item: item.to_string(),
            money,
            date_string: Some(date_to_display(date)),
            year: Some(date.year()),
            month: Some(date.month()),
            day: Some(date.day()),
            timestamp: Some(moment.to_utc()),
        }
    }

    /// Row as written before instants were stored.
    pub fn legacy(id: i64, item: &str, money: f64, date_string: &str) -> Self {
        Self {
            id,
            item: item.to_string(),
            money,
            date_string: Some(date_string.to_string()),
            year: None,
            month: None,
            day: None,
            timestamp: None,
        }
    }

    /// Date shown above the row and used as its day bucket.
    pub fn display_date(&self) -> Cow<'_, str> {
        match (&self.date_string, self.year, self.month, self.day) {
            (Some(date), ..) if !date.is_empty() => Cow::Borrowed(date),
            (_, Some(year), Some(month), Some(day)) => Cow::Owned(ymd_to_display(year, month, day)),
            _ => Cow::Borrowed(""),
        }
    }
}

impl Dated for Transaction {
    fn dating(&self) -> Dating<'_> {
        match self.timestamp {
            Some(instant) => Dating::Instant(instant),
            None => Dating::Legacy(LegacyDate::FullDate(self.display_date())),
        }
    }
}

/// A note with an optional picture. `timestamp` is missing on memos written before instants were
/// stored, those only have `time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memo {
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub text: String,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub time: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Memo {
    pub fn new<Tz: TimeZone>(text: &str, image: Option<String>, moment: DateTime<Tz>) -> Self {
        Self {
            text: text.to_string(),
            time: datetime_to_memo_time(moment.naive_local()),
            image: image.filter(|v| !v.is_empty()),
            timestamp: Some(moment.to_utc()),
        }
    }

    pub fn legacy(text: &str, time: &str) -> Self {
        Self {
            text: text.to_string(),
            time: time.to_string(),
            image: None,
            timestamp: None,
        }
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref().filter(|v| !v.is_empty())
    }

    /// `"5月3日 10:00"` → `"5月3日"`
    pub fn display_day(&self) -> &str {
        self.time
            .split_once(' ')
            .map_or(self.time.as_str(), |(day, _)| day)
    }
}

impl Dated for Memo {
    fn dating(&self) -> Dating<'_> {
        match self.timestamp {
            Some(instant) => Dating::Instant(instant),
            None => Dating::Legacy(LegacyDate::MemoTime(&self.time)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

pub const MASKED_SECRET: &str = "******";

/// Stored in clear text. [fmt::Debug] masks the secret so it never reaches the logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: i64,
    pub title: String,
    pub account: String,
    pub secret: String,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub url: String,
}

impl Credential {
    pub fn url(&self) -> Option<&str> {
        Some(self.url.as_str()).filter(|v| !v.is_empty())
    }

    pub fn shown_secret(&self, reveal: bool) -> &str {
        if reveal {
            &self.secret
        } else {
            MASKED_SECRET
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("account", &self.account)
            .field("secret", &MASKED_SECRET)
            .field("url", &self.url)
            .finish()
    }
}

pub const DEFAULT_THEME_COLOR: &str = "#007aff";
/// Stored when a title is edited to blank text.
pub const PLACEHOLDER_TITLE: &str = "我的标题";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Titles {
    pub accounting: String,
    pub memo: String,
}

impl Default for Titles {
    fn default() -> Self {
        Self {
            accounting: "💰 本月支出".into(),
            memo: "📝 个人动态".into(),
        }
    }
}

/// Persisted wholesale. Partial blobs are completed with defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub color: String,
    pub gradient: bool,
    pub titles: Titles,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            color: DEFAULT_THEME_COLOR.into(),
            gradient: true,
            titles: Titles::default(),
        }
    }
}

/// Old blobs sometimes hold `null` where a string is expected.
mod nullable {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }
}
