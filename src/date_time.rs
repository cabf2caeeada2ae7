//! The composite `DATETIME` element: a typed date, optional time and optional zone.

use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub const DATE_TIME_GENERATION_DATE: &str = "generation_date";
pub const DATE_TIME_AGREEMENT_START_DATE: &str = "agreement_start_date";
pub const DATE_TIME_AGREEMENT_END_DATE: &str = "agreement_end_date";
pub const DATE_TIME_VALID_START_DATE: &str = "valid_start_date";
pub const DATE_TIME_VALID_END_DATE: &str = "valid_end_date";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const MIDNIGHT: &str = "00:00:00";

/// A `DATETIME` element as found in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateTime {
    #[serde(rename = "@type", default)]
    pub kind: String,
    #[serde(rename = "DATE", default)]
    pub date: String,
    #[serde(rename = "TIME", default, skip_serializing_if = "String::is_empty")]
    pub time: String,
    #[serde(rename = "TIMEZONE", default, skip_serializing_if = "String::is_empty")]
    pub time_zone: String,
}

impl DateTime {
    /// Build the element for `instant`. `None` stands for an absent date and yields no element.
    ///
    /// The zone is written as `Z` for instants in [`Utc`] and as `+HH:MM`/`-HH:MM`
    /// otherwise, so a fixed zero offset stays `+00:00`.
    pub fn new<Tz: TimeZone>(kind: &str, instant: Option<chrono::DateTime<Tz>>) -> Option<Self>
    where
        Tz::Offset: std::fmt::Display,
    {
        let instant = instant?;
        // Only the Utc zone displays its offset as "UTC".
        let time_zone = if instant.offset().to_string() == "UTC" {
            "Z".to_string()
        } else {
            instant.format("%:z").to_string()
        };

        Some(Self {
            kind: kind.to_string(),
            date: instant.format(DATE_FORMAT).to_string(),
            time: instant.format(TIME_FORMAT).to_string(),
            time_zone,
        })
    }

    /// Parse date and time (midnight when absent) into an instant.
    ///
    /// The zone string is kept on the record but not applied; the result is read as UTC.
    pub fn to_datetime(&self) -> Result<chrono::DateTime<Utc>, chrono::ParseError> {
        let time = if self.time.is_empty() {
            MIDNIGHT
        } else {
            self.time.as_str()
        };
        let stamp = format!("{} {}", self.date.trim(), time.trim());
        let naive = NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%d %H:%M:%S")?;
        Ok(naive.and_utc())
    }

    /// Like [`DateTime::to_datetime`], falling back to `default` when unparsable.
    pub fn to_datetime_or(&self, default: chrono::DateTime<Utc>) -> chrono::DateTime<Utc> {
        self.to_datetime().unwrap_or(default)
    }
}

/// Sentinels used when a start or end date is absent or malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateBounds {
    pub start: chrono::DateTime<Utc>,
    pub end: chrono::DateTime<Utc>,
}

impl Default for DateBounds {
    fn default() -> Self {
        Self {
            start: midnight_utc(1970, 1, 1),
            end: midnight_utc(2038, 1, 19),
        }
    }
}

fn midnight_utc(year: i32, month: u32, day: u32) -> chrono::DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or_default()
}

/// First date of `kind` in `dates`, parsed, or `default`.
pub(crate) fn find_date_or(
    dates: &[DateTime],
    kind: &str,
    default: chrono::DateTime<Utc>,
) -> chrono::DateTime<Utc> {
    dates
        .iter()
        .find(|d| d.kind == kind)
        .map_or(default, |d| d.to_datetime_or(default))
}
