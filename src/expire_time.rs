//! Resolution of the reference time certificates are checked against.
//!
//! With no input the reference time is two weeks from now, truncated to the
//! hour. Otherwise the input is tried against [`DATE_FORMATS`] in order and
//! the first format that parses wins.

use crate::error::ExpiringCertsError;
use chrono::{DateTime, Duration, DurationRound, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// How far ahead of now the default reference time lies.
pub const DEFAULT_EXPIRE_DAYS: i64 = 14;

/// A timestamp layout accepted by `--expire`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `Mon Jan _2 15:04:05 MST 2006`
    UnixDate,
    /// `2006-01-02T15:04:05Z07:00`
    Rfc3339,
    /// `2006-01-02T15:04:05.999999999Z07:00`
    Rfc3339Nano,
    /// `Mon, 02 Jan 2006 15:04:05 MST`
    Rfc1123,
    /// `Mon, 02 Jan 2006 15:04:05 -0700`
    Rfc1123Z,
    /// `02 Jan 06 15:04 MST`
    Rfc822,
    /// `02 Jan 06 15:04 -0700`
    Rfc822Z,
    /// `Monday, 02-Jan-06 15:04:05 MST`
    Rfc850,
}

/// Accepted layouts, in the order they are tried.
pub const DATE_FORMATS: [DateFormat; 8] = [
    DateFormat::UnixDate,
    DateFormat::Rfc3339,
    DateFormat::Rfc3339Nano,
    DateFormat::Rfc1123,
    DateFormat::Rfc1123Z,
    DateFormat::Rfc822,
    DateFormat::Rfc822Z,
    DateFormat::Rfc850,
];

const SHORT_WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const LONG_WEEKDAYS: [&str; 7] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];

/// Where the zone abbreviation sits among the whitespace separated fields.
enum ZoneField {
    Last,
    SecondToLast,
}

impl DateFormat {
    pub fn name(&self) -> &'static str {
        match self {
            DateFormat::UnixDate => "UnixDate",
            DateFormat::Rfc3339 => "RFC3339",
            DateFormat::Rfc3339Nano => "RFC3339Nano",
            DateFormat::Rfc1123 => "RFC1123",
            DateFormat::Rfc1123Z => "RFC1123Z",
            DateFormat::Rfc822 => "RFC822",
            DateFormat::Rfc822Z => "RFC822Z",
            DateFormat::Rfc850 => "RFC850",
        }
    }

    /// Parse `input` with this layout only.
    pub fn parse(&self, input: &str) -> Option<DateTime<Utc>> {
        match self {
            DateFormat::UnixDate => {
                let rest = strip_weekday(input, &SHORT_WEEKDAYS, "")?;
                parse_named_zone(rest, "%b %e %H:%M:%S %Y", ZoneField::SecondToLast)
            }
            DateFormat::Rfc3339 => {
                if input.contains('.') {
                    return None;
                }
                DateTime::parse_from_rfc3339(input).ok().map(|t| t.with_timezone(&Utc))
            }
            DateFormat::Rfc3339Nano => DateTime::parse_from_rfc3339(input).ok().map(|t| t.with_timezone(&Utc)),
            DateFormat::Rfc1123 => {
                let rest = strip_weekday(input, &SHORT_WEEKDAYS, ",")?;
                parse_named_zone(rest, "%d %b %Y %H:%M:%S", ZoneField::Last)
            }
            DateFormat::Rfc1123Z => {
                let rest = strip_weekday(input, &SHORT_WEEKDAYS, ",")?;
                parse_numeric_zone(rest, "%d %b %Y %H:%M:%S %z")
            }
            DateFormat::Rfc822 => parse_named_zone(input, "%d %b %y %H:%M", ZoneField::Last),
            DateFormat::Rfc822Z => parse_numeric_zone(input, "%d %b %y %H:%M %z"),
            DateFormat::Rfc850 => {
                let rest = strip_weekday(input, &LONG_WEEKDAYS, ",")?;
                parse_named_zone(rest, "%d-%b-%y %H:%M:%S", ZoneField::Last)
            }
        }
    }
}

/// Reference time used when `--expire` is not given.
pub fn default_expire_time() -> DateTime<Utc> {
    default_expire_time_from(Utc::now())
}

/// `now` plus two weeks, truncated to the hour.
pub fn default_expire_time_from(now: DateTime<Utc>) -> DateTime<Utc> {
    let expire = now + Duration::days(DEFAULT_EXPIRE_DAYS);
    // Truncating to whole hours cannot fail for any representable time.
    expire.duration_trunc(Duration::hours(1)).unwrap_or(expire)
}

/// Resolve the reference time from an optional user supplied string.
pub fn resolve_expire_time(input: Option<&str>) -> Result<DateTime<Utc>, ExpiringCertsError> {
    match input.map(str::trim) {
        None | Some("") => Ok(default_expire_time()),
        Some(value) => parse_expire_time(value),
    }
}

/// Parse a user supplied timestamp against every accepted layout.
pub fn parse_expire_time(input: &str) -> Result<DateTime<Utc>, ExpiringCertsError> {
    let input = input.trim();
    for format in DATE_FORMATS.iter() {
        if let Some(expire) = format.parse(input) {
            tracing::debug!(format = format.name(), %expire, "parsed expire time");
            return Ok(expire);
        }
    }
    Err(ExpiringCertsError::InvalidDateFormat(input.to_string()))
}

/// Remove the leading weekday field and its `separator`.
///
/// The name has to be a valid weekday but is not checked against the date
/// that follows.
fn strip_weekday<'a>(input: &'a str, names: &[&str], separator: &str) -> Option<&'a str> {
    let (field, rest) = input.split_once(char::is_whitespace)?;
    let name = field.strip_suffix(separator)?;
    names.iter().any(|n| n.eq_ignore_ascii_case(name)).then_some(rest)
}

fn parse_numeric_zone(input: &str, fmt: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(input, fmt).ok().map(|t| t.with_timezone(&Utc))
}

fn parse_named_zone(input: &str, fmt: &str, zone_field: ZoneField) -> Option<DateTime<Utc>> {
    let mut fields: Vec<&str> = input.split_whitespace().collect();
    let zone_index = match zone_field {
        ZoneField::Last => fields.len().checked_sub(1)?,
        ZoneField::SecondToLast => fields.len().checked_sub(2)?,
    };
    let offset = zone_offset(fields.remove(zone_index))?;
    let naive = NaiveDateTime::parse_from_str(&fields.join(" "), fmt).ok()?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|t| t.with_timezone(&Utc))
}

/// Offset for an alphabetic zone abbreviation.
///
/// Unknown abbreviations are taken as UTC. Anything that is not an
/// abbreviation (numeric offsets included) is rejected.
fn zone_offset(abbreviation: &str) -> Option<FixedOffset> {
    if abbreviation.is_empty() || !abbreviation.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let hours = match abbreviation.to_ascii_uppercase().as_str() {
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        _ => 0,
    };
    FixedOffset::east_opt(hours * 3600)
}
