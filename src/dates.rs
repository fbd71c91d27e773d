//! Widened ISO-8601 date parsing for string-valued date attributes
//!
//! Stock datetime parsing accepts only a couple of layouts; this module
//! recognises the broader ISO-8601 family including week dates, ordinal
//! dates and the compact basic format. Formats are tried in a fixed order
//! and the first match wins, so ambiguous inputs resolve deterministically.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};
use serde_json::Value;

use crate::model::SupportsIso8601Dates;

/// Parse a string in any of the recognised ISO-8601 layouts into a UTC
/// datetime. Returns `None` when no layout matches.
///
/// Date-only layouts resolve to midnight UTC. The layouts are tried in
/// order: calendar date, offset datetime, Zulu datetime, compact basic
/// datetime, ISO week date (with and without weekday), ordinal date, then
/// fractional-second Zulu.
pub fn coerce_iso8601(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return at_midnight(date);
    }

    if let Ok(datetime) = DateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%:z") {
        return Some(datetime.with_timezone(&Utc));
    }

    if let Ok(datetime) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%SZ") {
        return Some(Utc.from_utc_datetime(&datetime));
    }

    if let Ok(datetime) = NaiveDateTime::parse_from_str(input, "%Y%m%dT%H%M%SZ") {
        return Some(Utc.from_utc_datetime(&datetime));
    }

    if let Some(date) = parse_week_date(input) {
        return at_midnight(date);
    }

    if let Some(date) = parse_ordinal_date(input) {
        return at_midnight(date);
    }

    if let Ok(datetime) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.3fZ") {
        return Some(Utc.from_utc_datetime(&datetime));
    }

    // Not strictly ISO-8601 but accepted as fallbacks
    if let Ok(datetime) = DateTime::parse_from_rfc3339(input) {
        return Some(datetime.with_timezone(&Utc));
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&datetime));
    }

    None
}

/// Rewrite each declared date attribute holding a recognised ISO-8601
/// string to canonical RFC 3339. Unrecognised strings and non-string
/// values are left unchanged.
pub fn coerce_date_fields<M: SupportsIso8601Dates>(fields: &mut HashMap<String, Value>) {
    for &attribute in M::date_attributes() {
        let input = match fields.get(attribute) {
            Some(Value::String(value)) => value.clone(),
            _ => continue,
        };

        if let Some(datetime) = coerce_iso8601(&input) {
            fields.insert(attribute.to_string(), Value::String(datetime.to_rfc3339()));
        }
    }
}

fn at_midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt))
}

/// `YYYY-Www` or `YYYY-Www-D` (ISO week numbering, weekday 1 = Monday).
/// Without an explicit weekday the week's Monday is taken.
fn parse_week_date(input: &str) -> Option<NaiveDate> {
    let (year_part, rest) = input.split_once("-W")?;
    let year: i32 = year_part.parse().ok()?;
    if year_part.len() != 4 {
        return None;
    }

    let (week_part, weekday) = match rest.split_once('-') {
        Some((week, day)) => (week, parse_iso_weekday(day)?),
        None => (rest, Weekday::Mon),
    };

    if week_part.len() != 2 {
        return None;
    }
    let week: u32 = week_part.parse().ok()?;

    NaiveDate::from_isoywd_opt(year, week, weekday)
}

fn parse_iso_weekday(day: &str) -> Option<Weekday> {
    match day {
        "1" => Some(Weekday::Mon),
        "2" => Some(Weekday::Tue),
        "3" => Some(Weekday::Wed),
        "4" => Some(Weekday::Thu),
        "5" => Some(Weekday::Fri),
        "6" => Some(Weekday::Sat),
        "7" => Some(Weekday::Sun),
        _ => None,
    }
}

/// `YYYY-DDD` with a zero-based day of year, so `2016-000` is January 1st
/// and `2016-150` is May 30th.
fn parse_ordinal_date(input: &str) -> Option<NaiveDate> {
    let (year_part, day_part) = input.split_once('-')?;
    if year_part.len() != 4 || day_part.len() != 3 {
        return None;
    }

    let year: i32 = year_part.parse().ok()?;
    let day: u32 = day_part.parse().ok()?;

    NaiveDate::from_yo_opt(year, day + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn date_of(input: &str) -> NaiveDate {
        coerce_iso8601(input).unwrap().date_naive()
    }

    #[test]
    fn test_calendar_date_resolves_to_midnight_utc() {
        let parsed = coerce_iso8601("2016-05-30").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2016-05-30T00:00:00+00:00");
    }

    #[test]
    fn test_offset_datetime_normalizes_to_utc() {
        let parsed = coerce_iso8601("2016-05-30T14:30:00+02:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2016-05-30T12:30:00+00:00");
    }

    #[test]
    fn test_zulu_datetime() {
        let parsed = coerce_iso8601("2016-05-30T14:30:00Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2016-05-30T14:30:00+00:00");
    }

    #[test]
    fn test_compact_basic_datetime() {
        let parsed = coerce_iso8601("20160530T143000Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2016-05-30T14:30:00+00:00");
    }

    #[test]
    fn test_week_date_without_weekday_takes_monday() {
        // Week 21 of 2016 starts Monday May 23rd
        assert_eq!(date_of("2016-W21"), NaiveDate::from_ymd_opt(2016, 5, 23).unwrap());
    }

    #[test]
    fn test_week_date_with_weekday() {
        // Wednesday of week 21
        assert_eq!(date_of("2016-W21-3"), NaiveDate::from_ymd_opt(2016, 5, 25).unwrap());
    }

    #[test]
    fn test_ordinal_date_is_zero_based() {
        assert_eq!(date_of("2016-150"), NaiveDate::from_ymd_opt(2016, 5, 30).unwrap());
        assert_eq!(date_of("2016-000"), NaiveDate::from_ymd_opt(2016, 1, 1).unwrap());
    }

    #[test]
    fn test_fractional_second_zulu() {
        let parsed = coerce_iso8601("2016-05-30T14:30:00.123Z").unwrap();
        assert_eq!(parsed.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn test_plain_datetime_fallback() {
        let parsed = coerce_iso8601("2016-05-30 14:30:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2016-05-30T14:30:00+00:00");
    }

    #[test]
    fn test_unrecognised_input_yields_none() {
        assert!(coerce_iso8601("30/05/2016").is_none());
        assert!(coerce_iso8601("not a date").is_none());
        assert!(coerce_iso8601("").is_none());
    }

    #[test]
    fn test_format_order_resolves_ambiguity() {
        // A bare calendar date must not be mistaken for a week or ordinal date
        let parsed = date_of("2016-05-30");
        assert_eq!((parsed.year(), parsed.month(), parsed.day()), (2016, 5, 30));
    }

    #[test]
    fn test_coerce_date_fields_normalizes_declared_attributes() {
        use crate::error::ToolsResult;
        use crate::model::Model;
        use serde::{Deserialize, Serialize};
        use std::collections::HashMap;

        #[derive(Debug, Clone, Serialize, Deserialize)]
        struct Event {
            id: Option<i64>,
        }

        impl Model for Event {
            type PrimaryKey = i64;

            fn table_name() -> &'static str {
                "events"
            }

            fn primary_key(&self) -> Option<i64> {
                self.id
            }

            fn set_primary_key(&mut self, key: i64) {
                self.id = Some(key);
            }

            fn from_row(_row: &sqlx::postgres::PgRow) -> ToolsResult<Self> {
                unimplemented!("not exercised in tests")
            }

            fn to_fields(&self) -> HashMap<String, Value> {
                HashMap::new()
            }
        }

        impl SupportsIso8601Dates for Event {
            fn date_attributes() -> &'static [&'static str] {
                &["starts_at"]
            }
        }

        let mut fields = HashMap::new();
        fields.insert("starts_at".to_string(), Value::String("2016-W21".to_string()));
        fields.insert("name".to_string(), Value::String("2016-W21".to_string()));
        fields.insert("broken".to_string(), Value::String("not a date".to_string()));

        coerce_date_fields::<Event>(&mut fields);

        assert_eq!(
            fields.get("starts_at").unwrap(),
            &Value::String("2016-05-23T00:00:00+00:00".to_string())
        );
        // Undeclared attributes stay verbatim even when they parse
        assert_eq!(fields.get("name").unwrap(), &Value::String("2016-W21".to_string()));
        assert_eq!(
            fields.get("broken").unwrap(),
            &Value::String("not a date".to_string())
        );
    }
}
