use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::errors::{PrepError, Result};

/// Step unit of a CF-style time coordinate ("hours since ...").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Length of one step in seconds.
    pub fn seconds(self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 3600.0,
            TimeUnit::Days => 86400.0,
        }
    }

    fn parse(token: &str) -> Option<Self> {
        match token.trim_end_matches('s') {
            "second" | "sec" => Some(TimeUnit::Seconds),
            "minute" | "min" => Some(TimeUnit::Minutes),
            "hour" | "hr" | "h" => Some(TimeUnit::Hours),
            "day" | "d" => Some(TimeUnit::Days),
            _ => None,
        }
    }
}

/// Parsed `"<unit> since <base>"` declaration of a time coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeEncoding {
    pub unit: TimeUnit,
    pub base: DateTime<Utc>,
}

impl TimeEncoding {
    /// Turn a single coordinate value into an absolute timestamp.
    pub fn decode(&self, value: f64) -> DateTime<Utc> {
        let seconds = value * self.unit.seconds();
        self.base + Duration::milliseconds((seconds * 1000.0).round() as i64)
    }
}

/// Parse a CF units string such as `"hours since 1900-01-01 00:00:00"`.
///
/// The base may be a bare date or a date with a time-of-day; both the space
/// and the `T` separator are accepted.
pub fn parse_time_units(units: &str) -> Result<TimeEncoding> {
    let parts: Vec<&str> = units.trim().splitn(3, ' ').collect();
    if parts.len() < 3 || parts[1] != "since" {
        return Err(PrepError::InvalidParameter(format!(
            "unexpected time units format: '{}'",
            units
        )));
    }

    let unit = TimeUnit::parse(&parts[0].to_ascii_lowercase()).ok_or_else(|| {
        PrepError::InvalidParameter(format!("unknown time unit '{}' in '{}'", parts[0], units))
    })?;

    let base = parse_base_datetime(parts[2].trim()).ok_or_else(|| {
        PrepError::InvalidParameter(format!("cannot parse base date '{}' in '{}'", parts[2], units))
    })?;

    Ok(TimeEncoding { unit, base })
}

fn parse_base_datetime(text: &str) -> Option<DateTime<Utc>> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
    ];

    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc());
        }
    }

    // Bare date, midnight implied. Ignore a trailing zone suffix if present.
    let date_part = text.split_whitespace().next()?;
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// Decode every coordinate value against the given units string.
pub fn decode_time(values: &[f64], units: &str) -> Result<Vec<DateTime<Utc>>> {
    let encoding = parse_time_units(units)?;
    Ok(values.iter().map(|&v| encoding.decode(v)).collect())
}

/// Day-resolution stamp in `YYYY-MM-DD` form.
pub fn day_stamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d").to_string()
}

/// Day stamps for the minimum and maximum of a time coordinate.
///
/// The coordinate does not have to be sorted; the span is taken over the
/// smallest and largest values.
pub fn time_span_stamps(values: &[f64], units: &str) -> Result<(String, String)> {
    if values.is_empty() {
        return Err(PrepError::InvalidParameter(
            "time coordinate is empty; no span can be derived".to_string(),
        ));
    }

    let encoding = parse_time_units(units)?;
    let mut min = values[0];
    let mut max = values[0];
    for &v in &values[1..] {
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }

    Ok((
        day_stamp(&encoding.decode(min)),
        day_stamp(&encoding.decode(max)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units_with_time_of_day() {
        let enc = parse_time_units("hours since 1900-01-01 00:00:00").unwrap();
        assert_eq!(enc.unit, TimeUnit::Hours);
        assert_eq!(day_stamp(&enc.base), "1900-01-01");
    }

    #[test]
    fn test_parse_units_bare_date() {
        let enc = parse_time_units("days since 2020-01-01").unwrap();
        assert_eq!(enc.unit, TimeUnit::Days);
        assert_eq!(day_stamp(&enc.decode(2.0)), "2020-01-03");
    }

    #[test]
    fn test_parse_units_rejects_garbage() {
        assert!(parse_time_units("fortnights since 2020-01-01").is_err());
        assert!(parse_time_units("hours 2020-01-01").is_err());
        assert!(parse_time_units("").is_err());
    }

    #[test]
    fn test_decode_fractional_days() {
        let enc = parse_time_units("days since 2020-06-01").unwrap();
        let dt = enc.decode(0.5);
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2020-06-01 12:00");
    }
}
