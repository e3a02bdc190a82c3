//! Parsing of human-readable duration text returned by routing services.
//!
//! Distance matrix responses carry durations such as `"12 mins"`,
//! `"1 hour 5 mins"` or `"1 day 3 hours"`. Every quantity/unit pair is
//! summed into a single value in minutes.

use std::sync::LazyLock;

use regex::Regex;

use crate::RoutingError;

static COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]+(?:\.[0-9]+)?)[ \t]*([a-z]+)").unwrap_or_else(|_| unreachable!())
});

/// Minutes represented by one of `unit`, or `None` for unknown units.
fn unit_minutes(unit: &str) -> Option<f64> {
    match unit {
        "day" | "days" | "d" => Some(1440.0),
        "hour" | "hours" | "hr" | "hrs" | "h" => Some(60.0),
        "min" | "mins" | "minute" | "minutes" | "m" => Some(1.0),
        "sec" | "secs" | "second" | "seconds" | "s" => Some(1.0 / 60.0),
        _ => None,
    }
}

/// Converts duration text to minutes.
///
/// # Errors
///
/// Returns [`RoutingError::Duration`] if the text is empty, contains an
/// unknown unit, or has characters outside quantity/unit pairs.
pub fn parse_duration_minutes(text: &str) -> Result<f64, RoutingError> {
    let lowered = text.trim().to_ascii_lowercase();
    let err = || RoutingError::Duration {
        text: text.to_string(),
    };

    let mut total = 0.0;
    let mut matched_any = false;
    let mut last_end = 0;

    for caps in COMPONENT.captures_iter(&lowered) {
        let whole = caps.get(0).ok_or_else(err)?;
        if !lowered[last_end..whole.start()].trim().is_empty() {
            return Err(err());
        }
        last_end = whole.end();

        let quantity: f64 = caps[1].parse().map_err(|_| err())?;
        let minutes = unit_minutes(&caps[2]).ok_or_else(err)?;
        total += quantity * minutes;
        matched_any = true;
    }

    if !matched_any || !lowered[last_end..].trim().is_empty() {
        return Err(err());
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(text: &str) -> f64 {
        parse_duration_minutes(text).unwrap()
    }

    #[test]
    fn parses_minutes_only() {
        assert!((minutes("12 mins") - 12.0).abs() < f64::EPSILON);
        assert!((minutes("1 min") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_hours_and_minutes() {
        assert!((minutes("1 hour 5 mins") - 65.0).abs() < f64::EPSILON);
        assert!((minutes("2 hours 30 mins") - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_bare_hours_and_days() {
        assert!((minutes("2 hours") - 120.0).abs() < f64::EPSILON);
        assert!((minutes("1 day 3 hours") - 1620.0).abs() < f64::EPSILON);
    }

    #[test]
    fn is_case_and_space_tolerant() {
        assert!((minutes("  1 Hour 5 Mins ") - 65.0).abs() < f64::EPSILON);
        assert!((minutes("7mins") - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_duration_minutes(""),
            Err(RoutingError::Duration { .. })
        ));
        assert!(parse_duration_minutes("soon").is_err());
        assert!(parse_duration_minutes("5 fortnights").is_err());
        assert!(parse_duration_minutes("about 5 mins").is_err());
        assert!(parse_duration_minutes("5 mins!").is_err());
    }
}
