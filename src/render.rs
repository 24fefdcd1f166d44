//! Human-readable formatting of measured values for check output.

use chrono::{DateTime, Utc};

/// `87.2` → `"87.2%"`.
pub fn percent(v: f64) -> String {
    format!("{:.1}%", v)
}

/// IEC-prefixed byte count, `1610612736.0` → `"1.50 GiB"`.
pub fn bytes(v: f64) -> String {
    const PREFIXES: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = v;
    let mut prefix = 0;
    while value.abs() >= 1024.0 && prefix < PREFIXES.len() - 1 {
        value /= 1024.0;
        prefix += 1;
    }
    if prefix == 0 {
        format!("{:.0} B", value)
    } else {
        format!("{:.2} {}", value, PREFIXES[prefix])
    }
}

/// Fractional CPU cores, `0.5` → `"0.500 cores"`.
pub fn cores(v: f64) -> String {
    format!("{:.3} cores", v)
}

/// A duration in seconds rendered with its two most significant units,
/// `330.0` → `"5 minutes 30 seconds"`.
pub fn timespan(seconds: f64) -> String {
    const UNITS: [(f64, &str); 4] = [
        (86400.0, "day"),
        (3600.0, "hour"),
        (60.0, "minute"),
        (1.0, "second"),
    ];

    let total = seconds.max(0.0).round();
    if total < 1.0 {
        return "0 seconds".to_string();
    }

    let mut remainder = total;
    let mut parts = Vec::new();
    for (span, name) in UNITS {
        if parts.len() == 2 {
            break;
        }
        let count = (remainder / span).floor();
        if count >= 1.0 {
            remainder -= count * span;
            let plural = if count == 1.0 { "" } else { "s" };
            parts.push(format!("{:.0} {}{}", count, name, plural));
        } else if !parts.is_empty() {
            // Keep the second component even when zero, "1 hour 0 minutes"
            // reads better than a bare "1 hour" next to other timespans.
            parts.push(format!("0 {}s", name));
        }
    }
    parts.join(" ")
}

/// A unix timestamp rendered as UTC date and time.
pub fn datetime(epoch: f64) -> String {
    match DateTime::<Utc>::from_timestamp(epoch as i64, 0) {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("broken timestamp {}", epoch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(&percent(87.25), "87.2%");
        assert_eq!(&percent(0.0), "0.0%");
    }

    #[test]
    fn test_bytes() {
        assert_eq!(&bytes(512.0), "512 B");
        assert_eq!(&bytes(2048.0), "2.00 KiB");
        assert_eq!(&bytes(1.5 * 1024.0 * 1024.0 * 1024.0), "1.50 GiB");
    }

    #[test]
    fn test_timespan() {
        assert_eq!(&timespan(0.2), "0 seconds");
        assert_eq!(&timespan(1.0), "1 second");
        assert_eq!(&timespan(59.0), "59 seconds");
        assert_eq!(&timespan(60.0), "1 minute 0 seconds");
        assert_eq!(&timespan(330.0), "5 minutes 30 seconds");
        assert_eq!(&timespan(3661.0), "1 hour 1 minute");
        assert_eq!(&timespan(2.0 * 86400.0 + 3600.0), "2 days 1 hour");
    }

    #[test]
    fn test_datetime() {
        assert_eq!(&datetime(0.0), "1970-01-01 00:00:00");
        assert_eq!(&datetime(1700000000.0), "2023-11-14 22:13:20");
    }
}
