//! Human-readable route metrics.

use crate::api::{Maneuver, Summary};

/// `"150m"` below one kilometer, `"2.50km"` from there on.
pub fn format_length(km: f64) -> String {
    if km < 1.0 {
        format!("{}m", (km * 1000.0).round() as i64)
    } else {
        format!("{km:.2}km")
    }
}

/// `"1h 2min 5s"`; zero parts are left out and a zero duration is `"0s"`.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let parts = [
        (total / 86_400, "d"),
        (total % 86_400 / 3_600, "h"),
        (total % 3_600 / 60, "min"),
        (total % 60, "s"),
    ];
    let out: Vec<String> = parts
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| format!("{n}{unit}"))
        .collect();
    if out.is_empty() {
        "0s".to_string()
    } else {
        out.join(" ")
    }
}

/// Length and time shown next to a maneuver, or `None` for arrivals.
pub fn maneuver_metrics(m: &Maneuver) -> Option<(String, String)> {
    if m.is_arrival() {
        return None;
    }
    Some((format_length(m.length), format_duration(m.time)))
}

pub fn summary_metrics(s: &Summary) -> (String, String) {
    (format_length(s.length), format_duration(s.time))
}
