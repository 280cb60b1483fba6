//! Display strings for distances and durations.

/// "850 m" below a kilometer, "2.5 km" above.
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{} m", meters.round() as i64)
    }
}

/// "12 min", or "1 hr 5 min" past the hour. Seconds are truncated.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    if hours > 0 {
        format!("{hours} hr {minutes} min")
    } else {
        format!("{minutes} min")
    }
}

/// Meters per second to whole kilometers per hour.
pub fn mps_to_kmh(speed_mps: f64) -> f64 {
    (speed_mps * 3.6).round()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_distance_meters() {
        assert_eq!(format_distance(150.4), "150 m");
        assert_eq!(format_distance(0.0), "0 m");
    }

    #[test]
    fn format_distance_km() {
        assert_eq!(format_distance(2500.0), "2.5 km");
        assert_eq!(format_distance(1000.0), "1.0 km");
    }

    #[test]
    fn format_duration_minutes_and_hours() {
        assert_eq!(format_duration(260.0), "4 min");
        assert_eq!(format_duration(3900.0), "1 hr 5 min");
        assert_eq!(format_duration(-5.0), "0 min");
    }

    #[test]
    fn speed_conversion_rounds() {
        assert_eq!(mps_to_kmh(13.9), 50.0);
        assert_eq!(mps_to_kmh(0.0), 0.0);
    }
}
